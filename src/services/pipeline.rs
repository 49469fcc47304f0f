//! Request pipeline: resolve suburb, fetch, merge, aggregate
//!
//! Allow-listed ambiguous suburbs (MANLY, CREMORNE, ...) are also searched by
//! postcode. When both searches run, postcode results take precedence and
//! suburb results are added only for plan labels not already seen. One
//! failing search does not fail the request if the other produced data.

use crate::domain::types::{BuildingRecord, BuildingRow, StreetAggregate, ViewRows, ViewType};
use crate::infra::config::Config;
use crate::infra::error::{Result, StrataError};
use crate::infra::gazetteer::SuburbReferenceSet;
use crate::io::strata_hub::DataSource;
use crate::services::aggregator::{
    aggregate_by_street, aggregate_by_street_min_lots, building_rows, building_rows_min_lots,
};
use crate::services::suburb_resolver::{QueryFilter, Resolution, SuburbResolver};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct StrataService<D: DataSource> {
    resolver: SuburbResolver,
    source: D,
    postcode_fallbacks: BTreeMap<String, u32>,
    min_lots: u64,
}

impl<D: DataSource> StrataService<D> {
    pub fn new(config: &Config, reference: Arc<SuburbReferenceSet>, source: D) -> Self {
        let resolver = SuburbResolver::new(
            reference,
            config.fuzzy_threshold(),
            config.postcode_fallbacks().keys(),
        );
        Self::with_resolver(config, resolver, source)
    }

    pub fn with_resolver(config: &Config, resolver: SuburbResolver, source: D) -> Self {
        Self {
            resolver,
            source,
            postcode_fallbacks: config.postcode_fallbacks().clone(),
            min_lots: config.min_lots(),
        }
    }

    /// All building records for a suburb, with the postcode fallback applied
    pub async fn combined_records(&self, suburb: Option<&str>) -> Result<Vec<BuildingRecord>> {
        let input = suburb.map(str::trim).unwrap_or("");
        if input.is_empty() {
            return Err(StrataError::MissingInput);
        }
        let suburb_upper = input.to_uppercase();

        let resolution = self.resolver.resolve(input)?;
        let mut errors: Vec<StrataError> = Vec::new();

        let by_suburb = match resolution.filter() {
            Some(filter) => match self.source.fetch(filter).await {
                Ok(records) => Some(records),
                Err(e) => {
                    warn!(suburb = %input, error = %e, "suburb_search_failed");
                    errors.push(e);
                    None
                }
            },
            None => None,
        };

        let records = match self.postcode_fallbacks.get(&suburb_upper) {
            Some(&postcode) => {
                info!(suburb = %suburb_upper, postcode = %postcode, "postcode_fallback_search");
                let by_postcode =
                    match self.source.fetch(&QueryFilter::PostcodeEquals(postcode)).await {
                        Ok(records) => Some(records),
                        Err(e) => {
                            warn!(postcode = %postcode, error = %e, "postcode_search_failed");
                            errors.push(e);
                            None
                        }
                    };
                merge_by_plan_label(by_postcode.unwrap_or_default(), by_suburb.unwrap_or_default())
            }
            None => by_suburb.unwrap_or_default(),
        };

        if !records.is_empty() {
            if !errors.is_empty() {
                warn!(suburb = %input, failed_searches = %errors.len(), "returning_partial_data");
            }
            return Ok(records);
        }

        if let Resolution::Deferred { .. } = resolution {
            return Err(StrataError::invalid_suburb(input));
        }
        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(records),
        }
    }

    /// Raw building records (JSON building view)
    pub async fn buildings(&self, suburb: Option<&str>) -> Result<Vec<BuildingRecord>> {
        self.combined_records(suburb).await
    }

    /// Building rows with per-street and running totals
    pub async fn building_rows(&self, suburb: Option<&str>) -> Result<Vec<BuildingRow>> {
        Ok(building_rows(&self.combined_records(suburb).await?))
    }

    /// Building rows for buildings with at least `min_lots` lots
    pub async fn buildings_min_lots(&self, suburb: Option<&str>) -> Result<Vec<BuildingRow>> {
        let records = self.combined_records(suburb).await?;
        Ok(building_rows_min_lots(&records, self.min_lots))
    }

    /// Street-level aggregation
    pub async fn streets(&self, suburb: Option<&str>) -> Result<Vec<StreetAggregate>> {
        let records = self.combined_records(suburb).await?;
        Ok(aggregate_by_street(&records, suburb.unwrap_or("")))
    }

    /// Street-level aggregation over large buildings, large streets only
    pub async fn streets_min_lots(&self, suburb: Option<&str>) -> Result<Vec<StreetAggregate>> {
        let records = self.combined_records(suburb).await?;
        Ok(aggregate_by_street_min_lots(&records, suburb.unwrap_or(""), self.min_lots))
    }

    /// Rows for one of the exportable views
    pub async fn view(&self, suburb: Option<&str>, view: ViewType) -> Result<ViewRows> {
        Ok(match view {
            ViewType::Building => ViewRows::Buildings(self.building_rows(suburb).await?),
            ViewType::BuildingMinLots => {
                ViewRows::Buildings(self.buildings_min_lots(suburb).await?)
            }
            ViewType::Street => ViewRows::Streets(self.streets(suburb).await?),
            ViewType::StreetMinLots => ViewRows::Streets(self.streets_min_lots(suburb).await?),
        })
    }
}

/// Primary records first, then secondary records with unseen plan labels.
/// Records without a plan label cannot be deduplicated and are dropped.
fn merge_by_plan_label(
    primary: Vec<BuildingRecord>,
    secondary: Vec<BuildingRecord>,
) -> Vec<BuildingRecord> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut merged = Vec::with_capacity(primary.len() + secondary.len());
    for record in primary.into_iter().chain(secondary) {
        let Some(label) = record.plan_label() else {
            continue;
        };
        if seen.insert(label.to_string()) {
            merged.push(record);
        }
    }
    merged
}
