//! StrataHub feature-layer client
//!
//! Queries the NSW spatial portal's ArcGIS REST endpoint. Results are paged:
//! request `page_size` records at a time, ordered by lot total, until the
//! server stops reporting `exceededTransferLimit` or returns an empty page.
//! A short pause between pages keeps the portal happy.

use crate::domain::types::BuildingRecord;
use crate::infra::config::Config;
use crate::infra::error::{Result, StrataError};
use crate::services::suburb_resolver::QueryFilter;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Attributes requested from the feature layer
pub const OUT_FIELDS: &str = "planlabel,address,suburb,postcode,lga,lottotal";

/// Source of raw building records for a filter
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, filter: &QueryFilter) -> Result<Vec<BuildingRecord>>;
}

/// One page of an ArcGIS query response
#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default, rename = "exceededTransferLimit")]
    exceeded_transfer_limit: bool,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    attributes: BuildingRecord,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Parsed page: records plus whether more pages follow
#[derive(Debug)]
pub struct Page {
    pub records: Vec<BuildingRecord>,
    pub more: bool,
}

/// Decode one response body
pub fn parse_page(body: &[u8]) -> Result<Page> {
    let page: QueryPage =
        serde_json::from_slice(body).map_err(|e| StrataError::upstream_malformed(e.to_string()))?;

    if let Some(err) = page.error {
        let message = err.message.unwrap_or_else(|| "Unable to complete operation".to_string());
        return Err(StrataError::upstream_request_failed(format!("API Error: {message}")));
    }

    Ok(Page {
        records: page.features.into_iter().map(|f| f.attributes).collect(),
        more: page.exceeded_transfer_limit,
    })
}

pub struct StrataHubClient {
    http: reqwest::Client,
    url: String,
    page_size: u32,
    page_delay: Duration,
}

impl StrataHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| StrataError::upstream_request_failed(e.to_string()))?;

        Ok(Self {
            http,
            url: config.upstream_url().to_string(),
            page_size: config.page_size(),
            page_delay: Duration::from_millis(config.page_delay_ms()),
        })
    }

    async fn fetch_page(&self, where_clause: &str, offset: usize) -> Result<Page> {
        let offset = offset.to_string();
        let page_size = self.page_size.to_string();
        let params = [
            ("where", where_clause),
            ("outFields", OUT_FIELDS),
            ("returnGeometry", "false"),
            ("resultOffset", offset.as_str()),
            ("resultRecordCount", page_size.as_str()),
            ("orderByFields", "lottotal DESC"),
            ("f", "json"),
        ];

        let response = self
            .http
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_transport_error)?;

        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_page(&body)
    }
}

fn map_transport_error(e: reqwest::Error) -> StrataError {
    if e.is_timeout() {
        error!("strata_fetch_timeout");
        StrataError::UpstreamTimeout
    } else if e.is_decode() {
        error!(error = %e, "strata_fetch_decode_error");
        StrataError::upstream_malformed(e.to_string())
    } else {
        error!(error = %e, "strata_fetch_request_error");
        StrataError::upstream_request_failed(e.to_string())
    }
}

#[async_trait]
impl DataSource for StrataHubClient {
    async fn fetch(&self, filter: &QueryFilter) -> Result<Vec<BuildingRecord>> {
        let started = Instant::now();
        let where_clause = filter.where_clause();
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(&where_clause, records.len()).await?;
            pages += 1;
            if page.records.is_empty() {
                break;
            }
            debug!(offset = %records.len(), count = %page.records.len(), more = %page.more, "strata_page_received");
            records.extend(page.records);
            if !page.more {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        info!(
            filter = %where_clause,
            records = %records.len(),
            pages = %pages,
            elapsed_ms = %started.elapsed().as_millis(),
            "strata_fetch_completed"
        );
        Ok(records)
    }
}
