//! Street-level and building-level aggregation
//!
//! Streets are ranked by total lots, descending. The sort is stable, so
//! streets with equal totals stay in the order their first building was seen.
//! `cumulative_lots` is a running total over that ranking. Sums saturate at
//! `u64::MAX` instead of wrapping.

use crate::domain::types::{BuildingRecord, BuildingRow, StreetAggregate};
use crate::services::street_name::{extract_street_name, parse_display_address};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, info};

/// Records that can be aggregated: an address and a valid lot total
fn countable(record: &BuildingRecord) -> Option<(&str, u64)> {
    Some((record.address()?, record.lot_total?))
}

/// Recompute running totals over an already-ranked list
pub fn apply_cumulative(streets: &mut [StreetAggregate]) {
    let mut running = 0u64;
    for street in streets {
        running = running.saturating_add(street.total_lots_on_street);
        street.cumulative_lots = running;
    }
}

/// Group buildings by canonical street name and rank by total lots.
///
/// Records without an address or a parseable lot total are skipped.
/// `suburb_label` is echoed (upper-cased) on every aggregate regardless of the
/// suburb each record reports.
pub fn aggregate_by_street(records: &[BuildingRecord], suburb_label: &str) -> Vec<StreetAggregate> {
    let started = Instant::now();
    let suburb = suburb_label.trim().to_uppercase();

    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut streets: Vec<StreetAggregate> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let Some((address, lots)) = countable(record) else {
            skipped += 1;
            continue;
        };

        let street_name = extract_street_name(address);
        let slot = match index.get(&street_name) {
            Some(&slot) => slot,
            None => {
                streets.push(StreetAggregate {
                    street_name: street_name.clone(),
                    suburb: suburb.clone(),
                    property_count: 0,
                    total_lots_on_street: 0,
                    cumulative_lots: 0,
                });
                index.insert(street_name, streets.len() - 1);
                streets.len() - 1
            }
        };

        let street = &mut streets[slot];
        street.property_count += 1;
        street.total_lots_on_street = street.total_lots_on_street.saturating_add(lots);
    }

    // Stable: equal totals keep first-encounter order
    streets.sort_by(|a, b| b.total_lots_on_street.cmp(&a.total_lots_on_street));
    apply_cumulative(&mut streets);

    if skipped > 0 {
        debug!(skipped = %skipped, "aggregate_records_skipped");
    }
    info!(
        suburb = %suburb,
        buildings = %records.len(),
        streets = %streets.len(),
        elapsed_us = %started.elapsed().as_micros(),
        "aggregate_by_street_completed"
    );
    streets
}

/// Street view restricted to large buildings and large streets.
///
/// Two thresholds, applied in sequence: buildings with fewer than `min_lots`
/// are dropped before grouping, then streets whose total is below `min_lots`
/// are dropped, and running totals are recomputed over what is left.
pub fn aggregate_by_street_min_lots(
    records: &[BuildingRecord],
    suburb_label: &str,
    min_lots: u64,
) -> Vec<StreetAggregate> {
    let large: Vec<BuildingRecord> = records
        .iter()
        .filter(|r| r.lot_total.is_some_and(|lots| lots >= min_lots))
        .cloned()
        .collect();
    if large.is_empty() {
        return Vec::new();
    }

    let mut streets = aggregate_by_street(&large, suburb_label);
    streets.retain(|s| s.total_lots_on_street >= min_lots);
    apply_cumulative(&mut streets);
    streets
}

/// Building view: every record ranked by lot total, with its street's total
/// and a running total.
///
/// Records without a valid lot total count as zero and rank last. Per-street
/// sums use the same canonical street key as the street view.
pub fn building_rows(records: &[BuildingRecord]) -> Vec<BuildingRow> {
    let mut street_sums: FxHashMap<String, u64> = FxHashMap::default();
    let keyed: Vec<(&BuildingRecord, String)> = records
        .iter()
        .map(|record| {
            let key = extract_street_name(record.address.as_deref().unwrap_or(""));
            let sum = street_sums.entry(key.clone()).or_insert(0);
            *sum = sum.saturating_add(record.lot_total.unwrap_or(0));
            (record, key)
        })
        .collect();

    let mut ranked = keyed;
    ranked.sort_by(|(a, _), (b, _)| b.lot_total.unwrap_or(0).cmp(&a.lot_total.unwrap_or(0)));

    let mut running = 0u64;
    ranked
        .into_iter()
        .map(|(record, key)| {
            running = running.saturating_add(record.lot_total.unwrap_or(0));
            let display = parse_display_address(
                record.address.as_deref().unwrap_or(""),
                record.suburb.as_deref().unwrap_or(""),
            );
            BuildingRow {
                record: record.clone(),
                street_address_display: display,
                sum_of_lots_per_street: street_sums.get(&key).copied().unwrap_or(0),
                cumulative_lots: running,
            }
        })
        .collect()
}

/// Building view restricted to buildings with at least `min_lots` lots.
/// Street sums only count the buildings that survive the filter.
pub fn building_rows_min_lots(records: &[BuildingRecord], min_lots: u64) -> Vec<BuildingRow> {
    let large: Vec<BuildingRecord> = records
        .iter()
        .filter(|r| r.lot_total.is_some_and(|lots| lots >= min_lots))
        .cloned()
        .collect();
    building_rows(&large)
}
