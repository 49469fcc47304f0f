//! CSV rendering for the export endpoint
//!
//! The header row is always written, so an empty result is still a valid CSV
//! file. Row numbers start at 1 and follow the view's ranking.

use crate::domain::types::{BuildingRow, StreetAggregate, ViewRows, ViewType};

pub const BUILDING_COLUMNS: [&str; 9] = [
    "record_number",
    "planlabel",
    "street_address_display",
    "suburb",
    "postcode",
    "lga",
    "lottotal",
    "sum_of_lots_per_street",
    "cumulative_lots",
];

pub const STREET_COLUMNS: [&str; 5] =
    ["record_number", "street_name", "property_count", "total_lots_on_street", "cumulative_lots"];

/// Attachment filename for a view export
pub fn export_filename(view: ViewType, suburb: &str) -> String {
    let suburb = suburb.trim().replace(' ', "_").replace('/', "-");
    format!("strata_export_{}_{suburb}.csv", view.as_str())
}

/// Render rows to CSV bytes
pub fn render(rows: &ViewRows) -> Result<Vec<u8>, csv::Error> {
    match rows {
        ViewRows::Buildings(rows) => render_buildings(rows),
        ViewRows::Streets(rows) => render_streets(rows),
    }
}

pub fn render_buildings(rows: &[BuildingRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(BUILDING_COLUMNS)?;

    for (i, row) in rows.iter().enumerate() {
        let record = &row.record;
        writer.write_record([
            (i + 1).to_string(),
            record.plan_label.clone().unwrap_or_default(),
            row.street_address_display.clone(),
            record.suburb.clone().unwrap_or_default(),
            record.postcode.clone().unwrap_or_default(),
            record.lga.clone().unwrap_or_default(),
            record.lot_total.map(|l| l.to_string()).unwrap_or_default(),
            row.sum_of_lots_per_street.to_string(),
            row.cumulative_lots.to_string(),
        ])?;
    }

    finish(writer)
}

pub fn render_streets(rows: &[StreetAggregate]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(STREET_COLUMNS)?;

    for (i, street) in rows.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            street.street_name.clone(),
            street.property_count.to_string(),
            street.total_lots_on_street.to_string(),
            street.cumulative_lots.to_string(),
        ])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, csv::Error> {
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}
