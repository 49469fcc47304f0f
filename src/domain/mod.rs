//! Domain models - strata records and derived views
//!
//! This module contains the canonical data types used throughout the system:
//! - `BuildingRecord` - one strata plan as fetched from StrataHub
//! - `StreetAggregate` - lots and properties summed per street
//! - `BuildingRow` - building view row with per-street and running totals
//! - `ViewType` - the four tabular views

pub mod types;

// Re-export commonly used types at module level
pub use types::{BuildingRecord, BuildingRow, StreetAggregate, ViewRows, ViewType};
