//! Services - business logic
//!
//! This module contains the core business logic services:
//! - `street_name` - Canonical street names from free-text addresses
//! - `similarity` - Pluggable fuzzy string scoring
//! - `suburb_resolver` - Gazetteer validation and query filters
//! - `aggregator` - Street and building views with running totals
//! - `pipeline` - Resolve, fetch, merge and aggregate per request

pub mod aggregator;
pub mod pipeline;
pub mod similarity;
pub mod street_name;
pub mod suburb_resolver;

// Re-export commonly used types
pub use aggregator::{
    aggregate_by_street, aggregate_by_street_min_lots, building_rows, building_rows_min_lots,
};
pub use pipeline::StrataService;
pub use similarity::{SimilarityScorer, WeightedRatio};
pub use street_name::{extract_street_name, parse_display_address};
pub use suburb_resolver::{MatchKind, QueryFilter, Resolution, SuburbResolver};
