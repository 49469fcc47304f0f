//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `strata_hub` - Paginated client for the StrataHub feature layer
//! - `http_api` - JSON views and CSV export over HTTP
//! - `csv_export` - CSV rendering of the tabular views

pub mod csv_export;
pub mod http_api;
pub mod strata_hub;

// Re-export commonly used types
pub use http_api::{serve, start_api_server};
pub use strata_hub::{DataSource, StrataHubClient};
