//! Infrastructure - configuration, gazetteer and errors
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `gazetteer` - Read-only suburb reference set
//! - `error` - Request-scoped error kinds

pub mod config;
pub mod error;
pub mod gazetteer;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, StrataError};
pub use gazetteer::SuburbReferenceSet;
