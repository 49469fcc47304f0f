//! Request-scoped error type
//!
//! Every failure a request can hit is one of these kinds. None of them is
//! fatal to the process; the HTTP layer maps each to a status code and a
//! `{"error": ...}` body.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrataError {
    #[error("Please provide a suburb name.")]
    MissingInput,

    #[error("Invalid NSW Suburb: \"{input}\". Please enter a valid NSW suburb name from the official list.")]
    InvalidSuburb { input: String },

    #[error("Suburb validation list could not be loaded: {reason}")]
    ReferenceSetUnavailable { reason: String },

    #[error("API request timed out.")]
    UpstreamTimeout,

    #[error("Error making API request: {message}")]
    UpstreamRequestFailed { message: String },

    #[error("Error decoding API response: {message}")]
    UpstreamMalformedResponse { message: String },

    #[error("Invalid view type")]
    InvalidView { view: String },
}

impl StrataError {
    pub fn invalid_suburb(input: impl Into<String>) -> Self {
        Self::InvalidSuburb { input: input.into() }
    }

    pub fn reference_set_unavailable(reason: impl Into<String>) -> Self {
        Self::ReferenceSetUnavailable { reason: reason.into() }
    }

    pub fn upstream_request_failed(message: impl Into<String>) -> Self {
        Self::UpstreamRequestFailed { message: message.into() }
    }

    pub fn upstream_malformed(message: impl Into<String>) -> Self {
        Self::UpstreamMalformedResponse { message: message.into() }
    }

    /// Stable snake_case identifier, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::InvalidSuburb { .. } => "invalid_suburb",
            Self::ReferenceSetUnavailable { .. } => "reference_set_unavailable",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamRequestFailed { .. } => "upstream_request_failed",
            Self::UpstreamMalformedResponse { .. } => "upstream_malformed_response",
            Self::InvalidView { .. } => "invalid_view",
        }
    }

    /// HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingInput | Self::InvalidSuburb { .. } | Self::InvalidView { .. } => 400,
            Self::ReferenceSetUnavailable { .. } => 503,
            Self::UpstreamTimeout => 504,
            Self::UpstreamRequestFailed { .. } | Self::UpstreamMalformedResponse { .. } => 502,
        }
    }

    /// Upstream failures are the ones the postcode fallback may paper over
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout
                | Self::UpstreamRequestFailed { .. }
                | Self::UpstreamMalformedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
