//! Error types for collaborators and the planning pipeline.

use thiserror::Error;

/// Failure talking to an external collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("provider covered {returned} of {requested} stops")]
    Incomplete { requested: usize, returned: usize },

    #[error("unusable provider response: {0}")]
    InvalidResponse(String),
}

/// Failure of a whole planning request.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("at least two stops with valid coordinates are required, got {0}")]
    InsufficientStops(usize),

    #[error("route could not be computed, verify the stop addresses")]
    RouteUnavailable(#[source] ProviderError),

    #[error("the starting stop has no usable coordinates")]
    InvalidAnchor,

    #[error("a route computation is already in progress")]
    InFlight,
}

impl From<ProviderError> for PlanError {
    fn from(err: ProviderError) -> Self {
        PlanError::RouteUnavailable(err)
    }
}
