//! API query and error types.

use serde::{Deserialize, Serialize};

/// Optional range query parameters for the flows endpoint.
#[derive(Debug, Deserialize)]
pub struct FlowsQuery {
    /// First step (inclusive).
    pub from: Option<usize>,
    /// Last step (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
