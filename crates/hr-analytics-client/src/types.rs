//! Request and response types for the hr-analytics API.

use serde::{Deserialize, Serialize};

use hr_analytics_core::RecordInput;

/// Largest batch the service accepts in one request.
pub const MAX_BATCH_RECORDS: usize = 1000;

/// Batch ingest request body.
#[derive(Debug, Serialize)]
pub struct BatchRecordsRequest<'a> {
    /// Records to store.
    pub records: &'a [RecordInput],
}

/// Ingest response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Rows written.
    pub stored: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// API error response body.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
}
