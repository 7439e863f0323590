//! Record ingestion handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use hr_analytics_core::{QueryRecord, RecordInput};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum records accepted in one batch.
pub const MAX_BATCH_RECORDS: usize = 1000;

/// Batch ingest request.
#[derive(Debug, Deserialize)]
pub struct BatchRecordsRequest {
    /// Records to store.
    pub records: Vec<RecordInput>,
}

/// Ingest response.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Rows written.
    pub stored: usize,
}

/// Store a single record.
pub async fn put_record(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(input): Json<RecordInput>,
) -> Result<Json<StoredResponse>, ApiError> {
    let record = QueryRecord::try_from(input)?;
    state.store.put_record(&record)?;

    tracing::info!(
        service = %service.service_name,
        user_id = %record.user_id,
        timestamp = %record.timestamp,
        "Record stored"
    );

    Ok(Json(StoredResponse { stored: 1 }))
}

/// Store a batch of records.
///
/// Every record is validated before anything is written; one bad record
/// rejects the whole batch.
pub async fn put_records_batch(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<BatchRecordsRequest>,
) -> Result<Json<StoredResponse>, ApiError> {
    if body.records.len() > MAX_BATCH_RECORDS {
        return Err(ApiError::BadRequest(format!(
            "batch of {} records exceeds the limit of {MAX_BATCH_RECORDS}",
            body.records.len()
        )));
    }

    let records = body
        .records
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            QueryRecord::try_from(input)
                .map_err(|e| ApiError::BadRequest(format!("record {index}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    state.store.put_records(&records)?;

    tracing::info!(
        service = %service.service_name,
        count = records.len(),
        "Record batch stored"
    );

    Ok(Json(StoredResponse {
        stored: records.len(),
    }))
}
