use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ApiError;

/// Deserialize a JSON request body. Anything serde rejects is a 400.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected request body: {}", e);
        ApiError::invalid("body", "Malformed JSON request body")
    })
}
