//! Fetch error types.

use thiserror::Error;

use crate::http_client::TransportError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected status code {code}")]
    UnexpectedStatus { code: u16 },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}
