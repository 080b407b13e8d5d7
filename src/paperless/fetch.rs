//! Authenticated GET + JSON decode against a single Paperless endpoint.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, HOST};
use serde::de::DeserializeOwned;

use crate::http_client::{Transport, TransportError};

use super::FetchError;

/// Build the request headers: token auth plus an optional Host override.
fn request_headers(token: &str, host_header: &str) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();

    let mut auth = HeaderValue::from_str(&format!("Token {}", token))
        .map_err(|_| TransportError::InvalidHeader { name: "Authorization" })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    if !host_header.is_empty() {
        let host = HeaderValue::from_str(host_header)
            .map_err(|_| TransportError::InvalidHeader { name: "Host" })?;
        headers.insert(HOST, host);
    }

    Ok(headers)
}

/// GET `url` and decode the JSON body into `T`.
///
/// Anything but `200 OK` is an error; the body of a failed response is logged
/// and dropped. Errors are logged here, at the point they are detected, so
/// callers only need to decide what to do with them.
pub async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    url: &str,
    token: &str,
    host_header: &str,
) -> Result<T, FetchError> {
    let headers = request_headers(token, host_header).inspect_err(|e| {
        tracing::error!("Cannot build request for {}: {}", url, e);
    })?;

    let response = transport.get(url, headers).await.inspect_err(|e| {
        tracing::error!("Error making HTTP request to {}: {}", url, e);
    })?;

    let code = response.status.as_u16();
    tracing::debug!(status_code = code, "Response from {}", url);

    if !response.is_ok() {
        tracing::error!(status_code = code, body = %response.text(), "Error response from {}", url);
        return Err(FetchError::UnexpectedStatus { code });
    }

    tracing::debug!(body = %response.text(), "Response body");

    serde_json::from_slice(&response.body).map_err(|e| {
        tracing::error!(error = %e, body = %response.text(), "Failed to decode response body");
        FetchError::Decode(e)
    })
}
