//! HTTP response wrapper.

use std::borrow::Cow;

use reqwest::StatusCode;

/// Fully read HTTP response: status plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Check if the response is exactly 200 OK.
    ///
    /// Other 2xx codes are not accepted; the Paperless endpoints answer 200.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Body as text, for logging. Invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
