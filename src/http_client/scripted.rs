//! In-memory transport with canned replies per URL path.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use super::{HttpResponse, Transport, TransportError};

/// A canned reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Fail(String),
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_string())
    }
}

/// A request the transport has seen.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: HeaderMap,
}

/// Replies are matched by URL suffix. Each path has a queue; the last reply in
/// a queue repeats forever once the earlier ones are used up.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, path: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .iter_mut()
            .find(|(path, _)| url.ends_with(path.as_str()))
            .map(|(_, queue)| queue)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers,
        });

        match self.next_reply(url) {
            Some(Reply::Status(code, body)) => Ok(HttpResponse::new(
                StatusCode::from_u16(code).unwrap(),
                body.into_bytes(),
            )),
            Some(Reply::Fail(message)) => Err(TransportError::Connection(message)),
            None => Err(TransportError::Connection(format!("no route for {}", url))),
        }
    }
}
