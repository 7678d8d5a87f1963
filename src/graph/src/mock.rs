use crate::transport::{HttpRequest, HttpTransport};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Answers requests by url prefix and records every request it sees. A url
/// without a matching prefix fails like an empty response would.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<Vec<(String, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Serve `body` for urls starting with `url_prefix`, replacing any body
    /// previously set for the same prefix.
    pub fn respond(&self, url_prefix: &str, body: &str) {
        let mut responses = lock(&self.responses);
        responses.retain(|(prefix, _)| prefix != url_prefix);
        responses.push((url_prefix.to_string(), body.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn calls(&self, url_prefix: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.url.starts_with(url_prefix))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        let url = request.url.clone();
        lock(&self.requests).push(request);
        lock(&self.responses)
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix))
            .map(|(_, body)| body.clone())
            .ok_or(anyhow!("Empty response from {}", url))
    }
}
