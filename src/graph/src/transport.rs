use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

/// A single outbound request. Headers, query parameters and the body are
/// injected by the caller; the transport only has to put them on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    fn new(method: Method, url: &str) -> Self {
        HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![],
            query: vec![],
            body: Body::Empty,
        }
    }

    pub fn get(url: &str) -> Self {
        HttpRequest::new(Method::Get, url)
    }

    pub fn post(url: &str) -> Self {
        HttpRequest::new(Method::Post, url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, access_token: &str) -> Self {
        self.header(
            header::AUTHORIZATION.as_str(),
            &format!("Bearer {}", access_token),
        )
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, params: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, payload: Value) -> Self {
        self.body = Body::Json(payload);
        self
    }

    /// The request url with the query parameters percent-encoded onto it.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<String>>()
            .join("&");
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, query)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and return the raw response body. A request that
    /// cannot complete, a non-success status, or an empty body are all
    /// reported as an error.
    async fn send(&self, request: HttpRequest) -> Result<String>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        let url = Url::parse(&request.full_url())?;
        debug!("{:?} {}", request.method, request.url);
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(params) => builder.form(params),
            Body::Json(payload) => builder.json(payload),
        };
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!(resp.status()));
        }
        let body = resp.text().await?;
        if body.is_empty() {
            return Err(anyhow!("Empty response from {}", request.url));
        }
        Ok(body)
    }
}
