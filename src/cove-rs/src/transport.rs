use serde_json::Value;
use std::time::Duration;

use crate::{ClientConfig, Result};

/// HTTP verb for a [`Request`]. Key-list queries POST despite being logical
/// reads, so the verb is chosen per request, not per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One request against the server API, expressed independently of the HTTP
/// stack that carries it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path below the server root, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and decoded JSON body of a response. Bodies that are empty or not
/// JSON decode as `Null`; interpreting non-success statuses is the caller's
/// job.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Wire collaborator: one request in, one response out. Network-level
/// failures are the only errors raised here; the connection never stays
/// open across calls.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!(method = ?request.method, %url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new(Method::Post, "/db/_all_docs")
            .with_query(vec![("limit".to_string(), "10".to_string())])
            .with_body(serde_json::json!({"keys": ["a"]}));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/db/_all_docs");
        assert_eq!(request.query.len(), 1);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_success_statuses() {
        assert!(Response { status: 201, body: Value::Null }.is_success());
        assert!(!Response { status: 404, body: Value::Null }.is_success());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport =
            HttpTransport::new(&ClientConfig::new("http://localhost:5984/")).unwrap();
        assert_eq!(transport.base_url, "http://localhost:5984");
    }
}
