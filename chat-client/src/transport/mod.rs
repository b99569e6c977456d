//! Transport abstraction for relaychat.
//!
//! This module provides a pluggable HTTP layer that abstracts the actual
//! network client (reqwest, mock for testing).
//!
//! # Design
//!
//! The transport is request/response: one [`HttpRequest`] in, one
//! [`HttpResponse`] out. It does not interpret status codes or bodies and
//! never retries; that is the job of [`crate::fetch::ResilientFetch`].
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_json("/persona", json!("me"));
//! let response = transport.execute(&HttpRequest::get("/persona")).await?;
//! assert!(response.is_success());
//! ```

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::{MockGate, MockTransport};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("client setup failed: {0}")]
    Setup(String),

    /// Connection failed or was reset.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("request timeout")]
    Timeout,

    /// The response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// HTTP method used by the relay endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a JSON body
    Post,
}

/// A request relative to the relay's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Endpoint path, e.g. `/messages`.
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body for `POST`.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// A `GET` without query parameters.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// A `POST` carrying `body` as JSON.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of the first query parameter named `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A `200 OK` carrying `value` as JSON.
    pub fn json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for talking to the relay's HTTP endpoints.
///
/// Implementations handle the underlying connection mechanism
/// (reqwest, mock, etc).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one request. Non-2xx statuses are returned as responses,
    /// not errors.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_builder_has_no_body() {
        let request = HttpRequest::get("/messages").with_query("since", "n5");
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
        assert_eq!(request.query_param("since"), Some("n5"));
        assert_eq!(request.query_param("other"), None);
    }

    #[test]
    fn post_builder_carries_json() {
        let request = HttpRequest::post("/send", json!({"address": "bob", "message": "hi"}));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(json!({"address": "bob", "message": "hi"})));
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn json_response_is_ok() {
        let response = HttpResponse::json(&json!(["alice"]));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, br#"["alice"]"#.to_vec());
    }
}
