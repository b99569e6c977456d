//! Mock transport for testing.
//!
//! Allows queueing responses per endpoint, forcing failures, holding
//! requests behind a gate, and capturing every request for verification.

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
enum MockReply {
    Respond(HttpResponse),
    Fail(TransportError),
}

/// Mock transport for testing.
///
/// Replies are keyed by request path. A queued reply is used once; a sticky
/// reply answers every request to its path once the queue is empty. A
/// request with neither fails with [`TransportError::ConnectionFailed`].
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<HttpRequest>,
    queued: HashMap<String, VecDeque<MockReply>>,
    sticky: HashMap<String, MockReply>,
    gates: HashMap<String, Arc<Semaphore>>,
}

/// Holds requests to one path until released.
#[derive(Debug)]
pub struct MockGate {
    semaphore: Arc<Semaphore>,
}

impl MockGate {
    /// Let every held and future request through.
    pub fn release(&self) {
        self.semaphore.close();
    }
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `200 OK` JSON reply for the next request to `path`.
    pub fn queue_json(&self, path: &str, value: Value) {
        self.queue(path, MockReply::Respond(HttpResponse::json(&value)));
    }

    /// Queue a raw reply for the next request to `path`.
    pub fn queue_response(&self, path: &str, response: HttpResponse) {
        self.queue(path, MockReply::Respond(response));
    }

    /// Queue a reply with `status` and an empty body.
    pub fn queue_status(&self, path: &str, status: u16) {
        self.queue(path, MockReply::Respond(HttpResponse::new(status, Vec::new())));
    }

    /// Cause the next request to `path` to fail with the given error.
    pub fn fail_next(&self, path: &str, error: &str) {
        self.queue(
            path,
            MockReply::Fail(TransportError::ConnectionFailed(error.to_string())),
        );
    }

    /// Cause the next `count` requests to `path` to fail.
    pub fn fail_times(&self, path: &str, count: usize) {
        for i in 0..count {
            self.fail_next(path, &format!("forced failure {}", i + 1));
        }
    }

    /// Answer every request to `path` with `value` once its queue is empty.
    pub fn always_json(&self, path: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.sticky.insert(
            path.to_string(),
            MockReply::Respond(HttpResponse::json(&value)),
        );
    }

    /// Hold every request to `path` until the returned gate is released.
    pub fn gate(&self, path: &str) -> MockGate {
        let semaphore = Arc::new(Semaphore::new(0));
        let mut inner = self.inner.lock().unwrap();
        inner
            .gates
            .insert(path.to_string(), Arc::clone(&semaphore));
        MockGate { semaphore }
    }

    /// Get all requests that were made, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }

    /// Get the requests made to `path`.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner
            .requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Get the last request that was made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.last().cloned()
    }

    /// Clear all state (requests, replies, gates).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }

    fn queue(&self, path: &str, reply: MockReply) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(request.clone());
            inner.gates.get(&request.path).cloned()
        };

        if let Some(gate) = gate {
            // A released gate is closed, which makes acquire return at once
            let _ = gate.acquire().await;
        }

        let reply = {
            let mut inner = self.inner.lock().unwrap();
            let queued = inner
                .queued
                .get_mut(&request.path)
                .and_then(VecDeque::pop_front);
            queued.or_else(|| inner.sticky.get(&request.path).cloned())
        };

        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(error)) => Err(error),
            None => Err(TransportError::ConnectionFailed(format!(
                "no reply queued for {}",
                request.path
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_returns_queued_replies_in_order() {
        let transport = MockTransport::new();
        transport.queue_json("/contacts", json!(["alice"]));
        transport.queue_json("/contacts", json!(["alice", "bob"]));

        let r1 = transport.execute(&HttpRequest::get("/contacts")).await.unwrap();
        let r2 = transport.execute(&HttpRequest::get("/contacts")).await.unwrap();

        assert_eq!(r1.body, br#"["alice"]"#.to_vec());
        assert_eq!(r2.body, br#"["alice","bob"]"#.to_vec());
    }

    #[tokio::test]
    async fn mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.always_json("/messages", json!([]));

        let request = HttpRequest::get("/messages").with_query("since", "n1");
        transport.execute(&request).await.unwrap();

        assert_eq!(transport.requests(), vec![request.clone()]);
        assert_eq!(transport.last_request(), Some(request));
    }

    #[tokio::test]
    async fn replies_are_keyed_by_path() {
        let transport = MockTransport::new();
        transport.queue_json("/persona", json!("me"));
        transport.queue_json("/contacts", json!([]));

        let contacts = transport.execute(&HttpRequest::get("/contacts")).await.unwrap();
        let persona = transport.execute(&HttpRequest::get("/persona")).await.unwrap();

        assert_eq!(contacts.body, b"[]".to_vec());
        assert_eq!(persona.body, br#""me""#.to_vec());
    }

    #[tokio::test]
    async fn sticky_reply_follows_queue() {
        let transport = MockTransport::new();
        transport.always_json("/messages", json!([]));
        transport.queue_status("/messages", 503);

        let first = transport.execute(&HttpRequest::get("/messages")).await.unwrap();
        let second = transport.execute(&HttpRequest::get("/messages")).await.unwrap();
        let third = transport.execute(&HttpRequest::get("/messages")).await.unwrap();

        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 200);
    }

    // ===========================================
    // Failure Tests
    // ===========================================

    #[tokio::test]
    async fn unconfigured_path_fails() {
        let transport = MockTransport::new();
        let result = transport.execute(&HttpRequest::get("/persona")).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn fail_next_fails_once() {
        let transport = MockTransport::new();
        transport.fail_next("/persona", "network error");
        transport.queue_json("/persona", json!("me"));

        let result = transport.execute(&HttpRequest::get("/persona")).await;
        assert_eq!(
            result,
            Err(TransportError::ConnectionFailed("network error".into()))
        );
        assert!(transport.execute(&HttpRequest::get("/persona")).await.is_ok());
    }

    #[tokio::test]
    async fn fail_times_queues_several_failures() {
        let transport = MockTransport::new();
        transport.fail_times("/send", 2);
        transport.always_json("/send", json!(null));

        assert!(transport.execute(&HttpRequest::get("/send")).await.is_err());
        assert!(transport.execute(&HttpRequest::get("/send")).await.is_err());
        assert!(transport.execute(&HttpRequest::get("/send")).await.is_ok());
    }

    // ===========================================
    // Gate Tests
    // ===========================================

    #[tokio::test]
    async fn gate_holds_requests_until_released() {
        let transport = MockTransport::new();
        transport.always_json("/messages", json!([]));
        let gate = transport.gate("/messages");

        let pending = {
            let transport = transport.clone();
            tokio::spawn(async move {
                transport
                    .execute(&HttpRequest::get("/messages"))
                    .await
                    .map(|r| r.status)
            })
        };
        tokio::task::yield_now().await;

        // Recorded, but not answered yet
        assert_eq!(transport.requests_to("/messages").len(), 1);
        assert!(!pending.is_finished());

        gate.release();
        assert_eq!(pending.await.unwrap(), Ok(200));
    }

    // ===========================================
    // Clone and Reset Tests
    // ===========================================

    #[tokio::test]
    async fn clones_share_state() {
        let transport = MockTransport::new();
        let clone = transport.clone();
        transport.queue_json("/persona", json!("me"));

        clone.execute(&HttpRequest::get("/persona")).await.unwrap();

        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let transport = MockTransport::new();
        transport.always_json("/persona", json!("me"));
        transport.execute(&HttpRequest::get("/persona")).await.unwrap();

        transport.reset();

        assert!(transport.requests().is_empty());
        assert!(transport.execute(&HttpRequest::get("/persona")).await.is_err());
    }
}
