//! Resilient fetch: every request is retried until it succeeds.
//!
//! Transport errors, non-2xx statuses and undecodable bodies are all treated
//! as transient. Callers never see a failure; they see a value, eventually.
//! The one exception is a request body that cannot be encoded as JSON, which
//! no retry would fix and is returned before anything is sent.
//! Each failed attempt waits for the next delay of a fresh
//! [`relaychat_core::Backoff`] and reports to the connectivity store so the
//! UI can show that the relay is unreachable.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use relaychat_core::{Connectivity, Derived, FetchEvent, RetryPolicy, Runtime, Store};

use crate::transport::{HttpRequest, HttpTransport, TransportError};

/// Consecutive failures of one request after which retries are logged at
/// `warn` instead of `debug`.
pub const WARN_AFTER_ATTEMPTS: u32 = 5;

/// Why a request failed. Every variant except [`FetchError::Encode`] is
/// retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The transport could not complete the request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The relay answered with a non-2xx status.
    #[error("HTTP error: {0}")]
    Status(u16),

    /// The body was not the expected JSON.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request body could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Retry-forever wrapper around an [`HttpTransport`].
pub struct ResilientFetch<T> {
    transport: T,
    policy: RetryPolicy,
    connectivity: Store<Connectivity>,
}

impl<T: HttpTransport> ResilientFetch<T> {
    /// Wrap `transport`, publishing connectivity into a store of `runtime`.
    pub fn new(transport: T, policy: RetryPolicy, runtime: &Runtime) -> Self {
        Self {
            transport,
            policy,
            connectivity: Store::new(runtime, Connectivity::default()),
        }
    }

    /// Perform `request` until it returns a 2xx response whose body decodes
    /// as `R`.
    ///
    /// An empty body decodes as JSON `null`. The backoff starts from the
    /// base delay on every call.
    pub async fn request_as<R: DeserializeOwned>(&self, request: HttpRequest) -> R {
        let mut backoff = self.policy.backoff();
        loop {
            match self.attempt(&request).await {
                Ok(value) => {
                    self.report(FetchEvent::Succeeded);
                    return value;
                }
                Err(error) => {
                    let next_delay = backoff.next_delay();
                    let attempt = backoff.attempt();
                    if attempt >= WARN_AFTER_ATTEMPTS {
                        tracing::warn!(
                            "{} failed {} times in a row: {} (retrying in {:?})",
                            request.path,
                            attempt,
                            error,
                            next_delay
                        );
                    } else {
                        tracing::debug!(
                            "{} attempt {} failed: {} (retrying in {:?})",
                            request.path,
                            attempt,
                            error,
                            next_delay
                        );
                    }
                    self.report(FetchEvent::Failed {
                        attempt,
                        next_delay,
                    });
                    tokio::time::sleep(next_delay).await;
                }
            }
        }
    }

    /// Untyped form of [`request_as`](Self::request_as).
    pub async fn request(&self, request: HttpRequest) -> Value {
        self.request_as(request).await
    }

    /// `GET path?query` decoded as `R`.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> R {
        let request = query
            .iter()
            .fold(HttpRequest::get(path), |request, (key, value)| {
                request.with_query(*key, *value)
            });
        self.request_as(request).await
    }

    /// `POST path` with `body` as JSON, response decoded as `R`.
    ///
    /// Fails only if `body` cannot be encoded; the relay is never contacted
    /// in that case.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, FetchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| FetchError::Encode(e.to_string()))?;
        Ok(self.request_as(HttpRequest::post(path, body)).await)
    }

    /// Connectivity as seen by the most recent attempt of any request.
    pub fn connectivity(&self) -> Derived<Connectivity> {
        self.connectivity.read_only()
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The retry policy applied to every request.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt<R: DeserializeOwned>(&self, request: &HttpRequest) -> Result<R, FetchError> {
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }
        decode(&response.body)
    }

    fn report(&self, event: FetchEvent) {
        self.connectivity.update(|state| state.on_event(event));
    }
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, FetchError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, MockTransport};
    use serde::de::IgnoredAny;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn fetch(transport: &MockTransport) -> (Runtime, ResilientFetch<MockTransport>) {
        let runtime = Runtime::new();
        let fetch = ResilientFetch::new(transport.clone(), RetryPolicy::default(), &runtime);
        (runtime, fetch)
    }

    // ===========================================
    // Success Path
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let transport = MockTransport::new();
        transport.queue_json("/persona", json!("me"));
        let (_rt, fetch) = fetch(&transport);
        let start = Instant::now();

        let persona: String = fetch.get_json("/persona", &[]).await;

        assert_eq!(persona, "me");
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(fetch.connectivity().get(), Connectivity::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn query_parameters_are_forwarded() {
        let transport = MockTransport::new();
        transport.queue_json("/messages", json!([]));
        let (_rt, fetch) = fetch(&transport);

        let _: Vec<Value> = fetch.get_json("/messages", &[("since", "n5")]).await;

        let request = transport.last_request().unwrap();
        assert_eq!(request.query_param("since"), Some("n5"));
    }

    #[tokio::test(start_paused = true)]
    async fn post_sends_json_body() {
        let transport = MockTransport::new();
        transport.queue_json("/send", json!({"ok": true}));
        let (_rt, fetch) = fetch(&transport);

        let _: IgnoredAny = fetch
            .post_json("/send", &json!({"address": "bob", "message": "hi"}))
            .await
            .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.body,
            Some(json!({"address": "bob", "message": "hi"}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_body_decodes_as_null() {
        let transport = MockTransport::new();
        transport.queue_response("/send", HttpResponse::new(200, Vec::new()));
        let (_rt, fetch) = fetch(&transport);

        let ack: Option<String> = fetch.post_json("/send", &json!({})).await.unwrap();

        assert_eq!(ack, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unencodable_body_is_rejected_without_a_request() {
        let transport = MockTransport::new();
        transport.queue_json("/send", json!(null));
        let (_rt, fetch) = fetch(&transport);
        // JSON object keys must be strings
        let body: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();

        let result: Result<IgnoredAny, FetchError> = fetch.post_json("/send", &body).await;

        assert!(matches!(result, Err(FetchError::Encode(_))));
        assert!(transport.requests().is_empty());
        assert_eq!(fetch.connectivity().get(), Connectivity::Connecting);
    }

    // ===========================================
    // Retry Behaviour
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn delay_doubles_between_attempts() {
        let transport = MockTransport::new();
        transport.fail_times("/persona", 4);
        transport.queue_json("/persona", json!("me"));
        let (_rt, fetch) = fetch(&transport);
        let start = Instant::now();

        let persona: String = fetch.get_json("/persona", &[]).await;

        assert_eq!(persona, "me");
        // 100 + 200 + 400 + 800
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
        assert_eq!(transport.requests_to("/persona").len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_success_status_is_retried() {
        let transport = MockTransport::new();
        transport.queue_status("/contacts", 500);
        transport.queue_status("/contacts", 404);
        transport.queue_json("/contacts", json!(["alice"]));
        let (_rt, fetch) = fetch(&transport);

        let contacts: Vec<String> = fetch.get_json("/contacts", &[]).await;

        assert_eq!(contacts, vec!["alice"]);
        assert_eq!(transport.requests_to("/contacts").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_body_is_retried() {
        let transport = MockTransport::new();
        transport.queue_response("/contacts", HttpResponse::new(200, "<html>busy</html>"));
        transport.queue_json("/contacts", json!([]));
        let (_rt, fetch) = fetch(&transport);
        let start = Instant::now();

        let contacts: Vec<String> = fetch.get_json("/contacts", &[]).await;

        assert!(contacts.is_empty());
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_starts_from_base_delay() {
        let transport = MockTransport::new();
        transport.fail_times("/persona", 3);
        transport.queue_json("/persona", json!("me"));
        transport.fail_next("/persona", "blip");
        transport.queue_json("/persona", json!("me"));
        let (_rt, fetch) = fetch(&transport);

        let _: String = fetch.get_json("/persona", &[]).await;
        let start = Instant::now();
        let _: String = fetch.get_json("/persona", &[]).await;

        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    // ===========================================
    // Connectivity Reporting
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn connectivity_tracks_attempts() {
        let transport = MockTransport::new();
        transport.fail_times("/persona", 2);
        transport.queue_json("/persona", json!("me"));
        let (_rt, fetch) = fetch(&transport);

        let states = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&states);
        let _sub = fetch
            .connectivity()
            .subscribe(move |state| sink.borrow_mut().push(*state));

        let _: String = fetch.get_json("/persona", &[]).await;

        assert_eq!(
            *states.borrow(),
            vec![
                Connectivity::Connecting,
                Connectivity::Retrying {
                    attempt: 1,
                    next_delay: Duration::from_millis(100)
                },
                Connectivity::Retrying {
                    attempt: 2,
                    next_delay: Duration::from_millis(200)
                },
                Connectivity::Online,
            ]
        );
    }

    #[test]
    fn decode_handles_whitespace_body() {
        let value: Value = decode(b"  \n").unwrap();
        assert_eq!(value, Value::Null);
        assert!(matches!(
            decode::<Vec<String>>(b"{"),
            Err(FetchError::Decode(_))
        ));
    }
}
