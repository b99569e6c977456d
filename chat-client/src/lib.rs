//! # chat-client
//!
//! Polling client for relaychat.
//!
//! This is the library that applications use to talk to a relay and keep a
//! reactive view of the conversation state.
//!
//! ## Features
//!
//! - **Resilient Fetch**: every request is retried with exponential backoff
//!   until the relay answers; connectivity is published as a store
//! - **Message Sync**: cursor-based polling with nonce dedup and contact
//!   discovery
//! - **Reactive State**: contacts, log, ledger and derived views built on the
//!   chat-core store engine
//! - **Transport Abstraction**: pluggable HTTP layer (reqwest, mock)
//!
//! ## Example
//!
//! ```ignore
//! use relaychat_client::{ChatSession, ClientConfig, ReqwestTransport};
//!
//! let config = ClientConfig::from_file("relaychat.toml".as_ref())?;
//! let transport = ReqwestTransport::from_config(&config)?;
//! let session = Rc::new(ChatSession::start(&config, transport).await);
//!
//! let _counts = session.unseen_counts().subscribe(|counts| {
//!     println!("{} unseen", counts.total());
//! });
//! session.spawn_poller();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod fetch;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use fetch::{FetchError, ResilientFetch, WARN_AFTER_ATTEMPTS};
pub use session::{ChatSession, PollOutcome};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MockGate, MockTransport, ReqwestTransport,
    TransportError,
};
