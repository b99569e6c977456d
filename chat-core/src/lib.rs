//! # chat-core
//!
//! Pure logic for relaychat (no I/O, instant tests).
//!
//! This crate implements the state containers and algorithms of the client
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The one exception is the [`reactive`] engine, whose
//! only side effect is calling subscriber callbacks.
//!
//! The actual I/O (HTTP requests, timers) is performed by `chat-client`, which
//! feeds the results into these structures through [`reactive::Store`]s.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod connectivity;
pub mod contacts;
pub mod ledger;
pub mod log;
pub mod outbox;
pub mod reactive;
pub mod seen;
pub mod views;

pub use backoff::{Backoff, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_GROWTH_FACTOR};
pub use connectivity::{Connectivity, FetchEvent};
pub use contacts::{ContactAdded, ContactList};
pub use ledger::{LedgerOrigin, PendingLedger};
pub use log::MessageLog;
pub use outbox::{Outbox, OutboxState, OutgoingMessage};
pub use reactive::{Derived, NodeId, Runtime, SameValue, Source, Store, Subscription, Teardown};
pub use seen::SeenNonces;
pub use views::UnseenCounts;
