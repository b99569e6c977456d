//! Reactive store engine.
//!
//! - [`Store`]: an observable value with equality-gated updates and
//!   subscriber callbacks.
//! - [`Derived`]: a read-only value recomputed from one or more sources.
//! - [`Runtime`]: the dependency graph and flush scheduler shared by every
//!   node of one session.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! Nodes are single-threaded (`Rc<RefCell<..>>`). The [`Runtime`] keeps the
//! graph as explicit edges (source → dependents) plus a rank per node: a
//! store has rank 0, a derived node has `1 + max(rank of sources)`.
//!
//! A change marks the node's dependents dirty. A flush then recomputes dirty
//! nodes in ascending `(rank, id)` order, which is a topological order of the
//! DAG, and only after the graph has settled notifies subscribers of every
//! node that changed.
//!
//! # Invariants
//!
//! 1. Setting a value that is [`SameValue`] as the current one is a no-op
//!    (no recompute, no notification). `NaN` is the same value as `NaN`.
//! 2. A derived node recomputes at most once per flush pass, however many of
//!    its sources changed.
//! 3. Subscribers never observe a partially updated graph.
//! 4. Updates made inside [`Runtime::batch`] propagate in a single flush when
//!    the outermost batch returns. There is no implicit per-turn coalescing:
//!    a `set` outside a batch flushes at once, so callers group the writes of
//!    one event in a batch.
//! 5. A subscriber is called with the current value when it subscribes, then
//!    once per flush that leaves the value different from what it last saw.
//! 6. A subscribed [`Derived`] observes its sources, so lifecycle hooks of a
//!    [`Store`] run when the first observer anywhere downstream arrives.

mod derived;
mod runtime;
mod same_value;
mod store;

pub use derived::{Derived, Source};
pub use runtime::{NodeId, Runtime};
pub use same_value::SameValue;
pub use store::{Store, Subscription, Teardown};
