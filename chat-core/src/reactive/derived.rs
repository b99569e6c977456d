//! Values computed from other stores.

use std::fmt;

use super::runtime::{NodeId, Runtime};
use super::store::{Activator, Store, Subscription};
use super::SameValue;

/// Anything a [`Derived`] can read from: a [`Store`] or another [`Derived`].
pub trait Source<T>: Clone + 'static {
    /// Graph identifier of the source.
    fn node_id(&self) -> NodeId;
    /// Runtime the source belongs to.
    fn source_runtime(&self) -> &Runtime;
    /// Borrow the current value.
    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R;
    /// Count a dependent as an observer of this source until the returned
    /// guard is dropped.
    fn activate(&self) -> Subscription;
}

impl<T: Clone + SameValue + 'static> Source<T> for Store<T> {
    fn node_id(&self) -> NodeId {
        self.id()
    }

    fn source_runtime(&self) -> &Runtime {
        self.runtime()
    }

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with(f)
    }

    fn activate(&self) -> Subscription {
        self.observe()
    }
}

impl<T: Clone + SameValue + 'static> Source<T> for Derived<T> {
    fn node_id(&self) -> NodeId {
        self.store.id()
    }

    fn source_runtime(&self) -> &Runtime {
        self.store.runtime()
    }

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.store.with(f)
    }

    fn activate(&self) -> Subscription {
        self.store.observe()
    }
}

/// A read-only value recomputed whenever one of its sources changes.
///
/// The combining function must be pure: it is called once at construction
/// and then at most once per flush in which a source changed. The value is
/// kept current whether or not anyone subscribes. While it has subscribers
/// it observes each of its sources, so their lifecycle hooks run.
///
/// [`Store::read_only`] also hands out a `Derived` with no sources, so a
/// store can be exposed without exposing `set`.
pub struct Derived<T> {
    store: Store<T>,
}

impl<T: Clone + SameValue + 'static> Derived<T> {
    /// Derive a value from a single source.
    pub fn map<A, S>(source: &S, f: impl Fn(&A) -> T + 'static) -> Self
    where
        S: Source<A>,
    {
        let a = source.clone();
        Self::from_sources(
            source.source_runtime(),
            &[source.node_id()],
            vec![activator::<A, _>(source)],
            Box::new(move || a.with_value(|a| f(a))),
        )
    }

    /// Derive a value from two sources.
    pub fn combine2<A, B, SA, SB>(a: &SA, b: &SB, f: impl Fn(&A, &B) -> T + 'static) -> Self
    where
        SA: Source<A>,
        SB: Source<B>,
    {
        let (sa, sb) = (a.clone(), b.clone());
        Self::from_sources(
            a.source_runtime(),
            &[a.node_id(), b.node_id()],
            vec![activator::<A, _>(a), activator::<B, _>(b)],
            Box::new(move || sa.with_value(|a| sb.with_value(|b| f(a, b)))),
        )
    }

    /// Derive a value from three sources.
    pub fn combine3<A, B, C, SA, SB, SC>(
        a: &SA,
        b: &SB,
        c: &SC,
        f: impl Fn(&A, &B, &C) -> T + 'static,
    ) -> Self
    where
        SA: Source<A>,
        SB: Source<B>,
        SC: Source<C>,
    {
        let (sa, sb, sc) = (a.clone(), b.clone(), c.clone());
        Self::from_sources(
            a.source_runtime(),
            &[a.node_id(), b.node_id(), c.node_id()],
            vec![
                activator::<A, _>(a),
                activator::<B, _>(b),
                activator::<C, _>(c),
            ],
            Box::new(move || {
                sa.with_value(|a| sb.with_value(|b| sc.with_value(|c| f(a, b, c))))
            }),
        )
    }

    pub(crate) fn from_store(store: Store<T>) -> Self {
        Self { store }
    }

    fn from_sources(
        runtime: &Runtime,
        sources: &[NodeId],
        upstream: Vec<Activator>,
        compute: Box<dyn Fn() -> T>,
    ) -> Self {
        let rank = 1 + sources
            .iter()
            .map(|id| runtime.rank(*id))
            .max()
            .unwrap_or(0);
        let store = Store::with_rank(runtime, compute(), rank);
        *store.node.compute.borrow_mut() = Some(compute);
        *store.node.upstream.borrow_mut() = upstream;
        for source in sources {
            runtime.add_edge(*source, store.id());
        }
        Self { store }
    }

    /// Clone out the current value.
    pub fn get(&self) -> T {
        self.store.get()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.store.with(f)
    }

    /// Register `callback`, calling it right away with the current value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.store.subscribe(callback)
    }

    /// Number of observers, counted as for [`Store::subscriber_count`].
    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }

    /// Graph identifier of this node.
    pub fn id(&self) -> NodeId {
        self.store.id()
    }
}

fn activator<A, S: Source<A>>(source: &S) -> Activator {
    let source = source.clone();
    Box::new(move || source.activate())
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Derived").field(&self.store).finish()
    }
}
