//! Observable value container.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{Node, NodeId, Runtime};
use super::{Derived, SameValue};

/// Teardown returned by a store's start hook, run on the last unsubscribe.
pub type Teardown = Box<dyn FnOnce()>;

/// Keeps one source of a derived node active while the guard lives.
pub(crate) type Activator = Box<dyn Fn() -> Subscription>;

type Callback<T> = Rc<dyn Fn(&T)>;
type StartHook<T> = Box<dyn FnMut(&Store<T>) -> Teardown>;

/// An observable value.
///
/// Cloning a `Store` yields another handle to the same value.
pub struct Store<T> {
    pub(crate) node: Rc<StoreNode<T>>,
}

struct Subscriber<T> {
    key: u64,
    callback: Callback<T>,
    /// Value handed over at subscribe time while a change was still pending.
    delivered: Option<T>,
}

pub(crate) struct StoreNode<T> {
    id: NodeId,
    runtime: Runtime,
    value: RefCell<T>,
    /// What subscribers last saw, kept from the first change until notify.
    baseline: RefCell<Option<T>>,
    subscribers: RefCell<Vec<Subscriber<T>>>,
    next_subscriber: Cell<u64>,
    /// Direct subscribers plus observed dependents.
    observers: Cell<usize>,
    start: RefCell<Option<StartHook<T>>>,
    stop: RefCell<Option<Teardown>>,
    /// Set for derived nodes only: one activator per source.
    pub(crate) upstream: RefCell<Vec<Activator>>,
    held: RefCell<Vec<Subscription>>,
    /// Set for derived nodes only.
    pub(crate) compute: RefCell<Option<Box<dyn Fn() -> T>>>,
}

impl<T: Clone + SameValue + 'static> Store<T> {
    /// Create a store holding `initial`.
    pub fn new(runtime: &Runtime, initial: T) -> Self {
        Self::with_rank(runtime, initial, 0)
    }

    /// Create a store whose `start` hook runs when the first observer
    /// arrives. The returned [`Teardown`] runs when the last one leaves.
    ///
    /// A subscribed [`Derived`] built on this store counts as an observer.
    pub fn with_lifecycle<F>(runtime: &Runtime, initial: T, start: F) -> Self
    where
        F: FnMut(&Store<T>) -> Teardown + 'static,
    {
        let store = Self::new(runtime, initial);
        *store.node.start.borrow_mut() = Some(Box::new(start));
        store
    }

    pub(crate) fn with_rank(runtime: &Runtime, initial: T, rank: u32) -> Self {
        let id = runtime.allocate(rank);
        let node = Rc::new(StoreNode {
            id,
            runtime: runtime.clone(),
            value: RefCell::new(initial),
            baseline: RefCell::new(None),
            subscribers: RefCell::new(Vec::new()),
            next_subscriber: Cell::new(0),
            observers: Cell::new(0),
            start: RefCell::new(None),
            stop: RefCell::new(None),
            upstream: RefCell::new(Vec::new()),
            held: RefCell::new(Vec::new()),
            compute: RefCell::new(None),
        });
        let weak: Weak<dyn Node> = Rc::downgrade(&node) as Weak<dyn Node>;
        runtime.attach(id, weak);
        Self { node }
    }

    /// Clone out the current value.
    pub fn get(&self) -> T {
        self.node.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// Do not write to this store from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.node.value.borrow())
    }

    /// Replace the value if it differs from the current one.
    pub fn set(&self, value: T) {
        self.node.replace(value);
    }

    /// Set the value to `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.node.value.borrow());
        self.set(next);
    }

    /// Register `callback`, calling it right away with the current value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Callback<T> = Rc::new(callback);
        self.acquire();

        let key = self.node.next_subscriber.get();
        self.node.next_subscriber.set(key + 1);

        let current = self.get();
        // Inside a batch the pending flush must not repeat this delivery
        let delivered = self.node.has_pending_change().then(|| current.clone());
        self.node.subscribers.borrow_mut().push(Subscriber {
            key,
            callback: Rc::clone(&callback),
            delivered,
        });
        callback(&current);

        let weak = Rc::downgrade(&self.node);
        Subscription::new(move || {
            if let Some(node) = weak.upgrade() {
                node.remove_subscriber(key);
                node.release();
            }
        })
    }

    /// Number of observers: subscribers plus subscribed derived values
    /// built on this store.
    pub fn subscriber_count(&self) -> usize {
        self.node.observers.get()
    }

    /// Read-only handle sharing this store's value.
    pub fn read_only(&self) -> Derived<T> {
        Derived::from_store(self.clone())
    }

    /// Graph identifier of this store.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// The runtime this store belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.node.runtime
    }

    /// Count a dependent as an observer until the guard is dropped.
    pub(crate) fn observe(&self) -> Subscription {
        self.acquire();
        let weak = Rc::downgrade(&self.node);
        Subscription::new(move || {
            if let Some(node) = weak.upgrade() {
                node.release();
            }
        })
    }

    fn acquire(&self) {
        let observers = self.node.observers.get() + 1;
        self.node.observers.set(observers);
        if observers == 1 {
            self.activate();
        }
    }

    fn activate(&self) {
        // Sources first, so a start hook sees live upstream values
        let held: Vec<Subscription> = self
            .node
            .upstream
            .borrow()
            .iter()
            .map(|activate| activate())
            .collect();
        *self.node.held.borrow_mut() = held;

        let hook = self.node.start.borrow_mut().take();
        if let Some(mut hook) = hook {
            let teardown = hook(self);
            *self.node.stop.borrow_mut() = Some(teardown);
            *self.node.start.borrow_mut() = Some(hook);
        }
    }
}

impl<T: Clone + SameValue + 'static> StoreNode<T> {
    fn replace(&self, value: T) {
        {
            let mut current = self.value.borrow_mut();
            if current.same_value(&value) {
                return;
            }
            let previous = std::mem::replace(&mut *current, value);
            let mut baseline = self.baseline.borrow_mut();
            if baseline.is_none() {
                *baseline = Some(previous);
            }
        }
        self.runtime.mark_changed(self.id);
    }

    fn has_pending_change(&self) -> bool {
        self.baseline.borrow().is_some()
    }

    fn remove_subscriber(&self, key: u64) {
        self.subscribers.borrow_mut().retain(|s| s.key != key);
    }

    fn release(&self) {
        let observers = self.observers.get().saturating_sub(1);
        self.observers.set(observers);
        if observers > 0 {
            return;
        }
        let teardown = self.stop.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
        let upstream = self.held.take();
        drop(upstream);
    }
}

impl<T: Clone + SameValue + 'static> Node for StoreNode<T> {
    fn recompute(&self) {
        let next = {
            let compute = self.compute.borrow();
            match compute.as_ref() {
                Some(compute) => compute(),
                None => return,
            }
        };
        self.replace(next);
    }

    fn notify(&self) {
        let baseline = self.baseline.borrow_mut().take();
        if self.subscribers.borrow().is_empty() {
            return;
        }
        let value = self.value.borrow().clone();
        // Changed and changed back within one flush: nothing to report
        let reverted = baseline.is_some_and(|b| b.same_value(&value));

        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .borrow_mut()
            .iter_mut()
            .filter_map(|s| {
                let stale = match s.delivered.take() {
                    Some(delivered) => !delivered.same_value(&value),
                    None => !reverted,
                };
                stale.then(|| Rc::clone(&s.callback))
            })
            .collect();
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T> Drop for StoreNode<T> {
    fn drop(&mut self) {
        if let Some(teardown) = self.stop.get_mut().take() {
            teardown();
        }
        self.runtime.detach(self.id);
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.node.id)
            .field("value", &self.node.value.borrow())
            .finish()
    }
}

/// Handle returned by `subscribe`. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
