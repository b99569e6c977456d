//! Dependency graph and flush scheduler.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of a node (store or derived) within one [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

/// Type-erased view of a node, used by the scheduler.
pub(crate) trait Node {
    /// Recompute the node's value from its sources. No-op for plain stores.
    fn recompute(&self);
    /// Deliver the current value to every subscriber.
    fn notify(&self);
}

/// Shared handle to the dependency graph of one session.
///
/// Cloning is cheap and every clone refers to the same graph.
///
/// There is no implicit end-of-turn coalescing: a `set` outside
/// [`batch`](Self::batch) flushes before it returns, so two plain sets in a
/// row recompute dependents twice. Group writes that belong to one event in
/// a single `batch`.
#[derive(Clone, Default)]
pub struct Runtime {
    graph: Rc<RefCell<Graph>>,
    /// Nodes dropped while the graph was borrowed, removed on the next pass.
    detached: Rc<RefCell<Vec<NodeId>>>,
}

#[derive(Default)]
struct Graph {
    next_id: u64,
    nodes: HashMap<NodeId, Weak<dyn Node>>,
    ranks: HashMap<NodeId, u32>,
    dependents: HashMap<NodeId, Vec<NodeId>>,
    sources: HashMap<NodeId, Vec<NodeId>>,
    /// Derived nodes waiting for recompute, in topological order.
    dirty: BTreeSet<(u32, NodeId)>,
    /// Nodes whose value changed since the last notification pass.
    changed: Vec<NodeId>,
    changed_set: HashSet<NodeId>,
    batch_depth: usize,
    flushing: bool,
    flushes: u64,
}

impl Runtime {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with flushing deferred until the outermost batch returns.
    ///
    /// All updates made inside propagate in a single flush, so each derived
    /// node recomputes at most once for the whole batch.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.graph.borrow_mut().batch_depth += 1;
        let guard = BatchGuard { runtime: self };
        let result = f();
        drop(guard);
        result
    }

    /// Number of completed flushes (diagnostics and tests).
    pub fn flush_count(&self) -> u64 {
        self.graph.borrow().flushes
    }

    /// Number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.borrow().nodes.len()
    }

    /// Whether two handles refer to the same graph.
    pub fn same_graph(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.graph, &other.graph)
    }

    pub(crate) fn allocate(&self, rank: u32) -> NodeId {
        self.reap();
        let mut graph = self.graph.borrow_mut();
        let id = NodeId(graph.next_id);
        graph.next_id += 1;
        graph.ranks.insert(id, rank);
        id
    }

    pub(crate) fn attach(&self, id: NodeId, node: Weak<dyn Node>) {
        self.graph.borrow_mut().nodes.insert(id, node);
    }

    pub(crate) fn add_edge(&self, source: NodeId, dependent: NodeId) {
        let mut graph = self.graph.borrow_mut();
        let entry = graph.dependents.entry(source).or_default();
        if !entry.contains(&dependent) {
            entry.push(dependent);
        }
        let entry = graph.sources.entry(dependent).or_default();
        if !entry.contains(&source) {
            entry.push(source);
        }
    }

    pub(crate) fn rank(&self, id: NodeId) -> u32 {
        self.graph.borrow().ranks.get(&id).copied().unwrap_or(0)
    }

    /// Forget a dropped node and every edge touching it.
    pub(crate) fn detach(&self, id: NodeId) {
        self.detached.borrow_mut().push(id);
        self.reap();
    }

    fn reap(&self) {
        let ids = std::mem::take(&mut *self.detached.borrow_mut());
        if ids.is_empty() {
            return;
        }
        match self.graph.try_borrow_mut() {
            Ok(mut graph) => {
                for id in ids {
                    graph.remove(id);
                }
            }
            Err(_) => self.detached.borrow_mut().extend(ids),
        }
    }

    /// Record that `id` changed value and schedule its dependents.
    pub(crate) fn mark_changed(&self, id: NodeId) {
        {
            let mut graph = self.graph.borrow_mut();
            if graph.changed_set.insert(id) {
                graph.changed.push(id);
            }
            let dependents = graph.dependents.get(&id).cloned().unwrap_or_default();
            for dependent in dependents {
                if let Some(rank) = graph.ranks.get(&dependent).copied() {
                    graph.dirty.insert((rank, dependent));
                }
            }
            if graph.batch_depth > 0 || graph.flushing {
                return;
            }
        }
        self.flush();
    }

    fn flush(&self) {
        self.graph.borrow_mut().flushing = true;
        let _guard = FlushGuard { runtime: self };

        loop {
            while let Some(node) = self.next_dirty() {
                node.recompute();
            }

            let changed = {
                let mut graph = self.graph.borrow_mut();
                graph.changed_set.clear();
                std::mem::take(&mut graph.changed)
            };
            if changed.is_empty() {
                break;
            }

            // Callbacks may write to stores; those writes land in the next pass.
            for id in changed {
                if let Some(node) = self.lookup(id) {
                    node.notify();
                }
            }
        }
    }

    fn next_dirty(&self) -> Option<Rc<dyn Node>> {
        let mut graph = self.graph.borrow_mut();
        loop {
            let first = graph.dirty.iter().next().copied()?;
            graph.dirty.remove(&first);
            if let Some(node) = graph.nodes.get(&first.1).and_then(Weak::upgrade) {
                return Some(node);
            }
        }
    }

    fn lookup(&self, id: NodeId) -> Option<Rc<dyn Node>> {
        self.graph.borrow().nodes.get(&id).and_then(Weak::upgrade)
    }

    fn has_pending(&self) -> bool {
        let graph = self.graph.borrow();
        !graph.dirty.is_empty() || !graph.changed.is_empty()
    }
}

impl Graph {
    fn remove(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        if let Some(rank) = self.ranks.remove(&id) {
            self.dirty.remove(&(rank, id));
        }
        self.dependents.remove(&id);
        for source in self.sources.remove(&id).unwrap_or_default() {
            if let Some(dependents) = self.dependents.get_mut(&source) {
                dependents.retain(|d| *d != id);
                if dependents.is_empty() {
                    self.dependents.remove(&source);
                }
            }
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph.borrow();
        f.debug_struct("Runtime")
            .field("nodes", &graph.nodes.len())
            .field("batch_depth", &graph.batch_depth)
            .field("flushes", &graph.flushes)
            .finish()
    }
}

struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let should_flush = {
            let mut graph = self.runtime.graph.borrow_mut();
            graph.batch_depth -= 1;
            graph.batch_depth == 0 && !graph.flushing
        };
        if should_flush && !std::thread::panicking() && self.runtime.has_pending() {
            self.runtime.flush();
        }
    }
}

struct FlushGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        {
            let mut graph = self.runtime.graph.borrow_mut();
            graph.flushing = false;
            graph.flushes += 1;
        }
        self.runtime.reap();
    }
}
