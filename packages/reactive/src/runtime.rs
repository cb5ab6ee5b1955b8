//! The reactive runtime: an arena of graph nodes plus the scheduler that
//! drives them.
//!
//! Freshness is tracked with a logical clock instead of a dirty bit. Every
//! write bumps the clock; every node remembers when it last changed, last
//! ran, and last verified itself. A consumer is stale exactly when one of
//! its sources changed after the consumer's last run, which gives
//! glitch-freedom (at most one recompute per node per flush) without any
//! separate invalidation sweep.

use std::cell::{Cell, RefCell};
use std::hash::BuildHasherDefault;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHasher};
use slab::Slab;
use smallvec::SmallVec;

use crate::error::ReactivityError;

pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// How many times one effect may run within a single flush before the
/// scheduler declares a circular dependency.
pub const MAX_EFFECT_RUNS_PER_FLUSH: u32 = 128;

/// Identifies a node (signal, computed or effect) within its runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Identifies an ownership scope within its runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) usize);

pub(crate) type CleanupFn = Box<dyn FnOnce()>;
pub(crate) type CleanupList = Rc<RefCell<Vec<CleanupFn>>>;
pub(crate) type ErrorHook = Rc<dyn Fn(ReactivityError)>;

/// A computation owned by a graph node. The closure captures its own typed
/// value slot; `run` reports whether the value changed.
pub(crate) trait AnyComputation {
    fn run(&self) -> bool;
}

pub(crate) enum NodeKind {
    Signal,
    Memo {
        f: Rc<dyn AnyComputation>,
        eager: bool,
    },
    Effect {
        f: Rc<dyn AnyComputation>,
        cleanups: CleanupList,
        on_error: Option<ErrorHook>,
    },
}

pub(crate) struct ReactiveNode {
    pub(crate) kind: NodeKind,
    /// Clock value at which this node's value last changed.
    pub(crate) changed_at: u64,
    /// Clock value at which this node's computation last ran.
    pub(crate) ran_at: u64,
    /// Clock value at which freshness was last verified.
    pub(crate) checked_at: u64,
}

struct ScopeData {
    parent: Option<ScopeId>,
    children: SmallVec<[ScopeId; 4]>,
    owned: Vec<NodeId>,
    cleanups: Vec<CleanupFn>,
}

enum CleanupTarget {
    Effect(CleanupList),
    Scope(ScopeId),
}

/// One reactive graph. The default root runtime lives in a thread-local;
/// additional runtimes back isolated contexts.
pub struct Runtime {
    pub(crate) name: String,
    weak_self: std::rc::Weak<Runtime>,
    nodes: RefCell<Slab<ReactiveNode>>,
    /// producer -> consumers
    subscribers: RefCell<FxHashMap<usize, FxIndexSet<usize>>>,
    /// consumer -> producers
    sources: RefCell<FxHashMap<usize, FxIndexSet<usize>>>,
    observer: Cell<Option<NodeId>>,
    clock: Cell<u64>,
    scopes: RefCell<Slab<ScopeData>>,
    scope_stack: RefCell<Vec<ScopeId>>,
    /// Innermost-last registration targets for `on_cleanup`: effect runs
    /// and active scopes interleave here in nesting order.
    cleanup_stack: RefCell<Vec<CleanupTarget>>,
    batch_depth: Cell<usize>,
    pending_effects: RefCell<FxIndexSet<usize>>,
    flushing: Cell<bool>,
    flush_runs: RefCell<FxHashMap<usize, u32>>,
}

thread_local! {
    static BASE_RUNTIME: Rc<Runtime> = Runtime::new("root");
    static RUNTIME_STACK: RefCell<Vec<Rc<Runtime>>> = const { RefCell::new(Vec::new()) };
    static SSR_MODE: Cell<bool> = const { Cell::new(false) };
}

/// The runtime new nodes are created in: the innermost active context, or
/// the thread's root runtime.
pub(crate) fn current_runtime() -> Rc<Runtime> {
    RUNTIME_STACK
        .with(|stack| stack.borrow().last().cloned())
        .unwrap_or_else(|| BASE_RUNTIME.with(Rc::clone))
}

pub(crate) fn push_runtime(rt: Rc<Runtime>) {
    RUNTIME_STACK.with(|stack| stack.borrow_mut().push(rt));
}

pub(crate) fn pop_runtime() {
    RUNTIME_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Whether the runtime is in server-rendering mode. The flag inverts the
/// selective-rendering helpers and disables mount-time subscriptions.
pub fn is_ssr() -> bool {
    SSR_MODE.with(|flag| flag.get())
}

/// Toggles server-rendering mode.
pub fn set_ssr_mode(on: bool) {
    SSR_MODE.with(|flag| flag.set(on));
}

impl Runtime {
    pub(crate) fn new(name: impl Into<String>) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|weak| Self {
            name,
            weak_self: weak.clone(),
            nodes: RefCell::new(Slab::new()),
            subscribers: RefCell::new(FxHashMap::default()),
            sources: RefCell::new(FxHashMap::default()),
            observer: Cell::new(None),
            clock: Cell::new(1),
            scopes: RefCell::new(Slab::new()),
            scope_stack: RefCell::new(Vec::new()),
            cleanup_stack: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_effects: RefCell::new(FxIndexSet::default()),
            flushing: Cell::new(false),
            flush_runs: RefCell::new(FxHashMap::default()),
        })
    }

    fn rc(&self) -> Rc<Runtime> {
        self.weak_self.upgrade().expect("runtime is alive")
    }

    fn bump_clock(&self) -> u64 {
        let next = self.clock.get() + 1;
        self.clock.set(next);
        next
    }

    // ---- node management ----

    pub(crate) fn insert_node(&self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.borrow_mut().insert(ReactiveNode {
            kind,
            changed_at: 0,
            ran_at: 0,
            checked_at: 0,
        }));
        if let Some(scope) = self.scope_stack.borrow().last().copied() {
            if let Some(data) = self.scopes.borrow_mut().get_mut(scope.0) {
                data.owned.push(id);
            }
        }
        tracing::trace!(runtime = %self.name, node = id.0, "created reactive node");
        id
    }

    /// Removes a node and scrubs every edge that mentions it, so a reused
    /// slab slot can never be confused with the old node.
    pub(crate) fn dispose_node(&self, id: NodeId) {
        let taken = {
            let mut nodes = self.nodes.borrow_mut();
            if !nodes.contains(id.0) {
                return;
            }
            nodes.remove(id.0)
        };
        if let NodeKind::Effect { cleanups, .. } = &taken.kind {
            let pending: Vec<CleanupFn> = cleanups.borrow_mut().drain(..).collect();
            for cleanup in pending.into_iter().rev() {
                cleanup();
            }
        }
        let my_sources = self.sources.borrow_mut().remove(&id.0);
        if let Some(my_sources) = my_sources {
            let mut subscribers = self.subscribers.borrow_mut();
            for source in my_sources {
                if let Some(set) = subscribers.get_mut(&source) {
                    set.shift_remove(&id.0);
                }
            }
        }
        let my_subscribers = self.subscribers.borrow_mut().remove(&id.0);
        if let Some(my_subscribers) = my_subscribers {
            let mut sources = self.sources.borrow_mut();
            for subscriber in my_subscribers {
                if let Some(set) = sources.get_mut(&subscriber) {
                    set.shift_remove(&id.0);
                }
            }
        }
        self.pending_effects.borrow_mut().shift_remove(&id.0);
        tracing::trace!(runtime = %self.name, node = id.0, "disposed reactive node");
    }

    // ---- dependency tracking ----

    pub(crate) fn track(&self, id: NodeId) {
        if let Some(observer) = self.observer.get() {
            self.subscribers
                .borrow_mut()
                .entry(id.0)
                .or_default()
                .insert(observer.0);
            self.sources
                .borrow_mut()
                .entry(observer.0)
                .or_default()
                .insert(id.0);
        }
    }

    fn clear_sources(&self, id: NodeId) {
        let old = self.sources.borrow_mut().remove(&id.0);
        if let Some(old) = old {
            let mut subscribers = self.subscribers.borrow_mut();
            for source in old {
                if let Some(set) = subscribers.get_mut(&source) {
                    set.shift_remove(&id.0);
                }
            }
        }
    }

    pub(crate) fn untrack<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = ObserverGuard::replace(self, None);
        f()
    }

    // ---- change propagation ----

    /// Records a change on `id` (a signal) and schedules every transitively
    /// reachable effect, then flushes unless a batch or flush is active.
    pub(crate) fn notify(&self, id: NodeId) {
        let now = self.bump_clock();
        {
            let mut nodes = self.nodes.borrow_mut();
            let Some(node) = nodes.get_mut(id.0) else { return };
            node.changed_at = now;
        }
        self.schedule_dependents(id);
        self.run_effects();
    }

    /// Breadth-first over the subscriber edges, so sibling effects keep
    /// their subscription order in the queue.
    fn schedule_dependents(&self, id: NodeId) {
        let observer = self.observer.get();
        let mut visited: FxIndexSet<usize> = FxIndexSet::default();
        let mut queue: std::collections::VecDeque<usize> = {
            let subscribers = self.subscribers.borrow();
            subscribers
                .get(&id.0)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        };
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let enqueue = {
                let nodes = self.nodes.borrow();
                match nodes.get(current).map(|n| &n.kind) {
                    Some(NodeKind::Effect { .. }) => observer != Some(NodeId(current)),
                    Some(NodeKind::Memo { eager: true, .. }) => true,
                    _ => false,
                }
            };
            if enqueue {
                self.pending_effects.borrow_mut().insert(current);
            }
            let subscribers = self.subscribers.borrow();
            if let Some(children) = subscribers.get(&current) {
                queue.extend(children.iter().copied());
            }
        }
    }

    /// Drains the pending-effect queue in FIFO order. Effects scheduled
    /// while the flush is running are appended and drained in the same
    /// flush. No-op while batching or already flushing.
    pub(crate) fn run_effects(&self) {
        if self.batch_depth.get() > 0 || self.flushing.get() {
            return;
        }
        self.flushing.set(true);
        loop {
            let next = {
                let mut pending = self.pending_effects.borrow_mut();
                if pending.is_empty() {
                    None
                } else {
                    pending.shift_remove_index(0)
                }
            };
            let Some(id) = next else { break };
            let runs = {
                let mut flush_runs = self.flush_runs.borrow_mut();
                let runs = flush_runs.entry(id).or_insert(0);
                *runs += 1;
                *runs
            };
            if runs > MAX_EFFECT_RUNS_PER_FLUSH {
                self.report_effect_error(
                    NodeId(id),
                    ReactivityError::CircularDependency { runs },
                );
                continue;
            }
            self.update_if_necessary(NodeId(id));
        }
        self.flush_runs.borrow_mut().clear();
        self.flushing.set(false);
    }

    pub(crate) fn enter_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    pub(crate) fn exit_batch(&self) {
        let depth = self.batch_depth.get();
        debug_assert!(depth > 0, "unbalanced batch");
        self.batch_depth.set(depth.saturating_sub(1));
        if depth == 1 {
            self.run_effects();
        }
    }

    /// Re-runs `id` if any of its sources changed since `id` last ran.
    /// Sources are refreshed recursively first, so a consumer only ever
    /// observes settled upstream values.
    pub(crate) fn update_if_necessary(&self, id: NodeId) {
        let now = self.clock.get();
        let (is_computation, ran_at, checked_at) = {
            let nodes = self.nodes.borrow();
            let Some(node) = nodes.get(id.0) else { return };
            (
                !matches!(node.kind, NodeKind::Signal),
                node.ran_at,
                node.checked_at,
            )
        };
        if !is_computation || checked_at >= now {
            return;
        }
        let mut must_run = ran_at == 0;
        if !must_run {
            let source_list: Vec<usize> = {
                let sources = self.sources.borrow();
                sources
                    .get(&id.0)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default()
            };
            for source in source_list {
                self.update_if_necessary(NodeId(source));
                let changed = {
                    let nodes = self.nodes.borrow();
                    nodes
                        .get(source)
                        .map(|n| n.changed_at > ran_at)
                        .unwrap_or(false)
                };
                if changed {
                    must_run = true;
                    break;
                }
            }
        }
        if must_run {
            self.run_computation(id);
        }
        if let Some(node) = self.nodes.borrow_mut().get_mut(id.0) {
            node.checked_at = self.clock.get();
        }
    }

    fn run_computation(&self, id: NodeId) {
        // a computation must see its own runtime as current, even when the
        // re-run is triggered from outside any `with_context` frame
        push_runtime(self.rc());
        let _runtime = RuntimePopGuard;

        enum Job {
            Memo(Rc<dyn AnyComputation>),
            Effect(Rc<dyn AnyComputation>, CleanupList, Option<ErrorHook>),
        }
        let job = {
            let nodes = self.nodes.borrow();
            match nodes.get(id.0).map(|n| &n.kind) {
                Some(NodeKind::Memo { f, .. }) => Job::Memo(f.clone()),
                Some(NodeKind::Effect {
                    f,
                    cleanups,
                    on_error,
                }) => Job::Effect(f.clone(), cleanups.clone(), on_error.clone()),
                _ => return,
            }
        };
        match job {
            Job::Memo(f) => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let _observer = ObserverGuard::replace(self, Some(id));
                    self.clear_sources(id);
                    f.run()
                }));
                match result {
                    Ok(changed) => {
                        let now = self.clock.get();
                        let mut nodes = self.nodes.borrow_mut();
                        if let Some(node) = nodes.get_mut(id.0) {
                            node.ran_at = now;
                            if changed {
                                node.changed_at = now;
                            }
                        }
                    }
                    Err(payload) => {
                        // stay dirty: the next read must retry the compute
                        if let Some(node) = self.nodes.borrow_mut().get_mut(id.0) {
                            node.ran_at = 0;
                        }
                        panic::resume_unwind(payload);
                    }
                }
            }
            Job::Effect(f, cleanups, on_error) => {
                {
                    let now = self.clock.get();
                    let mut nodes = self.nodes.borrow_mut();
                    if let Some(node) = nodes.get_mut(id.0) {
                        node.ran_at = now;
                    }
                }
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let pending: Vec<CleanupFn> =
                        cleanups.borrow_mut().drain(..).collect();
                    for cleanup in pending.into_iter().rev() {
                        cleanup();
                    }
                    let _sink = SinkGuard::push(self, cleanups.clone());
                    let _observer = ObserverGuard::replace(self, Some(id));
                    self.clear_sources(id);
                    f.run();
                }));
                if let Err(payload) = result {
                    let message = panic_message(payload);
                    let error = ReactivityError::EffectFailed { message };
                    match on_error {
                        Some(hook) => hook(error),
                        None => {
                            tracing::error!(runtime = %self.name, node = id.0, "{error}")
                        }
                    }
                }
            }
        }
    }

    /// Runs an effect node for the first time. Scheduling triggered by the
    /// initial run is deferred until it completes, so a write inside the
    /// body can never re-enter the effect while it is still on the stack.
    pub(crate) fn run_effect_now(&self, id: NodeId) {
        self.enter_batch();
        self.run_computation(id);
        if let Some(node) = self.nodes.borrow_mut().get_mut(id.0) {
            node.checked_at = self.clock.get();
        }
        self.exit_batch();
    }

    fn report_effect_error(&self, id: NodeId, error: ReactivityError) {
        let hook = {
            let nodes = self.nodes.borrow();
            match nodes.get(id.0).map(|n| &n.kind) {
                Some(NodeKind::Effect { on_error, .. }) => on_error.clone(),
                _ => None,
            }
        };
        match hook {
            Some(hook) => hook(error),
            None => tracing::error!(runtime = %self.name, node = id.0, "{error}"),
        }
    }

    // ---- cleanups ----

    /// Registers a cleanup with the innermost active target: the running
    /// effect's cleanup list, or the ownership scope currently being set up
    /// inside it, whichever is deeper.
    pub(crate) fn register_cleanup(&self, cleanup: CleanupFn) {
        let target = {
            let stack = self.cleanup_stack.borrow();
            match stack.last() {
                Some(CleanupTarget::Effect(list)) => Some(Ok(list.clone())),
                Some(CleanupTarget::Scope(id)) => Some(Err(*id)),
                None => None,
            }
        };
        match target {
            Some(Ok(list)) => list.borrow_mut().push(cleanup),
            Some(Err(scope)) => {
                if let Some(data) = self.scopes.borrow_mut().get_mut(scope.0) {
                    data.cleanups.push(cleanup);
                }
            }
            None => tracing::trace!(
                runtime = %self.name,
                "on_cleanup called outside an effect or scope; dropping"
            ),
        }
    }

    // ---- ownership scopes ----

    pub(crate) fn create_scope(&self) -> ScopeId {
        let parent = self.scope_stack.borrow().last().copied();
        let id = ScopeId(self.scopes.borrow_mut().insert(ScopeData {
            parent,
            children: SmallVec::new(),
            owned: Vec::new(),
            cleanups: Vec::new(),
        }));
        if let Some(parent) = parent {
            if let Some(data) = self.scopes.borrow_mut().get_mut(parent.0) {
                data.children.push(id);
            }
        }
        id
    }

    pub(crate) fn with_scope<T>(&self, id: ScopeId, f: impl FnOnce() -> T) -> T {
        self.scope_stack.borrow_mut().push(id);
        self.cleanup_stack
            .borrow_mut()
            .push(CleanupTarget::Scope(id));
        let _guard = ScopePopGuard(self);
        f()
    }

    /// Disposes a scope: children first (most recent first), then the
    /// scope's own cleanups in reverse registration order, then every owned
    /// node. Idempotent.
    pub(crate) fn dispose_scope(&self, id: ScopeId) {
        let data = {
            let mut scopes = self.scopes.borrow_mut();
            if !scopes.contains(id.0) {
                return;
            }
            scopes.remove(id.0)
        };
        if let Some(parent) = data.parent {
            if let Some(parent_data) = self.scopes.borrow_mut().get_mut(parent.0) {
                parent_data.children.retain(|c| *c != id);
            }
        }
        for child in data.children.into_iter().rev() {
            self.dispose_scope(child);
        }
        for cleanup in data.cleanups.into_iter().rev() {
            cleanup();
        }
        for node in data.owned.into_iter().rev() {
            self.dispose_node(node);
        }
    }

    /// Tears down every node and scope in this runtime.
    pub(crate) fn reset(&self) {
        let roots: Vec<ScopeId> = {
            let scopes = self.scopes.borrow();
            scopes
                .iter()
                .filter(|(_, data)| data.parent.is_none())
                .map(|(key, _)| ScopeId(key))
                .collect()
        };
        for root in roots {
            self.dispose_scope(root);
        }
        let remaining: Vec<NodeId> = {
            let nodes = self.nodes.borrow();
            nodes.iter().map(|(key, _)| NodeId(key)).collect()
        };
        for node in remaining {
            self.dispose_node(node);
        }
        self.pending_effects.borrow_mut().clear();
        self.sources.borrow_mut().clear();
        self.subscribers.borrow_mut().clear();
        tracing::debug!(runtime = %self.name, "reset reactive context");
    }
}

struct ObserverGuard<'a> {
    runtime: &'a Runtime,
    previous: Option<NodeId>,
}

impl<'a> ObserverGuard<'a> {
    fn replace(runtime: &'a Runtime, observer: Option<NodeId>) -> Self {
        let previous = runtime.observer.replace(observer);
        Self { runtime, previous }
    }
}

impl Drop for ObserverGuard<'_> {
    fn drop(&mut self) {
        self.runtime.observer.set(self.previous);
    }
}

struct SinkGuard<'a>(&'a Runtime);

impl<'a> SinkGuard<'a> {
    fn push(runtime: &'a Runtime, sink: CleanupList) -> Self {
        runtime
            .cleanup_stack
            .borrow_mut()
            .push(CleanupTarget::Effect(sink));
        Self(runtime)
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        self.0.cleanup_stack.borrow_mut().pop();
    }
}

struct ScopePopGuard<'a>(&'a Runtime);

impl Drop for ScopePopGuard<'_> {
    fn drop(&mut self) {
        self.0.scope_stack.borrow_mut().pop();
        self.0.cleanup_stack.borrow_mut().pop();
    }
}

struct RuntimePopGuard;

impl Drop for RuntimePopGuard {
    fn drop(&mut self) {
        pop_runtime();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---- free functions over the current runtime ----

/// Defers all effect scheduling until `f` returns, then flushes once.
/// Nested batches flush at the outermost boundary.
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    let rt = current_runtime();
    rt.enter_batch();
    let _guard = BatchGuard(rt);
    f()
}

struct BatchGuard(Rc<Runtime>);

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.0.exit_batch();
    }
}

/// Runs `f` with dependency tracking suspended: reads inside do not
/// register the surrounding effect or computed as a dependent.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    current_runtime().untrack(f)
}

/// Registers a cleanup with the running effect (or the current ownership
/// scope at top level). Cleanups fire in reverse registration order before
/// the next run and on disposal.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    current_runtime().register_cleanup(Box::new(cleanup));
}

/// An ownership scope disposer. Dropping it does nothing; call
/// [`ScopeDisposer::dispose`] to tear the scope down.
#[must_use = "a scope leaks its signals and effects until disposed"]
pub struct ScopeDisposer {
    runtime: Rc<Runtime>,
    id: ScopeId,
}

impl ScopeDisposer {
    pub fn dispose(self) {
        self.runtime.dispose_scope(self.id);
    }
}

/// Creates a child ownership scope, runs `f` inside it, and returns the
/// result along with a disposer for everything created within.
pub fn run_scope_undisposed<T>(f: impl FnOnce() -> T) -> (T, ScopeDisposer) {
    let rt = current_runtime();
    let id = rt.create_scope();
    let value = rt.with_scope(id, f);
    (value, ScopeDisposer { runtime: rt, id })
}
