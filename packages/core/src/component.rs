//! Components: a setup function run inside its own reactive scope, with
//! mount/unmount lifecycle callbacks.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use pulse_dom::{document, Dom, NodeId, Value};
use pulse_reactive::{is_ssr, on_cleanup, run_scope_undisposed, ScopeDisposer};
use rustc_hash::FxHashMap;

use crate::view::{insert_view, IntoView, View};

/// Untyped component inputs, keyed by name.
#[derive(Clone, Default)]
pub struct Props {
    entries: FxHashMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or(Value::Null)
    }

    /// The prop value, or `default` when the prop is absent or null.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.entries.get(key) {
            Some(Value::Null) | None => default.into(),
            Some(value) => value.clone(),
        }
    }
}

struct MountContext {
    mount: Vec<Box<dyn FnOnce()>>,
}

thread_local! {
    static MOUNT_CONTEXTS: RefCell<Vec<Rc<RefCell<MountContext>>>> =
        const { RefCell::new(Vec::new()) };
    /// node -> scope torn down when that node is unmounted
    static LIFECYCLE: RefCell<FxHashMap<usize, ScopeDisposer>> =
        RefCell::new(FxHashMap::default());
}

/// Handle passed to a component's setup function.
pub struct ComponentCtx {
    pub props: Props,
    context: Rc<RefCell<MountContext>>,
}

impl ComponentCtx {
    /// Runs `cb` after the component is attached, on the next microtask.
    /// Skipped entirely in server-rendering mode.
    pub fn on_mount(&self, cb: impl FnOnce() + 'static) {
        self.context.borrow_mut().mount.push(Box::new(cb));
    }

    /// Runs `cb` when the component is unmounted. Callbacks fire in
    /// reverse registration order.
    pub fn on_unmount(&self, cb: impl FnOnce() + 'static) {
        on_cleanup(cb);
    }
}

/// Builds a component factory from a setup function.
///
/// Each factory call pushes a fresh mount context, runs `setup` inside an
/// owning reactive scope, schedules the collected mount callbacks on a
/// microtask, and restores the previous context even when `setup` panics.
/// Unmounting the returned view disposes the scope, which fires unmount
/// callbacks in reverse registration order and tears down every signal,
/// computed and effect the component created.
pub fn component<V: IntoView>(
    setup: impl Fn(&ComponentCtx) -> V + 'static,
) -> impl Fn(Props) -> View {
    let setup = Rc::new(setup);
    move |props: Props| {
        let context = Rc::new(RefCell::new(MountContext { mount: Vec::new() }));
        MOUNT_CONTEXTS.with(|stack| stack.borrow_mut().push(context.clone()));
        let _guard = ContextPopGuard;

        let ctx = ComponentCtx {
            props,
            context: context.clone(),
        };
        let (view, disposer) = run_scope_undisposed(|| setup(&ctx).into_view());
        let view = annotate(view, disposer);

        let callbacks: Vec<Box<dyn FnOnce()>> =
            std::mem::take(&mut context.borrow_mut().mount);
        schedule_mount_callbacks(callbacks);

        view
    }
}

struct ContextPopGuard;

impl Drop for ContextPopGuard {
    fn drop(&mut self) {
        MOUNT_CONTEXTS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Ties the component's scope to a node in its output so unmounting the
/// subtree can find and dispose it. Views without an element root get a
/// comment anchor that carries the lifecycle.
fn annotate(view: View, disposer: ScopeDisposer) -> View {
    let dom = document();
    match view {
        View::Node(node) => {
            LIFECYCLE.with(|map| map.borrow_mut().insert(node.0, disposer));
            View::Node(node)
        }
        other => {
            let fragment = dom.create_fragment();
            let anchor = dom.create_comment("component");
            LIFECYCLE.with(|map| map.borrow_mut().insert(anchor.0, disposer));
            dom.append_child(fragment, anchor);
            let mut out = Vec::new();
            insert_view(&dom, fragment, None, other, &mut out);
            View::Node(fragment)
        }
    }
}

fn schedule_mount_callbacks(callbacks: Vec<Box<dyn FnOnce()>>) {
    if callbacks.is_empty() || is_ssr() {
        return;
    }
    document().queue_microtask(Box::new(move || {
        for cb in callbacks {
            // one failing callback must not starve the rest
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cb)) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("mount callback failed: {message}");
            }
        }
    }));
}

/// Registers a mount callback. Inside a component factory it joins that
/// component's mount context; at top level it defers to a microtask on its
/// own. No-op in server-rendering mode.
pub fn on_mount(cb: impl FnOnce() + 'static) {
    let mut cb = Some(Box::new(cb) as Box<dyn FnOnce()>);
    MOUNT_CONTEXTS.with(|stack| {
        if let Some(context) = stack.borrow().last() {
            context.borrow_mut().mount.push(cb.take().unwrap());
        }
    });
    if let Some(cb) = cb {
        if is_ssr() {
            return;
        }
        document().queue_microtask(cb);
    }
}

/// Registers an unmount callback: inside a component this fires when the
/// component unmounts, otherwise when the current scope is disposed.
pub fn on_unmount(cb: impl FnOnce() + 'static) {
    on_cleanup(cb);
}

/// Disposes the lifecycle scopes of `node` and everything below it,
/// deepest first. Used by unmount.
pub(crate) fn dispose_lifecycles(node: NodeId) {
    let dom = document();
    for child in dom.child_nodes(node) {
        dispose_lifecycles(child);
    }
    let entry = LIFECYCLE.with(|map| map.borrow_mut().remove(&node.0));
    if let Some(disposer) = entry {
        disposer.dispose();
    }
}
