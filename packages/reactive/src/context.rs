//! Named reactive roots.
//!
//! A context owns its own runtime, so signals and effects created inside
//! `with_context` are fully isolated from every other context. Tests and
//! server-side request handling use this to avoid cross-talk through the
//! thread's root runtime.

use std::rc::Rc;

use crate::runtime::{pop_runtime, push_runtime, Runtime};

/// An isolated reactive root.
#[derive(Clone)]
pub struct ReactiveContext {
    runtime: Rc<Runtime>,
}

impl ReactiveContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            runtime: Runtime::new(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.runtime.name
    }

    /// Tears down every signal, computed and effect owned by this context.
    /// Effect cleanups fire; the context is reusable afterwards.
    pub fn reset(&self) {
        self.runtime.reset();
    }

    pub(crate) fn runtime(&self) -> Rc<Runtime> {
        self.runtime.clone()
    }
}

/// Creates a named reactive root.
pub fn create_context(name: impl Into<String>) -> ReactiveContext {
    ReactiveContext::new(name)
}

/// Runs `f` with `context` installed as the current runtime, restoring the
/// previous one on all exit paths.
pub fn with_context<T>(context: &ReactiveContext, f: impl FnOnce() -> T) -> T {
    push_runtime(context.runtime());
    let _guard = ContextGuard;
    f()
}

struct ContextGuard;

impl Drop for ContextGuard {
    fn drop(&mut self) {
        pop_runtime();
    }
}
