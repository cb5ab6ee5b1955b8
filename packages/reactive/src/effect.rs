//! Side-effecting computations.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReactivityError;
use crate::runtime::{
    current_runtime, on_cleanup, AnyComputation, CleanupFn, NodeId, NodeKind, Runtime,
};

/// Options for [`effect_with_options`].
#[derive(Default)]
pub struct EffectOptions {
    /// Invoked instead of logging when the effect body panics or the
    /// scheduler detects a circular dependency on this effect.
    pub on_error: Option<Rc<dyn Fn(ReactivityError)>>,
}

/// Handle to a running effect. Disposing stops future runs and fires any
/// pending cleanup once; disposal is idempotent.
pub struct Effect {
    id: NodeId,
    runtime: Rc<Runtime>,
}

struct EffectComputation<F> {
    f: RefCell<F>,
}

impl<F> AnyComputation for EffectComputation<F>
where
    F: FnMut() -> Option<CleanupFn>,
{
    fn run(&self) -> bool {
        let cleanup = (self.f.borrow_mut())();
        if let Some(cleanup) = cleanup {
            // lands in this effect's own cleanup list via the sink stack
            on_cleanup(cleanup);
        }
        true
    }
}

/// Creates an effect: runs `f` once immediately, tracks every reactive read
/// inside it, and re-runs whenever a tracked source changes.
pub fn effect(mut f: impl FnMut() + 'static) -> Effect {
    raw_effect(
        move || {
            f();
            None
        },
        EffectOptions::default(),
    )
}

/// [`effect`] with an error hook.
pub fn effect_with_options(
    mut f: impl FnMut() + 'static,
    options: EffectOptions,
) -> Effect {
    raw_effect(
        move || {
            f();
            None
        },
        options,
    )
}

/// An effect whose body returns a cleanup closure. The cleanup fires before
/// the next run and once on disposal, interleaved in reverse registration
/// order with any [`on_cleanup`](crate::on_cleanup) registrations made
/// inside the body.
pub fn effect_with_cleanup<C>(mut f: impl FnMut() -> C + 'static) -> Effect
where
    C: FnOnce() + 'static,
{
    raw_effect(
        move || Some(Box::new(f()) as CleanupFn),
        EffectOptions::default(),
    )
}

fn raw_effect(
    f: impl FnMut() -> Option<CleanupFn> + 'static,
    options: EffectOptions,
) -> Effect {
    let runtime = current_runtime();
    let computation = Rc::new(EffectComputation { f: RefCell::new(f) });
    let id = runtime.insert_node(NodeKind::Effect {
        f: computation,
        cleanups: Rc::new(RefCell::new(Vec::new())),
        on_error: options.on_error,
    });
    runtime.run_effect_now(id);
    Effect { id, runtime }
}

impl Effect {
    /// Stops the effect and fires its pending cleanup. Safe to call twice.
    pub fn dispose(&self) {
        self.runtime.dispose_node(self.id);
    }
}
