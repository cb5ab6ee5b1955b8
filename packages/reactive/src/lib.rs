//! `pulse-reactive` - fine-grained reactivity for the Pulse framework.
//!
//! The building blocks are [`pulse`] (a writable cell), [`computed`] (a
//! derived cell) and [`effect`] (a tracked side effect). Dependencies are
//! discovered by running code, not declared: any tracked read inside a
//! computed or effect registers an edge, and edges are rebuilt from scratch
//! on every run.
//!
//! ```
//! use pulse_reactive::{batch, computed, effect, pulse};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let count = pulse(0);
//! let doubled = computed({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//! let runs = Rc::new(Cell::new(0));
//! let _e = effect({
//!     let doubled = doubled.clone();
//!     let runs = runs.clone();
//!     move || {
//!         let _ = doubled.get();
//!         runs.set(runs.get() + 1);
//!     }
//! });
//! batch(|| {
//!     count.set(1);
//!     count.set(2);
//!     count.set(3);
//! });
//! assert_eq!(doubled.peek(), 6);
//! assert_eq!(runs.get(), 2);
//! ```

pub(crate) mod computed;
pub(crate) mod context;
pub(crate) mod effect;
pub(crate) mod error;
pub(crate) mod runtime;
pub(crate) mod signal;
pub(crate) mod state;

pub use crate::computed::{computed, computed_with, Computed, ComputedOptions};
pub use crate::context::{create_context, with_context, ReactiveContext};
pub use crate::effect::{
    effect, effect_with_cleanup, effect_with_options, Effect, EffectOptions,
};
pub use crate::error::ReactivityError;
pub use crate::runtime::{
    batch, is_ssr, on_cleanup, run_scope_undisposed, set_ssr_mode, untrack,
    NodeId, ScopeDisposer, ScopeId, MAX_EFFECT_RUNS_PER_FLUSH,
};
pub use crate::signal::{pulse, pulse_with_equals, Pulse, Trigger};
pub use crate::state::{ReactiveVec, StateMap};
