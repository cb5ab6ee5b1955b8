//! Versioned timers for async work inside effects.
//!
//! Effects are synchronous; anything that waits takes the current epoch on
//! entry and checks it on resolution. `abort()` or a newer `begin()` clears
//! every timer armed under the old epoch and drops late callbacks whose
//! epoch went stale in flight.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pulse_dom::{document, Dom, TimerId};

/// An epoch source. Each [`Epoch::begin`] invalidates the previous handle.
#[derive(Clone, Default)]
pub struct Epoch {
    generation: Rc<Cell<u64>>,
    timers: Rc<RefCell<Vec<TimerId>>>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation: pending timers from the previous one are
    /// cleared and its late resolutions will be dropped.
    pub fn begin(&self) -> EpochHandle {
        self.clear_pending();
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        EpochHandle {
            generation,
            current: self.generation.clone(),
            timers: self.timers.clone(),
        }
    }

    /// Invalidates the current generation without starting a new one.
    pub fn abort(&self) {
        self.clear_pending();
        self.generation.set(self.generation.get() + 1);
    }

    fn clear_pending(&self) {
        let dom = document();
        for timer in self.timers.borrow_mut().drain(..) {
            dom.clear_timeout(timer);
        }
    }
}

/// Timer access scoped to one epoch generation.
pub struct EpochHandle {
    generation: u64,
    current: Rc<Cell<u64>>,
    timers: Rc<RefCell<Vec<TimerId>>>,
}

impl EpochHandle {
    /// Whether this handle's generation is still the live one.
    pub fn is_current(&self) -> bool {
        self.current.get() == self.generation
    }

    /// `setTimeout` that silently drops the callback if the epoch went
    /// stale before it fired.
    pub fn set_timeout(&self, f: impl FnOnce() + 'static, ms: u64) -> TimerId {
        let generation = self.generation;
        let current = self.current.clone();
        let id = document().set_timeout(
            Box::new(move || {
                if current.get() == generation {
                    f();
                }
            }),
            ms,
        );
        self.timers.borrow_mut().push(id);
        id
    }

    /// `setInterval` guarded the same way as [`EpochHandle::set_timeout`].
    pub fn set_interval(&self, mut f: impl FnMut() + 'static, ms: u64) -> TimerId {
        let generation = self.generation;
        let current = self.current.clone();
        let id = document().set_interval(
            Box::new(move || {
                if current.get() == generation {
                    f();
                }
            }),
            ms,
        );
        self.timers.borrow_mut().push(id);
        id
    }

    pub fn clear_timeout(&self, id: TimerId) {
        document().clear_timeout(id);
        self.timers.borrow_mut().retain(|t| *t != id);
    }

    pub fn clear_interval(&self, id: TimerId) {
        document().clear_interval(id);
        self.timers.borrow_mut().retain(|t| *t != id);
    }
}
