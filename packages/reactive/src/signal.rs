//! Writable reactive cells.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::{effect, Effect};
use crate::runtime::{current_runtime, NodeId, NodeKind, Runtime};

type EqualsFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// A writable reactive cell. Cloning a `Pulse` clones a handle to the same
/// cell; the value itself lives until every handle and the owning scope are
/// gone.
pub struct Pulse<T: 'static> {
    pub(crate) id: NodeId,
    pub(crate) runtime: Rc<Runtime>,
    value: Rc<RefCell<T>>,
    equals: Option<EqualsFn<T>>,
}

impl<T> Clone for Pulse<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: self.runtime.clone(),
            value: self.value.clone(),
            equals: self.equals.clone(),
        }
    }
}

/// Creates a writable reactive cell in the current runtime.
///
/// Writes that compare equal to the current value do not schedule
/// dependents. Use [`pulse_with_equals`] for a custom predicate.
pub fn pulse<T: PartialEq + 'static>(initial: T) -> Pulse<T> {
    Pulse::with_equals(initial, Some(Rc::new(T::eq)))
}

/// Creates a writable reactive cell with a custom equality predicate.
pub fn pulse_with_equals<T: 'static>(
    initial: T,
    equals: impl Fn(&T, &T) -> bool + 'static,
) -> Pulse<T> {
    Pulse::with_equals(initial, Some(Rc::new(equals)))
}

impl<T: 'static> Pulse<T> {
    fn with_equals(initial: T, equals: Option<EqualsFn<T>>) -> Self {
        let runtime = current_runtime();
        let id = runtime.insert_node(NodeKind::Signal);
        Self {
            id,
            runtime,
            value: Rc::new(RefCell::new(initial)),
            equals,
        }
    }

    /// Reads the value and registers the current consumer as a dependent.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.runtime.track(self.id);
        self.value.borrow().clone()
    }

    /// Runs `f` against the value, registering the current consumer.
    pub fn with<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.runtime.track(self.id);
        f(&self.value.borrow())
    }

    /// Reads the value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Writes a new value, scheduling dependents unless the equality
    /// predicate accepts the old and new values as equal.
    pub fn set(&self, new: T) {
        let changed = {
            let mut slot = self.value.borrow_mut();
            let changed = match &self.equals {
                Some(eq) => !eq(&*slot, &new),
                None => true,
            };
            if changed {
                *slot = new;
            }
            changed
        };
        if changed {
            tracing::trace!(node = self.id.0, "pulse changed");
            self.runtime.notify(self.id);
        }
    }

    /// Updates the value in place. Dependents are scheduled unless the
    /// updated value compares equal to the previous one.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut next = self.value.borrow().clone();
        f(&mut next);
        self.set(next);
    }

    /// Calls `f` with each new value after a change. The callback does not
    /// fire for the value present at subscription time.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Effect
    where
        T: Clone,
    {
        let this = self.clone();
        let first = std::cell::Cell::new(true);
        effect(move || {
            let value = this.get();
            if first.replace(false) {
                return;
            }
            f(&value);
        })
    }
}

/// A unit cell that always notifies. Backs collections whose change signal
/// is "something happened" rather than a comparable value.
#[derive(Clone)]
pub struct Trigger {
    id: NodeId,
    runtime: Rc<Runtime>,
}

impl Trigger {
    pub fn new() -> Self {
        let runtime = current_runtime();
        let id = runtime.insert_node(NodeKind::Signal);
        Self { id, runtime }
    }

    /// Registers the current consumer as a dependent.
    pub fn track(&self) {
        self.runtime.track(self.id);
    }

    /// Schedules every dependent.
    pub fn notify(&self) {
        self.runtime.notify(self.id);
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}
