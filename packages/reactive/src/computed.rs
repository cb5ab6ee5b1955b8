//! Read-only derived cells.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::{current_runtime, AnyComputation, NodeId, NodeKind, Runtime};

/// Options for [`computed_with`].
pub struct ComputedOptions<T> {
    /// Custom change predicate; defaults to `PartialEq`.
    pub equals: Option<Rc<dyn Fn(&T, &T) -> bool>>,
    /// When `false`, the value is recomputed eagerly at flush time instead
    /// of on the next observed read.
    pub lazy: bool,
}

impl<T> Default for ComputedOptions<T> {
    fn default() -> Self {
        Self {
            equals: None,
            lazy: true,
        }
    }
}

/// A read-only derived cell. The compute function re-runs when one of its
/// tracked sources changed, at most once per flush, and only when the value
/// is observed (unless constructed eager).
pub struct Computed<T: 'static> {
    id: NodeId,
    runtime: Rc<Runtime>,
    value: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: self.runtime.clone(),
            value: self.value.clone(),
        }
    }
}

struct MemoComputation<T, F> {
    f: RefCell<F>,
    value: Rc<RefCell<Option<T>>>,
    equals: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T, F> AnyComputation for MemoComputation<T, F>
where
    F: FnMut() -> T,
{
    fn run(&self) -> bool {
        let new = (self.f.borrow_mut())();
        let mut slot = self.value.borrow_mut();
        let changed = match &*slot {
            Some(old) => !(self.equals)(old, &new),
            None => true,
        };
        if changed {
            *slot = Some(new);
        }
        changed
    }
}

/// Creates a lazily recomputed derived cell.
pub fn computed<T, F>(f: F) -> Computed<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    computed_with(f, ComputedOptions::default())
}

/// Creates a derived cell with explicit options.
pub fn computed_with<T, F>(f: F, options: ComputedOptions<T>) -> Computed<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    let runtime = current_runtime();
    let value: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
    let computation = Rc::new(MemoComputation {
        f: RefCell::new(f),
        value: value.clone(),
        equals: options.equals.unwrap_or_else(|| Rc::new(T::eq)),
    });
    let id = runtime.insert_node(NodeKind::Memo {
        f: computation,
        eager: !options.lazy,
    });
    let handle = Computed { id, runtime, value };
    if !options.lazy {
        // eager memos settle immediately so the first read never computes
        handle.runtime.update_if_necessary(handle.id);
    }
    handle
}

impl<T: Clone + 'static> Computed<T> {
    /// Reads the value, recomputing first if a source changed, and
    /// registers the current consumer as a dependent.
    pub fn get(&self) -> T {
        self.runtime.update_if_necessary(self.id);
        self.runtime.track(self.id);
        self.read()
    }

    /// Reads the value without registering a dependency. Stale values are
    /// still brought up to date first.
    pub fn peek(&self) -> T {
        self.runtime.update_if_necessary(self.id);
        self.read()
    }

    fn read(&self) -> T {
        self.value
            .borrow()
            .as_ref()
            .expect("computed read before first evaluation")
            .clone()
    }
}
