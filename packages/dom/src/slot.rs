//! The process-wide adapter slot.
//!
//! The runtime is single-threaded, so "process-wide" is a thread-local
//! holding the adapter the builder and reconciler talk to. Overrides nest
//! with stack discipline: [`with_document`] restores the previous adapter on
//! every exit path, including unwinds.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{Dom, MockDom};

thread_local! {
    static DOCUMENT: RefCell<Option<Rc<dyn Dom>>> = const { RefCell::new(None) };
}

/// The currently installed adapter. Lazily initialises a [`MockDom`] so
/// tests and server rendering work without any setup.
pub fn document() -> Rc<dyn Dom> {
    DOCUMENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        match &*slot {
            Some(dom) => dom.clone(),
            None => {
                let dom: Rc<dyn Dom> = Rc::new(MockDom::new());
                *slot = Some(dom.clone());
                dom
            }
        }
    })
}

/// Installs `dom` as the current adapter.
pub fn set_document(dom: Rc<dyn Dom>) {
    tracing::debug!("installing document adapter");
    DOCUMENT.with(|slot| *slot.borrow_mut() = Some(dom));
}

/// Clears the slot; the next [`document`] call creates a fresh mock.
pub fn reset_document() {
    tracing::debug!("resetting document adapter");
    DOCUMENT.with(|slot| *slot.borrow_mut() = None);
}

/// Runs `f` with `dom` installed, restoring the previous adapter afterwards
/// even if `f` panics.
pub fn with_document<T>(dom: Rc<dyn Dom>, f: impl FnOnce() -> T) -> T {
    let _guard = DocumentGuard::new(dom);
    f()
}

struct DocumentGuard {
    previous: Option<Rc<dyn Dom>>,
}

impl DocumentGuard {
    fn new(dom: Rc<dyn Dom>) -> Self {
        let previous = DOCUMENT.with(|slot| slot.borrow_mut().replace(dom));
        Self { previous }
    }
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        DOCUMENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_document_restores_on_panic() {
        let outer: Rc<dyn Dom> = Rc::new(MockDom::new());
        set_document(outer.clone());
        let inner: Rc<dyn Dom> = Rc::new(MockDom::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_document(inner, || panic!("boom"))
        }));
        assert!(result.is_err());
        assert!(Rc::ptr_eq(&document(), &outer));
        reset_document();
    }
}
