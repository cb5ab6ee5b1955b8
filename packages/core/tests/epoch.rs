//! Versioned-timer behavior: stale epochs drop their pending and late work.

use std::cell::Cell;
use std::rc::Rc;

use pulse_core::Epoch;
use pulse_dom::{reset_document, MockDom};

fn fresh_dom() -> Rc<MockDom> {
    reset_document();
    let dom = Rc::new(MockDom::new());
    pulse_dom::set_document(dom.clone());
    dom
}

#[test]
fn timers_from_a_stale_epoch_never_fire() {
    let dom = fresh_dom();
    let epoch = Epoch::new();
    let fired = Rc::new(Cell::new(0));

    let first = epoch.begin();
    let f = fired.clone();
    first.set_timeout(move || f.set(f.get() + 1), 10);

    // a new generation clears the old one's pending timers
    let second = epoch.begin();
    let f = fired.clone();
    second.set_timeout(move || f.set(f.get() + 10), 10);

    dom.run_all_timers();
    assert_eq!(fired.get(), 10);
    assert!(!first.is_current());
    assert!(second.is_current());
}

#[test]
fn abort_drops_late_resolutions() {
    let dom = fresh_dom();
    let epoch = Epoch::new();
    let fired = Rc::new(Cell::new(false));

    let handle = epoch.begin();
    let f = fired.clone();
    // cleared from the adapter by abort, and guarded by the generation
    // check even if it were to fire
    handle.set_timeout(move || f.set(true), 5);
    epoch.abort();

    dom.run_all_timers();
    assert!(!fired.get());
    assert_eq!(dom.pending_timers(), 0);
}

#[test]
fn intervals_are_tied_to_their_generation() {
    let dom = fresh_dom();
    let epoch = Epoch::new();
    let ticks = Rc::new(Cell::new(0));

    let handle = epoch.begin();
    let t = ticks.clone();
    let id = handle.set_interval(move || t.set(t.get() + 1), 16);
    handle.clear_interval(id);

    dom.run_all_timers();
    assert_eq!(ticks.get(), 0);
}
