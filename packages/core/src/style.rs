//! Injection of compiled component styles.

use std::cell::RefCell;

use pulse_dom::{document, Dom};
use rustc_hash::FxHashSet;

thread_local! {
    static INJECTED: RefCell<FxHashSet<String>> = RefCell::new(FxHashSet::default());
}

/// Appends a `<style>` element for `component_id` once per document
/// lifetime. Compiled components call this when their CSS was not routed to
/// an extraction sink at build time.
pub fn inject_style(component_id: &str, css: &str) {
    let fresh = INJECTED.with(|set| set.borrow_mut().insert(component_id.to_string()));
    if !fresh {
        return;
    }
    let dom = document();
    let style = dom.create_element("style");
    dom.set_attribute(style, "data-pulse-style", component_id);
    dom.set_text(style, css);
    dom.append_child(dom.body(), style);
}

/// Test hook: forget which components already injected styles.
pub fn reset_injected_styles() {
    INJECTED.with(|set| set.borrow_mut().clear());
}
