//! Conditional rendering helpers.

use pulse_dom::{document, Dom, NodeId};
use pulse_reactive::{computed, effect, untrack};

use crate::builder::reactive_region;
use crate::view::{IntoView, View};

/// Renders `then_f` while `cond` is true, nothing otherwise. The inactive
/// branch factory is never invoked.
pub fn when<V: IntoView>(
    cond: impl Fn() -> bool + 'static,
    then_f: impl Fn() -> V + 'static,
) -> View {
    when_else(cond, then_f, || View::Empty)
}

/// Renders `then_f` while `cond` is true and `else_f` otherwise. On each
/// flip the current branch's subtree and effects are torn down before the
/// alternate branch is built.
pub fn when_else<V: IntoView, W: IntoView>(
    cond: impl Fn() -> bool + 'static,
    then_f: impl Fn() -> V + 'static,
    else_f: impl Fn() -> W + 'static,
) -> View {
    let dom = document();
    let fragment = dom.create_fragment();
    // memoized so the region only re-renders on a true/false flip, not on
    // every write to a dependency of `cond`
    let active = computed(move || cond());
    reactive_region(dom.clone(), fragment, move || {
        if active.get() {
            untrack(|| then_f().into_view())
        } else {
            untrack(|| else_f().into_view())
        }
    });
    View::Node(fragment)
}

/// Toggles `display: none` on `node` without detaching it.
pub fn show(node: NodeId, cond: impl Fn() -> bool + 'static) -> NodeId {
    let dom = document();
    effect(move || {
        if cond() {
            dom.set_style(node, "display", "");
        } else {
            dom.set_style(node, "display", "none");
        }
    });
    node
}
