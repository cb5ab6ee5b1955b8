//! The value a render expression produces.
//!
//! There is no virtual DOM: a [`View`] either already holds real node
//! handles or holds primitives that become text nodes at insertion time.

use std::rc::Rc;

use pulse_dom::{Dom, NodeId};

/// Output of a render function or child expression.
#[derive(Clone, Debug)]
pub enum View {
    /// A real node (element, text, comment or fragment handle).
    Node(NodeId),
    /// A primitive rendered as a text node at insertion.
    Text(String),
    /// A flat sequence of views.
    Fragment(Vec<View>),
    /// Renders nothing.
    Empty,
}

/// Conversion into a [`View`]. Booleans and `None` render nothing, matching
/// the conditional-child conventions of the template language.
pub trait IntoView {
    fn into_view(self) -> View;
}

impl IntoView for View {
    fn into_view(self) -> View {
        self
    }
}

impl IntoView for NodeId {
    fn into_view(self) -> View {
        View::Node(self)
    }
}

impl IntoView for &str {
    fn into_view(self) -> View {
        View::Text(self.to_string())
    }
}

impl IntoView for String {
    fn into_view(self) -> View {
        View::Text(self)
    }
}

impl IntoView for bool {
    fn into_view(self) -> View {
        View::Empty
    }
}

impl IntoView for () {
    fn into_view(self) -> View {
        View::Empty
    }
}

macro_rules! impl_into_view_for_display {
    ($($ty:ty),*) => {
        $(
            impl IntoView for $ty {
                fn into_view(self) -> View {
                    View::Text(self.to_string())
                }
            }
        )*
    };
}

impl_into_view_for_display!(i32, i64, u32, u64, usize, f32, f64);

impl<V: IntoView> IntoView for Option<V> {
    fn into_view(self) -> View {
        match self {
            Some(view) => view.into_view(),
            None => View::Empty,
        }
    }
}

impl<V: IntoView> IntoView for Vec<V> {
    fn into_view(self) -> View {
        View::Fragment(self.into_iter().map(IntoView::into_view).collect())
    }
}

/// Inserts `view` into `parent` before `anchor`, recording every top-level
/// node handle in `out` so the caller can later remove or move the result.
pub(crate) fn insert_view(
    dom: &Rc<dyn Dom>,
    parent: NodeId,
    anchor: Option<NodeId>,
    view: View,
    out: &mut Vec<NodeId>,
) {
    match view {
        View::Node(node) => {
            let is_fragment = dom.is_node(node)
                && !dom.is_element(node)
                && !dom.is_text(node)
                && !dom.is_comment(node);
            if is_fragment {
                // the fragment hands its children over; track them, not the
                // emptied fragment handle
                let children = dom.child_nodes(node);
                dom.insert_before(parent, node, anchor);
                out.extend(children);
            } else {
                dom.insert_before(parent, node, anchor);
                out.push(node);
            }
        }
        View::Text(text) => {
            let node = dom.create_text_node(&text);
            dom.insert_before(parent, node, anchor);
            out.push(node);
        }
        View::Fragment(children) => {
            for child in children {
                insert_view(dom, parent, anchor, child, out);
            }
        }
        View::Empty => {}
    }
}
