//! Mounting a view into the document.

use pulse_dom::{document, Dom, DomError, NodeId};
use pulse_reactive::{run_scope_undisposed, ScopeDisposer};

use crate::component::dispose_lifecycles;
use crate::view::{insert_view, IntoView};

/// Where a view can be mounted: a selector resolved against the document,
/// or an element handle directly.
pub enum MountTarget {
    Selector(String),
    Node(NodeId),
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

impl From<NodeId> for MountTarget {
    fn from(node: NodeId) -> Self {
        MountTarget::Node(node)
    }
}

/// A mounted view. Unmounting fires unmount callbacks bottom-up, disposes
/// every owned effect, and removes the nodes from the document.
pub struct MountHandle {
    nodes: Vec<NodeId>,
    scope: Option<ScopeDisposer>,
}

impl std::fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle").field("nodes", &self.nodes).finish()
    }
}

impl MountHandle {
    pub fn unmount(mut self) {
        let dom = document();
        for node in &self.nodes {
            dispose_lifecycles(*node);
        }
        if let Some(scope) = self.scope.take() {
            scope.dispose();
        }
        for node in &self.nodes {
            dom.remove_node(*node);
        }
    }

    /// Root nodes this mount inserted.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// Appends `view` to `target` and returns the unmount handle. An unknown
/// selector fails with `MOUNT_NOT_FOUND` before anything touches the
/// document.
pub fn mount(
    target: impl Into<MountTarget>,
    view: impl IntoView,
) -> Result<MountHandle, DomError> {
    let dom = document();
    let target = match target.into() {
        MountTarget::Node(node) => node,
        MountTarget::Selector(selector) => {
            dom.query_selector(&selector).ok_or(DomError::MountNotFound {
                selector: selector.clone(),
            })?
        }
    };
    let view = view.into_view();
    let (nodes, scope) = run_scope_undisposed(|| {
        let mut out = Vec::new();
        insert_view(&dom, target, None, view, &mut out);
        out
    });
    tracing::debug!(roots = nodes.len(), "mounted view");
    Ok(MountHandle {
        nodes,
        scope: Some(scope),
    })
}
