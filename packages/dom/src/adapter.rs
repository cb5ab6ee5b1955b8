//! The uniform mutation interface every renderer target implements.
//!
//! The element builder, the reconciler, and the lifecycle layer never touch a
//! document directly - they speak to whichever [`Dom`] is installed in the
//! adapter slot. Two implementations ship with the framework: the in-memory
//! [`MockDom`](crate::MockDom) (default, also used for server rendering and
//! hydration diagnosis) and a browser-backed adapter behind the `web`
//! feature.

use std::rc::Rc;

use crate::{Event, ListenerId, TimerId, Value};

/// Opaque handle to a node owned by an adapter.
///
/// Handles are only meaningful to the adapter that created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A callback invoked when a listener's event fires.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// A unit of deferred work for the microtask queue or a timeout.
pub type Task = Box<dyn FnOnce()>;

/// A repeating unit of work driven by an interval.
pub type RepeatingTask = Box<dyn FnMut()>;

/// A document the framework can render into.
///
/// All methods take `&self`; adapters use interior mutability so a single
/// `Rc<dyn Dom>` can be threaded everywhere. Handles passed to a method must
/// come from the same adapter.
pub trait Dom {
    // ---- node creation ----
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text_node(&self, text: &str) -> NodeId;
    fn create_comment(&self, text: &str) -> NodeId;
    fn create_fragment(&self) -> NodeId;

    // ---- attributes ----
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);
    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;
    /// Attribute names in document order. Drives the hydration differ.
    fn attribute_names(&self, node: NodeId) -> Vec<String>;

    // ---- class list ----
    fn add_class(&self, node: NodeId, class: &str);
    fn remove_class(&self, node: NodeId, class: &str);
    fn toggle_class(&self, node: NodeId, class: &str, on: bool);

    // ---- inline style ----
    fn set_style(&self, node: NodeId, prop: &str, value: &str);
    fn get_style(&self, node: NodeId, prop: &str) -> Option<String>;

    // ---- properties (element object fields, not attributes) ----
    fn set_property(&self, node: NodeId, name: &str, value: Value);
    fn get_property(&self, node: NodeId, name: &str) -> Value;

    // ---- text ----
    fn set_text(&self, node: NodeId, text: &str);
    fn text_content(&self, node: NodeId) -> String;

    // ---- tree structure ----
    /// Appends `child` to `parent`. An already-attached child is detached
    /// from its current parent first. Appending a fragment moves the
    /// fragment's children and leaves the fragment empty.
    fn append_child(&self, parent: NodeId, child: NodeId);
    /// Inserts `child` into `parent` before `anchor`, or appends when
    /// `anchor` is `None`. Same detach-first and fragment semantics as
    /// [`Dom::append_child`].
    fn insert_before(&self, parent: NodeId, child: NodeId, anchor: Option<NodeId>);
    /// Detaches `node` from its parent, if any.
    fn remove_node(&self, node: NodeId);
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn child_nodes(&self, node: NodeId) -> Vec<NodeId>;

    // ---- events ----
    fn add_event_listener(&self, node: NodeId, event: &str, handler: EventHandler)
        -> ListenerId;
    fn remove_event_listener(&self, node: NodeId, event: &str, listener: ListenerId);
    fn dispatch_event(&self, node: NodeId, event: &Event);

    // ---- deferred work ----
    fn queue_microtask(&self, task: Task);
    fn set_timeout(&self, task: Task, ms: u64) -> TimerId;
    fn clear_timeout(&self, timer: TimerId);
    fn set_interval(&self, task: RepeatingTask, ms: u64) -> TimerId;
    fn clear_interval(&self, timer: TimerId);

    // ---- queries ----
    /// Resolves a simple selector (`tag`, `#id`, `.class`, or a compound of
    /// those) against the document.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;
    fn body(&self) -> NodeId;

    // ---- predicates & introspection ----
    fn is_node(&self, node: NodeId) -> bool;
    fn is_element(&self, node: NodeId) -> bool;
    fn is_text(&self, node: NodeId) -> bool;
    fn is_comment(&self, node: NodeId) -> bool;
    /// Lower-cased tag name for elements, `None` otherwise.
    fn tag_name(&self, node: NodeId) -> Option<String>;
    /// The `type` of an `<input>` element (defaulting to `text`), `None`
    /// for anything else.
    fn input_type(&self, node: NodeId) -> Option<String>;
}
