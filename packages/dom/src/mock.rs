//! An in-memory document.
//!
//! The mock models the parts of a document the framework observes:
//! parent/child/sibling structure, attributes, the class list, inline style,
//! properties, and event listeners. Deferred work lands in explicit queues so
//! tests (and server rendering) can drive microtasks and timers
//! deterministically instead of racing a real event loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slab::Slab;

use crate::{
    Dom, Event, EventHandler, ListenerId, NodeId, RepeatingTask, Task, TimerId, Value,
};

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
    Fragment,
}

struct MockNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    // insertion-ordered so serialized output is stable
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
    properties: FxHashMap<String, Value>,
    listeners: Vec<ListenerEntry>,
}

struct ListenerEntry {
    id: ListenerId,
    event: String,
    handler: EventHandler,
}

impl MockNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            classes: Vec::new(),
            styles: Vec::new(),
            properties: FxHashMap::default(),
            listeners: Vec::new(),
        }
    }
}

enum TimerKind {
    Once(Option<Task>),
    Repeating(RepeatingTask),
}

struct TimerEntry {
    id: TimerId,
    due: u64,
    interval: Option<u64>,
    kind: TimerKind,
}

/// The in-memory [`Dom`] implementation.
pub struct MockDom {
    nodes: RefCell<Slab<MockNode>>,
    body: NodeId,
    next_listener: Cell<u64>,
    next_timer: Cell<u64>,
    microtasks: RefCell<VecDeque<Task>>,
    timers: RefCell<Vec<TimerEntry>>,
    now: Cell<u64>,
}

impl Default for MockDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDom {
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let body = NodeId(nodes.insert(MockNode::new(NodeKind::Element {
            tag: "body".to_string(),
        })));
        Self {
            nodes: RefCell::new(nodes),
            body,
            next_listener: Cell::new(0),
            next_timer: Cell::new(0),
            microtasks: RefCell::new(VecDeque::new()),
            timers: RefCell::new(Vec::new()),
            now: Cell::new(0),
        }
    }

    /// Runs queued microtasks until the queue is empty, including tasks
    /// queued by tasks already running in this flush.
    pub fn flush_microtasks(&self) {
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Runs every pending timer in due order, advancing virtual time as it
    /// goes. Intervals fire once per call to keep the run finite.
    pub fn run_all_timers(&self) {
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                timers.sort_by_key(|t| t.due);
                if timers.is_empty() {
                    break;
                }
                timers.remove(0)
            };
            self.now.set(next.due.max(self.now.get()));
            match next.kind {
                TimerKind::Once(Some(task)) => task(),
                TimerKind::Once(None) => {}
                TimerKind::Repeating(mut task) => {
                    task();
                    // an interval re-armed here would never drain; drop it
                    let _ = next.interval;
                }
            }
            self.flush_microtasks();
        }
    }

    /// Number of timers that have not fired or been cleared yet.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let parent = nodes.get(node.0).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = nodes.get_mut(parent.0) {
                p.children.retain(|c| *c != node);
            }
            if let Some(n) = nodes.get_mut(node.0) {
                n.parent = None;
            }
        }
    }

    fn insert(&self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) {
        // fragments donate their children and stay empty
        let fragment_children = {
            let nodes = self.nodes.borrow();
            match nodes.get(child.0) {
                Some(n) if matches!(n.kind, NodeKind::Fragment) => Some(n.children.clone()),
                _ => None,
            }
        };
        if let Some(children) = fragment_children {
            {
                let mut nodes = self.nodes.borrow_mut();
                if let Some(frag) = nodes.get_mut(child.0) {
                    frag.children.clear();
                }
            }
            for child in children {
                self.insert(parent, child, anchor);
            }
            return;
        }

        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        let index = match anchor {
            Some(anchor) => nodes
                .get(parent.0)
                .and_then(|p| p.children.iter().position(|c| *c == anchor)),
            None => None,
        };
        if let Some(p) = nodes.get_mut(parent.0) {
            match index {
                Some(i) => p.children.insert(i, child),
                None => p.children.push(child),
            }
        }
        if let Some(c) = nodes.get_mut(child.0) {
            c.parent = Some(parent);
        }
    }

    fn matches_selector(&self, node: NodeId, selector: &ParsedSelector) -> bool {
        let nodes = self.nodes.borrow();
        let Some(n) = nodes.get(node.0) else {
            return false;
        };
        let NodeKind::Element { tag } = &n.kind else {
            return false;
        };
        if let Some(want) = &selector.tag {
            if !tag.eq_ignore_ascii_case(want) {
                return false;
            }
        }
        if let Some(id) = &selector.id {
            let found = n
                .attributes
                .iter()
                .any(|(k, v)| k == "id" && v == id);
            if !found {
                return false;
            }
        }
        selector.classes.iter().all(|c| n.classes.contains(c))
    }

    fn find(&self, root: NodeId, selector: &ParsedSelector) -> Option<NodeId> {
        if self.matches_selector(root, selector) {
            return Some(root);
        }
        let children = self.nodes.borrow().get(root.0)?.children.clone();
        children.into_iter().find_map(|c| self.find(c, selector))
    }

    /// Serializes a subtree to HTML. Comments are kept; text is escaped.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let (kind, children, attributes, classes, styles) = {
            let nodes = self.nodes.borrow();
            let Some(n) = nodes.get(node.0) else { return };
            (
                n.kind.clone(),
                n.children.clone(),
                n.attributes.clone(),
                n.classes.clone(),
                n.styles.clone(),
            )
        };
        match kind {
            NodeKind::Text { text } => out.push_str(&escape_text(&text)),
            NodeKind::Comment { text } => {
                out.push_str("<!--");
                out.push_str(&text);
                out.push_str("-->");
            }
            NodeKind::Fragment => {
                for child in children {
                    self.write_html(child, out);
                }
            }
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                if !classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&classes.join(" "));
                    out.push('"');
                }
                if !styles.is_empty() {
                    out.push_str(" style=\"");
                    for (prop, value) in &styles {
                        out.push_str(prop);
                        out.push(':');
                        out.push_str(value);
                        out.push(';');
                    }
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }
}

impl Dom for MockDom {
    fn create_element(&self, tag: &str) -> NodeId {
        NodeId(self.nodes.borrow_mut().insert(MockNode::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })))
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        NodeId(self.nodes.borrow_mut().insert(MockNode::new(NodeKind::Text {
            text: text.to_string(),
        })))
    }

    fn create_comment(&self, text: &str) -> NodeId {
        NodeId(self.nodes.borrow_mut().insert(MockNode::new(NodeKind::Comment {
            text: text.to_string(),
        })))
    }

    fn create_fragment(&self) -> NodeId {
        NodeId(self.nodes.borrow_mut().insert(MockNode::new(NodeKind::Fragment)))
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            match n.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => n.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            n.attributes.retain(|(k, _)| k != name);
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        nodes.get(node.0).and_then(|n| {
            n.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        let nodes = self.nodes.borrow();
        nodes
            .get(node.0)
            .map(|n| n.attributes.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            n.classes.retain(|c| c != class);
        }
    }

    fn toggle_class(&self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    fn set_style(&self, node: NodeId, prop: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            if value.is_empty() {
                n.styles.retain(|(k, _)| k != prop);
            } else {
                match n.styles.iter_mut().find(|(k, _)| k == prop) {
                    Some((_, v)) => *v = value.to_string(),
                    None => n.styles.push((prop.to_string(), value.to_string())),
                }
            }
        }
    }

    fn get_style(&self, node: NodeId, prop: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        nodes.get(node.0).and_then(|n| {
            n.styles
                .iter()
                .find(|(k, _)| k == prop)
                .map(|(_, v)| v.clone())
        })
    }

    fn set_property(&self, node: NodeId, name: &str, value: Value) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.0) {
            n.properties.insert(name.to_string(), value);
        }
    }

    fn get_property(&self, node: NodeId, name: &str) -> Value {
        let nodes = self.nodes.borrow();
        let Some(n) = nodes.get(node.0) else {
            return Value::Null;
        };
        if let Some(v) = n.properties.get(name) {
            return v.clone();
        }
        // fall back to the attribute of the same name, the way form
        // controls reflect their initial markup
        n.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| Value::Text(v.clone()))
            .unwrap_or(Value::Null)
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(n) = nodes.get_mut(node.0) else { return };
        match &mut n.kind {
            NodeKind::Text { text: t } | NodeKind::Comment { text: t } => {
                *t = text.to_string();
                return;
            }
            NodeKind::Element { .. } | NodeKind::Fragment => {}
        }
        // element/fragment: replace all children with a single text node
        let children = std::mem::take(&mut nodes[node.0].children);
        for child in children {
            if let Some(c) = nodes.get_mut(child.0) {
                c.parent = None;
            }
        }
        let new_text = NodeId(nodes.insert(MockNode::new(NodeKind::Text {
            text: text.to_string(),
        })));
        nodes[node.0].children.push(new_text);
        nodes[new_text.0].parent = Some(node);
    }

    fn text_content(&self, node: NodeId) -> String {
        let (kind, children) = {
            let nodes = self.nodes.borrow();
            let Some(n) = nodes.get(node.0) else {
                return String::new();
            };
            (n.kind.clone(), n.children.clone())
        };
        match kind {
            NodeKind::Text { text } | NodeKind::Comment { text } => text,
            // comments do not contribute to an element's text
            NodeKind::Element { .. } | NodeKind::Fragment => children
                .into_iter()
                .filter(|c| !self.is_comment(*c))
                .map(|c| self.text_content(c))
                .collect(),
        }
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert(parent, child, None);
    }

    fn insert_before(&self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) {
        self.insert(parent, child, anchor);
    }

    fn remove_node(&self, node: NodeId) {
        self.detach(node);
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(node.0)?.parent?;
        let siblings = &nodes.get(parent.0)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0)?.parent
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        if let Some(n) = self.nodes.borrow_mut().get_mut(node.0) {
            n.listeners.push(ListenerEntry {
                id,
                event: event.to_string(),
                handler,
            });
        }
        id
    }

    fn remove_event_listener(&self, node: NodeId, event: &str, listener: ListenerId) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(node.0) {
            n.listeners
                .retain(|l| !(l.id == listener && l.event == event));
        }
    }

    fn dispatch_event(&self, node: NodeId, event: &Event) {
        // collect first: handlers may mutate the tree or the listener list
        let handlers: Vec<EventHandler> = {
            let nodes = self.nodes.borrow();
            match nodes.get(node.0) {
                Some(n) => n
                    .listeners
                    .iter()
                    .filter(|l| l.event == event.name)
                    .map(|l| l.handler.clone())
                    .collect(),
                None => Vec::new(),
            }
        };
        let mut event = event.clone();
        event.target = Some(node);
        for handler in handlers {
            handler(&event);
        }
    }

    fn queue_microtask(&self, task: Task) {
        self.microtasks.borrow_mut().push_back(task);
    }

    fn set_timeout(&self, task: Task, ms: u64) -> TimerId {
        let id = TimerId(self.next_timer.get());
        self.next_timer.set(id.0 + 1);
        self.timers.borrow_mut().push(TimerEntry {
            id,
            due: self.now.get() + ms,
            interval: None,
            kind: TimerKind::Once(Some(task)),
        });
        id
    }

    fn clear_timeout(&self, timer: TimerId) {
        self.timers.borrow_mut().retain(|t| t.id != timer);
    }

    fn set_interval(&self, task: RepeatingTask, ms: u64) -> TimerId {
        let id = TimerId(self.next_timer.get());
        self.next_timer.set(id.0 + 1);
        self.timers.borrow_mut().push(TimerEntry {
            id,
            due: self.now.get() + ms,
            interval: Some(ms),
            kind: TimerKind::Repeating(task),
        });
        id
    }

    fn clear_interval(&self, timer: TimerId) {
        self.clear_timeout(timer);
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let parsed = ParsedSelector::parse(selector)?;
        self.find(self.body, &parsed)
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn is_node(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains(node.0)
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.borrow().get(node.0).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.borrow().get(node.0).map(|n| &n.kind),
            Some(NodeKind::Text { .. })
        )
    }

    fn is_comment(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.borrow().get(node.0).map(|n| &n.kind),
            Some(NodeKind::Comment { .. })
        )
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match self.nodes.borrow().get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element { tag }) => Some(tag.clone()),
            _ => None,
        }
    }

    fn input_type(&self, node: NodeId) -> Option<String> {
        if self.tag_name(node).as_deref() != Some("input") {
            return None;
        }
        Some(
            self.get_attribute(node, "type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        )
    }
}

/// The subset of selector syntax `query_selector` resolves.
struct ParsedSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl ParsedSelector {
    fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        let mut tag = None;
        let mut id = None;
        let mut classes = Vec::new();
        let mut rest = selector;
        if !rest.starts_with(['#', '.']) {
            let end = rest
                .find(['#', '.'])
                .unwrap_or(rest.len());
            tag = Some(rest[..end].to_string());
            rest = &rest[end..];
        }
        while !rest.is_empty() {
            let marker = rest.chars().next().unwrap();
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '#' => id = Some(name.to_string()),
                '.' => classes.push(name.to_string()),
                _ => return None,
            }
            rest = &body[end..];
        }
        Some(Self { tag, id, classes })
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_detaches_from_previous_parent() {
        let dom = MockDom::new();
        let a = dom.create_element("div");
        let b = dom.create_element("div");
        let child = dom.create_element("span");
        dom.append_child(a, child);
        dom.append_child(b, child);
        assert_eq!(dom.child_nodes(a), vec![]);
        assert_eq!(dom.child_nodes(b), vec![child]);
        assert_eq!(dom.parent_node(child), Some(b));
    }

    #[test]
    fn fragment_append_moves_children() {
        let dom = MockDom::new();
        let frag = dom.create_fragment();
        let x = dom.create_text_node("x");
        let y = dom.create_text_node("y");
        dom.append_child(frag, x);
        dom.append_child(frag, y);
        let parent = dom.create_element("div");
        dom.append_child(parent, frag);
        assert_eq!(dom.child_nodes(parent), vec![x, y]);
        assert_eq!(dom.child_nodes(frag), vec![]);
    }

    #[test]
    fn listener_symmetry() {
        let dom = MockDom::new();
        let el = dom.create_element("button");
        let count = Rc::new(Cell::new(0));
        let id = dom.add_event_listener(el, "click", {
            let count = count.clone();
            Rc::new(move |_| count.set(count.get() + 1))
        });
        dom.dispatch_event(el, &Event::new("click"));
        dom.remove_event_listener(el, "click", id);
        dom.dispatch_event(el, &Event::new("click"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn microtasks_run_in_order_including_nested() {
        let dom = Rc::new(MockDom::new());
        let order = Rc::new(RefCell::new(Vec::new()));
        dom.queue_microtask({
            let order = order.clone();
            let dom2 = dom.clone();
            Box::new(move || {
                order.borrow_mut().push(1);
                let order = order.clone();
                dom2.queue_microtask(Box::new(move || order.borrow_mut().push(3)));
            })
        });
        dom.queue_microtask({
            let order = order.clone();
            Box::new(move || order.borrow_mut().push(2))
        });
        dom.flush_microtasks();
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn query_selector_compound() {
        let dom = MockDom::new();
        let el = dom.create_element("section");
        dom.set_attribute(el, "id", "app");
        dom.add_class(el, "main");
        dom.append_child(dom.body(), el);
        assert_eq!(dom.query_selector("#app"), Some(el));
        assert_eq!(dom.query_selector("section.main"), Some(el));
        assert_eq!(dom.query_selector("section#app.main"), Some(el));
        assert_eq!(dom.query_selector("div#app"), None);
    }
}
