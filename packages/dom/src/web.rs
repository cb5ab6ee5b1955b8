//! Browser-backed adapter. Only compiled with the `web` feature, for wasm
//! targets; everything else (tests, server rendering) runs on the mock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use slab::Slab;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::{
    Dom, Event, EventHandler, ListenerId, NodeId, RepeatingTask, Task, TimerId, Value,
};

/// [`Dom`] implementation over `web_sys`.
///
/// Handles are interned in a slab; interning an already-known JS node does a
/// linear scan, which is fine for the sibling-walk patterns the reconciler
/// actually performs.
pub struct WebDom {
    document: web_sys::Document,
    nodes: RefCell<Slab<web_sys::Node>>,
    listeners: RefCell<HashMap<(usize, u64), Closure<dyn FnMut(web_sys::Event)>>>,
    next_listener: std::cell::Cell<u64>,
    timer_closures: RefCell<HashMap<i32, Closure<dyn FnMut()>>>,
}

impl WebDom {
    pub fn new() -> Self {
        let document = web_sys::window()
            .expect("no window: the web adapter requires a browser environment")
            .document()
            .expect("window has no document");
        Self {
            document,
            nodes: RefCell::new(Slab::new()),
            listeners: RefCell::new(HashMap::new()),
            next_listener: std::cell::Cell::new(0),
            timer_closures: RefCell::new(HashMap::new()),
        }
    }

    fn intern(&self, node: web_sys::Node) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        for (key, known) in nodes.iter() {
            if known == &node {
                return NodeId(key);
            }
        }
        NodeId(nodes.insert(node))
    }

    fn get(&self, id: NodeId) -> Option<web_sys::Node> {
        self.nodes.borrow().get(id.0).cloned()
    }

    fn element(&self, id: NodeId) -> Option<web_sys::Element> {
        self.get(id)?.dyn_into().ok()
    }

    fn window(&self) -> web_sys::Window {
        web_sys::window().expect("no window")
    }
}

impl Default for WebDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for WebDom {
    fn create_element(&self, tag: &str) -> NodeId {
        let el = self
            .document
            .create_element(tag)
            .expect("invalid element tag");
        self.intern(el.into())
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        self.intern(self.document.create_text_node(text).into())
    }

    fn create_comment(&self, text: &str) -> NodeId {
        self.intern(self.document.create_comment(text).into())
    }

    fn create_fragment(&self) -> NodeId {
        self.intern(self.document.create_document_fragment().into())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element(node) {
            let _ = el.set_attribute(name, value);
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(el) = self.element(node) {
            let _ = el.remove_attribute(name);
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        match self.element(node) {
            Some(el) => el.get_attribute_names().iter().filter_map(|v| v.as_string()).collect(),
            None => Vec::new(),
        }
    }

    fn add_class(&self, node: NodeId, class: &str) {
        if let Some(el) = self.element(node) {
            let _ = el.class_list().add_1(class);
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(el) = self.element(node) {
            let _ = el.class_list().remove_1(class);
        }
    }

    fn toggle_class(&self, node: NodeId, class: &str, on: bool) {
        if let Some(el) = self.element(node) {
            let _ = el.class_list().toggle_with_force(class, on);
        }
    }

    fn set_style(&self, node: NodeId, prop: &str, value: &str) {
        if let Some(el) = self.get(node).and_then(|n| n.dyn_into::<web_sys::HtmlElement>().ok()) {
            let _ = el.style().set_property(prop, value);
        }
    }

    fn get_style(&self, node: NodeId, prop: &str) -> Option<String> {
        let el: web_sys::HtmlElement = self.get(node)?.dyn_into().ok()?;
        el.style().get_property_value(prop).ok()
    }

    fn set_property(&self, node: NodeId, name: &str, value: Value) {
        if let Some(n) = self.get(node) {
            let js = match value {
                Value::Null => JsValue::NULL,
                Value::Bool(b) => JsValue::from_bool(b),
                Value::Int(i) => JsValue::from_f64(i as f64),
                Value::Float(f) => JsValue::from_f64(f),
                Value::Text(s) => JsValue::from_str(&s),
                list @ Value::List(_) => JsValue::from_str(&list.to_string()),
            };
            let _ = js_sys::Reflect::set(n.as_ref(), &JsValue::from_str(name), &js);
        }
    }

    fn get_property(&self, node: NodeId, name: &str) -> Value {
        let Some(n) = self.get(node) else {
            return Value::Null;
        };
        let js = js_sys::Reflect::get(n.as_ref(), &JsValue::from_str(name))
            .unwrap_or(JsValue::NULL);
        if let Some(b) = js.as_bool() {
            Value::Bool(b)
        } else if let Some(f) = js.as_f64() {
            if f.fract() == 0.0 {
                Value::Int(f as i64)
            } else {
                Value::Float(f)
            }
        } else if let Some(s) = js.as_string() {
            Value::Text(s)
        } else {
            Value::Null
        }
    }

    fn set_text(&self, node: NodeId, text: &str) {
        if let Some(n) = self.get(node) {
            n.set_text_content(Some(text));
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        self.get(node)
            .and_then(|n| n.text_content())
            .unwrap_or_default()
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        if let (Some(p), Some(c)) = (self.get(parent), self.get(child)) {
            let _ = p.append_child(&c);
        }
    }

    fn insert_before(&self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) {
        if let (Some(p), Some(c)) = (self.get(parent), self.get(child)) {
            let anchor = anchor.and_then(|a| self.get(a));
            let _ = p.insert_before(&c, anchor.as_ref());
        }
    }

    fn remove_node(&self, node: NodeId) {
        if let Some(n) = self.get(node) {
            if let Some(parent) = n.parent_node() {
                let _ = parent.remove_child(&n);
            }
        }
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let sibling = self.get(node)?.next_sibling()?;
        Some(self.intern(sibling))
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent_node()?;
        Some(self.intern(parent))
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let Some(n) = self.get(node) else {
            return Vec::new();
        };
        let list = n.child_nodes();
        (0..list.length())
            .filter_map(|i| list.item(i))
            .map(|c| self.intern(c))
            .collect()
    }

    fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        let Some(n) = self.get(node) else { return id };
        let name = event.to_string();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
            let value = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                .map(|input| Value::Text(input.value()))
                .unwrap_or(Value::Null);
            let mut synthetic = Event::with_value(name.clone(), value);
            synthetic.target = Some(node);
            handler(&synthetic);
        });
        let _ = n.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        self.listeners.borrow_mut().insert((node.0, id.0), closure);
        id
    }

    fn remove_event_listener(&self, node: NodeId, event: &str, listener: ListenerId) {
        let closure = self.listeners.borrow_mut().remove(&(node.0, listener.0));
        if let (Some(n), Some(closure)) = (self.get(node), closure) {
            let _ =
                n.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
        }
    }

    fn dispatch_event(&self, node: NodeId, event: &Event) {
        if let Some(n) = self.get(node) {
            if let Ok(ev) = web_sys::Event::new(&event.name) {
                let _ = n.dispatch_event(&ev);
            }
        }
    }

    fn queue_microtask(&self, task: Task) {
        let cell = std::cell::Cell::new(Some(task));
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(task) = cell.take() {
                task();
            }
        });
        self.window()
            .queue_microtask(closure.as_ref().unchecked_ref())
            .expect("queueMicrotask failed");
        closure.forget();
    }

    fn set_timeout(&self, task: Task, ms: u64) -> TimerId {
        let cell = std::cell::Cell::new(Some(task));
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(task) = cell.take() {
                task();
            }
        });
        let handle = self
            .window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                ms as i32,
            )
            .expect("setTimeout failed");
        self.timer_closures.borrow_mut().insert(handle, closure);
        TimerId(handle as u64)
    }

    fn clear_timeout(&self, timer: TimerId) {
        self.window().clear_timeout_with_handle(timer.0 as i32);
        self.timer_closures.borrow_mut().remove(&(timer.0 as i32));
    }

    fn set_interval(&self, mut task: RepeatingTask, ms: u64) -> TimerId {
        let closure = Closure::<dyn FnMut()>::new(move || task());
        let handle = self
            .window()
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                ms as i32,
            )
            .expect("setInterval failed");
        self.timer_closures.borrow_mut().insert(handle, closure);
        TimerId(handle as u64)
    }

    fn clear_interval(&self, timer: TimerId) {
        self.window().clear_interval_with_handle(timer.0 as i32);
        self.timer_closures.borrow_mut().remove(&(timer.0 as i32));
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let el = self.document.query_selector(selector).ok()??;
        Some(self.intern(el.into()))
    }

    fn body(&self) -> NodeId {
        let body = self.document.body().expect("document has no body");
        self.intern(body.into())
    }

    fn is_node(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains(node.0)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.get(node)
            .map(|n| n.node_type() == web_sys::Node::ELEMENT_NODE)
            .unwrap_or(false)
    }

    fn is_text(&self, node: NodeId) -> bool {
        self.get(node)
            .map(|n| n.node_type() == web_sys::Node::TEXT_NODE)
            .unwrap_or(false)
    }

    fn is_comment(&self, node: NodeId) -> bool {
        self.get(node)
            .map(|n| n.node_type() == web_sys::Node::COMMENT_NODE)
            .unwrap_or(false)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        Some(self.element(node)?.tag_name().to_ascii_lowercase())
    }

    fn input_type(&self, node: NodeId) -> Option<String> {
        let input: web_sys::HtmlInputElement = self.get(node)?.dyn_into().ok()?;
        Some(input.type_().to_ascii_lowercase())
    }
}
