//! Chained element construction over the adapter.
//!
//! `el("button.primary#save[type=submit]")` creates the element eagerly and
//! returns a builder; every `attr_fn`/`child_fn` establishes an effect that
//! keeps exactly that attribute or child region up to date. Nothing diffs:
//! a binding owns the node it targets.

use std::rc::Rc;

use pulse_dom::{document, Dom, Event, NodeId, Value};
use pulse_reactive::{effect, is_ssr, on_cleanup, run_scope_undisposed};

use crate::selector::parse_selector;
use crate::view::{insert_view, IntoView, View};

/// Attributes that carry URLs and therefore pass through
/// [`sanitize_url`] before being applied.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

/// Rejects scriptable URL schemes. Returns `None` when the value must not
/// reach the document.
pub fn sanitize_url(value: &str) -> Option<&str> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if compact.starts_with("javascript:") || compact.starts_with("vbscript:") {
        return None;
    }
    if compact.starts_with("data:text/html") {
        return None;
    }
    Some(value)
}

/// Creates an element from a selector shorthand and returns its builder.
pub fn el(selector: &str) -> ElementBuilder {
    let dom = document();
    let parsed = parse_selector(selector);
    let node = dom.create_element(&parsed.tag);
    if let Some(id) = &parsed.id {
        dom.set_attribute(node, "id", id);
    }
    for class in &parsed.classes {
        dom.add_class(node, class);
    }
    for (name, value) in &parsed.attrs {
        apply_attribute(&dom, node, name, &Value::from(value.clone().unwrap_or_default()));
    }
    ElementBuilder { dom, node }
}

/// A chained builder over one real element.
pub struct ElementBuilder {
    dom: Rc<dyn Dom>,
    node: NodeId,
}

impl ElementBuilder {
    /// Sets a literal attribute. URL-bearing attributes are sanitized.
    pub fn attr(self, name: &str, value: impl Into<Value>) -> Self {
        apply_attribute(&self.dom, self.node, name, &value.into());
        self
    }

    /// Binds an attribute to a reactive expression: re-applied whenever a
    /// tracked source of `f` changes.
    pub fn attr_fn(self, name: &str, f: impl Fn() -> Value + 'static) -> Self {
        let dom = self.dom.clone();
        let node = self.node;
        let name = name.to_string();
        effect(move || {
            apply_attribute(&dom, node, &name, &f());
        });
        self
    }

    /// Adds a class.
    pub fn class(self, class: &str) -> Self {
        self.dom.add_class(self.node, class);
        self
    }

    /// Toggles a class on a reactive condition.
    pub fn class_fn(self, class: &str, f: impl Fn() -> bool + 'static) -> Self {
        let dom = self.dom.clone();
        let node = self.node;
        let class = class.to_string();
        effect(move || {
            dom.toggle_class(node, &class, f());
        });
        self
    }

    /// Sets one inline style property.
    pub fn style(self, prop: &str, value: &str) -> Self {
        self.dom.set_style(self.node, prop, value);
        self
    }

    /// Binds an inline style property to a reactive expression.
    pub fn style_fn(self, prop: &str, f: impl Fn() -> String + 'static) -> Self {
        let dom = self.dom.clone();
        let node = self.node;
        let prop = prop.to_string();
        effect(move || {
            dom.set_style(node, &prop, &f());
        });
        self
    }

    /// Sets an element property (not an attribute).
    pub fn prop(self, name: &str, value: impl Into<Value>) -> Self {
        self.dom.set_property(self.node, name, value.into());
        self
    }

    /// Attaches an event listener. Accepts `click` or `onclick`. The
    /// listener is removed when the owning scope is disposed. Skipped in
    /// server-rendering mode.
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        if is_ssr() {
            return self;
        }
        let event = event.strip_prefix("on").unwrap_or(event).to_string();
        let id = self
            .dom
            .add_event_listener(self.node, &event, Rc::new(handler));
        let dom = self.dom.clone();
        let node = self.node;
        on_cleanup(move || dom.remove_event_listener(node, &event, id));
        self
    }

    /// Appends a static child.
    pub fn child(self, child: impl IntoView) -> Self {
        let mut out = Vec::new();
        insert_view(&self.dom, self.node, None, child.into_view(), &mut out);
        self
    }

    /// Appends a reactive region: `f` re-runs on change and its output
    /// replaces everything between a pair of marker comments.
    pub fn child_fn<V: IntoView>(self, f: impl Fn() -> V + 'static) -> Self {
        reactive_region(self.dom.clone(), self.node, move || f().into_view());
        self
    }

    /// Appends a literal text child.
    pub fn text(self, text: impl Into<String>) -> Self {
        let node = self.dom.create_text_node(&text.into());
        self.dom.append_child(self.node, node);
        self
    }

    /// Appends a text node kept in sync with a reactive expression.
    pub fn text_fn(self, f: impl Fn() -> String + 'static) -> Self {
        let node = self.dom.create_text_node("");
        self.dom.append_child(self.node, node);
        let dom = self.dom.clone();
        effect(move || {
            dom.set_text(node, &f());
        });
        self
    }

    /// Finishes the chain, yielding the element handle.
    pub fn build(self) -> NodeId {
        self.node
    }
}

impl IntoView for ElementBuilder {
    fn into_view(self) -> View {
        View::Node(self.node)
    }
}

/// A standalone text node kept in sync with a reactive expression. Used
/// where dynamic text appears outside an element chain.
pub fn dynamic_text(f: impl Fn() -> String + 'static) -> View {
    let dom = document();
    let node = dom.create_text_node("");
    let dom2 = dom.clone();
    effect(move || {
        dom2.set_text(node, &f());
    });
    View::Node(node)
}

fn apply_attribute(dom: &Rc<dyn Dom>, node: NodeId, name: &str, value: &Value) {
    if URL_ATTRIBUTES.contains(&name) {
        let text = value.to_string();
        match sanitize_url(&text) {
            Some(safe) => dom.set_attribute(node, name, safe),
            None => {
                tracing::warn!(attribute = name, "blocked unsafe url value");
                dom.remove_attribute(node, name);
            }
        }
        return;
    }
    match value {
        Value::Null | Value::Bool(false) => dom.remove_attribute(node, name),
        Value::Bool(true) => dom.set_attribute(node, name, ""),
        other => dom.set_attribute(node, name, &other.to_string()),
    }
}

/// Installs a marker-delimited reactive region at the end of `container`.
///
/// Each re-run renders inside a fresh child scope; the previous run's scope
/// is disposed (tearing down its effects) and its nodes removed before the
/// new output is inserted.
pub(crate) fn reactive_region(
    dom: Rc<dyn Dom>,
    container: NodeId,
    f: impl Fn() -> View + 'static,
) {
    let start = dom.create_comment("<>");
    let end = dom.create_comment("</>");
    dom.append_child(container, start);
    dom.append_child(container, end);
    pulse_reactive::effect_with_cleanup(move || {
        let view = f();
        let dom = dom.clone();
        let (nodes, disposer) = run_scope_undisposed(|| {
            let parent = dom.parent_node(end).unwrap_or_else(|| dom.body());
            let mut out = Vec::new();
            insert_view(&dom, parent, Some(end), view, &mut out);
            out
        });
        move || {
            disposer.dispose();
            for node in &nodes {
                dom.remove_node(*node);
            }
        }
    });
}
