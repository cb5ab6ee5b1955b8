//! Two-way bindings between form controls and pulses.

use std::rc::Rc;

use pulse_dom::{document, Dom, NodeId, Value};
use pulse_reactive::{effect, is_ssr, on_cleanup, Pulse};

/// Options for [`bind`]: which event signals a user edit and which element
/// property carries the value.
pub struct BindOptions {
    pub event: String,
    pub prop: String,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            event: "input".to_string(),
            prop: "value".to_string(),
        }
    }
}

/// Wires `cell` to an element property in both directions: the named event
/// writes the property into the cell, and an effect writes cell changes
/// back to the property. Listener registration is skipped in
/// server-rendering mode.
pub fn bind(el: NodeId, cell: &Pulse<Value>, options: BindOptions) {
    bind_with(el, cell, options, |v| v)
}

fn bind_with(
    el: NodeId,
    cell: &Pulse<Value>,
    options: BindOptions,
    cast: impl Fn(Value) -> Value + 'static,
) {
    let dom = document();
    let prop = options.prop;

    if !is_ssr() {
        let listener = {
            let dom = dom.clone();
            let cell = cell.clone();
            let prop = prop.clone();
            let cast = Rc::new(cast);
            move |_event: &pulse_dom::Event| {
                cell.set(cast(dom.get_property(el, &prop)));
            }
        };
        let id = dom.add_event_listener(el, &options.event, Rc::new(listener));
        let dom_cleanup = dom.clone();
        let event = options.event.clone();
        on_cleanup(move || dom_cleanup.remove_event_listener(el, &event, id));
    }

    let cell = cell.clone();
    effect(move || {
        dom.set_property(el, &prop, cell.get());
    });
}

/// [`bind`] with event, property and cast chosen from the element's input
/// type: checkboxes bind `checked` on `change`, numeric inputs cast the
/// value to a number, everything else binds `value` on `input`.
pub fn model(el: NodeId, cell: &Pulse<Value>) {
    let dom = document();
    match dom.input_type(el).as_deref() {
        Some("checkbox") => bind_with(
            el,
            cell,
            BindOptions {
                event: "change".to_string(),
                prop: "checked".to_string(),
            },
            |v| Value::Bool(v.is_truthy()),
        ),
        Some("number") | Some("range") => bind_with(
            el,
            cell,
            BindOptions::default(),
            |v| match v.as_f64() {
                Some(n) if n.fract() == 0.0 => Value::Int(n as i64),
                Some(n) => Value::Float(n),
                None => Value::Float(f64::NAN),
            },
        ),
        _ => bind(el, cell, BindOptions::default()),
    }
}
