//! Structural semantics of the in-memory document.

use std::cell::Cell;
use std::rc::Rc;

use pulse_dom::{Dom, Event, MockDom, Value};

#[test]
fn insert_before_and_sibling_links_agree() {
    let dom = MockDom::new();
    let parent = dom.create_element("ul");
    let a = dom.create_element("li");
    let b = dom.create_element("li");
    let c = dom.create_element("li");
    dom.append_child(parent, a);
    dom.append_child(parent, c);
    dom.insert_before(parent, b, Some(c));

    assert_eq!(dom.child_nodes(parent), vec![a, b, c]);
    assert_eq!(dom.next_sibling(a), Some(b));
    assert_eq!(dom.next_sibling(b), Some(c));
    assert_eq!(dom.next_sibling(c), None);
    assert_eq!(dom.parent_node(b), Some(parent));
}

#[test]
fn moving_a_node_detaches_it_first() {
    let dom = MockDom::new();
    let parent = dom.create_element("div");
    let a = dom.create_text_node("a");
    let b = dom.create_text_node("b");
    dom.append_child(parent, a);
    dom.append_child(parent, b);
    // moving `b` before `a` within the same parent
    dom.insert_before(parent, b, Some(a));
    assert_eq!(dom.child_nodes(parent), vec![b, a]);
    assert_eq!(dom.text_content(parent), "ba");
}

#[test]
fn text_content_concatenates_the_subtree() {
    let dom = MockDom::new();
    let outer = dom.create_element("div");
    let inner = dom.create_element("span");
    dom.append_child(outer, dom.create_text_node("a"));
    dom.append_child(inner, dom.create_text_node("b"));
    dom.append_child(outer, inner);
    assert_eq!(dom.text_content(outer), "ab");
}

#[test]
fn properties_fall_back_to_attributes() {
    let dom = MockDom::new();
    let input = dom.create_element("input");
    dom.set_attribute(input, "value", "initial");
    assert_eq!(
        dom.get_property(input, "value"),
        Value::Text("initial".to_string())
    );
    dom.set_property(input, "value", Value::Text("typed".to_string()));
    assert_eq!(
        dom.get_property(input, "value"),
        Value::Text("typed".to_string())
    );
    // the attribute is untouched by the property write
    assert_eq!(dom.get_attribute(input, "value").as_deref(), Some("initial"));
}

#[test]
fn input_type_defaults_to_text() {
    let dom = MockDom::new();
    let plain = dom.create_element("input");
    assert_eq!(dom.input_type(plain).as_deref(), Some("text"));
    let checkbox = dom.create_element("input");
    dom.set_attribute(checkbox, "type", "CHECKBOX");
    assert_eq!(dom.input_type(checkbox).as_deref(), Some("checkbox"));
    let div = dom.create_element("div");
    assert_eq!(dom.input_type(div), None);
}

#[test]
fn timers_run_in_due_order() {
    let dom = MockDom::new();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    let o = order.clone();
    dom.set_timeout(Box::new(move || o.borrow_mut().push("late")), 100);
    let o = order.clone();
    dom.set_timeout(Box::new(move || o.borrow_mut().push("early")), 10);
    dom.run_all_timers();
    assert_eq!(*order.borrow(), vec!["early", "late"]);
}

#[test]
fn cleared_timers_never_fire() {
    let dom = MockDom::new();
    let fired = Rc::new(Cell::new(false));
    let f = fired.clone();
    let id = dom.set_timeout(Box::new(move || f.set(true)), 5);
    dom.clear_timeout(id);
    dom.run_all_timers();
    assert!(!fired.get());
    assert_eq!(dom.pending_timers(), 0);
}

#[test]
fn dispatch_during_dispatch_is_safe() {
    let dom = Rc::new(MockDom::new());
    let button = dom.create_element("button");
    let inner = dom.create_element("span");
    let count = Rc::new(Cell::new(0));
    {
        let dom_inner = dom.clone();
        let count = count.clone();
        let handler: pulse_dom::EventHandler = Rc::new(move |_e| {
            count.set(count.get() + 1);
            // listeners may re-enter the adapter
            dom_inner.dispatch_event(inner, &Event::new("nested"));
        });
        dom.add_event_listener(button, "click", handler);
    }
    dom.dispatch_event(button, &Event::new("click"));
    assert_eq!(count.get(), 1);
}

#[test]
fn node_predicates_identify_kinds() {
    let dom = MockDom::new();
    let element = dom.create_element("div");
    let text = dom.create_text_node("t");
    let comment = dom.create_comment("c");
    let fragment = dom.create_fragment();

    assert!(dom.is_element(element) && !dom.is_text(element) && !dom.is_comment(element));
    assert!(dom.is_text(text) && !dom.is_element(text));
    assert!(dom.is_comment(comment));
    assert!(dom.is_node(fragment) && !dom.is_element(fragment));
    assert_eq!(dom.tag_name(element).as_deref(), Some("div"));
    assert_eq!(dom.tag_name(text), None);
}
