//! A whole counter application driven end to end: reactive state, the
//! element builder, event dispatch through the mock document, and
//! mount/unmount lifecycle. This is the hand-expanded form of what the
//! compiler emits for a counter component.

use std::rc::Rc;

use pulse::prelude::*;
use pulse_dom::{Dom, MockDom};
use pulse_reactive::{create_context, with_context};

fn fresh_dom() -> Rc<MockDom> {
    pulse_dom::reset_document();
    let dom = Rc::new(MockDom::new());
    set_document(dom.clone());
    dom
}

fn counter(props: Props) -> View {
    component(move |ctx| {
        let label = ctx.props.get_or("label", Value::Text(String::from("Count")));
        let count = pulse(Value::Int(0));
        let increment = Rc::new({
            let count = count.clone();
            move || {
                count.update(|v| *v = v.add(&Value::Int(1)));
            }
        });
        el("div.counter")
            .child(el("h1").text_fn({
                let label = label.clone();
                let count = count.clone();
                move || format!("{}: {}", label, count.get())
            }))
            .child(el("button").attr("type", "button").on("click", {
                let increment = increment.clone();
                move |_event| (*increment)()
            }).text("+"))
    })(props)
}

#[test]
fn clicks_flow_from_the_document_back_into_state() {
    let dom = fresh_dom();
    let app = dom.create_element("div");
    dom.set_attribute(app, "id", "app");
    dom.append_child(dom.body(), app);

    let ctx = create_context("counter-app");
    with_context(&ctx, || {
        let handle = mount("#app", counter(Props::new().with("label", "Clicks"))).unwrap();
        dom.flush_microtasks();

        let h1 = dom.query_selector("h1").unwrap();
        assert_eq!(dom.text_content(h1), "Clicks: 0");

        let button = dom.query_selector("button").unwrap();
        dom.dispatch_event(button, &Event::new("click"));
        dom.dispatch_event(button, &Event::new("click"));
        assert_eq!(dom.text_content(h1), "Clicks: 2");

        handle.unmount();
        assert!(dom.child_nodes(app).is_empty());
    });
    ctx.reset();
}

#[test]
fn compiled_counter_component_references_only_the_prelude_surface() {
    use pulse::compiler::{compile, CompileOptions};

    let source = r#"'use client'
@page Counter
state { count: 0 }
actions { increment() { count++ } }
view {
  div.counter {
    h1 "Count: {count}"
    button @click(increment()) "+"
  }
}
"#;
    let out = compile(source, CompileOptions::new("Counter.pulse")).unwrap();
    // the generated code pulls everything from the single prelude namespace
    assert!(out.code.contains("use pulse::prelude::*;"), "{}", out.code);
    for call in ["component(", "pulse(", "el(", ".on(\"click\""] {
        assert!(out.code.contains(call), "missing `{call}` in:\n{}", out.code);
    }
    assert!(out.code.contains("__DIRECTIVE"), "{}", out.code);
}

#[test]
fn ssr_render_then_client_render_diff_is_clean_for_stable_output() {
    let dom = fresh_dom();
    let ctx = create_context("ssr-pass");

    let render = || {
        el("main")
            .child(el("h1").text("static title"))
            .child(client_only(|| el("canvas")))
            .build()
    };

    let (server_tree, client_tree) = with_context(&ctx, || {
        set_ssr_mode(true);
        let server_tree = render();
        set_ssr_mode(false);
        let client_tree = render();
        (server_tree, client_tree)
    });

    // the canvas is behind a comment placeholder on the server, and
    // comments are invisible to the differ, so only the canvas itself
    // differs between the passes
    let report = pulse::ssr::diff_nodes(server_tree, client_tree);
    assert_eq!(report.len(), 2, "{report:?}");
    assert!(report
        .iter()
        .any(|m| m.kind == pulse::ssr::MismatchKind::Children));
    assert!(report
        .iter()
        .any(|m| m.kind == pulse::ssr::MismatchKind::ExtraNode));

    drop(dom);
    ctx.reset();
}
