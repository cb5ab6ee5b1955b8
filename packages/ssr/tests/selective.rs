//! Selective-rendering factories under both rendering modes.

use std::cell::Cell;
use std::rc::Rc;

use pulse_core::{el, View};
use pulse_dom::{reset_document, Dom, MockDom};
use pulse_ssr::{client_only, client_only_or, server_only, set_ssr_mode};

fn fresh_dom() -> Rc<MockDom> {
    reset_document();
    let dom = Rc::new(MockDom::new());
    pulse_dom::set_document(dom.clone());
    set_ssr_mode(false);
    dom
}

#[test]
fn client_only_emits_a_placeholder_on_the_server() {
    let dom = fresh_dom();
    set_ssr_mode(true);
    let invoked = Rc::new(Cell::new(false));
    let view = client_only({
        let invoked = invoked.clone();
        move || {
            invoked.set(true);
            el("canvas")
        }
    });
    assert!(!invoked.get(), "factory must not run during server render");
    let View::Node(node) = view else {
        panic!("expected a placeholder node");
    };
    assert!(dom.is_comment(node));
    assert_eq!(dom.text_content(node), "client-only");
    set_ssr_mode(false);
}

#[test]
fn client_only_runs_the_factory_on_the_client() {
    let dom = fresh_dom();
    let view = client_only(|| el("canvas"));
    let View::Node(node) = view else {
        panic!("expected the factory output");
    };
    assert_eq!(dom.tag_name(node).as_deref(), Some("canvas"));
}

#[test]
fn client_only_fallback_replaces_the_placeholder() {
    let dom = fresh_dom();
    set_ssr_mode(true);
    let view = client_only_or(|| el("canvas"), || el("p").text("loading"));
    let View::Node(node) = view else { panic!() };
    assert_eq!(dom.tag_name(node).as_deref(), Some("p"));
    assert_eq!(dom.text_content(node), "loading");
    set_ssr_mode(false);
}

#[test]
fn server_only_inverts() {
    let dom = fresh_dom();

    // client render: placeholder, factory skipped
    let invoked = Rc::new(Cell::new(false));
    let view = server_only({
        let invoked = invoked.clone();
        move || {
            invoked.set(true);
            el("aside")
        }
    });
    assert!(!invoked.get());
    let View::Node(node) = view else { panic!() };
    assert!(dom.is_comment(node));
    assert_eq!(dom.text_content(node), "server-only");

    // server render: the factory output
    set_ssr_mode(true);
    let view = server_only(|| el("aside").text("server stats"));
    let View::Node(node) = view else { panic!() };
    assert_eq!(dom.tag_name(node).as_deref(), Some("aside"));
    set_ssr_mode(false);
}

#[test]
fn placeholders_serialize_as_comments() {
    let dom = fresh_dom();
    set_ssr_mode(true);
    let view = client_only(|| el("canvas"));
    let host = el("div").child(view).build();
    assert_eq!(dom.to_html(host), "<div><!--client-only--></div>");
    set_ssr_mode(false);
}
