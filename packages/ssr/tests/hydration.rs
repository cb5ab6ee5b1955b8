//! Hydration-mismatch diagnosis over pairs of mock trees.

use std::rc::Rc;

use pulse_dom::{reset_document, Dom, MockDom, NodeId};
use pulse_ssr::{diff_nodes, report_to_json, MismatchKind};

fn fresh_dom() -> Rc<MockDom> {
    reset_document();
    let dom = Rc::new(MockDom::new());
    pulse_dom::set_document(dom.clone());
    dom
}

fn card(dom: &MockDom, title: &str) -> NodeId {
    let root = dom.create_element("article");
    dom.set_attribute(root, "id", "card");
    dom.add_class(root, "card");
    let h = dom.create_element("h2");
    dom.append_child(h, dom.create_text_node(title));
    dom.append_child(root, h);
    root
}

#[test]
fn identical_trees_produce_an_empty_report() {
    let dom = fresh_dom();
    let a = card(&dom, "hello");
    let b = card(&dom, "hello");
    assert!(diff_nodes(a, b).is_empty());
}

#[test]
fn leading_and_trailing_whitespace_is_not_a_mismatch() {
    let dom = fresh_dom();
    let a = dom.create_element("p");
    dom.append_child(a, dom.create_text_node("  hello \n"));
    let b = dom.create_element("p");
    dom.append_child(b, dom.create_text_node("hello"));
    assert!(diff_nodes(a, b).is_empty());
}

#[test]
fn timestamp_text_mismatch_suggests_selective_rendering() {
    let dom = fresh_dom();
    let a = dom.create_element("time");
    dom.append_child(a, dom.create_text_node("2024-01-15T12:00:00Z"));
    let b = dom.create_element("time");
    dom.append_child(b, dom.create_text_node("2024-01-15T12:00:01Z"));

    let report = diff_nodes(a, b);
    assert_eq!(report.len(), 1);
    let mismatch = &report[0];
    assert_eq!(mismatch.kind, MismatchKind::Text);
    assert!(mismatch.suggestion.contains("timestamp"), "{}", mismatch.suggestion);
    assert_eq!(mismatch.expected, "2024-01-15T12:00:00Z");
    assert_eq!(mismatch.actual, "2024-01-15T12:00:01Z");
}

#[test]
fn comment_nodes_are_invisible_to_the_comparison() {
    let dom = fresh_dom();
    let a = dom.create_element("div");
    dom.append_child(a, dom.create_comment("client-only"));
    dom.append_child(a, dom.create_text_node("same"));
    let b = dom.create_element("div");
    dom.append_child(b, dom.create_text_node("same"));
    assert!(diff_nodes(a, b).is_empty());
}

#[test]
fn tag_mismatch_stops_descending() {
    let dom = fresh_dom();
    let a = dom.create_element("section");
    dom.append_child(a, dom.create_text_node("x"));
    let b = dom.create_element("div");
    dom.append_child(b, dom.create_text_node("y"));
    let report = diff_nodes(a, b);
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].kind, MismatchKind::Tag);
    assert_eq!(report[0].expected, "section");
    assert_eq!(report[0].actual, "div");
}

#[test]
fn attribute_differences_name_the_attribute() {
    let dom = fresh_dom();
    let a = dom.create_element("a");
    dom.set_attribute(a, "href", "/home");
    let b = dom.create_element("a");
    dom.set_attribute(b, "href", "/start");
    dom.set_attribute(b, "target", "_blank");

    let report = diff_nodes(a, b);
    assert_eq!(report.len(), 2);
    assert!(report.iter().all(|m| m.kind == MismatchKind::Attribute));
    assert!(report.iter().any(|m| m.expected == "href=/home" && m.actual == "href=/start"));
    assert!(report
        .iter()
        .any(|m| m.expected == "target=(unset)" && m.actual == "target=_blank"));
}

#[test]
fn child_count_delta_is_reported_and_counted() {
    let dom = fresh_dom();
    let a = dom.create_element("ul");
    for i in 0..2 {
        let li = dom.create_element("li");
        dom.append_child(li, dom.create_text_node(&i.to_string()));
        dom.append_child(a, li);
    }
    let b = dom.create_element("ul");
    for i in 0..4 {
        let li = dom.create_element("li");
        dom.append_child(li, dom.create_text_node(&i.to_string()));
        dom.append_child(b, li);
    }

    let report = diff_nodes(a, b);
    let children = report
        .iter()
        .find(|m| m.kind == MismatchKind::Children)
        .expect("children summary entry");
    assert!(children.suggestion.contains('2'), "{}", children.suggestion);
    let extras: Vec<_> = report
        .iter()
        .filter(|m| m.kind == MismatchKind::ExtraNode)
        .collect();
    assert_eq!(extras.len(), 2);
}

#[test]
fn missing_nodes_point_at_the_absent_child() {
    let dom = fresh_dom();
    let a = dom.create_element("div");
    dom.append_child(a, dom.create_element("footer"));
    let b = dom.create_element("div");
    let report = diff_nodes(a, b);
    assert!(report.iter().any(|m| m.kind == MismatchKind::MissingNode
        && m.expected == "<footer>"
        && m.actual == "(absent)"));
}

#[test]
fn paths_use_nth_child_with_refinements() {
    let dom = fresh_dom();
    let a = card(&dom, "one");
    let b = card(&dom, "two");
    let report = diff_nodes(a, b);
    assert_eq!(report.len(), 1);
    assert!(
        report[0].path.contains("article:nth-child(1)#card.card"),
        "{}",
        report[0].path
    );
    assert!(report[0].path.contains("h2:nth-child(1)"), "{}", report[0].path);
}

#[test]
fn long_text_is_truncated_in_reports() {
    let dom = fresh_dom();
    let a = dom.create_element("p");
    dom.append_child(a, dom.create_text_node(&"a".repeat(200)));
    let b = dom.create_element("p");
    dom.append_child(b, dom.create_text_node(&"b".repeat(200)));
    let report = diff_nodes(a, b);
    assert_eq!(report.len(), 1);
    assert!(report[0].expected.chars().count() <= 81);
    assert!(report[0].expected.ends_with('…'));
}

#[test]
fn report_serializes_to_the_published_shape() {
    let dom = fresh_dom();
    let a = dom.create_element("time");
    dom.append_child(a, dom.create_text_node("12:00:00"));
    let b = dom.create_element("time");
    dom.append_child(b, dom.create_text_node("12:00:01"));
    let json = report_to_json(&diff_nodes(a, b));
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let entry = &parsed[0];
    assert_eq!(entry["type"], "text");
    assert!(entry["path"].is_string());
    assert!(entry["expected"].is_string());
    assert!(entry["actual"].is_string());
    assert!(entry["suggestion"].is_string());
}
