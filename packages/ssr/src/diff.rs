//! Hydration-mismatch diagnosis.
//!
//! Walks a server-produced and a client-produced tree through the adapter
//! and reports every observable difference with a DOM path and a repair
//! suggestion. Comment nodes (region and selective-rendering markers) are
//! invisible to the comparison.

use pulse_dom::{document, Dom, NodeId};
use serde::Serialize;
use std::rc::Rc;

const TEXT_PREVIEW_LIMIT: usize = 80;

/// Kind of an observed difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchKind {
    Tag,
    Text,
    Attribute,
    Children,
    #[serde(rename = "extra")]
    ExtraNode,
    #[serde(rename = "missing")]
    MissingNode,
}

/// One observed difference between the server and client trees.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mismatch {
    #[serde(rename = "type")]
    pub kind: MismatchKind,
    pub path: String,
    pub expected: String,
    pub actual: String,
    pub suggestion: String,
}

/// Compares two trees and reports their differences. Equal trees produce an
/// empty report.
pub fn diff_nodes(server: NodeId, client: NodeId) -> Vec<Mismatch> {
    let dom = document();
    let mut report = Vec::new();
    walk(&dom, server, client, &node_path(&dom, server, 1), &mut report);
    report
}

/// Serializes a report to the published JSON shape.
pub fn report_to_json(report: &[Mismatch]) -> String {
    serde_json::to_string(report).expect("mismatch report serializes")
}

fn walk(
    dom: &Rc<dyn Dom>,
    server: NodeId,
    client: NodeId,
    path: &str,
    report: &mut Vec<Mismatch>,
) {
    // text vs text
    if dom.is_text(server) || dom.is_text(client) {
        if !dom.is_text(server) || !dom.is_text(client) {
            report.push(mismatch(
                MismatchKind::Tag,
                path,
                describe(dom, server),
                describe(dom, client),
            ));
            return;
        }
        let expected = dom.text_content(server);
        let actual = dom.text_content(client);
        if expected.trim() != actual.trim() {
            report.push(mismatch(
                MismatchKind::Text,
                path,
                truncate(expected.trim()),
                truncate(actual.trim()),
            ));
        }
        return;
    }

    // element vs element
    let server_tag = dom.tag_name(server);
    let client_tag = dom.tag_name(client);
    if server_tag != client_tag {
        report.push(mismatch(
            MismatchKind::Tag,
            path,
            server_tag.unwrap_or_else(|| describe(dom, server)),
            client_tag.unwrap_or_else(|| describe(dom, client)),
        ));
        return;
    }

    // attributes: union of both sides' names, in server order first
    let mut names = dom.attribute_names(server);
    for name in dom.attribute_names(client) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    for name in names {
        let expected = dom.get_attribute(server, &name);
        let actual = dom.get_attribute(client, &name);
        if expected != actual {
            report.push(Mismatch {
                kind: MismatchKind::Attribute,
                path: path.to_string(),
                expected: format!("{name}={}", expected.as_deref().unwrap_or("(unset)")),
                actual: format!("{name}={}", actual.as_deref().unwrap_or("(unset)")),
                suggestion: suggestion_for(
                    MismatchKind::Attribute,
                    expected.as_deref().unwrap_or(""),
                    actual.as_deref().unwrap_or(""),
                ),
            });
        }
    }

    // children, with comments filtered out of both sides
    let server_children = visible_children(dom, server);
    let client_children = visible_children(dom, client);
    if server_children.len() != client_children.len() {
        report.push(mismatch(
            MismatchKind::Children,
            path,
            format!("{} children", server_children.len()),
            format!("{} children", client_children.len()),
        ));
    }
    let shared = server_children.len().min(client_children.len());
    for (i, (s, c)) in server_children
        .iter()
        .zip(client_children.iter())
        .take(shared)
        .enumerate()
    {
        let child_path = format!("{} > {}", path, node_path(dom, *s, i + 1));
        walk(dom, *s, *c, &child_path, report);
    }
    for (i, s) in server_children.iter().enumerate().skip(shared) {
        let child_path = format!("{} > {}", path, node_path(dom, *s, i + 1));
        report.push(mismatch(
            MismatchKind::MissingNode,
            &child_path,
            describe(dom, *s),
            "(absent)".to_string(),
        ));
    }
    for (i, c) in client_children.iter().enumerate().skip(shared) {
        let child_path = format!("{} > {}", path, node_path(dom, *c, i + 1));
        report.push(mismatch(
            MismatchKind::ExtraNode,
            &child_path,
            "(absent)".to_string(),
            describe(dom, *c),
        ));
    }
}

fn mismatch(
    kind: MismatchKind,
    path: &str,
    expected: String,
    actual: String,
) -> Mismatch {
    let suggestion = suggestion_for(kind, &expected, &actual);
    Mismatch {
        kind,
        path: path.to_string(),
        expected,
        actual,
        suggestion,
    }
}

fn visible_children(dom: &Rc<dyn Dom>, node: NodeId) -> Vec<NodeId> {
    dom.child_nodes(node)
        .into_iter()
        .filter(|child| !dom.is_comment(*child))
        .collect()
}

/// `tag:nth-child(n)` with `#id` and `.class` refinements for elements,
/// `text:nth-child(n)` for text nodes.
fn node_path(dom: &Rc<dyn Dom>, node: NodeId, nth: usize) -> String {
    match dom.tag_name(node) {
        Some(tag) => {
            let mut out = format!("{tag}:nth-child({nth})");
            if let Some(id) = dom.get_attribute(node, "id") {
                out.push('#');
                out.push_str(&id);
            }
            if let Some(class) = dom.get_attribute(node, "class") {
                for c in class.split_whitespace() {
                    out.push('.');
                    out.push_str(c);
                }
            }
            out
        }
        None => format!("text:nth-child({nth})"),
    }
}

fn describe(dom: &Rc<dyn Dom>, node: NodeId) -> String {
    match dom.tag_name(node) {
        Some(tag) => format!("<{tag}>"),
        None => truncate(dom.text_content(node).trim()),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= TEXT_PREVIEW_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(TEXT_PREVIEW_LIMIT).collect();
    format!("{head}…")
}

/// Produces the human suggestion attached to a mismatch.
pub fn suggestion_for(kind: MismatchKind, expected: &str, actual: &str) -> String {
    match kind {
        MismatchKind::Text => {
            if looks_like_timestamp(expected) || looks_like_timestamp(actual) {
                "text looks like a timestamp that differs between render passes; \
                 wrap it in client_only (or server_only) so a single environment owns it"
                    .to_string()
            } else {
                "text content differs; make sure it does not depend on \
                 environment-specific state"
                    .to_string()
            }
        }
        MismatchKind::Tag => {
            "element tags differ; check conditional rendering that depends on the \
             environment"
                .to_string()
        }
        MismatchKind::Attribute => {
            "attribute values differ; avoid attributes computed from server-only or \
             client-only state"
                .to_string()
        }
        MismatchKind::Children => {
            let delta = child_count(expected).abs_diff(child_count(actual));
            format!(
                "child counts differ by {delta}; a conditional branch probably \
                 rendered on one side only"
            )
        }
        MismatchKind::ExtraNode => {
            "the client rendered a node the server did not; wrap client-only output \
             in client_only"
                .to_string()
        }
        MismatchKind::MissingNode => {
            "the server rendered a node the client did not; wrap server-only output \
             in server_only"
                .to_string()
        }
    }
}

fn child_count(text: &str) -> usize {
    text.split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Shape check for timestamp-looking text: ISO-8601 dates, `hh:mm[:ss]`
/// times, and 10-13 digit epoch values.
fn looks_like_timestamp(text: &str) -> bool {
    let text = text.trim();
    if (10..=13).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    has_date_shape(text) || has_time_shape(text)
}

fn has_date_shape(text: &str) -> bool {
    // DDDD-DD-DD anywhere in the text
    let bytes = text.as_bytes();
    bytes.windows(10).any(|w| {
        w[0].is_ascii_digit()
            && w[1].is_ascii_digit()
            && w[2].is_ascii_digit()
            && w[3].is_ascii_digit()
            && w[4] == b'-'
            && w[5].is_ascii_digit()
            && w[6].is_ascii_digit()
            && w[7] == b'-'
            && w[8].is_ascii_digit()
            && w[9].is_ascii_digit()
    })
}

fn has_time_shape(text: &str) -> bool {
    // DD:DD anywhere in the text
    let bytes = text.as_bytes();
    bytes.windows(5).any(|w| {
        w[0].is_ascii_digit()
            && w[1].is_ascii_digit()
            && w[2] == b':'
            && w[3].is_ascii_digit()
            && w[4].is_ascii_digit()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_shapes() {
        assert!(looks_like_timestamp("2024-01-15T12:00:00Z"));
        assert!(looks_like_timestamp("12:30:45"));
        assert!(looks_like_timestamp("1705312800000"));
        assert!(!looks_like_timestamp("hello world"));
        assert!(!looks_like_timestamp("42"));
    }

    #[test]
    fn truncation_keeps_eighty_chars() {
        let long = "x".repeat(200);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), TEXT_PREVIEW_LIMIT + 1);
        assert!(out.ends_with('…'));
    }
}
