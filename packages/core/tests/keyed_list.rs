//! Keyed reconciliation: node identity, ordering and reactive indices.

use std::rc::Rc;

use pulse_core::{el, list, list_unkeyed, IntoView};
use pulse_dom::{reset_document, Dom, MockDom, NodeId};
use pulse_reactive::{create_context, pulse, with_context};

fn fresh_dom() -> Rc<MockDom> {
    reset_document();
    let dom = Rc::new(MockDom::new());
    pulse_dom::set_document(dom.clone());
    dom
}

#[derive(Clone, PartialEq)]
struct Item {
    id: i64,
}

fn items(ids: &[i64]) -> Vec<Item> {
    ids.iter().map(|id| Item { id: *id }).collect()
}

/// Element children of `host`, skipping the region markers.
fn element_children(dom: &MockDom, host: NodeId) -> Vec<NodeId> {
    dom.child_nodes(host)
        .into_iter()
        .filter(|n| dom.is_element(*n))
        .collect()
}

#[test]
fn permutation_preserves_node_identity() {
    let dom = fresh_dom();
    let ctx = create_context("keyed-move");
    with_context(&ctx, || {
        let source = pulse(items(&[1, 2, 3]));
        let view = list(
            {
                let source = source.clone();
                move || source.get()
            },
            |item: &Item, _index| el("li").text(item.id.to_string()),
            |item, _i| item.id,
        );
        let host = el("ul").child(view).build();

        let before = element_children(&dom, host);
        assert_eq!(before.len(), 3);
        let (n1, n2, n3) = (before[0], before[1], before[2]);

        source.set(items(&[3, 1, 2]));

        let after = element_children(&dom, host);
        assert_eq!(after, vec![n3, n1, n2]);
        assert_eq!(dom.text_content(host), "312");
    });
    ctx.reset();
}

#[test]
fn additions_and_removals_touch_only_their_rows() {
    let dom = fresh_dom();
    let ctx = create_context("keyed-add-remove");
    with_context(&ctx, || {
        let source = pulse(items(&[1, 2, 3]));
        let view = list(
            {
                let source = source.clone();
                move || source.get()
            },
            |item: &Item, _index| el("li").text(item.id.to_string()),
            |item, _i| item.id,
        );
        let host = el("ul").child(view).build();
        let before = element_children(&dom, host);

        source.set(items(&[1, 4, 3]));
        let after = element_children(&dom, host);
        assert_eq!(after.len(), 3);
        // rows 1 and 3 kept their nodes; row 2 was replaced by a fresh 4
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_ne!(after[1], before[1]);
        assert_eq!(dom.text_content(host), "143");

        source.set(items(&[]));
        assert!(element_children(&dom, host).is_empty());
    });
    ctx.reset();
}

#[test]
fn row_index_is_reactive() {
    let dom = fresh_dom();
    let ctx = create_context("keyed-index");
    with_context(&ctx, || {
        let source = pulse(items(&[10, 20]));
        let view = list(
            {
                let source = source.clone();
                move || source.get()
            },
            |item: &Item, index| {
                let id = item.id;
                el("li").text_fn(move || format!("{}:{}", index.get(), id))
            },
            |item, _i| item.id,
        );
        let host = el("ul").child(view).build();
        assert_eq!(dom.text_content(host), "0:101:20");

        source.set(items(&[20, 10]));
        assert_eq!(dom.text_content(host), "0:201:10");
    });
    ctx.reset();
}

#[test]
fn reverse_keeps_every_identity() {
    let dom = fresh_dom();
    let ctx = create_context("keyed-reverse");
    with_context(&ctx, || {
        let source = pulse(items(&[1, 2, 3, 4, 5]));
        let view = list(
            {
                let source = source.clone();
                move || source.get()
            },
            |item: &Item, _index| el("li").text(item.id.to_string()),
            |item, _i| item.id,
        );
        let host = el("ul").child(view).build();
        let before = element_children(&dom, host);

        source.set(items(&[5, 4, 3, 2, 1]));
        let after = element_children(&dom, host);
        let mut expected = before.clone();
        expected.reverse();
        assert_eq!(after, expected);
    });
    ctx.reset();
}

#[test]
fn unkeyed_list_rerenders_the_whole_region() {
    let dom = fresh_dom();
    let ctx = create_context("unkeyed");
    with_context(&ctx, || {
        let source = pulse(vec![1i64, 2]);
        let view = list_unkeyed(
            {
                let source = source.clone();
                move || source.get()
            },
            |value, _i| el("li").text(value.to_string()).into_view(),
        );
        let host = el("ul").child(view).build();
        let before = element_children(&dom, host);

        source.set(vec![1, 2, 3]);
        let after = element_children(&dom, host);
        assert_eq!(after.len(), 3);
        // no identity preservation without keys
        assert!(!after.contains(&before[0]));
        assert_eq!(dom.text_content(host), "123");
    });
    ctx.reset();
}
