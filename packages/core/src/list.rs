//! Keyed list reconciliation.
//!
//! The reconciler computes the longest increasing subsequence of old row
//! positions ordered by new position; rows on that subsequence keep their
//! DOM nodes in place, every other surviving row is moved, missing keys are
//! torn down and fresh keys are built in their own scope. A row whose key
//! is unchanged keeps its node identity, and with it focus and caret state.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use longest_increasing_subsequence::lis_with;
use pulse_dom::{document, Dom, NodeId};
use pulse_reactive::{
    batch, effect, on_cleanup, pulse, run_scope_undisposed, untrack, Pulse,
    ScopeDisposer,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::reactive_region;
use crate::view::{insert_view, IntoView, View};

struct Row<K> {
    key: K,
    nodes: Vec<NodeId>,
    index: Pulse<usize>,
    scope: Option<ScopeDisposer>,
}

/// Renders a keyed, reordering list between marker comments.
///
/// `source` is tracked; on any change the DOM child order is made equal to
/// the new key order with a minimum of moves. `render` receives a reactive
/// index cell that updates when the row's position changes. Keys must be
/// unique within one render.
pub fn list<T, K, V>(
    source: impl Fn() -> Vec<T> + 'static,
    render: impl Fn(&T, Pulse<usize>) -> V + 'static,
    key: impl Fn(&T, usize) -> K + 'static,
) -> View
where
    T: 'static,
    K: Eq + Hash + Clone + 'static,
    V: IntoView,
{
    let dom = document();
    let fragment = dom.create_fragment();
    let start = dom.create_comment("<>");
    let end = dom.create_comment("</>");
    dom.append_child(fragment, start);
    dom.append_child(fragment, end);

    let rows: Rc<RefCell<Vec<Row<K>>>> = Rc::new(RefCell::new(Vec::new()));

    {
        let rows = rows.clone();
        let dom = dom.clone();
        on_cleanup(move || {
            for mut row in rows.borrow_mut().drain(..) {
                if let Some(scope) = row.scope.take() {
                    scope.dispose();
                }
                for node in &row.nodes {
                    dom.remove_node(*node);
                }
            }
        });
    }

    let dom = dom.clone();
    effect(move || {
        let items = source();
        let new_keys: Vec<K> = items
            .iter()
            .enumerate()
            .map(|(i, item)| key(item, i))
            .collect();
        batch(|| {
            untrack(|| {
                reconcile(
                    &dom,
                    end,
                    &mut rows.borrow_mut(),
                    &items,
                    &new_keys,
                    &render,
                );
            });
        });
    });

    View::Node(fragment)
}

fn reconcile<T, K, V>(
    dom: &Rc<dyn Dom>,
    end: NodeId,
    rows: &mut Vec<Row<K>>,
    items: &[T],
    new_keys: &[K],
    render: &impl Fn(&T, Pulse<usize>) -> V,
) where
    K: Eq + Hash + Clone,
    V: IntoView,
{
    let parent = dom.parent_node(end).unwrap_or_else(|| dom.body());

    // old position of each surviving key, by new position; usize::MAX marks
    // a key with no previous row
    let new_index_to_old_index: Vec<usize> = {
        let old_index_of: FxHashMap<&K, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (&row.key, i))
            .collect();
        new_keys
            .iter()
            .map(|k| old_index_of.get(k).copied().unwrap_or(usize::MAX))
            .collect()
    };

    // tear down rows whose keys are gone; keep the rest by key
    let new_key_set: FxHashSet<K> = new_keys.iter().cloned().collect();
    let mut reusable: FxHashMap<K, Row<K>> = FxHashMap::default();
    for mut row in rows.drain(..) {
        if new_key_set.contains(&row.key) {
            reusable.insert(row.key.clone(), row);
        } else {
            if let Some(scope) = row.scope.take() {
                scope.dispose();
            }
            for node in &row.nodes {
                dom.remove_node(*node);
            }
        }
    }

    // rows on the longest increasing subsequence of old positions stay in
    // place; that leaves n - |LIS| moves, the minimum
    let mut in_lis: FxHashSet<usize> = FxHashSet::default();
    in_lis.reserve(new_index_to_old_index.len());
    let mut predecessors = vec![0; new_index_to_old_index.len()];
    let mut starts = vec![0; new_index_to_old_index.len()];
    lis_with(
        &new_index_to_old_index,
        &mut in_lis,
        |a, b| a < b,
        &mut predecessors,
        &mut starts,
    );
    // fresh keys carry the MAX sentinel and never count as kept-in-place
    in_lis.retain(|i| new_index_to_old_index[*i] != usize::MAX);

    let mut new_rows: Vec<Row<K>> = Vec::with_capacity(new_keys.len());
    let mut anchor = end;
    for i in (0..new_keys.len()).rev() {
        let key_i = &new_keys[i];
        let row = match reusable.remove(key_i) {
            Some(row) => {
                if !in_lis.contains(&i) {
                    for node in &row.nodes {
                        dom.insert_before(parent, *node, Some(anchor));
                    }
                }
                row
            }
            None => {
                let ((index, nodes), disposer) = run_scope_undisposed(|| {
                    let index = pulse(i);
                    let view = render(&items[i], index.clone()).into_view();
                    let mut nodes = Vec::new();
                    insert_view(dom, parent, Some(anchor), view, &mut nodes);
                    (index, nodes)
                });
                Row {
                    key: key_i.clone(),
                    nodes,
                    index,
                    scope: Some(disposer),
                }
            }
        };
        row.index.set(i);
        if let Some(first) = row.nodes.first() {
            anchor = *first;
        }
        new_rows.push(row);
    }
    new_rows.reverse();
    *rows = new_rows;
}

/// Unkeyed list rendering: the entire region re-renders on any source
/// change. Node identity is not preserved across renders; prefer [`list`]
/// with a key function anywhere identity or input state matters.
pub fn list_unkeyed<T, V>(
    source: impl Fn() -> Vec<T> + 'static,
    render: impl Fn(&T, usize) -> V + 'static,
) -> View
where
    T: 'static,
    V: IntoView,
{
    let dom = document();
    let fragment = dom.create_fragment();
    reactive_region(dom.clone(), fragment, move || {
        let items = source();
        View::Fragment(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| untrack(|| render(item, i).into_view()))
                .collect(),
        )
    });
    View::Node(fragment)
}
