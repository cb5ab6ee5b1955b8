//! Reactive collections: the dynamic state surface compiled components use.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::runtime::batch;
use crate::signal::{pulse, Pulse, Trigger};

/// A reactive string-keyed map. Each key is backed by its own cell, created
/// on first access, so consumers only re-run for the keys they read.
pub struct StateMap<V: Clone + PartialEq + Default + 'static> {
    entries: Rc<RefCell<FxHashMap<String, Pulse<V>>>>,
}

impl<V: Clone + PartialEq + Default + 'static> Clone for StateMap<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> Default for StateMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq + Default + 'static> StateMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(FxHashMap::default())),
        }
    }

    /// The cell behind `key`, created with a default value if absent.
    pub fn entry(&self, key: &str) -> Pulse<V> {
        let mut entries = self.entries.borrow_mut();
        entries
            .entry(key.to_string())
            .or_insert_with(|| pulse(V::default()))
            .clone()
    }

    pub fn get(&self, key: &str) -> V {
        self.entry(key).get()
    }

    pub fn set(&self, key: &str, value: V) {
        self.entry(key).set(value);
    }
}

/// A reactive vector. Every mutator notifies exactly once; batching
/// coalesces consecutive mutations into a single downstream flush.
pub struct ReactiveVec<T: Clone + 'static> {
    items: Rc<RefCell<Vec<T>>>,
    trigger: Trigger,
}

impl<T: Clone + 'static> Clone for ReactiveVec<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

impl<T: Clone + 'static> ReactiveVec<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(initial)),
            trigger: Trigger::new(),
        }
    }

    /// Tracked read of the whole vector.
    pub fn get(&self) -> Vec<T> {
        self.trigger.track();
        self.items.borrow().clone()
    }

    /// Tracked read through a borrow, without cloning the storage.
    pub fn with<O>(&self, f: impl FnOnce(&[T]) -> O) -> O {
        self.trigger.track();
        f(&self.items.borrow())
    }

    pub fn len(&self) -> usize {
        self.trigger.track();
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutate<O>(&self, f: impl FnOnce(&mut Vec<T>) -> O) -> O {
        let out = f(&mut self.items.borrow_mut());
        self.trigger.notify();
        out
    }

    pub fn push(&self, item: T) {
        self.mutate(|items| items.push(item));
    }

    pub fn pop(&self) -> Option<T> {
        self.mutate(|items| items.pop())
    }

    pub fn insert(&self, index: usize, item: T) {
        self.mutate(|items| items.insert(index, item));
    }

    pub fn remove(&self, index: usize) -> T {
        self.mutate(|items| items.remove(index))
    }

    /// Removes `count` items starting at `start` and inserts `replacement`
    /// in their place, returning the removed items.
    pub fn splice(&self, start: usize, count: usize, replacement: Vec<T>) -> Vec<T> {
        self.mutate(|items| {
            let end = (start + count).min(items.len());
            items.splice(start..end, replacement).collect()
        })
    }

    pub fn set(&self, index: usize, item: T) {
        self.mutate(|items| items[index] = item);
    }

    pub fn set_len(&self, len: usize) {
        self.mutate(|items| items.truncate(len));
    }

    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.mutate(|items| items.sort_by(compare));
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Replaces the entire contents in one notification.
    pub fn replace(&self, new: Vec<T>) {
        batch(|| {
            self.mutate(|items| *items = new);
        });
    }
}
