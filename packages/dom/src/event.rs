//! Synthetic events dispatched through the adapter.

use crate::{NodeId, Value};

/// An event delivered to listeners registered through the adapter.
///
/// Real adapters translate native browser events into this shape; the mock
/// adapter dispatches them verbatim, which is what makes interaction tests
/// deterministic.
#[derive(Clone, Debug)]
pub struct Event {
    /// Event name without an `on` prefix, e.g. `click` or `input`.
    pub name: String,
    /// The node the event was dispatched on, when known.
    pub target: Option<NodeId>,
    /// Free-form payload. Input-ish events put the new control value here.
    pub value: Value,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            value: Value::Null,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            target: None,
            value: value.into(),
        }
    }
}

/// Identifies a listener registration so it can be removed symmetrically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Identifies a pending timeout or interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);
