//! `pulse-dom` - the document boundary of the Pulse framework.
//!
//! Everything above this crate mutates a document exclusively through the
//! [`Dom`] trait, resolved at runtime from a process-wide slot. That
//! indirection is what lets the same component code render into a browser,
//! an in-memory tree for tests, or a server-side render pass.

pub(crate) mod adapter;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod mock;
pub(crate) mod slot;
pub(crate) mod value;

#[cfg(feature = "web")]
pub mod web;

pub use crate::adapter::{Dom, EventHandler, NodeId, RepeatingTask, Task};
pub use crate::error::DomError;
pub use crate::event::{Event, ListenerId, TimerId};
pub use crate::mock::MockDom;
pub use crate::slot::{document, reset_document, set_document, with_document};
pub use crate::value::Value;

#[cfg(feature = "web")]
pub use crate::web::WebDom;
