//! `pulse-core` - the rendering layer of the Pulse framework.
//!
//! Elements are built eagerly through the [`el`] builder; reactive
//! attributes and children are individual effects bound to the node they
//! maintain. [`list`] reconciles keyed rows with a minimum of DOM moves,
//! [`when`] swaps conditional subtrees between marker comments, and
//! [`component`] wraps a setup function with a reactive scope and
//! mount/unmount lifecycle.

pub(crate) mod bind;
pub(crate) mod builder;
pub(crate) mod component;
pub(crate) mod epoch;
pub(crate) mod list;
pub(crate) mod mount;
pub(crate) mod selector;
pub(crate) mod style;
pub(crate) mod view;
pub(crate) mod when;

pub(crate) mod innerlude {
    pub use crate::bind::{bind, model, BindOptions};
    pub use crate::builder::{dynamic_text, el, sanitize_url, ElementBuilder};
    pub use crate::component::{component, on_mount, on_unmount, ComponentCtx, Props};
    pub use crate::epoch::{Epoch, EpochHandle};
    pub use crate::list::{list, list_unkeyed};
    pub use crate::mount::{mount, MountHandle, MountTarget};
    pub use crate::selector::{
        parse_selector, reset_selector_cache, selector_cache_stats, CacheStats,
        Selector,
    };
    pub use crate::style::{inject_style, reset_injected_styles};
    pub use crate::view::{IntoView, View};
    pub use crate::when::{show, when, when_else};
}

pub use crate::innerlude::*;

pub mod prelude {
    pub use crate::bind::{bind, model};
    pub use crate::builder::{dynamic_text, el};
    pub use crate::component::{component, on_mount, on_unmount, Props};
    pub use crate::list::list;
    pub use crate::mount::mount;
    pub use crate::view::{IntoView, View};
    pub use crate::when::{show, when, when_else};
}
