//! `pulse` - the umbrella crate of the Pulse framework.
//!
//! Re-exports the reactive engine, the element builder and reconciler, the
//! component compiler, and the server-rendering helpers under one roof. The
//! [`prelude`] is the single namespace compiled components import.

pub use pulse_compiler as compiler;
pub use pulse_core as core;
pub use pulse_dom as dom;
pub use pulse_reactive as reactive;
pub use pulse_ssr as ssr;

/// Stable error codes exposed to tests and tooling. The router and store
/// codes are reserved for the layers built on top of the core.
pub mod codes {
    pub const LEXER_ERROR: &str = "LEXER_ERROR";
    pub const PARSER_ERROR: &str = "PARSER_ERROR";
    pub const TRANSFORM_ERROR: &str = "TRANSFORM_ERROR";
    pub const REACTIVITY_ERROR: &str = "REACTIVITY_ERROR";
    pub const CIRCULAR_DEPENDENCY: &str = "CIRCULAR_DEPENDENCY";
    pub const COMPUTED_SET: &str = "COMPUTED_SET";
    pub const DOM_ERROR: &str = "DOM_ERROR";
    pub const MOUNT_NOT_FOUND: &str = "MOUNT_NOT_FOUND";
    pub const ROUTER_ERROR: &str = "ROUTER_ERROR";
    pub const STORE_ERROR: &str = "STORE_ERROR";
}

/// Everything generated code (and most applications) need.
pub mod prelude {
    pub use pulse_core::{
        bind, component, dynamic_text, el, inject_style, list, list_unkeyed,
        model, mount, on_mount, on_unmount, show, when, when_else, ComponentCtx,
        ElementBuilder, IntoView, MountHandle, Props, View,
    };
    pub use pulse_dom::{
        document, set_document, with_document, Dom, Event, NodeId, Value,
    };
    pub use pulse_reactive::{
        batch, computed, effect, on_cleanup, pulse, untrack, Computed, Effect,
        Pulse,
    };
    pub use pulse_ssr::{client_only, client_only_or, is_ssr, server_only, set_ssr_mode};
}
