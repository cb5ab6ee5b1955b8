//! `pulse-ssr` - selective rendering and hydration diagnosis.
//!
//! The SSR flag lives in the reactive runtime
//! ([`pulse_reactive::set_ssr_mode`]); this crate supplies the two factory
//! wrappers whose behavior the flag inverts, and the tree differ used to
//! explain hydration mismatches.

pub(crate) mod diff;

pub use crate::diff::{
    diff_nodes, report_to_json, suggestion_for, Mismatch, MismatchKind,
};
pub use pulse_reactive::{is_ssr, set_ssr_mode};

use pulse_core::{IntoView, View};
use pulse_dom::{document, Dom};

/// Renders `factory` only on the client. On the server the factory is not
/// invoked and a `client-only` comment placeholder is emitted instead.
pub fn client_only<V: IntoView>(factory: impl FnOnce() -> V) -> View {
    if is_ssr() {
        tracing::trace!("skipping client-only subtree during server render");
        View::Node(document().create_comment("client-only"))
    } else {
        factory().into_view()
    }
}

/// [`client_only`] with an explicit server-side fallback view.
pub fn client_only_or<V: IntoView, W: IntoView>(
    factory: impl FnOnce() -> V,
    fallback: impl FnOnce() -> W,
) -> View {
    if is_ssr() {
        fallback().into_view()
    } else {
        factory().into_view()
    }
}

/// Renders `factory` only on the server. On the client the factory is not
/// invoked and a `server-only` comment placeholder is emitted instead.
pub fn server_only<V: IntoView>(factory: impl FnOnce() -> V) -> View {
    if is_ssr() {
        factory().into_view()
    } else {
        tracing::trace!("skipping server-only subtree during client render");
        View::Node(document().create_comment("server-only"))
    }
}
