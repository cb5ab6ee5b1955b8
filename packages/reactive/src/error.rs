use thiserror::Error;

/// Failures raised by the reactive graph at runtime.
#[derive(Debug, Clone, Error)]
pub enum ReactivityError {
    /// An effect body panicked. The flush continues; the panic message is
    /// preserved here for the `on_error` hook.
    #[error("effect failed: {message}")]
    EffectFailed { message: String },

    /// One effect re-ran more than the per-flush bound, which means a write
    /// inside the effect feeds back into its own dependencies.
    #[error(
        "circular dependency: an effect re-ran {runs} times within a single flush"
    )]
    CircularDependency { runs: u32 },

    /// A write was attempted against a read-only derived value.
    #[error("cannot write to a computed value")]
    ComputedSet,
}

impl ReactivityError {
    /// Stable machine-readable code for tooling and tests.
    pub fn code(&self) -> &'static str {
        match self {
            ReactivityError::EffectFailed { .. } => "REACTIVITY_ERROR",
            ReactivityError::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            ReactivityError::ComputedSet => "COMPUTED_SET",
        }
    }
}
