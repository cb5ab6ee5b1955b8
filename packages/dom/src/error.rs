use thiserror::Error;

/// Failures raised by the DOM layer.
#[derive(Debug, Error)]
pub enum DomError {
    /// A mount target selector did not resolve to any node.
    #[error("mount target `{selector}` was not found in the document")]
    MountNotFound { selector: String },

    /// Any other adapter-level failure.
    #[error("{message}")]
    Dom { message: String },
}

impl DomError {
    /// Stable machine-readable code for tooling and tests.
    pub fn code(&self) -> &'static str {
        match self {
            DomError::MountNotFound { .. } => "MOUNT_NOT_FOUND",
            DomError::Dom { .. } => "DOM_ERROR",
        }
    }
}
