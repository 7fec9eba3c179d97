//! Error types for hook pipeline faults.
//!
//! Validation failures never show up here; they travel as data in
//! [`crate::ErrorsList`]. A `HookError` is an unexpected fault raised by a
//! collaborator and is propagated untouched through every pipeline stage.

use std::error::Error;

use thiserror::Error;

/// Fault raised while executing a hook pipeline.
#[derive(Debug, Error)]
pub enum HookError {
    /// A collaborator (repository, external service) failed.
    #[error("hook collaborator failed")]
    Collaborator {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Converting the pipeline payload into a typed record failed.
    #[error("hook payload could not be decoded")]
    Payload {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl HookError {
    /// Wrap a collaborator failure with the operation that triggered it.
    pub fn collaborator(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Collaborator {
            operation,
            source: source.into(),
        }
    }

    /// Operation identifier attached to the fault.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Collaborator { operation, .. } | Self::Payload { operation, .. } => *operation,
        }
    }
}

/// Convenience alias for hook results.
pub type HookResult<T> = Result<T, HookError>;
