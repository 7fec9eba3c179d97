//! # Design
//!
//! - Centralize application-level errors for bootstrap and command execution.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Command input was not a JSON object.
    #[error("invalid command input")]
    InvalidInput {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Persistence operations failed.
    #[error("data operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: misago_data::DataError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: misago_telemetry::TelemetryError,
    },
    /// A hook pipeline aborted with a fault.
    #[error("hook pipeline failed")]
    Hook {
        /// Operation identifier.
        operation: &'static str,
        /// Source hook error.
        source: misago_hooks::HookError,
    },
    /// Serialising command output failed.
    #[error("output serialization failed")]
    Output {
        /// Source serde error.
        source: serde_json::Error,
    },
}

impl AppError {
    pub(crate) const fn data(operation: &'static str, source: misago_data::DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: misago_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn hook(operation: &'static str, source: misago_hooks::HookError) -> Self {
        Self::Hook { operation, source }
    }
}
