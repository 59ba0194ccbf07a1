//! Errors that stop a run

use thiserror::Error;

/// Why a run stopped before reaching the end of its plan.
///
/// Steps applied before the failure stay applied; nothing is rolled back and
/// deferred handlers do not run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The plan carries a fatal step, usually an unsupported setting
    #[error("{message}")]
    ConfigurationRejected {
        /// Message the fatal step was built with
        message: String,
    },

    /// A package, service, filesystem, or template operation failed
    #[error("{step} failed: {error:#}")]
    BackendFailure {
        /// Id of the step or handler that failed, e.g. `service[nginx]`
        step: String,
        /// Underlying backend error
        error: anyhow::Error,
    },

    /// A step notifies a handler the plan does not define
    #[error("{step} notifies unknown handler '{handler}'")]
    UnknownHandler {
        /// Id of the notifying step
        step: String,
        /// Missing handler id
        handler: String,
    },
}

impl RunError {
    /// Whether the run was stopped by configuration rather than the host
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigurationRejected { .. } | Self::UnknownHandler { .. })
    }
}
