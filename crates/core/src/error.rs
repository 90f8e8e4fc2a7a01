/// Domain-level errors raised by validation and state-machine checks.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy for generation jobs and persistence.
///
/// Every job outcome maps onto exactly one of these variants so callers can
/// apply the per-variant propagation policy (retryable vs. blocking vs.
/// swallowed) without string matching.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Missing text, voice or keyframe. Raised before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport failure, timeout, or non-success HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// An asynchronous remote job reported an explicit failure status.
    #[error("Remote job failed: {0}")]
    RemoteJobFailed(String),

    /// The provider response contained no recognizable media reference.
    #[error("No media reference found in {0} response")]
    NoMediaFound(&'static str),

    /// The durable store rejected a write or delete.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The operation is illegal for the shot's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The target shot or clip no longer exists.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The job was cancelled because its shot was discarded or the service
    /// is shutting down.
    #[error("Job cancelled")]
    Cancelled,
}

impl JobError {
    /// Whether the failure leaves the shot retryable from `draft`.
    ///
    /// Validation and conflicts are shown without touching status; every
    /// other failure resets the shot to `draft` with an error message.
    pub fn resets_status(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_) | Self::Conflict(_) | Self::NotFound { .. } | Self::Cancelled
        )
    }
}

impl From<CoreError> for JobError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Conflict(msg) => Self::Conflict(msg),
            CoreError::Internal(msg) => Self::Persistence(msg),
        }
    }
}
