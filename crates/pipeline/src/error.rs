use storyshot_core::error::JobError;

/// Failures from a [`ClipStore`](crate::ports::ClipStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Clip store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        JobError::Persistence(err.to_string())
    }
}

/// Failures reading or writing the local draft snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failures from the local audio capture device.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No capture in progress")]
    NotStarted,

    #[error("Capture already in progress")]
    Busy,

    #[error("Capture device error: {0}")]
    Device(String),
}

impl From<CaptureError> for JobError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NotStarted => JobError::Validation(err.to_string()),
            CaptureError::Busy => JobError::Conflict(err.to_string()),
            CaptureError::Device(_) => JobError::Network(err.to_string()),
        }
    }
}
