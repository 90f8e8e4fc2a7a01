//! Status of a clip record in the remote durable store.

use serde::{Deserialize, Serialize};

/// Remote clip status, stored as text in the `clips.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    /// Optimistic entry not yet rendering.
    Pending,
    /// Pending-phase record: render started, no media yet.
    Rendering,
    /// Completion-phase record with final media.
    Completed,
    /// The render failed after its pending record was written.
    Failed,
}

impl ClipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "rendering" => Some(Self::Rendering),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// In-flight statuses whose completion write may not have landed yet.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Pending | Self::Rendering)
    }
}

impl std::fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
