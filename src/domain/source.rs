use crate::domain::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of one ingestion source; all progress and completion
/// updates are addressed through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(SourceId)
            .map_err(|e| AppError::ValidationError(format!("Invalid source id: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Upload,
    Speech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadState {
    Reading,
    Completed,
    Stalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedSource {
    pub id: SourceId,
    pub name: String,
    pub size: u64,
    pub origin: SourceOrigin,
    pub progress: u8,
    pub content: String,
    pub state: ReadState,
    pub stall_reason: Option<String>,
}

impl UploadedSource {
    pub fn new(name: String, size: u64, origin: SourceOrigin) -> Self {
        Self {
            id: SourceId::new(),
            name,
            size,
            origin,
            progress: 0,
            content: String::new(),
            state: ReadState::Reading,
            stall_reason: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == ReadState::Completed
    }
}

/// Read progress for `read` of `total` bytes. Stays below 100 until the
/// decoded text has been stored.
pub fn read_progress(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = read.saturating_mul(100) / total;
    percent.min(99) as u8
}
