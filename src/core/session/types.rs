//! Types for the session store.

use crate::core::naming::DuplicatePolicy;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Format used for timestamps in the log and exports
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One saved photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub timestamp: DateTime<Local>,
    pub subfolder: String,
    pub name: String,
    pub filename: String,
    pub file_path: PathBuf,
}

impl CaptureRecord {
    /// Build a record for a photo that was just written to `file_path`
    pub fn new(subfolder: &str, name: &str, file_path: PathBuf) -> Self {
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            timestamp: Local::now(),
            subfolder: subfolder.to_string(),
            name: name.to_string(),
            filename,
            file_path,
        }
    }

    /// Timestamp as written to the log
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// The five log columns in order
    pub fn to_row(&self) -> [String; 5] {
        [
            self.timestamp_display(),
            self.subfolder.clone(),
            self.name.clone(),
            self.filename.clone(),
            self.file_path.display().to_string(),
        ]
    }
}

/// Everything needed to rebuild a session after a crash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub project_folder: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
    pub records: Vec<CaptureRecord>,
    pub last_activity: DateTime<Local>,
}
