//! Types for the trash module.

use crate::core::session::CaptureRecord;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Handle returned by a soft delete; pass it back to undo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UndoToken(pub Uuid);

impl std::fmt::Display for UndoToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file held in the trash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub token: UndoToken,
    pub original_path: PathBuf,
    pub trash_path: PathBuf,
    pub deleted_at: DateTime<Local>,
    /// The capture the file belonged to, restored with it
    pub record: Option<CaptureRecord>,
    /// Position of `record` in the session when it was deleted
    pub index: Option<usize>,
}

/// What the trash is asked to remember about a deleted capture
#[derive(Debug, Clone, Default)]
pub struct DeletedCapture {
    pub record: Option<CaptureRecord>,
    pub index: Option<usize>,
}

/// On-disk trash index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct TrashIndex {
    pub entries: Vec<TrashEntry>,
}
