//! Event type definitions for session notifications.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// All events emitted by the session engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Capture events
    Capture(CaptureEvent),
    /// Soft-delete and restore events
    Trash(TrashEvent),
    /// Session lifecycle events
    Session(SessionEvent),
    /// Excel log and export events
    Export(ExportEvent),
    /// Live preview events
    Preview(PreviewEvent),
}

/// Events from the capture orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CaptureEvent {
    /// A photo was written to disk and recorded
    Saved { path: PathBuf, index: usize },
    /// The target name is taken and the user must decide
    DuplicateFound { existing: PathBuf },
    /// An existing photo was replaced by a new capture
    Replaced { path: PathBuf },
    /// The user cancelled a pending capture
    Cancelled { name: String },
    /// A saved photo was renamed or moved
    Edited { from: PathBuf, to: PathBuf },
}

/// Events from the trash manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrashEvent {
    /// A file was moved to the trash
    Trashed { token: Uuid, original: PathBuf },
    /// A file was restored from the trash
    Restored { token: Uuid, original: PathBuf },
    /// A file was deleted without going through the trash
    DeletedPermanently { path: PathBuf },
    /// The trash was emptied
    Purged { files_removed: usize },
}

/// Session lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A new session started for a project folder
    Started { project_folder: PathBuf },
    /// A session was restored from the recovery file
    Resumed {
        project_folder: PathBuf,
        photo_count: usize,
    },
    /// The recovery file could not be updated
    RecoveryFailed { message: String },
    /// The session was ended and cleared
    Ended { photo_count: usize },
}

/// Events from the Excel log and manual export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExportEvent {
    /// A row was appended to the real-time log
    RowLogged { path: PathBuf, rows: usize },
    /// The real-time log was rewritten from the session
    LogRewritten { path: PathBuf, rows: usize },
    /// A manual export finished
    Exported { path: PathBuf, rows: usize },
    /// Writing the log or export failed
    Failed { path: PathBuf, message: String },
}

/// Events from the live preview loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PreviewEvent {
    /// The preview loop started polling the camera
    Started,
    /// The camera stopped delivering frames
    CameraLost { message: String },
    /// Frames are arriving again after a loss
    CameraRecovered,
    /// The preview loop stopped
    Stopped { frames_delivered: u64 },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Capture(CaptureEvent::Saved { path, .. }) => {
                write!(f, "Saved {}", path.display())
            }
            Event::Capture(CaptureEvent::DuplicateFound { existing }) => {
                write!(f, "Name already used: {}", existing.display())
            }
            Event::Capture(CaptureEvent::Replaced { path }) => {
                write!(f, "Replaced {}", path.display())
            }
            Event::Capture(CaptureEvent::Cancelled { name }) => {
                write!(f, "Capture of '{}' cancelled", name)
            }
            Event::Capture(CaptureEvent::Edited { from, to }) => {
                write!(f, "Moved {} -> {}", from.display(), to.display())
            }
            Event::Trash(TrashEvent::Trashed { original, .. }) => {
                write!(f, "Moved to trash: {}", original.display())
            }
            Event::Trash(TrashEvent::Restored { original, .. }) => {
                write!(f, "Restored {}", original.display())
            }
            Event::Trash(TrashEvent::DeletedPermanently { path }) => {
                write!(f, "Deleted {}", path.display())
            }
            Event::Trash(TrashEvent::Purged { files_removed }) => {
                write!(f, "Emptied trash ({} files)", files_removed)
            }
            Event::Session(SessionEvent::Started { project_folder }) => {
                write!(f, "Session started in {}", project_folder.display())
            }
            Event::Session(SessionEvent::Resumed {
                project_folder,
                photo_count,
            }) => write!(
                f,
                "Resumed session in {} ({} photos)",
                project_folder.display(),
                photo_count
            ),
            Event::Session(SessionEvent::RecoveryFailed { message }) => {
                write!(f, "Recovery file not updated: {}", message)
            }
            Event::Session(SessionEvent::Ended { photo_count }) => {
                write!(f, "Session ended ({} photos)", photo_count)
            }
            Event::Export(ExportEvent::RowLogged { path, rows }) => {
                write!(f, "Logged to {} ({} rows)", path.display(), rows)
            }
            Event::Export(ExportEvent::LogRewritten { path, rows }) => {
                write!(f, "Rewrote {} ({} rows)", path.display(), rows)
            }
            Event::Export(ExportEvent::Exported { path, rows }) => {
                write!(f, "Exported {} rows to {}", rows, path.display())
            }
            Event::Export(ExportEvent::Failed { path, message }) => {
                write!(f, "Could not write {}: {}", path.display(), message)
            }
            Event::Preview(PreviewEvent::Started) => write!(f, "Preview started"),
            Event::Preview(PreviewEvent::CameraLost { message }) => {
                write!(f, "Camera lost: {}", message)
            }
            Event::Preview(PreviewEvent::CameraRecovered) => write!(f, "Camera recovered"),
            Event::Preview(PreviewEvent::Stopped { frames_delivered }) => {
                write!(f, "Preview stopped after {} frames", frames_delivered)
            }
        }
    }
}
