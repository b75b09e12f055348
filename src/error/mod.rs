//! # Error Module
//!
//! User-facing error types for Shot Ledger.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **User-friendly messages** - every error ends up in a dialog or prompt
//! - **Retry or cancel** - callers can ask whether an operation is worth retrying

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ShotLedgerError {
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NamingError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Trash error: {0}")]
    Trash(#[from] TrashError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The four kinds of failure a user can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input (name or subfolder)
    InvalidName,
    /// No camera device or no frame available
    Camera,
    /// Disk or workbook write failure
    Io,
    /// Trash restore target missing
    NotFound,
}

impl ShotLedgerError {
    /// Classify this error into one of the user-facing kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_) => ErrorKind::InvalidName,
            Self::Camera(_) => ErrorKind::Camera,
            Self::Trash(TrashError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Session(SessionError::PhotoNotFound { .. })
            | Self::Session(SessionError::NothingToUndo) => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        }
    }

    /// Whether offering "retry" makes sense for this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Export(e) => e.is_locked(),
            Self::Camera(CameraError::FrameUnavailable { .. }) => true,
            Self::Io { .. } => true,
            _ => false,
        }
    }
}

/// Errors from validating user-supplied names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} '{value}' contains characters that are not allowed in file names")]
    IllegalCharacters { field: &'static str, value: String },

    #[error("{field} '{value}' is a reserved name")]
    Reserved { field: &'static str, value: String },
}

/// Errors from the camera collaborator
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No camera available. Check that it is connected and not used by another application.")]
    NoDevice,

    #[error("Camera did not deliver a frame: {reason}")]
    FrameUnavailable { reason: String },

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Errors from the soft-delete trash
#[derive(Error, Debug)]
pub enum TrashError {
    #[error("Nothing to restore for {token}: it was already restored or the trash was emptied")]
    NotFound { token: Uuid },

    #[error("Cannot restore to {path}: another file now exists there")]
    RestoreConflict { path: PathBuf },

    #[error("Cannot move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot permanently delete {path}: {source}")]
    Purge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trash index at {path} is unreadable: {reason}")]
    Index { path: PathBuf, reason: String },
}

/// Errors from the session store and its recovery file
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Project folder not found: {path}")]
    ProjectFolderMissing { path: PathBuf },

    #[error("A session for {folder} is still active. End it before opening another project.")]
    ActiveSessionElsewhere { folder: PathBuf },

    #[error("No active session. Open a project folder first.")]
    NoActiveSession,

    #[error("No photo at position {index}")]
    InvalidIndex { index: usize },

    #[error("Photo file not found: {path}")]
    PhotoNotFound { path: PathBuf },

    #[error("No deletions to undo")]
    NothingToUndo,

    #[error("Failed to write recovery file {path}: {reason}")]
    RecoveryWrite { path: PathBuf, reason: String },

    #[error("Recovery file {path} is unreadable: {reason}. Delete it to start a fresh session.")]
    RecoveryCorrupted { path: PathBuf, reason: String },
}

/// Errors from writing the Excel log or an export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{path} is open in another program. Close it and try again.")]
    Locked { path: PathBuf },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("No photos to export")]
    NothingToExport,
}

impl ExportError {
    /// Classify an I/O failure, detecting files held open by another process
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        // 32/33 are ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION on Windows
        let locked = source.kind() == std::io::ErrorKind::PermissionDenied
            || (cfg!(windows) && matches!(source.raw_os_error(), Some(32) | Some(33)));
        if locked {
            Self::Locked { path }
        } else {
            Self::Write { path, source }
        }
    }

    /// True when the destination is held open by another program
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Errors from loading or saving settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a per-user directory for {0}")]
    NoUserDirectory(&'static str),

    #[error("Failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write config {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ShotLedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_export_is_retryable() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let error = ExportError::from_io(PathBuf::from("/reports/log.xlsx"), io);
        assert!(error.is_locked());
        assert!(error.to_string().contains("/reports/log.xlsx"));

        let top: ShotLedgerError = error.into();
        assert!(top.is_retryable());
        assert_eq!(top.kind(), ErrorKind::Io);
    }

    #[test]
    fn other_io_failures_are_not_locks() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let error = ExportError::from_io(PathBuf::from("/missing/dir/log.xlsx"), io);
        assert!(!error.is_locked());
    }

    #[test]
    fn trash_not_found_maps_to_not_found_kind() {
        let error: ShotLedgerError = TrashError::NotFound {
            token: Uuid::nil(),
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(!error.is_retryable());
    }

    #[test]
    fn naming_error_includes_value() {
        let error = NamingError::IllegalCharacters {
            field: "Name",
            value: "a/b".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("a/b"));
        assert!(message.starts_with("Name"));
    }

    #[test]
    fn recovery_error_suggests_recovery() {
        let error = SessionError::RecoveryCorrupted {
            path: PathBuf::from("/data/active_session.json"),
            reason: "EOF".to_string(),
        };
        assert!(error.to_string().contains("Delete it"));
    }
}
