//! Crash-recovery file for the active session.

use super::types::SessionSnapshot;
use crate::core::fsops::write_atomic;
use crate::error::SessionError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// JSON snapshot of the active session, replaced whole on every write
#[derive(Debug, Clone)]
pub struct RecoveryFile {
    path: PathBuf,
}

impl RecoveryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Atomically replace the snapshot on disk
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| self.write_error(e))?;
        write_atomic(&self.path, &json).map_err(|e| self.write_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            records = snapshot.records.len(),
            "recovery snapshot written"
        );
        Ok(())
    }

    /// Load the snapshot, or `None` when no session is active
    pub fn load(&self) -> Result<Option<SessionSnapshot>, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::RecoveryCorrupted {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SessionError::RecoveryCorrupted {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Delete the snapshot; a missing file is not an error
    pub fn remove(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error(e)),
        }
    }

    fn write_error(&self, e: impl std::fmt::Display) -> SessionError {
        SessionError::RecoveryWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}
