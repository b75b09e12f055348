//! Session-scoped soft-delete trash.

use super::types::{DeletedCapture, TrashEntry, TrashIndex, UndoToken};
use crate::core::fsops::{move_file, write_atomic};
use crate::core::naming::TRASH_DIR_NAME;
use crate::error::TrashError;
use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

const INDEX_FILE_NAME: &str = "trash.json";

/// Holds soft-deleted photos under `<project>/.trash/<session-id>/`
/// until they are restored or purged.
#[derive(Debug)]
pub struct TrashManager {
    dir: PathBuf,
    entries: Vec<TrashEntry>,
    limit: Option<usize>,
}

impl TrashManager {
    /// Trash directory for a session
    pub fn session_dir(project_folder: &Path, session_id: Uuid) -> PathBuf {
        project_folder
            .join(TRASH_DIR_NAME)
            .join(session_id.to_string())
    }

    /// Open the trash for a session, reloading its index if one was saved.
    ///
    /// `limit` caps how many deletions can be undone; older entries are
    /// deleted permanently.
    pub fn open(
        project_folder: &Path,
        session_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Self, TrashError> {
        let dir = Self::session_dir(project_folder, session_id);
        let index_path = dir.join(INDEX_FILE_NAME);

        let entries = match fs::read(&index_path) {
            Ok(bytes) => {
                let index: TrashIndex =
                    serde_json::from_slice(&bytes).map_err(|e| TrashError::Index {
                        path: index_path.clone(),
                        reason: e.to_string(),
                    })?;
                index.entries
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(TrashError::Index {
                    path: index_path,
                    reason: e.to_string(),
                })
            }
        };

        if !entries.is_empty() {
            tracing::info!(dir = %dir.display(), entries = entries.len(), "reopened trash");
        }

        Ok(Self {
            dir,
            entries,
            limit,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[TrashEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, token: UndoToken) -> bool {
        self.entries.iter().any(|e| e.token == token)
    }

    /// Move `path` into the trash and return a token for undo
    pub fn delete(&mut self, path: &Path, capture: DeletedCapture) -> Result<UndoToken, TrashError> {
        let trash_path = self.unique_trash_path(path);

        move_file(path, &trash_path).map_err(|source| TrashError::Move {
            from: path.to_path_buf(),
            to: trash_path.clone(),
            source,
        })?;

        let token = UndoToken(Uuid::new_v4());
        tracing::info!(
            original = %path.display(),
            trash = %trash_path.display(),
            %token,
            "moved to trash"
        );

        self.entries.push(TrashEntry {
            token,
            original_path: path.to_path_buf(),
            trash_path,
            deleted_at: Local::now(),
            record: capture.record,
            index: capture.index,
        });
        self.evict_overflow();
        self.save_index();

        Ok(token)
    }

    /// Move a trashed file back to where it came from
    pub fn undo(&mut self, token: UndoToken) -> Result<TrashEntry, TrashError> {
        let position = self
            .entries
            .iter()
            .position(|e| e.token == token)
            .ok_or(TrashError::NotFound { token: token.0 })?;

        let entry = &self.entries[position];

        if !entry.trash_path.exists() {
            tracing::warn!(trash = %entry.trash_path.display(), "trashed file vanished");
            self.entries.remove(position);
            self.save_index();
            return Err(TrashError::NotFound { token: token.0 });
        }

        if entry.original_path.exists() {
            return Err(TrashError::RestoreConflict {
                path: entry.original_path.clone(),
            });
        }

        move_file(&entry.trash_path, &entry.original_path).map_err(|source| TrashError::Move {
            from: entry.trash_path.clone(),
            to: entry.original_path.clone(),
            source,
        })?;

        let entry = self.entries.remove(position);
        self.save_index();
        tracing::info!(original = %entry.original_path.display(), "restored from trash");
        Ok(entry)
    }

    /// Undo the most recent deletion, if any
    pub fn undo_last(&mut self) -> Result<Option<TrashEntry>, TrashError> {
        match self.entries.last() {
            Some(entry) => {
                let token = entry.token;
                self.undo(token).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Permanently delete everything in this session's trash.
    ///
    /// Returns the number of files removed.
    pub fn purge(&mut self) -> Result<usize, TrashError> {
        let removed = remove_tree(&self.dir)?;
        self.entries.clear();

        // Drop the shared .trash folder once no session uses it
        if let Some(parent) = self.dir.parent() {
            let _ = fs::remove_dir(parent);
        }

        tracing::info!(dir = %self.dir.display(), removed, "trash purged");
        Ok(removed)
    }

    /// Permanently delete trash that earlier sessions of this project left
    /// behind. Nothing can undo into those any more.
    pub fn purge_leftovers(&self) -> Result<usize, TrashError> {
        let Some(root) = self.dir.parent() else {
            return Ok(0);
        };
        let siblings = match fs::read_dir(root) {
            Ok(siblings) => siblings,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(TrashError::Purge {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        let mut removed = 0usize;
        for sibling in siblings.filter_map(|e| e.ok()) {
            let path = sibling.path();
            if path != self.dir && path.is_dir() {
                removed += remove_tree(&path)?;
            }
        }
        if removed > 0 {
            tracing::info!(root = %root.display(), removed, "old session trash purged");
        }
        Ok(removed)
    }

    /// Permanently delete the oldest entries beyond the undo limit
    fn evict_overflow(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };

        let mut evicted = 0;
        while self.entries.len() > limit {
            let oldest = self.entries.remove(0);
            if let Err(e) = fs::remove_file(&oldest.trash_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %oldest.trash_path.display(),
                        error = %e,
                        "could not delete evicted trash file"
                    );
                }
            }
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(evicted, limit, "undo history trimmed");
        }
    }

    fn save_index(&self) {
        let index_path = self.dir.join(INDEX_FILE_NAME);

        if self.entries.is_empty() {
            let _ = fs::remove_file(&index_path);
            return;
        }

        let index = TrashIndex {
            entries: self.entries.clone(),
        };
        let result = serde_json::to_vec_pretty(&index)
            .map_err(io::Error::from)
            .and_then(|json| write_atomic(&index_path, &json));

        if let Err(e) = result {
            tracing::warn!(path = %index_path.display(), error = %e, "trash index not saved");
        }
    }

    fn unique_trash_path(&self, path: &Path) -> PathBuf {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let named = |suffix: Option<usize>| {
            let base = match suffix {
                Some(n) => format!("{}_{}", stem, n),
                None => stem.to_string(),
            };
            if ext.is_empty() {
                self.dir.join(base)
            } else {
                self.dir.join(format!("{}.{}", base, ext))
            }
        };

        let taken = |candidate: &Path| {
            candidate.exists() || self.entries.iter().any(|e| e.trash_path == candidate)
        };

        let mut candidate = named(None);
        let mut counter = 1;
        while taken(&candidate) {
            candidate = named(Some(counter));
            counter += 1;
        }
        candidate
    }
}

/// Delete `dir` and everything under it, counting removed files other
/// than the index
fn remove_tree(dir: &Path) -> Result<usize, TrashError> {
    let mut removed = 0usize;
    if !dir.exists() {
        return Ok(removed);
    }

    for entry in WalkDir::new(dir)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_dir() {
            // Non-empty dirs only stay if a file removal failed
            let _ = fs::remove_dir(path);
            continue;
        }

        let is_index = path.file_name().map_or(false, |n| n == INDEX_FILE_NAME);
        match fs::remove_file(path) {
            Ok(()) if !is_index => removed += 1,
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(TrashError::Purge {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(removed)
}
