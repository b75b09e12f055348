//! In-memory session record list backed by the recovery file.

use super::recovery::RecoveryFile;
use super::types::{CaptureRecord, SessionSnapshot};
use crate::core::naming::DuplicatePolicy;
use crate::error::SessionError;
use chrono::Local;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Ordered captures of the current session.
///
/// Every mutation rewrites the recovery file. When that write fails the
/// in-memory change is kept and the error is returned so the caller can
/// warn the user.
#[derive(Debug)]
pub struct SessionStore {
    session_id: Uuid,
    project_folder: PathBuf,
    policy: DuplicatePolicy,
    records: Vec<CaptureRecord>,
    recovery: RecoveryFile,
}

impl SessionStore {
    /// Start an empty session for a project folder
    pub fn create(
        project_folder: impl Into<PathBuf>,
        policy: DuplicatePolicy,
        recovery: RecoveryFile,
    ) -> Result<Self, SessionError> {
        let store = Self {
            session_id: Uuid::new_v4(),
            project_folder: project_folder.into(),
            policy,
            records: Vec::new(),
            recovery,
        };
        store.persist()?;
        Ok(store)
    }

    /// Rebuild the session from the recovery file, if one exists
    pub fn restore(recovery: RecoveryFile) -> Result<Option<Self>, SessionError> {
        let Some(snapshot) = recovery.load()? else {
            return Ok(None);
        };

        tracing::info!(
            project = %snapshot.project_folder.display(),
            records = snapshot.records.len(),
            "restored session from recovery file"
        );

        Ok(Some(Self {
            session_id: snapshot.session_id,
            project_folder: snapshot.project_folder,
            policy: snapshot.duplicate_policy,
            records: snapshot.records,
            recovery,
        }))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn project_folder(&self) -> &Path {
        &self.project_folder
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CaptureRecord> {
        self.records.get(index)
    }

    /// Position of the record for `path`, if any
    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.records.iter().position(|r| r.file_path == path)
    }

    /// Unique subfolders used so far, sorted
    pub fn subfolders(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.subfolder.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_policy(&mut self, policy: DuplicatePolicy) -> Result<(), SessionError> {
        self.policy = policy;
        self.persist()
    }

    /// Add a record at the end of the session
    pub fn append(&mut self, record: CaptureRecord) -> Result<(), SessionError> {
        self.records.push(record);
        self.persist()
    }

    /// Put a record back at `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, record: CaptureRecord) -> Result<(), SessionError> {
        let index = index.min(self.records.len());
        self.records.insert(index, record);
        self.persist()
    }

    /// Replace the record at `index`
    pub fn update(&mut self, index: usize, record: CaptureRecord) -> Result<(), SessionError> {
        let slot = self
            .records
            .get_mut(index)
            .ok_or(SessionError::InvalidIndex { index })?;
        *slot = record;
        self.persist()
    }

    /// Remove the first record with this filename
    pub fn remove(&mut self, filename: &str) -> Result<Option<(usize, CaptureRecord)>, SessionError> {
        match self.records.iter().position(|r| r.filename == filename) {
            Some(index) => self.remove_at(index).map(|record| Some((index, record))),
            None => Ok(None),
        }
    }

    /// Remove the record at `index`.
    ///
    /// The record is returned even when persisting fails; callers that
    /// need it on failure should read it with [`get`](Self::get) first.
    pub fn remove_at(&mut self, index: usize) -> Result<CaptureRecord, SessionError> {
        if index >= self.records.len() {
            return Err(SessionError::InvalidIndex { index });
        }
        let record = self.records.remove(index);
        self.persist()?;
        Ok(record)
    }

    /// Drop every record pointing at `path`; returns the removed ones
    pub fn supersede(&mut self, path: &Path) -> Result<Vec<(usize, CaptureRecord)>, SessionError> {
        let mut removed = Vec::new();
        let mut index = 0;
        while index < self.records.len() {
            if self.records[index].file_path == path {
                removed.push((index + removed.len(), self.records.remove(index)));
            } else {
                index += 1;
            }
        }
        if !removed.is_empty() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Empty the session and delete the recovery file
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.records.clear();
        self.recovery.remove()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            project_folder: self.project_folder.clone(),
            duplicate_policy: self.policy,
            records: self.records.clone(),
            last_activity: Local::now(),
        }
    }

    fn persist(&self) -> Result<(), SessionError> {
        self.recovery.save(&self.snapshot()).map_err(|e| {
            tracing::warn!(error = %e, "session change not persisted");
            e
        })
    }
}
