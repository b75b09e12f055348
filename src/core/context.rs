//! The active session and the operations a user performs on it.
//!
//! `SessionContext` owns everything a session touches: the settings, the
//! record store and its recovery file, the session trash and the real-time
//! log. Components receive it explicitly instead of reaching for globals.

use crate::config::{AppPaths, Config, OnExit};
use crate::core::export::{export_to_file, ExcelLog};
use crate::core::fsops::move_file;
use crate::core::naming::{
    validate_name, validate_subfolder, DuplicateDecision, DuplicatePolicy, NamingResolver,
    Resolution,
};
use crate::core::session::{CaptureRecord, RecoveryFile, SessionStore};
use crate::core::trash::{DeletedCapture, TrashEntry, TrashManager, UndoToken};
use crate::error::{ExportError, Result, SessionError, ShotLedgerError};
use crate::events::{
    CaptureEvent, Event, EventSender, ExportEvent, SessionEvent, TrashEvent,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Bookkeeping failures that happened after the file operation succeeded.
///
/// The photo operation itself is never rolled back for these; the caller
/// should tell the user.
#[derive(Debug, Default)]
pub struct SyncStatus {
    /// The real-time log could not be updated
    pub log_error: Option<ExportError>,
    /// The recovery file could not be updated
    pub recovery_error: Option<SessionError>,
}

impl SyncStatus {
    pub fn is_ok(&self) -> bool {
        self.log_error.is_none() && self.recovery_error.is_none()
    }

    /// One line per failure, for display
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if let Some(e) = &self.log_error {
            messages.push(format!("Session log not updated: {}", e));
        }
        if let Some(e) = &self.recovery_error {
            messages.push(format!("Recovery file not updated: {}", e));
        }
        messages
    }
}

/// Result of deleting a photo
#[derive(Debug)]
pub struct DeleteOutcome {
    pub record: CaptureRecord,
    /// Present when the file went to the trash
    pub undo: Option<UndoToken>,
    pub sync: SyncStatus,
}

/// Result of undoing a delete
#[derive(Debug)]
pub struct UndoOutcome {
    pub entry: TrashEntry,
    /// Where the record went back into the session
    pub index: Option<usize>,
    pub sync: SyncStatus,
}

/// Result of renaming or moving a saved photo
#[derive(Debug)]
pub enum EditOutcome {
    Updated {
        record: CaptureRecord,
        sync: SyncStatus,
    },
    /// The new name is taken and the user must decide
    NeedsDecision { existing: PathBuf },
    Cancelled,
}

/// What ending a session did
#[derive(Debug, Default)]
pub struct EndSummary {
    pub photo_count: usize,
    pub trash_purged: usize,
    pub purge_error: Option<ShotLedgerError>,
    pub log_error: Option<ExportError>,
}

/// An open session
#[derive(Debug)]
pub struct SessionContext {
    config: Config,
    paths: AppPaths,
    store: SessionStore,
    trash: TrashManager,
    log: ExcelLog,
    events: EventSender,
}

impl SessionContext {
    /// Open a project folder.
    ///
    /// If the recovery file holds a session for the same folder it is
    /// resumed; a session for a different folder must be ended first.
    pub fn start(
        mut config: Config,
        paths: AppPaths,
        project_folder: &Path,
        events: EventSender,
    ) -> Result<Self> {
        if !project_folder.is_dir() {
            return Err(SessionError::ProjectFolderMissing {
                path: project_folder.to_path_buf(),
            }
            .into());
        }
        let project_folder = std::path::absolute(project_folder).map_err(|source| {
            ShotLedgerError::Io {
                path: project_folder.to_path_buf(),
                source,
            }
        })?;

        let recovery = RecoveryFile::new(&paths.recovery_file);
        let (store, resumed) = match SessionStore::restore(recovery.clone())? {
            Some(store) if same_folder(store.project_folder(), &project_folder) => (store, true),
            Some(store) => {
                return Err(SessionError::ActiveSessionElsewhere {
                    folder: store.project_folder().to_path_buf(),
                }
                .into())
            }
            None => (
                SessionStore::create(&project_folder, config.duplicate_handling, recovery)?,
                false,
            ),
        };

        config.add_recent_project(&project_folder);
        if let Err(e) = config.save(&paths.config_file) {
            tracing::warn!(error = %e, "could not remember recent project");
        }

        let context = Self::assemble(config, paths, store, events)?;
        if resumed {
            context.announce_resume();
        } else {
            tracing::info!(
                project = %context.project_folder().display(),
                session = %context.session_id(),
                "session started"
            );
            context.events.send(Event::Session(SessionEvent::Started {
                project_folder: context.project_folder().to_path_buf(),
            }));
        }
        context.sync_log();
        Ok(context)
    }

    /// Reopen the session left in the recovery file, if there is one
    pub fn resume(config: Config, paths: AppPaths, events: EventSender) -> Result<Option<Self>> {
        let recovery = RecoveryFile::new(&paths.recovery_file);
        let store = match SessionStore::restore(recovery) {
            Ok(Some(store)) => store,
            Ok(None) => return Ok(None),
            Err(e) => {
                events.send(Event::Session(SessionEvent::RecoveryFailed {
                    message: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        if !store.project_folder().is_dir() {
            return Err(SessionError::ProjectFolderMissing {
                path: store.project_folder().to_path_buf(),
            }
            .into());
        }

        let context = Self::assemble(config, paths, store, events)?;
        context.announce_resume();
        Ok(Some(context))
    }

    fn assemble(
        config: Config,
        paths: AppPaths,
        store: SessionStore,
        events: EventSender,
    ) -> Result<Self> {
        let trash = TrashManager::open(
            store.project_folder(),
            store.session_id(),
            config.trash_limit(),
        )?;
        let log = ExcelLog::new(&paths.session_log);
        Ok(Self {
            config,
            paths,
            store,
            trash,
            log,
            events,
        })
    }

    fn announce_resume(&self) {
        tracing::info!(
            project = %self.project_folder().display(),
            photos = self.store.len(),
            "session resumed"
        );
        self.events.send(Event::Session(SessionEvent::Resumed {
            project_folder: self.project_folder().to_path_buf(),
            photo_count: self.store.len(),
        }));
    }

    /// Bring the log in line with the store after opening
    fn sync_log(&self) {
        if self.config.realtime_log {
            let _ = self.rewrite_log();
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn records(&self) -> &[CaptureRecord] {
        self.store.records()
    }

    pub fn trash(&self) -> &TrashManager {
        &self.trash
    }

    pub fn log(&self) -> &ExcelLog {
        &self.log
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn project_folder(&self) -> &Path {
        self.store.project_folder()
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.store.session_id()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.store.policy()
    }

    /// Resolver for this project folder and the session's policy
    pub fn resolver(&self) -> NamingResolver {
        NamingResolver::new(self.project_folder(), self.policy())
    }

    /// Change the duplicate policy for this session and future ones
    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) -> Result<()> {
        self.config.duplicate_handling = policy;
        self.config.save(&self.paths.config_file)?;
        self.store.set_policy(policy)?;
        Ok(())
    }

    /// Soft-delete (or delete, with the trash disabled) the photo at `index`
    pub fn delete_photo(&mut self, index: usize) -> Result<DeleteOutcome> {
        let record = self
            .store
            .get(index)
            .cloned()
            .ok_or(SessionError::InvalidIndex { index })?;
        let path = record.file_path.clone();

        let mut undo = None;
        if !path.exists() {
            tracing::warn!(path = %path.display(), "photo already gone, dropping its record");
        } else if self.config.keeps_trash() {
            let token = self.trash.delete(
                &path,
                DeletedCapture {
                    record: Some(record.clone()),
                    index: Some(index),
                },
            )?;
            self.events.send(Event::Trash(TrashEvent::Trashed {
                token: token.0,
                original: path.clone(),
            }));
            undo = Some(token);
        } else {
            fs::remove_file(&path).map_err(|source| ShotLedgerError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "deleted permanently");
            self.events
                .send(Event::Trash(TrashEvent::DeletedPermanently { path: path.clone() }));
        }

        let mut sync = SyncStatus::default();
        if let Err(e) = self.store.remove_at(index) {
            self.report_recovery_failure(&e);
            sync.recovery_error = Some(e);
        }
        sync.log_error = self.rewrite_log().err();

        Ok(DeleteOutcome { record, undo, sync })
    }

    /// Restore a deleted photo, the most recent one when `token` is `None`
    pub fn undo_delete(&mut self, token: Option<UndoToken>) -> Result<UndoOutcome> {
        let entry = match token {
            Some(token) => self.trash.undo(token)?,
            None => self
                .trash
                .undo_last()?
                .ok_or(SessionError::NothingToUndo)?,
        };
        self.events.send(Event::Trash(TrashEvent::Restored {
            token: entry.token.0,
            original: entry.original_path.clone(),
        }));

        let mut sync = SyncStatus::default();
        let mut index = None;
        if let Some(existing) = self.store.position_of(&entry.original_path) {
            // The delete never reached the recovery file
            tracing::info!(
                path = %entry.original_path.display(),
                index = existing,
                "record still present, not re-inserting"
            );
            index = Some(existing);
        } else if let Some(record) = entry.record.clone() {
            let at = entry.index.unwrap_or(self.store.len()).min(self.store.len());
            if let Err(e) = self.store.insert(at, record) {
                self.report_recovery_failure(&e);
                sync.recovery_error = Some(e);
            }
            index = Some(at);
        }
        sync.log_error = self.rewrite_log().err();

        Ok(UndoOutcome { entry, index, sync })
    }

    /// Rename or move the photo at `index` to `subfolder`/`name`.
    ///
    /// Collisions follow the session policy unless `decision` answers a
    /// previous [`EditOutcome::NeedsDecision`].
    pub fn update_photo(
        &mut self,
        index: usize,
        subfolder: &str,
        name: &str,
        decision: Option<DuplicateDecision>,
    ) -> Result<EditOutcome> {
        let record = self
            .store
            .get(index)
            .cloned()
            .ok_or(SessionError::InvalidIndex { index })?;
        if !record.file_path.exists() {
            return Err(SessionError::PhotoNotFound {
                path: record.file_path,
            }
            .into());
        }

        let policy = match decision {
            Some(DuplicateDecision::Cancel) => return Ok(EditOutcome::Cancelled),
            Some(d) => d.as_policy().unwrap_or(self.policy()),
            None => self.policy(),
        };

        let current = record.file_path.clone();
        let resolution =
            self.resolver()
                .resolve_with(subfolder, name, policy, |p| p.exists() && p != current)?;

        let mut sync = SyncStatus::default();
        let mut retired = None;
        let mut replacing = false;
        let target = match resolution {
            Resolution::Conflict { existing } => {
                self.events.send(Event::Capture(CaptureEvent::DuplicateFound {
                    existing: existing.clone(),
                }));
                return Ok(EditOutcome::NeedsDecision { existing });
            }
            Resolution::Free(target) | Resolution::Incremented { path: target, .. } => target,
            Resolution::Replace(target) => {
                retired = self.retire_photo(&target)?;
                replacing = true;
                target
            }
        };

        if target != current {
            if let Err(source) = move_file(&current, &target) {
                if let Some(token) = retired {
                    self.restore_retired(token);
                }
                return Err(ShotLedgerError::Io {
                    path: target,
                    source,
                });
            }
        }

        let mut updated = CaptureRecord::new(
            validate_subfolder(subfolder)?,
            validate_name(name)?,
            target.clone(),
        );
        updated.timestamp = record.timestamp;

        if replacing {
            let (_, recovery_error) = self.supersede_records(&target);
            sync.recovery_error = recovery_error;
        }

        // Superseding may have removed records ahead of this one
        let position = self.store.position_of(&current).unwrap_or(index);
        if let Err(e) = self.store.update(position, updated.clone()) {
            self.report_recovery_failure(&e);
            sync.recovery_error = Some(e);
        }
        sync.log_error = self.rewrite_log().err();

        tracing::info!(from = %current.display(), to = %target.display(), "photo updated");
        self.events.send(Event::Capture(CaptureEvent::Edited {
            from: current,
            to: target,
        }));

        Ok(EditOutcome::Updated {
            record: updated,
            sync,
        })
    }

    /// Write every record of this session to `path` (`.xlsx` or `.csv`)
    pub fn export_report(&self, path: &Path) -> Result<usize> {
        match export_to_file(self.store.records(), path) {
            Ok(rows) => {
                self.events.send(Event::Export(ExportEvent::Exported {
                    path: path.to_path_buf(),
                    rows,
                }));
                Ok(rows)
            }
            Err(e) => {
                self.events.send(Event::Export(ExportEvent::Failed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }));
                Err(e.into())
            }
        }
    }

    /// Permanently delete everything in the project's trash, including what
    /// earlier sessions left behind. Photos and records are untouched, but
    /// nothing deleted so far can be undone afterwards.
    ///
    /// Returns the number of files removed.
    pub fn empty_trash(&mut self) -> Result<usize> {
        let removed = self.trash.purge_leftovers()? + self.trash.purge()?;
        self.events.send(Event::Trash(TrashEvent::Purged {
            files_removed: removed,
        }));
        Ok(removed)
    }

    /// Close the session: empty its trash (when configured), clear the
    /// records and the recovery file, and reset the log to its header.
    pub fn end_session(mut self) -> Result<EndSummary> {
        let mut summary = EndSummary {
            photo_count: self.store.len(),
            ..EndSummary::default()
        };

        if self.config.auto_empty_trash {
            match self.trash.purge() {
                Ok(removed) => {
                    summary.trash_purged = removed;
                    self.events.send(Event::Trash(TrashEvent::Purged {
                        files_removed: removed,
                    }));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "trash not emptied");
                    summary.purge_error = Some(e.into());
                }
            }
        }

        self.store.clear()?;

        if let Err(e) = self.log.reset() {
            tracing::warn!(error = %e, "session log not reset");
            summary.log_error = Some(e);
        }

        tracing::info!(photos = summary.photo_count, "session ended");
        self.events.send(Event::Session(SessionEvent::Ended {
            photo_count: summary.photo_count,
        }));
        Ok(summary)
    }

    /// What closing the application should do with this session.
    ///
    /// `Ask` only stands when there are photos to lose; an empty session
    /// is simply ended.
    pub fn exit_action(&self) -> OnExit {
        match self.config.on_exit {
            OnExit::Ask if self.store.is_empty() => OnExit::EndSession,
            other => other,
        }
    }

    /// Record a freshly written photo: store first, then the log.
    ///
    /// `rebuild_log` rewrites the whole log instead of appending, for when
    /// records were dropped since the last log write.
    pub(crate) fn record_capture(
        &mut self,
        record: CaptureRecord,
        rebuild_log: bool,
    ) -> (usize, SyncStatus) {
        let mut sync = SyncStatus::default();
        if let Err(e) = self.store.append(record.clone()) {
            self.report_recovery_failure(&e);
            sync.recovery_error = Some(e);
        }
        let index = self.store.len() - 1;

        if rebuild_log {
            sync.log_error = self.rewrite_log().err();
        } else if self.config.realtime_log {
            sync.log_error = match self.log.append(&record) {
                Ok(rows) => {
                    self.events.send(Event::Export(ExportEvent::RowLogged {
                        path: self.log.path().to_path_buf(),
                        rows,
                    }));
                    None
                }
                Err(ExportError::Read { reason, .. }) => {
                    tracing::warn!(%reason, "session log unreadable, rebuilding it");
                    self.rewrite_log().err()
                }
                Err(e) => {
                    self.report_log_failure(&e);
                    Some(e)
                }
            };
        }

        (index, sync)
    }

    /// Move the photo at `path` into the trash ahead of a replacement.
    ///
    /// Its records stay until the replacement is in place; see
    /// [`supersede_records`](Self::supersede_records). With the trash off
    /// the file stays put to be overwritten.
    pub(crate) fn retire_photo(&mut self, path: &Path) -> Result<Option<UndoToken>> {
        if !self.config.keeps_trash() || !path.exists() {
            return Ok(None);
        }

        let index = self.store.position_of(path);
        let token = self.trash.delete(
            path,
            DeletedCapture {
                record: index.and_then(|i| self.store.get(i).cloned()),
                index,
            },
        )?;
        self.events.send(Event::Trash(TrashEvent::Trashed {
            token: token.0,
            original: path.to_path_buf(),
        }));
        Ok(Some(token))
    }

    /// Drop the records of a photo that has just been replaced
    pub(crate) fn supersede_records(&mut self, path: &Path) -> (usize, Option<SessionError>) {
        let matching = self
            .store
            .records()
            .iter()
            .filter(|r| r.file_path == path)
            .count();
        match self.store.supersede(path) {
            Ok(removed) => (removed.len(), None),
            Err(e) => {
                // Dropped from memory even though the recovery file missed it
                self.report_recovery_failure(&e);
                (matching, Some(e))
            }
        }
    }

    /// Put a retired photo's file back after its replacement failed. Its
    /// records were never dropped, so only the file moves.
    pub(crate) fn restore_retired(&mut self, token: UndoToken) {
        match self.trash.undo(token) {
            Ok(entry) => {
                tracing::info!(path = %entry.original_path.display(), "replaced photo restored");
                self.events.send(Event::Trash(TrashEvent::Restored {
                    token: entry.token.0,
                    original: entry.original_path,
                }));
            }
            Err(e) => tracing::error!(error = %e, "could not restore replaced photo"),
        }
    }

    fn rewrite_log(&self) -> std::result::Result<(), ExportError> {
        if !self.config.realtime_log {
            return Ok(());
        }
        match self.log.rewrite(self.store.records()) {
            Ok(rows) => {
                self.events.send(Event::Export(ExportEvent::LogRewritten {
                    path: self.log.path().to_path_buf(),
                    rows,
                }));
                Ok(())
            }
            Err(e) => {
                self.report_log_failure(&e);
                Err(e)
            }
        }
    }

    fn report_log_failure(&self, e: &ExportError) {
        tracing::warn!(path = %self.log.path().display(), error = %e, "session log not updated");
        self.events.send(Event::Export(ExportEvent::Failed {
            path: self.log.path().to_path_buf(),
            message: e.to_string(),
        }));
    }

    fn report_recovery_failure(&self, e: &SessionError) {
        self.events.send(Event::Session(SessionEvent::RecoveryFailed {
            message: e.to_string(),
        }));
    }
}

fn same_folder(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::naming::TRASH_DIR_NAME;
    use crate::events::{null_sender, EventChannel};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        project: PathBuf,
        paths: AppPaths,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let project = temp.path().join("project");
            fs::create_dir_all(&project).unwrap();
            let paths = AppPaths::in_dir(&temp.path().join("app"));
            Self {
                _temp: temp,
                project,
                paths,
            }
        }

        fn start(&self, config: Config) -> SessionContext {
            SessionContext::start(config, self.paths.clone(), &self.project, null_sender()).unwrap()
        }

        /// Write a photo file and record it as if captured
        fn add_photo(&self, ctx: &mut SessionContext, subfolder: &str, name: &str) -> PathBuf {
            let path = self.project.join(subfolder).join(format!("{}.jpg", name));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, name.as_bytes()).unwrap();
            ctx.record_capture(CaptureRecord::new(subfolder, name, path.clone()), false);
            path
        }
    }

    #[test]
    fn start_refuses_missing_folder() {
        let fx = Fixture::new();
        let result = SessionContext::start(
            Config::default(),
            fx.paths.clone(),
            &fx.project.join("nope"),
            null_sender(),
        );
        assert!(matches!(
            result,
            Err(ShotLedgerError::Session(SessionError::ProjectFolderMissing { .. }))
        ));
    }

    #[test]
    fn start_resumes_same_folder_and_refuses_another() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        fx.add_photo(&mut ctx, "Eng", "Jane");
        let id = ctx.session_id();
        drop(ctx);

        let ctx = fx.start(Config::default());
        assert_eq!(ctx.session_id(), id);
        assert_eq!(ctx.records().len(), 1);
        drop(ctx);

        let other = fx._temp.path().join("other");
        fs::create_dir_all(&other).unwrap();
        let result = SessionContext::start(Config::default(), fx.paths.clone(), &other, null_sender());
        assert!(matches!(
            result,
            Err(ShotLedgerError::Session(SessionError::ActiveSessionElsewhere { .. }))
        ));
    }

    #[test]
    fn start_remembers_recent_project() {
        let fx = Fixture::new();
        let _ctx = fx.start(Config::default());
        let saved = Config::load(&fx.paths.config_file).unwrap();
        assert_eq!(saved.recent_projects.len(), 1);
        assert!(saved.last_project.is_some());
    }

    #[test]
    fn delete_then_undo_restores_file_and_position() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        fx.add_photo(&mut ctx, "Eng", "A");
        let b = fx.add_photo(&mut ctx, "Eng", "B");
        fx.add_photo(&mut ctx, "Eng", "C");

        let deleted = ctx.delete_photo(1).unwrap();
        assert!(!b.exists());
        assert_eq!(ctx.records().len(), 2);
        assert_eq!(ctx.log().rows().unwrap().len(), 2);

        let restored = ctx.undo_delete(deleted.undo).unwrap();
        assert_eq!(restored.index, Some(1));
        assert!(b.exists());
        assert_eq!(ctx.records()[1].name, "B");
        assert_eq!(ctx.log().rows().unwrap().len(), 3);
    }

    #[test]
    fn undo_after_unrecorded_delete_keeps_one_record() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        let path = fx.add_photo(&mut ctx, "Eng", "Ann");
        let before_delete = fs::read(&fx.paths.recovery_file).unwrap();

        ctx.delete_photo(0).unwrap();
        drop(ctx);
        // The process died after the trash move but before the recovery write
        fs::write(&fx.paths.recovery_file, before_delete).unwrap();

        let mut ctx = SessionContext::resume(Config::default(), fx.paths.clone(), null_sender())
            .unwrap()
            .unwrap();
        assert_eq!(ctx.records().len(), 1);

        let restored = ctx.undo_delete(None).unwrap();
        assert_eq!(restored.index, Some(0));
        assert_eq!(ctx.records().len(), 1);
        assert!(path.exists());
        assert_eq!(ctx.log().rows().unwrap().len(), 1);
    }

    #[test]
    fn undo_without_deletes_is_nothing_to_undo() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        assert!(matches!(
            ctx.undo_delete(None),
            Err(ShotLedgerError::Session(SessionError::NothingToUndo))
        ));
    }

    #[test]
    fn delete_without_trash_removes_file() {
        let fx = Fixture::new();
        let config = Config {
            use_trash: false,
            ..Config::default()
        };
        let mut ctx = fx.start(config);
        let path = fx.add_photo(&mut ctx, "Eng", "A");

        let outcome = ctx.delete_photo(0).unwrap();
        assert!(outcome.undo.is_none());
        assert!(!path.exists());
        assert!(ctx.trash().is_empty());
    }

    #[test]
    fn zero_undo_limit_deletes_without_a_token() {
        let fx = Fixture::new();
        let config = Config {
            undo_delete_limit: 0,
            ..Config::default()
        };
        let mut ctx = fx.start(config);
        let path = fx.add_photo(&mut ctx, "Eng", "A");

        let outcome = ctx.delete_photo(0).unwrap();
        assert!(outcome.undo.is_none());
        assert!(!path.exists());
        assert!(ctx.trash().is_empty());
        assert!(ctx.records().is_empty());
    }

    #[test]
    fn delete_out_of_range_is_invalid_index() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        assert!(matches!(
            ctx.delete_photo(3),
            Err(ShotLedgerError::Session(SessionError::InvalidIndex { index: 3 }))
        ));
    }

    #[test]
    fn update_moves_file_and_keeps_timestamp() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        let old = fx.add_photo(&mut ctx, "Eng", "Jon");
        let stamp = ctx.records()[0].timestamp;

        let outcome = ctx.update_photo(0, "Ops", "John", None).unwrap();
        let EditOutcome::Updated { record, .. } = outcome else {
            panic!("expected update");
        };
        assert!(!old.exists());
        assert!(fx.project.join("Ops/John.jpg").exists());
        assert_eq!(record.timestamp, stamp);
        assert_eq!(ctx.records()[0].filename, "John.jpg");
        assert_eq!(ctx.log().rows().unwrap()[0][1], "Ops");
    }

    #[test]
    fn update_onto_taken_name_asks_then_keeps_both() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        fx.add_photo(&mut ctx, "Eng", "A");
        fx.add_photo(&mut ctx, "Eng", "B");

        let outcome = ctx.update_photo(1, "Eng", "A", None).unwrap();
        assert!(matches!(outcome, EditOutcome::NeedsDecision { .. }));

        let outcome = ctx
            .update_photo(1, "Eng", "A", Some(DuplicateDecision::KeepBoth))
            .unwrap();
        let EditOutcome::Updated { record, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(record.filename, "A_2.jpg");
        assert_eq!(ctx.records().len(), 2);
    }

    #[test]
    fn update_with_replace_trashes_the_other_photo() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        let a = fx.add_photo(&mut ctx, "Eng", "A");
        fx.add_photo(&mut ctx, "Eng", "B");

        ctx.update_photo(1, "Eng", "A", Some(DuplicateDecision::Replace))
            .unwrap();

        assert_eq!(ctx.records().len(), 1);
        assert_eq!(fs::read(&a).unwrap(), b"B");
        assert_eq!(ctx.trash().len(), 1);
    }

    #[test]
    fn failed_replace_without_trash_keeps_both_records() {
        let fx = Fixture::new();
        let config = Config {
            use_trash: false,
            ..Config::default()
        };
        let mut ctx = fx.start(config);
        let a = fx.add_photo(&mut ctx, "Eng", "A");
        let b = fx.add_photo(&mut ctx, "Eng", "B");
        // A non-empty directory at the target makes the move fail
        fs::remove_file(&a).unwrap();
        fs::create_dir_all(a.join("inner")).unwrap();

        let result = ctx.update_photo(1, "Eng", "A", Some(DuplicateDecision::Replace));

        assert!(matches!(result, Err(ShotLedgerError::Io { .. })));
        assert_eq!(ctx.records().len(), 2);
        assert_eq!(ctx.records()[1].file_path, b);
        assert!(b.exists());
        assert_eq!(ctx.log().rows().unwrap().len(), 2);
    }

    #[test]
    fn update_cancelled_changes_nothing() {
        let fx = Fixture::new();
        let mut ctx = fx.start(Config::default());
        let a = fx.add_photo(&mut ctx, "Eng", "A");

        let outcome = ctx
            .update_photo(0, "Eng", "Z", Some(DuplicateDecision::Cancel))
            .unwrap();
        assert!(matches!(outcome, EditOutcome::Cancelled));
        assert!(a.exists());
    }

    #[test]
    fn export_empty_session_fails() {
        let fx = Fixture::new();
        let ctx = fx.start(Config::default());
        let result = ctx.export_report(&fx.project.join("out.xlsx"));
        assert!(matches!(
            result,
            Err(ShotLedgerError::Export(ExportError::NothingToExport))
        ));
    }

    #[test]
    fn end_session_purges_trash_and_clears_everything() {
        let fx = Fixture::new();
        let (sender, receiver) = EventChannel::new();
        let mut ctx =
            SessionContext::start(Config::default(), fx.paths.clone(), &fx.project, sender).unwrap();
        fx.add_photo(&mut ctx, "Eng", "A");
        fx.add_photo(&mut ctx, "Eng", "B");
        let token = ctx.delete_photo(0).unwrap().undo.unwrap();
        let trash_dir = ctx.trash().dir().to_path_buf();

        let summary = ctx.end_session().unwrap();
        assert_eq!(summary.photo_count, 1);
        assert_eq!(summary.trash_purged, 1);
        assert!(!trash_dir.exists());
        assert!(!fx.paths.recovery_file.exists());
        assert!(ExcelLog::new(&fx.paths.session_log).rows().unwrap().is_empty());

        let ended = receiver
            .drain()
            .into_iter()
            .any(|e| matches!(e, Event::Session(SessionEvent::Ended { photo_count: 1 })));
        assert!(ended);

        // A new session cannot undo into the purged trash
        let mut ctx = fx.start(Config::default());
        assert!(matches!(
            ctx.undo_delete(Some(token)),
            Err(ShotLedgerError::Trash(crate::error::TrashError::NotFound { .. }))
        ));
    }

    #[test]
    fn empty_trash_keeps_records_and_ends_undo() {
        let fx = Fixture::new();
        let (sender, receiver) = EventChannel::new();
        let mut ctx =
            SessionContext::start(Config::default(), fx.paths.clone(), &fx.project, sender).unwrap();
        fx.add_photo(&mut ctx, "Eng", "A");
        let b = fx.add_photo(&mut ctx, "Eng", "B");
        let token = ctx.delete_photo(0).unwrap().undo.unwrap();

        assert_eq!(ctx.empty_trash().unwrap(), 1);

        assert!(ctx.trash().is_empty());
        assert!(!fx.project.join(TRASH_DIR_NAME).exists());
        assert_eq!(ctx.records().len(), 1);
        assert!(b.exists());
        assert!(matches!(
            ctx.undo_delete(Some(token)),
            Err(ShotLedgerError::Trash(crate::error::TrashError::NotFound { .. }))
        ));
        let purged = receiver
            .drain()
            .into_iter()
            .any(|e| matches!(e, Event::Trash(TrashEvent::Purged { files_removed: 1 })));
        assert!(purged);
    }

    #[test]
    fn empty_trash_clears_what_earlier_sessions_kept() {
        let fx = Fixture::new();
        let config = Config {
            auto_empty_trash: false,
            ..Config::default()
        };
        let mut ctx = fx.start(config.clone());
        fx.add_photo(&mut ctx, "Eng", "A");
        ctx.delete_photo(0).unwrap();
        let earlier_trash = ctx.trash().dir().to_path_buf();
        ctx.end_session().unwrap();
        assert!(earlier_trash.exists());

        let mut ctx = fx.start(config);
        assert_eq!(ctx.empty_trash().unwrap(), 1);
        assert!(!fx.project.join(TRASH_DIR_NAME).exists());
    }

    #[test]
    fn resume_without_recovery_file_is_none() {
        let fx = Fixture::new();
        let resumed = SessionContext::resume(Config::default(), fx.paths.clone(), null_sender()).unwrap();
        assert!(resumed.is_none());
    }

    #[test]
    fn exit_action_only_asks_with_photos() {
        let fx = Fixture::new();
        let config = Config {
            on_exit: OnExit::Ask,
            ..Config::default()
        };
        let mut ctx = fx.start(config);
        assert_eq!(ctx.exit_action(), OnExit::EndSession);
        fx.add_photo(&mut ctx, "Eng", "A");
        assert_eq!(ctx.exit_action(), OnExit::Ask);
    }
}
