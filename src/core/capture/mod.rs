//! # Capture Module
//!
//! Takes a frame from the camera and turns it into a saved, recorded photo.
//!
//! ## Flow
//! ```text
//! validate names -> grab frame -> resolve path -> write JPEG -> record -> log
//! ```
//!
//! The log only ever sees photos that are already on disk. Under the `Ask`
//! policy a taken name suspends the capture: the caller receives a
//! [`PendingCapture`] holding the grabbed frame and finishes it with
//! [`CaptureOrchestrator::resume`] once the user has decided.

use crate::core::camera::{grab_shared, Frame, SharedCamera};
use crate::core::context::{SessionContext, SyncStatus};
use crate::core::fsops::{stage_file, write_atomic};
use crate::core::naming::{
    validate_name, validate_subfolder, DuplicateDecision, DuplicatePolicy, Resolution,
};
use crate::core::session::CaptureRecord;
use crate::error::{Result, SessionError, ShotLedgerError};
use crate::events::{CaptureEvent, Event};
use std::path::{Path, PathBuf};

/// A capture waiting for the user's answer to a name collision
#[derive(Debug, Clone)]
pub struct PendingCapture {
    frame: Frame,
    subfolder: String,
    name: String,
    existing: PathBuf,
}

impl PendingCapture {
    /// The photo already using the requested name
    pub fn existing(&self) -> &Path {
        &self.existing
    }

    pub fn subfolder(&self) -> &str {
        &self.subfolder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

/// A photo that made it to disk
#[derive(Debug)]
pub struct CaptureResult {
    pub record: CaptureRecord,
    /// Position of the record in the session
    pub index: usize,
    /// Set when an existing photo was replaced
    pub replaced: Option<PathBuf>,
    /// Records that pointed at the replaced photo and were dropped
    pub superseded: usize,
    pub sync: SyncStatus,
}

/// What a capture attempt ended in
#[derive(Debug)]
pub enum CaptureOutcome {
    Saved(CaptureResult),
    NeedsDecision(PendingCapture),
    Cancelled,
}

/// Grabs frames and saves them into the active session
#[derive(Clone)]
pub struct CaptureOrchestrator {
    camera: SharedCamera,
}

impl CaptureOrchestrator {
    pub fn new(camera: SharedCamera) -> Self {
        Self { camera }
    }

    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    /// Capture a photo named `name` into `subfolder`.
    ///
    /// Fails with an invalid-name error before touching the camera, with a
    /// camera error when no frame is available, or with an I/O error when
    /// the photo cannot be written. In every failure case nothing is logged.
    pub fn capture(
        &self,
        ctx: &mut SessionContext,
        subfolder: &str,
        name: &str,
    ) -> Result<CaptureOutcome> {
        let subfolder = validate_subfolder(subfolder)?;
        let name = validate_name(name)?;

        let frame = grab_shared(&self.camera)?;
        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            subfolder,
            name,
            "frame grabbed"
        );

        let policy = ctx.policy();
        self.finish(ctx, frame, subfolder, name, policy)
    }

    /// Finish a suspended capture with the user's decision
    pub fn resume(
        &self,
        ctx: &mut SessionContext,
        pending: PendingCapture,
        decision: DuplicateDecision,
    ) -> Result<CaptureOutcome> {
        match decision.as_policy() {
            Some(policy) => {
                self.finish(ctx, pending.frame, &pending.subfolder, &pending.name, policy)
            }
            None => {
                tracing::info!(name = %pending.name, "capture cancelled");
                ctx.events().send(Event::Capture(CaptureEvent::Cancelled {
                    name: pending.name,
                }));
                Ok(CaptureOutcome::Cancelled)
            }
        }
    }

    fn finish(
        &self,
        ctx: &mut SessionContext,
        frame: Frame,
        subfolder: &str,
        name: &str,
        policy: DuplicatePolicy,
    ) -> Result<CaptureOutcome> {
        let resolution = ctx
            .resolver()
            .resolve_with(subfolder, name, policy, |p| p.exists())?;

        let mut supersede_error = None;
        let (path, replaced, superseded) = match resolution {
            Resolution::Conflict { existing } => {
                tracing::info!(existing = %existing.display(), "name taken, asking");
                ctx.events().send(Event::Capture(CaptureEvent::DuplicateFound {
                    existing: existing.clone(),
                }));
                return Ok(CaptureOutcome::NeedsDecision(PendingCapture {
                    frame,
                    subfolder: subfolder.to_string(),
                    name: name.to_string(),
                    existing,
                }));
            }
            Resolution::Free(path) | Resolution::Incremented { path, .. } => {
                let bytes = frame.encode_jpeg(ctx.config().jpeg_quality)?;
                write_atomic(&path, &bytes).map_err(|source| ShotLedgerError::Io {
                    path: path.clone(),
                    source,
                })?;
                (path, None, 0)
            }
            Resolution::Replace(path) => {
                let (superseded, recovery_error) = self.replace(ctx, &frame, &path)?;
                supersede_error = recovery_error;
                (path.clone(), Some(path), superseded)
            }
        };

        tracing::info!(path = %path.display(), "photo saved");

        let record = CaptureRecord::new(subfolder, name, path.clone());
        let (index, mut sync) = ctx.record_capture(record.clone(), superseded > 0);

        if sync.recovery_error.is_none() {
            sync.recovery_error = supersede_error;
        }

        if let Some(replaced) = &replaced {
            ctx.events().send(Event::Capture(CaptureEvent::Replaced {
                path: replaced.clone(),
            }));
        }
        ctx.events()
            .send(Event::Capture(CaptureEvent::Saved { path, index }));

        Ok(CaptureOutcome::Saved(CaptureResult {
            record,
            index,
            replaced,
            superseded,
            sync,
        }))
    }

    /// Overwrite `path` with the frame. The new photo is fully written
    /// beside the target before the old one is moved away, and the old
    /// photo's records are only dropped once the new file is in place.
    fn replace(
        &self,
        ctx: &mut SessionContext,
        frame: &Frame,
        path: &Path,
    ) -> Result<(usize, Option<SessionError>)> {
        let io_error = |source: std::io::Error| ShotLedgerError::Io {
            path: path.to_path_buf(),
            source,
        };

        let bytes = frame.encode_jpeg(ctx.config().jpeg_quality)?;
        let staged = stage_file(path, &bytes).map_err(io_error)?;

        let retired = ctx.retire_photo(path)?;

        if let Err(e) = staged.persist(path) {
            if let Some(token) = retired {
                ctx.restore_retired(token);
            }
            return Err(io_error(e.error));
        }

        let (superseded, recovery_error) = ctx.supersede_records(path);
        tracing::info!(path = %path.display(), superseded, "replaced existing photo");
        Ok((superseded, recovery_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppPaths, Config};
    use crate::core::camera::{share, NoCamera, TestPatternCamera};
    use crate::error::{CameraError, NamingError};
    use crate::events::null_sender;
    use std::fs;
    use tempfile::TempDir;

    fn setup(config: Config) -> (TempDir, SessionContext, CaptureOrchestrator) {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let paths = AppPaths::in_dir(&temp.path().join("app"));
        let ctx = SessionContext::start(config, paths, &project, null_sender()).unwrap();
        let orchestrator = CaptureOrchestrator::new(share(TestPatternCamera::new(64, 48)));
        (temp, ctx, orchestrator)
    }

    fn saved(outcome: CaptureOutcome) -> CaptureResult {
        match outcome {
            CaptureOutcome::Saved(result) => result,
            other => panic!("expected a saved photo, got {:?}", other),
        }
    }

    #[test]
    fn capture_writes_jpeg_and_logs_row() {
        let (_temp, mut ctx, orchestrator) = setup(Config::default());

        let result = saved(orchestrator.capture(&mut ctx, "Eng", "John Doe").unwrap());

        assert!(result.record.file_path.ends_with("Eng/John Doe.jpg"));
        assert!(image::open(&result.record.file_path).is_ok());
        assert_eq!(result.index, 0);
        assert!(result.sync.is_ok());
        assert_eq!(ctx.records().len(), 1);

        let rows = ctx.log().rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "Eng");
        assert_eq!(rows[0][2], "John Doe");
    }

    #[test]
    fn ask_policy_suspends_and_keep_both_increments() {
        let (_temp, mut ctx, orchestrator) = setup(Config::default());
        saved(orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap());

        let pending = match orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap() {
            CaptureOutcome::NeedsDecision(pending) => pending,
            other => panic!("expected a decision request, got {:?}", other),
        };
        assert!(pending.existing().ends_with("Eng/Jane.jpg"));
        assert_eq!(ctx.records().len(), 1);

        let result = saved(
            orchestrator
                .resume(&mut ctx, pending, DuplicateDecision::KeepBoth)
                .unwrap(),
        );
        assert_eq!(result.record.filename, "Jane_2.jpg");
        assert_eq!(ctx.records().len(), 2);
    }

    #[test]
    fn cancel_saves_nothing() {
        let (_temp, mut ctx, orchestrator) = setup(Config::default());
        saved(orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap());

        let CaptureOutcome::NeedsDecision(pending) =
            orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap()
        else {
            panic!("expected a decision request");
        };
        let outcome = orchestrator
            .resume(&mut ctx, pending, DuplicateDecision::Cancel)
            .unwrap();

        assert!(matches!(outcome, CaptureOutcome::Cancelled));
        assert_eq!(ctx.records().len(), 1);
        assert_eq!(ctx.log().rows().unwrap().len(), 1);
    }

    #[test]
    fn replace_trashes_old_photo_and_supersedes_its_record() {
        let config = Config {
            duplicate_handling: DuplicatePolicy::Replace,
            ..Config::default()
        };
        let (_temp, mut ctx, orchestrator) = setup(config);
        saved(orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap());

        let result = saved(orchestrator.capture(&mut ctx, "Eng", "Jane").unwrap());

        assert!(result.replaced.is_some());
        assert_eq!(result.superseded, 1);
        assert_eq!(ctx.records().len(), 1);
        assert_eq!(ctx.trash().len(), 1);
        assert_eq!(ctx.log().rows().unwrap().len(), 1);
        assert!(result.record.file_path.exists());
    }

    #[test]
    fn failed_replace_without_trash_keeps_old_record_and_row() {
        let config = Config {
            duplicate_handling: DuplicatePolicy::Replace,
            use_trash: false,
            ..Config::default()
        };
        let (_temp, mut ctx, orchestrator) = setup(config);
        let first = saved(orchestrator.capture(&mut ctx, "Eng", "Ann").unwrap());
        // A non-empty directory at the target makes the final rename fail
        fs::remove_file(&first.record.file_path).unwrap();
        fs::create_dir_all(first.record.file_path.join("inner")).unwrap();

        let result = orchestrator.capture(&mut ctx, "Eng", "Ann");

        assert!(matches!(result, Err(ShotLedgerError::Io { .. })));
        assert_eq!(ctx.records(), &[first.record][..]);
        assert_eq!(ctx.log().rows().unwrap().len(), 1);
    }

    #[test]
    fn replace_with_trash_disabled_overwrites_in_place() {
        let config = Config {
            duplicate_handling: DuplicatePolicy::Replace,
            use_trash: false,
            ..Config::default()
        };
        let (_temp, mut ctx, orchestrator) = setup(config);
        saved(orchestrator.capture(&mut ctx, "Eng", "Ann").unwrap());

        let result = saved(orchestrator.capture(&mut ctx, "Eng", "Ann").unwrap());

        assert_eq!(result.superseded, 1);
        assert_eq!(result.index, 0);
        assert!(ctx.trash().is_empty());
        assert_eq!(ctx.records().len(), 1);
        assert_eq!(ctx.log().rows().unwrap().len(), 1);
    }

    #[test]
    fn auto_increment_never_collides() {
        let config = Config {
            duplicate_handling: DuplicatePolicy::AutoIncrement,
            ..Config::default()
        };
        let (_temp, mut ctx, orchestrator) = setup(config);

        let mut paths = Vec::new();
        for _ in 0..4 {
            let result = saved(orchestrator.capture(&mut ctx, "Eng", "Sam").unwrap());
            paths.push(result.record.file_path);
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn no_camera_fails_without_logging() {
        let (_temp, mut ctx, _) = setup(Config::default());
        let orchestrator = CaptureOrchestrator::new(share(NoCamera));

        let result = orchestrator.capture(&mut ctx, "Eng", "Jane");
        assert!(matches!(
            result,
            Err(ShotLedgerError::Camera(CameraError::NoDevice))
        ));
        assert!(ctx.records().is_empty());
        assert!(ctx.log().rows().unwrap().is_empty());
    }

    #[test]
    fn invalid_name_is_rejected_before_capture() {
        let (_temp, mut ctx, orchestrator) = setup(Config::default());
        let result = orchestrator.capture(&mut ctx, "Eng", "a/b");
        assert!(matches!(
            result,
            Err(ShotLedgerError::InvalidName(NamingError::IllegalCharacters { .. }))
        ));
    }

    #[test]
    fn failed_write_logs_nothing() {
        let (temp, mut ctx, orchestrator) = setup(Config::default());
        // A file where the subfolder should be makes the write fail
        fs::write(temp.path().join("project").join("Eng"), b"").unwrap();

        let result = orchestrator.capture(&mut ctx, "Eng", "Jane");
        assert!(matches!(result, Err(ShotLedgerError::Io { .. })));
        assert!(ctx.records().is_empty());
        assert!(ctx.log().rows().unwrap().is_empty());
    }
}
