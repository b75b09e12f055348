//! # CLI Module
//!
//! Command-line interface for Shot Ledger.
//!
//! Each invocation reopens the active session from the recovery file, so a
//! session spans many commands until `end`.
//!
//! ## Usage
//! ```bash
//! # Open a project folder
//! shot-ledger open ~/Events/Offsite
//!
//! # Capture from an image dropped by a tethering tool
//! shot-ledger capture Eng "John Doe" --image ~/tether/latest.jpg
//!
//! # Review, fix and export
//! shot-ledger list
//! shot-ledger edit 3 Ops "Jane Roe"
//! shot-ledger delete 2 && shot-ledger undo
//! shot-ledger export ~/offsite.xlsx
//!
//! # Finish
//! shot-ledger trash empty
//! shot-ledger end
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use shot_ledger::config::{AppPaths, Config, OnExit};
use shot_ledger::core::camera::{
    share, NoCamera, PreviewConfig, PreviewLoop, SharedCamera, StillImageCamera,
    TestPatternCamera,
};
use shot_ledger::core::{
    CaptureOrchestrator, CaptureOutcome, DuplicateDecision, EditOutcome, SessionContext,
    SyncStatus, UndoToken,
};
use shot_ledger::error::{Result, SessionError};
use shot_ledger::events::{EventChannel, EventSender};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Shot Ledger - Named webcam captures with an Excel paper trail
#[derive(Parser, Debug)]
#[command(name = "shot-ledger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Print every session event
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep config, recovery file and log in this directory instead of the
    /// per-user locations
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open (or resume) a session for a project folder
    Open {
        /// Project folder; defaults to the last project
        folder: Option<PathBuf>,
    },

    /// Show the active session
    Status,

    /// Capture a photo into the active session
    Capture {
        /// Subfolder inside the project folder
        subfolder: String,

        /// Photo name, without extension
        name: String,

        #[command(flatten)]
        camera: CameraArgs,

        /// Answer for a taken name instead of prompting
        #[arg(long)]
        on_duplicate: Option<Decision>,
    },

    /// List the photos of the active session
    List,

    /// Rename or move a photo
    Edit {
        /// Position shown by `list`
        position: usize,
        subfolder: String,
        name: String,

        /// Answer for a taken name instead of prompting
        #[arg(long)]
        on_duplicate: Option<Decision>,
    },

    /// Delete a photo (to the trash when enabled)
    Delete {
        /// Position shown by `list`
        position: usize,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Restore a deleted photo, the most recent one by default
    Undo {
        /// Token printed by `delete`
        token: Option<uuid::Uuid>,
    },

    /// Export the session to .xlsx or .csv
    Export {
        /// Destination file
        path: PathBuf,
    },

    /// End the session: empty its trash, clear records, reset the log
    End {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the project's trash
    Trash {
        #[command(subcommand)]
        action: TrashAction,
    },

    /// Apply the on-exit setting to the active session
    Close,

    /// Watch the camera feed for a while
    Preview {
        #[command(flatten)]
        camera: CameraArgs,

        /// How long to run
        #[arg(long, default_value = "5")]
        seconds: u64,
    },

    /// Show or change settings
    Config {
        /// Setting name
        key: Option<String>,

        /// New value
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TrashAction {
    /// Show what can still be undone
    List,

    /// Permanently delete everything in the trash
    Empty {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Where frames come from
#[derive(Args, Debug)]
struct CameraArgs {
    /// Read frames from an image file
    #[arg(long, conflicts_with = "test_pattern")]
    image: Option<PathBuf>,

    /// Use a synthetic test pattern
    #[arg(long)]
    test_pattern: bool,
}

impl CameraArgs {
    fn open(&self) -> SharedCamera {
        if let Some(path) = &self.image {
            share(StillImageCamera::new(path))
        } else if self.test_pattern {
            share(TestPatternCamera::default())
        } else {
            share(NoCamera)
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Decision {
    /// Replace the existing photo
    Replace,
    /// Keep both, numbering the new one
    KeepBoth,
    /// Don't save
    Cancel,
}

impl From<Decision> for DuplicateDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Replace => DuplicateDecision::Replace,
            Decision::KeepBoth => DuplicateDecision::KeepBoth,
            Decision::Cancel => DuplicateDecision::Cancel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

/// Shared state for one invocation
struct App {
    term: Term,
    output: OutputFormat,
    paths: AppPaths,
    config: Config,
    events: EventSender,
}

impl App {
    fn pretty(&self) -> bool {
        matches!(self.output, OutputFormat::Pretty)
    }

    fn line(&self, text: impl AsRef<str>) {
        self.term.write_line(text.as_ref()).ok();
    }

    fn success(&self, text: impl AsRef<str>) {
        if self.pretty() {
            self.line(format!("{} {}", style("✓").green().bold(), text.as_ref()));
        }
    }

    fn warn(&self, text: impl AsRef<str>) {
        self.line(format!("{} {}", style("!").yellow().bold(), text.as_ref()));
    }

    fn report_sync(&self, sync: &SyncStatus) {
        for message in sync.messages() {
            self.warn(message);
        }
    }

    fn session(&self) -> Result<SessionContext> {
        SessionContext::resume(self.config.clone(), self.paths.clone(), self.events.clone())?
            .ok_or_else(|| SessionError::NoActiveSession.into())
    }

    fn interactive(&self) -> bool {
        self.term.is_term()
    }

    fn confirm(&self, question: &str) -> bool {
        if !self.interactive() {
            return false;
        }
        self.term
            .write_str(&format!("{} {} ", question, style("[y/N]").dim()))
            .ok();
        matches!(
            self.term.read_line().map(|a| a.trim().to_lowercase()),
            Ok(answer) if answer == "y" || answer == "yes"
        )
    }

    fn ask_duplicate(&self, existing: &Path) -> DuplicateDecision {
        if !self.interactive() {
            self.warn("Name already used and no terminal to ask; pass --on-duplicate");
            return DuplicateDecision::Cancel;
        }
        self.line(format!(
            "{} {} already exists.",
            style("?").cyan().bold(),
            existing.display()
        ));
        self.term
            .write_str(&format!(
                "  {}eplace, {}eep both or {}ancel? ",
                style("[r]").bold(),
                style("[k]").bold(),
                style("[c]").bold()
            ))
            .ok();
        match self.term.read_line().map(|a| a.trim().to_lowercase()) {
            Ok(answer) if answer.starts_with('r') => DuplicateDecision::Replace,
            Ok(answer) if answer.starts_with('k') => DuplicateDecision::KeepBoth,
            _ => DuplicateDecision::Cancel,
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.data_dir {
        Some(dir) => AppPaths::in_dir(dir),
        None => AppPaths::for_user()?,
    };
    let config = Config::load(&paths.config_file)?;

    let (sender, receiver) = EventChannel::new();
    let verbose = cli.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let term = Term::stderr();
        for event in receiver.iter() {
            if verbose {
                term.write_line(&format!("  {}", style(&event).dim())).ok();
            }
        }
    });

    let app = App {
        term: Term::stderr(),
        output: cli.output,
        paths,
        config,
        events: sender,
    };

    let result = dispatch(&app, cli.command);

    // Drop sender to signal event thread to finish
    drop(app);
    event_thread.join().ok();

    result
}

fn dispatch(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Open { folder } => run_open(app, folder),
        Commands::Status => run_status(app),
        Commands::Capture {
            subfolder,
            name,
            camera,
            on_duplicate,
        } => run_capture(app, &subfolder, &name, camera.open(), on_duplicate),
        Commands::List => run_list(app),
        Commands::Edit {
            position,
            subfolder,
            name,
            on_duplicate,
        } => run_edit(app, position, &subfolder, &name, on_duplicate),
        Commands::Delete { position, yes } => run_delete(app, position, yes),
        Commands::Undo { token } => run_undo(app, token.map(UndoToken)),
        Commands::Export { path } => run_export(app, &path),
        Commands::End { yes } => run_end(app, yes),
        Commands::Trash { action } => match action {
            TrashAction::List => run_trash_list(app),
            TrashAction::Empty { yes } => run_trash_empty(app, yes),
        },
        Commands::Close => run_close(app),
        Commands::Preview { camera, seconds } => run_preview(app, camera.open(), seconds),
        Commands::Config { key, value } => run_config(app, key, value),
    }
}

/// Convert a 1-based position from the command line
fn to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| SessionError::InvalidIndex { index: position }.into())
}

fn run_open(app: &App, folder: Option<PathBuf>) -> Result<()> {
    let folder = folder
        .or_else(|| app.config.last_project.clone())
        .ok_or(SessionError::NoActiveSession)?;

    let ctx = SessionContext::start(
        app.config.clone(),
        app.paths.clone(),
        &folder,
        app.events.clone(),
    )?;

    if app.pretty() {
        app.success(format!(
            "Session open in {} ({} photos, duplicates: {})",
            style(ctx.project_folder().display()).cyan(),
            ctx.records().len(),
            ctx.policy().as_str()
        ));
    } else if matches!(app.output, OutputFormat::Json) {
        print_json(&serde_json::json!({
            "project_folder": ctx.project_folder(),
            "session_id": ctx.session_id().to_string(),
            "photo_count": ctx.records().len(),
        }));
    }
    Ok(())
}

fn run_status(app: &App) -> Result<()> {
    let resumed =
        SessionContext::resume(app.config.clone(), app.paths.clone(), app.events.clone())?;
    let ctx = match resumed {
        Some(ctx) => ctx,
        None => {
            match app.output {
                OutputFormat::Json => print_json(&serde_json::json!({ "active": false })),
                _ => {
                    app.line("No active session.");
                    for (i, project) in app.config.recent_projects.iter().enumerate() {
                        app.line(format!("  {} {}", style(i + 1).dim(), project.display()));
                    }
                }
            }
            return Ok(());
        }
    };

    match app.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "active": true,
            "project_folder": ctx.project_folder(),
            "session_id": ctx.session_id().to_string(),
            "photo_count": ctx.records().len(),
            "subfolders": ctx.store().subfolders(),
            "duplicate_policy": ctx.policy().as_str(),
            "trash_entries": ctx.trash().len(),
            "session_log": ctx.log().path(),
        })),
        OutputFormat::Minimal => println!("{}", ctx.project_folder().display()),
        OutputFormat::Pretty => {
            app.line(format!(
                "{} {}",
                style("Project").bold(),
                style(ctx.project_folder().display()).cyan()
            ));
            app.line(format!("  {} photos", style(ctx.records().len()).cyan()));
            app.line(format!("  subfolders: {}", ctx.store().subfolders().join(", ")));
            app.line(format!("  duplicates: {}", ctx.policy().as_str()));
            app.line(format!("  undoable deletes: {}", ctx.trash().len()));
            app.line(format!("  log: {}", style(ctx.log().path().display()).dim()));
        }
    }
    Ok(())
}

fn run_capture(
    app: &App,
    subfolder: &str,
    name: &str,
    camera: SharedCamera,
    on_duplicate: Option<Decision>,
) -> Result<()> {
    let mut ctx = app.session()?;
    let orchestrator = CaptureOrchestrator::new(camera);

    let mut outcome = orchestrator.capture(&mut ctx, subfolder, name)?;
    if let CaptureOutcome::NeedsDecision(pending) = outcome {
        let decision = match on_duplicate {
            Some(decision) => decision.into(),
            None => app.ask_duplicate(pending.existing()),
        };
        outcome = orchestrator.resume(&mut ctx, pending, decision)?;
    }

    match outcome {
        CaptureOutcome::Saved(result) => {
            match app.output {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "saved": result.record,
                    "position": result.index + 1,
                    "replaced": result.replaced,
                })),
                OutputFormat::Minimal => println!("{}", result.record.file_path.display()),
                OutputFormat::Pretty => {
                    let verb = if result.replaced.is_some() { "Replaced" } else { "Saved" };
                    app.success(format!(
                        "{} {} (#{})",
                        verb,
                        style(result.record.file_path.display()).cyan(),
                        result.index + 1
                    ));
                }
            }
            app.report_sync(&result.sync);
        }
        CaptureOutcome::Cancelled => app.line("Capture cancelled; nothing saved."),
        CaptureOutcome::NeedsDecision(pending) => {
            app.warn(format!("{} is still taken", pending.existing().display()));
        }
    }
    Ok(())
}

fn run_list(app: &App) -> Result<()> {
    let ctx = app.session()?;

    match app.output {
        OutputFormat::Json => print_json(&serde_json::json!(ctx.records())),
        OutputFormat::Minimal => {
            for record in ctx.records() {
                println!("{}", record.file_path.display());
            }
        }
        OutputFormat::Pretty => {
            if ctx.records().is_empty() {
                app.line("No photos yet.");
            }
            for (i, record) in ctx.records().iter().enumerate() {
                app.line(format!(
                    "  {} {}  {} / {}  {}",
                    style(format!("{:>3}", i + 1)).bold(),
                    style(record.timestamp_display()).dim(),
                    record.subfolder,
                    style(&record.name).cyan(),
                    style(&record.filename).dim()
                ));
            }
        }
    }
    Ok(())
}

fn run_edit(
    app: &App,
    position: usize,
    subfolder: &str,
    name: &str,
    on_duplicate: Option<Decision>,
) -> Result<()> {
    let mut ctx = app.session()?;
    let index = to_index(position)?;

    let mut outcome = ctx.update_photo(index, subfolder, name, on_duplicate.map(Into::into))?;
    if let EditOutcome::NeedsDecision { existing } = &outcome {
        let decision = app.ask_duplicate(existing);
        outcome = ctx.update_photo(index, subfolder, name, Some(decision))?;
    }

    match outcome {
        EditOutcome::Updated { record, sync } => {
            app.success(format!("Now {}", style(record.file_path.display()).cyan()));
            if matches!(app.output, OutputFormat::Json) {
                print_json(&serde_json::json!(record));
            }
            app.report_sync(&sync);
        }
        EditOutcome::Cancelled | EditOutcome::NeedsDecision { .. } => {
            app.line("Edit cancelled; nothing changed.");
        }
    }
    Ok(())
}

fn run_delete(app: &App, position: usize, yes: bool) -> Result<()> {
    let mut ctx = app.session()?;
    let index = to_index(position)?;

    if ctx.config().confirm_delete && !yes {
        let Some(record) = ctx.store().get(index) else {
            return Err(SessionError::InvalidIndex { index: position }.into());
        };
        let question = format!("Delete {}?", record.file_path.display());
        if !app.confirm(&question) {
            app.line("Not deleted.");
            return Ok(());
        }
    }

    let outcome = ctx.delete_photo(index)?;
    match (&outcome.undo, app.output) {
        (Some(token), OutputFormat::Pretty) => app.success(format!(
            "Moved {} to the trash (undo: {})",
            outcome.record.filename,
            style(token).dim()
        )),
        (None, OutputFormat::Pretty) => {
            app.success(format!("Deleted {}", outcome.record.filename))
        }
        (token, OutputFormat::Json) => print_json(&serde_json::json!({
            "deleted": outcome.record,
            "undo_token": token.map(|t| t.to_string()),
        })),
        (token, OutputFormat::Minimal) => {
            if let Some(token) = token {
                println!("{}", token);
            }
        }
    }
    app.report_sync(&outcome.sync);
    Ok(())
}

fn run_undo(app: &App, token: Option<UndoToken>) -> Result<()> {
    let mut ctx = app.session()?;
    let outcome = ctx.undo_delete(token)?;

    app.success(format!(
        "Restored {}",
        style(outcome.entry.original_path.display()).cyan()
    ));
    if matches!(app.output, OutputFormat::Minimal) {
        println!("{}", outcome.entry.original_path.display());
    }
    app.report_sync(&outcome.sync);
    Ok(())
}

fn run_trash_list(app: &App) -> Result<()> {
    let ctx = app.session()?;
    let entries = ctx.trash().entries();

    match app.output {
        OutputFormat::Json => print_json(&serde_json::json!({ "trash": entries })),
        OutputFormat::Minimal => {
            for entry in entries {
                println!("{}\t{}", entry.token, entry.original_path.display());
            }
        }
        OutputFormat::Pretty if entries.is_empty() => app.line("Trash is empty."),
        OutputFormat::Pretty => {
            for entry in entries.iter().rev() {
                app.line(format!(
                    "{}  {}  {}",
                    style(entry.deleted_at.format("%H:%M:%S")).dim(),
                    style(entry.original_path.display()).cyan(),
                    style(entry.token).dim()
                ));
            }
        }
    }
    Ok(())
}

fn run_trash_empty(app: &App, yes: bool) -> Result<()> {
    let mut ctx = app.session()?;

    if !yes {
        let question = format!(
            "Permanently delete the trash in {}? Deleted photos can no longer be restored.",
            ctx.project_folder().display()
        );
        if !app.confirm(&question) {
            app.line("Trash kept.");
            return Ok(());
        }
    }

    let removed = ctx.empty_trash()?;
    app.success(format!("Trash emptied: {} files removed", removed));
    if matches!(app.output, OutputFormat::Minimal) {
        println!("{}", removed);
    }
    Ok(())
}

fn run_export(app: &App, path: &Path) -> Result<()> {
    let ctx = app.session()?;

    loop {
        match ctx.export_report(path) {
            Ok(rows) => {
                app.success(format!(
                    "Exported {} rows to {}",
                    rows,
                    style(path.display()).cyan()
                ));
                return Ok(());
            }
            Err(e) if e.is_retryable() && app.interactive() => {
                app.warn(e.to_string());
                if !app.confirm("Retry?") {
                    app.line("Export cancelled.");
                    return Ok(());
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_end(app: &App, yes: bool) -> Result<()> {
    let ctx = app.session()?;

    if ctx.config().confirm_end_session && !yes {
        let question = format!(
            "End the session for {} ({} photos)?",
            ctx.project_folder().display(),
            ctx.records().len()
        );
        if !app.confirm(&question) {
            app.line("Session kept.");
            return Ok(());
        }
    }

    finish_session(app, ctx)
}

fn finish_session(app: &App, ctx: SessionContext) -> Result<()> {
    let summary = ctx.end_session()?;
    app.success(format!(
        "Session ended: {} photos, {} trashed files removed",
        summary.photo_count, summary.trash_purged
    ));
    if let Some(e) = &summary.purge_error {
        app.warn(format!("Trash not emptied: {}", e));
    }
    if let Some(e) = &summary.log_error {
        app.warn(format!("Session log not reset: {}", e));
    }
    Ok(())
}

fn run_close(app: &App) -> Result<()> {
    let Some(ctx) =
        SessionContext::resume(app.config.clone(), app.paths.clone(), app.events.clone())?
    else {
        app.line("No active session.");
        return Ok(());
    };

    match ctx.exit_action() {
        OnExit::KeepSession => {
            app.success("Session kept for next time.");
            Ok(())
        }
        OnExit::EndSession => finish_session(app, ctx),
        OnExit::Ask => {
            let question = format!(
                "End the session with {} photos? (No keeps it for next time)",
                ctx.records().len()
            );
            if app.confirm(&question) {
                finish_session(app, ctx)
            } else {
                app.success("Session kept for next time.");
                Ok(())
            }
        }
    }
}

fn run_preview(app: &App, camera: SharedCamera, seconds: u64) -> Result<()> {
    let description = camera
        .lock()
        .map(|c| c.describe())
        .unwrap_or_else(|_| "camera".to_string());

    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(format!("Previewing {}", description));

    let mut preview = PreviewLoop::start(camera, PreviewConfig::default(), app.events.clone());
    let deadline = Instant::now() + Duration::from_secs(seconds);

    while Instant::now() < deadline {
        if let Ok(frame) = preview.frames().recv_timeout(Duration::from_millis(100)) {
            spinner.set_message(format!(
                "{} {}x{}",
                description,
                frame.width(),
                frame.height()
            ));
        }
        spinner.tick();
    }

    let delivered = preview.stop();
    spinner.finish_and_clear();
    app.success(format!("{} frames shown", delivered));
    Ok(())
}

fn run_config(app: &App, key: Option<String>, value: Option<String>) -> Result<()> {
    match (key, value) {
        (None, _) => {
            let json = serde_json::to_value(&app.config).unwrap_or_default();
            print_json(&json);
        }
        (Some(key), None) => {
            let value = app.config.get(&key)?;
            println!("{}", value);
        }
        (Some(key), Some(value)) => {
            let mut config = app.config.clone();
            config.set(&key, &value)?;
            config.save(&app.paths.config_file)?;

            // Keep an active session's policy in step with the setting
            if key == "duplicate_handling" {
                if let Some(mut ctx) =
                    SessionContext::resume(config.clone(), app.paths.clone(), app.events.clone())?
                {
                    ctx.set_duplicate_policy(config.duplicate_handling)?;
                }
            }
            app.success(format!("{} = {}", key, config.get(&key)?));
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("could not render JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_empty_parses_with_and_without_yes() {
        let cli = Cli::try_parse_from(["shot-ledger", "trash", "empty", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Trash {
                action: TrashAction::Empty { yes: true }
            }
        ));

        let cli = Cli::try_parse_from(["shot-ledger", "trash", "empty"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Trash {
                action: TrashAction::Empty { yes: false }
            }
        ));
    }

    #[test]
    fn trash_needs_an_action() {
        assert!(Cli::try_parse_from(["shot-ledger", "trash"]).is_err());
    }
}
