//! # Core Module
//!
//! The GUI-agnostic capture engine.
//!
//! ## Modules
//! - `naming` - Validates names and resolves duplicate filenames
//! - `trash` - Session-scoped soft delete with undo
//! - `session` - Ordered capture records and the crash-recovery file
//! - `export` - Real-time Excel log and manual export
//! - `camera` - Camera seam, frame sources and the live preview loop
//! - `capture` - Orchestrates grab, save, record and log
//! - `context` - The active session and its user operations

pub mod camera;
pub mod capture;
pub mod context;
pub mod export;
pub mod fsops;
pub mod naming;
pub mod session;
pub mod trash;

// Re-export commonly used types
pub use capture::{CaptureOrchestrator, CaptureOutcome, CaptureResult, PendingCapture};
pub use context::{DeleteOutcome, EditOutcome, EndSummary, SessionContext, SyncStatus, UndoOutcome};
pub use naming::{DuplicateDecision, DuplicatePolicy, NamingResolver, Resolution};
pub use session::CaptureRecord;
pub use trash::UndoToken;
