//! # Shot Ledger
//!
//! Capture webcam photos into a named folder hierarchy and keep a ledger of
//! every shot in an Excel workbook.
//!
//! ## Core Philosophy
//! - **Never lose a photo** - deletes go to a session trash and can be undone
//! - **Never log a ghost** - a row is written only after its photo is on disk
//! - **Survive a crash** - the session is snapshotted after every change
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Naming, trash, session store, export and capture
//! - `config` - Per-user settings
//! - `events` - Event-driven notifications (GUI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, ShotLedgerError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing already initialized: {}", e);
    }
}
