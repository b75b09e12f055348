//! # Session Module
//!
//! Keeps the ordered list of captures for the current run and mirrors it
//! to a recovery file after every change, so a crash or forced restart
//! loses nothing that was already saved.

mod recovery;
mod store;
mod types;

pub use recovery::RecoveryFile;
pub use store::SessionStore;
pub use types::{CaptureRecord, SessionSnapshot, TIMESTAMP_FORMAT};
