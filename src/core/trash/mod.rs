//! # Trash Module
//!
//! Soft delete for captured photos. Deleted files are moved into a
//! per-session folder inside the project and can be restored until the
//! trash is purged at the end of the session.

mod manager;
mod types;

pub use manager::TrashManager;
pub use types::{DeletedCapture, TrashEntry, UndoToken};
