//! # Events Module
//!
//! Event-driven notifications so any front end (CLI, GUI) can react to
//! what the session engine does.
//!
//! ## Design
//! The engine emits events through channels; a UI subscribes and updates
//! status lines, counters and dialogs.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         println!("{}", event);
//!     }
//! });
//!
//! let ctx = SessionContext::start(config, paths, "/shoots/gala", sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
