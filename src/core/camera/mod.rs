//! # Camera Module
//!
//! The camera is an external collaborator: this module only defines the
//! seam (`Camera`), the frame type with JPEG encoding, a few driver-free
//! sources and the background preview loop.
//!
//! ## Sources
//! - `StillImageCamera` - frames decoded from an image file
//! - `TestPatternCamera` - synthetic frames for demos and tests
//! - `NoCamera` - always fails with `CameraError::NoDevice`

mod preview;
mod sources;
mod traits;

pub use preview::{PreviewConfig, PreviewLoop};
pub use sources::{NoCamera, StillImageCamera, TestPatternCamera};
pub use traits::{grab_shared, share, Camera, Frame, SharedCamera};
