//! Camera trait and frame type.

use crate::error::CameraError;
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::{Arc, Mutex};

/// A single RGB frame from a camera
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Local::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as JPEG at the given quality (1-100)
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        self.image
            .write_with_encoder(encoder)
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Scale down to fit inside `max_width` x `max_height`, keeping the
    /// aspect ratio. Frames that already fit are returned unchanged.
    pub fn fit_within(&self, max_width: u32, max_height: u32) -> Frame {
        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 || (w <= max_width && h <= max_height) {
            return self.clone();
        }

        let scale = f64::min(max_width as f64 / w as f64, max_height as f64 / h as f64);
        let new_w = ((w as f64 * scale) as u32).max(1);
        let new_h = ((h as f64 * scale) as u32).max(1);

        Frame {
            image: imageops::resize(&self.image, new_w, new_h, FilterType::Triangle),
            captured_at: self.captured_at,
        }
    }
}

/// Source of frames for preview and capture
pub trait Camera: Send {
    /// Grab the current frame
    fn grab_frame(&mut self) -> Result<Frame, CameraError>;

    /// Human-readable description for status lines
    fn describe(&self) -> String;
}

/// A camera shared between the preview loop and the capture path
pub type SharedCamera = Arc<Mutex<Box<dyn Camera>>>;

/// Wrap a camera for sharing
pub fn share(camera: impl Camera + 'static) -> SharedCamera {
    let camera: Box<dyn Camera> = Box::new(camera);
    Arc::new(Mutex::new(camera))
}

/// Grab a frame from a shared camera
pub fn grab_shared(camera: &SharedCamera) -> Result<Frame, CameraError> {
    let mut guard = camera.lock().map_err(|_| CameraError::FrameUnavailable {
        reason: "camera handle poisoned by a crashed preview".to_string(),
    })?;
    guard.grab_frame()
}
