//! Frame sources that don't need a capture driver.

use super::traits::{Camera, Frame};
use crate::error::CameraError;
use image::{Rgb, RgbImage};
use std::path::PathBuf;

/// Serves frames decoded from an image file on disk.
///
/// Useful for tethered setups where another program drops the latest
/// shot into a known file.
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Camera for StillImageCamera {
    fn grab_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.path.exists() {
            return Err(CameraError::NoDevice);
        }
        let image = image::open(&self.path).map_err(|e| CameraError::FrameUnavailable {
            reason: format!("{}: {}", self.path.display(), e),
        })?;
        Ok(Frame::new(image.to_rgb8()))
    }

    fn describe(&self) -> String {
        format!("image file {}", self.path.display())
    }
}

/// Synthetic gradient frames, one shade step per grab
#[derive(Debug, Clone)]
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    tick: u8,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            tick: 0,
        }
    }
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl Camera for TestPatternCamera {
    fn grab_frame(&mut self) -> Result<Frame, CameraError> {
        let (w, h, tick) = (self.width, self.height, self.tick);
        let image = RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                (x * 255 / w) as u8,
                (y * 255 / h) as u8,
                tick,
            ])
        });
        self.tick = self.tick.wrapping_add(8);
        Ok(Frame::new(image))
    }

    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }
}

/// Stand-in used when no camera is configured; every grab fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

impl Camera for NoCamera {
    fn grab_frame(&mut self) -> Result<Frame, CameraError> {
        Err(CameraError::NoDevice)
    }

    fn describe(&self) -> String {
        "no camera".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pattern_has_requested_size_and_changes() {
        let mut camera = TestPatternCamera::new(64, 48);
        let first = camera.grab_frame().unwrap();
        let second = camera.grab_frame().unwrap();
        assert_eq!((first.width(), first.height()), (64, 48));
        assert_ne!(first.image.get_pixel(0, 0), second.image.get_pixel(0, 0));
    }

    #[test]
    fn no_camera_reports_no_device() {
        assert!(matches!(NoCamera.grab_frame(), Err(CameraError::NoDevice)));
    }

    #[test]
    fn still_image_round_trips_through_jpeg() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latest.jpg");
        let frame = TestPatternCamera::new(32, 16).grab_frame().unwrap();
        std::fs::write(&path, frame.encode_jpeg(90).unwrap()).unwrap();

        let mut camera = StillImageCamera::new(&path);
        let loaded = camera.grab_frame().unwrap();
        assert_eq!((loaded.width(), loaded.height()), (32, 16));
    }

    #[test]
    fn still_image_missing_file_is_no_device() {
        let mut camera = StillImageCamera::new("/nonexistent/latest.jpg");
        assert!(matches!(camera.grab_frame(), Err(CameraError::NoDevice)));
    }

    #[test]
    fn still_image_garbage_is_frame_unavailable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latest.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let mut camera = StillImageCamera::new(&path);
        assert!(matches!(
            camera.grab_frame(),
            Err(CameraError::FrameUnavailable { .. })
        ));
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let frame = TestPatternCamera::new(1920, 1080).grab_frame().unwrap();
        let fitted = frame.fit_within(900, 650);
        assert_eq!(fitted.width(), 900);
        assert_eq!(fitted.height(), 506);

        let small = TestPatternCamera::new(100, 50).grab_frame().unwrap();
        assert_eq!(small.fit_within(900, 650).width(), 100);
    }
}
