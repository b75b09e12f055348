//! Background live-preview loop.

use super::traits::{grab_shared, Frame, SharedCamera};
use crate::events::{Event, EventSender, PreviewEvent};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the preview loop
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Delay between polls
    pub interval: Duration,
    /// Largest frame size delivered to the display
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(30),
            max_width: 900,
            max_height: 650,
        }
    }
}

/// Polls a shared camera on a background thread and hands the newest
/// scaled frame to the display.
///
/// Only one frame is buffered; when the display falls behind, frames are
/// dropped rather than queued. Stops on [`stop`](Self::stop) or drop.
pub struct PreviewLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
    frames: Receiver<Frame>,
}

impl PreviewLoop {
    pub fn start(camera: SharedCamera, config: PreviewConfig, events: EventSender) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded(1);

        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || run(camera, config, events, tx, stop_flag));

        Self {
            stop,
            handle: Some(handle),
            frames: rx,
        }
    }

    /// Channel of preview frames for the display
    pub fn frames(&self) -> &Receiver<Frame> {
        &self.frames
    }

    /// Newest frame, if one arrived since the last call
    pub fn latest(&self) -> Option<Frame> {
        self.frames.try_iter().last()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the loop and wait for the thread. Returns frames delivered.
    pub fn stop(&mut self) -> u64 {
        self.stop.store(true, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for PreviewLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    camera: SharedCamera,
    config: PreviewConfig,
    events: EventSender,
    tx: Sender<Frame>,
    stop: Arc<AtomicBool>,
) -> u64 {
    events.send(Event::Preview(PreviewEvent::Started));
    tracing::debug!(interval_ms = config.interval.as_millis() as u64, "preview loop started");

    let mut delivered = 0u64;
    let mut camera_lost = false;

    while !stop.load(Ordering::SeqCst) {
        match grab_shared(&camera) {
            Ok(frame) => {
                if camera_lost {
                    camera_lost = false;
                    events.send(Event::Preview(PreviewEvent::CameraRecovered));
                }
                let scaled = frame.fit_within(config.max_width, config.max_height);
                match tx.try_send(scaled) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(e) => {
                if !camera_lost {
                    camera_lost = true;
                    tracing::warn!(error = %e, "preview lost the camera");
                    events.send(Event::Preview(PreviewEvent::CameraLost {
                        message: e.to_string(),
                    }));
                }
            }
        }
        thread::sleep(config.interval);
    }

    events.send(Event::Preview(PreviewEvent::Stopped {
        frames_delivered: delivered,
    }));
    tracing::debug!(delivered, "preview loop stopped");
    delivered
}
