use anyhow::Result;

use crate::frame::Frame;
use crate::hand::HandLandmarks;

/// Hand landmark inference backend.
///
/// Given an RGB frame and a timestamp, returns zero or more detected hands.
/// Callers must pass strictly increasing `timestamp_ms` values across calls;
/// video-mode landmarkers track hands between frames and reject time going
/// backwards or standing still.
pub trait HandLandmarker: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run landmark detection on a frame.
    fn detect(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<Vec<HandLandmarks>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
