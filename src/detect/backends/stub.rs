use anyhow::Result;

use crate::detect::backend::HandLandmarker;
use crate::frame::Frame;
use crate::hand::HandLandmarks;

/// Landmarker that never sees a hand. Used when no inference backend is wired in.
#[derive(Debug, Default)]
pub struct StubLandmarker {
    calls: u64,
}

impl StubLandmarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl HandLandmarker for StubLandmarker {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame, _timestamp_ms: u64) -> Result<Vec<HandLandmarks>> {
        self.calls += 1;
        Ok(Vec::new())
    }
}
