use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::detect::backend::HandLandmarker;
use crate::frame::Frame;
use crate::hand::HandLandmarks;

/// Landmarker that replays a fixed script, one entry per `detect` call.
///
/// Each script entry holds the hands "seen" on that frame. Once the script is
/// exhausted every further call reports no hands. The timestamp contract of
/// `HandLandmarker` is enforced the same way a video-mode model would.
#[derive(Debug, Default)]
pub struct ScriptedLandmarker {
    script: Vec<Vec<HandLandmarks>>,
    cursor: usize,
    last_timestamp_ms: Option<u64>,
}

impl ScriptedLandmarker {
    pub fn new(script: Vec<Vec<HandLandmarks>>) -> Self {
        Self {
            script,
            cursor: 0,
            last_timestamp_ms: None,
        }
    }

    /// Load a script from JSON: an array of frames, each an array of hands,
    /// each an array of 21 `{ "x", "y", "z" }` points.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read landmark script {}", path.display()))?;
        let script: Vec<Vec<HandLandmarks>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid landmark script {}", path.display()))?;
        log::info!(
            "loaded landmark script {} ({} frames)",
            path.display(),
            script.len()
        );
        Ok(Self::new(script))
    }

    pub fn remaining(&self) -> usize {
        self.script.len().saturating_sub(self.cursor)
    }
}

impl HandLandmarker for ScriptedLandmarker {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame, timestamp_ms: u64) -> Result<Vec<HandLandmarks>> {
        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms <= last {
                return Err(anyhow!(
                    "timestamp {}ms is not after previous {}ms",
                    timestamp_ms,
                    last
                ));
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);

        let hands = self.script.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        Ok(hands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Landmark, LANDMARK_COUNT};

    fn hand() -> HandLandmarks {
        HandLandmarks::new([Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT])
    }

    #[test]
    fn replays_script_then_reports_no_hands() -> Result<()> {
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        let mut landmarker = ScriptedLandmarker::new(vec![vec![hand()], vec![]]);
        assert_eq!(landmarker.detect(&frame, 1)?.len(), 1);
        assert_eq!(landmarker.detect(&frame, 2)?.len(), 0);
        assert_eq!(landmarker.detect(&frame, 3)?.len(), 0);
        assert_eq!(landmarker.remaining(), 0);
        Ok(())
    }

    #[test]
    fn rejects_non_increasing_timestamps() -> Result<()> {
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        let mut landmarker = ScriptedLandmarker::new(vec![]);
        landmarker.detect(&frame, 5)?;
        assert!(landmarker.detect(&frame, 5).is_err());
        assert!(landmarker.detect(&frame, 4).is_err());
        Ok(())
    }

    #[test]
    fn loads_script_from_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("script.json");
        std::fs::write(&path, serde_json::to_string(&vec![vec![hand()], vec![]])?)?;
        let landmarker = ScriptedLandmarker::from_json_file(&path)?;
        assert_eq!(landmarker.remaining(), 2);
        Ok(())
    }
}
