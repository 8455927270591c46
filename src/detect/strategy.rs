use crate::frame::FrameShape;
use crate::hand::{FingerStates, HandLandmarks};

use super::heuristic::HeuristicDetector;
use super::learned::LearnedDetector;

/// Press-detection strategy, chosen once when the pipeline is built.
///
/// `detect` is deterministic: the same landmarks always give the same states.
#[derive(Debug)]
pub enum PressDetector {
    Heuristic(HeuristicDetector),
    Learned(LearnedDetector),
}

impl PressDetector {
    pub fn heuristic() -> Self {
        PressDetector::Heuristic(HeuristicDetector::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            PressDetector::Heuristic(_) => "heuristic",
            PressDetector::Learned(_) => "learned",
        }
    }

    pub fn detect(&self, hand: &HandLandmarks, shape: FrameShape) -> FingerStates {
        match self {
            PressDetector::Heuristic(detector) => detector.detect(hand, shape),
            PressDetector::Learned(detector) => detector.detect(hand, shape),
        }
    }
}

impl Default for PressDetector {
    fn default() -> Self {
        Self::heuristic()
    }
}
