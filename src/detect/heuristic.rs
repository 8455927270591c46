use crate::frame::FrameShape;
use crate::hand::{Finger, FingerStates, HandLandmarks};

/// Default tip-below-knuckle margin in normalized image coordinates.
pub const DEFAULT_PRESS_MARGIN: f32 = 0.02;

/// Geometry heuristic: a finger is pressed when its tip sits lower in the image
/// (larger `y`) than its knuckle by more than `margin`.
///
/// The margin is absolute, so it does not scale with apparent hand size.
/// A hand far from the camera needs a deeper curl to register.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeuristicDetector {
    margin: f32,
}

impl HeuristicDetector {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn detect(&self, hand: &HandLandmarks, _shape: FrameShape) -> FingerStates {
        FingerStates(Finger::ALL.map(|finger| {
            hand.tip(finger).y > hand.knuckle(finger).y + self.margin
        }))
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PRESS_MARGIN)
    }
}
