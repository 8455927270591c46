//! Learned press classifier.
//!
//! Landmarks are flattened into a wrist-relative feature vector and scored by
//! an ONNX model (feature `backend-tract`). Without a model every finger
//! reports "not pressed", so a pipeline configured for the learned detector
//! keeps running before a classifier has been trained.

#[cfg(feature = "backend-tract")]
use std::path::Path;

#[cfg(feature = "backend-tract")]
use anyhow::{anyhow, Context, Result};
#[cfg(feature = "backend-tract")]
use tract_onnx::prelude::*;

use crate::frame::FrameShape;
use crate::hand::{FingerStates, HandLandmarks, LANDMARK_COUNT, WRIST};

/// Length of the feature vector fed to the classifier.
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 3;

/// Score at or above which a finger counts as pressed.
pub const PRESS_THRESHOLD: f32 = 0.5;

/// Wrist-relative landmark coordinates, `[x0, y0, z0, x1, ...]`.
pub fn landmark_features(hand: &HandLandmarks) -> [f32; FEATURE_LEN] {
    let wrist = hand[WRIST];
    let mut features = [0.0f32; FEATURE_LEN];
    for (i, point) in hand.points.iter().enumerate() {
        features[i * 3] = point.x - wrist.x;
        features[i * 3 + 1] = point.y - wrist.y;
        features[i * 3 + 2] = point.z - wrist.z;
    }
    features
}

#[derive(Default)]
pub struct LearnedDetector {
    #[cfg(feature = "backend-tract")]
    model: Option<TractClassifier>,
}

impl LearnedDetector {
    /// Detector with no model; always reports no presses.
    pub fn untrained() -> Self {
        Self::default()
    }

    #[cfg(feature = "backend-tract")]
    pub fn from_onnx<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Ok(Self {
            model: Some(TractClassifier::load(model_path.as_ref())?),
        })
    }

    pub fn has_model(&self) -> bool {
        #[cfg(feature = "backend-tract")]
        {
            self.model.is_some()
        }
        #[cfg(not(feature = "backend-tract"))]
        {
            false
        }
    }

    pub fn detect(&self, hand: &HandLandmarks, _shape: FrameShape) -> FingerStates {
        #[cfg(feature = "backend-tract")]
        if let Some(model) = &self.model {
            return match model.classify(&landmark_features(hand)) {
                Ok(states) => states,
                Err(err) => {
                    log::warn!("learned detector inference failed: {:#}", err);
                    FingerStates::NONE
                }
            };
        }
        let _ = hand;
        FingerStates::NONE
    }
}

impl std::fmt::Debug for LearnedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedDetector")
            .field("has_model", &self.has_model())
            .finish()
    }
}

#[cfg(feature = "backend-tract")]
struct TractClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

#[cfg(feature = "backend-tract")]
impl TractClassifier {
    fn load(model_path: &Path) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_LEN)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;
        log::info!("learned detector loaded {}", model_path.display());
        Ok(Self { model })
    }

    fn classify(&self, features: &[f32; FEATURE_LEN]) -> Result<FingerStates> {
        let input = tract_ndarray::Array2::from_shape_vec((1, FEATURE_LEN), features.to_vec())
            .context("build feature tensor")?;
        let outputs = self
            .model
            .run(tvec!(input.into_tensor().into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let scores: Vec<f32> = scores.iter().copied().collect();
        if scores.len() != 5 {
            return Err(anyhow!("expected 5 finger scores, received {}", scores.len()));
        }
        let mut pressed = [false; 5];
        for (slot, score) in pressed.iter_mut().zip(scores) {
            *slot = score.is_finite() && score >= PRESS_THRESHOLD;
        }
        Ok(FingerStates(pressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::Landmark;

    #[test]
    fn untrained_detector_reports_no_presses() {
        let detector = LearnedDetector::untrained();
        let mut points = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        for tip in crate::hand::FINGER_TIPS {
            points[tip].y = 0.9;
        }
        let hand = HandLandmarks::new(points);
        assert!(!detector.has_model());
        assert_eq!(
            detector.detect(&hand, FrameShape::new(640, 480)),
            FingerStates::NONE
        );
    }

    #[test]
    fn features_are_wrist_relative() {
        let mut points = [Landmark::new(0.0, 0.0, 0.0); LANDMARK_COUNT];
        points[WRIST] = Landmark::new(0.4, 0.8, 0.1);
        points[8] = Landmark::new(0.5, 0.3, 0.1);
        let features = landmark_features(&HandLandmarks::new(points));
        assert_eq!(&features[..3], &[0.0, 0.0, 0.0]);
        assert!((features[24] - 0.1).abs() < 1e-6);
        assert!((features[25] + 0.5).abs() < 1e-6);
        assert!(features[26].abs() < 1e-6);
    }
}
