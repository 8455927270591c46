mod backend;
mod backends;
mod heuristic;
mod learned;
mod strategy;

pub use backend::HandLandmarker;
pub use backends::{ScriptedLandmarker, StubLandmarker};
pub use heuristic::{HeuristicDetector, DEFAULT_PRESS_MARGIN};
pub use learned::{landmark_features, LearnedDetector, FEATURE_LEN, PRESS_THRESHOLD};
pub use strategy::PressDetector;
