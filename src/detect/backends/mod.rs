pub mod scripted;
pub mod stub;

pub use scripted::ScriptedLandmarker;
pub use stub::StubLandmarker;
