//! Pianist
//!
//! Turns a stream of camera frames and per-frame hand landmarks into finger
//! key-press events.
//!
//! # Architecture
//!
//! - `ingest`: frame sources (reconnecting camera, recorded file, JPEG directory)
//! - `detect`: landmark inference seam and the per-finger press detectors
//! - `press`: per-finger press state machines and `KeyPressEvent`
//! - `pipeline`: per-frame orchestration with a single monotonic clock
//! - `persist`: background JPEG writer
//! - `training`: CSV export of landmarks and press labels
//! - `telemetry` / `api`: shared status snapshot served over HTTP
//! - `runtime`: the outer frame loop
//!
//! # Features
//!
//! Real capture and decoding need system libraries and are opt-in:
//!
//! - `ingest-v4l2`: live cameras (`--input-type camera`)
//! - `ingest-file-ffmpeg`: recorded video files (`--input-type video`)
//! - `backend-tract`: ONNX press classifier for the learned detector
//!
//! Without them only JPEG directories and `stub://` sources are available;
//! opening a camera or video file fails at startup with an error naming the
//! missing feature.

pub mod api;
pub mod config;
pub mod detect;
pub mod frame;
pub mod hand;
pub mod ingest;
pub mod persist;
pub mod pipeline;
pub mod press;
pub mod runtime;
pub mod telemetry;
pub mod training;

pub use api::{ApiConfig, ApiHandle, TelemetryServer};
pub use config::{DetectorKind, PianistConfig};
pub use detect::{
    HandLandmarker, HeuristicDetector, LearnedDetector, PressDetector, ScriptedLandmarker,
    StubLandmarker,
};
pub use frame::{Frame, FrameShape};
pub use hand::{Finger, FingerStates, HandLandmarks, Landmark};
pub use ingest::{
    open_source, CameraConfig, CameraSource, FileConfig, FileSource, FrameSource,
    ImageDirSource, SourceConfig, SourceKind,
};
pub use persist::{FrameWriter, WriterStats};
pub use pipeline::{Clock, HandEventPipeline, ManualClock, MonotonicClock, ProcessedFrame};
pub use press::{FingerStateMachine, HandStateMachines, KeyPressEvent, PressState};
pub use runtime::{run, FpsCounter, RunSummary};
pub use telemetry::{PipelineStatus, Telemetry, TelemetrySnapshot};
pub use training::TrainingLogger;
