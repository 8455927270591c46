//! pianist - finger key-press detection from a camera, video file, or JPEG directory.
//!
//! Frames flow through the hand event pipeline; released presses are logged,
//! processed frames are written to disk in the background, and a telemetry
//! endpoint reports status while the loop runs.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pianist::{
    api::{ApiConfig, TelemetryServer},
    config::{DetectorKind, PianistConfig},
    detect::{HandLandmarker, LearnedDetector, PressDetector, ScriptedLandmarker, StubLandmarker},
    ingest::{open_source, CameraConfig, SourceConfig, SourceKind},
    FrameWriter, HandEventPipeline, Telemetry, TrainingLogger,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect finger key presses from hand landmarks in a video stream"
)]
struct Args {
    /// Source type: camera, video, or jpeg. Camera needs the ingest-v4l2
    /// feature and video needs ingest-file-ffmpeg; jpeg and stub:// paths
    /// always work.
    #[arg(long, default_value = "camera")]
    input_type: SourceKind,

    /// Camera index or device path, video file, or JPEG directory.
    #[arg(long, default_value = "0")]
    input_path: String,

    /// Directory for processed frames (overrides config).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not write processed frames to disk.
    #[arg(long)]
    no_save: bool,

    /// Export landmarks and press labels as CSV training data.
    #[arg(long)]
    training_log: bool,

    /// Replay hand landmarks from a JSON script instead of a live model.
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// ONNX press classifier; selects the learned detector.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Telemetry listen address (overrides config).
    #[arg(long)]
    telemetry_addr: Option<String>,

    /// Stop after this many processed frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = PianistConfig::load()?;

    let source_cfg = SourceConfig {
        kind: args.input_type,
        path: args.input_path.clone(),
        camera: CameraConfig {
            width: cfg.camera.width,
            height: cfg.camera.height,
            target_fps: cfg.camera.target_fps,
            reconnect_backoff: cfg.camera.reconnect_backoff,
            ..CameraConfig::default()
        },
    };
    let mut source = open_source(&source_cfg)?;

    let mut landmarker: Box<dyn HandLandmarker> = match &args.landmarks {
        Some(path) => Box::new(ScriptedLandmarker::from_json_file(path)?),
        None => {
            log::warn!("no landmark model attached; every frame reports no hands");
            Box::new(StubLandmarker::new())
        }
    };
    landmarker.warm_up()?;
    let model_path = args.model.clone().or(cfg.detector.model_path.clone());
    let detector = build_detector(cfg.detector.kind, model_path)?;

    let mut pipeline = HandEventPipeline::new(landmarker, detector);
    if args.training_log || cfg.training.enabled {
        pipeline = pipeline.with_training_log(TrainingLogger::create(&cfg.training.dir)?);
    }

    let writer = if args.no_save || !cfg.output.save_frames {
        None
    } else {
        let dir = args.output_dir.clone().unwrap_or(cfg.output.dir.clone());
        let writer = FrameWriter::new(&dir)?;
        log::info!("saving processed frames to {}", dir.display());
        Some(writer)
    };

    let telemetry = Telemetry::new();
    let api_config = ApiConfig {
        addr: args
            .telemetry_addr
            .clone()
            .unwrap_or(cfg.telemetry_addr.clone()),
    };
    let api_handle = TelemetryServer::new(api_config, telemetry.clone()).spawn()?;
    log::info!("telemetry listening on http://{}/health", api_handle.addr);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let summary = pianist::run(
        &mut source,
        &mut pipeline,
        writer.as_ref(),
        &telemetry,
        &stop,
        args.max_frames,
        |_event| {},
    )?;
    log::info!(
        "pianist finished: {} frames, {} key presses",
        summary.frames_processed,
        summary.events
    );

    api_handle.stop()?;
    Ok(())
}

fn build_detector(kind: DetectorKind, model_path: Option<PathBuf>) -> Result<PressDetector> {
    match (kind, model_path) {
        (DetectorKind::Heuristic, None) => Ok(PressDetector::heuristic()),
        (_, Some(path)) => load_learned(path),
        (DetectorKind::Learned, None) => {
            log::warn!("learned detector selected without a model; no presses will be reported");
            Ok(PressDetector::Learned(LearnedDetector::untrained()))
        }
    }
}

#[cfg(feature = "backend-tract")]
fn load_learned(path: PathBuf) -> Result<PressDetector> {
    log::info!("loading press classifier {}", path.display());
    Ok(PressDetector::Learned(LearnedDetector::from_onnx(&path)?))
}

#[cfg(not(feature = "backend-tract"))]
fn load_learned(path: PathBuf) -> Result<PressDetector> {
    log::warn!(
        "model {} ignored: built without the backend-tract feature",
        path.display()
    );
    Ok(PressDetector::Learned(LearnedDetector::untrained()))
}
