use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TELEMETRY_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_OUTPUT_DIR: &str = "output_frames";
const DEFAULT_TRAINING_DIR: &str = "training_data";
const DEFAULT_CAMERA_WIDTH: u32 = 1920;
const DEFAULT_CAMERA_HEIGHT: u32 = 1080;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 1_000;

#[derive(Debug, Deserialize, Default)]
struct PianistConfigFile {
    telemetry: Option<TelemetryConfigFile>,
    output: Option<OutputConfigFile>,
    camera: Option<CameraConfigFile>,
    training: Option<TrainingConfigFile>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TelemetryConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    save_frames: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    reconnect_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TrainingConfigFile {
    enabled: Option<bool>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    kind: Option<DetectorKind>,
    model_path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Heuristic,
    Learned,
}

#[derive(Debug, Clone)]
pub struct PianistConfig {
    pub telemetry_addr: String,
    pub output: OutputSettings,
    pub camera: CameraSettings,
    pub training: TrainingSettings,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub save_frames: bool,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    pub reconnect_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct TrainingSettings {
    pub enabled: bool,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    pub model_path: Option<PathBuf>,
}

impl PianistConfig {
    /// Defaults, then the JSON file named by `PIANIST_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PIANIST_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PianistConfigFile) -> Self {
        let telemetry_addr = file
            .telemetry
            .and_then(|telemetry| telemetry.addr)
            .unwrap_or_else(|| DEFAULT_TELEMETRY_ADDR.to_string());
        let output = OutputSettings {
            dir: file
                .output
                .as_ref()
                .and_then(|output| output.dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            save_frames: file
                .output
                .as_ref()
                .and_then(|output| output.save_frames)
                .unwrap_or(true),
        };
        let camera = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            reconnect_backoff: Duration::from_millis(
                camera
                    .reconnect_backoff_ms
                    .unwrap_or(DEFAULT_RECONNECT_BACKOFF_MS),
            ),
        };
        let training = file.training.unwrap_or_default();
        let training = TrainingSettings {
            enabled: training.enabled.unwrap_or(false),
            dir: training
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRAINING_DIR)),
        };
        let detector = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            kind: detector.kind.unwrap_or_default(),
            model_path: detector.model_path,
        };
        Self {
            telemetry_addr,
            output,
            camera,
            training,
            detector,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PIANIST_TELEMETRY_ADDR") {
            if !addr.trim().is_empty() {
                self.telemetry_addr = addr;
            }
        }
        if let Ok(dir) = std::env::var("PIANIST_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Ok(flag) = std::env::var("PIANIST_TRAINING_LOG") {
            self.training.enabled = parse_flag(&flag)
                .ok_or_else(|| anyhow!("PIANIST_TRAINING_LOG must be 1/0/true/false"))?;
        }
        if let Ok(backoff) = std::env::var("PIANIST_RECONNECT_BACKOFF_MS") {
            let millis: u64 = backoff.parse().map_err(|_| {
                anyhow!("PIANIST_RECONNECT_BACKOFF_MS must be an integer number of milliseconds")
            })?;
            self.camera.reconnect_backoff = Duration::from_millis(millis);
        }
        if let Ok(path) = std::env::var("PIANIST_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.telemetry_addr
            .parse::<SocketAddr>()
            .map_err(|_| anyhow!("invalid telemetry address '{}'", self.telemetry_addr))?;
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.camera.reconnect_backoff.is_zero() {
            return Err(anyhow!("camera reconnect backoff must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<PianistConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
