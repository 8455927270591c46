use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use pianist::config::{DetectorKind, PianistConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PIANIST_CONFIG",
        "PIANIST_TELEMETRY_ADDR",
        "PIANIST_OUTPUT_DIR",
        "PIANIST_TRAINING_LOG",
        "PIANIST_RECONNECT_BACKOFF_MS",
        "PIANIST_MODEL_PATH",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PianistConfig::load().expect("load config");
    assert_eq!(cfg.telemetry_addr, "0.0.0.0:5000");
    assert_eq!(cfg.output.dir, PathBuf::from("output_frames"));
    assert!(cfg.output.save_frames);
    assert_eq!((cfg.camera.width, cfg.camera.height), (1920, 1080));
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.camera.reconnect_backoff, Duration::from_millis(1000));
    assert!(!cfg.training.enabled);
    assert_eq!(cfg.training.dir, PathBuf::from("training_data"));
    assert_eq!(cfg.detector.kind, DetectorKind::Heuristic);
    assert!(cfg.detector.model_path.is_none());
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        r#"{
            "telemetry": { "addr": "127.0.0.1:6000" },
            "output": { "dir": "/tmp/pianist_frames", "save_frames": false },
            "camera": {
                "width": 1280,
                "height": 720,
                "target_fps": 60,
                "reconnect_backoff_ms": 250
            },
            "training": { "enabled": false, "dir": "/tmp/pianist_training" },
            "detector": { "kind": "learned", "model_path": "press.onnx" }
        }"#,
    );

    std::env::set_var("PIANIST_CONFIG", file.path());
    std::env::set_var("PIANIST_TELEMETRY_ADDR", "127.0.0.1:7000");
    std::env::set_var("PIANIST_TRAINING_LOG", "true");
    std::env::set_var("PIANIST_RECONNECT_BACKOFF_MS", "500");

    let cfg = PianistConfig::load().expect("load config");

    assert_eq!(cfg.telemetry_addr, "127.0.0.1:7000");
    assert_eq!(cfg.output.dir, PathBuf::from("/tmp/pianist_frames"));
    assert!(!cfg.output.save_frames);
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.camera.target_fps, 60);
    assert_eq!(cfg.camera.reconnect_backoff, Duration::from_millis(500));
    assert!(cfg.training.enabled);
    assert_eq!(cfg.training.dir, PathBuf::from("/tmp/pianist_training"));
    assert_eq!(cfg.detector.kind, DetectorKind::Learned);
    assert_eq!(cfg.detector.model_path, Some(PathBuf::from("press.onnx")));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PIANIST_TELEMETRY_ADDR", "localhost");
    assert!(PianistConfig::load().is_err());
    clear_env();

    std::env::set_var("PIANIST_RECONNECT_BACKOFF_MS", "0");
    assert!(PianistConfig::load().is_err());
    clear_env();

    std::env::set_var("PIANIST_TRAINING_LOG", "sometimes");
    assert!(PianistConfig::load().is_err());
    clear_env();

    let file = config_file(r#"{ "camera": { "width": 0 } }"#);
    std::env::set_var("PIANIST_CONFIG", file.path());
    assert!(PianistConfig::load().is_err());
    clear_env();

    let file = config_file("{ not json");
    std::env::set_var("PIANIST_CONFIG", file.path());
    assert!(PianistConfig::load().is_err());
    clear_env();
}
