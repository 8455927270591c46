use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pianist::ingest::{CameraConfig, CameraSource, CaptureDevice, DeviceOpener, FrameSource};
use pianist::Frame;

const BACKOFF: Duration = Duration::from_millis(40);

fn config() -> CameraConfig {
    CameraConfig {
        device: "/dev/video-test".to_string(),
        width: 16,
        height: 12,
        target_fps: 30,
        reconnect_backoff: BACKOFF,
    }
}

#[derive(Clone, Default)]
struct OpenLog {
    attempts: Arc<Mutex<Vec<(Instant, u32, u32)>>>,
}

impl OpenLog {
    fn record(&self, config: &CameraConfig) {
        self.attempts
            .lock()
            .unwrap()
            .push((Instant::now(), config.width, config.height));
    }

    fn attempts(&self) -> Vec<(Instant, u32, u32)> {
        self.attempts.lock().unwrap().clone()
    }
}

/// Fails the first `failures` opens, then hands out devices that die after
/// `reads_per_device` frames (never, when `None`).
struct FlakyOpener {
    log: OpenLog,
    failures: u32,
    reads_per_device: Option<u32>,
}

impl DeviceOpener for FlakyOpener {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn CaptureDevice>> {
        self.log.record(config);
        if self.failures > 0 {
            self.failures -= 1;
            return Err(anyhow!("device busy"));
        }
        Ok(Box::new(FakeDevice {
            width: config.width,
            height: config.height,
            reads_left: self.reads_per_device,
        }))
    }
}

struct FakeDevice {
    width: u32,
    height: u32,
    reads_left: Option<u32>,
}

impl CaptureDevice for FakeDevice {
    fn read(&mut self) -> Result<Frame> {
        if let Some(left) = self.reads_left.as_mut() {
            if *left == 0 {
                return Err(anyhow!("device unplugged"));
            }
            *left -= 1;
        }
        Ok(Frame::filled(self.width, self.height, [1, 2, 3]))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> Option<f64> {
        Some(30.0)
    }
}

#[test]
fn two_failed_opens_yield_two_empty_items_then_frames() -> Result<()> {
    let log = OpenLog::default();
    let opener = FlakyOpener {
        log: log.clone(),
        failures: 2,
        reads_per_device: None,
    };
    let mut source = CameraSource::with_opener(config(), opener);

    let items: Vec<_> = source.frames()?.take(4).collect();
    assert!(items[0].1.is_none());
    assert!(items[1].1.is_none());
    assert!(items[2].1.is_some());
    assert!(items[3].1.is_some());
    let indices: Vec<u64> = items.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);

    let attempts = log.attempts();
    assert_eq!(attempts.len(), 3);
    for pair in attempts.windows(2) {
        assert!(pair[1].0.duration_since(pair[0].0) >= BACKOFF);
    }
    assert!(source.is_connected());
    assert_eq!(source.connects(), 1);
    Ok(())
}

#[test]
fn read_failure_reconnects_with_same_settings() -> Result<()> {
    let log = OpenLog::default();
    let opener = FlakyOpener {
        log: log.clone(),
        failures: 0,
        reads_per_device: Some(2),
    };
    let mut source = CameraSource::with_opener(config(), opener);

    let items: Vec<_> = source.frames()?.take(4).collect();
    let present: Vec<bool> = items.iter().map(|(_, f)| f.is_some()).collect();
    assert_eq!(present, vec![true, true, false, true]);
    assert_eq!(source.connects(), 2);

    let attempts = log.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1].0.duration_since(attempts[0].0) >= BACKOFF);
    assert!(attempts.iter().all(|&(_, w, h)| (w, h) == (16, 12)));
    Ok(())
}

#[test]
fn disconnected_camera_keeps_reporting_last_known_geometry() -> Result<()> {
    let log = OpenLog::default();
    let opener = FlakyOpener {
        log,
        failures: 0,
        reads_per_device: Some(0),
    };
    let mut source = CameraSource::with_opener(config(), opener);

    let first = source.frames()?.next();
    assert!(matches!(first, Some((0, None))));
    assert!(!source.is_connected());
    assert_eq!(source.resolution()?, (16, 12));
    assert_eq!(source.fps(), Some(30.0));
    Ok(())
}
