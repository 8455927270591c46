//! Shared runtime telemetry.
//!
//! `Telemetry` is a cloneable handle to one mutex-guarded record. The main
//! loop writes it once per frame; the HTTP listener reads it. Readers always
//! get a complete copy taken under the lock.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Initializing,
    Running,
}

/// Point-in-time copy of the telemetry record, in its wire shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub status: PipelineStatus,
    pub current_fps: f64,
    pub hands_detected: usize,
    pub uptime_seconds: f64,
}

#[derive(Debug)]
struct TelemetryState {
    status: PipelineStatus,
    fps: f64,
    hands_detected: usize,
}

#[derive(Clone, Debug)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
    started_at: Instant,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TelemetryState {
                status: PipelineStatus::Initializing,
                fps: 0.0,
                hands_detected: 0,
            })),
            started_at: Instant::now(),
        }
    }

    /// Record the latest measurements and mark the pipeline running.
    pub fn update(&self, fps: f64, hands_detected: usize) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.fps = fps;
        state.hands_detected = hands_detected;
        state.status = PipelineStatus::Running;
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        TelemetrySnapshot {
            status: state.status,
            current_fps: round2(state.fps),
            hands_detected: state.hands_detected,
            uptime_seconds: round2(self.started_at.elapsed().as_secs_f64()),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_initializing() {
        let telemetry = Telemetry::new();
        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.status, PipelineStatus::Initializing);
        assert_eq!(snapshot.current_fps, 0.0);
        assert_eq!(snapshot.hands_detected, 0);
    }

    #[test]
    fn update_marks_running() {
        let telemetry = Telemetry::new();
        telemetry.update(30.0, 0);
        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.status, PipelineStatus::Running);
        assert_eq!(snapshot.current_fps, 30.0);
        assert_eq!(snapshot.hands_detected, 0);
    }

    #[test]
    fn fps_is_rounded_to_two_decimals() {
        let telemetry = Telemetry::new();
        telemetry.update(29.97654, 1);
        assert_eq!(telemetry.snapshot().current_fps, 29.98);
    }

    #[test]
    fn uptime_never_decreases() {
        let telemetry = Telemetry::new();
        let mut last = telemetry.snapshot().uptime_seconds;
        for _ in 0..50 {
            let now = telemetry.snapshot().uptime_seconds;
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn clones_share_state_across_threads() {
        let telemetry = Telemetry::new();
        let writer = telemetry.clone();
        std::thread::spawn(move || {
            for i in 0..100 {
                writer.update(i as f64, i);
            }
        })
        .join()
        .unwrap();
        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.current_fps, 99.0);
        assert_eq!(snapshot.hands_detected, 99);
    }

    #[test]
    fn serializes_to_wire_shape() {
        let value = serde_json::to_value(Telemetry::new().snapshot()).unwrap();
        assert_eq!(value["status"], "initializing");
        assert!(value.get("current_fps").is_some());
        assert!(value.get("hands_detected").is_some());
        assert!(value.get("uptime_seconds").is_some());
    }
}
