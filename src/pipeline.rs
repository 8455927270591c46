//! Frame-to-event pipeline.
//!
//! Per frame, `HandEventPipeline`:
//! 1. Stamps the frame with a strictly increasing millisecond timestamp
//! 2. Asks the landmarker for hands
//! 3. Runs the press detector on the first hand
//! 4. Drives the five finger state machines, thumb to pinky
//! 5. Optionally appends a training row
//!
//! The same timestamp is used for inference and for event timing, so event
//! start times and durations are on the landmarker's clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::detect::{HandLandmarker, PressDetector};
use crate::frame::Frame;
use crate::hand::FingerStates;
use crate::press::{HandStateMachines, KeyPressEvent};
use crate::training::TrainingLogger;

/// Millisecond time source for a pipeline.
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// Wall-clock anchored, monotonic millisecond clock.
///
/// Reads as Unix milliseconds at construction and then advances with
/// `Instant`, so system clock adjustments never move it backwards.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    origin_unix_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let origin_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            origin_unix_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin_unix_ms
            .saturating_add(self.origin.elapsed().as_millis() as u64)
    }
}

/// Hand-driven clock for tests and offline replay. Clones share one time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Output of one `process` call.
#[derive(Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub timestamp_ms: u64,
    pub hands_detected: usize,
    /// Detector output for the analysed hand, if one was seen.
    pub states: Option<FingerStates>,
    /// Released presses, in finger order.
    pub events: Vec<KeyPressEvent>,
}

pub struct HandEventPipeline {
    landmarker: Box<dyn HandLandmarker>,
    detector: PressDetector,
    machines: HandStateMachines,
    clock: Box<dyn Clock>,
    training: Option<TrainingLogger>,
    last_timestamp_ms: Option<u64>,
    frames_processed: u64,
}

impl HandEventPipeline {
    pub fn new(landmarker: Box<dyn HandLandmarker>, detector: PressDetector) -> Self {
        Self {
            landmarker,
            detector,
            machines: HandStateMachines::new(),
            clock: Box::new(MonotonicClock::new()),
            training: None,
            last_timestamp_ms: None,
            frames_processed: 0,
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_training_log(mut self, logger: TrainingLogger) -> Self {
        self.training = Some(logger);
        self
    }

    pub fn landmarker_name(&self) -> &'static str {
        self.landmarker.name()
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn machines(&self) -> &HandStateMachines {
        &self.machines
    }

    /// Process one frame. Never fails: inference and training-log errors are
    /// logged and the frame is treated as having no hand / no row.
    pub fn process(&mut self, frame: Frame) -> ProcessedFrame {
        let timestamp_ms = self.next_timestamp();
        self.frames_processed += 1;

        let hands = match self.landmarker.detect(&frame, timestamp_ms) {
            Ok(hands) => hands,
            Err(err) => {
                log::warn!(
                    "landmarker {} failed at {}ms: {:#}",
                    self.landmarker.name(),
                    timestamp_ms,
                    err
                );
                Vec::new()
            }
        };

        let Some(hand) = hands.first() else {
            return ProcessedFrame {
                frame,
                timestamp_ms,
                hands_detected: 0,
                states: None,
                events: Vec::new(),
            };
        };
        if hands.len() > 1 {
            log::debug!(
                "{} hands reported; tracking the first only",
                hands.len()
            );
        }

        let states = self.detector.detect(hand, frame.shape());
        let events = self.machines.update(states.0, timestamp_ms);

        if let Some(logger) = self.training.as_mut() {
            if let Err(err) = logger.log(timestamp_ms, hand, states) {
                log::warn!("training log write failed: {:#}", err);
            }
        }

        ProcessedFrame {
            frame,
            timestamp_ms,
            hands_detected: hands.len(),
            states: Some(states),
            events,
        }
    }

    fn next_timestamp(&mut self) -> u64 {
        let now = self.clock.now_ms();
        let timestamp = match self.last_timestamp_ms {
            Some(prev) => now.max(prev.saturating_add(1)),
            None => now,
        };
        self.last_timestamp_ms = Some(timestamp);
        timestamp
    }
}
