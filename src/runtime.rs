//! The outer frame loop.
//!
//! Pulls items from a `FrameSource`, runs each frame through the
//! `HandEventPipeline`, hands the processed frame to the optional
//! `FrameWriter` and refreshes telemetry. Everything runs on the calling
//! thread; the writer and the telemetry listener are the only background
//! workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::ingest::FrameSource;
use crate::persist::{FrameWriter, WriterStats};
use crate::pipeline::HandEventPipeline;
use crate::press::KeyPressEvent;
use crate::telemetry::Telemetry;

/// Minimum span over which a frame rate is measured.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frames-per-second over windows of at least `FPS_WINDOW`.
///
/// The reported value holds between windows and starts at zero.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames_in_window: u32,
    current: f64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: None,
            frames_in_window: 0,
            current: 0.0,
        }
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Count one frame seen at `now` and return the current rate.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let start = *self.window_start.get_or_insert(now);
        self.frames_in_window += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= FPS_WINDOW {
            self.current = f64::from(self.frames_in_window) / elapsed.as_secs_f64();
            self.frames_in_window = 0;
            self.window_start = Some(now);
        }
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// What a finished run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub frames_processed: u64,
    /// Items the source delivered without a frame (camera disconnected).
    pub frames_missing: u64,
    /// Key presses released during the run.
    pub events: u64,
    pub last_index: Option<u64>,
    pub writer: Option<WriterStats>,
    /// True when the loop ended on the stop flag rather than end of sequence.
    pub stopped: bool,
}

/// Drive `source` through `pipeline` until the sequence ends, `stop` is set,
/// or `max_frames` frames have been processed.
///
/// Released key presses are handed to `on_event` as they happen and are not
/// retained. The stop flag is checked between frames, so the frame in hand
/// always finishes. The writer, if any, is drained before returning.
pub fn run<S, F>(
    source: &mut S,
    pipeline: &mut HandEventPipeline,
    writer: Option<&FrameWriter>,
    telemetry: &Telemetry,
    stop: &AtomicBool,
    max_frames: Option<u64>,
    mut on_event: F,
) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    F: FnMut(KeyPressEvent),
{
    source
        .rewind()
        .with_context(|| format!("start {} source", source.name()))?;
    log::info!(
        "running: source={} landmarker={} detector={}",
        source.name(),
        pipeline.landmarker_name(),
        pipeline.detector_name()
    );

    let mut summary = RunSummary::default();
    let mut fps = FpsCounter::new();

    loop {
        if stop.load(Ordering::SeqCst) {
            log::info!("stop requested");
            summary.stopped = true;
            break;
        }
        if max_frames.is_some_and(|max| summary.frames_processed >= max) {
            log::info!("frame limit reached");
            break;
        }
        let Some((index, frame)) = source.next_item() else {
            log::info!("end of {} sequence", source.name());
            break;
        };
        summary.last_index = Some(index);
        let Some(frame) = frame else {
            summary.frames_missing += 1;
            continue;
        };

        let processed = pipeline.process(frame);
        summary.frames_processed += 1;
        telemetry.update(fps.tick(), processed.hands_detected);
        if let Some(writer) = writer {
            writer.write(&processed.frame, None);
        }
        for event in processed.events {
            summary.events += 1;
            on_event(event);
        }
    }

    if let Some(writer) = writer {
        summary.writer = Some(writer.stop()?);
    }
    log::info!(
        "run finished: frames={} missing={} events={}",
        summary.frames_processed,
        summary.frames_missing,
        summary.events
    );
    Ok(summary)
}
