//! Live camera source with reconnection.
//!
//! A camera can disappear at any time (USB unplugged, driver reset). The
//! source treats that as routine: it drops the device, reports `None` frames,
//! and reopens the device once per backoff interval until it comes back. It
//! never ends the sequence on its own.
//!
//! Device settings (size, frame rate, pixel format) are applied by the opener
//! on every open, because a fresh device handle starts from driver defaults.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceItem};
use crate::frame::Frame;

pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://name` for a synthetic camera.
    pub device: String,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Requested frame rate.
    pub target_fps: u32,
    /// Wait between reopen attempts.
    pub reconnect_backoff: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 1920,
            height: 1080,
            target_fps: 30,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }
}

/// An open camera handle.
pub trait CaptureDevice: Send {
    /// Block until the next frame is available.
    fn read(&mut self) -> Result<Frame>;

    /// Negotiated frame size.
    fn resolution(&self) -> (u32, u32);

    /// Negotiated frame rate, if the driver reports one.
    fn fps(&self) -> Option<f64>;
}

/// Opens (and configures) a capture device.
pub trait DeviceOpener: Send {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn CaptureDevice>>;
}

enum Link {
    Disconnected {
        /// When the last open attempt failed or the device was lost.
        since: Option<Instant>,
    },
    Connected(Box<dyn CaptureDevice>),
}

/// Reconnecting camera source.
pub struct CameraSource {
    config: CameraConfig,
    opener: Box<dyn DeviceOpener>,
    link: Link,
    next_index: u64,
    started: bool,
    connects: u64,
    last_resolution: Option<(u32, u32)>,
    last_fps: Option<f64>,
}

impl CameraSource {
    /// Camera for `config.device`: synthetic for `stub://`, V4L2 otherwise.
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self::with_opener(config, SyntheticOpener::default()));
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self::with_opener(config, super::v4l2::V4l2Opener))
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera ingestion of {} requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Camera backed by a custom opener.
    pub fn with_opener<O: DeviceOpener + 'static>(config: CameraConfig, opener: O) -> Self {
        Self {
            config,
            opener: Box::new(opener),
            link: Link::Disconnected { since: None },
            next_index: 0,
            started: false,
            connects: 0,
            last_resolution: None,
            last_fps: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    /// Number of successful opens so far.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    fn capture(&mut self) -> Option<Frame> {
        if let Link::Disconnected { since } = self.link {
            if let Some(since) = since {
                let wait = self.config.reconnect_backoff.saturating_sub(since.elapsed());
                if !wait.is_zero() {
                    std::thread::sleep(wait);
                }
            }
            match self.opener.open(&self.config) {
                Ok(device) => {
                    self.connects += 1;
                    self.last_resolution = Some(device.resolution());
                    self.last_fps = device.fps();
                    log::info!(
                        "CameraSource: connected to {} ({}x{})",
                        self.config.device,
                        device.resolution().0,
                        device.resolution().1
                    );
                    self.link = Link::Connected(device);
                }
                Err(err) => {
                    log::warn!(
                        "CameraSource: cannot open {}: {:#}; retrying in {:?}",
                        self.config.device,
                        err,
                        self.config.reconnect_backoff
                    );
                    self.link = Link::Disconnected {
                        since: Some(Instant::now()),
                    };
                    return None;
                }
            }
        }

        let Link::Connected(device) = &mut self.link else {
            return None;
        };
        match device.read() {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!(
                    "CameraSource: lost {}: {:#}; reconnecting",
                    self.config.device,
                    err
                );
                self.link = Link::Disconnected {
                    since: Some(Instant::now()),
                };
                None
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn rewind(&mut self) -> Result<()> {
        if self.started {
            return Err(anyhow!(
                "camera source {} cannot be restarted",
                self.config.device
            ));
        }
        self.started = true;
        Ok(())
    }

    fn next_item(&mut self) -> Option<SourceItem> {
        let frame = self.capture();
        let index = self.next_index;
        self.next_index += 1;
        Some((index, frame))
    }

    fn resolution(&self) -> Result<(u32, u32)> {
        match &self.link {
            Link::Connected(device) => Ok(device.resolution()),
            Link::Disconnected { .. } => Ok(self
                .last_resolution
                .unwrap_or((self.config.width, self.config.height))),
        }
    }

    fn fps(&self) -> Option<f64> {
        match &self.link {
            Link::Connected(device) => device.fps(),
            Link::Disconnected { .. } => self.last_fps,
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and dry runs
// ----------------------------------------------------------------------------

#[derive(Default)]
struct SyntheticOpener;

impl DeviceOpener for SyntheticOpener {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(SyntheticDevice {
            width: config.width,
            height: config.height,
            target_fps: config.target_fps,
            frame_count: 0,
        }))
    }
}

struct SyntheticDevice {
    width: u32,
    height: u32,
    target_fps: u32,
    frame_count: u64,
}

impl CaptureDevice for SyntheticDevice {
    fn read(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let shade = (self.frame_count % 256) as u8;
        Ok(Frame::filled(self.width, self.height, [shade, 128, 255 - shade]))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> Option<f64> {
        Some(f64::from(self.target_fps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 32,
            height: 24,
            target_fps: 15,
            reconnect_backoff: Duration::from_millis(20),
        }
    }

    #[test]
    fn stub_camera_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        let items: Vec<SourceItem> = source.frames()?.take(3).collect();
        assert_eq!(items.len(), 3);
        for (i, (index, frame)) in items.iter().enumerate() {
            assert_eq!(*index, i as u64);
            let frame = frame.as_ref().expect("frame");
            assert_eq!((frame.width, frame.height), (32, 24));
        }
        assert_eq!(source.resolution()?, (32, 24));
        assert_eq!(source.fps(), Some(15.0));
        Ok(())
    }

    #[test]
    fn camera_cannot_be_restarted() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.frames()?.next();
        assert!(source.frames().is_err());
        Ok(())
    }

    #[test]
    fn resolution_falls_back_to_config_before_connect() -> Result<()> {
        let source = CameraSource::new(stub_config())?;
        assert!(!source.is_connected());
        assert_eq!(source.resolution()?, (32, 24));
        Ok(())
    }
}
