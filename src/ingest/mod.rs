//! Frame ingestion sources.
//!
//! This module provides three sources of frames:
//! - Live camera with automatic reconnection (`CameraSource`)
//! - Recorded video file (`FileSource`, real decoding behind `ingest-file-ffmpeg`)
//! - Directory of still JPEG images (`ImageDirSource`)
//!
//! Every source yields `(index, Option<Frame>)` items. `None` in the frame slot
//! means "no frame right now" (a disconnected camera) and is not the end of the
//! sequence; the iterator ending is. Camera sources never end on their own.
//!
//! Paths beginning with `stub://` select deterministic synthetic backends for
//! tests and dry runs.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod images;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use std::path::Path;

use anyhow::{anyhow, Result};

pub use camera::{CameraConfig, CameraSource, CaptureDevice, DeviceOpener};
pub use file::{FileConfig, FileSource};
pub use images::ImageDirSource;

use crate::frame::Frame;

/// One item of a source's sequence.
pub type SourceItem = (u64, Option<Frame>);

pub trait FrameSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// Position the source at the start of its sequence.
    ///
    /// File and directory sources can be rewound any number of times. A
    /// camera owns one device for its lifetime and can only be started once.
    fn rewind(&mut self) -> Result<()>;

    /// Next item, or `None` once a finite source is exhausted.
    fn next_item(&mut self) -> Option<SourceItem>;

    /// Frame size in pixels.
    fn resolution(&self) -> Result<(u32, u32)>;

    /// Nominal frame rate, when the source knows it.
    fn fps(&self) -> Option<f64>;

    /// Start (or restart) the sequence and iterate over it.
    fn frames(&mut self) -> Result<Frames<'_, Self>>
    where
        Self: Sized,
    {
        self.rewind()?;
        Ok(Frames { source: self })
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn next_item(&mut self) -> Option<SourceItem> {
        (**self).next_item()
    }

    fn resolution(&self) -> Result<(u32, u32)> {
        (**self).resolution()
    }

    fn fps(&self) -> Option<f64> {
        (**self).fps()
    }
}

/// Iterator over a started source.
pub struct Frames<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<S: FrameSource + ?Sized> Iterator for Frames<'_, S> {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        self.source.next_item()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    Video,
    Jpeg,
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "camera" => Ok(SourceKind::Camera),
            "video" => Ok(SourceKind::Video),
            "jpeg" => Ok(SourceKind::Jpeg),
            other => Err(anyhow!(
                "unknown input type '{}'; expected camera, video or jpeg",
                other
            )),
        }
    }
}

/// What to open: kind plus path (camera index or device, file, or directory).
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: String,
    /// Device settings, used by camera sources only.
    pub camera: CameraConfig,
}

/// Open the configured source.
///
/// This is the only place a source problem is fatal: a missing file or
/// directory fails here, before the pipeline starts. A camera that cannot be
/// opened yet is not an error; it starts disconnected and keeps retrying.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    log::info!("initializing source: {:?} -> {}", config.kind, config.path);
    match config.kind {
        SourceKind::Camera => {
            let camera = CameraConfig {
                device: camera_device_path(&config.path),
                ..config.camera.clone()
            };
            Ok(Box::new(CameraSource::new(camera)?))
        }
        SourceKind::Video => Ok(Box::new(FileSource::new(FileConfig {
            path: config.path.clone(),
            ..FileConfig::default()
        })?)),
        SourceKind::Jpeg => Ok(Box::new(ImageDirSource::new(Path::new(&config.path))?)),
    }
}

/// Map a bare camera index ("0") to its device node; anything else is used as given.
pub fn camera_device_path(path: &str) -> String {
    let trimmed = path.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("/dev/video{}", trimmed)
    } else {
        trimmed.to_string()
    }
}
