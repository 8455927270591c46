//! Recorded video file source.
//!
//! Decodes a local video file front to back (feature `ingest-file-ffmpeg`).
//! The sequence is finite and ends at end of file or on the first decode
//! error. Rewinding reopens the file. `stub://` paths produce a short
//! synthetic clip instead.

use std::path::Path;

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceItem};
#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path, or `stub://name` for a synthetic clip.
    pub path: String,
    /// Length of the synthetic clip.
    pub stub_frames: u64,
    /// Synthetic clip frame width.
    pub stub_width: u32,
    /// Synthetic clip frame height.
    pub stub_height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            stub_frames: 30,
            stub_width: 64,
            stub_height: 48,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
    next_index: u64,
}

enum FileBackend {
    Synthetic(SyntheticClip),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let backend = if config.path.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticClip::new(config))
        } else {
            open_decoder(&config)?
        };
        Ok(Self {
            backend,
            next_index: 0,
        })
    }

    fn next_frame(&mut self) -> Option<Frame> {
        match &mut self.backend {
            FileBackend::Synthetic(clip) => clip.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => match source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("FileSource: decode stopped: {:#}", err);
                    None
                }
            },
        }
    }
}

impl FrameSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn rewind(&mut self) -> Result<()> {
        self.next_index = 0;
        match &mut self.backend {
            FileBackend::Synthetic(clip) => {
                clip.emitted = 0;
                Ok(())
            }
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.reopen(),
        }
    }

    fn next_item(&mut self) -> Option<SourceItem> {
        let frame = self.next_frame()?;
        let index = self.next_index;
        self.next_index += 1;
        Some((index, Some(frame)))
    }

    fn resolution(&self) -> Result<(u32, u32)> {
        match &self.backend {
            FileBackend::Synthetic(clip) => {
                Ok((clip.config.stub_width, clip.config.stub_height))
            }
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => Ok(source.resolution()),
        }
    }

    fn fps(&self) -> Option<f64> {
        match &self.backend {
            FileBackend::Synthetic(_) => Some(30.0),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.fps(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic clip (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticClip {
    config: FileConfig,
    emitted: u64,
}

impl SyntheticClip {
    fn new(config: FileConfig) -> Self {
        log::info!("FileSource: opened {} (synthetic)", config.path);
        Self { config, emitted: 0 }
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.emitted >= self.config.stub_frames {
            return None;
        }
        self.emitted += 1;
        let shade = (self.emitted * 8 % 256) as u8;
        Some(Frame::filled(
            self.config.stub_width,
            self.config.stub_height,
            [shade, shade, shade],
        ))
    }
}

fn open_decoder(config: &FileConfig) -> Result<FileBackend> {
    if !Path::new(&config.path).is_file() {
        return Err(anyhow!("video file not found: {}", config.path));
    }
    #[cfg(feature = "ingest-file-ffmpeg")]
    {
        Ok(FileBackend::Ffmpeg(FfmpegFileSource::open(&config.path)?))
    }
    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    {
        Err(anyhow!(
            "file ingestion requires the ingest-file-ffmpeg feature"
        ))
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(frames: u64) -> FileConfig {
        FileConfig {
            path: "stub://clip".to_string(),
            stub_frames: frames,
            ..FileConfig::default()
        }
    }

    #[test]
    fn synthetic_clip_is_finite_and_indexed() -> Result<()> {
        let mut source = FileSource::new(stub_config(4))?;
        let items: Vec<SourceItem> = source.frames()?.collect();
        assert!(items.iter().all(|(_, frame)| frame.is_some()));
        let indices: Vec<u64> = items.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn rewind_restarts_sequence() -> Result<()> {
        let mut source = FileSource::new(stub_config(3))?;
        assert_eq!(source.frames()?.count(), 3);
        assert_eq!(source.frames()?.count(), 3);
        Ok(())
    }

    #[test]
    fn rejects_urls_and_empty_paths() {
        for path in ["", "  ", "http://example.com/clip.mp4", "rtsp://cam/stream"] {
            let config = FileConfig {
                path: path.to_string(),
                ..FileConfig::default()
            };
            assert!(FileSource::new(config).is_err(), "{path:?}");
        }
    }

    #[test]
    fn missing_file_is_fatal() {
        let config = FileConfig {
            path: "/definitely/not/here.mp4".to_string(),
            ..FileConfig::default()
        };
        assert!(FileSource::new(config).is_err());
    }
}
