//! Still-image directory source.
//!
//! The directory is listed once, at construction: every `.jpg` / `.jpeg` file
//! (any case), sorted by path. Files that fail to decode are skipped without
//! ending the sequence, and a skipped file's index is not reused.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceItem};
use crate::frame::Frame;

/// Nominal rate reported for image sequences.
pub const IMAGE_SEQUENCE_FPS: f64 = 30.0;

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn new(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!("directory not found: {}", dir.display()));
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("list image directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_jpeg(&path) {
                files.push(path);
            }
        }
        files.sort();
        log::info!(
            "ImageDirSource: {} images in {}",
            files.len(),
            dir.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &'static str {
        "images"
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next_item(&mut self) -> Option<SourceItem> {
        while self.cursor < self.files.len() {
            let index = self.cursor;
            self.cursor += 1;
            match load_frame(&self.files[index]) {
                Ok(frame) => return Some((index as u64, Some(frame))),
                Err(err) => log::debug!("skipping {}: {:#}", self.files[index].display(), err),
            }
        }
        None
    }

    fn resolution(&self) -> Result<(u32, u32)> {
        self.files
            .iter()
            .find_map(|path| load_frame(path).ok())
            .map(|frame| (frame.width, frame.height))
            .ok_or_else(|| {
                anyhow!(
                    "no readable images in {} to determine resolution",
                    self.dir.display()
                )
            })
    }

    fn fps(&self) -> Option<f64> {
        Some(IMAGE_SEQUENCE_FPS)
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path).with_context(|| format!("decode {}", path.display()))?;
    Ok(Frame::from(image.to_rgb8()))
}
