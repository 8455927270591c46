//! Asynchronous frame persistence.
//!
//! `FrameWriter` moves JPEG encoding and disk I/O off the acquisition thread.
//! `write` copies the frame into an unbounded FIFO channel and returns; one
//! background worker drains the channel in order and writes each file.
//! `stop` closes the channel and joins the worker, so every frame queued
//! before `stop` reaches disk (or is logged as failed).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use image::ImageFormat;

use crate::frame::Frame;

struct PersistenceTask {
    frame: Frame,
    filename: String,
}

/// Counters for a writer; `written + failed <= queued` at all times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub queued: u64,
    pub written: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
}

struct Inbox {
    sender: Option<Sender<PersistenceTask>>,
    next_sequence: u64,
    queued: u64,
}

pub struct FrameWriter {
    output_dir: PathBuf,
    inbox: Mutex<Inbox>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FrameWriter {
    /// Create the output directory if needed and start the writer thread.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("create output directory {}", output_dir.display()))?;

        let (sender, receiver) = mpsc::channel();
        let counters = Arc::new(Counters::default());
        let worker_dir = output_dir.clone();
        let worker_counters = counters.clone();
        let worker = std::thread::Builder::new()
            .name("frame-writer".to_string())
            .spawn(move || run_writer(receiver, &worker_dir, &worker_counters))
            .context("spawn frame writer thread")?;

        Ok(Self {
            output_dir,
            inbox: Mutex::new(Inbox {
                sender: Some(sender),
                next_sequence: 0,
                queued: 0,
            }),
            counters,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Queue a copy of `frame`. Returns immediately.
    ///
    /// Without a `filename` the frame is named `frame_NNNNN.jpg` from a
    /// counter taken at enqueue time, so names follow submission order.
    /// An explicit `filename` must be a bare `.jpg`/`.jpeg` name; anything
    /// else is logged and dropped. Calls after `stop` are ignored.
    pub fn write(&self, frame: &Frame, filename: Option<&str>) {
        let Ok(mut inbox) = self.inbox.lock() else {
            log::error!("frame writer inbox lock poisoned; dropping frame");
            return;
        };
        let Some(sender) = inbox.sender.clone() else {
            log::debug!("frame writer stopped; ignoring write");
            return;
        };
        let filename = match filename {
            Some(name) => {
                if !is_jpeg_file_name(name) {
                    log::error!(
                        "frame writer: rejected file name {:?} (expected a bare .jpg/.jpeg name)",
                        name
                    );
                    return;
                }
                name.to_string()
            }
            None => {
                let name = sequence_filename(inbox.next_sequence);
                inbox.next_sequence += 1;
                name
            }
        };
        let task = PersistenceTask {
            frame: frame.clone(),
            filename,
        };
        if sender.send(task).is_err() {
            log::error!("frame writer worker is gone; dropping frame");
            return;
        }
        inbox.queued += 1;
    }

    pub fn stats(&self) -> WriterStats {
        let queued = self.inbox.lock().map(|inbox| inbox.queued).unwrap_or(0);
        WriterStats {
            queued,
            written: self.counters.written.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting frames and block until everything queued is written.
    /// Safe to call more than once.
    pub fn stop(&self) -> Result<WriterStats> {
        {
            let mut inbox = self
                .inbox
                .lock()
                .map_err(|_| anyhow!("frame writer inbox lock poisoned"))?;
            inbox.sender = None;
        }
        let join = self
            .worker
            .lock()
            .map_err(|_| anyhow!("frame writer worker lock poisoned"))?
            .take();
        if let Some(join) = join {
            join.join()
                .map_err(|_| anyhow!("frame writer thread panicked"))?;
            let stats = self.stats();
            log::info!(
                "frame writer stopped. queued={} written={} failed={}",
                stats.queued,
                stats.written,
                stats.failed
            );
        }
        Ok(self.stats())
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("frame writer shutdown failed: {:#}", err);
        }
    }
}

/// A plain `.jpg` / `.jpeg` file name with no directory components.
fn is_jpeg_file_name(name: &str) -> bool {
    let path = Path::new(name);
    if name.contains(['/', '\\']) || path.file_name() != Some(OsStr::new(name)) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

/// Auto-generated name for the `sequence`-th unnamed frame.
pub fn sequence_filename(sequence: u64) -> String {
    format!("frame_{:05}.jpg", sequence)
}

fn run_writer(receiver: Receiver<PersistenceTask>, dir: &Path, counters: &Counters) {
    // recv() keeps returning queued tasks after every sender is dropped.
    while let Ok(task) = receiver.recv() {
        let path = dir.join(&task.filename);
        match save_jpeg(&task.frame, &path) {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                log::error!("error writing frame {}: {:#}", path.display(), err);
            }
        }
    }
}

fn save_jpeg(frame: &Frame, path: &Path) -> Result<()> {
    image::save_buffer_with_format(
        path,
        frame.pixels(),
        frame.width,
        frame.height,
        image::ExtendedColorType::Rgb8,
        ImageFormat::Jpeg,
    )
    .with_context(|| format!("encode jpeg {}", path.display()))
}
