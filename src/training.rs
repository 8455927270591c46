//! Training-data export.
//!
//! `TrainingLogger` appends one CSV row per analysed hand: the raw landmarks,
//! the tip/knuckle heights the heuristic compares, and the pressed flags the
//! active detector produced. The rows are the training set for a learned
//! press classifier.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::hand::{Finger, FingerStates, HandLandmarks, LANDMARK_COUNT};

pub struct TrainingLogger {
    path: Option<PathBuf>,
    writer: Box<dyn Write + Send>,
    rows: u64,
}

impl TrainingLogger {
    /// Create `training_data_<unix-ms>.csv` under `dir` and write the header.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create training log directory {}", dir.display()))?;
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let path = dir.join(format!("training_data_{}.csv", stamp));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("create training log {}", path.display()))?;
        let mut logger = Self::from_writer(BufWriter::new(file))?;
        logger.path = Some(path);
        if let Some(path) = &logger.path {
            log::info!("training log: {}", path.display());
        }
        Ok(logger)
    }

    /// Log into an arbitrary writer. The header is written immediately.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Result<Self> {
        let mut writer: Box<dyn Write + Send> = Box::new(writer);
        writeln!(writer, "{}", header()).context("write training log header")?;
        writer.flush().context("flush training log header")?;
        Ok(Self {
            path: None,
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one row. Each row is flushed so a crash loses at most the row in flight.
    pub fn log(
        &mut self,
        timestamp_ms: u64,
        hand: &HandLandmarks,
        states: FingerStates,
    ) -> Result<()> {
        let row = format_row(timestamp_ms, hand, states);
        writeln!(self.writer, "{}", row).context("append training row")?;
        self.writer.flush().context("flush training row")?;
        self.rows += 1;
        Ok(())
    }
}

/// CSV header shared by every training log.
pub fn header() -> String {
    let mut columns = Vec::with_capacity(1 + LANDMARK_COUNT * 3 + 15);
    columns.push("timestamp_ms".to_string());
    for i in 0..LANDMARK_COUNT {
        for axis in ["x", "y", "z"] {
            columns.push(format!("lm_{}_{}", i, axis));
        }
    }
    for finger in Finger::ALL {
        columns.push(format!("{}_tip_y", finger.name()));
        columns.push(format!("{}_mcp_y", finger.name()));
    }
    for finger in Finger::ALL {
        columns.push(format!("{}_pressed", finger.name()));
    }
    columns.join(",")
}

fn format_row(timestamp_ms: u64, hand: &HandLandmarks, states: FingerStates) -> String {
    let mut row = timestamp_ms.to_string();
    for point in &hand.points {
        let _ = write!(row, ",{},{},{}", point.x, point.y, point.z);
    }
    for finger in Finger::ALL {
        let _ = write!(row, ",{},{}", hand.tip(finger).y, hand.knuckle(finger).y);
    }
    for (_, pressed) in states.iter() {
        let _ = write!(row, ",{}", u8::from(pressed));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::Landmark;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn header_has_expected_columns() {
        let header = header();
        let columns: Vec<&str> = header.split(',').collect();
        assert_eq!(columns.len(), 1 + 63 + 10 + 5);
        assert_eq!(columns[0], "timestamp_ms");
        assert_eq!(columns[1], "lm_0_x");
        assert_eq!(columns[63], "lm_20_z");
        assert_eq!(columns[64], "Thumb_tip_y");
        assert_eq!(columns[65], "Thumb_mcp_y");
        assert_eq!(columns[74], "Thumb_pressed");
        assert_eq!(columns[78], "Pinky_pressed");
    }

    #[test]
    fn rows_match_header_width() -> Result<()> {
        let buf = SharedBuf::default();
        let mut logger = TrainingLogger::from_writer(buf.clone())?;
        let hand = HandLandmarks::new([Landmark::new(0.25, 0.5, 0.0); LANDMARK_COUNT]);
        logger.log(1234, &hand, FingerStates([true, false, false, false, true]))?;
        assert_eq!(logger.rows(), 1);

        let text = String::from_utf8(buf.0.lock().unwrap().clone())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let cells: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cells.len(), lines[0].split(',').count());
        assert_eq!(cells[0], "1234");
        assert_eq!(&cells[74..], &["1", "0", "0", "0", "1"]);
        Ok(())
    }

    #[test]
    fn creates_timestamped_file_with_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let logger = TrainingLogger::create(&dir.path().join("nested"))?;
        let path = logger.path().expect("file path").to_path_buf();
        drop(logger);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("training_data_") && name.ends_with(".csv"));
        let contents = fs::read_to_string(&path)?;
        assert_eq!(contents.lines().next(), Some(header().as_str()));
        Ok(())
    }
}
