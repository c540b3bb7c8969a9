// src/recorder.rs
use anyhow::{Context, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
/// Writes every pulled batch as CSV, one line per sample, one column per board row.
pub struct DataRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    rows: usize,
    samples: u64,
}
impl DataRecorder {
    pub fn new() -> Self {
        Self {
            writer: None,
            path: None,
            rows: 0,
            samples: 0,
        }
    }
    /// Opens `session_<label>_<unix secs>.csv` in `dir`.
    pub fn start(&mut self, dir: &Path, label: &str, rows: usize) -> Result<PathBuf> {
        self.stop()?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = dir.join(format!("session_{label}_{timestamp}.csv"));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(file);
        let header: Vec<String> = (0..rows).map(|r| format!("Row{r}")).collect();
        writeln!(w, "Sample,{}", header.join(","))?;
        self.writer = Some(w);
        self.path = Some(path.clone());
        self.rows = rows;
        self.samples = 0;
        log::info!("recording to {}", path.display());
        Ok(path)
    }
    pub fn stop(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            if let Some(path) = self.path.take() {
                log::info!("saved {} samples to {}", self.samples, path.display());
            }
        }
        Ok(())
    }
    pub fn write_batch(&mut self, batch: &Array2<f64>) -> Result<()> {
        let Some(w) = self.writer.as_mut() else {
            return Ok(());
        };
        for column in batch.columns() {
            write!(w, "{}", self.samples)?;
            for row in 0..self.rows {
                match column.get(row) {
                    Some(v) => write!(w, ",{v:.4}")?,
                    None => write!(w, ",")?,
                }
            }
            writeln!(w)?;
            self.samples += 1;
        }
        Ok(())
    }
    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }
}
impl Default for DataRecorder {
    fn default() -> Self {
        Self::new()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    #[test]
    fn writes_one_line_per_sample() {
        let dir = std::env::temp_dir();
        let mut recorder = DataRecorder::new();
        let path = recorder.start(&dir, "focus test", 2).unwrap();
        assert!(recorder.is_recording());
        recorder
            .write_batch(&arr2(&[[1.0, 2.0, 3.0], [10.0, 20.0, 30.0]]))
            .unwrap();
        recorder.write_batch(&arr2(&[[4.0], [40.0]])).unwrap();
        recorder.stop().unwrap();
        assert!(!recorder.is_recording());
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Sample,Row0,Row1");
        assert_eq!(lines[1], "0,1.0000,10.0000");
        assert_eq!(lines[4], "3,4.0000,40.0000");
        assert_eq!(lines.len(), 5);
        assert!(path.to_string_lossy().contains("session_focus_test_"));
    }
    #[test]
    fn idle_recorder_ignores_batches() {
        let mut recorder = DataRecorder::default();
        recorder.write_batch(&arr2(&[[1.0]])).unwrap();
        recorder.stop().unwrap();
    }
}
