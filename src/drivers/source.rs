use std::f64::consts::PI;
use std::time::Instant;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::SourceError;
/// An acquisition session that hands out everything recorded since the last pull.
///
/// Batches are shaped `(rows, samples)`: every board row, not only EEG.
pub trait SampleSource {
    fn sample_rate_hz(&self) -> f64;
    /// Board rows holding EEG channels, in display order.
    fn eeg_channels(&self) -> &[usize];
    fn num_rows(&self) -> usize;
    fn start_stream(&mut self) -> Result<(), SourceError>;
    fn stop_stream(&mut self) -> Result<(), SourceError>;
    fn pull_all(&mut self) -> Result<Array2<f64>, SourceError>;
    fn release(&mut self) -> Result<(), SourceError>;
}
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn sample_rate_hz(&self) -> f64 {
        (**self).sample_rate_hz()
    }
    fn eeg_channels(&self) -> &[usize] {
        (**self).eeg_channels()
    }
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }
    fn start_stream(&mut self) -> Result<(), SourceError> {
        (**self).start_stream()
    }
    fn stop_stream(&mut self) -> Result<(), SourceError> {
        (**self).stop_stream()
    }
    fn pull_all(&mut self) -> Result<Array2<f64>, SourceError> {
        (**self).pull_all()
    }
    fn release(&mut self) -> Result<(), SourceError> {
        (**self).release()
    }
}
#[cfg(test)]
pub use manual::ManualSource;
#[cfg(test)]
mod manual {
    use super::*;
    use std::collections::VecDeque;
    /// In-memory source useful for tests and deterministic playback.
    pub struct ManualSource {
        queue: VecDeque<Array2<f64>>,
        eeg_channels: Vec<usize>,
        num_rows: usize,
        sample_rate_hz: f64,
    }
    impl ManualSource {
        pub fn new(
            sample_rate_hz: f64,
            eeg_channels: Vec<usize>,
            num_rows: usize,
            batches: impl IntoIterator<Item = Array2<f64>>,
        ) -> Self {
            Self {
                queue: batches.into_iter().collect(),
                eeg_channels,
                num_rows,
                sample_rate_hz,
            }
        }
    }
    impl SampleSource for ManualSource {
        fn sample_rate_hz(&self) -> f64 {
            self.sample_rate_hz
        }
        fn eeg_channels(&self) -> &[usize] {
            &self.eeg_channels
        }
        fn num_rows(&self) -> usize {
            self.num_rows
        }
        fn start_stream(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
        fn stop_stream(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
        fn pull_all(&mut self) -> Result<Array2<f64>, SourceError> {
            Ok(self
                .queue
                .pop_front()
                .unwrap_or_else(|| Array2::zeros((self.num_rows, 0))))
        }
        fn release(&mut self) -> Result<(), SourceError> {
            self.queue.clear();
            Ok(())
        }
    }
}
pub const SYNTHETIC_SAMPLE_RATE_HZ: f64 = 250.0;
const SYNTHETIC_EEG_CHANNELS: usize = 8;
// package number, 8 EEG rows, 3 accelerometer rows, timestamp
const SYNTHETIC_ROWS: usize = 13;
/// Simulated 8-channel board: per-channel alpha/beta mix, slow drift and noise,
/// produced in real time while streaming.
pub struct SyntheticSource {
    eeg_channels: Vec<usize>,
    rng: StdRng,
    streaming_since: Option<Instant>,
    emitted: u64,
    released: bool,
}
impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
    fn with_rng(rng: StdRng) -> Self {
        Self {
            eeg_channels: (1..=SYNTHETIC_EEG_CHANNELS).collect(),
            rng,
            streaming_since: None,
            emitted: 0,
            released: false,
        }
    }
    /// Produces the next `count` samples regardless of wall-clock time.
    pub fn generate(&mut self, count: usize) -> Array2<f64> {
        let mut batch = Array2::zeros((SYNTHETIC_ROWS, count));
        for col in 0..count {
            let index = self.emitted + col as u64;
            let t = index as f64 / SYNTHETIC_SAMPLE_RATE_HZ;
            batch[[0, col]] = (index % 256) as f64;
            // alternate between attentive (beta-heavy) and relaxed (alpha-heavy) stretches
            let focus = 0.5 + 0.5 * (2.0 * PI * t / 20.0).sin();
            for (ch, &row) in self.eeg_channels.iter().enumerate() {
                let phase = ch as f64 * 0.7;
                let alpha = (1.0 - focus) * 20.0 * (2.0 * PI * 10.0 * t + phase).sin();
                let beta = focus * 12.0 * (2.0 * PI * 21.0 * t + phase).sin();
                let drift = 5.0 * (2.0 * PI * 0.3 * t).sin();
                batch[[row, col]] = alpha + beta + drift + self.rng.gen_range(-4.0..4.0);
            }
            for row in SYNTHETIC_EEG_CHANNELS + 1..SYNTHETIC_ROWS - 1 {
                batch[[row, col]] = self.rng.gen_range(-0.02..0.02);
            }
            batch[[SYNTHETIC_ROWS - 1, col]] = t;
        }
        self.emitted += count as u64;
        batch
    }
}
impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}
impl SampleSource for SyntheticSource {
    fn sample_rate_hz(&self) -> f64 {
        SYNTHETIC_SAMPLE_RATE_HZ
    }
    fn eeg_channels(&self) -> &[usize] {
        &self.eeg_channels
    }
    fn num_rows(&self) -> usize {
        SYNTHETIC_ROWS
    }
    fn start_stream(&mut self) -> Result<(), SourceError> {
        if self.released {
            return Err(SourceError::Closed);
        }
        if self.streaming_since.is_none() {
            self.streaming_since = Some(Instant::now());
            self.emitted = 0;
        }
        Ok(())
    }
    fn stop_stream(&mut self) -> Result<(), SourceError> {
        self.streaming_since = None;
        Ok(())
    }
    fn pull_all(&mut self) -> Result<Array2<f64>, SourceError> {
        if self.released {
            return Err(SourceError::Closed);
        }
        let Some(since) = self.streaming_since else {
            return Ok(Array2::zeros((SYNTHETIC_ROWS, 0)));
        };
        let due = (since.elapsed().as_secs_f64() * SYNTHETIC_SAMPLE_RATE_HZ) as u64;
        let count = due.saturating_sub(self.emitted) as usize;
        Ok(self.generate(count))
    }
    fn release(&mut self) -> Result<(), SourceError> {
        self.streaming_since = None;
        self.released = true;
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn synthetic_batches_have_board_shape() {
        let mut source = SyntheticSource::with_seed(1);
        let batch = source.generate(250);
        assert_eq!(batch.dim(), (13, 250));
        assert_eq!(batch[[0, 3]], 3.0);
        assert!((batch[[12, 249]] - 249.0 / 250.0).abs() < 1e-12);
        let next = source.generate(1);
        assert_eq!(next[[0, 0]], 250.0 % 256.0);
    }
    #[test]
    fn synthetic_source_is_empty_until_started() {
        let mut source = SyntheticSource::with_seed(2);
        assert_eq!(source.pull_all().unwrap().ncols(), 0);
        source.release().unwrap();
        assert!(matches!(source.start_stream(), Err(SourceError::Closed)));
        assert!(matches!(source.pull_all(), Err(SourceError::Closed)));
    }
    #[test]
    fn manual_source_drains_then_returns_empty_batches() {
        let mut source = ManualSource::new(250.0, vec![0], 2, vec![Array2::ones((2, 3))]);
        assert_eq!(source.pull_all().unwrap().ncols(), 3);
        assert_eq!(source.pull_all().unwrap().dim(), (2, 0));
    }
}
