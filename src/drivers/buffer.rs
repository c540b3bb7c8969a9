use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use crate::drivers::SignalError;
/// Fixed-width sliding window over every board row (channels x samples).
///
/// The first batch seeds the window; every later batch pushes out as many of the
/// oldest columns as it brings in, so the width never changes once seeded.
pub struct SampleBuffer {
    data: Option<Array2<f64>>,
    width: usize,
    total_samples: u64,
}
impl SampleBuffer {
    pub fn new(width: usize) -> Self {
        Self {
            data: None,
            width: width.max(1),
            total_samples: 0,
        }
    }
    /// Number of samples ingested since the session started.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }
    pub fn data(&self) -> Option<&Array2<f64>> {
        self.data.as_ref()
    }
    pub fn push_batch(&mut self, batch: &Array2<f64>) -> Result<(), SignalError> {
        let added = batch.ncols();
        let next = match self.data.take() {
            None => self.seed(batch)?,
            Some(current) => {
                if batch.nrows() != current.nrows() {
                    let expected = current.nrows();
                    self.data = Some(current);
                    return Err(SignalError::ChannelMismatch {
                        expected,
                        actual: batch.nrows(),
                    });
                }
                if added == 0 {
                    current
                } else if added >= self.width {
                    newest_columns(batch.view(), self.width)
                } else {
                    let joined = concatenate(Axis(1), &[current.view(), batch.view()])?;
                    newest_columns(joined.view(), self.width)
                }
            }
        };
        self.total_samples += added as u64;
        self.data = Some(next);
        Ok(())
    }
    fn seed(&self, batch: &Array2<f64>) -> Result<Array2<f64>, SignalError> {
        if batch.ncols() >= self.width {
            return Ok(newest_columns(batch.view(), self.width));
        }
        let padding = Array2::<f64>::zeros((batch.nrows(), self.width - batch.ncols()));
        Ok(concatenate(Axis(1), &[padding.view(), batch.view()])?)
    }
    pub fn reset(&mut self) {
        self.data = None;
        self.total_samples = 0;
    }
}
fn newest_columns(view: ArrayView2<'_, f64>, width: usize) -> Array2<f64> {
    let start = view.ncols().saturating_sub(width);
    view.slice(s![.., start..]).to_owned()
}
/// Largest power of two that is `<= n` (0 for an empty window).
pub fn largest_power_of_two_at_most(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}
/// Power of two closest to `n`; ties go to the larger one.
pub fn nearest_power_of_two(n: usize) -> usize {
    let lower = largest_power_of_two_at_most(n.max(1));
    let upper = lower << 1;
    if n - lower < upper - n {
        lower
    } else {
        upper
    }
}
/// Newest power-of-two-wide slice of a buffer, the window the spectra are built from.
pub fn power_of_two_suffix(data: &Array2<f64>) -> ArrayView2<'_, f64> {
    let width = largest_power_of_two_at_most(data.ncols());
    data.slice(s![.., data.ncols() - width..])
}
#[cfg(test)]
mod tests {
    use super::*;
    fn ramp(rows: usize, start: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * 10_000 + start + c) as f64)
    }
    #[test]
    fn width_stays_constant_across_ticks() {
        let mut buffer = SampleBuffer::new(1500);
        let mut start = 0;
        for batch_len in [750, 10, 0, 12, 1, 3000, 7] {
            buffer.push_batch(&ramp(4, start, batch_len)).unwrap();
            start += batch_len;
            assert_eq!(buffer.data().unwrap().ncols(), 1500);
        }
        assert_eq!(buffer.total_samples(), start as u64);
    }
    #[test]
    fn short_seed_is_left_padded_with_zeros() {
        let mut buffer = SampleBuffer::new(8);
        buffer.push_batch(&ramp(2, 1, 3)).unwrap();
        let data = buffer.data().unwrap();
        assert_eq!(data.row(0).to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }
    #[test]
    fn append_drops_oldest_columns() {
        let mut buffer = SampleBuffer::new(4);
        buffer.push_batch(&ramp(1, 0, 4)).unwrap();
        buffer.push_batch(&ramp(1, 4, 2)).unwrap();
        assert_eq!(buffer.data().unwrap().row(0).to_vec(), vec![2.0, 3.0, 4.0, 5.0]);
    }
    #[test]
    fn row_mismatch_keeps_previous_window() {
        let mut buffer = SampleBuffer::new(4);
        buffer.push_batch(&ramp(2, 0, 4)).unwrap();
        let err = buffer.push_batch(&ramp(3, 4, 2)).unwrap_err();
        assert!(matches!(err, SignalError::ChannelMismatch { expected: 2, actual: 3 }));
        assert_eq!(buffer.data().unwrap().row(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
    }
    #[test]
    fn power_of_two_selection() {
        assert_eq!(largest_power_of_two_at_most(1500), 1024);
        assert_eq!(largest_power_of_two_at_most(1024), 1024);
        assert_eq!(largest_power_of_two_at_most(1), 1);
        assert_eq!(largest_power_of_two_at_most(0), 0);
        assert_eq!(nearest_power_of_two(250), 256);
        assert_eq!(nearest_power_of_two(200), 256);
        assert_eq!(nearest_power_of_two(150), 128);
        let data = ramp(1, 0, 1500);
        let suffix = power_of_two_suffix(&data);
        assert_eq!(suffix.ncols(), 1024);
        assert_eq!(suffix[[0, 0]], 476.0);
    }
}
