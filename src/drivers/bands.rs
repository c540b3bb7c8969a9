use ndarray::ArrayView2;
use crate::drivers::buffer::{largest_power_of_two_at_most, nearest_power_of_two};
use crate::drivers::fft::{band_power, psd_welch, WindowFunction};
use crate::drivers::filter::eeg_conditioning;
use crate::drivers::SignalError;
/// Bands of the average band-power feature vector: delta, theta, alpha, beta, gamma.
pub const FEATURE_BANDS_HZ: [(f64, f64); 5] = [
    (2.0, 4.0),
    (4.0, 8.0),
    (8.0, 13.0),
    (13.0, 30.0),
    (30.0, 45.0),
];
/// Length of `BandPowerFeatures::feature_vector`.
pub const FEATURE_VECTOR_LEN: usize = 2 * FEATURE_BANDS_HZ.len();
pub const THETA_HZ: (f64, f64) = (3.0, 7.0);
pub const ALPHA_HZ: (f64, f64) = (8.0, 13.0);
pub const BETA_HZ: (f64, f64) = (14.0, 30.0);
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetrendKind {
    Constant,
    Linear,
}
/// Removes the mean or the least-squares line from a series in place.
pub fn detrend(series: &mut [f64], kind: DetrendKind) {
    let n = series.len();
    if n == 0 {
        return;
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    match kind {
        DetrendKind::Constant => series.iter_mut().for_each(|v| *v -= mean),
        DetrendKind::Linear => {
            let x_mean = (n - 1) as f64 / 2.0;
            let (mut sxy, mut sxx) = (0.0, 0.0);
            for (i, v) in series.iter().enumerate() {
                let dx = i as f64 - x_mean;
                sxy += dx * (v - mean);
                sxx += dx * dx;
            }
            let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
            for (i, v) in series.iter_mut().enumerate() {
                *v -= mean + slope * (i as f64 - x_mean);
            }
        }
    }
}
/// Welch segment length used for band powers: the power of two nearest the
/// sampling rate, capped by the available window.
pub fn welch_nfft(sample_rate_hz: f64, available: usize) -> usize {
    let preferred = nearest_power_of_two(sample_rate_hz.round().max(2.0) as usize);
    preferred.min(largest_power_of_two_at_most(available))
}
/// Theta/alpha/beta power averaged over the classified channels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandSummary {
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
}
pub fn concentration_bands(
    data: ArrayView2<'_, f64>,
    channels: &[usize],
    sample_rate_hz: f64,
) -> Result<BandSummary, SignalError> {
    let mut summary = BandSummary::default();
    if channels.is_empty() {
        return Ok(summary);
    }
    let nfft = welch_nfft(sample_rate_hz, data.ncols());
    for &row in channels {
        let mut series = channel_series(data, row)?;
        detrend(&mut series, DetrendKind::Linear);
        let spectrum = psd_welch(
            &series,
            nfft,
            nfft / 2,
            sample_rate_hz,
            WindowFunction::BlackmanHarris,
        )?;
        summary.theta += band_power(&spectrum, THETA_HZ.0, THETA_HZ.1)?;
        summary.alpha += band_power(&spectrum, ALPHA_HZ.0, ALPHA_HZ.1)?;
        summary.beta += band_power(&spectrum, BETA_HZ.0, BETA_HZ.1)?;
    }
    let count = channels.len() as f64;
    summary.theta /= count;
    summary.alpha /= count;
    summary.beta /= count;
    Ok(summary)
}
/// Relative band powers averaged over channels, plus their spread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BandPowerFeatures {
    pub avg: [f64; 5],
    pub std: [f64; 5],
}
impl BandPowerFeatures {
    /// Input of the concentration models: the five averages, then the five deviations.
    pub fn feature_vector(&self) -> Vec<f64> {
        self.avg.iter().chain(&self.std).copied().collect()
    }
}
/// Per channel: optional conditioning filters, Welch PSD (Hanning, 50% overlap),
/// the five feature band powers normalized to sum to one. Then mean and
/// population standard deviation across channels.
pub fn avg_band_powers(
    data: ArrayView2<'_, f64>,
    channels: &[usize],
    sample_rate_hz: f64,
    apply_filter: bool,
) -> Result<BandPowerFeatures, SignalError> {
    if sample_rate_hz <= 0.0 {
        return Err(SignalError::InvalidSampleRate);
    }
    if channels.is_empty() {
        return Err(SignalError::ChannelMismatch {
            expected: 1,
            actual: 0,
        });
    }
    let nfft = welch_nfft(sample_rate_hz, data.ncols());
    let mut per_channel = Vec::with_capacity(channels.len());
    for &row in channels {
        let mut series = channel_series(data, row)?;
        if apply_filter {
            detrend(&mut series, DetrendKind::Constant);
            eeg_conditioning(sample_rate_hz).process_in_place(&mut series);
        }
        let spectrum = psd_welch(&series, nfft, nfft / 2, sample_rate_hz, WindowFunction::Hanning)?;
        let mut powers = [0.0; 5];
        for (slot, (low, high)) in powers.iter_mut().zip(FEATURE_BANDS_HZ) {
            *slot = band_power(&spectrum, low, high)?;
        }
        let total: f64 = powers.iter().sum();
        if total > 0.0 {
            powers.iter_mut().for_each(|p| *p /= total);
        }
        per_channel.push(powers);
    }
    let count = per_channel.len() as f64;
    let mut features = BandPowerFeatures::default();
    for band in 0..5 {
        let mean = per_channel.iter().map(|p| p[band]).sum::<f64>() / count;
        let variance = per_channel
            .iter()
            .map(|p| (p[band] - mean).powi(2))
            .sum::<f64>()
            / count;
        features.avg[band] = mean;
        features.std[band] = variance.sqrt();
    }
    Ok(features)
}
fn channel_series(data: ArrayView2<'_, f64>, row: usize) -> Result<Vec<f64>, SignalError> {
    if row >= data.nrows() {
        return Err(SignalError::ChannelOutOfRange {
            channel: row,
            rows: data.nrows(),
        });
    }
    Ok(data.row(row).to_vec())
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;
    fn tone_rows(freqs: &[f64], sample_rate_hz: f64, len: usize) -> Array2<f64> {
        Array2::from_shape_fn((freqs.len(), len), |(r, c)| {
            10.0 * (2.0 * PI * freqs[r] * c as f64 / sample_rate_hz).sin()
        })
    }
    #[test]
    fn linear_detrend_removes_a_line() {
        let mut series: Vec<f64> = (0..50).map(|i| 3.0 + 0.5 * i as f64).collect();
        detrend(&mut series, DetrendKind::Linear);
        assert!(series.iter().all(|v| v.abs() < 1e-9));
    }
    #[test]
    fn constant_detrend_zeroes_the_mean() {
        let mut series = vec![1.0, 2.0, 3.0, 10.0];
        detrend(&mut series, DetrendKind::Constant);
        assert!(series.iter().sum::<f64>().abs() < 1e-12);
    }
    #[test]
    fn nfft_follows_sampling_rate_and_window() {
        assert_eq!(welch_nfft(250.0, 1024), 256);
        assert_eq!(welch_nfft(250.0, 200), 128);
        assert_eq!(welch_nfft(500.0, 1024), 512);
    }
    #[test]
    fn alpha_tone_dominates_summary() {
        let data = tone_rows(&[10.0; 8], 250.0, 1024);
        let channels: Vec<usize> = (0..8).collect();
        let summary = concentration_bands(data.view(), &channels, 250.0).unwrap();
        assert!(summary.alpha > 10.0 * summary.theta);
        assert!(summary.alpha > 10.0 * summary.beta);
    }
    #[test]
    fn relative_band_powers_sum_to_one() {
        let data = tone_rows(&[6.0, 10.0, 20.0], 250.0, 1024);
        let features = avg_band_powers(data.view(), &[0, 1, 2], 250.0, true).unwrap();
        let total: f64 = features.avg.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(features.std.iter().any(|s| *s > 0.1));
    }
    #[test]
    fn feature_vector_is_averages_then_deviations() {
        let data = tone_rows(&[10.0; 8], 250.0, 1024);
        let channels: Vec<usize> = (0..8).collect();
        let features = avg_band_powers(data.view(), &channels, 250.0, true).unwrap();
        let vector = features.feature_vector();
        assert_eq!(vector.len(), FEATURE_VECTOR_LEN);
        assert_eq!(&vector[..5], &features.avg[..]);
        assert_eq!(&vector[5..], &features.std[..]);
    }
    #[test]
    fn unknown_channel_is_rejected() {
        let data = tone_rows(&[10.0], 250.0, 512);
        assert!(matches!(
            avg_band_powers(data.view(), &[3], 250.0, false),
            Err(SignalError::ChannelOutOfRange { channel: 3, rows: 1 })
        ));
    }
}
