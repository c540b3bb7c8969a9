use std::f64::consts::PI;
use ndarray::ArrayView2;
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::drivers::SignalError;
/// Taper applied to each analysis window before the FFT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowFunction {
    #[cfg(test)]
    Rectangular,
    Hanning,
    BlackmanHarris,
}
impl WindowFunction {
    pub fn coefficients(self, len: usize) -> Vec<f64> {
        if len <= 1 {
            return vec![1.0; len];
        }
        let denom = (len - 1) as f64;
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / denom;
                match self {
                    #[cfg(test)]
                    WindowFunction::Rectangular => 1.0,
                    WindowFunction::Hanning => 0.5 - 0.5 * phase.cos(),
                    WindowFunction::BlackmanHarris => {
                        0.35875 - 0.48829 * phase.cos() + 0.14128 * (2.0 * phase).cos()
                            - 0.01168 * (3.0 * phase).cos()
                    }
                }
            })
            .collect()
    }
}
/// One-sided power spectral density of a single series.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    pub frequencies_hz: Vec<f64>,
    pub power: Vec<f64>,
}
impl PowerSpectrum {
    pub fn resolution_hz(&self) -> f64 {
        match self.frequencies_hz.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }
}
pub fn psd(
    samples: &[f64],
    sample_rate_hz: f64,
    window: WindowFunction,
) -> Result<PowerSpectrum, SignalError> {
    if sample_rate_hz <= 0.0 {
        return Err(SignalError::InvalidSampleRate);
    }
    if samples.len() < 2 {
        return Err(SignalError::TooShort {
            needed: 2,
            actual: samples.len(),
        });
    }
    let mut planner = FftPlanner::<f64>::new();
    Ok(periodogram(&mut planner, samples, sample_rate_hz, window))
}
/// Welch estimate: average of overlapping periodograms of `nfft` samples.
pub fn psd_welch(
    samples: &[f64],
    nfft: usize,
    overlap: usize,
    sample_rate_hz: f64,
    window: WindowFunction,
) -> Result<PowerSpectrum, SignalError> {
    if sample_rate_hz <= 0.0 {
        return Err(SignalError::InvalidSampleRate);
    }
    if nfft < 2 || samples.len() < nfft {
        return Err(SignalError::TooShort {
            needed: nfft.max(2),
            actual: samples.len(),
        });
    }
    let step = nfft.saturating_sub(overlap).max(1);
    let mut planner = FftPlanner::<f64>::new();
    let mut sum: Option<PowerSpectrum> = None;
    let mut segments = 0usize;
    let mut start = 0;
    while start + nfft <= samples.len() {
        let segment = periodogram(
            &mut planner,
            &samples[start..start + nfft],
            sample_rate_hz,
            window,
        );
        match sum.as_mut() {
            None => sum = Some(segment),
            Some(acc) => {
                for (total, p) in acc.power.iter_mut().zip(&segment.power) {
                    *total += p;
                }
            }
        }
        segments += 1;
        start += step;
    }
    let mut spectrum = sum.ok_or(SignalError::TooShort {
        needed: nfft,
        actual: samples.len(),
    })?;
    for p in &mut spectrum.power {
        *p /= segments as f64;
    }
    Ok(spectrum)
}
fn periodogram(
    planner: &mut FftPlanner<f64>,
    samples: &[f64],
    sample_rate_hz: f64,
    window: WindowFunction,
) -> PowerSpectrum {
    let n = samples.len();
    let taper = window.coefficients(n);
    let taper_energy: f64 = taper.iter().map(|w| w * w).sum();
    let mut buffer: Vec<Complex64> = samples
        .iter()
        .zip(&taper)
        .map(|(x, w)| Complex64::new(x * w, 0.0))
        .collect();
    planner.plan_fft_forward(n).process(&mut buffer);
    let bins = n / 2 + 1;
    let scale = 1.0 / (sample_rate_hz * taper_energy);
    let power = buffer
        .iter()
        .take(bins)
        .enumerate()
        .map(|(k, c)| {
            let p = c.norm_sqr() * scale;
            // Fold the negative frequencies; DC and (for even n) Nyquist have no mirror.
            let mirrored = k != 0 && !(n % 2 == 0 && k == n / 2);
            if mirrored {
                2.0 * p
            } else {
                p
            }
        })
        .collect();
    let frequencies_hz = (0..bins)
        .map(|k| k as f64 * sample_rate_hz / n as f64)
        .collect();
    PowerSpectrum {
        frequencies_hz,
        power,
    }
}
/// Integrates the spectrum between `low_hz` and `high_hz` (inclusive) with the trapezoid rule.
pub fn band_power(spectrum: &PowerSpectrum, low_hz: f64, high_hz: f64) -> Result<f64, SignalError> {
    let bins: Vec<usize> = spectrum
        .frequencies_hz
        .iter()
        .enumerate()
        .filter(|(_, f)| **f >= low_hz && **f <= high_hz)
        .map(|(i, _)| i)
        .collect();
    let df = spectrum.resolution_hz();
    match bins.as_slice() {
        [] => Err(SignalError::BandOutOfRange { low_hz, high_hz }),
        [only] => Ok(spectrum.power[*only] * df),
        _ => Ok(bins
            .windows(2)
            .map(|pair| 0.5 * (spectrum.power[pair[0]] + spectrum.power[pair[1]]) * df)
            .sum()),
    }
}
/// Per-channel spectra sharing one frequency axis, ready to plot.
#[derive(Clone, Debug, Default)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<Vec<f64>>, // channel -> bins
    pub channel_labels: Vec<String>,
}
/// Computes a PSD for each selected row of a buffer window.
pub struct SpectrumBuilder {
    window: WindowFunction,
}
impl SpectrumBuilder {
    pub fn with_window(window: WindowFunction) -> Self {
        Self { window }
    }
    pub fn compute(
        &self,
        data: ArrayView2<'_, f64>,
        channels: &[usize],
        sample_rate_hz: f64,
    ) -> Result<FrequencySpectrum, SignalError> {
        let mut spectrum = FrequencySpectrum {
            sample_rate_hz,
            ..Default::default()
        };
        for (display_idx, &row) in channels.iter().enumerate() {
            if row >= data.nrows() {
                return Err(SignalError::ChannelOutOfRange {
                    channel: row,
                    rows: data.nrows(),
                });
            }
            let series = data.row(row).to_vec();
            let channel_psd = psd(&series, sample_rate_hz, self.window)?;
            if spectrum.frequencies_hz.is_empty() {
                spectrum.frequencies_hz = channel_psd.frequencies_hz;
            }
            spectrum.magnitudes.push(channel_psd.power);
            spectrum.channel_labels.push(format!("Channel{}", display_idx + 1));
        }
        Ok(spectrum)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sine(freq_hz: f64, sample_rate_hz: f64, len: usize, amp: f64) -> Vec<f64> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect()
    }
    #[test]
    fn rectangular_psd_preserves_signal_power() {
        let signal: Vec<f64> = sine(12.0, 256.0, 512, 3.0)
            .iter()
            .zip(sine(40.0, 256.0, 512, 1.0))
            .map(|(a, b)| a + b + 0.5)
            .collect();
        let spectrum = psd(&signal, 256.0, WindowFunction::Rectangular).unwrap();
        let integrated: f64 = spectrum.power.iter().sum::<f64>() * spectrum.resolution_hz();
        let mean_square = signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64;
        assert!((integrated - mean_square).abs() < 1e-9);
    }
    #[test]
    fn psd_peak_sits_on_the_tone() {
        let signal = sine(10.0, 256.0, 1024, 1.0);
        let spectrum = psd(&signal, 256.0, WindowFunction::BlackmanHarris).unwrap();
        assert_eq!(spectrum.frequencies_hz.len(), 513);
        let peak = spectrum
            .power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| spectrum.frequencies_hz[i])
            .unwrap();
        assert!((peak - 10.0).abs() < 0.5);
    }
    #[test]
    fn welch_band_power_prefers_the_active_band() {
        let signal = sine(10.0, 250.0, 1024, 5.0);
        let spectrum = psd_welch(&signal, 256, 128, 250.0, WindowFunction::Hanning).unwrap();
        let alpha = band_power(&spectrum, 8.0, 13.0).unwrap();
        let beta = band_power(&spectrum, 14.0, 30.0).unwrap();
        assert!(alpha > 100.0 * beta);
    }
    #[test]
    fn welch_rejects_short_input() {
        let err = psd_welch(&[0.0; 100], 256, 128, 250.0, WindowFunction::Hanning).unwrap_err();
        assert!(matches!(err, SignalError::TooShort { needed: 256, actual: 100 }));
    }
    #[test]
    fn band_outside_spectrum_is_an_error() {
        let spectrum = psd(&[1.0; 64], 64.0, WindowFunction::Hanning).unwrap();
        assert!(band_power(&spectrum, 40.0, 50.0).is_err());
    }
}
