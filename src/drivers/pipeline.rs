use ndarray::Array2;
use crate::drivers::bands::{avg_band_powers, concentration_bands, BandSummary};
use crate::drivers::buffer::{power_of_two_suffix, SampleBuffer};
use crate::drivers::denoise::{DenoiseMethod, DEFAULT_ROLLING_WINDOW};
use crate::drivers::fft::{FrequencySpectrum, SpectrumBuilder, WindowFunction};
use crate::drivers::source::SampleSource;
use crate::drivers::{PipelineError, SignalError};
/// Channels drawn by the monitors and used for classification.
pub const DISPLAY_CHANNELS: usize = 8;
pub const DEFAULT_WINDOW_WIDTH: usize = 1500;
/// Everything the raw and processed monitors draw for one refresh tick.
#[derive(Clone, Debug)]
pub struct RefreshFrame {
    pub sample_rate_hz: f64,
    /// Sample index of the first column, for a scrolling x axis.
    pub first_sample: u64,
    pub raw: Vec<Vec<f64>>,
    pub processed: Vec<Vec<f64>>,
    pub raw_spectrum: FrequencySpectrum,
    pub processed_spectrum: FrequencySpectrum,
    /// Width of the most recent batch pulled from the board.
    pub batch_len: usize,
}
/// Inputs of one classification tick.
#[derive(Clone, Debug)]
pub struct ConcentrationFeatures {
    pub bands: BandSummary,
    pub feature_vector: Vec<f64>,
}
/// Owns the acquisition session plus the raw and processed buffers.
pub struct SignalPipeline<S: SampleSource> {
    source: S,
    buffer: SampleBuffer,
    processed: Option<Array2<f64>>,
    denoise: Option<DenoiseMethod>,
    rolling_window: usize,
    spectrum: SpectrumBuilder,
    display_channels: Vec<usize>,
    eeg_channels: Vec<usize>,
}
impl<S: SampleSource> SignalPipeline<S> {
    pub fn new(source: S, window_width: usize) -> Self {
        let eeg_channels = source.eeg_channels().to_vec();
        let display_channels: Vec<usize> =
            eeg_channels.iter().copied().take(DISPLAY_CHANNELS).collect();
        if display_channels.len() < DISPLAY_CHANNELS {
            log::warn!(
                "board has {} EEG channels; band summary averages over those instead of {DISPLAY_CHANNELS}",
                display_channels.len()
            );
        }
        Self {
            source,
            buffer: SampleBuffer::new(window_width),
            processed: None,
            denoise: None,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            spectrum: SpectrumBuilder::with_window(WindowFunction::BlackmanHarris),
            display_channels,
            eeg_channels,
        }
    }
    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window.max(1);
        self
    }
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
    pub fn num_rows(&self) -> usize {
        self.source.num_rows()
    }
    #[cfg(test)]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }
    /// `None` restores the rolling-mean fallback.
    pub fn set_denoise(&mut self, method: Option<DenoiseMethod>) {
        self.denoise = method;
    }
    pub fn denoise_method(&self) -> DenoiseMethod {
        self.denoise.unwrap_or(DenoiseMethod::RollingMean {
            window: self.rolling_window,
        })
    }
    #[cfg(test)]
    pub fn refresh(&mut self) -> Result<RefreshFrame, PipelineError> {
        let batch = self.source.pull_all()?;
        self.refresh_with(&batch)
    }
    /// Slides the window by `batch`, denoises, and builds both spectra.
    pub fn refresh_with(&mut self, batch: &Array2<f64>) -> Result<RefreshFrame, PipelineError> {
        self.buffer.push_batch(batch)?;
        let data = self.buffer.data().ok_or(SignalError::BufferUninitialized)?;
        let sample_rate_hz = self.source.sample_rate_hz();
        let raw_spectrum =
            self.spectrum
                .compute(power_of_two_suffix(data), &self.display_channels, sample_rate_hz)?;
        let processed = self.denoise_method().apply_rows(data, &self.eeg_channels)?;
        let processed_spectrum = self.spectrum.compute(
            power_of_two_suffix(&processed),
            &self.display_channels,
            sample_rate_hz,
        )?;
        let frame = RefreshFrame {
            sample_rate_hz,
            first_sample: self.buffer.total_samples().saturating_sub(data.ncols() as u64),
            raw: rows(data, &self.display_channels),
            processed: rows(&processed, &self.display_channels),
            raw_spectrum,
            processed_spectrum,
            batch_len: batch.ncols(),
        };
        self.processed = Some(processed);
        Ok(frame)
    }
    /// Band summary and feature vector from the newest power-of-two window of the
    /// processed buffer; `None` until the first refresh has run.
    pub fn concentration_features(&self) -> Result<Option<ConcentrationFeatures>, SignalError> {
        let Some(processed) = self.processed.as_ref() else {
            return Ok(None);
        };
        let sample_rate_hz = self.source.sample_rate_hz();
        let window = power_of_two_suffix(processed);
        let bands = concentration_bands(window, &self.display_channels, sample_rate_hz)?;
        let features = avg_band_powers(processed.view(), &self.eeg_channels, sample_rate_hz, true)?;
        Ok(Some(ConcentrationFeatures {
            bands,
            feature_vector: features.feature_vector(),
        }))
    }
    /// Stops streaming and releases the session.
    pub fn shutdown(&mut self) -> Result<(), PipelineError> {
        let stopped = self.source.stop_stream();
        self.source.release()?;
        self.buffer.reset();
        self.processed = None;
        stopped?;
        Ok(())
    }
}
fn rows(data: &Array2<f64>, channels: &[usize]) -> Vec<Vec<f64>> {
    channels.iter().map(|&row| data.row(row).to_vec()).collect()
}
