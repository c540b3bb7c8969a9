// src/drivers/mod.rs
pub mod bands;
pub mod buffer;
pub mod denoise;
pub mod error;
pub mod fft;
pub mod filter;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use bands::BandSummary;
pub use denoise::DenoiseMethod;
pub use error::{PipelineError, SignalError, SourceError};
pub use fft::FrequencySpectrum;
pub use pipeline::{RefreshFrame, SignalPipeline};
pub use plot::{render_spectrum_png, render_waveform_png, PlotStyle};
pub use source::{SampleSource, SyntheticSource};
