use thiserror::Error;
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("row count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("channel {channel} is out of range for a buffer with {rows} rows")]
    ChannelOutOfRange { channel: usize, rows: usize },
    #[error("not enough samples: need {needed}, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unknown wavelet '{0}' (expected haar, db1, db2, db3 or db4)")]
    UnknownWavelet(String),
    #[error("decomposition level must be at least 1")]
    InvalidLevel,
    #[error("band {low_hz}-{high_hz} Hz has no bins in the spectrum")]
    BandOutOfRange { low_hz: f64, high_hz: f64 },
    #[error("buffer not initialized yet; feed at least one batch first")]
    BufferUninitialized,
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for SignalError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        SignalError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for SignalError {
    fn from(value: image::ImageError) -> Self {
        SignalError::Plot(value.to_string())
    }
}
/// Failures coming from an acquisition session.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("acquisition I/O failure: {0}")]
    Io(String),
    #[error("session already released")]
    Closed,
}
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
