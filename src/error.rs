use thiserror::Error;

/// Boxed error returned by a [`PointWriter`](crate::PointWriter).
pub type WriteError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the analysis engine.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("channel count must be positive")]
    InvalidChannels,

    #[error("stream name must not be empty")]
    EmptyStreamName,

    #[error("window size must be positive")]
    InvalidWindow,

    #[error("hop size must be positive")]
    InvalidHop,

    #[error("worker count must be positive")]
    InvalidWorkers,

    #[error("floor dB must not be NaN or +inf (got {0})")]
    InvalidFloor(f64),

    /// Requested more bands than the spectrum has non-negative frequency bins.
    #[error("band count {requested} is invalid, must be between 1 and {available}")]
    InvalidBandCount { requested: usize, available: usize },

    #[error("frame has {got} samples, expected {expected}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("interleaved block of {len} samples is not a multiple of {channels} channels")]
    MisalignedBlock { len: usize, channels: usize },

    /// A read reached behind the ring retention window. Indicates a sizing bug.
    #[error("buffer underrun: frame {requested} evicted (oldest retained {oldest}, current {current})")]
    BufferUnderrun {
        requested: i64,
        oldest: i64,
        current: i64,
    },

    #[error("FFT length {0} is not a power of two")]
    FftLength(usize),

    #[error("point writer failed: {0}")]
    Writer(#[source] WriteError),

    #[error("failed to build fan-out thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("analysis worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("analysis pipeline closed before all work was queued")]
    PipelineClosed,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
