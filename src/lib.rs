//! Streaming spectral band analysis.
//!
//! Frames of multi-channel PCM are fed into a [`SpectralEngine`] which, every
//! hop, Hann-windows the most recent window of each channel, transforms it
//! with a radix-2 FFT and reduces the non-negative half of the spectrum into a
//! fixed number of dB bands. Points leave through a [`PointWriter`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use bandmeter::{CollectingWriter, EngineConfig, SpectralEngine};
//!
//! let writer = Arc::new(CollectingWriter::new());
//! let config = EngineConfig {
//!     stream: "take-1".into(),
//!     sample_rate: 48000,
//!     channels: 2,
//!     ..Default::default()
//! };
//! let mut engine = SpectralEngine::new(config, writer.clone())?;
//! engine.ingest(&[0.25, -0.25])?;
//! let summary = engine.finish()?;
//! println!("{} points", summary.points);
//! # Ok::<(), bandmeter::AnalysisError>(())
//! ```
//!
//! With more workers than channels the engine switches to a pipeline of
//! background workers; the writer is then called concurrently.

pub mod audio;
pub mod error;

pub use audio::analysis::{DispatchMode, SpectralEngine};
pub use audio::anchor::WindowUnit;
pub use audio::features::{AnalysisPoint, CollectingWriter, PeakPoint, PointWriter, Summary};
pub use audio::params::EngineConfig;
pub use audio::peak::PeakMeter;
pub use error::{AnalysisError, Result, WriteError};
