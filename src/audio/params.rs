use super::anchor::WindowUnit;
use super::bands::positive_bins;
use super::window::fft_length;
use crate::error::{AnalysisError, Result};

/// Fixed parameters of one analysis run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub stream: String,
    pub sample_rate: u32,
    pub channels: usize,
    /// Window length in `unit`
    pub window: u64,
    /// Anchor spacing in `unit`
    pub hop: u64,
    pub unit: WindowUnit,
    pub bands: usize,
    pub floor_db: f64,
    pub workers: usize,
    /// Bounded queue depth in pipeline mode. `None` picks twice the worker count.
    pub queue_depth: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: String::from("stream"),
            sample_rate: 44100,
            channels: 2,
            window: 2048,
            hop: 1024,
            unit: WindowUnit::Samples,
            bands: 32,
            floor_db: -120.0,
            workers: 1,
            queue_depth: None,
        }
    }
}

/// Frame-domain sizes derived from a validated [`EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub window_frames: usize,
    pub fft_len: usize,
}

impl EngineConfig {
    /// Checks everything except the band count, which needs the FFT length.
    pub fn validate(&self) -> Result<Geometry> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate);
        }
        if self.channels == 0 {
            return Err(AnalysisError::InvalidChannels);
        }
        if self.stream.is_empty() {
            return Err(AnalysisError::EmptyStreamName);
        }
        if self.window == 0 {
            return Err(AnalysisError::InvalidWindow);
        }
        if self.hop == 0 {
            return Err(AnalysisError::InvalidHop);
        }
        if self.workers == 0 {
            return Err(AnalysisError::InvalidWorkers);
        }
        if self.floor_db.is_nan() || self.floor_db == f64::INFINITY {
            return Err(AnalysisError::InvalidFloor(self.floor_db));
        }

        let window_frames = self.unit.to_frames(self.window, self.sample_rate);
        let fft_len = fft_length(window_frames).ok_or(AnalysisError::InvalidWindow)?;
        let available = positive_bins(fft_len);
        if self.bands == 0 || self.bands > available {
            return Err(AnalysisError::InvalidBandCount {
                requested: self.bands,
                available,
            });
        }

        Ok(Geometry {
            window_frames,
            fft_len,
        })
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.unwrap_or(self.workers * 2).max(1)
    }
}
