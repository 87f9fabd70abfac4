use std::sync::Arc;

use rustfft::num_complex::Complex;

use super::anchor::AnchorClock;
use super::bands::BandReducer;
use super::fanout::FanOut;
use super::features::{AnalysisPoint, PointWriter, Summary};
use super::params::{EngineConfig, Geometry};
use super::pipeline::Pipeline;
use super::ring::FrameRing;
use super::window::{hann_window, transform_window};
use crate::error::{AnalysisError, Result};

/// How per-anchor work is executed. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Every channel of an anchor is computed before the next anchor starts.
    FanOut,
    /// Windows are snapshotted and handed to background workers.
    Pipeline,
}

impl DispatchMode {
    pub fn select(workers: usize, channels: usize) -> Self {
        if workers > channels {
            DispatchMode::Pipeline
        } else {
            DispatchMode::FanOut
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::FanOut => write!(f, "fan-out"),
            DispatchMode::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Window transform plus band reduction for one channel window.
#[derive(Debug)]
pub(crate) struct Kernel {
    stream: String,
    window: u64,
    hann: Vec<f64>,
    fft_len: usize,
    reducer: BandReducer,
}

impl Kernel {
    pub(crate) fn new(config: &EngineConfig, geometry: Geometry) -> Result<Self> {
        Ok(Self {
            stream: config.stream.clone(),
            window: config.window,
            hann: hann_window(geometry.window_frames),
            fft_len: geometry.fft_len,
            reducer: BandReducer::new(geometry.fft_len, config.bands, config.floor_db)?,
        })
    }

    pub(crate) fn scratch(&self) -> Vec<Complex<f64>> {
        Vec::with_capacity(self.fft_len)
    }

    pub(crate) fn measure(
        &self,
        channel: usize,
        anchor: u64,
        samples: &[f32],
        scratch: &mut Vec<Complex<f64>>,
    ) -> Result<AnalysisPoint> {
        transform_window(samples, &self.hann, self.fft_len, scratch)?;
        Ok(AnalysisPoint {
            stream: self.stream.clone(),
            channel,
            window: self.window,
            anchor,
            bins: self.reducer.reduce(scratch),
        })
    }
}

/// Executes the per-anchor work for one dispatch mode.
pub(crate) trait Dispatch: Send {
    /// `start` is the first frame of the window, possibly negative.
    fn dispatch(&mut self, anchor: u64, start: i64, ring: &FrameRing) -> Result<()>;

    /// Waits for outstanding work and returns the number of points written.
    fn finish(self: Box<Self>) -> Result<u64>;
}

/// Streaming spectral band analyzer for one input stream.
///
/// Frames go in through [`ingest`](Self::ingest); every hop the engine emits
/// one [`AnalysisPoint`] per channel through the writer. Call
/// [`finish`](Self::finish) once the stream ends.
pub struct SpectralEngine {
    ring: FrameRing,
    clock: AnchorClock,
    window_frames: usize,
    mode: DispatchMode,
    dispatch: Box<dyn Dispatch>,
}

impl SpectralEngine {
    pub fn new(config: EngineConfig, writer: Arc<dyn PointWriter>) -> Result<Self> {
        let geometry = config.validate()?;
        let kernel = Arc::new(Kernel::new(&config, geometry)?);
        let mode = DispatchMode::select(config.workers, config.channels);

        log::info!(
            "Spectral engine for {:?}: {} ch @ {}Hz, window={}{} ({} frames, fft={}), hop={}{}, bands={}, floor={}dB, {} mode with {} worker(s)",
            config.stream,
            config.channels,
            config.sample_rate,
            config.window,
            config.unit,
            geometry.window_frames,
            geometry.fft_len,
            config.hop,
            config.unit,
            config.bands,
            config.floor_db,
            mode,
            config.workers,
        );

        let dispatch: Box<dyn Dispatch> = match mode {
            DispatchMode::FanOut => Box::new(FanOut::new(
                kernel,
                writer,
                config.channels,
                geometry.window_frames,
                config.workers,
            )?),
            DispatchMode::Pipeline => Box::new(Pipeline::spawn(
                kernel,
                writer,
                config.channels,
                geometry.window_frames,
                config.workers,
                config.queue_depth(),
            )?),
        };

        Ok(Self {
            ring: FrameRing::new(config.channels, geometry.window_frames),
            clock: AnchorClock::new(config.unit, config.sample_rate, config.hop),
            window_frames: geometry.window_frames,
            mode,
            dispatch,
        })
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn frames(&self) -> u64 {
        self.ring.frame_index()
    }

    /// Appends one frame holding exactly one sample per channel.
    pub fn ingest(&mut self, frame: &[f32]) -> Result<()> {
        self.ring.ingest(frame)?;

        let frame_count = self.ring.frame_index();
        while let Some(anchor) = self.clock.next_due(frame_count) {
            let start = self.clock.end_frame(anchor) as i64 - self.window_frames as i64;
            self.dispatch.dispatch(anchor, start, &self.ring)?;
        }
        Ok(())
    }

    /// Appends a block of interleaved frames.
    pub fn ingest_interleaved(&mut self, samples: &[f32]) -> Result<()> {
        let channels = self.ring.channels();
        if samples.len() % channels != 0 {
            return Err(AnalysisError::MisalignedBlock {
                len: samples.len(),
                channels,
            });
        }
        for frame in samples.chunks_exact(channels) {
            self.ingest(frame)?;
        }
        Ok(())
    }

    /// Drains outstanding work and reports totals.
    pub fn finish(self) -> Result<Summary> {
        let frames = self.ring.frame_index();
        let last_anchor = self.clock.last_anchor();
        let points = self.dispatch.finish()?;

        let summary = Summary {
            points,
            frames,
            last_anchor,
        };
        log::info!(
            "Analysis complete: {} points from {} frames (last anchor {:?})",
            summary.points,
            summary.frames,
            summary.last_anchor
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::CollectingWriter;
    use crate::error::WriteError;

    fn config(workers: usize) -> EngineConfig {
        EngineConfig {
            stream: "unit".into(),
            sample_rate: 1000,
            channels: 1,
            window: 50,
            hop: 10,
            bands: 12,
            floor_db: -120.0,
            workers,
            ..Default::default()
        }
    }

    #[test]
    fn mode_selection_boundary() {
        assert_eq!(DispatchMode::select(2, 2), DispatchMode::FanOut);
        assert_eq!(DispatchMode::select(1, 2), DispatchMode::FanOut);
        assert_eq!(DispatchMode::select(3, 2), DispatchMode::Pipeline);
    }

    #[test]
    fn constant_input_scenario() {
        let writer = Arc::new(CollectingWriter::new());
        let mut engine = SpectralEngine::new(config(1), writer.clone()).unwrap();
        assert_eq!(engine.mode(), DispatchMode::FanOut);

        for _ in 0..100 {
            engine.ingest(&[0.5]).unwrap();
        }
        let summary = engine.finish().unwrap();
        let points = writer.take();

        assert_eq!(summary.points, 10);
        assert_eq!(summary.frames, 100);
        assert_eq!(summary.last_anchor, Some(100));
        assert_eq!(points.len(), 10);
        assert_eq!(points[0].anchor, 10);
        assert!(points.iter().all(|p| p.anchor != 0 && p.bins.len() == 12));
    }

    #[test]
    fn misaligned_block_is_rejected() {
        let writer = Arc::new(CollectingWriter::new());
        let cfg = EngineConfig {
            channels: 2,
            workers: 1,
            ..config(1)
        };
        let mut engine = SpectralEngine::new(cfg, writer).unwrap();
        assert!(matches!(
            engine.ingest_interleaved(&[0.0; 3]),
            Err(AnalysisError::MisalignedBlock { len: 3, channels: 2 })
        ));
    }

    #[test]
    fn writer_failure_surfaces_from_ingest() {
        let writer: Arc<dyn PointWriter> =
            Arc::new(|_: AnalysisPoint| -> std::result::Result<(), WriteError> {
                Err("disk full".into())
            });
        let mut engine = SpectralEngine::new(config(1), writer).unwrap();
        for _ in 0..9 {
            engine.ingest(&[0.1]).unwrap();
        }
        assert!(matches!(
            engine.ingest(&[0.1]),
            Err(AnalysisError::Writer(_))
        ));
    }
}
