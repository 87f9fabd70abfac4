use std::sync::Arc;

use super::anchor::AnchorClock;
use super::features::{PeakPoint, PointWriter, Summary};
use super::params::EngineConfig;
use super::ring::FrameRing;
use crate::error::{AnalysisError, Result};

/// Amplitude-only sibling of [`SpectralEngine`](super::analysis::SpectralEngine).
///
/// Shares the ring and anchor scheduling but measures the absolute sample peak
/// of each window. Runs inline on the ingest thread; `bands`, `floor_db` and
/// `workers` are ignored.
pub struct PeakMeter {
    stream: String,
    window: u64,
    ring: FrameRing,
    clock: AnchorClock,
    window_frames: usize,
    scratch: Vec<f32>,
    writer: Arc<dyn PointWriter<PeakPoint>>,
    points: u64,
}

impl PeakMeter {
    pub fn new(config: EngineConfig, writer: Arc<dyn PointWriter<PeakPoint>>) -> Result<Self> {
        // band count only matters for the spectral engine
        let config = EngineConfig { bands: 1, ..config };
        let geometry = config.validate()?;

        log::info!(
            "Peak meter for {:?}: {} ch @ {}Hz, window={}{} ({} frames), hop={}{}",
            config.stream,
            config.channels,
            config.sample_rate,
            config.window,
            config.unit,
            geometry.window_frames,
            config.hop,
            config.unit,
        );

        Ok(Self {
            stream: config.stream,
            window: config.window,
            ring: FrameRing::new(config.channels, geometry.window_frames),
            clock: AnchorClock::new(config.unit, config.sample_rate, config.hop),
            window_frames: geometry.window_frames,
            scratch: vec![0.0; geometry.window_frames],
            writer,
            points: 0,
        })
    }

    pub fn ingest(&mut self, frame: &[f32]) -> Result<()> {
        self.ring.ingest(frame)?;

        let frame_count = self.ring.frame_index();
        while let Some(anchor) = self.clock.next_due(frame_count) {
            let start = self.clock.end_frame(anchor) as i64 - self.window_frames as i64;
            for channel in 0..self.ring.channels() {
                self.ring.copy_window(channel, start, &mut self.scratch)?;
                let peak = self.scratch.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                self.writer
                    .write_point(PeakPoint {
                        stream: self.stream.clone(),
                        channel,
                        window: self.window,
                        anchor,
                        peak,
                    })
                    .map_err(AnalysisError::Writer)?;
                self.points += 1;
            }
        }
        Ok(())
    }

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

    pub fn finish(self) -> Result<Summary> {
        let summary = Summary {
            points: self.points,
            frames: self.ring.frame_index(),
            last_anchor: self.clock.last_anchor(),
        };
        log::info!(
            "Peak metering complete: {} points from {} frames",
            summary.points,
            summary.frames
        );
        Ok(summary)
    }
}
