use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;

use super::analysis::{Dispatch, Kernel};
use super::features::{AnalysisPoint, PointWriter};
use super::ring::FrameRing;
use crate::error::{AnalysisError, Result};

/// Reusable buffers owned by one channel.
struct Lane {
    window: Vec<f32>,
    scratch: Vec<Complex<f64>>,
}

/// Computes every channel of an anchor before returning, in parallel across
/// channels when more than one worker is configured.
pub(crate) struct FanOut {
    kernel: Arc<Kernel>,
    writer: Arc<dyn PointWriter>,
    lanes: Vec<Lane>,
    pool: Option<rayon::ThreadPool>,
    points: u64,
}

impl FanOut {
    pub(crate) fn new(
        kernel: Arc<Kernel>,
        writer: Arc<dyn PointWriter>,
        channels: usize,
        window_frames: usize,
        workers: usize,
    ) -> Result<Self> {
        let lanes = (0..channels)
            .map(|_| Lane {
                window: vec![0.0; window_frames],
                scratch: kernel.scratch(),
            })
            .collect();

        let pool = if workers > 1 && channels > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("bandmeter-fanout-{i}"))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            kernel,
            writer,
            lanes,
            pool,
            points: 0,
        })
    }
}

impl Dispatch for FanOut {
    fn dispatch(&mut self, anchor: u64, start: i64, ring: &FrameRing) -> Result<()> {
        let kernel = &*self.kernel;
        let measure = |(channel, lane): (usize, &mut Lane)| -> Result<AnalysisPoint> {
            ring.copy_window(channel, start, &mut lane.window)?;
            kernel.measure(channel, anchor, &lane.window, &mut lane.scratch)
        };

        let lanes = &mut self.lanes;
        let points = match &self.pool {
            Some(pool) => pool.install(|| {
                lanes
                    .par_iter_mut()
                    .enumerate()
                    .map(measure)
                    .collect::<Result<Vec<_>>>()
            })?,
            None => lanes
                .iter_mut()
                .enumerate()
                .map(measure)
                .collect::<Result<Vec<_>>>()?,
        };

        for point in points {
            self.writer
                .write_point(point)
                .map_err(AnalysisError::Writer)?;
            self.points += 1;
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        Ok(self.points)
    }
}
