use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::analysis::{Dispatch, Kernel};
use super::features::PointWriter;
use super::ring::FrameRing;
use crate::error::{AnalysisError, Result};

/// Windows of every channel captured at one anchor.
struct WorkItem {
    anchor: u64,
    windows: Vec<Vec<f32>>,
}

/// State shared between the producer and all workers.
#[derive(Default)]
struct Shared {
    failure: Mutex<Option<AnalysisError>>,
    halted: AtomicBool,
    points: AtomicU64,
}

impl Shared {
    /// Keeps the first failure only.
    fn fail(&self, worker: usize, err: AnalysisError) {
        let mut slot = match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            log::warn!("Analysis worker {} failed: {}", worker, err);
            *slot = Some(err);
        } else {
            log::debug!("Analysis worker {} failed after an earlier failure: {}", worker, err);
        }
        self.halted.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Option<AnalysisError> {
        match self.failure.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Snapshots windows on the ingest thread and computes them on a fixed pool
/// of background workers fed through a bounded queue.
pub(crate) struct Pipeline {
    sender: Option<Sender<WorkItem>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
    channels: usize,
    window_frames: usize,
    dropped: u64,
}

impl Pipeline {
    pub(crate) fn spawn(
        kernel: Arc<Kernel>,
        writer: Arc<dyn PointWriter>,
        channels: usize,
        window_frames: usize,
        workers: usize,
        queue_depth: usize,
    ) -> Result<Self> {
        let (sender, receiver) = bounded(queue_depth);
        let shared = Arc::new(Shared::default());

        let mut pipeline = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(workers),
            shared,
            channels,
            window_frames,
            dropped: 0,
        };

        for index in 0..workers {
            let receiver = receiver.clone();
            let kernel = Arc::clone(&kernel);
            let writer = Arc::clone(&writer);
            let shared = Arc::clone(&pipeline.shared);
            // On spawn failure `pipeline` drops here, closing the queue and
            // joining the workers that did start.
            let handle = thread::Builder::new()
                .name(format!("bandmeter-worker-{index}"))
                .spawn(move || worker_loop(index, receiver, kernel, writer, shared))?;
            pipeline.workers.push(handle);
        }

        log::debug!(
            "Started {} analysis workers (queue depth {})",
            workers,
            queue_depth
        );
        Ok(pipeline)
    }

    fn shutdown(&mut self) -> Option<AnalysisError> {
        drop(self.sender.take());

        let mut panicked = None;
        for (index, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() && panicked.is_none() {
                panicked = Some(AnalysisError::WorkerPanicked(index));
            }
        }
        self.shared.take_failure().or(panicked)
    }
}

fn worker_loop(
    index: usize,
    receiver: Receiver<WorkItem>,
    kernel: Arc<Kernel>,
    writer: Arc<dyn PointWriter>,
    shared: Arc<Shared>,
) {
    log::debug!("Analysis worker {} started", index);
    let mut scratch = kernel.scratch();
    let mut processed = 0u64;

    // Keep receiving after a failure so the producer never blocks on a full
    // queue; items are discarded once halted.
    for item in receiver.iter() {
        if shared.halted.load(Ordering::SeqCst) {
            continue;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            process(&item, &kernel, writer.as_ref(), &shared, &mut scratch)
        }));
        match outcome {
            Ok(Ok(())) => processed += 1,
            Ok(Err(err)) => shared.fail(index, err),
            Err(_) => {
                // scratch may be half-written
                scratch = kernel.scratch();
                shared.fail(index, AnalysisError::WorkerPanicked(index));
            }
        }
    }
    log::debug!("Analysis worker {} exiting after {} items", index, processed);
}

fn process(
    item: &WorkItem,
    kernel: &Kernel,
    writer: &dyn PointWriter,
    shared: &Shared,
    scratch: &mut Vec<rustfft::num_complex::Complex<f64>>,
) -> Result<()> {
    let points = item
        .windows
        .iter()
        .enumerate()
        .map(|(channel, window)| kernel.measure(channel, item.anchor, window, scratch))
        .collect::<Result<Vec<_>>>()?;

    for point in points {
        writer.write_point(point).map_err(AnalysisError::Writer)?;
        shared.points.fetch_add(1, Ordering::SeqCst);
    }
    Ok(())
}

impl Dispatch for Pipeline {
    fn dispatch(&mut self, anchor: u64, start: i64, ring: &FrameRing) -> Result<()> {
        if self.shared.halted.load(Ordering::SeqCst) {
            if self.dropped == 0 {
                log::debug!("Pipeline halted, discarding anchors from {}", anchor);
            }
            self.dropped += 1;
            return Ok(());
        }

        let mut windows = Vec::with_capacity(self.channels);
        for channel in 0..self.channels {
            let mut window = vec![0.0; self.window_frames];
            ring.copy_window(channel, start, &mut window)?;
            windows.push(window);
        }

        let sender = self.sender.as_ref().ok_or(AnalysisError::PipelineClosed)?;
        sender
            .send(WorkItem { anchor, windows })
            .map_err(|_| {
                self.shared
                    .take_failure()
                    .unwrap_or(AnalysisError::PipelineClosed)
            })
    }

    fn finish(mut self: Box<Self>) -> Result<u64> {
        if let Some(err) = self.shutdown() {
            return Err(err);
        }
        Ok(self.shared.points.load(Ordering::SeqCst))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            if let Some(err) = self.shutdown() {
                log::warn!("Analysis pipeline dropped with failure: {}", err);
            }
        }
    }
}
