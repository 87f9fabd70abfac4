use crate::error::{AnalysisError, Result};

/// Per-channel circular store of the most recent frames.
///
/// Frames are addressed by their absolute index in the stream. Every channel
/// is written at the same slot, so a single index covers the whole frame.
#[derive(Debug, Clone)]
pub struct FrameRing {
    channels: Vec<Vec<f32>>,
    len: usize,
    frame_index: u64,
}

impl FrameRing {
    /// Two slots beyond the window absorb the off-by-one between the newest
    /// written frame and the oldest frame a window may still need.
    pub const SLACK: usize = 2;

    pub fn new(channels: usize, window_frames: usize) -> Self {
        assert!(channels > 0, "FrameRing needs at least one channel");
        let len = window_frames + Self::SLACK;
        Self {
            channels: vec![vec![0.0; len]; channels],
            len,
            frame_index: 0,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of slots retained per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Number of frames ingested so far.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn ingest(&mut self, frame: &[f32]) -> Result<()> {
        if frame.len() != self.channels.len() {
            return Err(AnalysisError::ChannelMismatch {
                expected: self.channels.len(),
                got: frame.len(),
            });
        }

        let slot = (self.frame_index % self.len as u64) as usize;
        for (samples, &value) in self.channels.iter_mut().zip(frame) {
            samples[slot] = value;
        }
        self.frame_index += 1;
        Ok(())
    }

    /// Reads one sample. Negative frames are silence; evicted or not yet
    /// written frames are an error.
    pub fn read(&self, channel: usize, source_frame: i64) -> Result<f32> {
        if source_frame < 0 {
            return Ok(0.0);
        }

        let current = self.frame_index as i64;
        let oldest = current - self.len as i64;
        if source_frame >= current || source_frame < oldest {
            return Err(AnalysisError::BufferUnderrun {
                requested: source_frame,
                oldest: oldest.max(0),
                current,
            });
        }

        let slot = (source_frame as u64 % self.len as u64) as usize;
        Ok(self.channels[channel][slot])
    }

    /// Copies `out.len()` frames of `channel` starting at `start` into `out`.
    pub fn copy_window(&self, channel: usize, start: i64, out: &mut [f32]) -> Result<()> {
        for (offset, sample) in out.iter_mut().enumerate() {
            *sample = self.read(channel, start + offset as i64)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_recent_frames() {
        let mut ring = FrameRing::new(2, 3);
        ring.ingest(&[1.0, -1.0]).unwrap();
        ring.ingest(&[2.0, -2.0]).unwrap();

        assert_eq!(ring.frame_index(), 2);
        assert_eq!(ring.read(0, 0).unwrap(), 1.0);
        assert_eq!(ring.read(1, 1).unwrap(), -2.0);
    }

    #[test]
    fn negative_frames_are_silence() {
        let ring = FrameRing::new(1, 4);
        assert_eq!(ring.read(0, -1).unwrap(), 0.0);
        assert_eq!(ring.read(0, -100).unwrap(), 0.0);
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut ring = FrameRing::new(1, 2);
        assert_eq!(ring.capacity(), 4);
        for i in 0..6 {
            ring.ingest(&[i as f32]).unwrap();
        }

        // frames 2..6 are retained
        assert_eq!(ring.read(0, 2).unwrap(), 2.0);
        assert_eq!(ring.read(0, 5).unwrap(), 5.0);
        assert!(matches!(
            ring.read(0, 1),
            Err(AnalysisError::BufferUnderrun { requested: 1, .. })
        ));
    }

    #[test]
    fn future_frames_are_rejected() {
        let mut ring = FrameRing::new(1, 2);
        ring.ingest(&[0.5]).unwrap();
        assert!(ring.read(0, 1).is_err());
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let mut ring = FrameRing::new(2, 2);
        let err = ring.ingest(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ChannelMismatch {
                expected: 2,
                got: 1
            }
        ));
        assert_eq!(ring.frame_index(), 0);
    }

    #[test]
    fn copy_window_pads_leading_silence() {
        let mut ring = FrameRing::new(1, 4);
        ring.ingest(&[3.0]).unwrap();
        ring.ingest(&[4.0]).unwrap();

        let mut out = [9.0; 4];
        ring.copy_window(0, -2, &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 3.0, 4.0]);
    }
}
