use anyhow::{Context, Result};
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Opens a file, or stdin for `None` and `-`.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open PCM input: {}", path.display()))?;
            Ok(Box::new(std::io::BufReader::new(file)))
        }
        _ => Ok(Box::new(std::io::stdin().lock())),
    }
}

/// Reads interleaved little-endian f32 frames in fixed-size blocks.
pub struct PcmSource<R> {
    reader: R,
    frame_bytes: usize,
    bytes: Vec<u8>,
    samples: Vec<f32>,
}

impl<R: Read> PcmSource<R> {
    pub fn new(reader: R, channels: usize, block_frames: usize) -> Self {
        let frame_bytes = channels * std::mem::size_of::<f32>();
        Self {
            reader,
            frame_bytes,
            bytes: vec![0; frame_bytes * block_frames.max(1)],
            samples: Vec::new(),
        }
    }

    /// Next block of whole frames, `None` at end of input.
    pub fn next_block(&mut self) -> Result<Option<&[f32]>> {
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read PCM input"),
            }
        }

        let whole = filled / self.frame_bytes * self.frame_bytes;
        if whole < filled {
            log::warn!(
                "Discarding {} trailing bytes of an incomplete frame",
                filled - whole
            );
        }
        if whole == 0 {
            return Ok(None);
        }

        self.samples.clear();
        self.samples.extend(
            self.bytes[..whole]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        Ok(Some(self.samples.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn reads_whole_frames_in_blocks() {
        let data = encode(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut source = PcmSource::new(&data[..], 2, 2);

        assert_eq!(source.next_block().unwrap().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(source.next_block().unwrap().unwrap(), &[4.0, 5.0]);
        assert!(source.next_block().unwrap().is_none());
    }

    #[test]
    fn drops_trailing_partial_frame() {
        let mut data = encode(&[0.5, -0.5, 0.25]);
        data.push(0);
        let mut source = PcmSource::new(&data[..], 2, 8);

        assert_eq!(source.next_block().unwrap().unwrap(), &[0.5, -0.5]);
        assert!(source.next_block().unwrap().is_none());
    }
}
