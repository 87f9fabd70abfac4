use anyhow::{Context, Result};
use bandmeter::{PointWriter, WriteError};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Writes one JSON object per point. Safe to share between pipeline workers.
pub struct JsonLinesWriter {
    out: Mutex<BufWriter<Box<dyn Write + Send>>>,
}

impl JsonLinesWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(BufWriter::new(out)),
        }
    }

    /// Creates `path`, or writes to stdout for `None`.
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let out: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(
                std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output: {}", path.display()))?,
            ),
            None => Box::new(std::io::stdout()),
        };
        log::info!(
            "Writing points to {}",
            path.map_or_else(|| "stdout".to_string(), |p| p.display().to_string())
        );
        Ok(Self::new(out))
    }

    pub fn flush(&self) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("Output writer lock poisoned"))?;
        out.flush().context("Failed to flush output")
    }
}

impl<P: Serialize + Send> PointWriter<P> for JsonLinesWriter {
    fn write_point(&self, point: P) -> Result<(), WriteError> {
        let line = serde_json::to_string(&point)?;
        let mut out = self.out.lock().map_err(|_| "output writer lock poisoned")?;
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandmeter::AnalysisPoint;
    use std::sync::Arc;

    /// Shared buffer so the test can inspect what the writer produced.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_point() {
        let buf = SharedBuf::default();
        let writer = JsonLinesWriter::new(Box::new(buf.clone()));
        for anchor in [10, 20] {
            writer
                .write_point(AnalysisPoint {
                    stream: "s".into(),
                    channel: 0,
                    window: 50,
                    anchor,
                    bins: vec![-120.0, -6.5],
                })
                .unwrap();
        }
        writer.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["anchor"], 10);
        assert_eq!(first["bins"][1], -6.5);
    }

    #[test]
    fn silent_bands_on_an_infinite_floor_stay_readable() {
        let buf = SharedBuf::default();
        let writer = JsonLinesWriter::new(Box::new(buf.clone()));
        writer
            .write_point(AnalysisPoint {
                stream: "s".into(),
                channel: 1,
                window: 50,
                anchor: 10,
                bins: vec![f64::NEG_INFINITY; 2],
            })
            .unwrap();
        writer.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["bins"], serde_json::json!(["-inf", "-inf"]));
    }
}
