use std::sync::Mutex;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::error::WriteError;

/// Band energies measured for one channel at one anchor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisPoint {
    pub stream: String,
    pub channel: usize,
    /// Window length in the configured unit
    pub window: u64,
    /// Sample count or elapsed milliseconds, matching the configured unit
    pub anchor: u64,
    /// Per-band dB values, low to high frequency
    #[serde(serialize_with = "serialize_db")]
    pub bins: Vec<f64>,
}

/// JSON has no infinities, so a `-inf` floor would otherwise come out as
/// `null`. Non-finite values are written as the strings `"-inf"`, `"inf"` and
/// `"nan"`.
fn serialize_db<S: Serializer>(bins: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(bins.len()))?;
    for &db in bins {
        if db.is_finite() {
            seq.serialize_element(&db)?;
        } else if db.is_nan() {
            seq.serialize_element("nan")?;
        } else if db < 0.0 {
            seq.serialize_element("-inf")?;
        } else {
            seq.serialize_element("inf")?;
        }
    }
    seq.end()
}

/// Absolute sample peak for one channel at one anchor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeakPoint {
    pub stream: String,
    pub channel: usize,
    pub window: u64,
    pub anchor: u64,
    pub peak: f32,
}

/// Totals reported once an engine has been finalized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub points: u64,
    pub frames: u64,
    pub last_anchor: Option<u64>,
}

/// Downstream consumer of measured points.
///
/// In pipeline mode the engine calls `write_point` from several worker threads
/// at once, hence `&self` and the `Sync` bound.
pub trait PointWriter<P = AnalysisPoint>: Send + Sync {
    fn write_point(&self, point: P) -> Result<(), WriteError>;
}

impl<P, F> PointWriter<P> for F
where
    F: Fn(P) -> Result<(), WriteError> + Send + Sync,
{
    fn write_point(&self, point: P) -> Result<(), WriteError> {
        self(point)
    }
}

/// Keeps every point in memory.
#[derive(Debug)]
pub struct CollectingWriter<P = AnalysisPoint> {
    points: Mutex<Vec<P>>,
}

impl<P> Default for CollectingWriter<P> {
    fn default() -> Self {
        Self {
            points: Mutex::new(Vec::new()),
        }
    }
}

impl CollectingWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> CollectingWriter<P> {
    /// Removes and returns everything written so far.
    pub fn take(&self) -> Vec<P> {
        match self.points.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl<P: Send> PointWriter<P> for CollectingWriter<P> {
    fn write_point(&self, point: P) -> Result<(), WriteError> {
        self.points
            .lock()
            .map_err(|_| "collecting writer lock poisoned")?
            .push(point);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(bins: Vec<f64>) -> AnalysisPoint {
        AnalysisPoint {
            stream: "s".into(),
            channel: 0,
            window: 50,
            anchor: 10,
            bins,
        }
    }

    #[test]
    fn finite_bins_serialize_as_numbers() {
        let json = serde_json::to_value(point(vec![-120.0, -6.5])).unwrap();
        assert_eq!(json["bins"], serde_json::json!([-120.0, -6.5]));
    }

    #[test]
    fn infinite_floor_survives_serialization() {
        let json = serde_json::to_string(&point(vec![f64::NEG_INFINITY, -3.0])).unwrap();
        assert!(json.contains(r#""bins":["-inf",-3.0]"#), "{json}");
        assert!(!json.contains("null"));
    }
}
