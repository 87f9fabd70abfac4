use serde::{Deserialize, Serialize};

/// Unit in which windows, hops and anchors are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    #[default]
    Samples,
    #[serde(alias = "ms")]
    Milliseconds,
}

impl WindowUnit {
    /// Converts a length in this unit to a frame count (at least one frame).
    pub fn to_frames(self, value: u64, sample_rate: u32) -> usize {
        let frames = match self {
            WindowUnit::Samples => value,
            WindowUnit::Milliseconds => {
                let frames = (value as u128 * sample_rate as u128).div_ceil(1000);
                frames.min(u64::MAX as u128) as u64
            }
        };
        usize::try_from(frames.max(1)).unwrap_or(usize::MAX)
    }

    /// Position of `frame_count` ingested frames expressed in this unit.
    pub fn position(self, frame_count: u64, sample_rate: u32) -> u64 {
        match self {
            WindowUnit::Samples => frame_count,
            WindowUnit::Milliseconds => {
                (frame_count as u128 * 1000 / sample_rate as u128) as u64
            }
        }
    }

    /// First frame count whose position reaches `anchor`. This is the
    /// exclusive end of the window measured at that anchor.
    pub fn end_frame(self, anchor: u64, sample_rate: u32) -> u64 {
        match self {
            WindowUnit::Samples => anchor,
            WindowUnit::Milliseconds => {
                (anchor as u128 * sample_rate as u128).div_ceil(1000) as u64
            }
        }
    }
}

impl std::fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowUnit::Samples => write!(f, "samples"),
            WindowUnit::Milliseconds => write!(f, "ms"),
        }
    }
}

impl std::str::FromStr for WindowUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "samples" | "sample" => Ok(WindowUnit::Samples),
            "ms" | "milliseconds" | "millis" => Ok(WindowUnit::Milliseconds),
            other => Err(format!("unknown window unit {other:?} (expected samples or ms)")),
        }
    }
}

/// Schedules anchors one hop apart, starting one hop after zero.
#[derive(Debug, Clone)]
pub struct AnchorClock {
    unit: WindowUnit,
    sample_rate: u32,
    hop: u64,
    next_anchor: u64,
    last_anchor: Option<u64>,
}

impl AnchorClock {
    pub fn new(unit: WindowUnit, sample_rate: u32, hop: u64) -> Self {
        assert!(hop > 0, "AnchorClock hop must be greater than zero");
        Self {
            unit,
            sample_rate,
            hop,
            next_anchor: hop,
            last_anchor: None,
        }
    }

    #[inline]
    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    #[inline]
    pub fn last_anchor(&self) -> Option<u64> {
        self.last_anchor
    }

    /// Pops the next anchor that is due once `frame_count` frames have been
    /// ingested.
    pub fn next_due(&mut self, frame_count: u64) -> Option<u64> {
        let position = self.unit.position(frame_count, self.sample_rate);
        if self.next_anchor > position {
            return None;
        }
        let anchor = self.next_anchor;
        self.next_anchor += self.hop;
        self.last_anchor = Some(anchor);
        Some(anchor)
    }

    /// All anchors due at `frame_count`, in increasing order.
    pub fn advance(&mut self, frame_count: u64) -> impl Iterator<Item = u64> + '_ {
        std::iter::from_fn(move || self.next_due(frame_count))
    }

    /// Exclusive end frame of the window for `anchor`.
    pub fn end_frame(&self, anchor: u64) -> u64 {
        self.unit.end_frame(anchor, self.sample_rate)
    }
}
