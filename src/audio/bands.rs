use std::ops::Range;

use rustfft::num_complex::Complex;

use crate::error::{AnalysisError, Result};

/// Reduces the non-negative half of a spectrum into contiguous dB bands.
#[derive(Debug, Clone)]
pub struct BandReducer {
    ranges: Vec<Range<usize>>,
    floor_db: f64,
}

impl BandReducer {
    pub fn new(fft_len: usize, band_count: usize, floor_db: f64) -> Result<Self> {
        let positive = positive_bins(fft_len);
        if band_count == 0 || band_count > positive {
            return Err(AnalysisError::InvalidBandCount {
                requested: band_count,
                available: positive,
            });
        }

        let ranges = (0..band_count)
            .map(|b| {
                let start = b * positive / band_count;
                let mut end = (b + 1) * positive / band_count;
                if end <= start {
                    end = (start + 1).min(positive);
                }
                if b == band_count - 1 {
                    end = positive;
                }
                start..end
            })
            .collect();

        Ok(Self { ranges, floor_db })
    }

    #[inline]
    pub fn band_count(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn floor_db(&self) -> f64 {
        self.floor_db
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// One clamped dB value per band.
    pub fn reduce(&self, spectrum: &[Complex<f64>]) -> Vec<f64> {
        self.ranges
            .iter()
            .map(|range| {
                let bins = &spectrum[range.clone()];
                let avg = if bins.is_empty() {
                    0.0
                } else {
                    bins.iter().map(|c| c.norm()).sum::<f64>() / bins.len() as f64
                };
                let db = if avg > 0.0 {
                    20.0 * avg.log10()
                } else {
                    f64::NEG_INFINITY
                };
                db.max(self.floor_db)
            })
            .collect()
    }
}

/// Count of non-negative frequency bins, DC and Nyquist included.
#[inline]
pub fn positive_bins(fft_len: usize) -> usize {
    fft_len / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_band_absorbs_remainder() {
        // 64-point FFT -> 33 positive bins
        let reducer = BandReducer::new(64, 12, -120.0).unwrap();
        let ranges = reducer.ranges();
        assert_eq!(ranges.len(), 12);
        assert_eq!(ranges[0], 0..2);
        assert_eq!(ranges[11].end, 33);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn one_bin_per_band_at_capacity() {
        let reducer = BandReducer::new(8, 5, -120.0).unwrap();
        let ranges: Vec<_> = reducer.ranges().to_vec();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3, 3..4, 4..5]);
    }

    #[test]
    fn rejects_too_many_bands() {
        let err = BandReducer::new(64, 34, -120.0).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidBandCount {
                requested: 34,
                available: 33
            }
        ));
        assert!(BandReducer::new(64, 0, -120.0).is_err());
    }

    #[test]
    fn silence_clamps_to_floor() {
        let reducer = BandReducer::new(16, 4, -90.0).unwrap();
        let spectrum = vec![Complex::new(0.0, 0.0); 16];
        assert_eq!(reducer.reduce(&spectrum), vec![-90.0; 4]);
    }

    #[test]
    fn averages_magnitude_in_decibels() {
        let reducer = BandReducer::new(4, 1, -120.0).unwrap();
        // bins 0..3 used, magnitudes 3+4i -> 5, 10, 0
        let spectrum = vec![
            Complex::new(3.0, 4.0),
            Complex::new(10.0, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(99.0, 0.0),
        ];
        let bands = reducer.reduce(&spectrum);
        assert!((bands[0] - 20.0 * 5.0f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn no_upper_clamp() {
        let reducer = BandReducer::new(2, 1, -10.0).unwrap();
        let spectrum = vec![Complex::new(1000.0, 0.0); 2];
        assert!((reducer.reduce(&spectrum)[0] - 60.0).abs() < 1e-9);
    }
}
