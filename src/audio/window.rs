//! Hann windowing and an in-place radix-2 FFT.
//!
//! The FFT works on caller-owned buffers and holds no state, so any number of
//! threads can run it at once on their own scratch.

use rustfft::num_complex::Complex;

use crate::error::{AnalysisError, Result};

/// Hann window coefficients for `size` samples.
pub fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos())
        })
        .collect()
}

/// FFT length used for a window of `window_frames` samples.
pub fn fft_length(window_frames: usize) -> Option<usize> {
    window_frames.max(1).checked_next_power_of_two()
}

/// Forward FFT, decimation in time. `buffer.len()` must be a power of two.
pub fn fft_in_place(buffer: &mut [Complex<f64>]) -> Result<()> {
    let n = buffer.len();
    if !n.is_power_of_two() {
        return Err(AnalysisError::FftLength(n));
    }
    if n == 1 {
        return Ok(());
    }

    bit_reverse(buffer);

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * std::f64::consts::PI / len as f64;
        let step = Complex::new(angle.cos(), angle.sin());
        let half = len / 2;

        for chunk in buffer.chunks_exact_mut(len) {
            let (lo, hi) = chunk.split_at_mut(half);
            let mut twiddle = Complex::new(1.0, 0.0);
            for (a, b) in lo.iter_mut().zip(hi.iter_mut()) {
                let t = *b * twiddle;
                *b = *a - t;
                *a += t;
                twiddle *= step;
            }
        }
        len <<= 1;
    }
    Ok(())
}

fn bit_reverse(buffer: &mut [Complex<f64>]) {
    let n = buffer.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            buffer.swap(i, j);
        }
    }
}

/// Windows `samples` into `scratch` (resized to `fft_len`, zero padded) and
/// transforms it.
pub fn transform_window(
    samples: &[f32],
    hann: &[f64],
    fft_len: usize,
    scratch: &mut Vec<Complex<f64>>,
) -> Result<()> {
    debug_assert_eq!(samples.len(), hann.len());
    scratch.clear();
    scratch.extend(
        samples
            .iter()
            .zip(hann)
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0)),
    );
    scratch.resize(fft_len, Complex::new(0.0, 0.0));
    fft_in_place(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn signal(n: usize) -> Vec<Complex<f64>> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Complex::new(
                    (2.0 * std::f64::consts::PI * 3.0 * t).sin() + 0.25 * (i % 7) as f64,
                    0.0,
                )
            })
            .collect()
    }

    #[test]
    fn hann_endpoints_and_peak() {
        let w = hann_window(5);
        assert!(w[0].abs() < 1e-12);
        assert!(w[4].abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn fft_length_rounds_up() {
        assert_eq!(fft_length(50), Some(64));
        assert_eq!(fft_length(64), Some(64));
        assert_eq!(fft_length(1), Some(1));
        assert_eq!(fft_length(usize::MAX), None);
    }

    #[test]
    fn rejects_non_power_of_two() {
        let mut buf = vec![Complex::new(0.0, 0.0); 12];
        assert!(matches!(
            fft_in_place(&mut buf),
            Err(AnalysisError::FftLength(12))
        ));
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut buf = vec![Complex::new(0.0, 0.0); 16];
        buf[0] = Complex::new(1.0, 0.0);
        fft_in_place(&mut buf).unwrap();
        for c in &buf {
            assert!((c.re - 1.0).abs() < 1e-12 && c.im.abs() < 1e-12);
        }
    }

    #[test]
    fn matches_rustfft() {
        for &n in &[2usize, 8, 64, 1024] {
            let mut ours = signal(n);
            let mut reference = ours.clone();

            fft_in_place(&mut ours).unwrap();
            FftPlanner::<f64>::new()
                .plan_fft_forward(n)
                .process(&mut reference);

            let max_err = ours
                .iter()
                .zip(&reference)
                .map(|(a, b)| (a - b).norm())
                .fold(0.0f64, f64::max);
            assert!(max_err < 1e-9, "n={n} max_err={max_err}");
        }
    }

    #[test]
    fn transform_window_zero_pads() {
        let samples = [1.0f32; 3];
        let hann = vec![1.0; 3];
        let mut scratch = Vec::new();
        transform_window(&samples, &hann, 4, &mut scratch).unwrap();
        assert_eq!(scratch.len(), 4);
        // DC bin is the sum of the three ones
        assert!((scratch[0].re - 3.0).abs() < 1e-12);
    }
}
