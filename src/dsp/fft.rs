//! Transform engine
//!
//! Recursive radix-2 Cooley-Tukey FFT over power-of-two lengths, its
//! inverse, and the Hann window / magnitude helpers used by the analyzer.

use std::f64::consts::PI;

use num_complex::Complex64;
use num_traits::Zero;

use crate::error::{Result, WaveqError};

/// Transform direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Time domain to frequency domain, twiddles `exp(-2πi·k/n)`
    Forward,
    /// Frequency domain back to time domain, scaled by `1/n`
    Inverse,
}

/// True for 1, 2, 4, 8, ...
pub fn is_power_of_two(n: usize) -> bool {
    n.is_power_of_two()
}

/// Reject lengths the radix-2 split cannot handle
///
/// Lengths 0 and 1 are trivially valid: the transform leaves them unchanged.
pub fn check_size(len: usize) -> Result<()> {
    if len > 1 && !is_power_of_two(len) {
        return Err(WaveqError::not_power_of_two(len));
    }
    Ok(())
}

/// In-place discrete Fourier transform
///
/// # Errors
/// * `InvalidSize` - `buf.len()` is not a power of two
/// * `OutOfMemory` - scratch space could not be allocated
pub fn transform(buf: &mut [Complex64], direction: Direction) -> Result<()> {
    check_size(buf.len())?;
    if buf.len() <= 1 {
        return Ok(());
    }

    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(buf.len())
        .map_err(|e| WaveqError::OutOfMemory {
            details: format!("FFT scratch of {} bins: {}", buf.len(), e),
        })?;
    scratch.resize(buf.len(), Complex64::zero());

    match direction {
        Direction::Forward => fft_recursive(buf, &mut scratch),
        Direction::Inverse => {
            // ifft(x) = conj(fft(conj(x))) / n
            let scale = buf.len() as f64;
            buf.iter_mut().for_each(|c| *c = c.conj());
            fft_recursive(buf, &mut scratch);
            buf.iter_mut().for_each(|c| *c = c.conj() / scale);
        }
    }
    Ok(())
}

/// Forward transform, see [`transform`]
pub fn fft(buf: &mut [Complex64]) -> Result<()> {
    transform(buf, Direction::Forward)
}

/// Inverse transform, see [`transform`]
pub fn ifft(buf: &mut [Complex64]) -> Result<()> {
    transform(buf, Direction::Inverse)
}

/// Split into even/odd halves, recurse, recombine with twiddle factors.
///
/// `scratch` has the same length as `buf`. The two swap roles on each level:
/// the halves are gathered into `scratch`, transformed there using `buf` as
/// their own scratch, then butterflied back into `buf`.
fn fft_recursive(buf: &mut [Complex64], scratch: &mut [Complex64]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    let half = n / 2;

    let (even, odd) = scratch.split_at_mut(half);
    for i in 0..half {
        even[i] = buf[2 * i];
        odd[i] = buf[2 * i + 1];
    }

    {
        let (low, high) = buf.split_at_mut(half);
        fft_recursive(even, low);
        fft_recursive(odd, high);
    }

    for k in 0..half {
        let twiddle = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
        let t = twiddle * odd[k];
        buf[k] = even[k] + t;
        buf[k + half] = even[k] - t;
    }
}

/// Hann coefficient `0.5·(1 − cos(2π·i/(N−1)))`
pub fn hann_window(index: usize, size: usize) -> f64 {
    if size <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - (2.0 * PI * index as f64 / (size - 1) as f64).cos())
}

/// Precomputed Hann coefficients for a window of `size`
pub fn hann_table(size: usize) -> Vec<f64> {
    (0..size).map(|i| hann_window(i, size)).collect()
}

/// Multiply real samples by a Hann window spanning the whole slice
pub fn apply_window(samples: &mut [f64]) {
    let size = samples.len();
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= hann_window(i, size);
    }
}

/// Modulus of each element
pub fn magnitude(buf: &[Complex64]) -> Vec<f64> {
    buf.iter().map(|c| c.norm()).collect()
}
