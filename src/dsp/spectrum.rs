//! Spectrum snapshots for visualization
//!
//! A snapshot is the Hann-windowed magnitude spectrum of `window_size`
//! consecutive samples, normalized by the window size. Callers poll it
//! (e.g. every [`SPECTRUM_POLL_INTERVAL_MS`](crate::config::SPECTRUM_POLL_INTERVAL_MS))
//! while holding read access to the buffer.

use num_complex::Complex64;
use serde::Serialize;

use super::fft::{self, hann_table};
use crate::config::{EngineConfig, DEFAULT_WINDOW_SIZE};
use crate::engine::AudioBuffer;
use crate::error::{Result, WaveqError};

/// Floor used when converting magnitudes to dB
const MIN_DB: f64 = -120.0;

/// Magnitudes of the first `window_size / 2` bins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumSnapshot {
    magnitudes: Vec<f64>,
    window_size: usize,
    sample_rate: u32,
    offset: usize,
}

impl SpectrumSnapshot {
    /// Normalized bin magnitudes, DC first
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Number of bins (half the window size)
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample offset the window started at
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Center frequency of bin `index` in Hz
    pub fn bin_frequency(&self, index: usize) -> f64 {
        index as f64 * self.sample_rate as f64 / self.window_size as f64
    }

    /// Index of the bin closest to `freq`, if it lies below Nyquist
    pub fn bin_for_frequency(&self, freq: f64) -> Option<usize> {
        if !freq.is_finite() || freq < 0.0 || self.sample_rate == 0 {
            return None;
        }
        let index = (freq * self.window_size as f64 / self.sample_rate as f64).round() as usize;
        (index < self.magnitudes.len()).then_some(index)
    }

    /// Magnitude of the bin closest to `freq`
    pub fn magnitude_at(&self, freq: f64) -> Option<f64> {
        self.bin_for_frequency(freq).map(|i| self.magnitudes[i])
    }

    /// Loudest bin as (index, magnitude)
    pub fn peak_bin(&self) -> Option<(usize, f64)> {
        self.magnitudes
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Magnitudes in dB, floored at -120 dB
    pub fn to_db(&self) -> Vec<f64> {
        self.magnitudes
            .iter()
            .map(|&m| if m > 0.0 { (20.0 * m.log10()).max(MIN_DB) } else { MIN_DB })
            .collect()
    }
}

/// Reusable analyzer holding the window size and its Hann table
#[derive(Debug, Clone)]
pub struct SpectrumAnalyzer {
    window_size: usize,
    window: Vec<f64>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            window: hann_table(DEFAULT_WINDOW_SIZE),
        }
    }
}

impl SpectrumAnalyzer {
    /// Create an analyzer; `window_size` must be a power of two of at least 2
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size < 2 || !fft::is_power_of_two(window_size) {
            return Err(WaveqError::InvalidSize {
                len: window_size,
                reason: "spectrum window must be a power of two of at least 2".to_string(),
            });
        }
        Ok(Self {
            window_size,
            window: hann_table(window_size),
        })
    }

    /// Create an analyzer with the window size from `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.spectrum_window_size)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Take a snapshot starting at interleaved sample `offset`
    ///
    /// Samples past the end of the buffer are treated as silence.
    pub fn snapshot(&self, buffer: &AudioBuffer, offset: usize) -> Result<SpectrumSnapshot> {
        let source = buffer.samples().get(offset..).unwrap_or_default();

        let mut bins: Vec<Complex64> = Vec::new();
        bins.try_reserve_exact(self.window_size)
            .map_err(|e| WaveqError::OutOfMemory {
                details: format!("spectrum window of {} bins: {}", self.window_size, e),
            })?;
        bins.extend(
            self.window
                .iter()
                .enumerate()
                .map(|(i, &w)| Complex64::new(source.get(i).copied().unwrap_or(0.0) as f64 * w, 0.0)),
        );

        fft::fft(&mut bins)?;

        let scale = self.window_size as f64;
        let magnitudes = bins[..self.window_size / 2]
            .iter()
            .map(|c| c.norm() / scale)
            .collect();

        Ok(SpectrumSnapshot {
            magnitudes,
            window_size: self.window_size,
            sample_rate: buffer.sample_rate(),
            offset,
        })
    }
}

/// One-shot snapshot of `window_size` samples starting at `offset`
pub fn snapshot(buffer: &AudioBuffer, offset: usize, window_size: usize) -> Result<SpectrumSnapshot> {
    SpectrumAnalyzer::new(window_size)?.snapshot(buffer, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_snapshot_length_and_peak() {
        // Bin 64 of a 1024 window at 44100 Hz
        let freq = 64.0 * 44100.0 / 1024.0;
        let buffer = AudioBuffer::sine_wave(freq, 4096, 44100);

        let snap = snapshot(&buffer, 0, 1024).unwrap();
        assert_eq!(snap.len(), 512);
        assert_eq!(snap.window_size(), 1024);

        let (peak, magnitude) = snap.peak_bin().unwrap();
        assert_eq!(peak, 64);
        // Unit sine through a Hann window: amplitude/2 * coherent gain 0.5
        assert_relative_eq!(magnitude, 0.25, epsilon = 0.01);
        assert_relative_eq!(snap.bin_frequency(peak), freq, epsilon = 1e-9);
        assert_eq!(snap.bin_for_frequency(freq), Some(64));
    }

    #[test]
    fn test_silence_is_flat_zero() {
        let buffer = AudioBuffer::silence(2048, 1, 48000);
        let snap = snapshot(&buffer, 0, 256).unwrap();
        assert!(snap.magnitudes().iter().all(|&m| m == 0.0));
        assert!(snap.to_db().iter().all(|&db| db == MIN_DB));
    }

    #[test]
    fn test_zero_pads_past_end() {
        let buffer = AudioBuffer::new(vec![0.5; 100], 1, 8000).unwrap();

        let inside = snapshot(&buffer, 0, 64).unwrap();
        let straddling = snapshot(&buffer, 80, 64).unwrap();
        let beyond = snapshot(&buffer, 10_000, 64).unwrap();

        assert!(straddling.magnitudes()[0] < inside.magnitudes()[0]);
        assert!(beyond.magnitudes().iter().all(|&m| m == 0.0));
        assert_eq!(beyond.offset(), 10_000);
    }

    #[test]
    fn test_rejects_bad_window() {
        let buffer = AudioBuffer::silence(16, 1, 8000);
        for size in [0, 1, 3, 1000] {
            assert!(matches!(
                snapshot(&buffer, 0, size),
                Err(WaveqError::InvalidSize { .. })
            ));
        }
    }

    #[test]
    fn test_analyzer_is_stateless_between_calls() {
        let buffer = AudioBuffer::sine_wave(1000.0, 8192, 48000);
        let analyzer = SpectrumAnalyzer::default();

        let first = analyzer.snapshot(&buffer, 512).unwrap();
        let second = analyzer.snapshot(&buffer, 512).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), DEFAULT_WINDOW_SIZE / 2);
    }

    #[test]
    fn test_magnitude_at_out_of_range() {
        let buffer = AudioBuffer::silence(64, 1, 8000);
        let snap = snapshot(&buffer, 0, 64).unwrap();
        assert!(snap.magnitude_at(4000.0).is_none());
        assert!(snap.magnitude_at(-1.0).is_none());
        assert_eq!(snap.magnitude_at(125.0), Some(0.0));
    }
}
