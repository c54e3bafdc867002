//! Audio buffer type shared by the codec, equalizer and analyzer

use crate::error::{Result, WaveqError};

/// Interleaved audio buffer
///
/// Samples are stored in interleaved format: [L0, R0, L1, R1, ...] and are
/// normalized to -1.0..1.0. The sample count is always a multiple of the
/// channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved sample data
    samples: Vec<f32>,
    /// Number of channels (1 = mono, 2 = stereo)
    channels: u16,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from existing interleaved samples
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(WaveqError::InvalidParameter {
                param: "channels".to_string(),
                value: "0".to_string(),
                expected: "at least one channel".to_string(),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(WaveqError::InvalidParameter {
                param: "samples".to_string(),
                value: samples.len().to_string(),
                expected: format!("a multiple of the channel count {}", channels),
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Create an empty buffer with room for `capacity` samples
    ///
    /// Allocation failure is reported as [`WaveqError::OutOfMemory`]
    /// instead of aborting the process.
    pub fn with_capacity(capacity: usize, channels: u16, sample_rate: u32) -> Result<Self> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(capacity)
            .map_err(|e| WaveqError::OutOfMemory {
                details: format!("cannot allocate {} samples: {}", capacity, e),
            })?;
        Self::new(samples, channels, sample_rate)
    }

    /// Create a silent buffer holding `num_frames` frames
    pub fn silence(num_frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; num_frames * channels.max(1) as usize],
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Create a mono sine wave test tone of `num_frames` samples
    pub fn sine_wave(frequency: f64, num_frames: usize, sample_rate: u32) -> Self {
        let angular = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;
        let samples = (0..num_frames)
            .map(|i| (angular * i as f64).sin() as f32)
            .collect();

        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Append one sample; callers keep frames whole
    pub(crate) fn push(&mut self, sample: f32) {
        self.samples.push(sample);
    }

    /// Drop samples that do not form a whole frame
    pub(crate) fn truncate_to_frames(&mut self) {
        let whole = self.samples.len() - self.samples.len() % self.channels as usize;
        self.samples.truncate(whole);
    }

    /// Get a reference to all interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get a mutable reference to all interleaved samples
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Consume the buffer, returning the interleaved samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Total number of samples across all channels
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Copy one channel out of the interleaved data
    pub fn channel_samples(&self, channel: usize) -> Vec<f32> {
        if channel >= self.channels as usize {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Overwrite one channel from a slice of per-channel samples
    ///
    /// Extra input is ignored; missing input leaves the tail untouched.
    pub fn set_channel_samples(&mut self, channel: usize, data: &[f32]) {
        if channel >= self.channels as usize {
            return;
        }
        let stride = self.channels as usize;
        for (dst, &src) in self
            .samples
            .iter_mut()
            .skip(channel)
            .step_by(stride)
            .zip(data)
        {
            *dst = src;
        }
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
    }

    /// Check if buffer contains only finite samples
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }
}
