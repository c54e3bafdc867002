//! Ten-band frequency-domain equalizer
//!
//! Each band is a peaking response `A / sqrt(1 + (Q·(f/f0 − f0/f))²)` with
//! `A = 10^(gain/40)`, applied by scaling FFT bins of the whole channel and
//! transforming back. Bands whose gain sits inside the deadband are skipped,
//! so an all-zero parameter set leaves audio bit-for-bit untouched.

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::fft::{self, check_size};
use crate::config::{
    EngineConfig, BAND_FREQUENCIES, DEFAULT_Q, GAIN_DEADBAND_DB, NUM_BANDS,
};
use crate::engine::AudioBuffer;
use crate::error::{Result, WaveqError};

/// How active bands are combined into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Multiply all active responses into one curve, single FFT round trip
    #[default]
    Combined,
    /// One FFT round trip per active band, each on the previous band's output
    Sequential,
}

/// What to do with channels whose length is not a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Fail with `InvalidSize`, leaving the buffer untouched
    #[default]
    Strict,
    /// Zero-pad to the next power of two, filter, truncate back
    ZeroPad,
}

/// Peaking response of one band at `freq` Hz. DC passes unscaled.
pub fn peaking_response(freq: f64, center: f64, gain_db: f64, q: f64) -> f64 {
    if freq <= 0.0 {
        return 1.0;
    }
    let a = 10.0_f64.powf(gain_db / 40.0);
    let ratio = freq / center;
    a / (1.0 + (q * (ratio - 1.0 / ratio)).powi(2)).sqrt()
}

/// Single EQ band configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EQBand {
    /// Center frequency in Hz
    pub frequency: f32,
    /// Gain in dB, conventionally -12 to +12
    pub gain_db: f32,
    /// Q factor; higher is narrower
    pub q: f32,
}

impl EQBand {
    /// Create a new EQ band with the specified parameters
    pub fn new(frequency: f32, gain_db: f32, q: f32) -> Self {
        Self {
            frequency,
            gain_db,
            q,
        }
    }

    /// Validate band parameters
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(WaveqError::InvalidParameter {
                param: "frequency".to_string(),
                value: self.frequency.to_string(),
                expected: "a positive frequency in Hz".to_string(),
            });
        }

        if !self.gain_db.is_finite() {
            return Err(WaveqError::InvalidParameter {
                param: "gain_db".to_string(),
                value: self.gain_db.to_string(),
                expected: "a finite gain in dB".to_string(),
            });
        }

        if !self.q.is_finite() || self.q <= 0.0 {
            return Err(WaveqError::InvalidParameter {
                param: "q".to_string(),
                value: self.q.to_string(),
                expected: "a positive Q factor".to_string(),
            });
        }

        Ok(())
    }

    /// Check if this band has no audible effect
    pub fn is_bypass(&self, deadband_db: f32) -> bool {
        self.gain_db.abs() <= deadband_db
    }

    /// Linear magnitude of this band at `freq` Hz
    pub fn response_at(&self, freq: f64) -> f64 {
        peaking_response(freq, self.frequency as f64, self.gain_db as f64, self.q as f64)
    }
}

/// The ten bands on the fixed 32 Hz .. 16 kHz ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerParams {
    bands: [EQBand; NUM_BANDS],
}

impl Default for EqualizerParams {
    fn default() -> Self {
        Self::initialize()
    }
}

impl EqualizerParams {
    /// Neutral parameters: every band at 0 dB with Q = √2
    pub fn initialize() -> Self {
        Self {
            bands: BAND_FREQUENCIES.map(|frequency| EQBand::new(frequency, 0.0, DEFAULT_Q)),
        }
    }

    /// All bands in ladder order
    pub fn bands(&self) -> &[EQBand; NUM_BANDS] {
        &self.bands
    }

    /// Get a band by index
    pub fn band(&self, index: usize) -> Option<&EQBand> {
        self.bands.get(index)
    }

    /// Current gains in ladder order
    pub fn gains(&self) -> [f32; NUM_BANDS] {
        self.bands.map(|band| band.gain_db)
    }

    /// Set one band's gain in dB
    pub fn set_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        let band = self.band_mut(index)?;
        let updated = EQBand { gain_db, ..*band };
        updated.validate()?;
        *band = updated;
        Ok(())
    }

    /// Set one band's Q factor
    pub fn set_q(&mut self, index: usize, q: f32) -> Result<()> {
        let band = self.band_mut(index)?;
        let updated = EQBand { q, ..*band };
        updated.validate()?;
        *band = updated;
        Ok(())
    }

    /// Replace all gains at once; `gains` must hold exactly ten values
    pub fn set_gains(&mut self, gains: &[f32]) -> Result<()> {
        if gains.len() != NUM_BANDS {
            return Err(WaveqError::InvalidParameter {
                param: "gains".to_string(),
                value: format!("{} values", gains.len()),
                expected: format!("exactly {} values", NUM_BANDS),
            });
        }
        if let Some(bad) = gains.iter().find(|g| !g.is_finite()) {
            return Err(WaveqError::InvalidParameter {
                param: "gain_db".to_string(),
                value: bad.to_string(),
                expected: "a finite gain in dB".to_string(),
            });
        }

        for (band, &gain) in self.bands.iter_mut().zip(gains) {
            band.gain_db = gain;
        }
        Ok(())
    }

    /// Return every band to 0 dB
    pub fn reset(&mut self) {
        self.bands.iter_mut().for_each(|band| band.gain_db = 0.0);
    }

    /// Bands that would actually be applied
    pub fn active_bands(&self, deadband_db: f32) -> impl Iterator<Item = &EQBand> + '_ {
        self.bands.iter().filter(move |band| !band.is_bypass(deadband_db))
    }

    /// True when processing would be a no-op
    pub fn is_neutral(&self, deadband_db: f32) -> bool {
        self.active_bands(deadband_db).next().is_none()
    }

    /// Composite linear magnitude of the active bands at `freq` Hz
    pub fn response_at(&self, freq: f64) -> f64 {
        self.active_bands(GAIN_DEADBAND_DB)
            .map(|band| band.response_at(freq))
            .product()
    }

    fn band_mut(&mut self, index: usize) -> Result<&mut EQBand> {
        self.bands
            .get_mut(index)
            .ok_or_else(|| WaveqError::InvalidParameter {
                param: "band".to_string(),
                value: index.to_string(),
                expected: format!("0-{}", NUM_BANDS - 1),
            })
    }
}

/// Build the default ten-band parameter set
pub fn initialize_equalizer() -> EqualizerParams {
    EqualizerParams::initialize()
}

/// Apply a single peaking band to every channel of `buffer`
///
/// Channel length must be a power of two.
pub fn apply_band(buffer: &mut AudioBuffer, band: &EQBand) -> Result<()> {
    band.validate()?;
    filter_channels(buffer, SizePolicy::Strict, |freq| band.response_at(freq))
}

/// Apply all active bands with the default mode and size policy
pub fn process_block(buffer: &mut AudioBuffer, params: &EqualizerParams) -> Result<()> {
    Equalizer::with_params(params.clone()).process(buffer)
}

/// Equalizer parameters plus processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equalizer {
    params: EqualizerParams,
    mode: ProcessingMode,
    size_policy: SizePolicy,
    deadband_db: f32,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self {
            params: EqualizerParams::initialize(),
            mode: ProcessingMode::default(),
            size_policy: SizePolicy::default(),
            deadband_db: GAIN_DEADBAND_DB,
        }
    }
}

impl Equalizer {
    /// Create a neutral equalizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an equalizer with the given band parameters
    pub fn with_params(params: EqualizerParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Create a neutral equalizer using the processing settings in `config`
    ///
    /// `config` is validated first, so a negative deadband cannot switch
    /// 0 dB bands on.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mode: config.processing_mode,
            size_policy: config.size_policy,
            deadband_db: config.deadband_db,
            ..Default::default()
        })
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_size_policy(mut self, size_policy: SizePolicy) -> Self {
        self.size_policy = size_policy;
        self
    }

    pub fn params(&self) -> &EqualizerParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut EqualizerParams {
        &mut self.params
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn size_policy(&self) -> SizePolicy {
        self.size_policy
    }

    /// Filter `buffer` in place with every band outside the deadband
    ///
    /// With no active bands the buffer is not touched at all.
    pub fn process(&self, buffer: &mut AudioBuffer) -> Result<()> {
        let active: Vec<EQBand> = self.params.active_bands(self.deadband_db).copied().collect();
        if active.is_empty() || buffer.is_empty() {
            return Ok(());
        }
        for band in &active {
            band.validate()?;
        }

        debug!(
            "equalizing {} frames x {} ch with {} band(s), {:?} mode",
            buffer.num_frames(),
            buffer.channels(),
            active.len(),
            self.mode
        );

        match self.mode {
            ProcessingMode::Combined => filter_channels(buffer, self.size_policy, |freq| {
                active.iter().map(|band| band.response_at(freq)).product::<f64>()
            }),
            ProcessingMode::Sequential => {
                // Validate once up front so a failure never leaves a half-filtered buffer
                if self.size_policy == SizePolicy::Strict {
                    check_size(buffer.num_frames())?;
                }
                for band in &active {
                    debug!("applying {} Hz band at {:+.2} dB", band.frequency, band.gain_db);
                    filter_channels(buffer, self.size_policy, |freq| band.response_at(freq))?;
                }
                Ok(())
            }
        }
    }
}

/// Transform each channel, scale its bins by `response`, transform back
fn filter_channels<F>(buffer: &mut AudioBuffer, policy: SizePolicy, response: F) -> Result<()>
where
    F: Fn(f64) -> f64,
{
    let frames = buffer.num_frames();
    let fft_len = match policy {
        SizePolicy::Strict => {
            check_size(frames)?;
            frames
        }
        SizePolicy::ZeroPad => frames.max(1).next_power_of_two(),
    };
    if fft_len != frames {
        debug!("zero-padding {} frames to {}", frames, fft_len);
    }

    let sample_rate = buffer.sample_rate() as f64;
    let mut spectrum: Vec<Complex64> = Vec::new();
    spectrum
        .try_reserve_exact(fft_len)
        .map_err(|e| WaveqError::OutOfMemory {
            details: format!("equalizer spectrum of {} bins: {}", fft_len, e),
        })?;

    let channels = buffer.channels() as usize;
    let mut filtered: Vec<Vec<f32>> = Vec::new();
    filtered
        .try_reserve_exact(channels)
        .map_err(|e| WaveqError::OutOfMemory {
            details: format!("equalizer output for {} channels: {}", channels, e),
        })?;

    // Every channel is filtered before any is written back, so an error
    // leaves the buffer as it was
    for channel in 0..channels {
        let samples = buffer.channel_samples(channel);

        spectrum.clear();
        spectrum.extend(samples.iter().map(|&s| Complex64::new(s as f64, 0.0)));
        spectrum.resize(fft_len, Complex64::new(0.0, 0.0));

        fft::fft(&mut spectrum)?;
        scale_bins(&mut spectrum, sample_rate, &response);
        fft::ifft(&mut spectrum)?;

        filtered.push(spectrum[..frames].iter().map(|c| c.re as f32).collect());
    }

    for (channel, samples) in filtered.iter().enumerate() {
        buffer.set_channel_samples(channel, samples);
    }

    Ok(())
}

/// Scale each positive-frequency bin and its conjugate mirror by the same gain
fn scale_bins<F>(spectrum: &mut [Complex64], sample_rate: f64, response: &F)
where
    F: Fn(f64) -> f64,
{
    let n = spectrum.len();
    for i in 1..=n / 2 {
        let gain = response(i as f64 * sample_rate / n as f64);
        spectrum[i] *= gain;
        if n - i != i {
            spectrum[n - i] *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    /// Mono sine at an exact bin frequency so there is no leakage
    fn bin_aligned_sine(bin: usize, len: usize, sample_rate: u32) -> (AudioBuffer, f64) {
        let frequency = bin as f64 * sample_rate as f64 / len as f64;
        (AudioBuffer::sine_wave(frequency, len, sample_rate), frequency)
    }

    fn calculate_rms(samples: &[f32]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        (sum / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_initialize_defaults() {
        let params = initialize_equalizer();
        assert_eq!(params.bands().len(), 10);

        for (band, &freq) in params.bands().iter().zip(BAND_FREQUENCIES.iter()) {
            assert_eq!(band.frequency, freq);
            assert_eq!(band.gain_db, 0.0);
            assert_relative_eq!(band.q, 1.4142, epsilon = 1e-4);
        }
        assert!(params.is_neutral(GAIN_DEADBAND_DB));
    }

    #[test]
    fn test_peaking_response_shape() {
        // Unity gain at DC, A at the center
        assert_eq!(peaking_response(0.0, 1000.0, 12.0, 1.0), 1.0);
        assert_relative_eq!(
            peaking_response(1000.0, 1000.0, 12.0, 1.0),
            10.0_f64.powf(12.0 / 40.0),
            epsilon = 1e-12
        );

        // Symmetric on a log-frequency axis
        assert_relative_eq!(
            peaking_response(500.0, 1000.0, 6.0, 2.0),
            peaking_response(2000.0, 1000.0, 6.0, 2.0),
            epsilon = 1e-12
        );

        // Higher Q falls off faster
        assert!(peaking_response(1500.0, 1000.0, 6.0, 4.0) < peaking_response(1500.0, 1000.0, 6.0, 1.0));
    }

    #[test]
    fn test_gain_monotonic_at_center() {
        let mut params = EqualizerParams::initialize();
        params.set_gain(2, -4.0).unwrap();
        params.set_gain(7, 5.0).unwrap();

        let center = params.band(4).unwrap().frequency as f64;
        let mut previous = f64::NEG_INFINITY;
        for step in -24..=24 {
            let gain = step as f32 * 0.5;
            // Skip the deadband where the band switches off
            if gain.abs() <= GAIN_DEADBAND_DB {
                continue;
            }
            params.set_gain(4, gain).unwrap();
            let response = params.response_at(center);
            assert!(response > previous, "response must rise with gain at {} dB", gain);
            previous = response;
        }
    }

    #[test_case(ProcessingMode::Combined ; "combined")]
    #[test_case(ProcessingMode::Sequential ; "sequential")]
    fn test_neutral_is_bit_exact(mode: ProcessingMode) {
        let mut buffer = AudioBuffer::sine_wave(440.0, 1024, 44100);
        let original = buffer.clone();

        let mut eq = Equalizer::new().with_mode(mode);
        eq.params_mut().set_gain(3, 0.005).unwrap();
        eq.process(&mut buffer).unwrap();

        assert_eq!(buffer, original);
    }

    #[test]
    fn test_boost_and_cut_at_center() {
        let (source, frequency) = bin_aligned_sine(85, 4096, 48000);
        let original_rms = calculate_rms(source.samples());

        let band = EQBand::new(frequency as f32, 6.0, DEFAULT_Q);
        let mut boosted = source.clone();
        apply_band(&mut boosted, &band).unwrap();
        let ratio = calculate_rms(boosted.samples()) / original_rms;
        assert_relative_eq!(ratio, 10.0_f64.powf(6.0 / 40.0), epsilon = 1e-3);

        let band = EQBand::new(frequency as f32, -6.0, DEFAULT_Q);
        let mut cut = source.clone();
        apply_band(&mut cut, &band).unwrap();
        let ratio = calculate_rms(cut.samples()) / original_rms;
        assert_relative_eq!(ratio, 10.0_f64.powf(-6.0 / 40.0), epsilon = 1e-3);
    }

    #[test]
    fn test_combined_matches_sequential() {
        let mut params = EqualizerParams::initialize();
        params.set_gains(&[3.0, 0.0, -2.0, 0.0, 6.0, 0.0, 0.0, -5.0, 0.0, 1.0]).unwrap();

        let source = AudioBuffer::sine_wave(523.0, 2048, 44100);
        let mut combined = source.clone();
        let mut sequential = source.clone();

        Equalizer::with_params(params.clone())
            .with_mode(ProcessingMode::Combined)
            .process(&mut combined)
            .unwrap();
        Equalizer::with_params(params)
            .with_mode(ProcessingMode::Sequential)
            .process(&mut sequential)
            .unwrap();

        for (a, b) in combined.samples().iter().zip(sequential.samples()) {
            assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
        }
        assert_ne!(combined, source);
    }

    #[test_case(ProcessingMode::Combined ; "combined")]
    #[test_case(ProcessingMode::Sequential ; "sequential")]
    fn test_strict_rejects_non_power_of_two(mode: ProcessingMode) {
        let mut buffer = AudioBuffer::sine_wave(440.0, 1000, 44100);
        let original = buffer.clone();

        let mut eq = Equalizer::new().with_mode(mode);
        eq.params_mut().set_gain(5, 6.0).unwrap();

        let err = eq.process(&mut buffer).unwrap_err();
        assert!(matches!(err, WaveqError::InvalidSize { len: 1000, .. }));
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_zero_pad_keeps_length() {
        let mut buffer = AudioBuffer::sine_wave(1000.0, 1000, 48000);
        let original_rms = calculate_rms(buffer.samples());

        let mut eq = Equalizer::new().with_size_policy(SizePolicy::ZeroPad);
        eq.params_mut().set_gain(5, 12.0).unwrap();
        eq.process(&mut buffer).unwrap();

        assert_eq!(buffer.len(), 1000);
        assert!(buffer.is_valid());
        assert!(calculate_rms(buffer.samples()) > original_rms * 1.2);
    }

    #[test]
    fn test_channels_filtered_independently() {
        let (left, frequency) = bin_aligned_sine(32, 1024, 32000);
        let mut interleaved = Vec::with_capacity(2048);
        for &s in left.samples() {
            interleaved.push(s);
            interleaved.push(0.0);
        }
        let mut buffer = AudioBuffer::new(interleaved, 2, 32000).unwrap();

        apply_band(&mut buffer, &EQBand::new(frequency as f32, 6.0, 2.0)).unwrap();

        let right = buffer.channel_samples(1);
        assert!(right.iter().all(|s| s.abs() < 1e-6));
        let ratio = calculate_rms(&buffer.channel_samples(0)) / calculate_rms(left.samples());
        assert_relative_eq!(ratio, 10.0_f64.powf(6.0 / 40.0), epsilon = 1e-3);
    }

    #[test]
    fn test_stereo_matches_per_channel_mono() {
        let left = AudioBuffer::sine_wave(300.0, 512, 16000);
        let right = AudioBuffer::sine_wave(2500.0, 512, 16000);
        let interleaved: Vec<f32> = left
            .samples()
            .iter()
            .zip(right.samples())
            .flat_map(|(&l, &r)| [l, r])
            .collect();
        let mut stereo = AudioBuffer::new(interleaved, 2, 16000).unwrap();

        let mut eq = Equalizer::new();
        eq.params_mut().set_gain(4, 9.0).unwrap();
        eq.process(&mut stereo).unwrap();

        for (channel, mono) in [left, right].into_iter().enumerate() {
            let mut mono = mono;
            eq.process(&mut mono).unwrap();
            assert_eq!(stereo.channel_samples(channel), mono.samples());
        }
    }

    #[test]
    fn test_dc_passes_through() {
        let mut buffer = AudioBuffer::new(vec![0.25; 512], 1, 44100).unwrap();
        apply_band(&mut buffer, &EQBand::new(64.0, 12.0, 1.0)).unwrap();

        for &s in buffer.samples() {
            assert_relative_eq!(s, 0.25, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_parameter_validation() {
        let mut params = EqualizerParams::initialize();
        assert!(matches!(
            params.set_gain(10, 3.0),
            Err(WaveqError::InvalidParameter { .. })
        ));
        assert!(params.set_gain(0, f32::NAN).is_err());
        assert!(params.set_q(0, 0.0).is_err());
        assert!(params.set_gains(&[1.0; 9]).is_err());
        assert!(params.set_gains(&[f32::INFINITY; 10]).is_err());
        assert!(EQBand::new(-5.0, 0.0, 1.0).validate().is_err());

        // Failed updates leave the parameters unchanged
        assert_eq!(params, EqualizerParams::initialize());
    }

    #[test]
    fn test_set_gains_and_reset() {
        let mut params = EqualizerParams::initialize();
        let gains = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0, 5.0, -5.0];
        params.set_gains(&gains).unwrap();
        assert_eq!(params.gains(), gains);
        assert_eq!(params.active_bands(GAIN_DEADBAND_DB).count(), 10);

        params.reset();
        assert!(params.is_neutral(GAIN_DEADBAND_DB));
    }

    #[test]
    fn test_from_config_rejects_negative_deadband() {
        let config = EngineConfig {
            deadband_db: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            Equalizer::from_config(&config),
            Err(WaveqError::Config { .. })
        ));

        let mut buffer = AudioBuffer::sine_wave(440.0, 1024, 44100);
        let original = buffer.clone();
        Equalizer::from_config(&EngineConfig::default())
            .unwrap()
            .process(&mut buffer)
            .unwrap();
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_serialization() {
        let mut eq = Equalizer::new().with_mode(ProcessingMode::Sequential);
        eq.params_mut().set_gain(1, -3.5).unwrap();

        let json = serde_json::to_value(&eq).unwrap();
        assert_eq!(json["mode"], "sequential");
        assert_eq!(json["params"]["bands"][1]["gain_db"], -3.5);
    }
}
