//! Engine configuration
//!
//! Constants shared by the equalizer and analyzer, plus an optional
//! JSON-backed [`EngineConfig`] for callers that want to tune behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::{is_power_of_two, ProcessingMode, SizePolicy};
use crate::error::{Result, WaveqError};

/// Number of equalizer bands
pub const NUM_BANDS: usize = 10;

/// Center frequencies of the equalizer bands, in Hz
pub const BAND_FREQUENCIES: [f32; NUM_BANDS] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Default Q factor for every band
pub const DEFAULT_Q: f32 = std::f32::consts::SQRT_2;

/// Bands with |gain| at or below this are skipped entirely
pub const GAIN_DEADBAND_DB: f32 = 0.01;

/// Conventional slider range. Not enforced by the engine.
pub const MIN_GAIN_DB: f32 = -12.0;
pub const MAX_GAIN_DB: f32 = 12.0;

/// Spectrum analysis window length
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// Suggested polling interval for spectrum snapshots during playback (20 fps)
pub const SPECTRUM_POLL_INTERVAL_MS: u64 = 50;

/// Tunable engine behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analysis window for spectrum snapshots (power of two)
    pub spectrum_window_size: usize,
    /// How active bands are combined
    pub processing_mode: ProcessingMode,
    /// What to do with non-power-of-two buffers
    pub size_policy: SizePolicy,
    /// Gain deadband in dB
    pub deadband_db: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spectrum_window_size: DEFAULT_WINDOW_SIZE,
            processing_mode: ProcessingMode::default(),
            size_policy: SizePolicy::default(),
            deadband_db: GAIN_DEADBAND_DB,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| WaveqError::io(path, e))?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|e| WaveqError::Config {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        log::debug!("Loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Check values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.spectrum_window_size < 2 || !is_power_of_two(self.spectrum_window_size) {
            return Err(WaveqError::Config {
                reason: format!(
                    "spectrum_window_size {} is not a power of two of at least 2",
                    self.spectrum_window_size
                ),
            });
        }
        if !self.deadband_db.is_finite() || self.deadband_db < 0.0 {
            return Err(WaveqError::Config {
                reason: format!("deadband_db {} must be >= 0", self.deadband_db),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spectrum_window_size, 2048);
        assert_eq!(config.processing_mode, ProcessingMode::Combined);
        assert_eq!(config.size_policy, SizePolicy::Strict);
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "processing_mode": "sequential", "size_policy": "zero_pad" }}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.processing_mode, ProcessingMode::Sequential);
        assert_eq!(config.size_policy, SizePolicy::ZeroPad);
        assert_eq!(config.spectrum_window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_load_rejects_bad_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "spectrum_window_size": 1000 }}"#).unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, WaveqError::Config { .. }));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_band_ladder_is_ascending() {
        assert!(BAND_FREQUENCIES.windows(2).all(|w| w[0] < w[1]));
    }
}
