//! Signal processing
//!
//! The transform engine plus the two consumers built on it: the ten-band
//! equalizer and the spectrum analyzer. Everything here is synchronous and
//! holds no state between calls beyond what the caller owns.

pub mod eq;
pub mod fft;
pub mod spectrum;

pub use eq::{
    apply_band, initialize_equalizer, peaking_response, process_block, EQBand, Equalizer,
    EqualizerParams, ProcessingMode, SizePolicy,
};
pub use fft::{apply_window, fft, hann_window, ifft, is_power_of_two, magnitude, transform, Direction};
pub use spectrum::{snapshot, SpectrumAnalyzer, SpectrumSnapshot};
