//! Audio Engine Module
//!
//! Audio data and its container format:
//! - Interleaved sample buffer
//! - WAV decode/encode

pub mod buffer;
pub mod wav;

pub use buffer::AudioBuffer;
pub use wav::{decode, encode, read_wav, write_wav, WavHeader};
