//! waveq - offline PCM equalizer pipeline
//!
//! Decodes WAV files into normalized samples, applies a ten-band
//! frequency-domain parametric equalizer, takes magnitude spectra for
//! display, and writes the result back out as 16-bit WAV.
//!
//! # Pipeline
//!
//! ```no_run
//! use std::path::Path;
//! use waveq::dsp::{process_block, snapshot, EqualizerParams};
//! use waveq::engine::{read_wav, write_wav};
//!
//! # fn main() -> waveq::Result<()> {
//! let mut buffer = read_wav(Path::new("in.wav"))?;
//! let mut params = EqualizerParams::initialize();
//! params.set_gain(4, 6.0)?;
//! process_block(&mut buffer, &params)?;
//! let spectrum = snapshot(&buffer, 0, 2048)?;
//! println!("peak bin: {:?}", spectrum.peak_bin());
//! write_wav(Path::new("out.wav"), &buffer)?;
//! # Ok(())
//! # }
//! ```
//!
//! Nothing in the library locks. A caller that polls spectra while
//! another thread equalizes must serialize access to the buffer itself.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::AudioBuffer;
pub use error::{Result, WaveqError};
