//! CLI Module
//!
//! Command-line front end over the library: inspect a WAV file, equalize
//! it, or print a spectrum snapshot.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::dsp::ProcessingMode;

/// waveq - ten-band FFT equalizer for WAV files
#[derive(Parser, Debug)]
#[command(name = "waveq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON engine configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the header and basic levels of a WAV file
    Info {
        /// Input WAV file
        input: PathBuf,
    },

    /// Equalize a WAV file and write the result as 16-bit PCM
    Eq {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Band gain as INDEX=DB (band 0 = 32 Hz ... band 9 = 16 kHz), repeatable
        #[arg(short, long = "gain", value_parser = parse_band_value)]
        gains: Vec<(usize, f32)>,

        /// Band Q factor as INDEX=Q, repeatable
        #[arg(short, long = "q", value_parser = parse_band_value)]
        q_factors: Vec<(usize, f32)>,

        /// How bands are combined (overrides the config file)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Zero-pad lengths that are not a power of two
        #[arg(long)]
        pad: bool,
    },

    /// Print a magnitude spectrum snapshot
    Spectrum {
        /// Input WAV file
        input: PathBuf,

        /// Start position in interleaved samples
        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Analysis window size (power of two; overrides the config file)
        #[arg(short, long)]
        window: Option<usize>,

        /// Number of loudest bins to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Band combination mode on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Combined,
    Sequential,
}

impl From<ModeArg> for ProcessingMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Combined => ProcessingMode::Combined,
            ModeArg::Sequential => ProcessingMode::Sequential,
        }
    }
}

/// Parse `INDEX=VALUE`, e.g. `4=+6.5`
pub fn parse_band_value(s: &str) -> Result<(usize, f32), String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{}'", s))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad band index '{}': {}", index, e))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("bad value '{}': {}", value, e))?;
    Ok((index, value))
}
