//! CLI Command Implementations
//!
//! Each command plays the part of the playback front end: it owns the
//! buffer, hands it to the library and prints what comes back.

use std::path::Path;

use log::info;

use crate::config::{EngineConfig, BAND_FREQUENCIES};
use crate::dsp::{Equalizer, ProcessingMode, SizePolicy, SpectrumAnalyzer};
use crate::engine::{read_wav, write_wav, WavHeader};
use crate::error::{Result, WaveqError};

/// Print header fields and levels of a WAV file.
pub fn info(input: &Path) -> Result<()> {
    let bytes = std::fs::read(input).map_err(|e| WaveqError::io(input, e))?;
    let (header, data) = WavHeader::parse(&bytes)?;
    let buffer = crate::engine::decode(&bytes)?;

    println!("File: {}", input.display());
    println!("Format: PCM {}-bit", header.bits_per_sample);
    println!("Channels: {}", header.channels);
    println!("Sample rate: {} Hz", header.sample_rate);
    println!("Byte rate: {} B/s", header.byte_rate);
    println!("Block align: {} B", header.block_align);
    println!("Data: {} bytes at offset {}", header.data_size, data.start);
    println!("Frames: {} ({:.3}s)", buffer.num_frames(), buffer.duration());

    let peak = buffer.peak();
    if peak > 0.0 {
        println!("Peak: {:.1} dBFS", 20.0 * peak.log10());
    } else {
        println!("Peak: silent");
    }

    Ok(())
}

/// Decode, equalize and re-encode a WAV file.
pub fn equalize(
    input: &Path,
    output: &Path,
    gains: &[(usize, f32)],
    q_factors: &[(usize, f32)],
    mode: Option<ProcessingMode>,
    pad: bool,
    config: &EngineConfig,
) -> Result<()> {
    let mut eq = Equalizer::from_config(config)?;
    if let Some(mode) = mode {
        eq = eq.with_mode(mode);
    }
    if pad {
        eq = eq.with_size_policy(SizePolicy::ZeroPad);
    }

    for &(index, gain_db) in gains {
        eq.params_mut().set_gain(index, gain_db)?;
    }
    for &(index, q) in q_factors {
        eq.params_mut().set_q(index, q)?;
    }

    let mut buffer = read_wav(input)?;

    info!(
        "Equalizing {} with gains {:?} ({:?} mode)",
        input.display(),
        eq.params().gains(),
        eq.mode()
    );
    eq.process(&mut buffer)?;

    let clipped = buffer.samples().iter().filter(|s| s.abs() > 1.0).count();
    if clipped > 0 {
        log::warn!("{} sample(s) exceed full scale and will be clipped", clipped);
    }

    write_wav(output, &buffer)?;

    println!("Input: {}", input.display());
    println!("Output: {}", output.display());
    for (band, freq) in eq.params().bands().iter().zip(BAND_FREQUENCIES) {
        if band.gain_db != 0.0 {
            println!("  {:>7} Hz: {:+.1} dB (Q {:.2})", freq, band.gain_db, band.q);
        }
    }

    Ok(())
}

/// Print the loudest bins of a spectrum snapshot, or the whole snapshot as JSON.
pub fn spectrum(
    input: &Path,
    offset: usize,
    window: Option<usize>,
    top: usize,
    json: bool,
    config: &EngineConfig,
) -> Result<()> {
    let analyzer = match window {
        Some(size) => SpectrumAnalyzer::new(size)?,
        None => SpectrumAnalyzer::from_config(config)?,
    };
    let buffer = read_wav(input)?;
    let snapshot = analyzer.snapshot(&buffer, offset)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let mut bins: Vec<(usize, f64)> = snapshot.magnitudes().iter().copied().enumerate().collect();
    bins.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!(
        "Spectrum of {} at sample {} ({}-point window)",
        input.display(),
        offset,
        snapshot.window_size()
    );
    let db = snapshot.to_db();
    for (index, magnitude) in bins.into_iter().take(top) {
        println!(
            "  bin {:>5} {:>9.1} Hz  {:.6}  ({:.1} dB)",
            index,
            snapshot.bin_frequency(index),
            magnitude,
            db[index]
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AudioBuffer;
    use tempfile::tempdir;

    #[test]
    fn test_equalize_writes_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        let tone = AudioBuffer::sine_wave(1000.0, 4096, 48000);
        write_wav(&input, &tone).unwrap();

        equalize(
            &input,
            &output,
            &[(5, -6.0)],
            &[(5, 2.0)],
            Some(ProcessingMode::Sequential),
            false,
            &EngineConfig::default(),
        )
        .unwrap();

        let result = read_wav(&output).unwrap();
        assert_eq!(result.len(), 4096);
        assert!(result.peak() < tone.peak());
    }

    #[test]
    fn test_equalize_rejects_bad_band_before_io() {
        let dir = tempdir().unwrap();
        let err = equalize(
            &dir.path().join("missing.wav"),
            &dir.path().join("out.wav"),
            &[(12, 3.0)],
            &[],
            None,
            false,
            &EngineConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, WaveqError::InvalidParameter { .. }));
        assert!(!dir.path().join("out.wav").exists());
    }

    #[test]
    fn test_info_and_spectrum_on_missing_file() {
        let missing = Path::new("/nonexistent/waveq/input.wav");
        assert!(matches!(info(missing), Err(WaveqError::FileNotFound { .. })));
        assert!(matches!(
            spectrum(missing, 0, Some(256), 5, false, &EngineConfig::default()),
            Err(WaveqError::FileNotFound { .. })
        ));
    }
}
