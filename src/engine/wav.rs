//! WAV container codec
//!
//! Parses RIFF/WAVE bytes into an [`AudioBuffer`] and serializes buffers
//! back to canonical 16-bit PCM.
//!
//! Decoding walks the chunk list instead of assuming a fixed 44-byte
//! header, so files carrying `LIST`/`JUNK`/`bext` metadata load fine.
//! Only PCM (format tag 1) at 16 or 24 bits is accepted.
//!
//! Encoding always produces 16-bit PCM with the canonical 44-byte header,
//! whatever depth the buffer was decoded from.

use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use log::{debug, info, warn};

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, WaveqError};

/// PCM format tag in the `fmt ` chunk
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Size of the canonical header written by [`encode`]
pub const CANONICAL_HEADER_LEN: usize = 44;

/// Declared data sizes meaning "the rest of the file"
const STREAMING_SENTINELS: [u32; 2] = [0, u32::MAX];

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_BODY_LEN: usize = 16;

/// Flat view of the RIFF/WAVE header fields
///
/// Only used transiently while decoding or encoding. When produced by
/// [`WavHeader::parse`], `data_size` holds the number of data bytes actually
/// available rather than the declared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Header for a 16-bit PCM stream of `num_samples` interleaved samples
    pub fn pcm16(channels: u16, sample_rate: u32, num_samples: usize) -> Result<Self> {
        let data_size = num_samples
            .checked_mul(2)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| n.checked_add(36).is_some())
            .ok_or_else(|| WaveqError::UnsupportedFormat {
                format: format!("{} samples exceed the 4 GiB RIFF limit", num_samples),
            })?;

        let block_align = channels.checked_mul(2);
        let byte_rate = block_align.and_then(|align| sample_rate.checked_mul(align as u32));
        let (Some(block_align), Some(byte_rate)) = (block_align, byte_rate) else {
            return Err(WaveqError::UnsupportedFormat {
                format: format!("{} channels @ {} Hz", channels, sample_rate),
            });
        };

        Ok(Self {
            riff_size: 36 + data_size,
            format_tag: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample: 16,
            data_size,
        })
    }

    /// Bytes per single-channel sample
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Serialize as the canonical 44-byte header
    pub fn to_bytes(&self) -> [u8; CANONICAL_HEADER_LEN] {
        let mut out = [0u8; CANONICAL_HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.riff_size.to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&(FMT_BODY_LEN as u32).to_le_bytes());
        out[20..22].copy_from_slice(&self.format_tag.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    /// Validate the RIFF/WAVE structure and locate the sample data
    ///
    /// Returns the header and the byte range of the PCM payload.
    pub fn parse(bytes: &[u8]) -> Result<(Self, Range<usize>)> {
        if bytes.len() < RIFF_HEADER_LEN {
            return Err(WaveqError::invalid_format(format!(
                "file is {} bytes, too short for a RIFF header",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" {
            return Err(WaveqError::invalid_format("missing RIFF tag"));
        }
        if &bytes[8..12] != b"WAVE" {
            return Err(WaveqError::invalid_format("missing WAVE tag"));
        }
        let riff_size = le_u32(bytes, 4).unwrap_or_default();

        let mut fmt: Option<FmtChunk> = None;
        let mut data: Option<Range<usize>> = None;
        let mut pos = RIFF_HEADER_LEN;

        while pos + CHUNK_HEADER_LEN <= bytes.len() && (fmt.is_none() || data.is_none()) {
            let id = &bytes[pos..pos + 4];
            let declared = le_u32(bytes, pos + 4).unwrap_or_default();
            let body = pos + CHUNK_HEADER_LEN;
            let remaining = bytes.len() - body;

            match id {
                b"fmt " => {
                    fmt = Some(FmtChunk::parse(&bytes[body..], declared)?);
                }
                b"data" => {
                    let len = if STREAMING_SENTINELS.contains(&declared) {
                        warn!(
                            "data chunk size {:#x} is a streaming sentinel, using {} remaining bytes",
                            declared, remaining
                        );
                        remaining
                    } else if declared as usize > remaining {
                        warn!(
                            "data chunk declares {} bytes but only {} remain, truncating",
                            declared, remaining
                        );
                        remaining
                    } else {
                        declared as usize
                    };
                    data = Some(body..body + len);
                }
                other => {
                    debug!(
                        "skipping '{}' chunk ({} bytes)",
                        String::from_utf8_lossy(other),
                        declared
                    );
                }
            }

            // Chunk bodies are padded to an even length
            let advance = declared as usize + (declared as usize & 1);
            match body.checked_add(advance) {
                Some(next) if next > pos => pos = next,
                _ => break,
            }
        }

        let fmt = fmt.ok_or_else(|| WaveqError::invalid_format("no 'fmt ' chunk found"))?;
        let data = data.ok_or_else(|| WaveqError::invalid_format("no 'data' chunk found"))?;

        let header = Self {
            riff_size,
            format_tag: fmt.format_tag,
            channels: fmt.channels,
            sample_rate: fmt.sample_rate,
            byte_rate: fmt.byte_rate,
            block_align: fmt.block_align,
            bits_per_sample: fmt.bits_per_sample,
            data_size: data.len() as u32,
        };
        Ok((header, data))
    }
}

/// Body of a `fmt ` chunk
struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl FmtChunk {
    fn parse(body: &[u8], declared: u32) -> Result<Self> {
        if (declared as usize) < FMT_BODY_LEN || body.len() < FMT_BODY_LEN {
            return Err(WaveqError::invalid_format(format!(
                "'fmt ' chunk is {} bytes, expected at least {}",
                declared.min(body.len() as u32),
                FMT_BODY_LEN
            )));
        }

        let chunk = Self {
            format_tag: le_u16(body, 0).unwrap_or_default(),
            channels: le_u16(body, 2).unwrap_or_default(),
            sample_rate: le_u32(body, 4).unwrap_or_default(),
            byte_rate: le_u32(body, 8).unwrap_or_default(),
            block_align: le_u16(body, 12).unwrap_or_default(),
            bits_per_sample: le_u16(body, 14).unwrap_or_default(),
        };

        if chunk.format_tag != WAVE_FORMAT_PCM {
            return Err(WaveqError::invalid_format(format!(
                "format tag {:#06x} is not PCM",
                chunk.format_tag
            )));
        }
        if chunk.channels == 0 {
            return Err(WaveqError::invalid_format("'fmt ' chunk declares zero channels"));
        }
        if !matches!(chunk.bits_per_sample, 16 | 24) {
            return Err(WaveqError::UnsupportedFormat {
                format: format!("{}-bit PCM", chunk.bits_per_sample),
            });
        }

        Ok(chunk)
    }
}

/// Decode WAV bytes into a normalized [`AudioBuffer`]
///
/// # Errors
/// * `InvalidFormat` - bad RIFF/WAVE tags, non-PCM data, missing chunks
/// * `UnsupportedFormat` - bit depth other than 16 or 24
/// * `OutOfMemory` - the sample buffer could not be allocated
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    let (header, data) = WavHeader::parse(bytes)?;
    let payload = &bytes[data];
    let width = header.bytes_per_sample();

    if payload.len() % width != 0 {
        warn!(
            "ignoring {} trailing byte(s) after the last whole sample",
            payload.len() % width
        );
    }

    let mut buffer =
        AudioBuffer::with_capacity(payload.len() / width, header.channels, header.sample_rate)?;

    match header.bits_per_sample {
        16 => {
            for raw in payload.chunks_exact(2) {
                let value = i16::from_le_bytes([raw[0], raw[1]]);
                buffer.push(value as f32 / 32768.0);
            }
        }
        24 => {
            for raw in payload.chunks_exact(3) {
                // Place the 3 bytes in the top of an i32, then shift back to sign-extend
                let value = i32::from_le_bytes([0, raw[0], raw[1], raw[2]]) >> 8;
                buffer.push(value as f32 / 8388608.0);
            }
        }
        other => {
            return Err(WaveqError::UnsupportedFormat {
                format: format!("{}-bit PCM", other),
            })
        }
    }

    if buffer.len() % header.channels as usize != 0 {
        warn!("dropping a partial frame at the end of the data chunk");
        buffer.truncate_to_frames();
    }

    debug!(
        "decoded {} samples: {} ch @ {} Hz, {}-bit",
        buffer.len(),
        header.channels,
        header.sample_rate,
        header.bits_per_sample
    );
    Ok(buffer)
}

/// Encode a buffer as 16-bit PCM WAV bytes
///
/// Samples are clamped to -1.0..1.0, scaled by 32767 and truncated.
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let header = WavHeader::pcm16(buffer.channels(), buffer.sample_rate(), buffer.len())?;
    let total = CANONICAL_HEADER_LEN + header.data_size as usize;

    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|e| WaveqError::OutOfMemory {
            details: format!("cannot allocate {} bytes for WAV output: {}", total, e),
        })?;

    out.extend_from_slice(&header.to_bytes());
    for &sample in buffer.samples() {
        let quantized = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        out.extend_from_slice(&quantized.to_le_bytes());
    }

    Ok(out)
}

/// Read and decode a WAV file
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let bytes = std::fs::read(path).map_err(|e| WaveqError::io(path, e))?;
    let buffer = decode(&bytes)?;

    info!(
        "Loaded {}: {} frames, {} ch @ {} Hz ({:.2}s)",
        path.display(),
        buffer.num_frames(),
        buffer.channels(),
        buffer.sample_rate(),
        buffer.duration()
    );
    Ok(buffer)
}

/// Encode a buffer and write it to `path` as 16-bit PCM WAV
///
/// A failed write is not rolled back; treat the file as undefined on error.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let bytes = encode(buffer)?;

    let mut file = File::create(path).map_err(|e| WaveqError::io(path, e))?;
    file.write_all(&bytes).map_err(|e| WaveqError::io(path, e))?;
    file.flush().map_err(|e| WaveqError::io(path, e))?;

    info!(
        "Wrote {}: {} frames, {} ch @ {} Hz, 16-bit",
        path.display(),
        buffer.num_frames(),
        buffer.channels(),
        buffer.sample_rate()
    );
    Ok(())
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
