//! Error handling for waveq
//!
//! Every failure carries an error code and recovery suggestions so a UI
//! can show a distinct, actionable message per error kind.

use thiserror::Error;

/// Result type alias for waveq operations
pub type Result<T> = std::result::Result<T, WaveqError>;

/// Main error type for waveq operations
#[derive(Error, Debug)]
pub enum WaveqError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Container Errors
    #[error("Invalid WAV data: {reason}")]
    InvalidFormat { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Transform Errors
    #[error("Invalid transform size {len}: {reason}")]
    InvalidSize { len: usize, reason: String },

    // Resource Errors
    #[error("Out of memory: {details}")]
    OutOfMemory { details: String },

    // Parameter Errors
    #[error("Invalid parameter {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WaveqError {
    /// Wrap an I/O error, promoting `NotFound` to [`WaveqError::FileNotFound`]
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == std::io::ErrorKind::NotFound {
            WaveqError::FileNotFound {
                path,
                source: Some(source),
            }
        } else {
            WaveqError::Io { path, source }
        }
    }

    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        WaveqError::InvalidFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_power_of_two(len: usize) -> Self {
        WaveqError::InvalidSize {
            len,
            reason: "length must be a power of two".to_string(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WaveqError::FileNotFound { .. } => "FILE_NOT_FOUND",
            WaveqError::Io { .. } => "IO_ERROR",
            WaveqError::InvalidFormat { .. } => "FORMAT_ERROR",
            WaveqError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            WaveqError::InvalidSize { .. } => "SIZE_ERROR",
            WaveqError::OutOfMemory { .. } => "ALLOCATION_ERROR",
            WaveqError::InvalidParameter { .. } => "INVALID_PARAMETER",
            WaveqError::Config { .. } => "CONFIG_ERROR",
            WaveqError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can reasonably retry with different input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WaveqError::FileNotFound { .. }
                | WaveqError::InvalidSize { .. }
                | WaveqError::InvalidParameter { .. }
                | WaveqError::OutOfMemory { .. }
                | WaveqError::Config { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            WaveqError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            WaveqError::Io { .. } => vec![
                "Check file permissions",
                "Make sure the target disk is not full",
                "The output file may be incomplete and should be discarded",
            ],
            WaveqError::InvalidFormat { .. } => vec![
                "Make sure the file is an uncompressed PCM WAV file",
                "The file may be corrupted - try re-exporting from source",
            ],
            WaveqError::UnsupportedFormat { .. } => vec![
                "Convert the file to 16-bit or 24-bit PCM WAV",
            ],
            WaveqError::InvalidSize { .. } => vec![
                "Use a buffer or window length that is a power of two",
                "Enable zero padding to process arbitrary lengths",
            ],
            WaveqError::OutOfMemory { .. } => vec![
                "Close other applications to free memory",
                "Try processing a shorter audio file",
            ],
            WaveqError::InvalidParameter { .. } => {
                vec!["Adjust the parameter to be within the expected range"]
            }
            WaveqError::Config { .. } => vec![
                "Check the configuration file is valid JSON",
                "Remove the file to fall back to defaults",
            ],
            WaveqError::Serialization(_) => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            WaveqError::FileNotFound { path, .. } => {
                format!("I couldn't find the file at '{}'.", path)
            }
            WaveqError::InvalidFormat { reason } => {
                format!("This doesn't look like a PCM WAV file: {}.", reason)
            }
            WaveqError::UnsupportedFormat { format } => {
                format!("{} isn't supported. Only 16-bit and 24-bit PCM can be read.", format)
            }
            WaveqError::InvalidSize { len, .. } => format!(
                "The transform needs a power-of-two length, but got {} samples.",
                len
            ),
            _ => self.to_string(),
        }
    }
}
