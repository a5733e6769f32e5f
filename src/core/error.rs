//! Structured error handling for the gateway
//!
//! One hierarchical error type covers the whole synthesis path. Engine and
//! adapter failures propagate through the orchestrator unchanged; the HTTP
//! boundary turns them into protocol responses.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum TtsError {
    /// Voice string cannot be mapped to any registered engine
    #[error("cannot resolve voice: {voice}")]
    Resolution { voice: String },

    /// An engine failed to produce audio for a synthesis unit
    #[error("synthesis failed in engine '{engine}': {message}")]
    Synthesis { engine: String, message: String },

    /// Result cache read or write failed; recovered locally, never surfaced
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Startup configuration errors (missing binary, model directory, ...)
    #[error("configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Audio processing errors
    #[error("audio {operation} failed: {message}")]
    Audio {
        operation: AudioOperation,
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TtsError {
    /// Shorthand for a synthesis failure in a named engine
    pub fn synthesis(engine: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::Synthesis {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a configuration failure with an optional path
    pub fn config(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        TtsError::Config {
            message: message.into(),
            path,
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Decoding,
    Resampling,
    Encoding,
    Inference,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Decoding => write!(f, "decoding"),
            AudioOperation::Resampling => write!(f, "resampling"),
            AudioOperation::Encoding => write!(f, "encoding"),
            AudioOperation::Inference => write!(f, "inference"),
        }
    }
}

impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<anyhow::Error> for TtsError {
    fn from(err: anyhow::Error) -> Self {
        TtsError::Internal {
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TtsError::Resolution {
            voice: "xx-zz".to_string(),
        };
        assert!(err.to_string().contains("cannot resolve voice"));
        assert!(err.to_string().contains("xx-zz"));
    }

    #[test]
    fn test_synthesis_shorthand() {
        let err = TtsError::synthesis("espeak", "no audio returned");
        assert!(err.to_string().contains("espeak"));
        assert!(err.to_string().contains("no audio returned"));
    }

    #[test]
    fn test_audio_operation_display() {
        assert_eq!(AudioOperation::Resampling.to_string(), "resampling");
    }
}
