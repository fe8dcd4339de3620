//! Error types for the ARQ layer.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors in the configuration of an ARQ connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window must hold at least one frame.
    #[error("window size must be at least 1")]
    ZeroWindowSize,

    /// Retry timeout must be non-zero.
    #[error("retry timeout must be non-zero")]
    ZeroRetryTimeout,

    /// Ack period must be non-zero.
    #[error("ack period must be non-zero")]
    ZeroAckPeriod,

    /// Ack period must be shorter than the retry timeout.
    #[error("ack period ({ack_period_ms}ms) must be shorter than the retry timeout ({retry_timeout_ms}ms)")]
    AckPeriodTooLong {
        /// Configured ack period in milliseconds.
        ack_period_ms: u128,
        /// Configured retry timeout in milliseconds.
        retry_timeout_ms: u128,
    },

    /// Low watermark above high watermark.
    #[error("low watermark {low} exceeds high watermark {high}")]
    InvalidWatermarks {
        /// Configured low watermark.
        low: usize,
        /// Configured high watermark.
        high: usize,
    },
}

/// Top-level ARQ errors.
///
/// Only connection-level conditions are represented here. Stale acks and
/// unexpected data frames are routine on a lossy transport and never surface
/// as errors.
#[derive(Debug, Error, Clone)]
pub enum ArqError {
    /// The connection became inactive before the write was acknowledged.
    #[error("channel closed")]
    ChannelClosed,

    /// The configured retransmission cap was reached without progress.
    #[error("no acknowledgment after {attempts} retransmissions")]
    RetransmitsExhausted {
        /// Number of full-window retransmissions performed.
        attempts: u32,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error in the underlying transport.
    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for ArqError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl ArqError {
    /// Check if this error tears down the whole connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ArqError::ChannelClosed | ArqError::RetransmitsExhausted { .. } | ArqError::Io(_)
        )
    }
}

/// Result type for ARQ operations.
pub type ArqResult<T> = Result<T, ArqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(ArqError::ChannelClosed.is_fatal());
        assert!(ArqError::RetransmitsExhausted { attempts: 3 }.is_fatal());
        assert!(ArqError::from(io::Error::other("boom")).is_fatal());

        assert!(!ArqError::Config(ConfigError::ZeroWindowSize).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ArqError::ChannelClosed.to_string(), "channel closed");
        assert_eq!(
            ArqError::RetransmitsExhausted { attempts: 5 }.to_string(),
            "no acknowledgment after 5 retransmissions"
        );
        assert_eq!(
            ConfigError::InvalidWatermarks { low: 10, high: 5 }.to_string(),
            "low watermark 10 exceeds high watermark 5"
        );
    }

    #[test]
    fn test_error_is_clone() {
        let err = ArqError::from(io::Error::other("boom"));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
