//! Connection configuration.

use std::time::Duration;

use crate::core::ConfigError;
use crate::core::constants::{
    ACK_PERIOD_DIVISOR, DEFAULT_ACK_PERIOD, DEFAULT_HIGH_WATERMARK, DEFAULT_LOW_WATERMARK,
    DEFAULT_RETRY_TIMEOUT, DEFAULT_WINDOW_SIZE,
};

use super::seq::SequenceNumber;

/// Parameters of one Go-Back-N connection.
///
/// When choosing the window size, take the link capacity, the round-trip time
/// and the MTU into account (see [`recommended_window_size`]). The retry
/// timeout should be at least twice the time needed to transfer one full
/// window (see [`recommended_retry_timeout`]).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArqConfig {
    /// Maximum number of unacknowledged frames in flight.
    pub window_size: usize,

    /// Fixed retransmission timeout. There is no backoff.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis", rename = "retry_timeout_ms"))]
    pub retry_timeout: Duration,

    /// Period of the receiver's acknowledgment timer.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis", rename = "ack_period_ms"))]
    pub ack_period: Duration,

    /// First unacknowledged sequence number.
    #[cfg_attr(feature = "serde", serde(with = "sequence_number"))]
    pub initial_base: SequenceNumber,

    /// Next sequence number to assign.
    #[cfg_attr(feature = "serde", serde(with = "sequence_number"))]
    pub initial_next_seq: SequenceNumber,

    /// Next sequence number the receiver expects.
    #[cfg_attr(feature = "serde", serde(with = "sequence_number"))]
    pub initial_next_expected: SequenceNumber,

    /// Count in-flight frames towards the writability signal.
    pub window_affects_writability: bool,

    /// Pending bytes above which the channel becomes unwritable.
    pub high_watermark: usize,

    /// Pending bytes below which the channel becomes writable again.
    pub low_watermark: usize,

    /// Give up after this many full-window retransmissions without progress.
    ///
    /// `None` retransmits until acknowledged or closed.
    pub max_retransmits: Option<u32>,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            ack_period: DEFAULT_ACK_PERIOD,
            initial_base: SequenceNumber::MIN,
            initial_next_seq: SequenceNumber::MIN,
            initial_next_expected: SequenceNumber::MIN,
            window_affects_writability: false,
            high_watermark: DEFAULT_HIGH_WATERMARK,
            low_watermark: DEFAULT_LOW_WATERMARK,
            max_retransmits: None,
        }
    }
}

impl ArqConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ArqConfigBuilder {
        ArqConfigBuilder::new()
    }

    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if self.retry_timeout.is_zero() {
            return Err(ConfigError::ZeroRetryTimeout);
        }
        if self.ack_period.is_zero() {
            return Err(ConfigError::ZeroAckPeriod);
        }
        if self.ack_period >= self.retry_timeout {
            return Err(ConfigError::AckPeriodTooLong {
                ack_period_ms: self.ack_period.as_millis(),
                retry_timeout_ms: self.retry_timeout.as_millis(),
            });
        }
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::InvalidWatermarks {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        Ok(())
    }
}

/// Builder for [`ArqConfig`].
#[derive(Debug, Clone)]
pub struct ArqConfigBuilder {
    config: ArqConfig,
    ack_period: Option<Duration>,
}

impl ArqConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ArqConfig::default(),
            ack_period: None,
        }
    }

    /// Set the window size.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the retry timeout.
    ///
    /// Unless set explicitly, the ack period follows as a tenth of it.
    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.retry_timeout = timeout;
        self
    }

    /// Set the ack period.
    pub fn ack_period(mut self, period: Duration) -> Self {
        self.ack_period = Some(period);
        self
    }

    /// Set the sender's initial sequence numbers.
    pub fn initial_sender_sequence(mut self, base: SequenceNumber, next_seq: SequenceNumber) -> Self {
        self.config.initial_base = base;
        self.config.initial_next_seq = next_seq;
        self
    }

    /// Set the receiver's initial expected sequence number.
    pub fn initial_next_expected(mut self, next_expected: SequenceNumber) -> Self {
        self.config.initial_next_expected = next_expected;
        self
    }

    /// Let in-flight frames count towards the writability signal.
    pub fn window_affects_writability(mut self, enabled: bool) -> Self {
        self.config.window_affects_writability = enabled;
        self
    }

    /// Set the writability watermarks (in bytes).
    pub fn watermarks(mut self, high: usize, low: usize) -> Self {
        self.config.high_watermark = high;
        self.config.low_watermark = low;
        self
    }

    /// Cap the number of retransmissions without progress.
    pub fn max_retransmits(mut self, max: u32) -> Self {
        self.config.max_retransmits = Some(max);
        self
    }

    /// Validate and build the configuration.
    pub fn build(mut self) -> Result<ArqConfig, ConfigError> {
        self.config.ack_period = self
            .ack_period
            .unwrap_or_else(|| self.config.retry_timeout / ACK_PERIOD_DIVISOR);
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ArqConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Window size that keeps a link busy: `(LC * RTT) / (MTU * 2)`, at least 1.
///
/// `link_capacity` is in bytes per second, `mtu` in bytes.
pub fn recommended_window_size(link_capacity: u64, rtt: Duration, mtu: usize) -> usize {
    if mtu == 0 {
        return 1;
    }
    let in_flight = u128::from(link_capacity) * rtt.as_micros() / 1_000_000;
    let size = in_flight / (mtu as u128 * 2);
    usize::try_from(size).unwrap_or(usize::MAX).max(1)
}

/// Twice the time needed to transfer one full window, at least 1ms.
///
/// `link_capacity` is in bytes per second, `mtu` in bytes.
pub fn recommended_retry_timeout(window_size: usize, mtu: usize, link_capacity: u64) -> Duration {
    if link_capacity == 0 {
        return DEFAULT_RETRY_TIMEOUT;
    }
    let window_bytes = window_size as u128 * mtu as u128;
    let micros = window_bytes * 2 * 1_000_000 / u128::from(link_capacity);
    let micros = u64::try_from(micros).unwrap_or(u64::MAX);
    Duration::from_micros(micros).max(Duration::from_millis(1))
}

#[cfg(feature = "serde")]
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(feature = "serde")]
mod sequence_number {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::arq::seq::SequenceNumber;

    pub fn serialize<S: Serializer>(seq: &SequenceNumber, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(seq.value())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<SequenceNumber, D::Error> {
        u32::deserialize(deserializer).map(SequenceNumber::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ArqConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.ack_period, config.retry_timeout / ACK_PERIOD_DIVISOR);
        assert!(config.max_retransmits.is_none());
    }

    #[test]
    fn test_builder_derives_ack_period() {
        let config = ArqConfig::builder()
            .window_size(3)
            .retry_timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        assert_eq!(config.window_size, 3);
        assert_eq!(config.ack_period, Duration::from_millis(50));
    }

    #[test]
    fn test_builder_explicit_values() {
        let config = ArqConfig::builder()
            .ack_period(Duration::from_millis(7))
            .initial_sender_sequence(SequenceNumber::new(5), SequenceNumber::new(5))
            .initial_next_expected(SequenceNumber::new(9))
            .window_affects_writability(true)
            .watermarks(1000, 500)
            .max_retransmits(4)
            .build()
            .unwrap();

        assert_eq!(config.ack_period, Duration::from_millis(7));
        assert_eq!(config.initial_base, SequenceNumber::new(5));
        assert_eq!(config.initial_next_expected, SequenceNumber::new(9));
        assert!(config.window_affects_writability);
        assert_eq!(config.high_watermark, 1000);
        assert_eq!(config.max_retransmits, Some(4));
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            ArqConfig::builder().window_size(0).build(),
            Err(ConfigError::ZeroWindowSize)
        );
        assert_eq!(
            ArqConfig::builder().retry_timeout(Duration::ZERO).build(),
            Err(ConfigError::ZeroRetryTimeout)
        );
        assert_eq!(
            ArqConfig::builder().ack_period(Duration::ZERO).build(),
            Err(ConfigError::ZeroAckPeriod)
        );
        assert!(matches!(
            ArqConfig::builder()
                .retry_timeout(Duration::from_millis(10))
                .ack_period(Duration::from_millis(10))
                .build(),
            Err(ConfigError::AckPeriodTooLong { .. })
        ));
        assert_eq!(
            ArqConfig::builder().watermarks(10, 20).build(),
            Err(ConfigError::InvalidWatermarks { low: 20, high: 10 })
        );
    }

    #[test]
    fn test_recommended_window_size() {
        // 10 MB/s, 100ms RTT, 1000 byte frames -> 1 MB in flight / 2000
        let size = recommended_window_size(10_000_000, Duration::from_millis(100), 1000);
        assert_eq!(size, 500);

        assert_eq!(recommended_window_size(0, Duration::from_millis(100), 1000), 1);
        assert_eq!(recommended_window_size(1000, Duration::from_millis(1), 0), 1);
    }

    #[test]
    fn test_recommended_retry_timeout() {
        // 100 frames of 1000 bytes at 1 MB/s take 100ms; twice that
        let timeout = recommended_retry_timeout(100, 1000, 1_000_000);
        assert_eq!(timeout, Duration::from_millis(200));

        assert_eq!(recommended_retry_timeout(1, 1, u64::MAX), Duration::from_millis(1));
        assert_eq!(recommended_retry_timeout(1, 1, 0), DEFAULT_RETRY_TIMEOUT);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial_config() {
        let config: ArqConfig =
            serde_json::from_str(r#"{"window_size": 8, "retry_timeout_ms": 250, "ack_period_ms": 25}"#)
                .unwrap();

        assert_eq!(config.window_size, 8);
        assert_eq!(config.retry_timeout, Duration::from_millis(250));
        assert_eq!(config.ack_period, Duration::from_millis(25));
        assert_eq!(config.initial_base, SequenceNumber::MIN);
        assert!(config.validate().is_ok());
    }
}
