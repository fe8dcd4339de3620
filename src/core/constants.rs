//! Protocol constants for the Go-Back-N ARQ layer.
//!
//! Wire constants are fixed by the protocol and MUST NOT be changed; the
//! defaults below are tuning values and may be overridden through
//! [`ArqConfig`](crate::arq::ArqConfig).

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Magic number tagging a Data frame.
pub const MAGIC_DATA: u32 = 360_023_952;

/// Magic number tagging an Ack frame.
pub const MAGIC_ACK: u32 = 360_023_953;

/// Size of the leading magic number.
pub const MAGIC_SIZE: usize = 4;

/// Size of an encoded sequence number (big-endian u32).
pub const SEQUENCE_NUMBER_SIZE: usize = 4;

/// Frame header size (magic + sequence number).
///
/// This is also the minimum decodable length; shorter buffers pass through.
pub const FRAME_HEADER_SIZE: usize = MAGIC_SIZE + SEQUENCE_NUMBER_SIZE;

// =============================================================================
// SENDER DEFAULTS
// =============================================================================

/// Default number of frames that may be in flight.
pub const DEFAULT_WINDOW_SIZE: usize = 150;

/// Default retransmission timeout.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_millis(100);

// =============================================================================
// RECEIVER DEFAULTS
// =============================================================================

/// The ack period defaults to the retry timeout divided by this value.
pub const ACK_PERIOD_DIVISOR: u32 = 10;

/// Default acknowledgment period.
pub const DEFAULT_ACK_PERIOD: Duration = Duration::from_millis(10);

// =============================================================================
// WRITABILITY
// =============================================================================

/// Pending bytes above which the channel becomes unwritable.
pub const DEFAULT_HIGH_WATERMARK: usize = 64 * 1024;

/// Pending bytes below which the channel becomes writable again.
pub const DEFAULT_LOW_WATERMARK: usize = 32 * 1024;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Default receive buffer size for datagram transports.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65535;

/// Recommended maximum datagram size for the public internet.
pub const RECOMMENDED_MAX_DATAGRAM: usize = 1200;
