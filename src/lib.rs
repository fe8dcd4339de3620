//! # gbn-arq
//!
//! A Go-Back-N automatic repeat request (ARQ) layer.
//!
//! It turns an unreliable datagram transport (one that may lose, duplicate or
//! reorder packets) into an ordered, acknowledged, flow-controlled message
//! stream:
//!
//! - **Sliding window**: up to `window_size` sequenced frames in flight
//! - **Cumulative acks**: one ack confirms every frame up to its sequence number
//! - **Full-window resend**: on timeout every unacknowledged frame is sent again
//! - **No receiver buffering**: frames past a gap are discarded, never reordered
//! - **Backpressure**: a writability signal with high/low watermarks
//!
//! ## Feature Flags
//!
//! - `transport` (default): tokio driver, UDP and in-memory transports
//! - `serde`: `Serialize`/`Deserialize` for [`ArqConfig`](arq::ArqConfig)
//!
//! ## Modules
//!
//! - [`core`]: constants, error types and collaborator traits (always included)
//! - [`arq`]: sans-IO protocol state machines (always included)
//! - [`transport`]: async driver (requires `transport` feature)
//!
//! ## Example Usage
//!
//! The protocol core performs no I/O; the caller moves datagrams and time.
//!
//! ```rust
//! use std::time::Instant;
//!
//! use bytes::Bytes;
//! use gbn_arq::prelude::*;
//!
//! let now = Instant::now();
//! let config = ArqConfig::builder().window_size(8).build()?;
//! let mut alice = ArqConnection::new(&config, now)?;
//! let mut bob = ArqConnection::new(&config, now)?;
//!
//! let mut write = alice.write_at(Bytes::from_static(b"hello"), now);
//! while let Some(datagram) = alice.poll_transmit() {
//!     bob.handle_datagram_at(datagram, now);
//! }
//! assert_eq!(bob.poll_delivered(), Some(Bytes::from_static(b"hello")));
//!
//! // bob acknowledges on its next ack tick
//! let tick = bob.poll_timeout().unwrap();
//! bob.handle_timeout(tick)?;
//! while let Some(datagram) = bob.poll_transmit() {
//!     alice.handle_datagram_at(datagram, tick);
//! }
//! assert!(matches!(write.try_result(), Some(Ok(()))));
//! # Ok::<(), ArqError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Protocol layer (always included)
pub mod arq;

// Async driver (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::arq::{
        AckFrame, ArqConfig, ArqConfigBuilder, ArqConnection, ArqFrame, ArqStats, DataFrame,
        Decoded, GoBackNReceiver, GoBackNSender, SequenceNumber, WriteHandle, Writability,
    };

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        ArqChannel, ArqHandle, LinkConditions, MemoryTransport, Transport, UdpTransport,
    };
}

// Re-export commonly used items at crate root
pub use crate::arq::{ArqConfig, ArqConnection, SequenceNumber, WriteHandle};
pub use crate::core::{ArqError, ArqResult, ConfigError};

#[cfg(feature = "transport")]
pub use crate::transport::{ArqChannel, ArqHandle, MemoryTransport, Transport, UdpTransport};
