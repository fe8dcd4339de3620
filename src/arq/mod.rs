//! Go-Back-N ARQ protocol layer.
//!
//! Adds reliable, in-order delivery on top of a datagram transport that may
//! lose, duplicate or reorder packets.
//!
//! - [`seq`]: wraparound sequence numbers
//! - [`frame`]: wire codec for data and ack frames
//! - [`window`]: in-flight window and its backpressure variant
//! - [`sender`] / [`receiver`]: the two protocol state machines
//! - [`connection`]: both halves behind one codec
//!
//! Everything here is sans-IO; see the `transport` module for a tokio driver.

pub mod completion;
pub mod config;
pub mod connection;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod seq;
pub mod stats;
pub mod window;
pub mod writability;

pub use completion::{Completion, WriteHandle, WriteResult, completion};
pub use config::{ArqConfig, ArqConfigBuilder, recommended_retry_timeout, recommended_window_size};
pub use connection::ArqConnection;
pub use frame::{AckFrame, ArqFrame, DataFrame, Decoded, decode};
pub use receiver::GoBackNReceiver;
pub use sender::GoBackNSender;
pub use seq::SequenceNumber;
pub use stats::{ArqStats, ReceiverStats, SenderStats};
pub use window::{PendingBytesWindow, SimpleWindow, Slot, Window};
pub use writability::Writability;
