//! Async transport layer.
//!
//! Runs an [`ArqConnection`](crate::arq::ArqConnection) on tokio:
//!
//! - [`Transport`]: the datagram interface the driver needs
//! - [`UdpTransport`]: a connected UDP socket
//! - [`MemoryTransport`]: an in-process link with optional loss and duplication
//! - [`ArqChannel`]: spawns the driver task and returns an [`ArqHandle`]
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Application                  │
//! ├─────────────────────────────────────────┤
//! │      ArqHandle  /  driver task          │  ← This module
//! ├─────────────────────────────────────────┤
//! │      Go-Back-N ARQ (crate::arq)         │
//! ├─────────────────────────────────────────┤
//! │      Transport (UDP, memory)            │  ← This module
//! └─────────────────────────────────────────┘
//! ```

mod channel;
mod link;
mod socket;

pub use channel::{ArqChannel, ArqHandle};
pub use link::{LinkConditions, MemoryTransport, Transport};
pub use socket::{UdpTransport, UdpTransportBuilder};
