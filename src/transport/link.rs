//! Datagram transports.
//!
//! [`Transport`] is the only thing the channel driver needs from the network:
//! send one datagram, receive one datagram. [`MemoryTransport`] provides an
//! in-process pair with optional, deterministic loss and duplication.

use std::future::Future;
use std::io;
use std::sync::Mutex;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::trace;

/// Unreliable datagram transport.
///
/// Datagrams may be lost, duplicated or reordered; the ARQ layer above
/// repairs that. `recv` must be safe to cancel.
pub trait Transport: Send + Sync + 'static {
    /// Send one datagram.
    fn send(&self, buf: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Receive the next datagram.
    fn recv(&self) -> impl Future<Output = io::Result<Bytes>> + Send;
}

/// Impairments of a [`MemoryTransport`] link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConditions {
    /// Probability that a datagram is dropped.
    pub loss: f64,
    /// Probability that a delivered datagram arrives twice.
    pub duplication: f64,
    /// RNG seed; both directions derive their own stream from it.
    pub seed: u64,
}

impl Default for LinkConditions {
    fn default() -> Self {
        Self {
            loss: 0.0,
            duplication: 0.0,
            seed: 0,
        }
    }
}

impl LinkConditions {
    /// A link dropping `loss` and duplicating `duplication` of all datagrams.
    pub fn lossy(loss: f64, duplication: f64, seed: u64) -> Self {
        Self {
            loss: loss.clamp(0.0, 1.0),
            duplication: duplication.clamp(0.0, 1.0),
            seed,
        }
    }
}

/// One end of an in-process datagram link.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: AsyncMutex<mpsc::UnboundedReceiver<Bytes>>,
    conditions: LinkConditions,
    rng: Mutex<StdRng>,
}

impl MemoryTransport {
    /// Create a connected pair over a perfect link.
    pub fn pair() -> (Self, Self) {
        Self::pair_with(LinkConditions::default())
    }

    /// Create a connected pair over an impaired link.
    pub fn pair_with(conditions: LinkConditions) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        let a = Self::new(a_tx, a_rx, conditions, conditions.seed);
        let b = Self::new(b_tx, b_rx, conditions, conditions.seed.wrapping_add(1));
        (a, b)
    }

    fn new(
        tx: mpsc::UnboundedSender<Bytes>,
        rx: mpsc::UnboundedReceiver<Bytes>,
        conditions: LinkConditions,
        seed: u64,
    ) -> Self {
        Self {
            tx,
            rx: AsyncMutex::new(rx),
            conditions,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// How many copies of the next datagram reach the peer.
    fn copies(&self) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if rng.gen_bool(self.conditions.loss) {
            0
        } else if rng.gen_bool(self.conditions.duplication) {
            2
        } else {
            1
        }
    }
}

fn peer_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "memory transport peer dropped")
}

impl Transport for MemoryTransport {
    async fn send(&self, buf: Bytes) -> io::Result<()> {
        if self.tx.is_closed() {
            return Err(peer_gone());
        }
        let copies = self.copies();
        if copies == 0 {
            trace!(len = buf.len(), "link dropped datagram");
        }
        for _ in 0..copies {
            self.tx.send(buf.clone()).map_err(|_| peer_gone())?;
        }
        Ok(())
    }

    async fn recv(&self) -> io::Result<Bytes> {
        self.rx.lock().await.recv().await.ok_or_else(peer_gone)
    }
}
