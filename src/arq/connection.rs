//! Combined ARQ endpoint.
//!
//! An [`ArqConnection`] pairs one [`GoBackNSender`] with one
//! [`GoBackNReceiver`] behind the frame codec. Inbound buffers are decoded
//! and routed (data to the receiver, acks to the sender, anything else to the
//! pass-through queue); outbound frames of both halves are merged into one
//! stream of encoded datagrams.
//!
//! Like its halves, the connection performs no I/O and reads no clock. A
//! driver feeds it datagrams and timer events and drains
//! [`ArqConnection::poll_transmit`]; the tokio driver in the `transport`
//! module is one such driver.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::core::{ArqError, ArqResult, ConfigError};

use super::completion::{Completion, WriteHandle, completion};
use super::config::ArqConfig;
use super::frame::{ArqFrame, Decoded, decode};
use super::receiver::GoBackNReceiver;
use super::sender::GoBackNSender;
use super::stats::ArqStats;
use super::writability::Writability;

/// Sender and receiver of one logical connection.
///
/// # Sequence synchronisation
///
/// The wire format carries only data and ack frames; there is no reset or
/// first-frame marker. Both peers must therefore start from matching initial
/// sequence numbers ([`ArqConfig::initial_next_seq`] on one side,
/// [`ArqConfig::initial_next_expected`] on the other). A peer that restarts
/// mid-stream comes back at its initial numbers while the other side does
/// not: its data is discarded as out of order and its acks are dropped as
/// stale until the application tears both ends down and builds a fresh
/// connection.
#[derive(Debug)]
pub struct ArqConnection {
    sender: GoBackNSender,
    receiver: GoBackNReceiver,
    writability: Writability,

    /// Payloads delivered in order, waiting for the application
    delivered: VecDeque<Bytes>,

    /// Inbound buffers that were not ARQ frames
    passthrough_in: VecDeque<Bytes>,

    /// Outbound buffers that bypass the ARQ layer
    passthrough_out: VecDeque<Bytes>,

    passthrough_received: u64,
}

impl ArqConnection {
    /// Create an active connection at `now`.
    pub fn new(config: &ArqConfig, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        let writability = Writability::new(config.high_watermark, config.low_watermark);
        Ok(Self {
            sender: GoBackNSender::new(config, writability.clone()),
            receiver: GoBackNReceiver::new(config, now),
            writability,
            delivered: VecDeque::new(),
            passthrough_in: VecDeque::new(),
            passthrough_out: VecDeque::new(),
            passthrough_received: 0,
        })
    }

    /// Sender half.
    pub fn sender(&self) -> &GoBackNSender {
        &self.sender
    }

    /// Receiver half.
    pub fn receiver(&self) -> &GoBackNReceiver {
        &self.receiver
    }

    /// Writability signal shared with producers.
    pub fn writability(&self) -> &Writability {
        &self.writability
    }

    /// Check if the connection was not torn down yet.
    pub fn is_active(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> ArqStats {
        ArqStats {
            sender: self.sender.stats(),
            receiver: self.receiver.stats(),
            passthrough_received: self.passthrough_received,
        }
    }

    /// Submit a payload for reliable delivery.
    pub fn write(&mut self, payload: Bytes) -> WriteHandle {
        self.write_at(payload, Instant::now())
    }

    /// Submit a payload at a given time.
    pub fn write_at(&mut self, payload: Bytes, now: Instant) -> WriteHandle {
        let (completion, handle) = completion();
        self.write_with_at(payload, completion, now);
        handle
    }

    /// Submit a payload with a caller-provided completion.
    pub fn write_with_at(&mut self, payload: Bytes, completion: Completion, now: Instant) {
        self.sender.write_with_at(payload, completion, now);
    }

    /// Queue a buffer that bypasses sequencing and retransmission.
    pub fn write_passthrough(&mut self, buf: Bytes) {
        if self.is_active() {
            self.passthrough_out.push_back(buf);
        }
    }

    /// Process an inbound datagram; see [`ArqConnection::handle_datagram_at`].
    pub fn handle_datagram(&mut self, buf: Bytes) {
        self.handle_datagram_at(buf, Instant::now());
    }

    /// Decode and route an inbound datagram.
    pub fn handle_datagram_at(&mut self, buf: Bytes, now: Instant) {
        if !self.is_active() {
            return;
        }

        match decode(buf) {
            Decoded::Frame(ArqFrame::Data(frame)) => {
                if let Some(payload) = self.receiver.on_data(frame) {
                    self.delivered.push_back(payload);
                }
            }
            Decoded::Frame(ArqFrame::Ack(ack)) => self.sender.on_ack_at(ack, now),
            Decoded::PassThrough(buf) => {
                trace!(len = buf.len(), "pass through");
                self.passthrough_received += 1;
                self.passthrough_in.push_back(buf);
            }
        }
    }

    /// Fire every timer due by `now`.
    ///
    /// An error means the connection was torn down.
    pub fn handle_timeout(&mut self, now: Instant) -> ArqResult<()> {
        self.receiver.handle_timeout(now);
        if let Err(err) = self.sender.handle_timeout(now) {
            self.receiver.on_channel_inactive();
            self.passthrough_out.clear();
            return Err(err);
        }
        Ok(())
    }

    /// Earliest timer deadline of either half.
    pub fn poll_timeout(&self) -> Option<Instant> {
        match (self.sender.poll_timeout(), self.receiver.poll_timeout()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Next encoded datagram for the transport.
    ///
    /// Acks go first so a busy sender does not delay the peer's progress.
    pub fn poll_transmit(&mut self) -> Option<Bytes> {
        if let Some(ack) = self.receiver.poll_transmit() {
            return Some(ack.encode());
        }
        if let Some(buf) = self.passthrough_out.pop_front() {
            return Some(buf);
        }
        self.sender.poll_transmit().map(|frame| frame.encode())
    }

    /// Next payload delivered in order.
    pub fn poll_delivered(&mut self) -> Option<Bytes> {
        self.delivered.pop_front()
    }

    /// Next inbound buffer that was not an ARQ frame.
    pub fn poll_passthrough(&mut self) -> Option<Bytes> {
        self.passthrough_in.pop_front()
    }

    /// Tear the connection down.
    ///
    /// Fails every queued and in-flight write with `cause` and stops both
    /// timers. Payloads delivered before the teardown can still be polled.
    pub fn close(&mut self, cause: ArqError) {
        if !self.is_active() {
            return;
        }
        debug!(%cause, "connection inactive");
        self.sender.close(cause);
        self.receiver.on_channel_inactive();
        self.passthrough_out.clear();
    }
}
