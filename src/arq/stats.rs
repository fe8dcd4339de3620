//! Connection counters.

/// Sender-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Data frames sent for the first time.
    pub frames_sent: u64,
    /// Data frames sent again after a timeout.
    pub frames_retransmitted: u64,
    /// Retry timer expirations with a non-empty window.
    pub timeouts: u64,
    /// Acks received.
    pub acks_received: u64,
    /// Acks dropped as stale, duplicate or out of order.
    pub stale_acks: u64,
    /// Writes acknowledged by the peer.
    pub writes_succeeded: u64,
    /// Writes failed on teardown.
    pub writes_failed: u64,
    /// Writes discarded from the overflow queue after cancellation.
    pub writes_cancelled: u64,
}

/// Receiver-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Data frames delivered in order.
    pub frames_delivered: u64,
    /// Data frames discarded as duplicate or out of order.
    pub frames_discarded: u64,
    /// Acks sent.
    pub acks_sent: u64,
}

/// Counters of one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArqStats {
    /// Sender-side counters.
    pub sender: SenderStats,
    /// Receiver-side counters.
    pub receiver: ReceiverStats,
    /// Inbound buffers that were not ARQ frames.
    pub passthrough_received: u64,
}
