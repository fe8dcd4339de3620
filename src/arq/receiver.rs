//! Go-Back-N receiver.
//!
//! Accepts only the next expected data frame and discards everything else;
//! frames past a gap are never buffered. Acknowledgments are rate limited:
//! an ack tick runs every `ack_period` and emits at most one cumulative ack
//! for everything delivered so far.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace};

use super::config::ArqConfig;
use super::frame::{AckFrame, DataFrame};
use super::seq::SequenceNumber;
use super::stats::ReceiverStats;

/// Receiver half of a Go-Back-N connection.
#[derive(Debug)]
pub struct GoBackNReceiver {
    next_expected: SequenceNumber,
    ack_required: bool,
    ack_period: Duration,
    /// Ack tick; `None` once inactive
    ack_deadline: Option<Instant>,
    outbox: VecDeque<AckFrame>,
    stats: ReceiverStats,
}

impl GoBackNReceiver {
    /// Create a receiver and start its ack tick at `now`.
    pub fn new(config: &ArqConfig, now: Instant) -> Self {
        debug!(
            ack_period_ms = config.ack_period.as_millis() as u64,
            "go-back-n receiver created"
        );
        Self {
            next_expected: config.initial_next_expected,
            ack_required: false,
            ack_period: config.ack_period,
            ack_deadline: Some(now + config.ack_period),
            outbox: VecDeque::new(),
            stats: ReceiverStats::default(),
        }
    }

    /// Sequence number the next delivered frame must carry.
    pub fn next_expected(&self) -> SequenceNumber {
        self.next_expected
    }

    /// Check if the next tick will emit an ack.
    pub fn ack_required(&self) -> bool {
        self.ack_required
    }

    /// Check if the ack tick is still running.
    pub fn is_active(&self) -> bool {
        self.ack_deadline.is_some()
    }

    /// Counters.
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Process an inbound data frame.
    ///
    /// Returns the payload if the frame is the next expected one. Any other
    /// frame is discarded, but still schedules an ack so the sender learns
    /// where the receiver stands.
    pub fn on_data(&mut self, frame: DataFrame) -> Option<Bytes> {
        if !self.is_active() {
            return None;
        }
        self.ack_required = true;

        let seq = frame.sequence_number();
        if seq == self.next_expected {
            trace!(%seq, len = frame.payload().len(), "deliver data");
            self.next_expected = self.next_expected.increment();
            self.stats.frames_delivered += 1;
            Some(frame.into_payload())
        } else {
            trace!(%seq, expected = %self.next_expected, "discard unexpected data");
            self.stats.frames_discarded += 1;
            None
        }
    }

    /// Run the ack tick if it is due by `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        let Some(deadline) = self.ack_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        // fixed rate; a late tick does not accumulate missed periods
        self.ack_deadline = Some(now + self.ack_period);

        if self.ack_required {
            self.ack_required = false;
            let ack = AckFrame::new(self.next_expected.decrement());
            trace!(seq = %ack.sequence_number(), "write ack");
            self.outbox.push_back(ack);
            self.stats.acks_sent += 1;
        }
    }

    /// Stop the ack tick. Nothing is emitted or delivered afterwards.
    pub fn on_channel_inactive(&mut self) {
        self.ack_deadline = None;
        self.ack_required = false;
        self.outbox.clear();
    }

    /// Next ack to hand to the transport.
    pub fn poll_transmit(&mut self) -> Option<AckFrame> {
        self.outbox.pop_front()
    }

    /// Deadline of the next ack tick.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.ack_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(10);

    fn receiver(now: Instant) -> GoBackNReceiver {
        let config = ArqConfig::builder()
            .retry_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        GoBackNReceiver::new(&config, now)
    }

    fn data(seq: u32, payload: &'static [u8]) -> DataFrame {
        DataFrame::new(SequenceNumber::new(seq), Bytes::from_static(payload))
    }

    #[test]
    fn test_delivers_in_order() {
        let mut receiver = receiver(Instant::now());

        assert_eq!(receiver.on_data(data(0, b"a")), Some(Bytes::from_static(b"a")));
        assert_eq!(receiver.on_data(data(1, b"b")), Some(Bytes::from_static(b"b")));
        assert_eq!(receiver.next_expected(), SequenceNumber::new(2));
    }

    #[test]
    fn test_no_buffering_past_gap() {
        let mut receiver = receiver(Instant::now());
        assert!(receiver.on_data(data(0, b"a")).is_some());

        // frame 2 arrives before frame 1 and is dropped for good
        assert_eq!(receiver.on_data(data(2, b"c")), None);
        assert_eq!(receiver.on_data(data(1, b"b")), Some(Bytes::from_static(b"b")));
        assert_eq!(receiver.next_expected(), SequenceNumber::new(2));

        // only a resend of frame 2 delivers it
        assert_eq!(receiver.on_data(data(2, b"c")), Some(Bytes::from_static(b"c")));
        assert_eq!(receiver.stats().frames_discarded, 1);
    }

    #[test]
    fn test_duplicate_is_discarded() {
        let mut receiver = receiver(Instant::now());
        assert!(receiver.on_data(data(0, b"a")).is_some());
        assert_eq!(receiver.on_data(data(0, b"a")), None);
        assert_eq!(receiver.stats().frames_delivered, 1);
    }

    #[test]
    fn test_ack_is_rate_limited() {
        let start = Instant::now();
        let mut receiver = receiver(start);

        for seq in 0..5 {
            receiver.on_data(data(seq, b"x"));
        }
        assert!(receiver.poll_transmit().is_none());

        receiver.handle_timeout(start + PERIOD);
        let ack = receiver.poll_transmit().unwrap();
        assert_eq!(ack.sequence_number(), SequenceNumber::new(4));
        assert!(receiver.poll_transmit().is_none());
        assert_eq!(receiver.poll_timeout(), Some(start + PERIOD * 2));
    }

    #[test]
    fn test_idle_tick_sends_nothing() {
        let start = Instant::now();
        let mut receiver = receiver(start);

        receiver.handle_timeout(start + PERIOD);
        assert!(receiver.poll_transmit().is_none());
        // still rescheduled
        assert_eq!(receiver.poll_timeout(), Some(start + PERIOD * 2));
    }

    #[test]
    fn test_early_tick_is_ignored() {
        let start = Instant::now();
        let mut receiver = receiver(start);
        receiver.on_data(data(0, b"x"));

        receiver.handle_timeout(start + PERIOD / 2);
        assert!(receiver.poll_transmit().is_none());
        assert!(receiver.ack_required());
    }

    #[test]
    fn test_discarded_frame_still_triggers_ack() {
        let start = Instant::now();
        let mut receiver = receiver(start);
        receiver.on_data(data(0, b"a"));
        receiver.handle_timeout(start + PERIOD);
        receiver.poll_transmit();

        receiver.on_data(data(3, b"d"));
        receiver.handle_timeout(start + PERIOD * 2);

        // repeats the last contiguous delivery
        let ack = receiver.poll_transmit().unwrap();
        assert_eq!(ack.sequence_number(), SequenceNumber::new(0));
    }

    #[test]
    fn test_ack_before_any_delivery_wraps() {
        let start = Instant::now();
        let mut receiver = receiver(start);

        receiver.on_data(data(9, b"late"));
        receiver.handle_timeout(start + PERIOD);

        let ack = receiver.poll_transmit().unwrap();
        assert_eq!(ack.sequence_number(), SequenceNumber::MAX);
    }

    #[test]
    fn test_inactive_stops_ticking() {
        let start = Instant::now();
        let mut receiver = receiver(start);
        receiver.on_data(data(0, b"a"));

        receiver.on_channel_inactive();
        receiver.handle_timeout(start + PERIOD);

        assert!(!receiver.is_active());
        assert!(receiver.poll_timeout().is_none());
        assert!(receiver.poll_transmit().is_none());
        assert_eq!(receiver.on_data(data(1, b"b")), None);
    }
}
