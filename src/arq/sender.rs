//! Go-Back-N sender.
//!
//! Turns application writes into sequenced data frames, keeps at most
//! `window_size` of them in flight, consumes cumulative acks and resends the
//! whole window when the retry timer expires.
//!
//! The sender is sans-IO. Outbound frames are drained with
//! [`GoBackNSender::poll_transmit`], the retry timer is a deadline exposed by
//! [`GoBackNSender::poll_timeout`] and fired by
//! [`GoBackNSender::handle_timeout`]. Every method that touches the timer has
//! an `_at` variant taking the current time explicitly.
//!
//! ```text
//!        base                next_seq
//!          │                     │
//!  ────────┼─────────────────────┼──────────────▶ seq space (mod 2^32)
//!   acked  │ <── window (sent) ─▶│ <── overflow (queued, unsequenced)
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::core::{ArqError, ArqResult, Backpressure};

use super::completion::{Completion, WriteHandle, completion};
use super::config::ArqConfig;
use super::frame::{AckFrame, DataFrame};
use super::seq::SequenceNumber;
use super::stats::SenderStats;
use super::window::{PendingBytesWindow, SimpleWindow, Window};
use super::writability::Writability;

/// A write waiting for window space.
#[derive(Debug)]
struct QueuedWrite {
    payload: Bytes,
    completion: Completion,
}

/// Sender half of a Go-Back-N connection.
#[derive(Debug)]
pub struct GoBackNSender {
    /// Frames sent but not yet acknowledged
    window: Box<dyn Window>,

    /// Writes waiting for window space, in submission order
    overflow: VecDeque<QueuedWrite>,

    /// Oldest unacknowledged sequence number
    base: SequenceNumber,

    /// Next sequence number to assign
    next_seq: SequenceNumber,

    retry_timeout: Duration,

    /// Retry timer; `None` when stopped
    retry_deadline: Option<Instant>,

    max_retransmits: Option<u32>,

    /// Consecutive timeouts since the last acknowledgment progress
    retransmits_without_progress: u32,

    /// Overflow bytes always count here; window bytes only with the
    /// pending-bytes window variant
    writability: Writability,

    outbox: VecDeque<DataFrame>,

    closed: bool,

    stats: SenderStats,
}

impl GoBackNSender {
    /// Create a sender for a freshly activated connection.
    pub fn new(config: &ArqConfig, writability: Writability) -> Self {
        let window: Box<dyn Window> = if config.window_affects_writability {
            Box::new(PendingBytesWindow::new(config.window_size, writability.clone()))
        } else {
            Box::new(SimpleWindow::new(config.window_size))
        };

        debug!(
            window_size = config.window_size,
            retry_timeout_ms = config.retry_timeout.as_millis() as u64,
            "go-back-n sender created"
        );

        Self {
            window,
            overflow: VecDeque::new(),
            base: config.initial_base,
            next_seq: config.initial_next_seq,
            retry_timeout: config.retry_timeout,
            retry_deadline: None,
            max_retransmits: config.max_retransmits,
            retransmits_without_progress: 0,
            writability,
            outbox: VecDeque::new(),
            closed: false,
            stats: SenderStats::default(),
        }
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    /// Next sequence number to assign.
    pub fn next_seq(&self) -> SequenceNumber {
        self.next_seq
    }

    /// Number of frames in flight.
    pub fn in_flight(&self) -> usize {
        self.window.len()
    }

    /// Number of writes waiting for window space.
    pub fn queued(&self) -> usize {
        self.overflow.len()
    }

    /// The in-flight window.
    pub fn window(&self) -> &dyn Window {
        self.window.as_ref()
    }

    /// Check if the sender was torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Counters.
    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// Submit a payload; see [`GoBackNSender::write_with_at`].
    pub fn write(&mut self, payload: Bytes) -> WriteHandle {
        self.write_at(payload, Instant::now())
    }

    /// Submit a payload at a given time and return the caller's handle.
    pub fn write_at(&mut self, payload: Bytes, now: Instant) -> WriteHandle {
        let (completion, handle) = completion();
        self.write_with_at(payload, completion, now);
        handle
    }

    /// Queue a payload behind all earlier writes and send what the window allows.
    ///
    /// After teardown the completion fails immediately with
    /// [`ArqError::ChannelClosed`].
    pub fn write_with_at(&mut self, payload: Bytes, completion: Completion, now: Instant) {
        if self.closed {
            completion.fail(ArqError::ChannelClosed);
            self.stats.writes_failed += 1;
            return;
        }

        self.writability.increment_pending(payload.len());
        self.overflow.push_back(QueuedWrite {
            payload,
            completion,
        });
        self.pump(now);
    }

    /// Move queued writes into free window slots and transmit them.
    fn pump(&mut self, now: Instant) {
        while self.window.free_space() > 0 {
            let Some(QueuedWrite {
                payload,
                completion,
            }) = self.overflow.pop_front()
            else {
                break;
            };
            self.writability.decrement_pending(payload.len());

            if completion.is_resolved() {
                trace!(len = payload.len(), "drop cancelled write");
                self.stats.writes_cancelled += 1;
                continue;
            }

            let frame = DataFrame::new(self.next_seq, payload);
            trace!(seq = %frame.sequence_number(), len = frame.payload().len(), "write data");
            self.window.add(frame.clone(), completion);
            self.outbox.push_back(frame);
            self.stats.frames_sent += 1;

            // first frame in an empty window
            if self.base == self.next_seq {
                self.reset_timer(now);
            }

            self.next_seq = self.next_seq.increment();
        }
    }

    /// Process an inbound ack; see [`GoBackNSender::on_ack_at`].
    pub fn on_ack(&mut self, ack: AckFrame) {
        self.on_ack_at(ack, Instant::now());
    }

    /// Process an inbound cumulative ack at a given time.
    ///
    /// Stale, duplicate and out-of-order acks are dropped; a later ack covers
    /// the same frames.
    pub fn on_ack_at(&mut self, ack: AckFrame, now: Instant) {
        if self.closed {
            return;
        }
        self.stats.acks_received += 1;
        let acked = ack.sequence_number();
        trace!(seq = %acked, base = %self.base, next_seq = %self.next_seq, "got ack");

        if acked.increment() == self.next_seq {
            self.stop_timer();
        } else {
            self.reset_timer(now);
        }

        let Some(cum_ack) = self.cumulative_ack_count(acked) else {
            if acked.is_after(self.next_seq.decrement()) {
                debug!(seq = %acked, next_seq = %self.next_seq, "drop ack for unsent data");
            } else {
                debug!(seq = %acked, base = %self.base, "drop stale or duplicate ack");
            }
            self.stats.stale_acks += 1;
            return;
        };

        self.base = acked.increment();
        self.retransmits_without_progress = 0;
        for _ in 0..cum_ack {
            if let Some(completion) = self.window.remove() {
                completion.succeed();
                self.stats.writes_succeeded += 1;
            }
        }

        // freed slots may admit queued writes
        self.pump(now);
    }

    /// Number of frames an ack for `acked` completes, if it covers any.
    ///
    /// The ack is accepted when `acked` lies in `[base, next_seq)`, taken
    /// modulo 2^32 so a window straddling the wrap point is handled.
    fn cumulative_ack_count(&self, acked: SequenceNumber) -> Option<u32> {
        acked
            .is_within(self.base, self.next_seq)
            .then(|| acked.distance_from(self.base) + 1)
    }

    /// Fire the retry timer if it expired by `now`.
    ///
    /// Fails with [`ArqError::RetransmitsExhausted`] when the configured cap
    /// was reached; the sender is torn down in that case.
    pub fn handle_timeout(&mut self, now: Instant) -> ArqResult<()> {
        match self.retry_deadline {
            Some(deadline) if now >= deadline => {
                self.retry_deadline = None;
                self.on_retry_timeout(now)
            }
            _ => Ok(()),
        }
    }

    /// Resend the complete window.
    fn on_retry_timeout(&mut self, now: Instant) -> ArqResult<()> {
        // the timer should not fire on an empty window
        if self.window.is_empty() {
            return Ok(());
        }
        self.stats.timeouts += 1;

        if let Some(max) = self.max_retransmits {
            if self.retransmits_without_progress >= max {
                warn!(attempts = max, "retransmission limit reached, giving up");
                let cause = ArqError::RetransmitsExhausted { attempts: max };
                self.close(cause.clone());
                return Err(cause);
            }
        }
        self.retransmits_without_progress += 1;

        warn!(window = self.window.len(), base = %self.base, "ack timeout, resend complete window");
        for slot in self.window.slots() {
            trace!(seq = %slot.frame().sequence_number(), "resend data");
            self.outbox.push_back(slot.frame().clone());
        }
        self.stats.frames_retransmitted += self.window.len() as u64;

        self.reset_timer(now);
        Ok(())
    }

    /// Tear down: fail every queued and in-flight write with `cause`.
    ///
    /// Nothing is transmitted afterwards.
    pub fn close(&mut self, cause: ArqError) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut failed = self.window.remove_and_fail_all(&cause);
        for QueuedWrite {
            payload,
            completion,
        } in self.overflow.drain(..)
        {
            self.writability.decrement_pending(payload.len());
            completion.fail(cause.clone());
            failed += 1;
        }
        self.stats.writes_failed += failed as u64;
        self.outbox.clear();
        self.stop_timer();

        debug!(failed, %cause, "go-back-n sender closed");
    }

    /// Next frame to hand to the transport.
    pub fn poll_transmit(&mut self) -> Option<DataFrame> {
        self.outbox.pop_front()
    }

    /// Deadline of the retry timer, if running.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.retry_deadline
    }

    fn reset_timer(&mut self, now: Instant) {
        trace!("reset retry timer");
        self.retry_deadline = Some(now + self.retry_timeout);
    }

    fn stop_timer(&mut self) {
        if self.retry_deadline.take().is_some() {
            trace!("stop retry timer");
        }
    }
}
