//! Pending-bytes writability signal.
//!
//! Tracks bytes accepted by the connection but not yet released and turns
//! them into a writable/unwritable flag with hysteresis: the flag drops once
//! pending bytes exceed the high watermark and rises again once they fall
//! below the low watermark. Producers outside the connection task observe the
//! flag through a [`watch`] channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::trace;

use crate::core::Backpressure;
use crate::core::constants::{DEFAULT_HIGH_WATERMARK, DEFAULT_LOW_WATERMARK};

#[derive(Debug)]
struct Inner {
    pending: AtomicUsize,
    high_watermark: usize,
    low_watermark: usize,
    writable: watch::Sender<bool>,
}

/// Shared writability signal of one connection.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct Writability {
    inner: Arc<Inner>,
}

impl Default for Writability {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATERMARK, DEFAULT_LOW_WATERMARK)
    }
}

impl Writability {
    /// Create a signal with the given watermarks (in bytes).
    pub fn new(high_watermark: usize, low_watermark: usize) -> Self {
        let (writable, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                pending: AtomicUsize::new(0),
                high_watermark,
                low_watermark,
                writable,
            }),
        }
    }

    /// Bytes currently pending.
    pub fn pending_bytes(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Check if producers may keep writing.
    pub fn is_writable(&self) -> bool {
        *self.inner.writable.borrow()
    }

    /// Subscribe to writability changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.writable.subscribe()
    }

    /// Wait until the signal reports writable.
    pub async fn writable(&self) {
        let mut rx = self.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|writable| *writable).await;
    }

    fn update(&self, pending: usize) {
        let writable = self.is_writable();
        if writable && pending > self.inner.high_watermark {
            trace!(pending, "channel became unwritable");
            self.inner.writable.send_replace(false);
        } else if !writable && pending < self.inner.low_watermark {
            trace!(pending, "channel became writable");
            self.inner.writable.send_replace(true);
        }
    }
}

impl Backpressure for Writability {
    fn increment_pending(&self, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let pending = self.inner.pending.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.update(pending);
    }

    fn decrement_pending(&self, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let previous = self
            .inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                Some(pending.saturating_sub(bytes))
            })
            .unwrap_or_default();
        self.update(previous.saturating_sub(bytes));
    }
}
