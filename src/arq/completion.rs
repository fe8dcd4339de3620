//! Write completion handles.
//!
//! A write is split into two halves: the [`Completion`] travels with the
//! payload through the overflow queue and the window, and the caller keeps the
//! [`WriteHandle`], a future that resolves once the peer has cumulatively
//! acknowledged the write (or the connection is torn down).
//!
//! `succeed` and `fail` consume the completion, so every write is resolved at
//! most once. A completion dropped unresolved reads as
//! [`ArqError::ChannelClosed`] on the caller side.
//!
//! Only [`WriteHandle::cancel`] withdraws a write. Dropping the handle merely
//! stops observing the outcome; the write is still delivered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::core::ArqError;

/// Result delivered to the writer.
pub type WriteResult = Result<(), ArqError>;

/// Create a linked completion/handle pair.
pub fn completion() -> (Completion, WriteHandle) {
    let (tx, rx) = oneshot::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    (
        Completion {
            tx,
            cancelled: Arc::clone(&cancelled),
        },
        WriteHandle { rx, cancelled },
    )
}

/// ARQ-side half of a write.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<WriteResult>,
    cancelled: Arc<AtomicBool>,
}

impl Completion {
    /// Report that the peer acknowledged the write.
    pub fn succeed(self) {
        // the writer may have gone away; nothing to report then
        let _ = self.tx.send(Ok(()));
    }

    /// Report that the write failed.
    pub fn fail(self, cause: ArqError) {
        let _ = self.tx.send(Err(cause));
    }

    /// Check if the writer withdrew this write.
    ///
    /// True once [`WriteHandle::cancel`] was called. A handle that was merely
    /// dropped does not count.
    pub fn is_resolved(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Caller-side half of a write.
///
/// Awaiting the handle yields the write's outcome; dropping it sends the
/// write without waiting for the ack. Cancelling it while the write still
/// waits for window space discards the write without consuming a sequence
/// number. Once the write holds a window slot, cancellation only detaches the
/// caller: the frame keeps its slot and is retransmitted until acknowledged,
/// so both peers keep the same sequence.
#[derive(Debug)]
pub struct WriteHandle {
    rx: oneshot::Receiver<WriteResult>,
    cancelled: Arc<AtomicBool>,
}

impl WriteHandle {
    /// Give up on the write.
    pub fn cancel(self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Poll the outcome without waiting.
    ///
    /// Returns `None` while the write is still pending.
    pub fn try_result(&mut self) -> Option<WriteResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ArqError::ChannelClosed)),
        }
    }
}

impl Future for WriteHandle {
    type Output = WriteResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ArqError::ChannelClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeed() {
        let (completion, handle) = completion();
        completion.succeed();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_fail() {
        let (completion, handle) = completion();
        completion.fail(ArqError::RetransmitsExhausted { attempts: 2 });
        assert!(matches!(
            handle.await,
            Err(ArqError::RetransmitsExhausted { attempts: 2 })
        ));
    }

    #[tokio::test]
    async fn test_dropped_completion_reads_as_closed() {
        let (completion, handle) = completion();
        drop(completion);
        assert!(matches!(handle.await, Err(ArqError::ChannelClosed)));
    }

    #[test]
    fn test_cancel_marks_resolved() {
        let (completion, handle) = completion();
        assert!(!completion.is_resolved());

        handle.cancel();
        assert!(completion.is_resolved());

        // resolving after cancellation is harmless
        completion.succeed();
    }

    #[test]
    fn test_dropped_handle_is_not_cancelled() {
        let (completion, handle) = completion();
        drop(handle);
        assert!(!completion.is_resolved());
        completion.succeed();
    }

    #[test]
    fn test_try_result() {
        let (completion, mut handle) = completion();
        assert!(handle.try_result().is_none());

        completion.succeed();
        assert!(matches!(handle.try_result(), Some(Ok(()))));
    }
}
