//! Sending window.
//!
//! Holds the frames that were transmitted but not yet acknowledged, in send
//! order, together with their completions. Two variants exist:
//!
//! - [`SimpleWindow`]: purely in-memory.
//! - [`PendingBytesWindow`]: additionally reports its occupancy to a
//!   [`Backpressure`] signal, so a full window makes the channel unwritable.
//!
//! The variant is chosen at construction time via
//! [`ArqConfig::window_affects_writability`](super::ArqConfig).

use std::collections::VecDeque;
use std::collections::vec_deque;

use crate::core::{ArqError, Backpressure};

use super::completion::Completion;
use super::frame::DataFrame;

/// One in-flight frame.
#[derive(Debug)]
pub struct Slot {
    frame: DataFrame,
    completion: Completion,
}

impl Slot {
    /// The frame as originally sent.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

/// Bounded FIFO of in-flight frames.
///
/// Slots are ordered by ascending (modular) sequence number, which is also
/// send order. `len() <= capacity()` always holds.
pub trait Window: std::fmt::Debug + Send {
    /// Maximum number of in-flight frames.
    fn capacity(&self) -> usize;

    /// Number of in-flight frames.
    fn len(&self) -> usize;

    /// Check if no frame is in flight.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of frames that may still be added.
    fn free_space(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }

    /// Append a frame. The caller must have checked `free_space() > 0`.
    fn add(&mut self, frame: DataFrame, completion: Completion);

    /// Remove the oldest frame and return its completion.
    fn remove(&mut self) -> Option<Completion>;

    /// Fail every outstanding completion with `cause` and empty the window.
    ///
    /// Returns the number of failed completions.
    fn remove_and_fail_all(&mut self, cause: &ArqError) -> usize {
        let mut failed = 0;
        while let Some(completion) = self.remove() {
            completion.fail(cause.clone());
            failed += 1;
        }
        failed
    }

    /// In-flight slots, oldest first.
    fn slots(&self) -> vec_deque::Iter<'_, Slot>;
}

/// In-memory window.
#[derive(Debug)]
pub struct SimpleWindow {
    capacity: usize,
    slots: VecDeque<Slot>,
}

impl SimpleWindow {
    /// Create an empty window holding up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    fn pop(&mut self) -> Option<Slot> {
        self.slots.pop_front()
    }
}

impl Window for SimpleWindow {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn add(&mut self, frame: DataFrame, completion: Completion) {
        debug_assert!(self.free_space() > 0, "window overflow");
        self.slots.push_back(Slot { frame, completion });
    }

    fn remove(&mut self) -> Option<Completion> {
        self.pop().map(|slot| slot.completion)
    }

    fn slots(&self) -> vec_deque::Iter<'_, Slot> {
        self.slots.iter()
    }
}

/// Window that counts its payload bytes towards a backpressure signal.
#[derive(Debug)]
pub struct PendingBytesWindow<B> {
    inner: SimpleWindow,
    signal: B,
}

impl<B: Backpressure> PendingBytesWindow<B> {
    /// Create an empty window reporting to `signal`.
    pub fn new(capacity: usize, signal: B) -> Self {
        Self {
            inner: SimpleWindow::new(capacity),
            signal,
        }
    }
}

impl<B: Backpressure> Window for PendingBytesWindow<B> {
    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn add(&mut self, frame: DataFrame, completion: Completion) {
        self.signal.increment_pending(frame.payload().len());
        self.inner.add(frame, completion);
    }

    fn remove(&mut self) -> Option<Completion> {
        let slot = self.inner.pop()?;
        self.signal.decrement_pending(slot.frame.payload().len());
        Some(slot.completion)
    }

    fn slots(&self) -> vec_deque::Iter<'_, Slot> {
        self.inner.slots()
    }
}
