//! Collaborator interfaces consumed by the ARQ core.

/// Backpressure signal of the owning transport.
///
/// Implementors track the number of bytes that are accepted but not yet
/// released and derive a writability flag from it. Both calls happen on the
/// connection's own task.
pub trait Backpressure: std::fmt::Debug + Send + Sync {
    /// Account `bytes` more pending bytes.
    fn increment_pending(&self, bytes: usize);

    /// Release `bytes` pending bytes.
    fn decrement_pending(&self, bytes: usize);
}
