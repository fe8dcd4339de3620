//! Wraparound sequence numbers.
//!
//! Sequence numbers live in the 32-bit modular space. Increment and
//! decrement wrap instead of overflowing, and ordering questions are answered
//! by the modular helpers below rather than by `Ord`, which would be wrong
//! across the wrap point.

use std::fmt;

use crate::core::constants::SEQUENCE_NUMBER_SIZE;

/// A 32-bit sequence number with modular arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// The protocol's zero value.
    pub const MIN: Self = Self(0);
    /// The largest value before wrapping back to [`SequenceNumber::MIN`].
    pub const MAX: Self = Self(u32::MAX);

    /// Create a sequence number from its raw value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The next sequence number, wrapping at [`SequenceNumber::MAX`].
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// The previous sequence number, wrapping at [`SequenceNumber::MIN`].
    #[must_use]
    pub const fn decrement(self) -> Self {
        Self(self.0.wrapping_sub(1))
    }

    /// Number of increments needed to get from `earlier` to `self`.
    pub const fn distance_from(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Check if `self` comes strictly after `other`.
    ///
    /// Two numbers are compared along the shorter arc of the ring, so the
    /// answer is meaningful while they are less than 2^31 apart.
    pub const fn is_after(self, other: Self) -> bool {
        let d = self.distance_from(other);
        d != 0 && d < (1 << 31)
    }

    /// Check if `self` lies in the half-open range `[start, end)` of the ring.
    ///
    /// The range may straddle the wrap point (`start > end` numerically).
    /// An empty range (`start == end`) contains nothing.
    pub const fn is_within(self, start: Self, end: Self) -> bool {
        self.distance_from(start) < end.distance_from(start)
    }

    /// Encode as fixed-width big-endian bytes.
    pub const fn to_bytes(self) -> [u8; SEQUENCE_NUMBER_SIZE] {
        self.0.to_be_bytes()
    }

    /// Decode from fixed-width big-endian bytes.
    pub const fn from_bytes(bytes: [u8; SEQUENCE_NUMBER_SIZE]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u32 {
    fn from(seq: SequenceNumber) -> u32 {
        seq.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_wraps() {
        assert_eq!(SequenceNumber::new(7).increment(), SequenceNumber::new(8));
        assert_eq!(SequenceNumber::MAX.increment(), SequenceNumber::MIN);
    }

    #[test]
    fn test_decrement_wraps() {
        assert_eq!(SequenceNumber::new(8).decrement(), SequenceNumber::new(7));
        assert_eq!(SequenceNumber::MIN.decrement(), SequenceNumber::MAX);
    }

    #[test]
    fn test_distance_across_wrap() {
        let base = SequenceNumber::new(u32::MAX - 1);
        assert_eq!(SequenceNumber::new(u32::MAX).distance_from(base), 1);
        assert_eq!(SequenceNumber::new(0).distance_from(base), 2);
        assert_eq!(SequenceNumber::new(1).distance_from(base), 3);
    }

    #[test]
    fn test_is_after() {
        assert!(SequenceNumber::new(5).is_after(SequenceNumber::new(4)));
        assert!(!SequenceNumber::new(4).is_after(SequenceNumber::new(5)));
        assert!(!SequenceNumber::new(4).is_after(SequenceNumber::new(4)));

        // numerically smaller but after the wrap
        assert!(SequenceNumber::new(2).is_after(SequenceNumber::MAX));
        assert!(!SequenceNumber::MAX.is_after(SequenceNumber::new(2)));
    }

    #[test]
    fn test_is_within() {
        let start = SequenceNumber::new(10);
        let end = SequenceNumber::new(13);

        assert!(SequenceNumber::new(10).is_within(start, end));
        assert!(SequenceNumber::new(12).is_within(start, end));
        assert!(!SequenceNumber::new(13).is_within(start, end));
        assert!(!SequenceNumber::new(9).is_within(start, end));

        // empty range
        assert!(!start.is_within(start, start));
    }

    #[test]
    fn test_is_within_straddling_wrap() {
        let start = SequenceNumber::new(u32::MAX - 1);
        let end = SequenceNumber::new(1);

        assert!(SequenceNumber::new(u32::MAX - 1).is_within(start, end));
        assert!(SequenceNumber::MAX.is_within(start, end));
        assert!(SequenceNumber::MIN.is_within(start, end));
        assert!(!SequenceNumber::new(1).is_within(start, end));
        assert!(!SequenceNumber::new(u32::MAX - 2).is_within(start, end));
    }

    #[test]
    fn test_bytes_are_big_endian() {
        let seq = SequenceNumber::new(0x0102_0304);
        assert_eq!(seq.to_bytes(), [1, 2, 3, 4]);
        assert_eq!(SequenceNumber::from_bytes([1, 2, 3, 4]), seq);
    }

    #[test]
    fn test_display() {
        assert_eq!(SequenceNumber::new(42).to_string(), "42");
    }
}
