//! Core type definitions for Cairn.

use std::fmt;

/// Sequence number of a committed write.
///
/// Sequence numbers provide total ordering of writes. A checkpoint is cut
/// at one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// Number of a write-ahead log segment.
///
/// Log numbers are allocated from the same counter as other file numbers
/// and increase with every new segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LogNumber(pub u64);

impl LogNumber {
    /// Largest possible log number.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a new log number.
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Returns the raw log number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_number_ordering() {
        assert!(SequenceNumber::new(1) < SequenceNumber::new(2));
        assert_eq!(SequenceNumber::default().as_u64(), 0);
    }

    #[test]
    fn log_number_display() {
        assert_eq!(format!("{}", LogNumber::new(42)), "log:42");
        assert_eq!(LogNumber::MAX.as_u64(), u64::MAX);
    }
}
