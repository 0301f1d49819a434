//! Bounded byte buffer used to accumulate raw chunk text per session.
//!
//! The streaming parser never holds an unbounded amount of un-parsed text:
//! once a session's accumulated text exceeds `max_bytes`, the oldest bytes
//! are dropped. Callers are responsible for only discarding up to a safe
//! split point (see the parser crate); this type itself has no opinion on
//! where that point is.

use std::collections::VecDeque;
use std::fmt;

/// A ring buffer that maintains a fixed maximum size.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: VecDeque<u8>,
    max_bytes: usize,
    total_bytes_written: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified maximum size.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_bytes.min(8192)),
            max_bytes,
            total_bytes_written: 0,
        }
    }

    /// Append data to the buffer, dropping the oldest bytes if it would
    /// exceed `max_bytes`.
    pub fn write(&mut self, data: &[u8]) {
        self.total_bytes_written += data.len();

        for &byte in data {
            if self.buffer.len() >= self.max_bytes {
                self.buffer.pop_front();
            }
            self.buffer.push_back(byte);
        }
    }

    /// Drop the first `n` bytes without writing anything, for aligning the
    /// buffer to a safe split point after an overflow decision.
    pub fn drop_prefix(&mut self, n: usize) {
        for _ in 0..n.min(self.buffer.len()) {
            self.buffer.pop_front();
        }
    }

    /// Number of bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer currently holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes ever written, including ones since dropped.
    #[must_use]
    pub const fn total_bytes_written(&self) -> usize {
        self.total_bytes_written
    }

    /// Whether any bytes have ever been dropped due to capacity.
    #[must_use]
    pub fn was_truncated(&self) -> bool {
        self.total_bytes_written > self.buffer.len()
    }

    /// Borrow the buffered bytes as two contiguous slices (front, back).
    #[must_use]
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        self.buffer.as_slices()
    }

    /// Copy the buffered bytes into a contiguous `Vec<u8>`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.iter().copied().collect()
    }
}

impl fmt::Display for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_vec();
        write!(f, "{}", String::from_utf8_lossy(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_write_and_display() {
        let mut buffer = RingBuffer::new(10);
        buffer.write(b"hello");
        assert_eq!(buffer.to_string(), "hello");
        assert_eq!(buffer.len(), 5);
        assert!(!buffer.is_empty());
        assert!(!buffer.was_truncated());
    }

    #[test]
    fn overflow_drops_oldest_bytes() {
        let mut buffer = RingBuffer::new(10);
        buffer.write(b"hello");
        buffer.write(b"world!");

        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.to_string(), "elloworld!");
        assert_eq!(buffer.total_bytes_written(), 11);
        assert!(buffer.was_truncated());
    }

    #[test]
    fn drop_prefix_advances_cursor_semantics() {
        let mut buffer = RingBuffer::new(100);
        buffer.write(b"{\"a\":1},{\"b\":2}");
        buffer.drop_prefix(8);
        assert_eq!(buffer.to_string(), "{\"b\":2}");
    }

    #[test]
    fn utf8_round_trip() {
        let mut buffer = RingBuffer::new(20);
        buffer.write("hello 世界".as_bytes());
        assert_eq!(buffer.to_string(), "hello 世界");
    }

    #[test]
    fn empty_buffer() {
        let buffer = RingBuffer::new(10);
        assert!(buffer.is_empty());
        assert_eq!(buffer.to_string(), "");
        assert!(!buffer.was_truncated());
    }
}
