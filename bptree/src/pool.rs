//! Bounded FIFO pool for recycling buffers.
//!
//! The tree keeps spare node buffers in ring buffers so that splits do not
//! hit the global allocator one buffer at a time.
//!
//! # Design
//!
//! - Fixed capacity chosen at construction time
//! - FIFO order: `pop` returns the oldest pushed item
//! - `push` fails with [`PoolError::BufferFull`] instead of overwriting
//! - Not internally synchronized: the owner serializes access (the tree only
//!   touches its pools while holding its exclusive lock)
//!
//! # Invariants
//!
//! - `count() <= capacity()`
//! - Occupied slots are exactly the `count()` slots starting at `cursor`

/// Errors raised by a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The buffer holds `capacity` items and cannot take more.
    BufferFull { capacity: usize },
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferFull { capacity } => write!(
                f,
                "the buffer is full and cannot take more data (capacity {capacity})"
            ),
        }
    }
}

impl std::error::Error for PoolError {}

/// A fixed-size ring buffer of values with FIFO semantics.
///
/// # Pre-conditions
/// - None; a zero capacity buffer is valid and rejects every push
///
/// # Invariants
/// - `len <= slots.len()`
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    /// Index of the oldest item.
    cursor: usize,
    /// Number of occupied slots.
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer able to hold `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            cursor: 0,
            len: 0,
        }
    }

    /// Push an item at the back.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::BufferFull`] if the buffer already holds
    /// `capacity()` items. The item is dropped in that case.
    pub fn push(&mut self, item: T) -> Result<(), PoolError> {
        let capacity = self.capacity();
        if self.len == capacity {
            return Err(PoolError::BufferFull { capacity });
        }

        let head = (self.cursor + self.len) % capacity;
        self.slots[head] = Some(item);
        self.len += 1;

        Ok(())
    }

    /// Pop the oldest item.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        let item = self.slots[self.cursor].take();
        self.cursor = (self.cursor + 1) % self.capacity();
        self.len -= 1;

        item
    }

    /// Look at the oldest item without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.cursor].as_ref()
    }

    /// Number of items currently held.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.len
    }

    /// Maximum number of items the buffer can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let buffer = RingBuffer::<u32>::new(4);
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.count(), 0);
        assert!(buffer.peek().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let mut buffer = RingBuffer::new(3);
        buffer.push("a").unwrap();
        buffer.push("b").unwrap();
        buffer.push("c").unwrap();

        assert_eq!(buffer.peek(), Some(&"a"));
        assert_eq!(buffer.pop(), Some("a"));
        assert_eq!(buffer.pop(), Some("b"));
        assert_eq!(buffer.pop(), Some("c"));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_push_when_full() {
        let mut buffer = RingBuffer::new(2);
        buffer.push(1).unwrap();
        buffer.push(2).unwrap();

        assert_eq!(buffer.push(3), Err(PoolError::BufferFull { capacity: 2 }));
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.pop(), Some(1));
    }

    #[test]
    fn test_wraps_around() {
        let mut buffer = RingBuffer::new(2);
        for round in 0..10 {
            buffer.push(round).unwrap();
            buffer.push(round + 100).unwrap();
            assert_eq!(buffer.pop(), Some(round));
            assert_eq!(buffer.peek(), Some(&(round + 100)));
            assert_eq!(buffer.pop(), Some(round + 100));
        }
        assert_eq!(buffer.count(), 0);
    }

    #[test]
    fn test_zero_capacity_rejects_push() {
        let mut buffer = RingBuffer::new(0);
        assert_eq!(buffer.push(7), Err(PoolError::BufferFull { capacity: 0 }));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_error_display() {
        let error = PoolError::BufferFull { capacity: 8 };
        assert_eq!(
            error.to_string(),
            "the buffer is full and cannot take more data (capacity 8)"
        );
    }
}
