use serde::{Serialize, Serializer};

/// Capacity policy shared by every growable buffer: empty buffers jump to 8
/// slots, full ones double.
pub const fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 { 8 } else { capacity * 2 }
}

/// Append-mostly buffer with an explicit, observable capacity.
///
/// `Vec` is free to over-allocate, so the logical capacity is tracked here and
/// the backing storage is reserved to at least that size on each growth step.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Buffer<T> {
    pub const fn new() -> Self {
        Buffer { items: Vec::new(), capacity: 0 }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.capacity = grow_capacity(self.capacity);
            self.items.reserve_exact(self.capacity - self.items.len());
        }
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Drop every element but keep the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Free the allocation and return to the freshly constructed state.
    pub fn release(&mut self) {
        self.items = Vec::new();
        self.capacity = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> std::ops::Deref for Buffer<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: Serialize> Serialize for Buffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_with_no_capacity() {
        let buf: Buffer<u8> = Buffer::new();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn capacity_doubles_from_eight() {
        let mut buf = Buffer::new();
        let mut seen = vec![buf.capacity()];
        for i in 0..100u32 {
            buf.push(i);
            assert!(buf.capacity() >= buf.len());
            if *seen.last().unwrap() != buf.capacity() {
                seen.push(buf.capacity());
            }
        }
        assert_eq!(seen, vec![0, 8, 16, 32, 64, 128]);
    }

    #[test]
    fn capacity_after_exact_boundaries() {
        let mut buf = Buffer::new();
        for k in 1..=33usize {
            buf.push(k);
            let expected = match k {
                1..=8 => 8,
                9..=16 => 16,
                17..=32 => 32,
                _ => 64,
            };
            assert_eq!(buf.capacity(), expected, "after {k} pushes");
        }
    }

    #[test]
    fn pop_keeps_capacity() {
        let mut buf = Buffer::new();
        for i in 0..10 {
            buf.push(i);
        }
        assert_eq!(buf.pop(), Some(9));
        assert_eq!(buf.len(), 9);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn release_resets_to_initial_state() {
        let mut buf = Buffer::new();
        buf.push(1u8);
        buf.release();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        buf.push(2);
        assert_eq!(buf.capacity(), 8);
    }
}
