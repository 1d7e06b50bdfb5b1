//! Joined row id allocation.

use alloc::collections::BinaryHeap;
use core::cmp::Reverse;
use ripple_core::RowIndex;

/// Hands out joined row ids, reusing released ids lowest first.
#[derive(Debug, Default)]
pub struct RowIdPool {
    next: RowIndex,
    free: BinaryHeap<Reverse<RowIndex>>,
}

impl RowIdPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lowest released id, or a fresh one.
    pub fn allocate(&mut self) -> RowIndex {
        match self.free.pop() {
            Some(Reverse(id)) => id,
            None => {
                let id = self.next;
                self.next += 1;
                id
            }
        }
    }

    /// Returns `id` to the pool.
    pub fn release(&mut self, id: RowIndex) {
        self.free.push(Reverse(id));
    }

    /// Returns one past the highest id ever handed out.
    #[inline]
    pub fn capacity(&self) -> RowIndex {
        self.next
    }

    /// Returns the number of released ids waiting for reuse.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_sequential() {
        let mut pool = RowIdPool::new();
        assert_eq!(pool.allocate(), 0);
        assert_eq!(pool.allocate(), 1);
        assert_eq!(pool.allocate(), 2);
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_released_ids_reused_lowest_first() {
        let mut pool = RowIdPool::new();
        for _ in 0..5 {
            pool.allocate();
        }
        pool.release(3);
        pool.release(1);
        pool.release(4);
        assert_eq!(pool.free_count(), 3);

        assert_eq!(pool.allocate(), 1);
        assert_eq!(pool.allocate(), 3);
        assert_eq!(pool.allocate(), 4);
        assert_eq!(pool.allocate(), 5);
    }
}
