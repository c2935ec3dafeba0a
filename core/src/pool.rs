//! Allocation reuse for per-frame structures.
//!
//! The frame scheduler rebuilds its graph, schedule and command lists every
//! frame. Dropping those structures would release their `Vec` capacity only
//! for the next frame to allocate it again. [`FramePool<T>`] keeps a free
//! list of cleared values handed out with [`acquire`](FramePool::acquire)
//! and returned with [`recycle`](FramePool::recycle).
//!
//! # Example
//!
//! ```
//! use scopegraph_core::pool::{FramePool, Poolable};
//!
//! #[derive(Debug, Default)]
//! struct ScopeOrder {
//!     nodes: Vec<u32>,
//! }
//!
//! impl Poolable for ScopeOrder {
//!     fn new_empty() -> Self {
//!         Self::default()
//!     }
//!     fn reset(&mut self) {
//!         self.nodes.clear();
//!     }
//! }
//!
//! let mut pool = FramePool::<ScopeOrder>::new();
//! let mut order = pool.acquire();
//! order.nodes.extend_from_slice(&[2, 0, 1]);
//! pool.recycle(order);
//!
//! let reused = pool.acquire();
//! assert!(reused.nodes.is_empty());
//! assert!(reused.nodes.capacity() >= 3);
//! ```

/// Types that can be cleared and reused across frames.
pub trait Poolable {
    /// Create a new empty instance.
    fn new_empty() -> Self;

    /// Clear the value while keeping allocated capacity.
    ///
    /// Call `Vec::clear()` rather than replacing the `Vec`.
    fn reset(&mut self);
}

/// A free list of reusable values.
///
/// Values come back from [`recycle`](Self::recycle) already reset, so
/// [`acquire`](Self::acquire) always hands out an empty value.
#[derive(Debug)]
pub struct FramePool<T: Poolable> {
    free: Vec<T>,
    acquired_total: u64,
    reused_total: u64,
}

impl<T: Poolable> FramePool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            acquired_total: 0,
            reused_total: 0,
        }
    }

    /// Take an empty value, reusing a recycled one when available.
    pub fn acquire(&mut self) -> T {
        self.acquired_total += 1;
        match self.free.pop() {
            Some(value) => {
                self.reused_total += 1;
                value
            }
            None => T::new_empty(),
        }
    }

    /// Reset a value and keep it for a later [`acquire`](Self::acquire).
    pub fn recycle(&mut self, mut value: T) {
        value.reset();
        self.free.push(value);
    }

    /// Reset and keep every value yielded by the iterator.
    pub fn recycle_all(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.recycle(value);
        }
    }

    /// Number of values waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Total acquisitions and how many of them reused a recycled value.
    pub fn stats(&self) -> (u64, u64) {
        (self.acquired_total, self.reused_total)
    }
}

impl<T: Poolable> Default for FramePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Commands {
        recorded: Vec<u32>,
    }

    impl Poolable for Commands {
        fn new_empty() -> Self {
            Self::default()
        }
        fn reset(&mut self) {
            self.recorded.clear();
        }
    }

    #[test]
    fn test_frame_pool_reuses_recycled_values() {
        let mut pool = FramePool::<Commands>::new();

        let mut first = pool.acquire();
        first.recorded.extend(0..32);
        pool.recycle(first);
        assert_eq!(pool.free_count(), 1);

        let second = pool.acquire();
        assert!(second.recorded.is_empty());
        assert!(second.recorded.capacity() >= 32);
        assert_eq!(pool.stats(), (2, 1));
    }

    #[test]
    fn test_frame_pool_recycle_all() {
        let mut pool = FramePool::<Commands>::default();
        let values: Vec<Commands> = (0..3).map(|_| pool.acquire()).collect();
        assert_eq!(pool.free_count(), 0);

        pool.recycle_all(values);
        assert_eq!(pool.free_count(), 3);
    }
}
