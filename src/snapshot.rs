//! Copy-on-write snapshot cell.
//!
//! Readers take the current `Arc` without locking and then work on an
//! immutable value; writers build a replacement off to the side and swap it
//! in. Loads never wait on a writer.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

pub struct SnapshotCell<T> {
    current: ArcSwap<T>,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
        }
    }

    /// Current snapshot. Later stores do not affect the returned value.
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Replace the snapshot, returning the previous one.
    pub fn store(&self, value: Arc<T>) -> Arc<T> {
        self.current.swap(value)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnapshotCell").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_snapshot_survives_store() {
        let cell = SnapshotCell::new(vec![1, 2, 3]);
        let before = cell.load();

        let old = cell.store(Arc::new(vec![4]));
        assert_eq!(*old, vec![1, 2, 3]);
        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*cell.load(), vec![4]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let cell = Arc::new(SnapshotCell::new(vec![0u32; 64]));

        std::thread::scope(|s| {
            for _ in 0..4 {
                let cell = cell.clone();
                s.spawn(move || {
                    for _ in 0..1000 {
                        let v = cell.load();
                        let first = v[0];
                        assert!(v.iter().all(|&x| x == first));
                    }
                });
            }
            for i in 1..=200u32 {
                cell.store(Arc::new(vec![i; 64]));
            }
        });

        assert_eq!(cell.load()[0], 200);
    }
}
