use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, PoisonError};

/// Path-keyed mutual exclusion for writers.
///
/// A caller acquires a whole set of paths at once and blocks until none of
/// them is held by anyone else. Since a set is taken all-or-nothing, callers
/// never hold part of a set while waiting for the rest.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every path in `paths` is free, then hold them all until
    /// the returned guard drops.
    pub fn acquire<I>(&self, paths: I) -> LockGuard<'_>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();

        let mut held = self.held.lock().expect("lock table poisoned");
        while paths.iter().any(|p| held.contains(p)) {
            held = self.released.wait(held).expect("lock table poisoned");
        }
        held.extend(paths.iter().cloned());

        LockGuard { table: self, paths }
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        self.held.lock().expect("lock table poisoned").contains(path)
    }

    /// Number of paths currently held.
    pub fn len(&self) -> usize {
        self.held.lock().expect("lock table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paths held in a [`LockTable`]. Released on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    paths: Vec<PathBuf>,
}

impl LockGuard<'_> {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .table
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for path in &self.paths {
            held.remove(path);
        }
        drop(held);
        self.table.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn acquire_and_release() {
        let table = LockTable::new();
        {
            let guard = table.acquire([p("/a"), p("/b"), p("/a")]);
            assert_eq!(guard.paths(), &[p("/a"), p("/b")]);
            assert!(table.is_locked(Path::new("/a")));
            assert_eq!(table.len(), 2);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn disjoint_sets_do_not_block() {
        let table = LockTable::new();
        let _a = table.acquire([p("/a")]);
        let _b = table.acquire([p("/b")]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_set_never_blocks() {
        let table = LockTable::new();
        let _a = table.acquire([p("/a")]);
        let guard = table.acquire(Vec::new());
        assert!(guard.paths().is_empty());
    }

    #[test]
    fn overlapping_sets_are_exclusive() {
        let table = Arc::new(LockTable::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    // Every set shares "/shared".
                    let _guard = table.acquire([p("/shared"), p(&format!("/own/{i}"))]);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());
    }
}
