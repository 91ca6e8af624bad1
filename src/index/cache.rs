//! Bounded in-memory cache of project indexes.
//!
//! Indexes are keyed by canonical project root and evicted least recently
//! used first. Entries are shared as `Arc`s, so an index handed out stays
//! valid after eviction.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::ProjectIndex;
use crate::error::{Error, Result};
use crate::walk::WalkOptions;

/// Default number of project roots kept.
pub const DEFAULT_CAPACITY: usize = 4;

/// LRU cache of `ProjectIndex` per project root.
pub struct IndexCache {
    entries: Mutex<LruCache<PathBuf, Arc<ProjectIndex>>>,
    options: WalkOptions,
}

impl IndexCache {
    /// Create a cache holding at most `capacity` roots.
    pub fn new(capacity: NonZeroUsize, options: WalkOptions) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            options,
        }
    }

    /// Create a cache with `DEFAULT_CAPACITY`.
    pub fn with_options(options: WalkOptions) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity, options)
    }

    /// The index for `root`, building it on a miss.
    ///
    /// The build runs without holding the lock. Two threads missing on the
    /// same root may both build; the second insert wins and both results
    /// are equivalent.
    pub fn get_or_build(&self, root: &Path) -> Result<Arc<ProjectIndex>> {
        let key = canonical_root(root)?;

        if let Some(hit) = self.entries.lock().get(&key) {
            tracing::trace!(root = %key.display(), "index cache hit");
            return Ok(Arc::clone(hit));
        }

        tracing::debug!(root = %key.display(), "index cache miss");
        let built = Arc::new(ProjectIndex::build(&key, &self.options));

        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key, Arc::clone(&built)) {
            if evicted.as_path() != built.root() {
                tracing::debug!(root = %evicted.display(), "evicted index");
            }
        }
        Ok(built)
    }

    /// Whether `root` currently has a cached index. Does not touch recency.
    pub fn contains(&self, root: &Path) -> bool {
        match canonical_root(root) {
            Ok(key) => self.entries.lock().contains(&key),
            Err(_) => false,
        }
    }

    /// Drop the cached index for `root`. Returns whether one was present.
    pub fn invalidate(&self, root: &Path) -> bool {
        match canonical_root(root) {
            Ok(key) => self.entries.lock().pop(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize().map_err(|e| Error::io(root, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(funcs: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let body: String = funcs
            .iter()
            .map(|f| format!("def {}():\n    pass\n\n", f))
            .collect();
        fs::write(temp.path().join("mod.py"), body).unwrap();
        temp
    }

    fn cache(capacity: usize) -> IndexCache {
        IndexCache::new(
            NonZeroUsize::new(capacity).unwrap(),
            WalkOptions::default(),
        )
    }

    #[test]
    fn test_hit_returns_same_index() {
        let proj = project(&["a"]);
        let cache = cache(2);

        let first = cache.get_or_build(proj.path()).unwrap();
        let second = cache.get_or_build(proj.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let a = project(&["a"]);
        let b = project(&["b"]);
        let c = project(&["c"]);
        let cache = cache(2);

        cache.get_or_build(a.path()).unwrap();
        cache.get_or_build(b.path()).unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        cache.get_or_build(a.path()).unwrap();
        cache.get_or_build(c.path()).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(a.path()));
        assert!(!cache.contains(b.path()));
        assert!(cache.contains(c.path()));
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let proj = project(&["before"]);
        let cache = cache(1);

        let old = cache.get_or_build(proj.path()).unwrap();
        assert!(old.contains("mod.before"));

        fs::write(proj.path().join("mod.py"), "def after():\n    pass\n").unwrap();
        assert!(cache.invalidate(proj.path()));
        assert!(!cache.invalidate(proj.path()));

        let fresh = cache.get_or_build(proj.path()).unwrap();
        assert!(fresh.contains("mod.after"));
        // The evicted handle is still usable.
        assert!(old.contains("mod.before"));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = cache(1).get_or_build(&missing).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
