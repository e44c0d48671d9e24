use crate::AppResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

/// Parsed files shared by path. Each path is loaded at most once; the lock
/// is held while loading so concurrent callers wait for the first load.
pub struct FileCache<T> {
    entries: Mutex<HashMap<PathBuf, Arc<T>>>,
}

impl<T> Default for FileCache<T> {
    fn default() -> Self {
        FileCache::new()
    }
}

impl<T> FileCache<T> {
    pub fn new() -> FileCache<T> {
        FileCache { entries: Mutex::new(HashMap::new()) }
    }

    /// The cached value for `path`, or the result of `load`, which is
    /// cached if it succeeds. Failures are not cached.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> AppResult<Arc<T>>
        where F: FnOnce(&Path) -> AppResult<T>
    {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(x) = entries.get(path) {
            debug!("Cache hit for {}", path.display());
            return Ok(x.clone());
        }
        let x = Arc::new(load(path)?);
        entries.insert(path.to_path_buf(), x.clone());
        Ok(x)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_per_path() {
        let cache: FileCache<u32> = FileCache::new();
        let calls = Cell::new(0);
        let load = |_: &Path| {
            calls.set(calls.get() + 1);
            Ok(7)
        };
        let a = cache.get_or_load(Path::new("sigcfg.dat"), load).unwrap();
        let b = cache.get_or_load(Path::new("sigcfg.dat"), load).unwrap();
        assert_eq!(*a, 7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);
        assert!(cache.contains(Path::new("sigcfg.dat")));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: FileCache<u32> = FileCache::new();
        assert!(cache.get_or_load(Path::new("bad.dat"), |_| Err(failure::err_msg("unreadable"))).is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_load(Path::new("bad.dat"), |_| Ok(1)).unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }
}
