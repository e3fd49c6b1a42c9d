//! Keyed single-flight memoization.
//!
//! The first caller for a key runs the computation; concurrent callers for the
//! same key block on the same cell and reuse its value. Failed computations
//! leave the cell empty, so a later caller tries again.

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

pub struct SingleFlight<K, V> {
    cells: Mutex<FxHashMap<K, Arc<OnceCell<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> SingleFlight<K, V> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(FxHashMap::default()),
        }
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        // The map lock is only held long enough to find or insert the cell;
        // the computation itself runs under the cell's own lock.
        let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cells.entry(key.clone()).or_default())
    }

    pub fn get_or_try_init<E, F>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.cell(key).get_or_try_init(init).cloned()
    }

    /// Value for `key` if a computation already finished successfully.
    pub fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.get(key).and_then(|cell| cell.get().cloned())
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
