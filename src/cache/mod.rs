// Copyright (c) 2025 - Cowboy AI, Inc.
//! Lazy Keyed Cache
//!
//! `LazyMap<K, V>` memoizes a factory per key. The first `get(key)` runs the
//! factory and stores the result; every later call returns the same shared
//! `Arc<V>`. Entries are never evicted, which matches the append-only data
//! they describe: a device or a measurement collection, once seen, keeps its
//! signal bundle for the life of the process.
//!
//! # Layout
//!
//! ```text
//! index: HashMap<K, usize> ──→ arena: Vec<Arc<V>>
//! ```
//!
//! Keys compare by value (`Eq + Hash`), so two hashes with the same bytes hit
//! the same entry regardless of where they came from.
//!
//! # Single-Flight
//!
//! The factory runs while the map's mutex is held. Concurrent callers for the
//! same unseen key wait on that mutex and find the entry already built, so the
//! factory runs at most once per key. The factory must therefore not call back
//! into the same map; factories in this crate only build signals, which do no
//! work until they are watched. A factory that re-enters its own map panics
//! with the map's label instead of deadlocking.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::frp::lock;

type Factory<K, V> = Box<dyn Fn(&K) -> V + Send + Sync>;

struct Entries<K, V> {
    index: HashMap<K, usize>,
    arena: Vec<Arc<V>>,
}

/// Memoizing map from key to lazily built value
pub struct LazyMap<K, V> {
    label: &'static str,
    factory: Factory<K, V>,
    entries: Mutex<Entries<K, V>>,
    building: Mutex<Option<ThreadId>>,
}

/// Marks the current thread as running a map's factory until dropped
struct Building<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> Building<'a> {
    fn enter(marker: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(marker) = Some(thread::current().id());
        Self(marker)
    }
}

impl Drop for Building<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

impl<K, V> LazyMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty map with the factory used to build missing entries
    ///
    /// The factory runs under the map's lock and must not access the same map.
    pub fn new<F>(label: &'static str, factory: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self {
            label,
            factory: Box::new(factory),
            entries: Mutex::new(Entries {
                index: HashMap::new(),
                arena: Vec::new(),
            }),
            building: Mutex::new(None),
        }
    }

    /// Entry for `key`, built on first access
    ///
    /// # Panics
    ///
    /// When called from inside this map's own factory.
    pub fn get(&self, key: &K) -> Arc<V> {
        assert!(
            *lock(&self.building) != Some(thread::current().id()),
            "LazyMap `{}`: factory re-entered its own map for key {:?}",
            self.label,
            key
        );
        let mut entries = lock(&self.entries);
        if let Some(&slot) = entries.index.get(key) {
            return Arc::clone(&entries.arena[slot]);
        }

        debug!(cache = self.label, key = ?key, "materialising entry");
        let value = {
            let _building = Building::enter(&self.building);
            Arc::new((self.factory)(key))
        };
        let slot = entries.arena.len();
        entries.arena.push(Arc::clone(&value));
        entries.index.insert(key.clone(), slot);
        value
    }

    /// Whether `key` has been materialised
    pub fn contains_key(&self, key: &K) -> bool {
        lock(&self.entries).index.contains_key(key)
    }

    /// Number of materialised entries
    pub fn len(&self) -> usize {
        lock(&self.entries).arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> fmt::Debug for LazyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyMap")
            .field("label", &self.label)
            .field("entries", &lock(&self.entries).arena.len())
            .finish()
    }
}
