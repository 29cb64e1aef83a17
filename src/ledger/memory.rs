// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Ledger
//!
//! Process-local [`Ledger`] used by tests and the demo binary. It keeps the
//! append-only semantics of the real ledger (nothing is removed, deletions are
//! markers) and stamps every write with a logical clock so timestamps are
//! strictly increasing.
//!
//! Test hooks:
//! - [`MemoryLedger::call_count`] counts calls per RPC
//! - [`MemoryLedger::fail_next`] queues transport failures
//! - [`MemoryLedger::set_offline`] fails every call until switched back

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{DeletionMarker, Ledger, LedgerHash, Link, LinkDeletion, Record};
use crate::errors::{LedgerError, LedgerResult};
use crate::frp::{lock, Time};

#[derive(Default)]
struct Store {
    clock: Time,
    records: HashMap<LedgerHash, Record>,
    revisions: HashMap<LedgerHash, Vec<LedgerHash>>,
    deletes: HashMap<LedgerHash, Vec<DeletionMarker>>,
    links: Vec<Link>,
    link_deletions: HashMap<LedgerHash, Vec<LinkDeletion>>,
}

impl Store {
    fn tick(&mut self) -> Time {
        self.clock += 1;
        self.clock
    }

    fn revision(&self, original: LedgerHash, nth: impl FnOnce(&[LedgerHash]) -> Option<&LedgerHash>) -> Option<Record> {
        self.revisions
            .get(&original)
            .and_then(|hashes| nth(hashes))
            .and_then(|hash| self.records.get(hash))
            .cloned()
    }

    fn details(&self, base: LedgerHash, link_type: &str) -> Vec<(Link, Vec<LinkDeletion>)> {
        self.links
            .iter()
            .filter(|link| link.base == base && link.link_type == link_type)
            .map(|link| {
                let deletions = self
                    .link_deletions
                    .get(&link.create_link_hash)
                    .cloned()
                    .unwrap_or_default();
                (link.clone(), deletions)
            })
            .collect()
    }
}

/// Append-only ledger held in memory
pub struct MemoryLedger {
    store: Mutex<Store>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<VecDeque<LedgerError>>,
    offline: AtomicBool,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Ledger whose clock starts at the current wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Utc::now().timestamp_micros())
    }

    /// Ledger whose first write is stamped `start + 1`
    pub fn with_clock(start: Time) -> Self {
        Self {
            store: Mutex::new(Store {
                clock: start,
                ..Store::default()
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of times `method` has been called
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).get(method).copied().unwrap_or(0)
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: LedgerError) {
        lock(&self.failures).push_back(error);
    }

    /// Fail every call with a transport error while `offline` is set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn enter(&self, method: &'static str) -> LedgerResult<()> {
        *lock(&self.calls).entry(method).or_insert(0) += 1;
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger offline".to_string()));
        }
        match lock(&self.failures).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_entry(&self, entry_type: &str, entry: serde_json::Value) -> LedgerResult<Record> {
        self.enter("create_entry")?;
        let mut store = lock(&self.store);
        let hash = LedgerHash::new();
        let record = Record {
            action_hash: hash,
            original_hash: hash,
            entry_type: entry_type.to_string(),
            entry,
            timestamp: store.tick(),
        };
        store.records.insert(hash, record.clone());
        store.revisions.insert(hash, vec![hash]);
        debug!(%hash, entry_type, "created entry");
        Ok(record)
    }

    async fn get_latest(&self, original: LedgerHash) -> LedgerResult<Option<Record>> {
        self.enter("get_latest")?;
        Ok(lock(&self.store).revision(original, |hashes| hashes.last()))
    }

    async fn get_original(&self, original: LedgerHash) -> LedgerResult<Option<Record>> {
        self.enter("get_original")?;
        Ok(lock(&self.store).revision(original, |hashes| hashes.first()))
    }

    async fn get_all_revisions(&self, original: LedgerHash) -> LedgerResult<Vec<Record>> {
        self.enter("get_all_revisions")?;
        let store = lock(&self.store);
        Ok(store
            .revisions
            .get(&original)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| store.records.get(hash).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_entry(
        &self,
        original: LedgerHash,
        previous: LedgerHash,
        entry: serde_json::Value,
    ) -> LedgerResult<Record> {
        self.enter("update_entry")?;
        let mut store = lock(&self.store);
        let entry_type = match store.records.get(&previous) {
            Some(record) if record.original_hash == original => record.entry_type.clone(),
            Some(_) => {
                return Err(LedgerError::Rejected(format!(
                    "{previous} is not a revision of {original}"
                )))
            }
            None => return Err(LedgerError::NotFound(previous.to_string())),
        };

        let hash = LedgerHash::new();
        let record = Record {
            action_hash: hash,
            original_hash: original,
            entry_type,
            entry,
            timestamp: store.tick(),
        };
        store.records.insert(hash, record.clone());
        store.revisions.entry(original).or_default().push(hash);
        Ok(record)
    }

    async fn delete_entry(&self, original: LedgerHash) -> LedgerResult<LedgerHash> {
        self.enter("delete_entry")?;
        let mut store = lock(&self.store);
        if !store.revisions.contains_key(&original) {
            return Err(LedgerError::NotFound(original.to_string()));
        }
        let marker = DeletionMarker {
            action_hash: LedgerHash::new(),
            deletes_hash: original,
            timestamp: store.tick(),
        };
        let hash = marker.action_hash;
        store.deletes.entry(original).or_default().push(marker);
        debug!(%original, "deleted entry");
        Ok(hash)
    }

    async fn get_all_deletes(&self, original: LedgerHash) -> LedgerResult<Vec<DeletionMarker>> {
        self.enter("get_all_deletes")?;
        Ok(lock(&self.store).deletes.get(&original).cloned().unwrap_or_default())
    }

    async fn path_hash(&self, path: &str) -> LedgerResult<LedgerHash> {
        self.enter("path_hash")?;
        Ok(LedgerHash::from_name(path))
    }

    async fn create_link(
        &self,
        base: LedgerHash,
        target: LedgerHash,
        link_type: &str,
        tag: Vec<u8>,
    ) -> LedgerResult<Link> {
        self.enter("create_link")?;
        let mut store = lock(&self.store);
        let link = Link {
            create_link_hash: LedgerHash::new(),
            base,
            target,
            link_type: link_type.to_string(),
            tag,
            timestamp: store.tick(),
        };
        store.links.push(link.clone());
        Ok(link)
    }

    async fn delete_link(&self, create_link_hash: LedgerHash) -> LedgerResult<LinkDeletion> {
        self.enter("delete_link")?;
        let mut store = lock(&self.store);
        if !store.links.iter().any(|link| link.create_link_hash == create_link_hash) {
            return Err(LedgerError::NotFound(create_link_hash.to_string()));
        }
        let deletion = LinkDeletion {
            action_hash: LedgerHash::new(),
            create_link_hash,
            timestamp: store.tick(),
        };
        store
            .link_deletions
            .entry(create_link_hash)
            .or_default()
            .push(deletion.clone());
        Ok(deletion)
    }

    async fn get_links(&self, base: LedgerHash, link_type: &str) -> LedgerResult<Vec<Link>> {
        self.enter("get_links")?;
        Ok(lock(&self.store)
            .details(base, link_type)
            .into_iter()
            .filter(|(_, deletions)| deletions.is_empty())
            .map(|(link, _)| link)
            .collect())
    }

    async fn get_link_details(
        &self,
        base: LedgerHash,
        link_type: &str,
    ) -> LedgerResult<Vec<(Link, Vec<LinkDeletion>)>> {
        self.enter("get_link_details")?;
        Ok(lock(&self.store).details(base, link_type))
    }
}
