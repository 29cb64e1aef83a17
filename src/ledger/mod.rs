// Copyright (c) 2025 - Cowboy AI, Inc.
//! Ledger Collaborator Contract
//!
//! The ledger is an append-only, peer-replicated store reached through a
//! narrow RPC-like interface. Records are immutable; entities evolve by
//! appending revisions and are retired by appending deletion markers. Links
//! are typed, tagged edges between hashes that can be revoked by appending a
//! link deletion.
//!
//! # Architecture
//!
//! ```text
//! Signals ──→ LedgerExt (typed) ──→ Ledger (untyped RPC) ──→ peer network
//!                                        ↑
//!                                   MemoryLedger (in-process)
//! ```
//!
//! # Ledger Requirements
//!
//! 1. **Append-Only**: nothing is physically removed
//! 2. **Addressed by hash**: every record, link and deletion has a hash
//! 3. **Eventually consistent**: reads are snapshots, never guarantees
//!
//! # Example
//!
//! ```rust,ignore
//! use ledger_signals::ledger::{Ledger, LedgerExt, MemoryLedger};
//!
//! let ledger = MemoryLedger::new();
//! let created = ledger.create(&collection).await?;
//! let latest = ledger.latest::<MeasurementCollection>(created.action_hash).await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, LedgerResult};
use crate::frp::Time;

pub mod memory;
pub mod signals;

pub use memory::MemoryLedger;
pub use signals::{
    collection, entity_signals, link_details, partition_links, Collection, DeletedMember,
    EntitySignals, EntityStatus, LinkPartition,
};

/// Hash addressing a record, link or deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerHash(Uuid);

impl LedgerHash {
    /// Fresh, time-ordered hash
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic hash derived from a name (used for path anchors)
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl Default for LedgerHash {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LedgerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Untyped record as returned by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Hash of the action that wrote this record
    pub action_hash: LedgerHash,
    /// Hash of the entity's first revision
    pub original_hash: LedgerHash,
    pub entry_type: String,
    pub entry: serde_json::Value,
    /// Microseconds since epoch
    pub timestamp: Time,
}

/// Entry type stored in the ledger
pub trait LedgerEntry: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    const ENTRY_TYPE: &'static str;
}

/// One immutable, decoded version of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<E> {
    pub action_hash: LedgerHash,
    pub original_hash: LedgerHash,
    pub entry: E,
    pub timestamp: Time,
}

impl<E: LedgerEntry> TryFrom<Record> for Revision<E> {
    type Error = LedgerError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        if record.entry_type != E::ENTRY_TYPE {
            return Err(LedgerError::Serialization(format!(
                "expected entry type {}, found {}",
                E::ENTRY_TYPE,
                record.entry_type
            )));
        }
        Ok(Self {
            action_hash: record.action_hash,
            original_hash: record.original_hash,
            entry: serde_json::from_value(record.entry)?,
            timestamp: record.timestamp,
        })
    }
}

/// Deletion marker asserted against an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMarker {
    pub action_hash: LedgerHash,
    pub deletes_hash: LedgerHash,
    pub timestamp: Time,
}

/// Typed, tagged, directed edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub create_link_hash: LedgerHash,
    pub base: LedgerHash,
    pub target: LedgerHash,
    pub link_type: String,
    pub tag: Vec<u8>,
    pub timestamp: Time,
}

impl Link {
    /// Decode the tag payload
    pub fn decode_tag<T: DeserializeOwned>(&self) -> LedgerResult<T> {
        Ok(serde_json::from_slice(&self.tag)?)
    }
}

/// Encode a tag payload
pub fn encode_tag<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Revocation of a link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkDeletion {
    pub action_hash: LedgerHash,
    pub create_link_hash: LedgerHash,
    pub timestamp: Time,
}

/// Ledger RPC surface
///
/// Every call may fail with [`LedgerError::Transport`]; callers surface the
/// failure instead of retrying.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Write the first revision of a new entity
    async fn create_entry(&self, entry_type: &str, entry: serde_json::Value) -> LedgerResult<Record>;

    /// Most recent revision of the entity whose first revision is `original`
    async fn get_latest(&self, original: LedgerHash) -> LedgerResult<Option<Record>>;

    /// First revision of the entity
    async fn get_original(&self, original: LedgerHash) -> LedgerResult<Option<Record>>;

    /// All revisions, oldest first
    async fn get_all_revisions(&self, original: LedgerHash) -> LedgerResult<Vec<Record>>;

    /// Append a revision after `previous`
    async fn update_entry(
        &self,
        original: LedgerHash,
        previous: LedgerHash,
        entry: serde_json::Value,
    ) -> LedgerResult<Record>;

    /// Append a deletion marker, returning its hash
    async fn delete_entry(&self, original: LedgerHash) -> LedgerResult<LedgerHash>;

    /// All deletion markers asserted against the entity
    async fn get_all_deletes(&self, original: LedgerHash) -> LedgerResult<Vec<DeletionMarker>>;

    /// Anchor hash for a named path
    async fn path_hash(&self, path: &str) -> LedgerResult<LedgerHash>;

    async fn create_link(
        &self,
        base: LedgerHash,
        target: LedgerHash,
        link_type: &str,
        tag: Vec<u8>,
    ) -> LedgerResult<Link>;

    async fn delete_link(&self, create_link_hash: LedgerHash) -> LedgerResult<LinkDeletion>;

    /// Live links of `link_type` from `base`
    async fn get_links(&self, base: LedgerHash, link_type: &str) -> LedgerResult<Vec<Link>>;

    /// Every link of `link_type` from `base` with its deletions (possibly none)
    async fn get_link_details(
        &self,
        base: LedgerHash,
        link_type: &str,
    ) -> LedgerResult<Vec<(Link, Vec<LinkDeletion>)>>;

    /// Links of `link_type` from `base` that have been revoked
    async fn get_deleted_links(
        &self,
        base: LedgerHash,
        link_type: &str,
    ) -> LedgerResult<Vec<(Link, Vec<LinkDeletion>)>> {
        let details = self.get_link_details(base, link_type).await?;
        Ok(details
            .into_iter()
            .filter(|(_, deletions)| !deletions.is_empty())
            .collect())
    }
}

/// Typed access on top of [`Ledger`]
#[async_trait]
pub trait LedgerExt: Ledger {
    async fn create<E: LedgerEntry>(&self, entry: &E) -> LedgerResult<Revision<E>> {
        let value = serde_json::to_value(entry)?;
        self.create_entry(E::ENTRY_TYPE, value).await?.try_into()
    }

    async fn latest<E: LedgerEntry>(&self, original: LedgerHash) -> LedgerResult<Option<Revision<E>>> {
        self.get_latest(original).await?.map(Revision::try_from).transpose()
    }

    async fn original<E: LedgerEntry>(&self, original: LedgerHash) -> LedgerResult<Option<Revision<E>>> {
        self.get_original(original).await?.map(Revision::try_from).transpose()
    }

    async fn revisions<E: LedgerEntry>(&self, original: LedgerHash) -> LedgerResult<Vec<Revision<E>>> {
        self.get_all_revisions(original)
            .await?
            .into_iter()
            .map(Revision::try_from)
            .collect()
    }

    async fn update<E: LedgerEntry>(
        &self,
        original: LedgerHash,
        previous: LedgerHash,
        entry: &E,
    ) -> LedgerResult<Revision<E>> {
        let value = serde_json::to_value(entry)?;
        self.update_entry(original, previous, value).await?.try_into()
    }
}

impl<L: Ledger + ?Sized> LedgerExt for L {}
