// Copyright (c) 2025 - Cowboy AI, Inc.
//! Revision and Link Signals
//!
//! Signals over the ledger's append-only histories.
//!
//! # Entity Signals
//!
//! | Signal           | Backing                   | Refetch                      |
//! |------------------|---------------------------|------------------------------|
//! | `original`       | `immutable_load`          | never, once completed        |
//! | `latest_version` | `lazy_load`               | every watch                  |
//! | `all_revisions`  | `lazy_load`               | every watch                  |
//! | `deletes`        | `lazy_load`               | every watch                  |
//! | `status`         | `pipe2(latest, deletes)`  | follows its sources          |
//!
//! Each is watched independently; watching `original` never fetches `deletes`.
//!
//! # Link Collections
//!
//! ```text
//! get_link_details(base) ──poll──→ LinkPartition { live, deleted }
//!                                        │
//!                      LazyMap<target, V>│ (bundle per target)
//!                                        ↓
//!                          Collection { live, deleted }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{DeletionMarker, Ledger, LedgerEntry, LedgerExt, LedgerHash, Link, LinkDeletion, Revision};
use crate::cache::LazyMap;
use crate::errors::LedgerError;
use crate::frp::{immutable_load, lazy_load, lazy_load_and_poll, pipe, pipe2, AsyncSignal};

/// Wrap a ledger call as a repeatable fetch
pub(crate) fn with_ledger<F, Fut>(ledger: &Arc<dyn Ledger>, call: F) -> impl Fn() -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<dyn Ledger>) -> Fut + Send + Sync + 'static,
    Fut: Future,
{
    let ledger = Arc::clone(ledger);
    move || call(Arc::clone(&ledger))
}

/// Whether an entity is logically deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityStatus {
    Live,
    /// Deleted by the newest marker that postdates the latest revision
    Deleted(DeletionMarker),
}

impl EntityStatus {
    /// Deleted iff some marker is newer than the latest revision
    pub fn from_history<E>(latest: &Revision<E>, deletes: &[DeletionMarker]) -> Self {
        deletes
            .iter()
            .filter(|marker| marker.timestamp > latest.timestamp)
            .max_by_key(|marker| marker.timestamp)
            .map(|marker| EntityStatus::Deleted(marker.clone()))
            .unwrap_or(EntityStatus::Live)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, EntityStatus::Deleted(_))
    }
}

/// Lazily fetched views over one entity's history
pub struct EntitySignals<E> {
    pub hash: LedgerHash,
    pub original: AsyncSignal<Revision<E>>,
    pub latest_version: AsyncSignal<Revision<E>>,
    pub all_revisions: AsyncSignal<Vec<Revision<E>>>,
    pub deletes: AsyncSignal<Vec<DeletionMarker>>,
    pub status: AsyncSignal<EntityStatus>,
}

/// Build the signal bundle for the entity whose first revision is `hash`
///
/// Nothing is fetched until one of the signals is watched. A missing entity
/// surfaces as `LedgerError::NotFound`.
pub fn entity_signals<E: LedgerEntry>(ledger: Arc<dyn Ledger>, hash: LedgerHash) -> EntitySignals<E> {
    let original = immutable_load(with_ledger(&ledger, move |ledger| async move {
        ledger
            .original::<E>(hash)
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))
    }));

    let latest_version = lazy_load(with_ledger(&ledger, move |ledger| async move {
        ledger
            .latest::<E>(hash)
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))
    }));

    let all_revisions = lazy_load(with_ledger(&ledger, move |ledger| async move {
        ledger.revisions::<E>(hash).await
    }));

    let deletes = lazy_load(with_ledger(&ledger, move |ledger| async move {
        ledger.get_all_deletes(hash).await
    }));

    let status = pipe2(latest_version.clone(), deletes.clone(), |latest, deletes| {
        EntityStatus::from_history(&latest, &deletes)
    });

    EntitySignals {
        hash,
        original,
        latest_version,
        all_revisions,
        deletes,
        status,
    }
}

/// Links from one base split by revocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPartition {
    /// Links with no deletion, oldest first
    pub live: Vec<Link>,
    /// Revoked links with their deletions, excluding targets still linked live
    pub deleted: Vec<(Link, Vec<LinkDeletion>)>,
}

impl LinkPartition {
    /// Live targets without duplicates, in link order
    pub fn live_targets(&self) -> Vec<LedgerHash> {
        let mut seen = HashSet::new();
        self.live
            .iter()
            .map(|link| link.target)
            .filter(|target| seen.insert(*target))
            .collect()
    }
}

/// Split link details into live and deleted links
///
/// A target that is linked live through any link is never reported as
/// deleted, so no target appears in both sets.
pub fn partition_links(details: Vec<(Link, Vec<LinkDeletion>)>) -> LinkPartition {
    let (mut live, mut deleted): (Vec<_>, Vec<_>) = details
        .into_iter()
        .partition(|(_, deletions)| deletions.is_empty());

    live.sort_by_key(|(link, _)| link.timestamp);
    let live: Vec<Link> = live.into_iter().map(|(link, _)| link).collect();
    let live_targets: HashSet<LedgerHash> = live.iter().map(|link| link.target).collect();

    deleted.retain(|(link, _)| !live_targets.contains(&link.target));
    deleted.sort_by_key(|(link, _)| link.timestamp);

    LinkPartition { live, deleted }
}

/// Poll the links of `link_type` from `base`, partitioned
pub fn link_details(
    ledger: Arc<dyn Ledger>,
    base: LedgerHash,
    link_type: &'static str,
    refresh: Duration,
) -> AsyncSignal<LinkPartition> {
    lazy_load_and_poll(
        with_ledger(&ledger, move |ledger| async move {
            let details = ledger.get_link_details(base, link_type).await?;
            Ok::<_, LedgerError>(partition_links(details))
        }),
        refresh,
    )
}

/// A revoked member of a collection
pub struct DeletedMember<V> {
    pub link: Link,
    pub deletions: Vec<LinkDeletion>,
    pub bundle: Arc<V>,
}

impl<V> Clone for DeletedMember<V> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
            deletions: self.deletions.clone(),
            bundle: Arc::clone(&self.bundle),
        }
    }
}

/// Live and deleted members of a link collection, materialised through a
/// lazy cache
pub struct Collection<V> {
    pub live: AsyncSignal<Vec<(LedgerHash, Arc<V>)>>,
    pub deleted: AsyncSignal<Vec<DeletedMember<V>>>,
}

/// Map a partitioned link signal to cached per-target bundles
pub fn collection<V>(links: AsyncSignal<LinkPartition>, cache: Arc<LazyMap<LedgerHash, V>>) -> Collection<V>
where
    V: Send + Sync + 'static,
{
    let live_cache = Arc::clone(&cache);
    let live = pipe(links.clone(), move |partition: LinkPartition| {
        partition
            .live_targets()
            .into_iter()
            .map(|target| (target, live_cache.get(&target)))
            .collect::<Vec<_>>()
    });

    let deleted = pipe(links, move |partition: LinkPartition| {
        let mut seen = HashSet::new();
        partition
            .deleted
            .into_iter()
            .filter(|(link, _)| seen.insert(link.target))
            .map(|(link, deletions)| DeletedMember {
                bundle: cache.get(&link.target),
                link,
                deletions,
            })
            .collect::<Vec<_>>()
    });

    Collection { live, deleted }
}
