// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reactive Signal Abstractions
//!
//! This module turns latency-bearing remote reads into push-based signals.
//! Every signal carries an [`AsyncResult`] and does work only while it is
//! observed.
//!
//! # Core Concepts
//!
//! ## AsyncResult<T>
//!
//! Tri-state outcome of asynchronous work: `Pending`, `Error(cause)` or
//! `Completed(value)`.
//!
//! ## Signal<T>
//!
//! Observable holder of an `AsyncResult<T>` with a synchronous `get()`.
//!
//! ## Watch Lifecycle
//!
//! ```text
//! observers: 0 ──observe──→ 1 ──observe──→ 2 ──drop──→ 1 ──drop──→ 0
//!               on_watched                             on_unwatched
//! ```
//!
//! Fetch and poll tasks start in `on_watched` and are cancelled in
//! `on_unwatched`, which also resets the signal to `Pending`.
//!
//! ## Derivation Graph
//!
//! ```text
//!   lazy_load(get_links) ──pipe──→ live targets ──switch──→ join_async(latest)
//!   lazy_load_and_poll(probe) ─────────────────────pipe2──→ device view
//! ```
//!
//! A derived signal names its sources when it is built and can never name
//! itself or a signal built after it, so the graph is acyclic.
//!
//! # Laws
//!
//! ```text
//! pipe(s, id)            ≡ s
//! pipe(pipe(s, f), g)    ≡ pipe(s, g ∘ f)
//! pipe2(Pending, _, f)   ≡ Pending
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ledger_signals::frp::*;
//!
//! let device = lazy_load(move || async move { client.bpv_device_hash("A1").await });
//! let label = pipe(device, |hash| format!("device {hash}"));
//!
//! let value = to_future(label.as_ref()).await?;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod async_result;
pub mod combinators;
pub mod signal;
pub mod state;
pub mod task;
pub mod timeline;

pub use async_result::{join2, join3, join_results, AsyncResult};
pub use combinators::*;
pub use signal::{listener, to_future, until_completed, watch, AsyncSignal, Listener, Observation, Signal};
pub use state::{AsyncState, WatchHooks, WeakState};
pub use task::{immutable_load, lazy_load, lazy_load_and_poll, WatchTask};
pub use timeline::Timeline;

/// Time representation (microseconds since epoch)
pub type Time = i64;

/// A value at a specific point in time
pub type Occurrence<T> = (Time, T);

/// Lock a mutex, recovering the guard if a previous holder panicked
///
/// Signal state stays consistent across a panic because every critical
/// section is a single read or write.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
