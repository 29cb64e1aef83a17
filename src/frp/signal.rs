// Copyright (c) 2025 - Cowboy AI, Inc.
//! Signal Trait - Base abstraction for observable async values
//!
//! A `Signal<T>` holds an [`AsyncResult<T>`] that can be read synchronously
//! with [`Signal::get`] and observed with [`Signal::observe`].
//!
//! # Type Hierarchy
//!
//! ```text
//! Signal<T>
//!   ├── AsyncState<T>   (writable, optional watch hooks)
//!   ├── Derived<T>      (pipe / pipe2 / pipe3 / join_async)
//!   └── Switch<T>       (pipe whose transform yields another signal)
//! ```
//!
//! # Observation Lifecycle
//!
//! An observation is an RAII guard. The first observation of a signal fires its
//! `watched` hook, dropping the last one fires `unwatched`. Signals with zero
//! observers do no background work.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledger_signals::frp::*;
//!
//! let state = AsyncState::new(AsyncResult::Completed(5));
//! let doubled = pipe(state.signal(), |x| x * 2);
//!
//! let _observation = doubled.observe(listener(|| println!("changed")));
//! assert_eq!(doubled.get(), AsyncResult::Completed(10));
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::Notify;

use super::AsyncResult;
use crate::errors::FetchError;

/// Callback invoked after a signal's value changed
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Shared, type-erased handle to any signal
pub type AsyncSignal<T> = Arc<dyn Signal<T>>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Base trait for observable async values
///
/// Implementations must never block in `get` and must call every registered
/// listener after each change to the value returned by `get`.
pub trait Signal<T>: Send + Sync {
    /// Current value, read synchronously
    fn get(&self) -> AsyncResult<T>;

    /// Register a listener; the signal stays watched while the returned
    /// observation is alive
    fn observe(&self, listener: Listener) -> Observation;

    /// Whether at least one observation is alive
    fn is_watched(&self) -> bool;
}

/// RAII guard keeping a signal watched
///
/// Dropping it detaches the listener it was created with.
#[must_use = "the signal is unwatched as soon as the observation is dropped"]
pub struct Observation {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Observation {
    /// Create an observation that runs `release` when dropped
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Observation with nothing to release
    pub fn empty() -> Self {
        Self { release: None }
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Observe a signal with a listener that does nothing
///
/// Useful to keep a signal (and its background work) alive.
pub fn watch<T>(signal: &dyn Signal<T>) -> Observation {
    signal.observe(listener(|| {}))
}

/// Wait for the first non-pending value of a signal
///
/// The signal is watched for the duration of the wait, so this also starts
/// whatever work backs it.
pub async fn to_future<T>(signal: &dyn Signal<T>) -> Result<T, FetchError> {
    let notify = Arc::new(Notify::new());
    let wake = Arc::clone(&notify);
    let _observation = signal.observe(listener(move || wake.notify_one()));

    loop {
        match signal.get() {
            AsyncResult::Completed(value) => return Ok(value),
            AsyncResult::Error(err) => return Err(err),
            AsyncResult::Pending => notify.notified().await,
        }
    }
}

/// Wait until the signal completes, skipping errors
///
/// Polled signals surface transient failures as errors and keep going; this
/// waits them out.
pub async fn until_completed<T>(signal: &dyn Signal<T>) -> T {
    let notify = Arc::new(Notify::new());
    let wake = Arc::clone(&notify);
    let _observation = signal.observe(listener(move || wake.notify_one()));

    loop {
        if let AsyncResult::Completed(value) = signal.get() {
            return value;
        }
        notify.notified().await;
    }
}
