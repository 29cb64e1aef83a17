// Copyright (c) 2025 - Cowboy AI, Inc.
//! Fetch and Poll Signals
//!
//! Signals backed by asynchronous work that only runs while they are watched.
//!
//! - [`lazy_load`] fetches once per watch cycle
//! - [`immutable_load`] fetches until it completes once, then keeps the value
//! - [`lazy_load_and_poll`] probes immediately and then at a fixed interval
//!
//! Each watch cycle owns a [`WatchTask`]: a spawned tokio task plus the
//! [`CancellationToken`] that ends it. Unwatching drops the `WatchTask`,
//! which cancels the token before the signal is reset, and every write from
//! the task goes through [`WeakState::set_unless_cancelled`]. A fetch that
//! resolves after unwatch is therefore dropped without touching the signal.
//!
//! Failures (including panics inside the fetch) become `AsyncResult::Error`
//! and never escape the task.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::signal::AsyncSignal;
use super::state::{AsyncState, WatchHooks, WeakState};
use super::{lock, AsyncResult};
use crate::errors::FetchError;

/// Background work bound to one watch cycle
///
/// Cancelled when dropped.
pub struct WatchTask {
    token: CancellationToken,
}

impl WatchTask {
    /// Spawn `work` on the current tokio runtime
    ///
    /// `work` receives the task's token; the task is also stopped at its next
    /// await point once the token is cancelled.
    pub fn spawn<F, Fut>(work: F) -> Result<Self, FetchError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| FetchError::NoRuntime)?;
        let token = CancellationToken::new();
        let future = work(token.clone());
        let stop = token.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                _ = future => {}
            }
        });
        Ok(Self { token })
    }

    /// Token shared with the task
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a fetch, turning both its error and a panic into `AsyncResult::Error`
async fn guarded<T, E, Fut>(label: &'static str, fetch: Fut) -> AsyncResult<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<FetchError>,
{
    let result = match AssertUnwindSafe(fetch).catch_unwind().await {
        Ok(result) => AsyncResult::from(result),
        Err(payload) => AsyncResult::Error(FetchError::Panicked(panic_message(payload.as_ref()))),
    };
    if let AsyncResult::Error(err) = &result {
        warn!(signal = label, error = %err, "fetch failed");
    }
    result
}

type TaskSlot = Arc<Mutex<Option<WatchTask>>>;

fn start(slot: &TaskSlot, weak: &WeakState<impl Clone + Send + Sync + 'static>, task: Result<WatchTask, FetchError>) {
    match task {
        Ok(task) => {
            let previous = lock(slot).replace(task);
            drop(previous);
        }
        Err(err) => {
            warn!(error = %err, "cannot start signal task");
            weak.set(AsyncResult::Error(err));
        }
    }
}

fn fetch_signal<T, E, F, Fut>(label: &'static str, fetch: F, keep_completed: bool) -> AsyncSignal<T>
where
    T: Clone + Send + Sync + 'static,
    E: Into<FetchError> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let slot: TaskSlot = Arc::new(Mutex::new(None));

    let state = AsyncState::with_hooks(label, AsyncResult::Pending, |weak| {
        let (watch_weak, unwatch_weak) = (weak.clone(), weak);
        let (watch_slot, unwatch_slot) = (Arc::clone(&slot), slot);

        WatchHooks {
            on_watched: Some(Box::new(move || {
                if keep_completed && watch_weak.get().is_completed() {
                    return;
                }
                let writer = watch_weak.clone();
                let future = fetch();
                let task = WatchTask::spawn(move |token| async move {
                    let result = guarded(label, future).await;
                    if !writer.set_unless_cancelled(&token, result) {
                        debug!(signal = label, "discarded late fetch result");
                    }
                });
                start(&watch_slot, &watch_weak, task);
            })),
            on_unwatched: Some(Box::new(move || {
                let task = lock(&unwatch_slot).take();
                drop(task);
                if !(keep_completed && unwatch_weak.get().is_completed()) {
                    unwatch_weak.set(AsyncResult::Pending);
                }
            })),
        }
    });

    state.signal()
}

/// Signal that runs `fetch` each time it becomes watched
///
/// Unwatching cancels an in-flight fetch and resets the signal to `Pending`,
/// so every watch cycle reflects the collaborator's current state.
///
/// # Example
///
/// ```rust,ignore
/// let latest = lazy_load(move || {
///     let ledger = ledger.clone();
///     async move { ledger.get_latest(hash).await }
/// });
/// ```
pub fn lazy_load<T, E, F, Fut>(fetch: F) -> AsyncSignal<T>
where
    T: Clone + Send + Sync + 'static,
    E: Into<FetchError> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fetch_signal("lazy_load", fetch, false)
}

/// Signal for content that never changes once it exists
///
/// Behaves like [`lazy_load`] until the first successful fetch, after which
/// the completed value survives unwatch and no further fetch is made.
pub fn immutable_load<T, E, F, Fut>(fetch: F) -> AsyncSignal<T>
where
    T: Clone + Send + Sync + 'static,
    E: Into<FetchError> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fetch_signal("immutable_load", fetch, true)
}

/// Signal that polls `probe` while watched
///
/// The first probe runs as soon as the signal is watched. Each probe result,
/// successful or not, is published and followed by a wait of `interval`;
/// a failed probe never stops the loop. Unwatching cancels the loop and
/// resets the signal to `Pending`, and the next watch starts over with an
/// immediate probe.
///
/// # Example
///
/// ```rust,ignore
/// let ports = lazy_load_and_poll(
///     move || { let hw = hw.clone(); async move { hw.list_connected_devices().await } },
///     Duration::from_millis(1000),
/// );
/// ```
pub fn lazy_load_and_poll<T, E, F, Fut>(probe: F, interval: Duration) -> AsyncSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    E: Into<FetchError> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let probe = Arc::new(probe);
    let slot: TaskSlot = Arc::new(Mutex::new(None));

    let state = AsyncState::with_hooks("poll", AsyncResult::Pending, |weak| {
        let (watch_weak, unwatch_weak) = (weak.clone(), weak);
        let (watch_slot, unwatch_slot) = (Arc::clone(&slot), slot);

        WatchHooks {
            on_watched: Some(Box::new(move || {
                let writer = watch_weak.clone();
                let probe = Arc::clone(&probe);
                let task = WatchTask::spawn(move |token| async move {
                    loop {
                        let result = guarded("poll", probe()).await;
                        if !writer.set_changed_unless_cancelled(&token, result) {
                            break;
                        }
                        tokio::time::sleep(interval).await;
                    }
                });
                start(&watch_slot, &watch_weak, task);
            })),
            on_unwatched: Some(Box::new(move || {
                let task = lock(&unwatch_slot).take();
                drop(task);
                unwatch_weak.set(AsyncResult::Pending);
            })),
        }
    });

    state.signal()
}
