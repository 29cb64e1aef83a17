// Copyright (c) 2025 - Cowboy AI, Inc.
//! AsyncState - Writable Signal with Watch Hooks
//!
//! `AsyncState<T>` is the one stateful node of the signal graph. Every other
//! signal in the crate is an `AsyncState` whose hooks start and stop the work
//! that feeds it:
//!
//! | Signal              | `watched` hook                    | `unwatched` hook          |
//! |---------------------|-----------------------------------|---------------------------|
//! | plain state         | none                              | none                      |
//! | `pipe`/`join_async` | observe sources, compute          | release sources           |
//! | `lazy_load`         | spawn fetch task                  | cancel task, reset        |
//! | `lazy_load_and_poll`| spawn poll loop                   | cancel loop, reset        |
//!
//! # Locking
//!
//! Three independent mutexes guard the value, the listener table and the
//! watch transitions. None of them is held while a listener runs; only the
//! transition lock is held while a hook runs, which serialises
//! watched/unwatched for one node. Hooks only ever take the transition lock
//! of *upstream* nodes, so the acyclic graph cannot deadlock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::signal::{Listener, Observation, Signal};
use super::{lock, AsyncResult};

/// Callback run on a watch transition
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// Callbacks fired when the observer count leaves or returns to zero
#[derive(Default)]
pub struct WatchHooks {
    /// Fired when the first observer attaches
    pub on_watched: Option<Hook>,
    /// Fired when the last observer detaches
    pub on_unwatched: Option<Hook>,
}

impl WatchHooks {
    /// Hooks that do nothing
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

struct StateInner<T> {
    label: &'static str,
    value: Mutex<AsyncResult<T>>,
    listeners: Mutex<Listeners>,
    transition: Mutex<()>,
    hooks: WatchHooks,
}

impl<T: Clone> StateInner<T> {
    fn notify(&self) {
        let listeners: Vec<Listener> = lock(&self.listeners).entries.values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }

    fn set(&self, value: AsyncResult<T>) {
        *lock(&self.value) = value;
        self.notify();
    }

    fn release(&self, id: u64) {
        let _transition = lock(&self.transition);
        let (removed, now_empty) = {
            let mut listeners = lock(&self.listeners);
            let removed = listeners.entries.remove(&id);
            (removed, listeners.entries.is_empty())
        };
        // The listener may own the last reference to an upstream observation;
        // drop it outside of the listener table lock.
        let was_present = removed.is_some();
        drop(removed);

        if was_present && now_empty {
            debug!(signal = self.label, "unwatched");
            if let Some(hook) = &self.hooks.on_unwatched {
                hook();
            }
        }
    }
}

/// Writable signal holding an [`AsyncResult`]
pub struct AsyncState<T> {
    inner: Arc<StateInner<T>>,
}

impl<T> Clone for AsyncState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> AsyncState<T> {
    /// Create a state without hooks
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let state = AsyncState::new(AsyncResult::Completed(42));
    /// assert_eq!(state.get(), AsyncResult::Completed(42));
    /// ```
    pub fn new(initial: AsyncResult<T>) -> Self {
        Self::with_hooks("state", initial, |_| WatchHooks::none())
    }

    /// Create a state whose hooks may write back into it
    ///
    /// `build_hooks` receives a weak handle, so hooks never keep the state
    /// alive on their own.
    pub fn with_hooks<F>(label: &'static str, initial: AsyncResult<T>, build_hooks: F) -> Self
    where
        F: FnOnce(WeakState<T>) -> WatchHooks,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<StateInner<T>>| StateInner {
            label,
            value: Mutex::new(initial),
            listeners: Mutex::new(Listeners::default()),
            transition: Mutex::new(()),
            hooks: build_hooks(WeakState {
                inner: weak.clone(),
            }),
        });
        Self { inner }
    }

    /// Overwrite the value and notify listeners
    pub fn set(&self, value: AsyncResult<T>) {
        self.inner.set(value);
    }

    /// Weak handle to this state
    pub fn downgrade(&self) -> WeakState<T> {
        WeakState {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Type-erased shared handle
    pub fn signal(&self) -> Arc<dyn Signal<T>> {
        Arc::new(self.clone())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> AsyncState<T> {
    /// Overwrite the value, notifying listeners only if it changed
    pub fn set_if_changed(&self, value: AsyncResult<T>) {
        {
            let mut current = lock(&self.inner.value);
            if *current == value {
                return;
            }
            *current = value;
        }
        self.inner.notify();
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> for AsyncState<T> {
    fn get(&self) -> AsyncResult<T> {
        lock(&self.inner.value).clone()
    }

    fn observe(&self, listener: Listener) -> Observation {
        let _transition = lock(&self.inner.transition);
        let (id, first) = {
            let mut listeners = lock(&self.inner.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, listener);
            (id, listeners.entries.len() == 1)
        };

        if first {
            debug!(signal = self.inner.label, "watched");
            if let Some(hook) = &self.inner.hooks.on_watched {
                hook();
            }
        }

        let weak = Arc::downgrade(&self.inner);
        Observation::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.release(id);
            }
        })
    }

    fn is_watched(&self) -> bool {
        !lock(&self.inner.listeners).entries.is_empty()
    }
}

/// Weak handle to an [`AsyncState`], used by hooks and background tasks
pub struct WeakState<T> {
    inner: Weak<StateInner<T>>,
}

impl<T> Clone for WeakState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> WeakState<T> {
    /// Upgrade to a strong handle if the state is still alive
    pub fn upgrade(&self) -> Option<AsyncState<T>> {
        self.inner.upgrade().map(|inner| AsyncState { inner })
    }

    /// Set the value if the state is still alive
    pub fn set(&self, value: AsyncResult<T>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.set(value);
        }
    }

    /// Current value, or `Pending` if the state is gone
    pub fn get(&self) -> AsyncResult<T> {
        self.inner
            .upgrade()
            .map(|inner| lock(&inner.value).clone())
            .unwrap_or_default()
    }
}

impl<T: Clone + Send + Sync + 'static> WeakState<T> {
    /// Write a task result unless the task's watch cycle has ended
    ///
    /// The token check and the write happen under the value lock, and the
    /// unwatch path cancels the token before it resets the value under the
    /// same lock. A result that arrives after cancellation can therefore never
    /// overwrite the reset.
    pub fn set_unless_cancelled(&self, token: &CancellationToken, value: AsyncResult<T>) -> bool {
        self.write_unless_cancelled(token, value, |_, _| false)
    }

    fn write_unless_cancelled<F>(&self, token: &CancellationToken, value: AsyncResult<T>, same: F) -> bool
    where
        F: Fn(&AsyncResult<T>, &AsyncResult<T>) -> bool,
    {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        {
            let mut current = lock(&inner.value);
            if token.is_cancelled() {
                return false;
            }
            if same(&current, &value) {
                return true;
            }
            *current = value;
        }
        inner.notify();
        true
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> WeakState<T> {
    /// Like [`WeakState::set_unless_cancelled`], without notifying when the
    /// value is unchanged
    pub fn set_changed_unless_cancelled(&self, token: &CancellationToken, value: AsyncResult<T>) -> bool {
        self.write_unless_cancelled(token, value, |current, value| current == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_state() -> (AsyncState<i32>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let watched = Arc::new(AtomicUsize::new(0));
        let unwatched = Arc::new(AtomicUsize::new(0));
        let (w, u) = (watched.clone(), unwatched.clone());
        let state = AsyncState::with_hooks("test", AsyncResult::Pending, move |_| WatchHooks {
            on_watched: Some(Box::new(move || {
                w.fetch_add(1, Ordering::SeqCst);
            })),
            on_unwatched: Some(Box::new(move || {
                u.fetch_add(1, Ordering::SeqCst);
            })),
        });
        (state, watched, unwatched)
    }

    #[test]
    fn test_hooks_fire_once_per_transition() {
        let (state, watched, unwatched) = counting_state();

        let first = state.observe(Arc::new(|| {}));
        let second = state.observe(Arc::new(|| {}));
        assert_eq!(watched.load(Ordering::SeqCst), 1);
        assert!(state.is_watched());

        drop(first);
        assert_eq!(unwatched.load(Ordering::SeqCst), 0);
        drop(second);
        assert_eq!(unwatched.load(Ordering::SeqCst), 1);
        assert!(!state.is_watched());

        let third = state.observe(Arc::new(|| {}));
        assert_eq!(watched.load(Ordering::SeqCst), 2);
        drop(third);
        assert_eq!(unwatched.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_notifies_listeners() {
        let state = AsyncState::new(AsyncResult::Pending);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _observation = state.observe(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        state.set(AsyncResult::Completed(1));
        state.set(AsyncResult::Completed(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.get(), AsyncResult::Completed(2));
    }

    #[test]
    fn test_set_if_changed_skips_equal_values() {
        let state = AsyncState::new(AsyncResult::Completed(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _observation = state.observe(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        state.set_if_changed(AsyncResult::Completed(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        state.set_if_changed(AsyncResult::Completed(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_token_blocks_write() {
        let state: AsyncState<i32> = AsyncState::new(AsyncResult::Pending);
        let weak = state.downgrade();
        let token = CancellationToken::new();

        assert!(weak.set_unless_cancelled(&token, AsyncResult::Completed(1)));
        token.cancel();
        assert!(!weak.set_unless_cancelled(&token, AsyncResult::Completed(2)));
        assert_eq!(state.get(), AsyncResult::Completed(1));
    }

    #[test]
    fn test_unchanged_poll_result_does_not_notify() {
        let state: AsyncState<i32> = AsyncState::new(AsyncResult::Pending);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _observation = state.observe(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let weak = state.downgrade();
        let token = CancellationToken::new();

        weak.set_changed_unless_cancelled(&token, AsyncResult::Completed(5));
        weak.set_changed_unless_cancelled(&token, AsyncResult::Completed(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_weak_state_outlived() {
        let state: AsyncState<i32> = AsyncState::new(AsyncResult::Completed(3));
        let weak = state.downgrade();
        assert_eq!(weak.get(), AsyncResult::Completed(3));
        drop(state);
        assert!(weak.upgrade().is_none());
        weak.set(AsyncResult::Completed(4));
        assert!(weak.get().is_pending());
    }

    #[test]
    fn test_dropping_observation_after_state_is_noop() {
        let state: AsyncState<i32> = AsyncState::new(AsyncResult::Pending);
        let observation = state.observe(Arc::new(|| {}));
        drop(state);
        drop(observation);
    }
}
