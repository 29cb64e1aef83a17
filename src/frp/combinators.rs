// Copyright (c) 2025 - Cowboy AI, Inc.
//! Signal Combinators
//!
//! Combinators build new signals from existing ones plus a pure transform.
//! Sources are fixed when the combinator is called, and a signal can only be
//! built from signals that already exist, so the derivation graph is acyclic
//! by construction.
//!
//! # Available Combinators
//!
//! - `pipe` - Transform one signal (Functor `map`)
//! - `pipe2` / `pipe3` - Combine two or three signals of different types
//! - `join_async` - Combine an ordered list of signals of one type
//! - `switch` - Transform into another signal and follow it
//!
//! # Short-Circuit Rule
//!
//! A transform only ever runs on `Completed` inputs. If any source is
//! `Pending` the output is `Pending`; otherwise if any source failed the
//! output is the first error in source order.
//!
//! # Examples
//!
//! ```rust,ignore
//! use ledger_signals::frp::*;
//!
//! let x = AsyncState::new(AsyncResult::Completed(3));
//! let y = AsyncState::new(AsyncResult::Completed(4));
//!
//! let sum = pipe2(x.signal(), y.signal(), |a, b| a + b);
//! assert_eq!(sum.get(), AsyncResult::Completed(7));
//!
//! y.set(AsyncResult::Pending);
//! assert!(sum.get().is_pending());
//! ```

use std::sync::{Arc, Mutex};

use super::async_result::{join2, join3, join_results};
use super::signal::{listener, AsyncSignal, Listener, Observation, Signal};
use super::state::{AsyncState, WatchHooks};
use super::{lock, AsyncResult};

use tokio_util::sync::CancellationToken;

type Evaluate<T> = Arc<dyn Fn() -> AsyncResult<T> + Send + Sync>;
type Subscribe = Arc<dyn Fn(Listener) -> Observation + Send + Sync>;

fn subscriber<T: 'static>(signal: &AsyncSignal<T>) -> Subscribe {
    let signal = Arc::clone(signal);
    Arc::new(move |listener| signal.observe(listener))
}

/// Signal computed from a fixed set of sources
///
/// While watched it observes its sources and caches the computed value;
/// while unwatched `get` computes on demand from the sources' current values.
pub struct Derived<T> {
    state: AsyncState<T>,
    evaluate: Evaluate<T>,
}

impl<T: Clone + Send + Sync + 'static> Derived<T> {
    fn build(sources: Vec<Subscribe>, evaluate: Evaluate<T>) -> Self {
        let upstream: Arc<Mutex<Vec<Observation>>> = Arc::new(Mutex::new(Vec::new()));

        let state = AsyncState::with_hooks("derived", AsyncResult::Pending, |weak| {
            let (watch_weak, unwatch_weak) = (weak.clone(), weak);
            let (watch_upstream, unwatch_upstream) = (Arc::clone(&upstream), upstream);
            let compute = Arc::clone(&evaluate);

            WatchHooks {
                on_watched: Some(Box::new(move || {
                    let recompute = {
                        let weak = watch_weak.clone();
                        let compute = Arc::clone(&compute);
                        listener(move || weak.set(compute()))
                    };
                    let observations: Vec<Observation> = sources
                        .iter()
                        .map(|subscribe| subscribe(Arc::clone(&recompute)))
                        .collect();
                    *lock(&watch_upstream) = observations;
                    recompute();
                })),
                on_unwatched: Some(Box::new(move || {
                    let released = std::mem::take(&mut *lock(&unwatch_upstream));
                    drop(released);
                    unwatch_weak.set(AsyncResult::Pending);
                })),
            }
        });

        Self { state, evaluate }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> for Derived<T> {
    fn get(&self) -> AsyncResult<T> {
        if self.state.is_watched() {
            self.state.get()
        } else {
            (self.evaluate)()
        }
    }

    fn observe(&self, listener: Listener) -> Observation {
        self.state.observe(listener)
    }

    fn is_watched(&self) -> bool {
        self.state.is_watched()
    }
}

/// Transform the value of a signal
///
/// # Examples
///
/// ```rust,ignore
/// let hash = lazy_load(|| async { client.bpv_device_hash("A1").await });
/// let short = pipe(hash, |h| h.to_string()[..8].to_string());
/// ```
pub fn pipe<S, T, F>(source: AsyncSignal<S>, transform: F) -> AsyncSignal<T>
where
    S: 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(S) -> T + Send + Sync + 'static,
{
    let sources = vec![subscriber(&source)];
    let evaluate: Evaluate<T> = Arc::new(move || source.get().map(&transform));
    Arc::new(Derived::build(sources, evaluate))
}

/// Combine two signals using a binary function
///
/// # Examples
///
/// ```rust,ignore
/// let info_and_values = pipe2(device.info.clone(), device.external_resistor_values.clone(),
///     |info, values| (info, values.len()));
/// ```
pub fn pipe2<A, B, T, F>(a: AsyncSignal<A>, b: AsyncSignal<B>, transform: F) -> AsyncSignal<T>
where
    A: 'static,
    B: 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(A, B) -> T + Send + Sync + 'static,
{
    let sources = vec![subscriber(&a), subscriber(&b)];
    let evaluate: Evaluate<T> =
        Arc::new(move || join2(a.get(), b.get()).map(|(a, b)| transform(a, b)));
    Arc::new(Derived::build(sources, evaluate))
}

/// Combine three signals using a ternary function
pub fn pipe3<A, B, C, T, F>(
    a: AsyncSignal<A>,
    b: AsyncSignal<B>,
    c: AsyncSignal<C>,
    transform: F,
) -> AsyncSignal<T>
where
    A: 'static,
    B: 'static,
    C: 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(A, B, C) -> T + Send + Sync + 'static,
{
    let sources = vec![subscriber(&a), subscriber(&b), subscriber(&c)];
    let evaluate: Evaluate<T> = Arc::new(move || {
        join3(a.get(), b.get(), c.get()).map(|(a, b, c)| transform(a, b, c))
    });
    Arc::new(Derived::build(sources, evaluate))
}

/// Join an ordered list of signals into one signal of all their values
///
/// # Examples
///
/// ```rust,ignore
/// let entries = join_async(collections.iter().map(|c| c.original.clone()).collect());
/// ```
pub fn join_async<T>(signals: Vec<AsyncSignal<T>>) -> AsyncSignal<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let sources = signals.iter().map(subscriber).collect();
    let evaluate: Evaluate<Vec<T>> =
        Arc::new(move || join_results(signals.iter().map(|signal| signal.get())));
    Arc::new(Derived::build(sources, evaluate))
}

/// Join keyed signals, keeping each value next to its key
pub fn join_async_keyed<K, T>(signals: Vec<(K, AsyncSignal<T>)>) -> AsyncSignal<Vec<(K, T)>>
where
    K: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let sources = signals.iter().map(|(_, signal)| subscriber(signal)).collect();
    let evaluate: Evaluate<Vec<(K, T)>> = Arc::new(move || {
        join_results(
            signals
                .iter()
                .map(|(key, signal)| signal.get().map(|value| (key.clone(), value))),
        )
    });
    Arc::new(Derived::build(sources, evaluate))
}

struct Active<S, T> {
    input: S,
    inner: AsyncSignal<T>,
    _observation: Observation,
}

type Current<S, T> = Arc<Mutex<Option<Active<S, T>>>>;

/// Signal following whichever signal its transform last produced
///
/// The inner signal is rebuilt only when the source value changes, so a
/// transform that looks signals up in a lazy cache keeps observing the same
/// cached signal across unrelated source refreshes.
pub struct Switch<S, T> {
    state: AsyncState<T>,
    source: AsyncSignal<S>,
    transform: Arc<dyn Fn(S) -> AsyncSignal<T> + Send + Sync>,
}

impl<S, T> Signal<T> for Switch<S, T>
where
    S: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> AsyncResult<T> {
        if self.state.is_watched() {
            self.state.get()
        } else {
            self.source
                .get()
                .and_then(|input| (self.transform)(input).get())
        }
    }

    fn observe(&self, listener: Listener) -> Observation {
        self.state.observe(listener)
    }

    fn is_watched(&self) -> bool {
        self.state.is_watched()
    }
}

/// Transform a signal into another signal and follow the result
///
/// # Examples
///
/// ```rust,ignore
/// // device path hash → links hanging off that hash
/// let links = switch(path_hash, move |hash| link_details(ledger.clone(), hash, "BpvDeviceToBpvDeviceInfo", refresh));
/// ```
pub fn switch<S, T, F>(source: AsyncSignal<S>, transform: F) -> AsyncSignal<T>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(S) -> AsyncSignal<T> + Send + Sync + 'static,
{
    let transform: Arc<dyn Fn(S) -> AsyncSignal<T> + Send + Sync> = Arc::new(transform);
    let current: Current<S, T> = Arc::new(Mutex::new(None));
    let upstream: Arc<Mutex<Option<Observation>>> = Arc::new(Mutex::new(None));
    let cycle: Arc<Mutex<CancellationToken>> = Arc::new(Mutex::new(CancellationToken::new()));

    let state = AsyncState::with_hooks("switch", AsyncResult::Pending, |weak| {
        let (watch_weak, unwatch_weak) = (weak.clone(), weak);
        let (watch_current, unwatch_current) = (Arc::clone(&current), current);
        let (watch_upstream, unwatch_upstream) = (Arc::clone(&upstream), upstream);
        let (watch_cycle, unwatch_cycle) = (Arc::clone(&cycle), cycle);
        let watch_source = Arc::clone(&source);
        let watch_transform = Arc::clone(&transform);

        WatchHooks {
            on_watched: Some(Box::new(move || {
                // A refresh still running on another thread after unwatch sees
                // its cycle cancelled and installs nothing.
                let token = CancellationToken::new();
                *lock(&watch_cycle) = token.clone();

                let refresh = {
                    let weak = watch_weak.clone();
                    let source = Arc::clone(&watch_source);
                    let transform = Arc::clone(&watch_transform);
                    let current = Arc::clone(&watch_current);
                    listener(move || match source.get() {
                        AsyncResult::Completed(input) => {
                            let stale = !matches!(
                                &*lock(&current),
                                Some(active) if active.input == input
                            );
                            if stale {
                                let inner = transform(input.clone());
                                let follow = {
                                    let weak = weak.clone();
                                    let inner = Arc::clone(&inner);
                                    let token = token.clone();
                                    listener(move || {
                                        weak.set_unless_cancelled(&token, inner.get());
                                    })
                                };
                                let fresh = Active {
                                    input,
                                    _observation: inner.observe(follow),
                                    inner,
                                };
                                let displaced = {
                                    let mut slot = lock(&current);
                                    if token.is_cancelled() {
                                        Some(fresh)
                                    } else {
                                        slot.replace(fresh)
                                    }
                                };
                                drop(displaced);
                            }
                            let value = lock(&current)
                                .as_ref()
                                .map(|active| Arc::clone(&active.inner));
                            weak.set_unless_cancelled(
                                &token,
                                value.map(|inner| inner.get()).unwrap_or_default(),
                            );
                        }
                        AsyncResult::Pending => {
                            weak.set_unless_cancelled(&token, AsyncResult::Pending);
                        }
                        AsyncResult::Error(err) => {
                            weak.set_unless_cancelled(&token, AsyncResult::Error(err));
                        }
                    })
                };
                let observation = watch_source.observe(Arc::clone(&refresh));
                *lock(&watch_upstream) = Some(observation);
                refresh();
            })),
            on_unwatched: Some(Box::new(move || {
                let token = lock(&unwatch_cycle).clone();
                let active = {
                    let mut slot = lock(&unwatch_current);
                    token.cancel();
                    slot.take()
                };
                drop(active);
                let source_observation = lock(&unwatch_upstream).take();
                drop(source_observation);
                unwatch_weak.set(AsyncResult::Pending);
            })),
        }
    });

    Arc::new(Switch {
        state,
        source,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, LedgerError};
    use crate::frp::signal::watch;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn transport(msg: &str) -> FetchError {
        LedgerError::Transport(msg.to_string()).into()
    }

    #[test]
    fn test_pipe_maps_completed() {
        let source = AsyncState::new(AsyncResult::Completed(5));
        let doubled = pipe(source.signal(), |x| x * 2);
        assert_eq!(doubled.get(), AsyncResult::Completed(10));
    }

    #[test]
    fn test_pipe_never_runs_transform_on_pending_or_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let source: AsyncState<i32> = AsyncState::new(AsyncResult::Pending);
        let piped = pipe(source.signal(), move |x| {
            c.fetch_add(1, Ordering::SeqCst);
            x + 1
        });
        let _observation = watch(piped.as_ref());

        assert!(piped.get().is_pending());
        source.set(AsyncResult::Error(transport("down")));
        assert_eq!(piped.get(), AsyncResult::Error(transport("down")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        source.set(AsyncResult::Completed(1));
        assert_eq!(piped.get(), AsyncResult::Completed(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pipe2_first_error_by_source_order() {
        let a: AsyncState<i32> = AsyncState::new(AsyncResult::Error(transport("a")));
        let b: AsyncState<i32> = AsyncState::new(AsyncResult::Error(transport("b")));
        let sum = pipe2(a.signal(), b.signal(), |x, y| x + y);
        assert_eq!(sum.get(), AsyncResult::Error(transport("a")));

        a.set(AsyncResult::Pending);
        assert!(sum.get().is_pending());

        a.set(AsyncResult::Completed(1));
        assert_eq!(sum.get(), AsyncResult::Error(transport("b")));

        b.set(AsyncResult::Completed(2));
        assert_eq!(sum.get(), AsyncResult::Completed(3));
    }

    #[test]
    fn test_pipe3_combines_heterogeneous_sources() {
        let a = AsyncState::new(AsyncResult::Completed(1u32));
        let b = AsyncState::new(AsyncResult::Completed("two".to_string()));
        let c = AsyncState::new(AsyncResult::Completed(3.0f64));
        let joined = pipe3(a.signal(), b.signal(), c.signal(), |a, b, c| {
            format!("{a}-{b}-{c}")
        });
        assert_eq!(joined.get(), AsyncResult::Completed("1-two-3".to_string()));
    }

    #[test]
    fn test_watched_pipe_recomputes_on_source_change() {
        let source = AsyncState::new(AsyncResult::Completed(1));
        let piped = pipe(source.signal(), |x| x * 10);
        let notified = Arc::new(AtomicUsize::new(0));
        let n = notified.clone();
        let _observation = piped.observe(listener(move || {
            n.fetch_add(1, Ordering::SeqCst);
        }));

        source.set(AsyncResult::Completed(2));
        assert_eq!(piped.get(), AsyncResult::Completed(20));
        assert!(notified.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_pipe_watch_propagates_to_source() {
        let source: AsyncState<i32> = AsyncState::new(AsyncResult::Completed(1));
        let piped = pipe(source.signal(), |x| x);
        assert!(!source.is_watched());

        let observation = watch(piped.as_ref());
        assert!(source.is_watched());
        drop(observation);
        assert!(!source.is_watched());
        assert!(!piped.is_watched());
    }

    #[test]
    fn test_join_async_precedence() {
        let a = AsyncState::new(AsyncResult::Completed(1));
        let b = AsyncState::new(AsyncResult::Error(transport("b")));
        let c = AsyncState::new(AsyncResult::Pending);
        let joined = join_async(vec![a.signal(), b.signal(), c.signal()]);
        let _observation = watch(joined.as_ref());

        assert!(joined.get().is_pending());
        c.set(AsyncResult::Completed(3));
        assert_eq!(joined.get(), AsyncResult::Error(transport("b")));
        b.set(AsyncResult::Completed(2));
        assert_eq!(joined.get(), AsyncResult::Completed(vec![1, 2, 3]));
    }

    #[test]
    fn test_join_async_keyed_keeps_keys() {
        let a = AsyncState::new(AsyncResult::Completed(1));
        let b = AsyncState::new(AsyncResult::Completed(2));
        let joined = join_async_keyed(vec![("a", a.signal()), ("b", b.signal())]);
        assert_eq!(joined.get(), AsyncResult::Completed(vec![("a", 1), ("b", 2)]));
    }

    #[test]
    fn test_switch_follows_inner_signal() {
        let inner_a = AsyncState::new(AsyncResult::Completed("alpha".to_string()));
        let inner_b = AsyncState::new(AsyncResult::Pending);
        let selector = AsyncState::new(AsyncResult::Completed('a'));

        let (a, b) = (inner_a.clone(), inner_b.clone());
        let followed = switch(selector.signal(), move |key| {
            if key == 'a' {
                a.signal()
            } else {
                b.signal()
            }
        });
        let _observation = watch(followed.as_ref());

        assert_eq!(followed.get(), AsyncResult::Completed("alpha".to_string()));
        assert!(inner_a.is_watched());

        selector.set(AsyncResult::Completed('b'));
        assert!(followed.get().is_pending());
        assert!(!inner_a.is_watched());
        assert!(inner_b.is_watched());

        inner_b.set(AsyncResult::Completed("beta".to_string()));
        assert_eq!(followed.get(), AsyncResult::Completed("beta".to_string()));

        selector.set(AsyncResult::Error(transport("selector")));
        assert_eq!(followed.get(), AsyncResult::Error(transport("selector")));
    }

    #[test]
    fn test_switch_reuses_inner_for_equal_input() {
        let builds = Arc::new(AtomicUsize::new(0));
        let b = builds.clone();
        let selector = AsyncState::new(AsyncResult::Completed(7));
        let followed = switch(selector.signal(), move |x: i32| {
            b.fetch_add(1, Ordering::SeqCst);
            AsyncState::new(AsyncResult::Completed(x * 2)).signal()
        });
        let _observation = watch(followed.as_ref());

        selector.set(AsyncResult::Completed(7));
        selector.set(AsyncResult::Completed(7));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(followed.get(), AsyncResult::Completed(14));

        selector.set(AsyncResult::Completed(8));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(followed.get(), AsyncResult::Completed(16));
    }

    #[test]
    fn test_switch_releases_inner_while_source_written_from_another_thread() {
        for _ in 0..200 {
            let selector = AsyncState::new(AsyncResult::Completed(0u32));
            let inner = AsyncState::new(AsyncResult::Completed(1u32));
            let inner_signal = inner.signal();
            let followed = switch(selector.signal(), move |offset| {
                pipe(Arc::clone(&inner_signal), move |v| v + offset)
            });

            let stop = Arc::new(AtomicBool::new(false));
            let writer = {
                let selector = selector.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    let mut n = 0;
                    while !stop.load(Ordering::SeqCst) {
                        n += 1;
                        selector.set(AsyncResult::Completed(n));
                    }
                })
            };

            for _ in 0..50 {
                drop(watch(followed.as_ref()));
            }
            stop.store(true, Ordering::SeqCst);
            writer.join().unwrap();

            assert!(!followed.is_watched());
            assert!(!inner.is_watched());
            assert!(!selector.is_watched());
        }
    }

    #[test]
    fn test_unwatched_derived_reverts_to_pull() {
        let source = AsyncState::new(AsyncResult::Completed(1));
        let piped = pipe(source.signal(), |x| x + 1);
        let observation = watch(piped.as_ref());
        drop(observation);

        source.set(AsyncResult::Completed(10));
        assert_eq!(piped.get(), AsyncResult::Completed(11));
    }
}
