// Copyright (c) 2025 - Cowboy AI, Inc.
//! AsyncResult - Outcome of Asynchronous Work
//!
//! Every signal in this crate carries an `AsyncResult<T>`:
//!
//! ```text
//!            watch                  fetch ok
//! (unwatched) ───→ Pending ─────────────────→ Completed(v) ──┐ refresh ok
//!                    │                              ↑  ↓     │
//!                    │ fetch failed        refresh  │  │ ←───┘
//!                    └──────────────→ Error(e) ─────┘  │ refresh failed
//!                                                      ↓
//!                                                   Error(e)
//! ```
//!
//! Unwatching a signal drops whatever it held and returns it to `Pending`.
//!
//! # Join Precedence
//!
//! When several results are combined, `Pending` wins over `Error`, and among
//! errors the first one in source order wins. The combining function only
//! ever sees fully `Completed` inputs.

use crate::errors::FetchError;

/// Tri-state outcome of an asynchronous computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncResult<T> {
    /// Work has not produced a value yet (or nobody is watching)
    Pending,
    /// The last attempt failed
    Error(FetchError),
    /// The last attempt produced a value
    Completed(T),
}

impl<T> Default for AsyncResult<T> {
    fn default() -> Self {
        AsyncResult::Pending
    }
}

impl<T> AsyncResult<T> {
    /// Whether the result is still pending
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncResult::Pending)
    }

    /// Whether the result holds a value
    pub fn is_completed(&self) -> bool {
        matches!(self, AsyncResult::Completed(_))
    }

    /// Whether the result holds an error
    pub fn is_error(&self) -> bool {
        matches!(self, AsyncResult::Error(_))
    }

    /// The completed value, if any
    pub fn completed(self) -> Option<T> {
        match self {
            AsyncResult::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// The error, if any
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            AsyncResult::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Borrow the completed value
    pub fn as_ref(&self) -> AsyncResult<&T> {
        match self {
            AsyncResult::Pending => AsyncResult::Pending,
            AsyncResult::Error(err) => AsyncResult::Error(err.clone()),
            AsyncResult::Completed(value) => AsyncResult::Completed(value),
        }
    }

    /// Transform the completed value
    ///
    /// `f` is never called for `Pending` or `Error`.
    pub fn map<U, F>(self, f: F) -> AsyncResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            AsyncResult::Pending => AsyncResult::Pending,
            AsyncResult::Error(err) => AsyncResult::Error(err),
            AsyncResult::Completed(value) => AsyncResult::Completed(f(value)),
        }
    }

    /// Chain a computation that may itself be pending or fail
    pub fn and_then<U, F>(self, f: F) -> AsyncResult<U>
    where
        F: FnOnce(T) -> AsyncResult<U>,
    {
        match self {
            AsyncResult::Pending => AsyncResult::Pending,
            AsyncResult::Error(err) => AsyncResult::Error(err),
            AsyncResult::Completed(value) => f(value),
        }
    }
}

impl<T, E> From<Result<T, E>> for AsyncResult<T>
where
    E: Into<FetchError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => AsyncResult::Completed(value),
            Err(err) => AsyncResult::Error(err.into()),
        }
    }
}

/// Join an ordered list of results into one result holding all values
///
/// `Pending` if any input is pending, otherwise the first error in input
/// order, otherwise all values in input order.
pub fn join_results<T, I>(results: I) -> AsyncResult<Vec<T>>
where
    I: IntoIterator<Item = AsyncResult<T>>,
{
    let mut values = Vec::new();
    let mut first_error = None;
    let mut pending = false;

    for result in results {
        match result {
            AsyncResult::Pending => pending = true,
            AsyncResult::Error(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            AsyncResult::Completed(value) => values.push(value),
        }
    }

    if pending {
        return AsyncResult::Pending;
    }
    match first_error {
        Some(err) => AsyncResult::Error(err),
        None => AsyncResult::Completed(values),
    }
}

/// Join two heterogeneous results
pub fn join2<A, B>(a: AsyncResult<A>, b: AsyncResult<B>) -> AsyncResult<(A, B)> {
    match (a, b) {
        (AsyncResult::Completed(a), AsyncResult::Completed(b)) => AsyncResult::Completed((a, b)),
        (AsyncResult::Pending, _) | (_, AsyncResult::Pending) => AsyncResult::Pending,
        (AsyncResult::Error(err), _) | (_, AsyncResult::Error(err)) => AsyncResult::Error(err),
    }
}

/// Join three heterogeneous results
pub fn join3<A, B, C>(
    a: AsyncResult<A>,
    b: AsyncResult<B>,
    c: AsyncResult<C>,
) -> AsyncResult<(A, B, C)> {
    join2(join2(a, b), c).map(|((a, b), c)| (a, b, c))
}
