// Copyright (c) 2025 - Cowboy AI, Inc.
//! Timeline - Discrete Occurrences Ordered by Time
//!
//! A `Timeline<T>` is a finite list of `(time, value)` occurrences kept in
//! ascending time order:
//!
//! ```text
//! Timeline<T> ≅ [(Time, T)]
//!
//! Time: ────────────────────────────→
//! Value:      ●       ●   ●       ●
//! ```
//!
//! Ordering is stable: occurrences sharing a timestamp keep their insertion
//! order, and [`Timeline::merge`] places the left timeline's occurrences
//! before the right one's on a tie. Sweep algorithms rely on this to break
//! ties deterministically.
//!
//! # Example
//!
//! ```rust,ignore
//! let samples = Timeline::from_vec(vec![(200, Tick::Sample), (100, Tick::Sample)]);
//! let starts = Timeline::from_vec(vec![(200, Tick::IntervalStart)]);
//!
//! // (100, Sample), (200, Sample), (200, IntervalStart)
//! let merged = samples.merge(starts);
//! ```

use super::{Occurrence, Time};

/// Discrete occurrences sorted by time
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<T> {
    occurrences: Vec<Occurrence<T>>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Timeline<T> {
    /// Build a timeline, sorting occurrences by time (stable)
    pub fn from_vec(mut occurrences: Vec<Occurrence<T>>) -> Self {
        occurrences.sort_by_key(|(time, _)| *time);
        Self { occurrences }
    }

    /// A timeline with no occurrences
    pub fn empty() -> Self {
        Self {
            occurrences: Vec::new(),
        }
    }

    /// Keep only occurrences whose value satisfies `predicate`
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        Self {
            occurrences: self
                .occurrences
                .into_iter()
                .filter(|(_, value)| predicate(value))
                .collect(),
        }
    }

    /// Transform every value, keeping times
    pub fn map<U, F>(self, f: F) -> Timeline<U>
    where
        F: Fn(T) -> U,
    {
        Timeline {
            occurrences: self
                .occurrences
                .into_iter()
                .map(|(time, value)| (time, f(value)))
                .collect(),
        }
    }

    /// Merge two timelines; on equal times `self` comes first
    pub fn merge(self, other: Self) -> Self {
        let mut merged = Vec::with_capacity(self.occurrences.len() + other.occurrences.len());
        let mut left = self.occurrences.into_iter().peekable();
        let mut right = other.occurrences.into_iter().peekable();

        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some((l, _)), Some((r, _))) => l <= r,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            merged.extend(next);
        }

        Self { occurrences: merged }
    }

    /// Fold occurrences in time order
    pub fn fold<A, F>(self, initial: A, f: F) -> A
    where
        F: FnMut(A, Occurrence<T>) -> A,
    {
        self.occurrences.into_iter().fold(initial, f)
    }

    /// Occurrences in time order
    pub fn occurrences(&self) -> &[Occurrence<T>] {
        &self.occurrences
    }

    /// Time of the first occurrence
    pub fn first_time(&self) -> Option<Time> {
        self.occurrences.first().map(|(time, _)| *time)
    }

    /// Time of the last occurrence
    pub fn last_time(&self) -> Option<Time> {
        self.occurrences.last().map(|(time, _)| *time)
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

impl<T> IntoIterator for Timeline<T> {
    type Item = Occurrence<T>;
    type IntoIter = std::vec::IntoIter<Occurrence<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.occurrences.into_iter()
    }
}

impl<T> FromIterator<Occurrence<T>> for Timeline<T> {
    fn from_iter<I: IntoIterator<Item = Occurrence<T>>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
