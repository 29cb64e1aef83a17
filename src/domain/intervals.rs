// Copyright (c) 2025 - Cowboy AI, Inc.
//! Interval Reconciliation - Pure Functions
//!
//! Reconciles the measurement stream of a device against the external
//! resistor values the user declared for it.
//!
//! # Coverage Convention
//!
//! A declared value covers `from..=to`: a measurement exactly on either
//! boundary is covered and is never reported as missing.
//!
//! # Missing Time Slots
//!
//! ```text
//! samples (uncovered):     ●   ●        ●  ●          ●
//! interval starts:                ▼              ▼
//! slots:                  [●───●]      [●──●]        [●]
//! ```
//!
//! Uncovered samples and interval starts are merged into one timeline and
//! scanned once. A sample extends the open slot (or opens one); an interval
//! start closes it. On equal timestamps samples sort before interval starts,
//! so a boundary never splits a slot.
//!
//! # Validation
//!
//! Declared values must not overlap. [`validate_interval`] checks a proposed
//! value against its neighbours in `from` order and reports which bound
//! collides with which neighbour.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ExternalResistorValue, Measurement};
use crate::frp::{Time, Timeline};

/// Contiguous range of measurements without a declared resistor value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingTimeSlot {
    pub from: Time,
    pub to: Time,
}

impl MissingTimeSlot {
    pub fn contains(&self, timestamp: Time) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Sample,
    IntervalStart,
    CustomSlot { to: Time },
}

/// Missing time slots for `measurements` given the declared `values`
pub fn missing_time_slots(
    measurements: &[Measurement],
    values: &[ExternalResistorValue],
) -> Vec<MissingTimeSlot> {
    missing_time_slots_with_custom(measurements, values, None)
}

/// Missing time slots with one user-adjusted slot
///
/// Measurements inside `custom` are not reported in any other slot, and
/// `custom` itself is reported as-is, provided it contains a measurement.
pub fn missing_time_slots_with_custom(
    measurements: &[Measurement],
    values: &[ExternalResistorValue],
    custom: Option<MissingTimeSlot>,
) -> Vec<MissingTimeSlot> {
    let samples: Timeline<Tick> = measurements
        .iter()
        .map(|m| m.timestamp)
        .filter(|t| !values.iter().any(|value| value.covers(*t)))
        .filter(|t| !custom.is_some_and(|slot| slot.contains(*t)))
        .map(|t| (t, Tick::Sample))
        .collect();

    let boundaries: Timeline<Tick> = values
        .iter()
        .map(|value| (value.from, Tick::IntervalStart))
        .chain(custom.map(|slot| (slot.from, Tick::CustomSlot { to: slot.to })))
        .collect();

    let mut slots = Vec::new();
    let open = samples
        .merge(boundaries)
        .fold(None::<MissingTimeSlot>, |open, (time, tick)| match tick {
            Tick::Sample => Some(match open {
                Some(slot) => MissingTimeSlot { to: time, ..slot },
                None => MissingTimeSlot { from: time, to: time },
            }),
            Tick::IntervalStart => {
                slots.extend(open);
                None
            }
            Tick::CustomSlot { to } => {
                slots.extend(open);
                slots.push(MissingTimeSlot { from: time, to });
                None
            }
        });
    slots.extend(open);

    slots.retain(|slot| measurements.iter().any(|m| slot.contains(m.timestamp)));
    slots
}

/// Which bound of a proposed interval is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalBound {
    From,
    To,
}

impl fmt::Display for IntervalBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalBound::From => write!(f, "from"),
            IntervalBound::To => write!(f, "to"),
        }
    }
}

/// A proposed resistor value conflicts with the declared ones
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalValidationError {
    /// `from` is after `to`
    #[error("Interval ends at {to} before it starts at {from}")]
    InvertedBounds { from: Time, to: Time },

    /// A bound reaches into a neighbouring interval
    #[error("The {bound} bound overlaps interval #{neighbour_index} ({neighbour})")]
    Overlap {
        bound: IntervalBound,
        neighbour: ExternalResistorValue,
        neighbour_index: usize,
    },
}

impl IntervalValidationError {
    /// Bound the caller should flag
    pub fn bound(&self) -> IntervalBound {
        match self {
            IntervalValidationError::InvertedBounds { .. } => IntervalBound::To,
            IntervalValidationError::Overlap { bound, .. } => *bound,
        }
    }
}

/// Validation result
pub type IntervalResult = Result<(), IntervalValidationError>;

/// Check a proposed value against the declared ones
///
/// `editing` is the index in `existing` of the value being replaced, which
/// is then left out of the comparison. Neighbours are found in `from` order,
/// whatever order `existing` is in; `neighbour_index` in the error refers to
/// the position in `existing`.
///
/// # Rules
/// - `from <= to`
/// - `from` is strictly after the `to` of the nearest interval starting at
///   or before it
/// - `to` is strictly before the `from` of the nearest interval starting
///   after `from`
pub fn validate_interval(
    existing: &[ExternalResistorValue],
    candidate: &ExternalResistorValue,
    editing: Option<usize>,
) -> IntervalResult {
    if candidate.from > candidate.to {
        return Err(IntervalValidationError::InvertedBounds {
            from: candidate.from,
            to: candidate.to,
        });
    }

    let others = existing
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != editing);

    let preceding = others
        .clone()
        .filter(|(_, value)| value.from <= candidate.from)
        .max_by_key(|(_, value)| value.from);
    if let Some((index, neighbour)) = preceding {
        if neighbour.to >= candidate.from {
            return Err(IntervalValidationError::Overlap {
                bound: IntervalBound::From,
                neighbour: *neighbour,
                neighbour_index: index,
            });
        }
    }

    let following = others
        .filter(|(_, value)| value.from > candidate.from)
        .min_by_key(|(_, value)| value.from);
    if let Some((index, neighbour)) = following {
        if candidate.to >= neighbour.from {
            return Err(IntervalValidationError::Overlap {
                bound: IntervalBound::To,
                neighbour: *neighbour,
                neighbour_index: index,
            });
        }
    }

    Ok(())
}

/// Check that every declared value is well-formed and overlaps no other
pub fn validate_all(values: &[ExternalResistorValue]) -> IntervalResult {
    values
        .iter()
        .enumerate()
        .try_for_each(|(index, value)| validate_interval(values, value, Some(index)))
}

/// Whether every measurement has a resistor value and the plan is consistent
pub fn plan_is_complete(measurements: &[Measurement], values: &[ExternalResistorValue]) -> bool {
    validate_all(values).is_ok() && missing_time_slots(measurements, values).is_empty()
}
