// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Interval Reconciliation
//!
//! Reconciliation and validation run on arbitrary measurement sets and
//! declared windows. Timestamps are drawn from a small range so ties between
//! samples and window bounds happen often.

use ledger_signals::domain::{
    missing_time_slots, validate_all, validate_interval, ExternalResistorValue, Measurement,
};
use proptest::prelude::*;

fn measurement(timestamp: i64) -> Measurement {
    Measurement {
        timestamp,
        temperature_millicelsius: 0,
        humidity_millipercent: 0,
        light_level_millilux: 0,
        voltage_millivolts: 0,
    }
}

fn arb_measurements() -> impl Strategy<Value = Vec<Measurement>> {
    prop::collection::vec(0i64..500, 0..40)
        .prop_map(|timestamps| timestamps.into_iter().map(measurement).collect())
}

fn arb_window() -> impl Strategy<Value = ExternalResistorValue> {
    (0i64..500, 0i64..100, 1u64..10_000).prop_map(|(from, width, ohms)| ExternalResistorValue {
        external_resistor_value_ohms: ohms,
        from,
        to: from + width,
    })
}

/// Keep the windows that validate against the ones kept before them
fn accepted(candidates: Vec<ExternalResistorValue>) -> Vec<ExternalResistorValue> {
    candidates.into_iter().fold(Vec::new(), |mut kept, candidate| {
        if validate_interval(&kept, &candidate, None).is_ok() {
            kept.push(candidate);
        }
        kept
    })
}

fn covered(values: &[ExternalResistorValue], timestamp: i64) -> bool {
    values.iter().any(|value| value.covers(timestamp))
}

proptest! {
    #[test]
    fn prop_no_windows_yield_one_spanning_slot(measurements in arb_measurements()) {
        let slots = missing_time_slots(&measurements, &[]);
        match (
            measurements.iter().map(|m| m.timestamp).min(),
            measurements.iter().map(|m| m.timestamp).max(),
        ) {
            (Some(first), Some(last)) => {
                prop_assert_eq!(slots.len(), 1);
                prop_assert_eq!((slots[0].from, slots[0].to), (first, last));
            }
            _ => prop_assert!(slots.is_empty()),
        }
    }

    #[test]
    fn prop_full_coverage_leaves_no_slot(measurements in arb_measurements(), ohms in 1u64..1000) {
        let everything = ExternalResistorValue { external_resistor_value_ohms: ohms, from: 0, to: 499 };
        prop_assert!(missing_time_slots(&measurements, &[everything]).is_empty());
    }

    #[test]
    fn prop_slots_are_sorted_and_disjoint(
        measurements in arb_measurements(),
        windows in prop::collection::vec(arb_window(), 0..8),
    ) {
        let values = accepted(windows);
        let slots = missing_time_slots(&measurements, &values);
        for slot in &slots {
            prop_assert!(slot.from <= slot.to);
        }
        for pair in slots.windows(2) {
            prop_assert!(pair[0].to < pair[1].from, "{:?} then {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn prop_every_slot_holds_a_measurement(
        measurements in arb_measurements(),
        windows in prop::collection::vec(arb_window(), 0..8),
    ) {
        let values = accepted(windows);
        for slot in missing_time_slots(&measurements, &values) {
            prop_assert!(measurements.iter().any(|m| slot.contains(m.timestamp)));
        }
    }

    #[test]
    fn prop_uncovered_measurements_land_in_exactly_one_slot(
        measurements in arb_measurements(),
        windows in prop::collection::vec(arb_window(), 0..8),
    ) {
        let values = accepted(windows);
        let slots = missing_time_slots(&measurements, &values);
        for m in &measurements {
            let holding = slots.iter().filter(|slot| slot.contains(m.timestamp)).count();
            if covered(&values, m.timestamp) {
                prop_assert_eq!(holding, 0, "covered sample {} inside a slot", m.timestamp);
            } else {
                prop_assert_eq!(holding, 1, "uncovered sample {} in {} slots", m.timestamp, holding);
            }
        }
    }

    #[test]
    fn prop_accepted_windows_never_overlap(windows in prop::collection::vec(arb_window(), 0..12)) {
        let values = accepted(windows);
        prop_assert!(validate_all(&values).is_ok());
        for (i, a) in values.iter().enumerate() {
            for b in &values[i + 1..] {
                prop_assert!(a.to < b.from || b.to < a.from, "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn prop_editing_a_window_to_itself_is_valid(windows in prop::collection::vec(arb_window(), 1..12)) {
        let values = accepted(windows);
        for (index, value) in values.iter().enumerate() {
            prop_assert!(validate_interval(&values, value, Some(index)).is_ok());
        }
    }
}
