// Copyright (c) 2025 - Cowboy AI, Inc.
//! Domain Types
//!
//! Value types for BPV (bio-photovoltaic) devices and their measurements.
//! All types are plain immutable values; the ledger stores them as entries or
//! link tags.
//!
//! Channel values are integers in thousandths of their unit, the way the
//! device firmware reports them after scaling.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frp::Time;
use crate::ledger::{LedgerEntry, LedgerHash};

pub mod enrichment;
pub mod intervals;

pub use enrichment::{enrich, has_new_measurements, new_measurements, ChartMeasurement};
pub use intervals::{
    missing_time_slots, missing_time_slots_with_custom, plan_is_complete, validate_all,
    validate_interval, IntervalBound, IntervalValidationError, MissingTimeSlot,
};

/// One sample read from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measurement {
    /// Microseconds since epoch (UTC)
    pub timestamp: Time,
    pub temperature_millicelsius: u32,
    pub humidity_millipercent: u32,
    pub light_level_millilux: u32,
    pub voltage_millivolts: u32,
}

/// Batch of measurements collected from one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCollection {
    pub bpv_device_hash: LedgerHash,
    pub measurements: Vec<Measurement>,
}

impl LedgerEntry for MeasurementCollection {
    const ENTRY_TYPE: &'static str = "MeasurementCollection";
}

/// User-facing description of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpvDeviceInfo {
    pub name: String,
}

/// Declared external resistor for the inclusive window `from..=to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalResistorValue {
    pub external_resistor_value_ohms: u64,
    pub from: Time,
    pub to: Time,
}

impl ExternalResistorValue {
    /// Whether `timestamp` falls inside the window, both ends included
    pub fn covers(&self, timestamp: Time) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

impl fmt::Display for ExternalResistorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Ω over {}..={}",
            self.external_resistor_value_ohms, self.from, self.to
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_covers_both_ends() {
        let value = ExternalResistorValue {
            external_resistor_value_ohms: 10,
            from: 50,
            to: 150,
        };
        assert!(value.covers(50));
        assert!(value.covers(150));
        assert!(!value.covers(49));
        assert!(!value.covers(151));
    }

    #[test]
    fn test_collection_serializes_with_entry_fields() {
        let collection = MeasurementCollection {
            bpv_device_hash: LedgerHash::from_name("bpv_devices.A1"),
            measurements: vec![],
        };
        let value = serde_json::to_value(&collection).unwrap();
        assert!(value.get("bpv_device_hash").is_some());
        assert_eq!(MeasurementCollection::ENTRY_TYPE, "MeasurementCollection");
    }
}
