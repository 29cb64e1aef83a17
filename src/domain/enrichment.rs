// Copyright (c) 2025 - Cowboy AI, Inc.
//! Measurement enrichment and new-data detection

use serde::{Deserialize, Serialize};

use super::{ExternalResistorValue, Measurement};

/// Measurement with the electrical values derived from its resistor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMeasurement {
    pub measurement: Measurement,
    pub external_resistor_ohms: Option<u64>,
    pub current_microamperes: Option<f64>,
    pub power_microwatts: Option<f64>,
}

/// Attach the covering resistor value to every measurement
///
/// Current is `mV / Ω × 1000` (µA) and power is `µA × mV / 1000` (µW).
/// Measurements outside every declared window, or under a zero-ohm value,
/// carry neither.
pub fn enrich(measurements: &[Measurement], values: &[ExternalResistorValue]) -> Vec<ChartMeasurement> {
    measurements
        .iter()
        .map(|measurement| {
            let ohms = values
                .iter()
                .find(|value| value.covers(measurement.timestamp))
                .map(|value| value.external_resistor_value_ohms);
            let millivolts = f64::from(measurement.voltage_millivolts);
            let current = ohms
                .filter(|ohms| *ohms > 0)
                .map(|ohms| millivolts / ohms as f64 * 1000.0);

            ChartMeasurement {
                measurement: *measurement,
                external_resistor_ohms: ohms,
                current_microamperes: current,
                power_microwatts: current.map(|microamps| microamps * millivolts / 1000.0),
            }
        })
        .collect()
}

/// Whether the device's last sample is newer than everything stored
pub fn has_new_measurements(last_sample: Option<&Measurement>, stored: &[Measurement]) -> bool {
    match (last_sample, stored.iter().map(|m| m.timestamp).max()) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(sample), Some(newest)) => sample.timestamp > newest,
    }
}

/// Collected measurements newer than the newest stored one, in time order
pub fn new_measurements(collected: &[Measurement], stored: &[Measurement]) -> Vec<Measurement> {
    let newest = stored.iter().map(|m| m.timestamp).max();
    let mut fresh: Vec<Measurement> = collected
        .iter()
        .filter(|m| newest.map_or(true, |newest| m.timestamp > newest))
        .copied()
        .collect();
    fresh.sort_by_key(|m| m.timestamp);
    fresh
}
