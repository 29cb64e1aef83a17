// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for ledger-signals
//!
//! Deterministic devices, measurements and resistor values shared by the
//! integration tests. The ledger clock starts at a fixed time so entry and
//! link timestamps are reproducible.

#![allow(dead_code)]

use std::sync::Arc;

use ledger_signals::domain::{ExternalResistorValue, Measurement};
use ledger_signals::hardware::SimulatedHardware;
use ledger_signals::{LivingPowerClient, LivingPowerStore, MemoryLedger, StoreConfig};

pub const SERIAL_1: &str = "BPV-0001";
pub const SERIAL_2: &str = "BPV-0002";
pub const PORT_1: &str = "/dev/ttyACM0";

/// Ledger clock start (2026-01-19T12:00:00Z in microseconds)
pub const LEDGER_EPOCH: i64 = 1_768_824_000_000_000;

/// Measurement at `timestamp` with fixed channel values
pub fn measurement(timestamp: i64) -> Measurement {
    Measurement {
        timestamp,
        temperature_millicelsius: 21_500,
        humidity_millipercent: 40_000,
        light_level_millilux: 1_200_000,
        voltage_millivolts: 500,
    }
}

pub fn measurements(timestamps: &[i64]) -> Vec<Measurement> {
    timestamps.iter().map(|&t| measurement(t)).collect()
}

pub fn resistor(from: i64, to: i64, ohms: u64) -> ExternalResistorValue {
    ExternalResistorValue {
        external_resistor_value_ohms: ohms,
        from,
        to,
    }
}

/// Store wired to a fresh in-memory ledger and simulated hardware
pub struct Bench {
    pub ledger: Arc<MemoryLedger>,
    pub hardware: Arc<SimulatedHardware>,
    pub client: LivingPowerClient,
    pub store: LivingPowerStore,
}

pub fn bench() -> Bench {
    bench_with(StoreConfig::default())
}

pub fn bench_with(config: StoreConfig) -> Bench {
    let ledger = Arc::new(MemoryLedger::with_clock(LEDGER_EPOCH));
    let hardware = Arc::new(SimulatedHardware::new());
    let client = LivingPowerClient::new(ledger.clone());
    let store = LivingPowerStore::new(client.clone(), hardware.clone(), config);
    Bench {
        ledger,
        hardware,
        client,
        store,
    }
}

/// Let spawned watch tasks run to their next await point
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
