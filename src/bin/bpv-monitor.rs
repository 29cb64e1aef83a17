// Copyright (c) 2025 - Cowboy AI, Inc.
//! BPV Monitor
//!
//! Drives the living power store against an in-memory ledger and simulated
//! hardware: registers a device, records a collection from its media,
//! declares resistor values and reports the time slots still lacking one.
//!
//! Run with: cargo run --bin bpv-monitor
//!
//! Poll cadences come from the `LEDGER_*_MS` environment variables.

use std::sync::Arc;

use anyhow::{Context, Result};
use ledger_signals::domain::{BpvDeviceInfo, ExternalResistorValue, Measurement};
use ledger_signals::frp::{to_future, until_completed};
use ledger_signals::hardware::SimulatedHardware;
use ledger_signals::{LivingPowerClient, LivingPowerStore, MemoryLedger, StoreConfig};
use tracing::{info, warn};

const SERIAL: &str = "BPV-0001";
const MINUTE: i64 = 60_000_000;

fn sample(minute: i64, voltage_millivolts: u32) -> Measurement {
    Measurement {
        timestamp: 1_714_564_800_000_000 + minute * MINUTE,
        temperature_millicelsius: 21_500,
        humidity_millipercent: 40_000,
        light_level_millilux: 1_200_000,
        voltage_millivolts,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = StoreConfig::from_env().context("Invalid store configuration")?;
    info!(?config, "starting bpv monitor");

    let ledger = Arc::new(MemoryLedger::new());
    let hardware = Arc::new(SimulatedHardware::new());
    let client = LivingPowerClient::new(ledger);
    let store = LivingPowerStore::new(client.clone(), hardware.clone(), config);

    client
        .set_bpv_device_info(SERIAL, &BpvDeviceInfo { name: "Greenhouse bench".to_string() })
        .await
        .context("Failed to set device info")?;

    hardware.connect("/dev/ttyACM0", SERIAL);
    hardware.set_last_sample("/dev/ttyACM0", sample(3, 505));
    hardware.insert_media(
        SERIAL,
        "/media/bpv-0001",
        (0..4).map(|minute| sample(minute, 500 + minute as u32)).collect(),
    );

    let device = store.bpv_device(SERIAL);
    let unsaved = until_completed(device.unsaved_media_samples.as_ref()).await;
    info!(count = unsaved.len(), "found unsaved media samples");
    if !unsaved.is_empty() {
        client
            .create_measurement_collection(SERIAL, unsaved)
            .await
            .context("Failed to store measurement collection")?;
    }

    for (from, to, ohms) in [(0, 1, 1_000), (2, 2, 2_200)] {
        let value = ExternalResistorValue {
            external_resistor_value_ohms: ohms,
            from: sample(from, 0).timestamp,
            to: sample(to, 0).timestamp,
        };
        client
            .set_external_resistor_value(SERIAL, value, None)
            .await
            .context("Failed to declare resistor value")?;
    }

    let overlapping = ExternalResistorValue {
        external_resistor_value_ohms: 470,
        from: sample(1, 0).timestamp,
        to: sample(3, 0).timestamp,
    };
    if let Err(err) = client.set_external_resistor_value(SERIAL, overlapping, None).await {
        warn!(error = %err, "rejected resistor value");
    }

    let devices = to_future(store.all_bpv_devices_with_info.as_ref()).await?;
    for (serial, info) in devices {
        info!(serial, name = ?info.map(|info| info.name), "device");
    }

    let slots = to_future(device.missing_time_slots.as_ref()).await?;
    for slot in &slots {
        info!(from = slot.from, to = slot.to, "missing resistor value");
    }

    let chart = to_future(device.chart_measurements.as_ref()).await?;
    for point in chart {
        info!(
            timestamp = point.measurement.timestamp,
            ohms = ?point.external_resistor_ohms,
            microwatts = ?point.power_microwatts,
            "chart point"
        );
    }

    info!(
        new_data = ?until_completed(device.has_new_measurements.as_ref()).await,
        "bpv monitor done"
    );
    Ok(())
}
