// Copyright (c) 2025 - Cowboy AI, Inc.
//! End-to-End Tests
//!
//! Writes through the client, reads through the store's signals, against the
//! in-memory ledger and simulated hardware.

mod fixtures;

use std::time::Duration;

use fixtures::*;
use ledger_signals::domain::{BpvDeviceInfo, IntervalBound, MissingTimeSlot};
use ledger_signals::frp::{to_future, until_completed, watch, AsyncResult, Signal};
use ledger_signals::{FetchError, LedgerError, ServiceError};
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_device_lifecycle_and_reconciliation() {
    let bench = bench();

    bench
        .client
        .create_measurement_collection(SERIAL_1, measurements(&[100, 200, 300]))
        .await
        .unwrap();

    let all_devices = bench.store.all_bpv_device_serials.clone();
    let observation = watch(all_devices.as_ref());
    assert_eq!(all_devices.get(), AsyncResult::Pending);
    assert_eq!(until_completed(all_devices.as_ref()).await, vec![SERIAL_1.to_string()]);
    drop(observation);

    let device = bench.store.bpv_device(SERIAL_1);

    bench
        .client
        .set_external_resistor_value(SERIAL_1, resistor(50, 150, 10), None)
        .await
        .unwrap();
    let slots = to_future(device.missing_time_slots.as_ref()).await.unwrap();
    assert_eq!(slots, vec![MissingTimeSlot { from: 200, to: 300 }]);

    // 200 lies between the two windows and stays uncovered
    bench
        .client
        .set_external_resistor_value(SERIAL_1, resistor(250, 350, 20), None)
        .await
        .unwrap();
    let slots = to_future(device.missing_time_slots.as_ref()).await.unwrap();
    assert_eq!(slots, vec![MissingTimeSlot { from: 200, to: 200 }]);

    bench
        .client
        .set_external_resistor_value(SERIAL_1, resistor(160, 240, 15), None)
        .await
        .unwrap();
    let slots = to_future(device.missing_time_slots.as_ref()).await.unwrap();
    assert!(slots.is_empty());

    let chart = to_future(device.chart_measurements.as_ref()).await.unwrap();
    let ohms: Vec<Option<u64>> = chart.iter().map(|point| point.external_resistor_ohms).collect();
    assert_eq!(ohms, vec![Some(10), Some(15), Some(20)]);
}

#[tokio::test]
async fn test_overlapping_value_is_rejected_with_bound() {
    let bench = bench();
    assert_ok!(
        bench
            .client
            .set_external_resistor_value(SERIAL_1, resistor(100, 200, 10), None)
            .await
    );

    let err = assert_err!(
        bench
            .client
            .set_external_resistor_value(SERIAL_1, resistor(50, 100, 10), None)
            .await
    );
    match err {
        ServiceError::Validation(err) => assert_eq!(err.bound(), IntervalBound::To),
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = bench
        .client
        .set_external_resistor_value(SERIAL_1, resistor(300, 250, 10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn test_watched_signals_pick_up_writes_on_refresh() {
    let bench = bench();
    bench
        .client
        .create_measurement_collection(SERIAL_1, measurements(&[100, 200]))
        .await
        .unwrap();

    let device = bench.store.bpv_device(SERIAL_1);
    let _watching = watch(device.missing_time_slots.as_ref());
    assert_eq!(
        until_completed(device.missing_time_slots.as_ref()).await,
        vec![MissingTimeSlot { from: 100, to: 200 }]
    );

    bench
        .client
        .set_external_resistor_value(SERIAL_1, resistor(0, 1000, 47), None)
        .await
        .unwrap();
    settle().await;
    assert!(!device.missing_time_slots.get().completed().unwrap_or_default().is_empty());

    tokio::time::sleep(bench.store.config().links_refresh_interval + Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(device.missing_time_slots.get(), AsyncResult::Completed(vec![]));
}

#[tokio::test]
async fn test_deleted_collection_leaves_measurements() {
    let bench = bench();
    let kept = bench
        .client
        .create_measurement_collection(SERIAL_1, measurements(&[100, 200]))
        .await
        .unwrap();
    let dropped = bench
        .client
        .create_measurement_collection(SERIAL_1, measurements(&[300]))
        .await
        .unwrap();
    bench
        .client
        .delete_measurement_collection(dropped.action_hash)
        .await
        .unwrap();

    let device = bench.store.bpv_device(SERIAL_1);
    let all = to_future(device.all_measurements.as_ref()).await.unwrap();
    assert_eq!(all, measurements(&[100, 200]));

    let live = to_future(device.measurement_collections.live.as_ref()).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].0, kept.action_hash);

    let deleted = to_future(device.measurement_collections.deleted.as_ref()).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].link.target, dropped.action_hash);
    let status = to_future(deleted[0].bundle.status.as_ref()).await.unwrap();
    assert!(status.is_deleted());
}

#[tokio::test]
async fn test_devices_are_listed_with_info() {
    let bench = bench();
    bench
        .client
        .set_bpv_device_info(SERIAL_1, &BpvDeviceInfo { name: "north".to_string() })
        .await
        .unwrap();
    bench.client.register_bpv_device(SERIAL_2).await.unwrap();

    let listed = to_future(bench.store.all_bpv_devices_with_info.as_ref()).await.unwrap();
    assert_eq!(
        listed,
        vec![
            (SERIAL_1.to_string(), Some(BpvDeviceInfo { name: "north".to_string() })),
            (SERIAL_2.to_string(), None),
        ]
    );

    let devices = to_future(bench.store.all_bpv_devices.as_ref()).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&devices[0].1, &bench.store.bpv_device(SERIAL_1)));
}

#[tokio::test(start_paused = true)]
async fn test_new_data_from_connected_device() {
    let bench = bench();
    bench
        .client
        .create_measurement_collection(SERIAL_1, measurements(&[100, 200]))
        .await
        .unwrap();
    bench.hardware.connect(PORT_1, SERIAL_1);
    bench.hardware.set_last_sample(PORT_1, measurement(200));

    let device = bench.store.bpv_device(SERIAL_1);
    let _watching = watch(device.has_new_measurements.as_ref());
    assert!(!until_completed(device.has_new_measurements.as_ref()).await);

    bench.hardware.set_last_sample(PORT_1, measurement(300));
    tokio::time::sleep(bench.store.config().last_sample_interval + Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(device.has_new_measurements.get(), AsyncResult::Completed(true));
}

#[tokio::test]
async fn test_ledger_outage_surfaces_as_error() {
    let bench = bench();
    bench.ledger.set_offline(true);

    let device = bench.store.bpv_device(SERIAL_1);
    let result = to_future(device.info.as_ref()).await;
    assert!(matches!(result, Err(FetchError::Ledger(LedgerError::Transport(_)))));
}
