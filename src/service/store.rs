// Copyright (c) 2025 - Cowboy AI, Inc.
//! Living Power Store
//!
//! The read side of the BPV device model: one graph of lazily fetched,
//! polled and derived signals, materialised per device and per collection
//! through [`LazyMap`]s so every consumer of a device shares one bundle.
//!
//! # Signal Graph (per device)
//!
//! ```text
//! path_hash ─switch→ info_links ──pipe→ info
//!           ─switch→ resistor_links ─pipe→ external_resistor_values ─┐
//!           ─switch→ collection_links ─→ measurement_collections     │
//!                                     └→ all_measurements ───────────┼→ missing_time_slots
//!                                                 │                  └→ chart_measurements
//! connected_devices ─pipe→ connected_port ─switch→ last_sample ─┐
//!                                                 └─────────────┴→ has_new_measurements
//! removable_media ─pipe→ media ─switch→ media_samples ─pipe2→ unsaved_media_samples
//! ```
//!
//! Nothing above performs I/O until watched. Hardware probes poll on the
//! intervals of [`StoreConfig`]; ledger links refresh on
//! `links_refresh_interval`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::client::{decode_resistor_values, decode_serial_numbers, latest_info, link_types, LivingPowerClient};
use crate::cache::LazyMap;
use crate::config::StoreConfig;
use crate::domain::{
    enrich, has_new_measurements, missing_time_slots, new_measurements, BpvDeviceInfo, ChartMeasurement,
    ExternalResistorValue, Measurement, MeasurementCollection, MissingTimeSlot,
};
use crate::frp::{
    immutable_load, join_async, join_async_keyed, lazy_load, lazy_load_and_poll, pipe, pipe2, switch,
    AsyncResult, AsyncSignal, AsyncState,
};
use crate::hardware::{HardwareProbe, SerialPortInfo};
use crate::ledger::{
    collection, entity_signals, link_details, Collection, EntitySignals, Ledger, LedgerHash, LinkPartition,
    Revision,
};

type CollectionCache = LazyMap<LedgerHash, EntitySignals<MeasurementCollection>>;

/// Every signal the store keeps for one device
pub struct BpvDeviceSignals {
    pub serial_number: String,
    pub path_hash: AsyncSignal<LedgerHash>,
    /// Newest declared device info, `None` until one is set
    pub info: AsyncSignal<Option<BpvDeviceInfo>>,
    /// Serial port the device is attached to, if any
    pub connected_port: AsyncSignal<Option<SerialPortInfo>>,
    /// Last sample of the attached device; `None` while detached
    pub last_sample: AsyncSignal<Option<Measurement>>,
    /// Mount point of the device's removable media, if inserted
    pub media: AsyncSignal<Option<PathBuf>>,
    pub media_samples: AsyncSignal<Option<Vec<Measurement>>>,
    /// Media samples newer than anything stored in the ledger
    pub unsaved_media_samples: AsyncSignal<Vec<Measurement>>,
    pub measurement_collections: Collection<EntitySignals<MeasurementCollection>>,
    /// Every stored measurement of live collections, time ordered
    pub all_measurements: AsyncSignal<Vec<Measurement>>,
    pub external_resistor_values: AsyncSignal<Vec<(LedgerHash, ExternalResistorValue)>>,
    pub missing_time_slots: AsyncSignal<Vec<MissingTimeSlot>>,
    pub chart_measurements: AsyncSignal<Vec<ChartMeasurement>>,
    pub has_new_measurements: AsyncSignal<bool>,
}

/// Flatten collections into one time-ordered series, one sample per timestamp
pub fn merge_collections(collections: &[Revision<MeasurementCollection>]) -> Vec<Measurement> {
    let mut measurements: Vec<Measurement> = collections
        .iter()
        .flat_map(|collection| collection.entry.measurements.iter().copied())
        .collect();
    measurements.sort_by_key(|m| m.timestamp);
    measurements.dedup_by_key(|m| m.timestamp);
    measurements
}

fn constant<T: Clone + Send + Sync + 'static>(value: T) -> AsyncSignal<T> {
    AsyncState::new(AsyncResult::Completed(value)).signal()
}

/// State shared by every device bundle
#[derive(Clone)]
struct Wiring {
    config: StoreConfig,
    client: LivingPowerClient,
    connected_devices: AsyncSignal<Vec<SerialPortInfo>>,
    removable_media: AsyncSignal<BTreeMap<String, PathBuf>>,
    last_samples: Arc<LazyMap<String, AsyncSignal<Option<Measurement>>>>,
    media_samples: Arc<LazyMap<PathBuf, AsyncSignal<Vec<Measurement>>>>,
    measurement_collections: Arc<CollectionCache>,
}

impl Wiring {
    fn ledger(&self) -> Arc<dyn Ledger> {
        Arc::clone(self.client.ledger())
    }

    fn device_links(&self, path_hash: &AsyncSignal<LedgerHash>, link_type: &'static str) -> AsyncSignal<LinkPartition> {
        let ledger = self.ledger();
        let refresh = self.config.links_refresh_interval;
        switch(Arc::clone(path_hash), move |hash| {
            link_details(Arc::clone(&ledger), hash, link_type, refresh)
        })
    }

    fn bpv_device(&self, serial_number: &str) -> BpvDeviceSignals {
        let serial = serial_number.to_string();

        let path_hash = {
            let client = self.client.clone();
            let serial = serial.clone();
            immutable_load(move || {
                let client = client.clone();
                let serial = serial.clone();
                async move { client.bpv_device_hash(&serial).await }
            })
        };

        let info = pipe(
            self.device_links(&path_hash, link_types::BPV_DEVICE_TO_INFO),
            |links: LinkPartition| latest_info(&links.live),
        );

        let external_resistor_values = pipe(
            self.device_links(&path_hash, link_types::BPV_DEVICE_TO_EXTERNAL_RESISTOR_VALUES),
            |links: LinkPartition| decode_resistor_values(&links.live),
        );

        let collection_links = self.device_links(&path_hash, link_types::BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS);
        let measurement_collections =
            collection(collection_links.clone(), Arc::clone(&self.measurement_collections));

        let all_measurements = {
            let cache = Arc::clone(&self.measurement_collections);
            let hashes = pipe(collection_links, |links: LinkPartition| links.live_targets());
            switch(hashes, move |hashes: Vec<LedgerHash>| {
                let originals = hashes
                    .iter()
                    .map(|hash| cache.get(hash).original.clone())
                    .collect();
                pipe(join_async(originals), |collections: Vec<Revision<MeasurementCollection>>| {
                    merge_collections(&collections)
                })
            })
        };

        let connected_port = {
            let serial = serial.clone();
            pipe(self.connected_devices.clone(), move |ports: Vec<SerialPortInfo>| {
                ports
                    .into_iter()
                    .find(|port| port.serial_number.as_deref() == Some(serial.as_str()))
            })
        };

        let last_sample = {
            let last_samples = Arc::clone(&self.last_samples);
            switch(connected_port.clone(), move |port: Option<SerialPortInfo>| match port {
                Some(port) => Arc::clone(&*last_samples.get(&port.port_name)),
                None => constant(None),
            })
        };

        let media = {
            let serial = serial.clone();
            pipe(self.removable_media.clone(), move |media: BTreeMap<String, PathBuf>| {
                media.get(&serial).cloned()
            })
        };

        let media_samples = {
            let cache = Arc::clone(&self.media_samples);
            switch(media.clone(), move |path: Option<PathBuf>| match path {
                Some(path) => pipe(Arc::clone(&*cache.get(&path)), |samples: Vec<Measurement>| Some(samples)),
                None => constant(None),
            })
        };

        let unsaved_media_samples = pipe2(
            media_samples.clone(),
            all_measurements.clone(),
            |collected: Option<Vec<Measurement>>, stored: Vec<Measurement>| {
                collected
                    .map(|collected| new_measurements(&collected, &stored))
                    .unwrap_or_default()
            },
        );

        let values_only = |values: &[(LedgerHash, ExternalResistorValue)]| -> Vec<ExternalResistorValue> {
            values.iter().map(|(_, value)| *value).collect()
        };

        let missing = pipe2(
            all_measurements.clone(),
            external_resistor_values.clone(),
            move |measurements: Vec<Measurement>, values: Vec<(LedgerHash, ExternalResistorValue)>| {
                missing_time_slots(&measurements, &values_only(&values))
            },
        );

        let chart_measurements = pipe2(
            all_measurements.clone(),
            external_resistor_values.clone(),
            move |measurements: Vec<Measurement>, values: Vec<(LedgerHash, ExternalResistorValue)>| {
                enrich(&measurements, &values_only(&values))
            },
        );

        let new_data = pipe2(
            last_sample.clone(),
            all_measurements.clone(),
            |last: Option<Measurement>, stored: Vec<Measurement>| has_new_measurements(last.as_ref(), &stored),
        );

        BpvDeviceSignals {
            serial_number: serial,
            path_hash,
            info,
            connected_port,
            last_sample,
            media,
            media_samples,
            unsaved_media_samples,
            measurement_collections,
            all_measurements,
            external_resistor_values,
            missing_time_slots: missing,
            chart_measurements,
            has_new_measurements: new_data,
        }
    }
}

/// Shared signal graph over the ledger and local hardware
pub struct LivingPowerStore {
    client: LivingPowerClient,
    config: StoreConfig,
    /// Ports with a device attached, polled
    pub connected_devices: AsyncSignal<Vec<SerialPortInfo>>,
    /// Mounted device media keyed by serial number, polled
    pub removable_media: AsyncSignal<BTreeMap<String, PathBuf>>,
    /// Serial numbers of every indexed device
    pub all_bpv_device_serials: AsyncSignal<Vec<String>>,
    pub all_bpv_devices: AsyncSignal<Vec<(String, Arc<BpvDeviceSignals>)>>,
    pub all_bpv_devices_with_info: AsyncSignal<Vec<(String, Option<BpvDeviceInfo>)>>,
    bpv_devices: Arc<LazyMap<String, BpvDeviceSignals>>,
    measurement_collections: Arc<CollectionCache>,
}

impl LivingPowerStore {
    pub fn new(client: LivingPowerClient, hardware: Arc<dyn HardwareProbe>, config: StoreConfig) -> Self {
        info!(
            links_refresh_ms = config.links_refresh_interval.as_millis() as u64,
            devices_poll_ms = config.connected_devices_interval.as_millis() as u64,
            media_poll_ms = config.removable_media_interval.as_millis() as u64,
            sample_poll_ms = config.last_sample_interval.as_millis() as u64,
            "building living power store"
        );

        let connected_devices = {
            let hardware = Arc::clone(&hardware);
            lazy_load_and_poll(
                move || {
                    let hardware = Arc::clone(&hardware);
                    async move { hardware.list_connected_devices().await }
                },
                config.connected_devices_interval,
            )
        };

        let removable_media = {
            let hardware = Arc::clone(&hardware);
            lazy_load_and_poll(
                move || {
                    let hardware = Arc::clone(&hardware);
                    async move { hardware.enumerate_removable_media().await }
                },
                config.removable_media_interval,
            )
        };

        let last_samples = {
            let hardware = Arc::clone(&hardware);
            let interval = config.last_sample_interval;
            Arc::new(LazyMap::new("last_samples", move |port_name: &String| {
                debug!(port = %port_name, "polling last sample");
                let hardware = Arc::clone(&hardware);
                let port_name = port_name.clone();
                lazy_load_and_poll(
                    move || {
                        let hardware = Arc::clone(&hardware);
                        let port_name = port_name.clone();
                        async move { hardware.read_last_sample(&port_name).await }
                    },
                    interval,
                )
            }))
        };

        let media_samples = {
            let hardware = Arc::clone(&hardware);
            Arc::new(LazyMap::new("media_samples", move |path: &PathBuf| {
                let hardware = Arc::clone(&hardware);
                let path = path.clone();
                lazy_load(move || {
                    let hardware = Arc::clone(&hardware);
                    let path = path.clone();
                    async move { hardware.read_all_samples_from_media(&path).await }
                })
            }))
        };

        let measurement_collections: Arc<CollectionCache> = {
            let ledger = Arc::clone(client.ledger());
            Arc::new(LazyMap::new("measurement_collections", move |hash: &LedgerHash| {
                entity_signals(Arc::clone(&ledger), *hash)
            }))
        };

        let wiring = Wiring {
            config: config.clone(),
            client: client.clone(),
            connected_devices: connected_devices.clone(),
            removable_media: removable_media.clone(),
            last_samples,
            media_samples,
            measurement_collections: Arc::clone(&measurement_collections),
        };
        let bpv_devices = Arc::new(LazyMap::new("bpv_devices", move |serial: &String| {
            wiring.bpv_device(serial)
        }));

        let all_bpv_device_serials = {
            let index_client = client.clone();
            let index = immutable_load(move || {
                let client = index_client.clone();
                async move { client.all_bpv_devices_hash().await }
            });
            let ledger = Arc::clone(client.ledger());
            let refresh = config.links_refresh_interval;
            switch(index, move |hash| {
                pipe(
                    link_details(Arc::clone(&ledger), hash, link_types::ALL_BPV_DEVICES, refresh),
                    |links: LinkPartition| decode_serial_numbers(&links.live),
                )
            })
        };

        let all_bpv_devices = {
            let devices = Arc::clone(&bpv_devices);
            pipe(all_bpv_device_serials.clone(), move |serials: Vec<String>| {
                serials
                    .into_iter()
                    .map(|serial| {
                        let device = devices.get(&serial);
                        (serial, device)
                    })
                    .collect::<Vec<_>>()
            })
        };

        let all_bpv_devices_with_info = {
            let devices = Arc::clone(&bpv_devices);
            switch(all_bpv_device_serials.clone(), move |serials: Vec<String>| {
                join_async_keyed(
                    serials
                        .into_iter()
                        .map(|serial| {
                            let info = devices.get(&serial).info.clone();
                            (serial, info)
                        })
                        .collect(),
                )
            })
        };

        Self {
            client,
            config,
            connected_devices,
            removable_media,
            all_bpv_device_serials,
            all_bpv_devices,
            all_bpv_devices_with_info,
            bpv_devices,
            measurement_collections,
        }
    }

    pub fn client(&self) -> &LivingPowerClient {
        &self.client
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Signal bundle of the device with `serial_number`
    pub fn bpv_device(&self, serial_number: &str) -> Arc<BpvDeviceSignals> {
        self.bpv_devices.get(&serial_number.to_string())
    }

    /// Every stored measurement of the device's live collections
    pub fn all_measurements_for_device(&self, serial_number: &str) -> AsyncSignal<Vec<Measurement>> {
        self.bpv_device(serial_number).all_measurements.clone()
    }

    /// Signal bundle of the collection whose entry is `hash`
    pub fn measurement_collection(&self, hash: LedgerHash) -> Arc<EntitySignals<MeasurementCollection>> {
        self.measurement_collections.get(&hash)
    }

    /// Number of device bundles built so far
    pub fn materialised_devices(&self) -> usize {
        self.bpv_devices.len()
    }
}
