// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Ledger Client
//!
//! `LivingPowerClient` names the paths and link types of the BPV device
//! model and encodes/decodes their payloads. It is the write path of the
//! crate; the store's signals are the read path.
//!
//! # Ledger Layout
//!
//! ```text
//! path("all_bpv_devices") ──AllBpvDevices[tag=serial]──→ path("all_bpv_devices.<serial>")
//!
//! device ──BpvDeviceToBpvDeviceInfo[tag=info]──────────→ device
//! device ──BpvDeviceToExternalResistorValues[tag=value]→ device
//! device ──BpvDeviceToMeasurementCollections───────────→ MeasurementCollection entry
//! ```
//!
//! Device info and resistor values live in link tags; the newest info link
//! wins. Editing a resistor value revokes its link and creates a new one.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{validate_interval, BpvDeviceInfo, ExternalResistorValue, IntervalValidationError, MeasurementCollection};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{encode_tag, DeletionMarker, Ledger, LedgerExt, LedgerHash, Link, LinkDeletion, Revision};

/// Anchor path of the device index
pub const ALL_BPV_DEVICES_PATH: &str = "all_bpv_devices";

/// Link types of the BPV device model
pub mod link_types {
    pub const ALL_BPV_DEVICES: &str = "AllBpvDevices";
    pub const BPV_DEVICE_TO_INFO: &str = "BpvDeviceToBpvDeviceInfo";
    pub const BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS: &str = "BpvDeviceToMeasurementCollections";
    pub const BPV_DEVICE_TO_EXTERNAL_RESISTOR_VALUES: &str = "BpvDeviceToExternalResistorValues";
}

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Proposed resistor value conflicts with the declared ones
    #[error("Validation error: {0}")]
    Validation(#[from] IntervalValidationError),

    /// Ledger call failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Path of a device's anchor
pub fn bpv_device_path(serial_number: &str) -> String {
    format!("{ALL_BPV_DEVICES_PATH}.{serial_number}")
}

/// Latest decodable device info among live info links
pub fn latest_info(links: &[Link]) -> Option<BpvDeviceInfo> {
    let mut links: Vec<&Link> = links.iter().collect();
    links.sort_by_key(|link| std::cmp::Reverse(link.timestamp));
    links.into_iter().find_map(|link| match link.decode_tag() {
        Ok(info) => Some(info),
        Err(err) => {
            warn!(link = %link.create_link_hash, error = %err, "undecodable device info tag");
            None
        }
    })
}

/// Decode resistor value links, skipping undecodable tags
pub fn decode_resistor_values(links: &[Link]) -> Vec<(LedgerHash, ExternalResistorValue)> {
    links
        .iter()
        .filter_map(|link| match link.decode_tag() {
            Ok(value) => Some((link.create_link_hash, value)),
            Err(err) => {
                warn!(link = %link.create_link_hash, error = %err, "undecodable resistor value tag");
                None
            }
        })
        .collect()
}

/// Decode device serial numbers from index links, without duplicates
pub fn decode_serial_numbers(links: &[Link]) -> Vec<String> {
    let mut serials: Vec<String> = Vec::new();
    for link in links {
        match link.decode_tag::<String>() {
            Ok(serial) if serial != ALL_BPV_DEVICES_PATH && !serials.contains(&serial) => serials.push(serial),
            Ok(_) => {}
            Err(err) => warn!(link = %link.create_link_hash, error = %err, "undecodable device index tag"),
        }
    }
    serials
}

/// Typed client for the BPV device model
#[derive(Clone)]
pub struct LivingPowerClient {
    ledger: Arc<dyn Ledger>,
}

impl LivingPowerClient {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    // Bpv Device

    /// Anchor hash of the device with `serial_number`
    pub async fn bpv_device_hash(&self, serial_number: &str) -> LedgerResult<LedgerHash> {
        self.ledger.path_hash(&bpv_device_path(serial_number)).await
    }

    /// Anchor hash of the device index
    pub async fn all_bpv_devices_hash(&self) -> LedgerResult<LedgerHash> {
        self.ledger.path_hash(ALL_BPV_DEVICES_PATH).await
    }

    /// Add the device to the index if it is not listed yet
    pub async fn register_bpv_device(&self, serial_number: &str) -> LedgerResult<LedgerHash> {
        let index = self.all_bpv_devices_hash().await?;
        let device = self.bpv_device_hash(serial_number).await?;

        let listed = self.ledger.get_links(index, link_types::ALL_BPV_DEVICES).await?;
        if !listed.iter().any(|link| link.target == device) {
            let tag = encode_tag(&serial_number)?;
            self.ledger
                .create_link(index, device, link_types::ALL_BPV_DEVICES, tag)
                .await?;
            info!(serial_number, "registered bpv device");
        }
        Ok(device)
    }

    /// Serial numbers of every indexed device
    pub async fn get_all_bpv_devices(&self) -> LedgerResult<Vec<String>> {
        let index = self.all_bpv_devices_hash().await?;
        let links = self.ledger.get_links(index, link_types::ALL_BPV_DEVICES).await?;
        Ok(decode_serial_numbers(&links))
    }

    pub async fn set_bpv_device_info(&self, serial_number: &str, info: &BpvDeviceInfo) -> ServiceResult<()> {
        let device = self.register_bpv_device(serial_number).await?;
        let tag = encode_tag(info)?;
        self.ledger
            .create_link(device, device, link_types::BPV_DEVICE_TO_INFO, tag)
            .await?;
        info!(serial_number, name = %info.name, "set bpv device info");
        Ok(())
    }

    pub async fn get_bpv_device_info(&self, serial_number: &str) -> LedgerResult<Option<BpvDeviceInfo>> {
        let device = self.bpv_device_hash(serial_number).await?;
        let links = self.ledger.get_links(device, link_types::BPV_DEVICE_TO_INFO).await?;
        Ok(latest_info(&links))
    }

    // Measurement Collection

    /// Store a collection and link it from its device
    pub async fn create_measurement_collection(
        &self,
        serial_number: &str,
        measurements: Vec<crate::domain::Measurement>,
    ) -> ServiceResult<Revision<MeasurementCollection>> {
        let device = self.register_bpv_device(serial_number).await?;
        let collection = MeasurementCollection {
            bpv_device_hash: device,
            measurements,
        };
        let created = self.ledger.create(&collection).await?;
        self.ledger
            .create_link(
                device,
                created.action_hash,
                link_types::BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS,
                Vec::new(),
            )
            .await?;
        info!(
            serial_number,
            collection = %created.action_hash,
            measurements = created.entry.measurements.len(),
            "created measurement collection"
        );
        Ok(created)
    }

    pub async fn get_measurement_collection(
        &self,
        hash: LedgerHash,
    ) -> LedgerResult<Option<Revision<MeasurementCollection>>> {
        self.ledger.original(hash).await
    }

    /// Delete a collection and revoke its device link
    pub async fn delete_measurement_collection(&self, hash: LedgerHash) -> ServiceResult<LedgerHash> {
        let collection = self
            .get_measurement_collection(hash)
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))?;
        let marker = self.ledger.delete_entry(hash).await?;

        let device = collection.entry.bpv_device_hash;
        let links = self
            .ledger
            .get_links(device, link_types::BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS)
            .await?;
        for link in links.into_iter().filter(|link| link.target == hash) {
            self.ledger.delete_link(link.create_link_hash).await?;
        }
        info!(collection = %hash, "deleted measurement collection");
        Ok(marker)
    }

    pub async fn get_all_deletes_for_measurement_collection(
        &self,
        hash: LedgerHash,
    ) -> LedgerResult<Vec<DeletionMarker>> {
        self.ledger.get_all_deletes(hash).await
    }

    pub async fn get_oldest_delete_for_measurement_collection(
        &self,
        hash: LedgerHash,
    ) -> LedgerResult<Option<DeletionMarker>> {
        let deletes = self.ledger.get_all_deletes(hash).await?;
        Ok(deletes.into_iter().min_by_key(|marker| marker.timestamp))
    }

    pub async fn get_measurement_collections_for_bpv_device(&self, serial_number: &str) -> LedgerResult<Vec<Link>> {
        let device = self.bpv_device_hash(serial_number).await?;
        self.ledger
            .get_links(device, link_types::BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS)
            .await
    }

    pub async fn get_deleted_measurement_collections_for_bpv_device(
        &self,
        serial_number: &str,
    ) -> LedgerResult<Vec<(Link, Vec<LinkDeletion>)>> {
        let device = self.bpv_device_hash(serial_number).await?;
        self.ledger
            .get_deleted_links(device, link_types::BPV_DEVICE_TO_MEASUREMENT_COLLECTIONS)
            .await
    }

    // External Resistor Values

    pub async fn get_all_external_resistor_values(
        &self,
        serial_number: &str,
    ) -> LedgerResult<Vec<(LedgerHash, ExternalResistorValue)>> {
        let device = self.bpv_device_hash(serial_number).await?;
        let links = self
            .ledger
            .get_links(device, link_types::BPV_DEVICE_TO_EXTERNAL_RESISTOR_VALUES)
            .await?;
        Ok(decode_resistor_values(&links))
    }

    /// Declare a resistor value, or replace the one linked by `replacing`
    ///
    /// The value is validated against the currently declared ones before
    /// anything is written.
    pub async fn set_external_resistor_value(
        &self,
        serial_number: &str,
        value: ExternalResistorValue,
        replacing: Option<LedgerHash>,
    ) -> ServiceResult<Link> {
        let declared = self.get_all_external_resistor_values(serial_number).await?;
        let values: Vec<ExternalResistorValue> = declared.iter().map(|(_, value)| *value).collect();
        let editing = replacing.and_then(|hash| declared.iter().position(|(link, _)| *link == hash));
        validate_interval(&values, &value, editing)?;

        let device = self.register_bpv_device(serial_number).await?;
        if let Some(previous) = replacing {
            self.ledger.delete_link(previous).await?;
        }
        let link = self
            .ledger
            .create_link(
                device,
                device,
                link_types::BPV_DEVICE_TO_EXTERNAL_RESISTOR_VALUES,
                encode_tag(&value)?,
            )
            .await?;
        info!(serial_number, %value, "declared external resistor value");
        Ok(link)
    }

    pub async fn delete_external_resistor_value(&self, create_link_hash: LedgerHash) -> ServiceResult<()> {
        self.ledger.delete_link(create_link_hash).await?;
        Ok(())
    }
}
