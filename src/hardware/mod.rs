// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hardware Collaborator Contract
//!
//! Request/response access to locally attached devices. Nothing here pushes;
//! freshness comes from the poll signals built on top of [`HardwareProbe`].
//!
//! # Probes
//!
//! | Probe                          | Polled by                           |
//! |--------------------------------|-------------------------------------|
//! | `list_connected_devices`       | store, `connected_devices_interval` |
//! | `read_last_sample`             | per device, `last_sample_interval`  |
//! | `enumerate_removable_media`    | store, `removable_media_interval`   |
//! | `read_all_samples_from_media`  | per device, once per watch          |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Measurement;
use crate::errors::HardwareError;

pub mod csv;
pub mod simulated;

pub use csv::{parse_sample_line, parse_samples, read_media_samples};
pub use simulated::SimulatedHardware;

/// Result type for hardware probes
pub type HardwareResult<T> = Result<T, HardwareError>;

/// A serial port with a device behind it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    /// USB serial number of the device, when the port reports one
    pub serial_number: Option<String>,
}

/// Locally attached device access
#[async_trait]
pub trait HardwareProbe: Send + Sync {
    /// Ports that currently have a device attached
    async fn list_connected_devices(&self) -> HardwareResult<Vec<SerialPortInfo>>;

    /// Most recent sample held by the device on `port_name`, if it has one
    async fn read_last_sample(&self, port_name: &str) -> HardwareResult<Option<Measurement>>;

    /// Mounted media carrying device data, keyed by device serial number
    async fn enumerate_removable_media(&self) -> HardwareResult<BTreeMap<String, PathBuf>>;

    /// Every sample stored on the media mounted at `path`
    async fn read_all_samples_from_media(&self, path: &Path) -> HardwareResult<Vec<Measurement>>;
}
