// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for BPV Devices
//!
//! Writes go through [`LivingPowerClient`]; reads come from the signals of
//! [`LivingPowerStore`], which pick writes up on their next refresh.
//!
//! # Architecture
//!
//! ```text
//! Caller
//!   │ write                         │ watch
//!   ↓                               ↓
//! LivingPowerClient            LivingPowerStore ←── HardwareProbe (polled)
//!   │  validate, encode tags        │  lazy_load / poll / pipe / switch
//!   ↓                               ↓
//!   └──────────────→ Ledger ←───────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let client = LivingPowerClient::new(ledger);
//! let store = LivingPowerStore::new(client.clone(), hardware, StoreConfig::from_env()?);
//!
//! client.set_external_resistor_value("A1", value, None).await?;
//!
//! let device = store.bpv_device("A1");
//! let gaps = to_future(device.missing_time_slots.as_ref()).await?;
//! ```

pub mod client;
pub mod store;

pub use client::{
    bpv_device_path, link_types, LivingPowerClient, ServiceError, ServiceResult, ALL_BPV_DEVICES_PATH,
};
pub use store::{merge_collections, BpvDeviceSignals, LivingPowerStore};
