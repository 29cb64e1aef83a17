// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reactive cache-and-derivation layer over an append-only ledger
//!
//! This crate provides lazily fetched, polled and derived signals over a
//! peer-replicated ledger and locally attached hardware, plus the BPV device
//! model built on top of them.

pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod frp;
pub mod hardware;
pub mod ledger;
pub mod service;

// Re-export commonly used types
pub use cache::LazyMap;
pub use config::StoreConfig;
pub use errors::{ConfigError, FetchError, HardwareError, LedgerError, LedgerResult};
pub use frp::{AsyncResult, AsyncSignal, Signal};
pub use ledger::{Ledger, LedgerHash, MemoryLedger};
pub use service::{LivingPowerClient, LivingPowerStore, ServiceError, ServiceResult};
