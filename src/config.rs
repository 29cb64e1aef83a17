// Copyright (c) 2025 - Cowboy AI, Inc.
//! Store configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Refresh and poll cadences of the store's signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Refetch cadence of link and collection signals while watched
    pub links_refresh_interval: Duration,
    /// Poll cadence of the connected-devices probe
    pub connected_devices_interval: Duration,
    /// Poll cadence of the removable-media probe
    pub removable_media_interval: Duration,
    /// Poll cadence of each connected device's last sample
    pub last_sample_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            links_refresh_interval: Duration::from_millis(4000),
            connected_devices_interval: Duration::from_millis(1000),
            removable_media_interval: Duration::from_millis(1000),
            last_sample_interval: Duration::from_millis(3000),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their default; set ones must be a whole number of
    /// milliseconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value,
                    }),
            }
        };

        Ok(Self {
            links_refresh_interval: millis("LEDGER_LINKS_REFRESH_MS", defaults.links_refresh_interval)?,
            connected_devices_interval: millis("LEDGER_DEVICES_POLL_MS", defaults.connected_devices_interval)?,
            removable_media_interval: millis("LEDGER_MEDIA_POLL_MS", defaults.removable_media_interval)?,
            last_sample_interval: millis("LEDGER_SAMPLE_POLL_MS", defaults.last_sample_interval)?,
        })
    }
}
