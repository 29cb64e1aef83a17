// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-process hardware used by tests and the demo binary

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::csv::read_media_samples;
use super::{HardwareProbe, HardwareResult, SerialPortInfo};
use crate::domain::Measurement;
use crate::errors::HardwareError;
use crate::frp::lock;

#[derive(Default)]
struct Bench {
    ports: Vec<SerialPortInfo>,
    last_samples: HashMap<String, Measurement>,
    unreadable_ports: HashSet<String>,
    media: BTreeMap<String, PathBuf>,
    media_samples: HashMap<PathBuf, Vec<Measurement>>,
    calls: HashMap<&'static str, usize>,
}

/// Settable stand-in for serial ports and mounted media
#[derive(Default)]
pub struct SimulatedHardware {
    bench: Mutex<Bench>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device with `serial_number` on `port_name`
    pub fn connect(&self, port_name: &str, serial_number: &str) {
        let mut bench = lock(&self.bench);
        bench.ports.retain(|port| port.port_name != port_name);
        bench.ports.push(SerialPortInfo {
            port_name: port_name.to_string(),
            serial_number: Some(serial_number.to_string()),
        });
    }

    pub fn disconnect(&self, port_name: &str) {
        let mut bench = lock(&self.bench);
        bench.ports.retain(|port| port.port_name != port_name);
        bench.last_samples.remove(port_name);
    }

    /// Set the sample the device on `port_name` reports as its latest
    pub fn set_last_sample(&self, port_name: &str, sample: Measurement) {
        lock(&self.bench).last_samples.insert(port_name.to_string(), sample);
    }

    /// Make reads from `port_name` fail until cleared
    pub fn set_unreadable(&self, port_name: &str, unreadable: bool) {
        let mut bench = lock(&self.bench);
        if unreadable {
            bench.unreadable_ports.insert(port_name.to_string());
        } else {
            bench.unreadable_ports.remove(port_name);
        }
    }

    /// Mount media for `serial_number` holding `samples`
    pub fn insert_media(&self, serial_number: &str, path: impl Into<PathBuf>, samples: Vec<Measurement>) {
        let path = path.into();
        let mut bench = lock(&self.bench);
        bench.media.insert(serial_number.to_string(), path.clone());
        bench.media_samples.insert(path, samples);
    }

    /// Mount a real directory as media for `serial_number`
    ///
    /// Samples are read from the directory's data file on every probe.
    pub fn mount_media_dir(&self, serial_number: &str, path: impl Into<PathBuf>) {
        lock(&self.bench).media.insert(serial_number.to_string(), path.into());
    }

    pub fn eject_media(&self, serial_number: &str) {
        let mut bench = lock(&self.bench);
        if let Some(path) = bench.media.remove(serial_number) {
            bench.media_samples.remove(&path);
        }
    }

    /// Number of times `probe` has been called
    pub fn call_count(&self, probe: &str) -> usize {
        lock(&self.bench).calls.get(probe).copied().unwrap_or(0)
    }

    fn enter(&self, probe: &'static str) -> std::sync::MutexGuard<'_, Bench> {
        let mut bench = lock(&self.bench);
        *bench.calls.entry(probe).or_insert(0) += 1;
        bench
    }
}

#[async_trait]
impl HardwareProbe for SimulatedHardware {
    async fn list_connected_devices(&self) -> HardwareResult<Vec<SerialPortInfo>> {
        Ok(self.enter("list_connected_devices").ports.clone())
    }

    async fn read_last_sample(&self, port_name: &str) -> HardwareResult<Option<Measurement>> {
        let bench = self.enter("read_last_sample");
        if !bench.ports.iter().any(|port| port.port_name == port_name) {
            return Err(HardwareError::Disconnected(port_name.to_string()));
        }
        if bench.unreadable_ports.contains(port_name) {
            return Err(HardwareError::Io(format!("timed out reading {port_name}")));
        }
        Ok(bench.last_samples.get(port_name).copied())
    }

    async fn enumerate_removable_media(&self) -> HardwareResult<BTreeMap<String, PathBuf>> {
        Ok(self.enter("enumerate_removable_media").media.clone())
    }

    async fn read_all_samples_from_media(&self, path: &Path) -> HardwareResult<Vec<Measurement>> {
        let stored = self
            .enter("read_all_samples_from_media")
            .media_samples
            .get(path)
            .cloned();
        match stored {
            Some(samples) => Ok(samples),
            None => read_media_samples(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64) -> Measurement {
        Measurement {
            timestamp,
            temperature_millicelsius: 20_000,
            humidity_millipercent: 50_000,
            light_level_millilux: 10_000,
            voltage_millivolts: 400,
        }
    }

    #[tokio::test]
    async fn test_connected_device_reports_last_sample() {
        let hardware = SimulatedHardware::new();
        hardware.connect("/dev/ttyACM0", "A1");
        assert_eq!(hardware.read_last_sample("/dev/ttyACM0").await, Ok(None));

        hardware.set_last_sample("/dev/ttyACM0", sample(5));
        assert_eq!(hardware.read_last_sample("/dev/ttyACM0").await, Ok(Some(sample(5))));

        hardware.set_unreadable("/dev/ttyACM0", true);
        assert!(matches!(
            hardware.read_last_sample("/dev/ttyACM0").await,
            Err(HardwareError::Io(_))
        ));

        hardware.disconnect("/dev/ttyACM0");
        assert!(matches!(
            hardware.read_last_sample("/dev/ttyACM0").await,
            Err(HardwareError::Disconnected(_))
        ));
        assert_eq!(hardware.call_count("read_last_sample"), 4);
    }

    #[tokio::test]
    async fn test_media_round_trip() {
        let hardware = SimulatedHardware::new();
        hardware.insert_media("A1", "/media/A1", vec![sample(1), sample(2)]);

        let media = hardware.enumerate_removable_media().await.unwrap();
        let path = media.get("A1").unwrap();
        assert_eq!(hardware.read_all_samples_from_media(path).await.unwrap().len(), 2);

        hardware.eject_media("A1");
        assert!(hardware.enumerate_removable_media().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_dir_is_read_from_disk() {
        let dir = std::env::temp_dir().join(format!("bpv-media-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(crate::hardware::csv::DATA_FILE),
            "Date,Time,Temperature,Humidity,Light,Voltage\n\
             2024-05-01,12:00:00,21.5,40.2,1200,0.512\n",
        )
        .unwrap();

        let hardware = SimulatedHardware::new();
        hardware.mount_media_dir("A1", &dir);
        let media = hardware.enumerate_removable_media().await.unwrap();
        let samples = hardware.read_all_samples_from_media(&media["A1"]).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].voltage_millivolts, 512);

        std::fs::remove_dir_all(&dir).unwrap();
        let missing = hardware.read_all_samples_from_media(&media["A1"]).await;
        assert!(matches!(missing, Err(HardwareError::Io(_))));
    }
}
