// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sample file parsing
//!
//! Devices log one sample per line:
//!
//! ```text
//! Date,Time,Temperature,Humidity,Light,Voltage
//! 2024-05-01,12:00:00,21.5,40.2,1200.0,0.512
//! ```
//!
//! Channel values are decimal and stored in thousandths. Rows containing
//! `Date` are headers. Malformed rows are logged and skipped so one corrupt
//! write does not hide the rest of the file.

use std::path::Path;

use chrono::NaiveDateTime;
use tracing::warn;

use super::HardwareResult;
use crate::domain::Measurement;
use crate::errors::HardwareError;

/// File holding the samples on a device's media
pub const DATA_FILE: &str = "data.csv";

fn invalid(line: &str, reason: &str) -> HardwareError {
    HardwareError::InvalidLine(format!("{line:?}: {reason}"))
}

fn thousandths(line: &str, field: &str) -> HardwareResult<u32> {
    let value: f64 = field
        .parse()
        .map_err(|_| invalid(line, &format!("{field:?} is not a number")))?;
    if !value.is_finite() || value < 0.0 || value * 1000.0 > f64::from(u32::MAX) {
        return Err(invalid(line, &format!("{field:?} is out of range")));
    }
    Ok((value * 1000.0).round() as u32)
}

/// Parse one `YYYY-MM-DD,HH:MM:SS,temp,humidity,lux,volts` line
pub fn parse_sample_line(line: &str) -> HardwareResult<Measurement> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [date, time, temperature, humidity, light, voltage] = fields.as_slice() else {
        return Err(invalid(line, "expected 6 fields"));
    };

    let timestamp = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
        .map_err(|err| invalid(line, &err.to_string()))?
        .and_utc()
        .timestamp_micros();

    Ok(Measurement {
        timestamp,
        temperature_millicelsius: thousandths(line, temperature)?,
        humidity_millipercent: thousandths(line, humidity)?,
        light_level_millilux: thousandths(line, light)?,
        voltage_millivolts: thousandths(line, voltage)?,
    })
}

/// Parse a whole sample file, skipping headers and malformed lines
pub fn parse_samples(contents: &str) -> Vec<Measurement> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("Date"))
        .filter_map(|line| match parse_sample_line(line) {
            Ok(measurement) => Some(measurement),
            Err(err) => {
                warn!(error = %err, "skipping measurement line");
                None
            }
        })
        .collect()
}

/// Read every sample from the media mounted at `mount`
pub async fn read_media_samples(mount: &Path) -> HardwareResult<Vec<Measurement>> {
    let contents = tokio::fs::read_to_string(mount.join(DATA_FILE)).await?;
    Ok(parse_samples(&contents))
}
