//! Ambient environment readings (temperature, humidity, pressure).
//!
//! Readings come from an external sensor source, typically an M5Stack ENV
//! unit speaking JSON lines over serial. Device discovery and the serial
//! port itself live outside the crate; this module parses payloads and
//! substitutes the last-known reading when the sensor is absent, marking the
//! record synthetic.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE_C: f64 = 25.0;
pub const DEFAULT_HUMIDITY_PCT: f64 = 50.0;
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.25;

/// One environment reading attached to a feature record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnvReading {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub timestamp: DateTime<Utc>,
    /// True when the values are carried forward or defaulted rather than
    /// freshly measured.
    pub synthetic: bool,
}

/// Raw sensor triple before it is stamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSample {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Deserialize)]
struct SensorPayload {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

/// Parse one JSON line from the sensor. Malformed lines yield `None`;
/// partial serial reads are expected and not an error.
pub fn parse_sensor_line(line: &str) -> Option<EnvSample> {
    match serde_json::from_str::<SensorPayload>(line.trim()) {
        Ok(payload) => Some(EnvSample {
            temperature: payload.temp,
            humidity: payload.humidity,
            pressure: payload.pressure,
        }),
        Err(err) => {
            debug!("discarding sensor line: {err}");
            None
        }
    }
}

/// Provider of fresh sensor samples. `None` means no sample is available
/// right now (device absent, nothing buffered).
pub trait EnvironmentSource {
    fn latest(&mut self) -> Option<EnvSample>;
}

/// Source used when no sensor is attached.
#[derive(Debug, Default)]
pub struct NoSensor;

impl EnvironmentSource for NoSensor {
    fn latest(&mut self) -> Option<EnvSample> {
        None
    }
}

/// Wraps a source with last-known-value fallback.
pub struct EnvironmentMonitor<S> {
    source: S,
    last: EnvSample,
}

impl<S: EnvironmentSource> EnvironmentMonitor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last: EnvSample {
                temperature: DEFAULT_TEMPERATURE_C,
                humidity: DEFAULT_HUMIDITY_PCT,
                pressure: DEFAULT_PRESSURE_HPA,
            },
        }
    }

    /// Current reading. Never fails: falls back to the last-known (or
    /// default) sample with `synthetic` set.
    pub fn reading(&mut self, now: DateTime<Utc>) -> EnvReading {
        match self.source.latest() {
            Some(sample) => {
                self.last = sample;
                EnvReading {
                    temperature: sample.temperature,
                    humidity: sample.humidity,
                    pressure: sample.pressure,
                    timestamp: now,
                    synthetic: false,
                }
            }
            None => EnvReading {
                temperature: self.last.temperature,
                humidity: self.last.humidity,
                pressure: self.last.pressure,
                timestamp: now,
                synthetic: true,
            },
        }
    }
}
