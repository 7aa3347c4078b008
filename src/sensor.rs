/*
 * This file is part of rpigpiomon.
 *
 * Copyright (C) 2025 rpigpiomon contributors
 *
 * rpigpiomon is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rpigpiomon is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rpigpiomon. If not, see <https://www.gnu.org/licenses/>.
 */

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    static ref NUMERIC: Regex = Regex::new(
        r"^[ \t\n\r\x0B\x0C]*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?[ \t\n\r\x0B\x0C]*$"
    )
    .expect("numeric pattern compiles");
}

/// Decimal number test used for limits, state codes and live readings.
///
/// Accepts surrounding whitespace, a sign, a fraction and an exponent.
pub fn is_numeric(s: &str) -> bool {
    NUMERIC.is_match(s)
}

/// Sensor categories understood by the poller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SensorType {
    Airflow,
    Ber,
    Charge,
    ChromaticDispersion,
    Cooling,
    Count,
    Current,
    Dbm,
    Delay,
    Eer,
    Fanspeed,
    Frequency,
    Humidity,
    Load,
    Loss,
    Percent,
    Power,
    PowerConsumed,
    PowerFactor,
    Pressure,
    QualityFactor,
    Runtime,
    Signal,
    Snr,
    State,
    Temperature,
    TvSignal,
    Voltage,
    Waterflow,
}

impl SensorType {
    pub const ALL: [SensorType; 29] = [
        SensorType::Airflow,
        SensorType::Ber,
        SensorType::Charge,
        SensorType::ChromaticDispersion,
        SensorType::Cooling,
        SensorType::Count,
        SensorType::Current,
        SensorType::Dbm,
        SensorType::Delay,
        SensorType::Eer,
        SensorType::Fanspeed,
        SensorType::Frequency,
        SensorType::Humidity,
        SensorType::Load,
        SensorType::Loss,
        SensorType::Percent,
        SensorType::Power,
        SensorType::PowerConsumed,
        SensorType::PowerFactor,
        SensorType::Pressure,
        SensorType::QualityFactor,
        SensorType::Runtime,
        SensorType::Signal,
        SensorType::Snr,
        SensorType::State,
        SensorType::Temperature,
        SensorType::TvSignal,
        SensorType::Voltage,
        SensorType::Waterflow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorType::Airflow => "airflow",
            SensorType::Ber => "ber",
            SensorType::Charge => "charge",
            SensorType::ChromaticDispersion => "chromatic_dispersion",
            SensorType::Cooling => "cooling",
            SensorType::Count => "count",
            SensorType::Current => "current",
            SensorType::Dbm => "dbm",
            SensorType::Delay => "delay",
            SensorType::Eer => "eer",
            SensorType::Fanspeed => "fanspeed",
            SensorType::Frequency => "frequency",
            SensorType::Humidity => "humidity",
            SensorType::Load => "load",
            SensorType::Loss => "loss",
            SensorType::Percent => "percent",
            SensorType::Power => "power",
            SensorType::PowerConsumed => "power_consumed",
            SensorType::PowerFactor => "power_factor",
            SensorType::Pressure => "pressure",
            SensorType::QualityFactor => "quality_factor",
            SensorType::Runtime => "runtime",
            SensorType::Signal => "signal",
            SensorType::Snr => "snr",
            SensorType::State => "state",
            SensorType::Temperature => "temperature",
            SensorType::TvSignal => "tv_signal",
            SensorType::Voltage => "voltage",
            SensorType::Waterflow => "waterflow",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sensor type: {0}")]
pub struct UnknownSensorType(pub String);

impl FromStr for SensorType {
    type Err = UnknownSensorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSensorType(s.to_string()))
    }
}

/// A configured value as written.
///
/// Nested tables where a scalar is expected are kept so validation can reject them.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Text(String),
    Table(Map<String, Value>),
}

impl Setting {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Setting::Text(s.clone())),
            Value::Object(map) => Some(Setting::Table(map.clone())),
            other => Some(Setting::Text(other.to_string())),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Setting::Text(s) => Some(s),
            Setting::Table(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_text().is_some_and(is_numeric)
    }

    /// Text used in report fields; tables render empty.
    pub fn render(&self) -> &str {
        self.as_text().unwrap_or("")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LimitKind {
    Low,
    LowWarn,
    Warn,
    High,
}

impl LimitKind {
    /// Report field order.
    pub const ALL: [LimitKind; 4] = [LimitKind::Low, LimitKind::LowWarn, LimitKind::Warn, LimitKind::High];

    pub fn key(self) -> &'static str {
        match self {
            LimitKind::Low => "lowlimit",
            LimitKind::LowWarn => "lowwarnlimit",
            LimitKind::Warn => "warnlimit",
            LimitKind::High => "highlimit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limits {
    pub low: Option<Setting>,
    pub low_warn: Option<Setting>,
    pub warn: Option<Setting>,
    pub high: Option<Setting>,
}

impl Limits {
    pub fn get(&self, kind: LimitKind) -> Option<&Setting> {
        match kind {
            LimitKind::Low => self.low.as_ref(),
            LimitKind::LowWarn => self.low_warn.as_ref(),
            LimitKind::Warn => self.warn.as_ref(),
            LimitKind::High => self.high.as_ref(),
        }
    }
}

/// One discrete-state legend entry of a `state` sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub label: String,
    pub value: Option<Setting>,
    pub generic: Option<Setting>,
}

/// Where a sensor's live value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSource {
    GpioPin(u32),
    External(PathBuf),
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::GpioPin(pin) => write!(f, "GPIO pin {pin}"),
            ValueSource::External(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A sensor section with every known field pulled out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorRecord {
    pub name: String,
    pub sensor_type: Option<Setting>,
    pub description: Option<Setting>,
    pub limits: Limits,
    pub states: Option<Setting>,
    pub io_gpio_pin: Option<Setting>,
    pub external_gpio_reader: Option<Setting>,
}

impl SensorRecord {
    pub fn from_section(name: &str, section: &Map<String, Value>) -> Self {
        let field = |key: &str| section.get(key).and_then(Setting::from_value);
        SensorRecord {
            name: name.to_string(),
            sensor_type: field("type"),
            description: field("description"),
            limits: Limits {
                low: field(LimitKind::Low.key()),
                low_warn: field(LimitKind::LowWarn.key()),
                warn: field(LimitKind::Warn.key()),
                high: field(LimitKind::High.key()),
            },
            states: field("states"),
            io_gpio_pin: field("io_gpio_pin"),
            external_gpio_reader: field("external_gpio_reader"),
        }
    }

    /// Parsed type, `None` when absent or outside the known set.
    pub fn parsed_type(&self) -> Option<SensorType> {
        self.sensor_type.as_ref()?.as_text()?.parse().ok()
    }

    /// Legend entries in declaration order. A scalar `states` has none.
    pub fn state_entries(&self) -> Vec<StateEntry> {
        let Some(Setting::Table(states)) = &self.states else {
            return Vec::new();
        };
        states
            .iter()
            .map(|(label, entry)| {
                let (value, generic) = match entry {
                    Value::Object(fields) => (
                        fields.get("value").and_then(Setting::from_value),
                        fields.get("generic").and_then(Setting::from_value),
                    ),
                    _ => (None, None),
                };
                StateEntry { label: label.clone(), value, generic }
            })
            .collect()
    }

    /// Pin number when `io_gpio_pin` holds a non-negative integer.
    pub fn gpio_pin(&self) -> Option<u32> {
        self.io_gpio_pin.as_ref()?.as_text()?.trim().parse().ok()
    }

    pub fn external_reader_path(&self) -> Option<PathBuf> {
        self.external_gpio_reader
            .as_ref()
            .and_then(Setting::as_text)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}
