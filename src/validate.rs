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

//! Sensor validation.
//!
//! One rule set decides whether a sensor is reportable. Both output modes use
//! the verdict of [`validate`]; the diagnostic mode additionally prints the
//! collected messages.

use tracing::debug;

use crate::reader::{ReadError, ValueReader};
use crate::sensor::{LimitKind, SensorRecord, Setting, ValueSource};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rule {
    Type,
    States,
    Description,
    Limit(LimitKind),
    ValueSource,
    Reading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub rule: Rule,
    pub message: String,
    pub hint: Option<String>,
}

impl Failure {
    fn new(rule: Rule, message: String) -> Self {
        Self { rule, message, hint: None }
    }

    fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }
}

/// Outcome of the configuration rules, before any process is spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCheck {
    pub failures: Vec<Failure>,
    /// Set when the value source is usable, whatever the other rules said.
    pub source: Option<ValueSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub name: String,
    pub source: Option<ValueSource>,
    pub failures: Vec<Failure>,
    pub reading: Option<String>,
}

impl ValidationResult {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.reading.is_some()
    }

    /// Narration for this sensor, in rule order.
    pub fn messages(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for failure in &self.failures {
            lines.push(failure.message.clone());
            if let Some(hint) = &failure.hint {
                lines.push(hint.clone());
            }
        }
        if let Some(value) = &self.reading {
            lines.push(format!("Current sensor value for {}: {}", self.name, value));
        }
        lines
    }
}

const GPIO_HINT: &str = "Please check if wiringpi is installed on this device!";
const EXTERNAL_HINT: &str = "Please check if the external GPIO program outputs pure numeric values \
and if the required access rights are available to execute this program.";
const MISSING_PROGRAM_HINT: &str = "Please check if the specified path is correct and the file exists.";

/// Apply every configuration rule. No rule short-circuits another.
pub fn check_config(record: &SensorRecord) -> ConfigCheck {
    let name = &record.name;
    let mut failures = Vec::new();

    if record.parsed_type().is_none() {
        failures.push(Failure::new(
            Rule::Type,
            format!("No valid type is configured for sensor {name}!"),
        ));
    }

    if record.states.is_some() && !states_valid(record) {
        failures.push(Failure::new(
            Rule::States,
            format!("No valid states are configured for sensor {name}!"),
        ));
    }

    if !description_valid(record.description.as_ref()) {
        failures.push(Failure::new(
            Rule::Description,
            format!("No valid description is configured for sensor {name}!"),
        ));
    }

    for kind in LimitKind::ALL {
        if let Some(limit) = record.limits.get(kind) {
            if !limit.is_numeric() {
                failures.push(Failure::new(
                    Rule::Limit(kind),
                    format!("No valid {} is configured for sensor {name}!", kind.key()),
                ));
            }
        }
    }

    let source = check_source(record, &mut failures);
    ConfigCheck { failures, source }
}

/// Entries lacking `value` or `generic` are skipped, not rejected.
fn states_valid(record: &SensorRecord) -> bool {
    if !matches!(record.states, Some(Setting::Table(_))) {
        return false;
    }
    record
        .state_entries()
        .iter()
        .filter_map(|entry| Some((entry.value.as_ref()?, entry.generic.as_ref()?)))
        .all(|(value, generic)| value.is_numeric() && generic.is_numeric())
}

/// A description must be non-empty text other than `"0"`. A nested table is
/// rejected as well, even a non-empty one.
fn description_valid(description: Option<&Setting>) -> bool {
    matches!(description, Some(Setting::Text(s)) if !s.is_empty() && s != "0")
}

fn check_source(record: &SensorRecord, failures: &mut Vec<Failure>) -> Option<ValueSource> {
    let name = &record.name;
    if record.io_gpio_pin.is_none() && record.external_gpio_reader.is_none() {
        failures.push(Failure::new(
            Rule::ValueSource,
            format!("No IO GPIO pin or external GPIO readout program is configured for sensor {name}!"),
        ));
        return None;
    }

    let mut usable = true;
    if record.io_gpio_pin.is_some() && record.gpio_pin().is_none() {
        failures.push(Failure::new(
            Rule::ValueSource,
            format!("No valid IO GPIO pin is configured for sensor {name}!"),
        ));
        usable = false;
    }

    if record.external_gpio_reader.is_some() {
        let found = record.external_reader_path().is_some_and(|p| p.exists());
        if !found {
            failures.push(
                Failure::new(
                    Rule::ValueSource,
                    format!("The external GPIO program for sensor {name} could not be found!"),
                )
                .with_hint(MISSING_PROGRAM_HINT),
            );
            usable = false;
        }
    }

    if !usable {
        return None;
    }
    record
        .gpio_pin()
        .map(ValueSource::GpioPin)
        .or_else(|| record.external_reader_path().map(ValueSource::External))
}

fn read_failure(name: &str, source: &ValueSource, err: &ReadError) -> Failure {
    let message = match err {
        ReadError::NotNumeric(_) => {
            format!("The current sensor value for {name} does not seem to be numeric!")
        }
        ReadError::Timeout { timeout, .. } => format!(
            "The readout for sensor {name} did not finish within {}s and was stopped!",
            timeout.as_secs()
        ),
        ReadError::Spawn { source: e, .. } => {
            format!("The readout for sensor {name} could not be started: {e}")
        }
        ReadError::Io(e) => format!("The readout for sensor {name} failed: {e}"),
    };
    let hint = match source {
        ValueSource::GpioPin(_) => GPIO_HINT,
        ValueSource::External(_) => EXTERNAL_HINT,
    };
    Failure::new(Rule::Reading, message).with_hint(hint)
}

/// Decides whether a sensor is read live after its configuration was checked.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Read whenever the value source is usable, so the value can be narrated.
    SourceUsable,
    /// Read only sensors whose configuration passed every rule.
    ConfigValid,
}

/// Run every rule against `record`, including a live read when the value
/// source is usable.
pub async fn validate<R: ValueReader>(record: &SensorRecord, reader: &R) -> ValidationResult {
    validate_with(record, reader, ReadPolicy::SourceUsable).await
}

/// Like [`validate`], with `policy` deciding whether the live read happens.
///
/// A skipped read leaves `reading` empty; the verdict is the same either way
/// since a configuration failure already fails the sensor.
pub async fn validate_with<R: ValueReader>(
    record: &SensorRecord,
    reader: &R,
    policy: ReadPolicy,
) -> ValidationResult {
    let ConfigCheck { mut failures, source } = check_config(record);

    let skip_read = policy == ReadPolicy::ConfigValid && !failures.is_empty();
    if skip_read {
        debug!(sensor = %record.name, "configuration invalid, read skipped");
    }

    let mut reading = None;
    if let Some(source) = source.as_ref().filter(|_| !skip_read) {
        match reader.read(source).await {
            Ok(value) => reading = Some(value),
            Err(err) => {
                debug!(sensor = %record.name, %source, error = %err, "sensor read failed");
                failures.push(read_failure(&record.name, source, &err));
            }
        }
    }

    let result = ValidationResult { name: record.name.clone(), source, failures, reading };
    debug!(
        sensor = %result.name,
        passed = result.passed(),
        failures = result.failures.len(),
        "sensor validated"
    );
    result
}
