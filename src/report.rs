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

//! Report rendering.
//!
//! Two renderers share one set of [`ValidationResult`]s:
//!
//! - diagnostic: every sensor, every failing rule, a closing verdict line;
//! - extend: for each reportable sensor a metadata line
//!   `name_identity,type,description,lowlimit,lowwarnlimit,warnlimit,highlimit;`
//!   followed by `value,generic,label;` per state, then the raw value line.

use std::fmt::Write as _;
use std::path::Path;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::ConfigTree;
use crate::identity::SERIAL_NUMBER_PATH;
use crate::reader::ValueReader;
use crate::sensor::{LimitKind, SensorRecord, Setting};
use crate::validate::{validate_with, ReadPolicy, ValidationResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Human-readable narration of every rule.
    Diagnostic,
    /// Machine records for the SNMP `extend` mechanism.
    Report,
}

/// Knobs of a single sampling run.
#[derive(Debug, Clone)]
pub struct RunOptions<'a> {
    pub mode: Mode,
    /// Concurrent reads; 1 keeps reads strictly sequential.
    pub jobs: usize,
    /// Shown in the missing-identity warning.
    pub identity_path: &'a Path,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self { mode: Mode::Report, jobs: 1, identity_path: Path::new(SERIAL_NUMBER_PATH) }
    }
}

/// Sample every configured sensor once and render the report for `mode`.
pub async fn run<R: ValueReader>(
    tree: &ConfigTree,
    identity: Option<&str>,
    reader: &R,
    options: &RunOptions<'_>,
) -> String {
    let records: Vec<SensorRecord> = tree
        .sections()
        .map(|(name, section)| SensorRecord::from_section(name, section))
        .collect();

    match options.mode {
        Mode::Diagnostic => {
            let results =
                validate_all(&records, reader, ReadPolicy::SourceUsable, options.jobs).await;
            render_diagnostic(identity, options.identity_path, &results)
        }
        Mode::Report => {
            let Some(identity) = identity else {
                warn!(
                    sensors = records.len(),
                    "device identity unavailable, suppressing all sensor output"
                );
                return String::new();
            };
            let results =
                validate_all(&records, reader, ReadPolicy::ConfigValid, options.jobs).await;
            let out = render_extend(identity, records.iter().zip(&results));
            info!(
                sensors = records.len(),
                reported = results.iter().filter(|r| r.passed()).count(),
                "report rendered"
            );
            out
        }
    }
}

/// Validate all records, at most `jobs` at a time, returning results in
/// declaration order regardless of completion order.
pub async fn validate_all<R: ValueReader>(
    records: &[SensorRecord],
    reader: &R,
    policy: ReadPolicy,
    jobs: usize,
) -> Vec<ValidationResult> {
    stream::iter(records)
        .map(|record| validate_with(record, reader, policy))
        .buffered(jobs.max(1))
        .collect()
        .await
}

pub fn render_diagnostic(
    identity: Option<&str>,
    identity_path: &Path,
    results: &[ValidationResult],
) -> String {
    let mut out = String::new();
    if identity.is_none() {
        let _ = writeln!(
            out,
            "The serial number of your device could not be read. Please check if you are using \
             a DT enabled kernel and the file {} is present.",
            identity_path.display()
        );
        let _ = writeln!(
            out,
            "The serial number is required for creating a state sensor so that no sensor with \
             the same name from another device overwrites it."
        );
    }

    for result in results {
        for line in result.messages() {
            let _ = writeln!(out, "{line}");
        }
        if result.passed() {
            let _ = writeln!(out, "The sensor {} is configured correctly.", result.name);
        } else {
            let _ = writeln!(out, "Please check your configuration for sensor {}.", result.name);
        }
        out.push('\n');
    }
    out
}

pub fn render_extend<'a, I>(identity: &str, sensors: I) -> String
where
    I: IntoIterator<Item = (&'a SensorRecord, &'a ValidationResult)>,
{
    let mut out = String::new();
    for (record, result) in sensors {
        let value = match result.reading.as_deref() {
            Some(value) if result.passed() => value,
            _ => {
                debug!(sensor = %record.name, "sensor excluded from report");
                continue;
            }
        };
        out.push_str(&metadata_line(record, identity));
        out.push('\n');
        out.push_str(value);
        out.push('\n');
    }
    out
}

fn field(setting: Option<&Setting>) -> &str {
    setting.map(Setting::render).unwrap_or("")
}

/// Metadata and state legend of one sensor, without the line break.
///
/// Legend entries are written for every state, including entries the
/// validator skipped; their missing parts render empty.
pub fn metadata_line(record: &SensorRecord, identity: &str) -> String {
    let mut line = format!(
        "{}_{},{},{}",
        record.name,
        identity,
        field(record.sensor_type.as_ref()),
        field(record.description.as_ref()),
    );
    for kind in LimitKind::ALL {
        line.push(',');
        line.push_str(field(record.limits.get(kind)));
    }
    line.push(';');

    for entry in record.state_entries() {
        let _ = write!(
            line,
            "{},{},{};",
            field(entry.value.as_ref()),
            field(entry.generic.as_ref()),
            entry.label
        );
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ValueSource;
    use crate::test_utils::test_utils::{record_from_ini, FixedReader};
    use std::time::Duration;

    const IDENTITY: &str = "AB12CD34EF56GH78";

    fn report_options() -> RunOptions<'static> {
        RunOptions::default()
    }

    fn diagnostic_options() -> RunOptions<'static> {
        RunOptions { mode: Mode::Diagnostic, ..RunOptions::default() }
    }

    #[tokio::test]
    async fn test_end_to_end_report() {
        let tree = ConfigTree::parse(
            "[cpu_temp]\ntype=temperature\ndescription=CPU\nio_gpio_pin=4\n",
        )
        .unwrap();
        let reader = FixedReader::new().with(ValueSource::GpioPin(4), "45.2");

        let out = run(&tree, Some(IDENTITY), &reader, &report_options()).await;
        assert_eq!(out, "cpu_temp_AB12CD34EF56GH78,temperature,CPU,,,,;\n45.2\n");
    }

    #[tokio::test]
    async fn test_state_sensor_legend() {
        let tree = ConfigTree::parse(
            "[door]\ntype = state\ndescription = Door\nio_gpio_pin = 7\n\
             states.ok.value = 0\nstates.ok.generic = 1\n",
        )
        .unwrap();
        let reader = FixedReader::new().with(ValueSource::GpioPin(7), "0");

        let out = run(&tree, Some(IDENTITY), &reader, &report_options()).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(";0,1,ok;"));
        assert_eq!(lines[1], "0");
    }

    #[test]
    fn test_metadata_line_limits_and_partial_states() {
        let record = record_from_ini(
            "[psu]\ntype = state\ndescription = PSU\nlowlimit = 1\nhighlimit = 3\n\
             states.good.value = 1\nstates.good.generic = 0\nstates.odd.value = 5\n",
            "psu",
        );
        assert_eq!(
            metadata_line(&record, "ID"),
            "psu_ID,state,PSU,1,,,3;1,0,good;5,,odd;"
        );
    }

    #[tokio::test]
    async fn test_missing_identity_suppresses_report() {
        let tree = ConfigTree::parse("[a]\ntype=load\ndescription=A\nio_gpio_pin=1\n").unwrap();
        let reader = FixedReader::new().with(ValueSource::GpioPin(1), "3");

        assert_eq!(run(&tree, None, &reader, &report_options()).await, "");

        let diagnostic = run(&tree, None, &reader, &diagnostic_options()).await;
        assert!(diagnostic.starts_with("The serial number of your device could not be read."));
        assert!(diagnostic.contains("/proc/device-tree/serial-number"));
        assert!(diagnostic.contains("The sensor a is configured correctly."));
    }

    #[tokio::test]
    async fn test_invalid_sensors_excluded_from_report() {
        let tree = ConfigTree::parse(
            "[good]\ntype=load\ndescription=G\nio_gpio_pin=1\n\
             [bad_type]\ntype=nope\ndescription=B\nio_gpio_pin=2\n\
             [bad_read]\ntype=load\ndescription=R\nio_gpio_pin=3\n\
             [no_source]\ntype=load\ndescription=N\n",
        )
        .unwrap();
        let reader = FixedReader::new()
            .with(ValueSource::GpioPin(1), "1")
            .with(ValueSource::GpioPin(2), "2")
            .with(ValueSource::GpioPin(3), "error");

        let out = run(&tree, Some("ID"), &reader, &report_options()).await;
        assert_eq!(out, "good_ID,load,G,,,,;\n1\n");
    }

    #[tokio::test]
    async fn test_report_never_reads_misconfigured_sensor() {
        let tree = ConfigTree::parse(
            "[kettle]\ntype=teapot\ndescription=K\nio_gpio_pin=1\n\
             [cpu]\ntype=load\ndescription=C\nio_gpio_pin=2\n",
        )
        .unwrap();
        let reader = FixedReader::new()
            .with(ValueSource::GpioPin(1), "1")
            .with(ValueSource::GpioPin(2), "2");

        let out = run(&tree, Some("ID"), &reader, &report_options()).await;
        assert_eq!(out, "cpu_ID,load,C,,,,;\n2\n");
        assert_eq!(reader.reads(), vec![ValueSource::GpioPin(2)]);

        let diagnostic = run(&tree, Some("ID"), &reader, &diagnostic_options()).await;
        assert!(diagnostic.contains("Current sensor value for kettle: 1"));
        assert!(diagnostic.contains("Please check your configuration for sensor kettle."));
    }

    #[tokio::test]
    async fn test_verdict_identical_in_both_modes() {
        let tree = ConfigTree::parse(
            "[a]\ntype=load\ndescription=A\nio_gpio_pin=1\n\
             [b]\ntype=load\ndescription=0\nio_gpio_pin=2\n\
             [c]\ntype=percent\ndescription=C\nexternal_gpio_reader=/nonexistent\n\
             [d]\ntype=humidity\ndescription=D\nio_gpio_pin=4\nlowlimit=x\n\
             [e]\ntype=state\ndescription=E\nio_gpio_pin=5\nstates.s.value=1\nstates.s.generic=1\n",
        )
        .unwrap();
        let reader = FixedReader::new()
            .with(ValueSource::GpioPin(1), "1")
            .with(ValueSource::GpioPin(2), "2")
            .with(ValueSource::GpioPin(4), "4")
            .with(ValueSource::GpioPin(5), "1");

        let report = run(&tree, Some("ID"), &reader, &report_options()).await;
        let diagnostic = run(&tree, Some("ID"), &reader, &diagnostic_options()).await;

        for name in ["a", "b", "c", "d", "e"] {
            let reported = report.contains(&format!("{name}_ID,"));
            let correct = diagnostic.contains(&format!("The sensor {name} is configured correctly."));
            assert_eq!(reported, correct, "mode verdicts differ for {name}");
        }
        assert!(report.contains("a_ID,"));
        assert!(report.contains("e_ID,"));
        assert!(!report.contains("b_ID,"));
    }

    #[tokio::test]
    async fn test_diagnostic_narration() {
        let tree = ConfigTree::parse(
            "[ok]\ntype=load\ndescription=OK\nio_gpio_pin=1\n[broken]\ntype=load\n",
        )
        .unwrap();
        let reader = FixedReader::new().with(ValueSource::GpioPin(1), "0.5");

        let out = run(&tree, Some("ID"), &reader, &diagnostic_options()).await;
        assert_eq!(
            out,
            "Current sensor value for ok: 0.5\n\
             The sensor ok is configured correctly.\n\
             \n\
             No valid description is configured for sensor broken!\n\
             No IO GPIO pin or external GPIO readout program is configured for sensor broken!\n\
             Please check your configuration for sensor broken.\n\
             \n"
        );
    }

    #[tokio::test]
    async fn test_concurrent_reads_keep_declared_order() {
        let tree = ConfigTree::parse(
            "[slow]\ntype=load\ndescription=S\nio_gpio_pin=1\n\
             [medium]\ntype=load\ndescription=M\nio_gpio_pin=2\n\
             [fast]\ntype=load\ndescription=F\nio_gpio_pin=3\n",
        )
        .unwrap();
        let reader = FixedReader::new()
            .delayed(ValueSource::GpioPin(1), "1", Duration::from_millis(120))
            .delayed(ValueSource::GpioPin(2), "2", Duration::from_millis(60))
            .with(ValueSource::GpioPin(3), "3");

        let options = RunOptions { jobs: 3, ..RunOptions::default() };
        let out = run(&tree, Some("ID"), &reader, &options).await;
        assert_eq!(
            out,
            "slow_ID,load,S,,,,;\n1\nmedium_ID,load,M,,,,;\n2\nfast_ID,load,F,,,,;\n3\n"
        );
    }

    #[tokio::test]
    async fn test_empty_config_renders_nothing() {
        let tree = ConfigTree::default();
        let reader = FixedReader::new();
        assert_eq!(run(&tree, Some("ID"), &reader, &report_options()).await, "");
        assert_eq!(run(&tree, Some("ID"), &reader, &diagnostic_options()).await, "");
    }
}
