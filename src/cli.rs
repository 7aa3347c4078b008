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

//! Command Line Interface

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::identity::SERIAL_NUMBER_PATH;
use crate::reader::DEFAULT_GPIO_COMMAND;
use crate::report::Mode;

#[derive(Parser, Debug)]
#[command(name = "rpigpiomon")]
#[command(version)]
#[command(about = "GPIO sensor readout for the SNMP extend mechanism")]
#[command(long_about = "rpigpiomon - GPIO sensor readout for the SNMP extend mechanism

Reads every sensor declared in the configuration file once, through the
wiringpi `gpio` utility or an external readout program, and prints the
results in the line format expected by the `extend` directive of snmpd.

EXAMPLES:
    rpigpiomon                         Print the SNMP extend report
    rpigpiomon -validate               Explain the configuration of every sensor
    rpigpiomon -c ./sensors.ini -j 4   Use another file and read 4 sensors at once

ENVIRONMENT VARIABLES:
    RPIGPIOMON_CONFIG=<path>   Configuration file when --config is not given
    RUST_LOG=debug             Override --log-level

FILES:
    /etc/rpigpiomon/rpigpiomonitor.ini   System configuration
    /proc/device-tree/serial-number      Device identity")]
pub struct Cli {
    /// Narrate the configuration and the live reading of every sensor
    #[arg(long)]
    pub validate: bool,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File holding the device serial number
    #[arg(long, value_name = "PATH", default_value = SERIAL_NUMBER_PATH)]
    pub serial_path: PathBuf,

    /// Program used for GPIO reads, invoked as `<program> read <pin>`
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_GPIO_COMMAND)]
    pub gpio_command: String,

    /// Seconds a single sensor read may take before it is killed
    #[arg(long, value_name = "SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Number of sensors read concurrently
    #[arg(short, long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,

    /// Log filter for stderr (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Also append JSON log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parse the process arguments, accepting the single-dash `-validate`.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn mode(&self) -> Mode {
        if self.validate {
            Mode::Diagnostic
        } else {
            Mode::Report
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rewrite the legacy `-validate` spelling to `--validate`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| if arg == "-validate" { OsString::from("--validate") } else { arg })
        .collect()
}
