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

//! Live sensor reads.
//!
//! Every read spawns exactly one process: `gpio read <pin>` for GPIO sensors
//! or the configured readout program. The read is bounded by a timeout and the
//! child is killed when the bound expires.

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::sensor::{is_numeric, ValueSource};

pub const DEFAULT_GPIO_COMMAND: &str = "gpio";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    #[error("Output is not numeric: {0:?}")]
    NotNumeric(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Produces the raw value of a sensor.
#[allow(async_fn_in_trait)]
pub trait ValueReader {
    async fn read(&self, source: &ValueSource) -> Result<String, ReadError>;
}

/// Pick the candidate value out of captured output.
///
/// The last line wins, with trailing whitespace removed; it is returned
/// verbatim when numeric.
pub fn parse_reading(output: &str) -> Result<String, ReadError> {
    let last = output.trim_end().lines().last().unwrap_or("").trim_end();
    if is_numeric(last) {
        Ok(last.to_string())
    } else {
        Err(ReadError::NotNumeric(last.to_string()))
    }
}

/// Reads sensors by spawning processes.
#[derive(Debug, Clone)]
pub struct ProcessReader {
    gpio_command: String,
    timeout: Duration,
}

impl Default for ProcessReader {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_COMMAND, DEFAULT_READ_TIMEOUT)
    }
}

impl ProcessReader {
    pub fn new(gpio_command: impl Into<String>, timeout: Duration) -> Self {
        Self { gpio_command: gpio_command.into(), timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, source: &ValueSource) -> (Command, String) {
        match source {
            ValueSource::GpioPin(pin) => {
                let mut cmd = Command::new(&self.gpio_command);
                cmd.arg("read").arg(pin.to_string());
                (cmd, format!("{} read {}", self.gpio_command, pin))
            }
            ValueSource::External(path) => (Command::new(path), path.display().to_string()),
        }
    }
}

impl ValueReader for ProcessReader {
    async fn read(&self, source: &ValueSource) -> Result<String, ReadError> {
        let (mut cmd, program) = self.command(source);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| ReadError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_elapsed) => {
                warn!(%program, timeout_s = self.timeout.as_secs(), "sensor read timed out, child killed");
                return Err(ReadError::Timeout { program, timeout: self.timeout });
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let text = String::from_utf8_lossy(&combined);
        debug!(
            %program,
            status = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sensor read finished"
        );
        parse_reading(&text)
    }
}
