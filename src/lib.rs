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

//! rpigpiomon - GPIO sensor poller for SNMP `extend`
//!
//! Reads a sectioned sensor configuration, samples every sensor once through
//! `gpio read <pin>` or a user supplied readout program, and prints either a
//! narrated diagnostic or the two-line-per-sensor record a monitoring poller
//! consumes.

pub mod cli;
pub mod config;
pub mod identity;
pub mod logger;
pub mod reader;
pub mod report;
pub mod sensor;
pub mod validate;

#[cfg(test)]
pub mod test_utils;
