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

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Device-tree serial number exposed by DT enabled kernels.
pub const SERIAL_NUMBER_PATH: &str = "/proc/device-tree/serial-number";

/// Number of leading bytes of the serial used as the device identity.
pub const IDENTITY_LEN: usize = 16;

/// Read the per-host identity appended to sensor names.
///
/// Only the first [`IDENTITY_LEN`] bytes are kept: the device-tree node carries
/// a trailing NUL and sometimes further noise. Anything after the cut is
/// dropped, nothing before it is cleaned. A missing, unreadable or empty file
/// yields `None`.
pub fn read_device_identity(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no device identity file");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read device identity");
            return None;
        }
    };

    let cut = &bytes[..bytes.len().min(IDENTITY_LEN)];
    if cut.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(cut).into_owned())
}
