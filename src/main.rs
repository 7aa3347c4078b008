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

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, info};

use rpigpiomon::cli::Cli;
use rpigpiomon::config::{config_path, ConfigTree};
use rpigpiomon::identity::read_device_identity;
use rpigpiomon::logger::init_logging;
use rpigpiomon::reader::ProcessReader;
use rpigpiomon::report::{self, RunOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = init_logging(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let path = config_path(cli.config.as_deref());
    let tree = ConfigTree::load(&path)
        .with_context(|| format!("failed to load sensor configuration {}", path.display()))?;
    info!(config = %path.display(), sensors = tree.len(), "configuration loaded");

    let identity = read_device_identity(&cli.serial_path);
    debug!(identity = ?identity, "device identity");

    let reader = ProcessReader::new(cli.gpio_command.clone(), cli.read_timeout());
    let options = RunOptions {
        mode: cli.mode(),
        jobs: usize::from(cli.jobs),
        identity_path: &cli.serial_path,
    };
    let out = report::run(&tree, identity.as_deref(), &reader, &options).await;

    let mut stdout = io::stdout().lock();
    stdout.write_all(out.as_bytes()).context("writing report")?;
    stdout.flush().context("writing report")?;
    Ok(())
}
