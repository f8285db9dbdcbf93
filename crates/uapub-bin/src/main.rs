// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! uapub - OPC UA publisher node services
//!
//! Main binary entry point.

use uapub_bin::cli::{Cli, LogFormat};
use uapub_bin::commands::execute;
use uapub_bin::error::report_error_and_exit;
use uapub_bin::logging::init_logging;
use uapub_bin::runtime::load_settings;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Flags win over the settings file; a settings file that fails to load
    // is reported by the command itself.
    let logging = load_settings(cli.config.as_deref())
        .map(|settings| settings.logging)
        .unwrap_or_default();
    let level = cli
        .effective_log_level()
        .map(str::to_string)
        .unwrap_or_else(|| logging.level.to_string());
    let format = cli.log_format.unwrap_or_else(|| LogFormat::from(logging.format));
    init_logging(&level, format);

    if let Err(error) = execute(cli).await {
        report_error_and_exit(error);
    }
}
