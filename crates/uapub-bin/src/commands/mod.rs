// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `validate`: Validate settings and published nodes files
//! - `browse`: Browse an address space snapshot
//! - `expand`: Expand published nodes against an address space snapshot
//! - `version`: Show version information

mod browse;
mod expand;
mod validate;
mod version;

pub use browse::browse;
pub use expand::expand;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.command.clone() {
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Browse(args) => browse::browse(&cli, args).await,
        Commands::Expand(args) => expand::expand(&cli, args).await,
        Commands::Version => version::version(&cli),
    }
}

/// Writes `value` to stdout in the requested structured format.
pub(crate) fn print_structured<T: serde::Serialize>(
    value: &T,
    format: crate::cli::OutputFormat,
) -> BinResult<()> {
    match format {
        crate::cli::OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
