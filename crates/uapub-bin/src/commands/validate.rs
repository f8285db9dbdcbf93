// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use serde::Serialize;
use uapub_config::{load_published_nodes, NodeServicesSettings};
use uapub_nodes::configuration::validate_nodes;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::commands::print_structured;
use crate::error::{BinError, BinResult};
use crate::runtime::load_settings;

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    settings_path: Option<String>,
    diagnostics_level: String,
    max_references_per_node: u32,
    operation_timeout: String,
    entries: Option<usize>,
    nodes: Option<usize>,
    warnings: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a NodeServicesSettings>,
}

/// Executes the `validate` command.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let settings = load_settings(cli.config.as_deref())?;

    let mut warnings: Vec<String> = Vec::new();
    if cli.config.is_none() {
        warnings.push("No settings file given, defaults in use".to_string());
    }

    let mut counts = None;
    if let Some(path) = &args.published_nodes {
        let entries = load_published_nodes(path)?;
        if entries.is_empty() {
            warnings.push(format!("No entries in {}", path.display()));
        }
        for (index, entry) in entries.iter().enumerate() {
            let mut nodes = entry.opc_nodes.clone().unwrap_or_default();
            if nodes.is_empty() {
                warnings.push(format!("Entry {} has no nodes", index));
                continue;
            }
            validate_nodes(&mut nodes).map_err(|e| {
                BinError::config(format!("Entry {} in {}: {}", index, path.display(), e))
            })?;
        }
        let nodes = entries.iter().map(|e| e.node_count()).sum::<usize>();
        counts = Some((entries.len(), nodes));
    }

    let timeout = format!("{:?}", settings.operation_timeout);
    match args.format {
        OutputFormat::Text => {
            match &cli.config {
                Some(path) => println!("✓ Settings are valid: {}", path.display()),
                None => println!("✓ Settings are valid (defaults)"),
            }
            println!();
            println!("Summary:");
            println!("  Diagnostics: {}", settings.diagnostics_level);
            println!("  Page size:   {}", settings.browse.max_references_per_node);
            println!("  Timeout:     {}", timeout);
            if let Some((entries, nodes)) = counts {
                println!("  Entries:     {}", entries);
                println!("  Nodes:       {}", nodes);
            }

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed settings:");
                println!("{}", serde_yaml::to_string(&settings)?);
            }
        }
        format => {
            let report = ValidationReport {
                valid: true,
                settings_path: cli.config.as_ref().map(|p| p.display().to_string()),
                diagnostics_level: settings.diagnostics_level.to_string(),
                max_references_per_node: settings.browse.max_references_per_node,
                operation_timeout: timeout,
                entries: counts.map(|(entries, _)| entries),
                nodes: counts.map(|(_, nodes)| nodes),
                warnings: &warnings,
                settings: args.show_config.then_some(&settings),
            };
            print_structured(&report, format)?;
        }
    }

    Ok(())
}
