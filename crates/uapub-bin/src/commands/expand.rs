// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `expand` command.

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};
use uapub_config::{load_published_nodes, save_published_nodes};
use uapub_nodes::{
    ConfigurationServicesApi, PublishedNodeExpansion, PublishedNodesEntry, ServiceResult,
};

use crate::cli::{Cli, ExpandArgs, OutputFormat};
use crate::commands::print_structured;
use crate::error::{BinError, BinResult};
use crate::runtime::RuntimeBuilder;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Failure {
    entry: usize,
    writer_id: Option<String>,
    error: ServiceResult,
}

/// Executes the `expand` command.
pub async fn expand(cli: &Cli, args: ExpandArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .settings_path(cli.config.as_ref())
        .address_space(&args.address_space)
        .build()?;
    let entries = load_published_nodes(&args.published_nodes)?;
    let options = apply_flags(runtime.expansion_defaults(), &args);
    let listener = runtime.shutdown().cancel_on_signal();
    let cancel = runtime.cancel_token();
    let configuration = runtime.configuration();

    let mut expanded: Vec<PublishedNodesEntry> = Vec::new();
    let mut failures: Vec<Failure> = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let mut results = configuration
            .create_or_update(runtime.connection(), entry, options.clone(), &cancel)
            .map_err(|e| BinError::from(e).with_context(format!("Entry {}", index)))?;

        while let Some(response) = results.next().await {
            match (response.result, response.error_info) {
                (Some(result), None) => expanded.push(result),
                (result, Some(error)) => {
                    warn!(entry = index, "Expansion error: {}", error);
                    failures.push(Failure {
                        entry: index,
                        writer_id: result.and_then(|r| r.data_set_writer_id),
                        error,
                    });
                }
                (None, None) => {}
            }
        }
    }
    listener.abort();

    if cancel.is_cancelled() {
        return Err(BinError::runtime("Expansion cancelled"));
    }
    info!(
        writers = expanded.len(),
        stored = configuration.published_nodes().len(),
        failures = failures.len(),
        "Expansion complete"
    );

    if let Some(path) = &args.output {
        save_published_nodes(path, &expanded)?;
        info!("Wrote {} entries to {}", expanded.len(), path.display());
    }

    match args.format {
        OutputFormat::Text => {
            for entry in &expanded {
                println!(
                    "{}/{} ({} nodes)",
                    entry.group(),
                    entry.writer_id(),
                    entry.node_count()
                );
                for node in entry.opc_nodes.iter().flatten() {
                    println!(
                        "  {} {}",
                        node.data_set_field_id.as_deref().unwrap_or("-"),
                        node.id.as_deref().unwrap_or("-")
                    );
                }
            }
            for failure in &failures {
                println!(
                    "! entry {} {}: {}",
                    failure.entry,
                    failure.writer_id.as_deref().unwrap_or(""),
                    failure.error
                );
            }
        }
        format => print_structured(
            &serde_json::json!({ "entries": expanded, "failures": failures }),
            format,
        )?,
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(BinError::expansion(format!(
            "{} node(s) could not be expanded",
            failures.len()
        )))
    }
}

/// Overlays command line flags on the settings defaults.
fn apply_flags(mut options: PublishedNodeExpansion, args: &ExpandArgs) -> PublishedNodeExpansion {
    if let Some(depth) = args.max_depth {
        options.max_depth = depth;
    }
    if let Some(levels) = args.max_levels_to_expand {
        options.max_levels_to_expand = levels;
    }
    options.create_single_writer |= args.single_writer;
    options.flatten_type_instance |= args.flatten;
    options.stop_at_first_found_instance |= args.stop_at_first;
    options.no_sub_types_of_type_nodes |= args.no_subtypes;
    options.exclude_root_if_instance_node |= args.exclude_root;
    options.discard_errors |= args.discard_errors;
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_overlay_defaults() {
        let cli = crate::cli::Cli::parse_from([
            "uapub",
            "expand",
            "-a",
            "space.yaml",
            "-p",
            "pn.json",
            "--max-levels-to-expand",
            "3",
            "--flatten",
        ]);
        let crate::cli::Commands::Expand(args) = cli.command else {
            panic!("Expected Expand command");
        };

        let defaults = PublishedNodeExpansion {
            discard_errors: true,
            max_depth: 4,
            ..Default::default()
        };
        let options = apply_flags(defaults, &args);
        assert_eq!(options.max_depth, 4);
        assert_eq!(options.max_levels_to_expand, 3);
        assert!(options.flatten_type_instance);
        assert!(options.discard_errors);
        assert!(!options.create_single_writer);
    }
}
