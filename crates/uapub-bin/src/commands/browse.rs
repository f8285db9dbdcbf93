// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `browse` command.

use futures::StreamExt;
use tracing::{info, warn};
use uapub_nodes::{
    BrowseFirstRequest, BrowseNextRequest, BrowseStreamChunk, BrowseStreamRequest, NodeClass,
    NodeModel, NodeReferenceModel, NodeServicesApi,
};

use crate::cli::{BrowseArgs, Cli, OutputFormat};
use crate::commands::print_structured;
use crate::error::{BinError, BinResult};
use crate::runtime::RuntimeBuilder;

/// Executes the `browse` command.
pub async fn browse(cli: &Cli, args: BrowseArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .settings_path(cli.config.as_ref())
        .address_space(&args.address_space)
        .build()?;
    let listener = runtime.shutdown().cancel_on_signal();
    let cancel = runtime.cancel_token();

    let node_class_filter = (!args.node_class.is_empty())
        .then(|| args.node_class.iter().copied().map(NodeClass::from).collect::<Vec<_>>());

    let result = if args.recursive {
        let request = BrowseStreamRequest {
            node_ids: args.node_id.clone().map(|id| vec![id]),
            direction: Some(args.direction.into()),
            reference_type_id: args.reference_type.clone(),
            node_class_filter,
            read_variable_values: Some(args.values),
            ..Default::default()
        };
        let chunks: Vec<BrowseStreamChunk> = runtime
            .services()
            .browse_stream(runtime.connection(), request, &cancel)
            .collect()
            .await;
        info!(chunks = chunks.len(), "Browse stream complete");
        print_chunks(&chunks, args.format)
    } else {
        let request = BrowseFirstRequest {
            node_id: args.node_id.clone(),
            direction: Some(args.direction.into()),
            reference_type_id: args.reference_type.clone(),
            node_class_filter,
            read_variable_values: Some(args.values),
            max_references_to_return: args.max_references,
            ..Default::default()
        };
        let services = runtime.services();
        let first = services
            .browse_first(runtime.connection(), request, &cancel)
            .await?;
        if let Some(error) = &first.error_info {
            return Err(BinError::runtime(format!("Browse failed: {}", error)));
        }

        let mut references = first.references.clone().unwrap_or_default();
        let mut token = first.continuation_token.clone();
        let mut pages = 1;
        while let Some(continuation_token) = token.take() {
            let next = services
                .browse_next(
                    runtime.connection(),
                    BrowseNextRequest {
                        continuation_token: Some(continuation_token),
                        read_variable_values: Some(args.values),
                        ..Default::default()
                    },
                    &cancel,
                )
                .await?;
            if let Some(error) = next.error_info {
                warn!(pages, "Browse next failed: {}", error);
                break;
            }
            references.extend(next.references.unwrap_or_default());
            token = next.continuation_token;
            pages += 1;
        }
        info!(pages, references = references.len(), "Browse complete");
        print_references(&first.node, &references, args.format)
    };

    listener.abort();
    result
}

fn print_references(
    node: &NodeModel,
    references: &[NodeReferenceModel],
    format: OutputFormat,
) -> BinResult<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", describe(node));
            for reference in references {
                println!(
                    "  {} {}",
                    reference.reference_type_id.as_deref().unwrap_or("?"),
                    describe(&reference.target)
                );
            }
            Ok(())
        }
        format => print_structured(
            &serde_json::json!({ "node": node, "references": references }),
            format,
        ),
    }
}

fn print_chunks(chunks: &[BrowseStreamChunk], format: OutputFormat) -> BinResult<()> {
    match format {
        OutputFormat::Text => {
            for chunk in chunks {
                if let Some(error) = &chunk.error_info {
                    println!("{} ! {}", chunk.source_id, error);
                } else if let Some(reference) = &chunk.reference {
                    println!(
                        "{} -> {}",
                        chunk.source_id,
                        describe(&reference.target)
                    );
                } else if let Some(node) = &chunk.attributes {
                    println!("{}", describe(node));
                }
            }
            Ok(())
        }
        format => print_structured(&chunks, format),
    }
}

fn describe(node: &NodeModel) -> String {
    let mut text = node.node_id.clone();
    if let Some(class) = node.node_class {
        text.push_str(&format!(" [{}]", class));
    }
    if let Some(name) = node.display_name.as_deref().or(node.browse_name.as_deref()) {
        text.push_str(&format!(" {}", name));
    }
    if let Some(value) = &node.value {
        text.push_str(&format!(" = {}", value));
    }
    text
}
