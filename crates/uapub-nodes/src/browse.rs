// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse engine.
//!
//! Paged browsing of a single node and a lazy recursive walk over the
//! address space.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        browse_first / browse_next          browse_stream        │
//! │   (one page, opaque continuation token)   (depth-first walk)    │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          NodeReader                             │
//! │        (guarded Browse / BrowseNext / Read on the session)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Paging**: server continuation points travel as base64 tokens and are
//!   consumed exactly once
//! - **Target Snapshots**: every reference carries a model of its target,
//!   read from the server or (raw mode) taken from the reference
//! - **Target Deduplication**: `target_nodes_only` returns each target once
//!   without reference metadata
//! - **Streaming**: `browse_stream` yields node and reference chunks lazily
//!   and stops between chunks when the request is cancelled

use std::collections::HashSet;
use std::sync::Arc;

use async_stream::stream;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::client::{BrowseDescription, ReferenceDescription};
use crate::error::{BrowseError, OpcUaError, OpcUaResult, OperationError, RequestError};
use crate::models::{
    BrowseFirstRequest, BrowseFirstResponse, BrowseNextRequest, BrowseNextResponse,
    BrowseStreamChunk, BrowseStreamRequest, NodeModel, NodeReferenceModel,
};
use crate::reader::{NodeReadOptions, NodeReader};
use crate::status::StatusCode;
use crate::types::{reference_types, BrowseDirection, NodeClass, NodeId};

// =============================================================================
// Reference options
// =============================================================================

/// How references of a page are turned into models.
#[derive(Debug, Clone, Copy, Default)]
struct ReferenceOptions {
    target_nodes_only: bool,
    read_variable_values: bool,
    node_ids_only: bool,
}

impl From<&BrowseFirstRequest> for ReferenceOptions {
    fn from(request: &BrowseFirstRequest) -> Self {
        Self {
            target_nodes_only: request.target_nodes_only.unwrap_or(false),
            read_variable_values: request.read_variable_values.unwrap_or(false),
            node_ids_only: request.node_ids_only.unwrap_or(false),
        }
    }
}

impl From<&BrowseNextRequest> for ReferenceOptions {
    fn from(request: &BrowseNextRequest) -> Self {
        Self {
            target_nodes_only: request.target_nodes_only.unwrap_or(false),
            read_variable_values: request.read_variable_values.unwrap_or(false),
            node_ids_only: request.node_ids_only.unwrap_or(false),
        }
    }
}

/// Encodes a server continuation point as a token.
pub(crate) fn encode_token(continuation_point: &[u8]) -> String {
    BASE64.encode(continuation_point)
}

/// Decodes a token back into the server continuation point.
pub(crate) fn decode_token(token: &str) -> OpcUaResult<Vec<u8>> {
    BASE64
        .decode(token.trim())
        .map_err(|_| BrowseError::BadContinuationPoint.into())
}

// =============================================================================
// BrowseFirst / BrowseNext
// =============================================================================

/// Browses the first page of references of a node.
pub(crate) async fn browse_first(
    reader: &NodeReader,
    request: &BrowseFirstRequest,
) -> OpcUaResult<BrowseFirstResponse> {
    let root = reader.parse_node_id_or(request.node_id.as_deref(), NodeId::ROOT_FOLDER)?;
    let reference_type = match request.reference_type_id.as_deref() {
        Some(rt) if !rt.trim().is_empty() => reader.parse_reference_type(rt)?,
        _ => reference_types::HIERARCHICAL_REFERENCES,
    };
    let options = ReferenceOptions::from(request);
    let mask = NodeClass::mask(request.node_class_filter.as_deref().unwrap_or_default());
    let description = BrowseDescription::hierarchical(root.clone())
        .direction(request.direction.unwrap_or_default())
        .reference_type(reference_type, !request.no_subtypes.unwrap_or(false))
        .node_classes(mask);

    let skip_references = request.max_references_to_return == Some(0) && !options.node_ids_only;
    let mut response = BrowseFirstResponse::default();
    if !skip_references {
        let result = reader
            .browse(description, request.max_references_to_return.unwrap_or(0))
            .await?;
        if result.status_code.is_bad() {
            return Err(
                OperationError::bad_status(reader.format_node_id(&root), result.status_code).into(),
            );
        }
        response.continuation_token = result.continuation_point.as_deref().map(encode_token);
        response.references = Some(reference_models(reader, result.references, options).await?);
    }

    let children = match &response.references {
        Some(references) => !references.is_empty(),
        None => reader.has_children(&root).await?,
    };
    response.node = if options.node_ids_only {
        NodeModel {
            children: Some(children),
            ..NodeModel::with_id(reader.format_node_id(&root))
        }
    } else {
        reader
            .read_node(
                &root,
                NodeReadOptions {
                    read_value: options.read_variable_values,
                    children: Some(children),
                },
            )
            .await?
    };

    debug!(
        node_id = %response.node.node_id,
        references = response.references.as_ref().map_or(0, Vec::len),
        more = response.continuation_token.is_some(),
        "Browsed first page"
    );
    Ok(response)
}

/// Browses the next page of a previous browse, or releases it.
pub(crate) async fn browse_next(
    reader: &NodeReader,
    request: &BrowseNextRequest,
) -> OpcUaResult<BrowseNextResponse> {
    let token = request
        .continuation_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| RequestError::bad_request("Missing continuation token"))?;
    let continuation_point = decode_token(token)?;
    let abort = request.abort.unwrap_or(false);

    let result = reader.browse_next(abort, continuation_point).await?;
    if abort {
        debug!("Released browse continuation point");
        return Ok(BrowseNextResponse {
            references: Some(Vec::new()),
            ..Default::default()
        });
    }
    // the server forgets a point once its last page was returned
    if result.status_code == StatusCode::BAD_CONTINUATION_POINT_INVALID {
        debug!("Continuation point exhausted");
        return Ok(BrowseNextResponse {
            references: Some(Vec::new()),
            continuation_token: None,
            error_info: None,
        });
    }
    if result.status_code.is_bad() {
        return Err(OperationError::bad_status("BrowseNext", result.status_code).into());
    }

    let references = reference_models(reader, result.references, ReferenceOptions::from(request)).await?;
    Ok(BrowseNextResponse {
        references: Some(references),
        continuation_token: result.continuation_point.as_deref().map(encode_token),
        error_info: None,
    })
}

/// Turns the references of a page into models.
async fn reference_models(
    reader: &NodeReader,
    references: Vec<ReferenceDescription>,
    options: ReferenceOptions,
) -> OpcUaResult<Vec<NodeReferenceModel>> {
    let mut seen = HashSet::new();
    let mut models = Vec::with_capacity(references.len());
    for reference in references {
        let target_id = reader.format_expanded(&reference.node_id);
        if options.target_nodes_only && !seen.insert(target_id) {
            continue;
        }
        let target = target_model(reader, &reference, options).await?;
        let (reference_type_id, direction) = if options.target_nodes_only {
            (None, None)
        } else {
            let direction = if reference.is_forward {
                BrowseDirection::Forward
            } else {
                BrowseDirection::Backward
            };
            (
                Some(reader.format_node_id(&reference.reference_type_id)),
                Some(direction),
            )
        };
        models.push(NodeReferenceModel {
            reference_type_id,
            direction,
            target,
        });
    }
    Ok(models)
}

/// Reads the target of a reference; failures stay on the target.
async fn target_model(
    reader: &NodeReader,
    reference: &ReferenceDescription,
    options: ReferenceOptions,
) -> OpcUaResult<NodeModel> {
    let local = match reader.local_id(&reference.node_id) {
        Some(local) if !options.node_ids_only => local,
        _ => return Ok(reader.raw_node(reference)),
    };
    let read = async {
        let children = reader.has_children(&local).await?;
        reader
            .read_node(
                &local,
                NodeReadOptions {
                    read_value: options.read_variable_values,
                    children: Some(children),
                },
            )
            .await
    };
    match read.await {
        Ok(model) => Ok(model),
        Err(OpcUaError::Cancelled) => Err(OpcUaError::Cancelled),
        Err(error) => {
            warn!(node_id = %local, error = %error, "Failed to read browse target");
            Ok(NodeModel {
                error_info: Some(reader.fault(&error)),
                ..reader.raw_node(reference)
            })
        }
    }
}

// =============================================================================
// BrowseStream
// =============================================================================

/// Walks the address space depth-first from the start nodes.
///
/// Every visited node produces one attribute chunk followed by one chunk per
/// reference. Targets are visited once. `max_depth` of 0 is unlimited.
pub(crate) fn browse_stream(
    reader: NodeReader,
    request: BrowseStreamRequest,
    max_depth: usize,
) -> BoxStream<'static, BrowseStreamChunk> {
    let reader = Arc::new(reader);
    Box::pin(stream! {
        let starts = match start_nodes(&reader, &request) {
            Ok(starts) => starts,
            Err(error) => {
                yield BrowseStreamChunk {
                    source_id: request.node_ids.as_ref().map(|ids| ids.join(",")).unwrap_or_default(),
                    error_info: Some(reader.fault(&error)),
                    ..Default::default()
                };
                return;
            }
        };
        let reference_type = match request.reference_type_id.as_deref() {
            Some(rt) if !rt.trim().is_empty() => match reader.parse_reference_type(rt) {
                Ok(rt) => rt,
                Err(error) => {
                    yield BrowseStreamChunk {
                        source_id: rt.to_string(),
                        error_info: Some(reader.fault(&error)),
                        ..Default::default()
                    };
                    return;
                }
            },
            _ => reference_types::HIERARCHICAL_REFERENCES,
        };
        let no_recurse = request.no_recurse.unwrap_or(false);
        let read_value = request.read_variable_values.unwrap_or(false);
        let mask = NodeClass::mask(request.node_class_filter.as_deref().unwrap_or_default());
        let include_subtypes = !request.no_subtypes.unwrap_or(false);
        let direction = request.direction.unwrap_or(BrowseDirection::Both);

        let mut visited = HashSet::new();
        let mut stack: Vec<(NodeId, usize)> = starts.into_iter().rev().map(|id| (id, 0)).collect();
        let mut nodes = 0usize;
        while let Some((node_id, depth)) = stack.pop() {
            if reader.is_cancelled() {
                debug!("Browse stream cancelled");
                break;
            }
            if !visited.insert(node_id.clone()) {
                continue;
            }
            let source_id = reader.format_node_id(&node_id);

            let options = NodeReadOptions { read_value, children: None };
            match reader.read_node(&node_id, options).await {
                Ok(model) => {
                    nodes += 1;
                    yield BrowseStreamChunk {
                        source_id: source_id.clone(),
                        attributes: Some(model),
                        ..Default::default()
                    };
                }
                Err(OpcUaError::Cancelled) => break,
                Err(error) => {
                    yield BrowseStreamChunk {
                        source_id,
                        error_info: Some(reader.fault(&error)),
                        ..Default::default()
                    };
                    continue;
                }
            }

            let description = BrowseDescription::hierarchical(node_id.clone())
                .direction(direction)
                .reference_type(reference_type.clone(), include_subtypes)
                .node_classes(mask);
            let references = match reader.browse_all(description).await {
                Ok(references) => references,
                Err(OpcUaError::Cancelled) => break,
                Err(error) => {
                    yield BrowseStreamChunk {
                        source_id,
                        error_info: Some(reader.fault(&error)),
                        ..Default::default()
                    };
                    continue;
                }
            };

            let descend = !no_recurse && (max_depth == 0 || depth + 1 < max_depth);
            let mut next = Vec::new();
            for reference in references {
                if reader.is_cancelled() {
                    break;
                }
                if descend {
                    if let Some(target) = reader.local_id(&reference.node_id) {
                        if !visited.contains(&target) {
                            next.push((target, depth + 1));
                        }
                    }
                }
                let direction = if reference.is_forward {
                    BrowseDirection::Forward
                } else {
                    BrowseDirection::Backward
                };
                yield BrowseStreamChunk {
                    source_id: source_id.clone(),
                    reference: Some(NodeReferenceModel {
                        reference_type_id: Some(reader.format_node_id(&reference.reference_type_id)),
                        direction: Some(direction),
                        target: reader.raw_node(&reference),
                    }),
                    ..Default::default()
                };
            }
            // keep reference order when popping
            stack.extend(next.into_iter().rev());
        }
        info!(nodes, "Browse stream completed");
    })
}

fn start_nodes(reader: &NodeReader, request: &BrowseStreamRequest) -> OpcUaResult<Vec<NodeId>> {
    match request.node_ids.as_deref() {
        Some(ids) if !ids.is_empty() => ids.iter().map(|id| reader.parse_node_id(id)).collect(),
        _ => Ok(vec![NodeId::ROOT_FOLDER]),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use crate::client::{AddressSpace, Connection, MemorySession, VariantConverterRegistry};
    use crate::diagnostics::DiagnosticsLevel;
    use crate::types::{OpcUaDataType, QualifiedName};
    use crate::variant::Variant;

    const NS: &str = "http://test.org/UA/";

    fn space(variables: usize) -> AddressSpace {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace(NS);
        let boiler = NodeId::string(ns, "Boiler");
        space.add_object(
            boiler.clone(),
            QualifiedName::new(ns, "Boiler"),
            &NodeId::OBJECTS_FOLDER,
            &reference_types::ORGANIZES,
            &NodeId::BASE_OBJECT_TYPE,
        );
        for i in 0..variables {
            space.add_variable(
                NodeId::string(ns, format!("Var{}", i)),
                QualifiedName::new(ns, format!("Var{}", i)),
                &boiler,
                OpcUaDataType::Int32,
                Variant::Int32(i as i32),
            );
        }
        space
    }

    fn reader_for(session: MemorySession, cancel: &CancellationToken) -> NodeReader {
        let connection: Connection = Arc::new(session);
        NodeReader::new(
            &connection,
            Arc::new(VariantConverterRegistry::with_builtin_converters()),
            DiagnosticsLevel::Status,
            cancel,
            Duration::from_secs(5),
        )
    }

    fn reader(session: MemorySession) -> NodeReader {
        reader_for(session, &CancellationToken::new())
    }

    #[tokio::test]
    async fn test_browse_first_root() {
        let reader = reader(MemorySession::new(space(1)));
        let response = browse_first(&reader, &BrowseFirstRequest::default()).await.unwrap();
        assert!(response.error_info.is_none());
        assert_eq!(response.node.node_id, "i=84");
        assert_eq!(response.node.children, Some(true));
        let names: Vec<_> = response
            .references
            .unwrap()
            .into_iter()
            .filter_map(|r| r.target.browse_name)
            .collect();
        assert!(names.contains(&"Objects".to_string()));
        assert!(response.continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_browse_first_zero_max_skips_references() {
        let reader = reader(MemorySession::new(space(1)));
        let request = BrowseFirstRequest {
            node_id: Some("i=85".into()),
            max_references_to_return: Some(0),
            ..Default::default()
        };
        let response = browse_first(&reader, &request).await.unwrap();
        assert!(response.references.is_none());
        assert_eq!(response.node.children, Some(true));
    }

    #[tokio::test]
    async fn test_paging_is_exhaustive() {
        let reader = reader(MemorySession::new(space(25)));
        let request = BrowseFirstRequest {
            node_id: Some(format!("{}#s=Boiler", NS)),
            max_references_to_return: Some(10),
            node_ids_only: Some(true),
            ..Default::default()
        };
        let first = browse_first(&reader, &request).await.unwrap();
        let mut ids: Vec<String> = first
            .references
            .unwrap()
            .into_iter()
            .map(|r| r.target.node_id)
            .collect();
        let mut token = first.continuation_token;
        while let Some(t) = token.take() {
            let next = browse_next(
                &reader,
                &BrowseNextRequest {
                    continuation_token: Some(t),
                    node_ids_only: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            let page = next.references.unwrap();
            assert!(page.len() <= 10);
            ids.extend(page.into_iter().map(|r| r.target.node_id));
            token = next.continuation_token;
        }
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), 25);
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_browse_next_errors() {
        let reader = reader(MemorySession::new(space(1)));
        let missing = browse_next(&reader, &BrowseNextRequest::default()).await;
        assert!(matches!(missing, Err(OpcUaError::Request(_))));

        let malformed = reader.settle(
            "browse_next",
            browse_next(
                &reader,
                &BrowseNextRequest {
                    continuation_token: Some("not base64!".into()),
                    ..Default::default()
                },
            )
            .await,
        );
        let error = malformed.unwrap().error_info.unwrap();
        assert_eq!(error.status_code, StatusCode::BAD_CONTINUATION_POINT_INVALID);
    }

    #[tokio::test]
    async fn test_exhausted_token_is_an_empty_last_page() {
        let reader = reader(MemorySession::new(space(25)));
        let request = BrowseFirstRequest {
            node_id: Some("i=85".into()),
            max_references_to_return: Some(10),
            node_ids_only: Some(true),
            ..Default::default()
        };
        let first = browse_first(&reader, &request).await.unwrap();
        let mut last = first.continuation_token.unwrap();
        let mut token = Some(last.clone());
        while let Some(t) = token.take() {
            last = t.clone();
            let next = browse_next(
                &reader,
                &BrowseNextRequest {
                    continuation_token: Some(t),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            token = next.continuation_token;
        }

        for stale in [last, encode_token(b"nope")] {
            let response = browse_next(
                &reader,
                &BrowseNextRequest {
                    continuation_token: Some(stale),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert_eq!(response.references, Some(Vec::new()));
            assert!(response.continuation_token.is_none());
            assert!(response.error_info.is_none());
        }
    }

    #[tokio::test]
    async fn test_node_class_filter() {
        let reader = reader(MemorySession::new(space(3)));
        let request = BrowseFirstRequest {
            node_id: Some("i=85".into()),
            direction: Some(BrowseDirection::Both),
            node_class_filter: Some(vec![NodeClass::Object]),
            ..Default::default()
        };
        let response = browse_first(&reader, &request).await.unwrap();
        let references = response.references.unwrap();
        assert!(!references.is_empty());
        assert!(references
            .iter()
            .all(|r| r.target.node_class == Some(NodeClass::Object)));
    }

    #[tokio::test]
    async fn test_target_nodes_only_dedupes() {
        let reader = reader(MemorySession::new(space(2)));
        let request = BrowseFirstRequest {
            node_id: Some(format!("{}#s=Boiler", NS)),
            reference_type_id: Some("References".into()),
            direction: Some(BrowseDirection::Both),
            target_nodes_only: Some(true),
            ..Default::default()
        };
        let response = browse_first(&reader, &request).await.unwrap();
        let references = response.references.unwrap();
        let ids: HashSet<_> = references.iter().map(|r| r.target.node_id.clone()).collect();
        assert_eq!(ids.len(), references.len());
        assert!(references.iter().all(|r| r.reference_type_id.is_none() && r.direction.is_none()));
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let reader = reader(MemorySession::new(space(0)));
        let request = BrowseFirstRequest {
            node_id: Some("s=bad".into()),
            ..Default::default()
        };
        let response = reader
            .settle("browse_first", browse_first(&reader, &request).await)
            .unwrap();
        assert_eq!(
            response.error_info.map(|e| e.status_code),
            Some(StatusCode::BAD_NODE_ID_UNKNOWN)
        );
    }

    #[tokio::test]
    async fn test_stream_visits_subtree() {
        let reader = reader(MemorySession::new(space(3)));
        let request = BrowseStreamRequest {
            node_ids: Some(vec![format!("{}#s=Boiler", NS)]),
            direction: Some(BrowseDirection::Forward),
            ..Default::default()
        };
        let chunks: Vec<_> = browse_stream(reader, request, 0).collect().await;
        let nodes: Vec<_> = chunks.iter().filter(|c| c.attributes.is_some()).collect();
        let references: Vec<_> = chunks.iter().filter(|c| c.reference.is_some()).collect();
        assert_eq!(nodes.len(), 4);
        assert_eq!(references.len(), 3);
        assert!(chunks.iter().all(|c| c.error_info.is_none()));
    }

    #[tokio::test]
    async fn test_stream_no_recurse_includes_parent() {
        let reader = reader(MemorySession::new(space(2)));
        let request = BrowseStreamRequest {
            node_ids: Some(vec![format!("{}#s=Boiler", NS)]),
            no_recurse: Some(true),
            ..Default::default()
        };
        let chunks: Vec<_> = browse_stream(reader, request, 0).collect().await;
        assert_eq!(chunks.iter().filter(|c| c.attributes.is_some()).count(), 1);
        let targets: Vec<_> = chunks
            .iter()
            .filter_map(|c| c.reference.as_ref())
            .map(|r| r.target.node_id.clone())
            .collect();
        assert!(targets.contains(&"i=85".to_string()));
        assert_eq!(targets.len(), 3);
    }

    #[tokio::test]
    async fn test_stream_unknown_start() {
        let reader = reader(MemorySession::new(space(0)));
        let request = BrowseStreamRequest {
            node_ids: Some(vec!["s=bad".into()]),
            ..Default::default()
        };
        let chunks: Vec<_> = browse_stream(reader, request, 0).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].error_info.as_ref().map(|e| e.status_code),
            Some(StatusCode::BAD_NODE_ID_UNKNOWN)
        );
    }

    #[tokio::test]
    async fn test_stream_cancelled() {
        let cancel = CancellationToken::new();
        let reader = reader_for(MemorySession::new(space(5)), &cancel);
        let mut stream = browse_stream(reader, BrowseStreamRequest::default(), 0);
        assert!(stream.next().await.is_some());
        cancel.cancel();
        let rest: Vec<_> = stream.collect().await;
        assert!(rest.iter().all(|c| c.error_info.is_none()));
        assert!(rest.len() < 5);
    }
}
