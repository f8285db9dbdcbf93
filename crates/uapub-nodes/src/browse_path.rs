// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse-path resolver.
//!
//! Relative paths are lists of element strings. Each element names the
//! browse name of the next node and, through a short prefix, the reference
//! that leads to it:
//!
//! | Element            | Reference                      |
//! |--------------------|--------------------------------|
//! | `Name`             | `References` (any), forward    |
//! | `/Name`            | `HierarchicalReferences`       |
//! | `.Name`            | `Aggregates`                   |
//! | `<HasComponent>Name` | named type, or a node id     |
//!
//! After the prefix `!` follows the reference inverse and `#` excludes its
//! subtypes, e.g. `!/Parent` or `<#i=47>Name`. Names are `Name`,
//! `ns:Name` or `uri#Name`. A leading `&` escapes a name starting with one
//! of the prefix characters.

use tracing::{debug, warn};

use crate::client::{BrowsePath, BrowsePathTarget, RelativePathElement};
use crate::error::{BrowseError, OpcUaError, OpcUaResult, RequestError};
use crate::models::{BrowsePathRequest, BrowsePathResponse, NodeModel, NodePathTarget};
use crate::reader::{NodeReadOptions, NodeReader};
use crate::types::{reference_types, NamespaceTable, NodeId, QualifiedName};

/// Escape character in front of a name that starts with a prefix character.
const ESCAPE: char = '&';

// =============================================================================
// Path grammar
// =============================================================================

fn invalid(element: &str, reason: &str) -> OpcUaError {
    RequestError::bad_request(BrowseError::invalid_path(element, reason).to_string()).into()
}

/// Parses one path element.
///
/// # Errors
///
/// Returns a request error when the element is empty, sets the reference
/// type twice, leaves a `<` reference unterminated or names an unknown
/// reference type or namespace.
pub fn parse_path_element(
    element: &str,
    namespaces: &NamespaceTable,
) -> OpcUaResult<RelativePathElement> {
    if element.is_empty() {
        return Err(invalid(element, "element is empty"));
    }

    let mut reference_type_id: Option<NodeId> = None;
    let mut is_inverse = false;
    let mut include_subtypes = true;
    let mut in_reference = false;

    let mut rest = element;
    while let Some(c) = rest.chars().next() {
        match c {
            '<' if reference_type_id.is_none() && !in_reference => in_reference = true,
            '!' => is_inverse = true,
            '#' => include_subtypes = false,
            '/' if reference_type_id.is_none() && !in_reference => {
                reference_type_id = Some(reference_types::HIERARCHICAL_REFERENCES)
            }
            '.' if reference_type_id.is_none() && !in_reference => {
                reference_type_id = Some(reference_types::AGGREGATES)
            }
            '<' | '/' | '.' => return Err(invalid(element, "reference type set twice")),
            _ => break,
        }
        rest = &rest[c.len_utf8()..];
    }
    if let Some(stripped) = rest.strip_prefix(ESCAPE) {
        rest = stripped;
    }

    if in_reference {
        let end = closing_bracket(rest).ok_or_else(|| {
            invalid(element, "reference starts with '<' but does not end with '>'")
        })?;
        let reference = &rest[..end];
        rest = &rest[end + 1..];
        reference_type_id = Some(parse_reference(reference, namespaces).map_err(|_| {
            invalid(element, &format!("unknown reference type '{}'", reference))
        })?);
    }

    if rest.is_empty() {
        return Err(invalid(element, "target name is empty"));
    }
    let target_name = QualifiedName::parse_with(rest, namespaces)
        .map_err(|e| invalid(element, &e.to_string()))?;

    Ok(RelativePathElement {
        reference_type_id: reference_type_id.unwrap_or(reference_types::REFERENCES),
        is_inverse,
        include_subtypes,
        target_name,
    })
}

/// Position of the first `>` not escaped by `&`.
fn closing_bracket(s: &str) -> Option<usize> {
    let mut previous = None;
    for (i, c) in s.char_indices() {
        if c == '>' && previous != Some(ESCAPE) {
            return Some(i);
        }
        previous = Some(c);
    }
    None
}

fn parse_reference(reference: &str, namespaces: &NamespaceTable) -> OpcUaResult<NodeId> {
    match reference_types::from_name(reference.trim()) {
        Some(id) => Ok(id),
        None => NodeId::parse_with(reference.trim(), namespaces),
    }
}

/// Parses a relative path; empty elements are skipped.
pub fn parse_relative_path(
    path: &[String],
    namespaces: &NamespaceTable,
) -> OpcUaResult<Vec<RelativePathElement>> {
    path.iter()
        .filter(|element| !element.is_empty())
        .map(|element| parse_path_element(element, namespaces))
        .collect()
}

/// Formats one path element in its shortest form.
pub fn format_path_element(element: &RelativePathElement, namespaces: &NamespaceTable) -> String {
    let mut value = String::new();
    let reference = &element.reference_type_id;
    let write_reference = if *reference == reference_types::HIERARCHICAL_REFERENCES {
        value.push('/');
        false
    } else if *reference == reference_types::AGGREGATES {
        value.push('.');
        false
    } else if *reference != reference_types::REFERENCES {
        value.push('<');
        true
    } else {
        false
    };
    if element.is_inverse {
        value.push('!');
    }
    if !element.include_subtypes {
        value.push('#');
    }
    if write_reference {
        match reference_types::name_of(reference) {
            Some(name) => value.push_str(name),
            None => value.push_str(&reference.format_with(namespaces)),
        }
        value.push('>');
    }
    let target = element.target_name.format_with(namespaces);
    if target.starts_with(['<', '!', '#', '/', '.', ESCAPE]) {
        value.push(ESCAPE);
    }
    value.push_str(&target);
    value
}

/// Formats a relative path as element strings.
pub fn format_relative_path(
    path: &[RelativePathElement],
    namespaces: &NamespaceTable,
) -> Vec<String> {
    path.iter()
        .map(|element| format_path_element(element, namespaces))
        .collect()
}

// =============================================================================
// Services
// =============================================================================

/// Index of the first unresolved element, -1 when fully resolved.
fn remaining_path_index(target: &BrowsePathTarget) -> i32 {
    if target.remaining_path_index == u32::MAX {
        -1
    } else {
        i32::try_from(target.remaining_path_index).unwrap_or(i32::MAX)
    }
}

/// Resolves browse paths from a start node to their targets.
pub(crate) async fn browse_path(
    reader: &NodeReader,
    request: &BrowsePathRequest,
) -> OpcUaResult<BrowsePathResponse> {
    let paths = request
        .browse_paths
        .as_deref()
        .filter(|paths| !paths.is_empty() && paths.iter().all(|p| !p.is_empty()))
        .ok_or_else(|| RequestError::bad_request("Bad browse path"))?;
    let relative_paths = paths
        .iter()
        .map(|path| parse_relative_path(path, reader.codec().namespaces()))
        .collect::<OpcUaResult<Vec<_>>>()?;
    let root = reader.parse_node_id_or(request.node_id.as_deref(), NodeId::ROOT_FOLDER)?;
    let node_ids_only = request.node_ids_only.unwrap_or(false);
    let read_value = request.read_variable_values.unwrap_or(false);

    let mut response = BrowsePathResponse {
        targets: Some(Vec::new()),
        error_info: None,
    };
    for (path, relative_path) in paths.iter().zip(relative_paths) {
        let result = reader
            .translate(BrowsePath {
                starting_node: root.clone(),
                relative_path,
            })
            .await?;
        if let Some(error) = reader.status(
            result.status_code,
            &format!("Translate browse path {}", path.join("")),
        ) {
            response.error_info.get_or_insert(error);
            continue;
        }
        for target in &result.targets {
            let Some(node_id) = reader.local_id(&target.target_id) else {
                debug!(target = %reader.format_expanded(&target.target_id), "Skipping remote path target");
                continue;
            };
            let model = if node_ids_only {
                Ok(NodeModel::with_id(reader.format_node_id(&node_id)))
            } else {
                reader
                    .read_node(&node_id, NodeReadOptions { read_value, children: None })
                    .await
            };
            match model {
                Ok(model) => {
                    if let Some(targets) = response.targets.as_mut() {
                        targets.push(NodePathTarget {
                            browse_path: path.clone(),
                            target: model,
                            remaining_path_index: remaining_path_index(target),
                        });
                    }
                }
                Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
                Err(error) => {
                    warn!(node_id = %node_id, error = %error, "Skipping unreadable path target");
                }
            }
        }
    }
    debug!(
        paths = paths.len(),
        targets = response.targets.as_ref().map_or(0, Vec::len),
        "Resolved browse paths"
    );
    Ok(response)
}

/// Resolves a path to exactly one node.
///
/// An empty path resolves to `root` itself. `parameter` names the request
/// field in error messages.
///
/// # Errors
///
/// - [`BrowseError::PathNotFound`] when the path reaches no node
/// - [`BrowseError::AmbiguousPath`] when it reaches more than one
pub(crate) async fn resolve_browse_path_to_node(
    reader: &NodeReader,
    root: Option<NodeId>,
    path: &[String],
    parameter: &str,
) -> OpcUaResult<NodeId> {
    let root = root.unwrap_or(NodeId::ROOT_FOLDER);
    if path.is_empty() {
        return Ok(root);
    }
    let relative_path = parse_relative_path(path, reader.codec().namespaces())?;
    let result = reader
        .translate(BrowsePath {
            starting_node: root,
            relative_path,
        })
        .await?;
    let targets: Vec<&BrowsePathTarget> = if result.status_code.is_bad() {
        Vec::new()
    } else {
        result.targets.iter().collect()
    };
    match targets.as_slice() {
        [] => Err(BrowseError::path_not_found(parameter).into()),
        [target] => reader
            .local_id(&target.target_id)
            .ok_or_else(|| BrowseError::path_not_found(parameter).into()),
        _ => Err(BrowseError::ambiguous_path(parameter, targets.len()).into()),
    }
}

/// Resolves the node a request addresses by id, by path or by a path
/// relative to the id.
pub(crate) async fn resolve_target(
    reader: &NodeReader,
    node_id: Option<&str>,
    browse_path: Option<&[String]>,
    parameter: &str,
) -> OpcUaResult<NodeId> {
    let node_id = node_id.map(str::trim).filter(|id| !id.is_empty());
    let browse_path = browse_path.unwrap_or_default();
    let root = match node_id {
        Some(id) => Some(reader.parse_node_id(id)?),
        None if browse_path.is_empty() => {
            return Err(RequestError::bad_request("Bad node id or browse path missing").into())
        }
        None => None,
    };
    resolve_browse_path_to_node(reader, root, browse_path, parameter).await
}

// =============================================================================
// Tests
// =============================================================================
