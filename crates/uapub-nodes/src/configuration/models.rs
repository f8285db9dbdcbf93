// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Published nodes configuration records.
//!
//! Entries use the PascalCase field names of the published nodes file;
//! expansion options are a request model and use camelCase.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diagnostics::{RequestHeader, ServiceResult};
use crate::error::{OpcUaResult, RequestError};
use crate::types::AttributeId;

// =============================================================================
// OpcNode
// =============================================================================

/// One node of a data set writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpcNode {
    /// Node id, or start of `browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Node id in expanded form, used when `id` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_node_id: Option<String>,

    /// Relative path from `id` to the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,

    /// Field id of the node in the data set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_field_id: Option<String>,

    /// Display name of the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Attribute to sample, the value when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_id: Option<AttributeId>,

    /// Index range of the sampled value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,

    /// Sampling interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opc_sampling_interval: Option<u32>,

    /// Publishing interval in milliseconds. Only valid at writer level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opc_publishing_interval: Option<u32>,

    /// Publishing interval as a duration. Only valid at writer level.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::humantime_serde::option"
    )]
    pub opc_publishing_interval_timespan: Option<Duration>,

    /// Heartbeat interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<u32>,
}

impl OpcNode {
    /// Creates a node with an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Sets the field id.
    pub fn with_field_id(mut self, field_id: impl Into<String>) -> Self {
        self.data_set_field_id = Some(field_id.into());
        self
    }

    /// Sets the browse path.
    pub fn with_browse_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.browse_path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// The configured id, `id` first.
    pub fn node_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.expanded_node_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

// =============================================================================
// PublishedNodesEntry
// =============================================================================

/// A data set writer: an endpoint and the nodes it publishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedNodesEntry {
    /// Server endpoint.
    #[serde(default)]
    pub endpoint_url: String,

    /// Use a secure endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_security: Option<bool>,

    /// Writer group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_writer_group: Option<String>,

    /// Data set writer id, unique within the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_writer_id: Option<String>,

    /// Data set name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_name: Option<String>,

    /// Data set description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_description: Option<String>,

    /// Data set class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_class_id: Option<Uuid>,

    /// Publishing interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_publishing_interval: Option<u32>,

    /// Writer priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    /// Configuration version, bumped on every update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// Nodes of the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opc_nodes: Option<Vec<OpcNode>>,
}

impl PublishedNodesEntry {
    /// Creates an entry for an endpoint.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Default::default()
        }
    }

    /// Sets the nodes.
    pub fn with_nodes(mut self, nodes: Vec<OpcNode>) -> Self {
        self.opc_nodes = Some(nodes);
        self
    }

    /// Writer group, empty when unset.
    pub fn group(&self) -> &str {
        self.data_set_writer_group.as_deref().unwrap_or_default()
    }

    /// Writer id, empty when unset.
    pub fn writer_id(&self) -> &str {
        self.data_set_writer_id.as_deref().unwrap_or_default()
    }

    /// Number of configured nodes.
    pub fn node_count(&self) -> usize {
        self.opc_nodes.as_ref().map_or(0, Vec::len)
    }
}

// =============================================================================
// PublishedNodeExpansion
// =============================================================================

/// Options of an expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedNodeExpansion {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,

    /// Do not publish an object or variable given as root, only what is
    /// found below it.
    #[serde(default)]
    pub exclude_root_if_instance_node: bool,

    /// Match type definitions exactly instead of including subtypes.
    #[serde(default)]
    pub no_sub_types_of_type_nodes: bool,

    /// Fold the variables of component objects into their instance instead
    /// of producing separate objects.
    #[serde(default)]
    pub flatten_type_instance: bool,

    /// Depth of the object search; 0 searches the root only (objects) or
    /// without limit (types).
    #[serde(default)]
    pub max_depth: u32,

    /// Depth of the variable search below each object; 0 is unlimited.
    #[serde(default)]
    pub max_levels_to_expand: u32,

    /// Merge everything into one entry instead of one per object.
    #[serde(default)]
    pub create_single_writer: bool,

    /// Do not search below a found instance.
    #[serde(default)]
    pub stop_at_first_found_instance: bool,

    /// Drop every result carrying an error.
    #[serde(default)]
    pub discard_errors: bool,
}

// =============================================================================
// ServiceResponse
// =============================================================================

/// One element of an expansion stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    /// The produced value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,

    /// Error of this element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

impl<T> ServiceResponse<T> {
    /// A good result.
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error_info: None,
        }
    }

    /// A result carrying an error.
    pub fn failed(result: T, error_info: ServiceResult) -> Self {
        Self {
            result: Some(result),
            error_info: Some(error_info),
        }
    }

    /// Returns `true` when no error is attached.
    pub fn is_good(&self) -> bool {
        self.error_info.is_none()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validates the nodes of an entry.
///
/// Every node needs an id; a missing field id defaults to the node id. Field
/// ids must be unique and publishing intervals belong to the writer.
pub fn validate_nodes(nodes: &mut [OpcNode]) -> OpcUaResult<()> {
    let mut field_ids = HashSet::with_capacity(nodes.len());
    for node in nodes.iter_mut() {
        let id = node
            .node_id()
            .map(str::to_string)
            .ok_or_else(|| RequestError::bad_request("Node must contain a node ID"))?;
        let field_id = node.data_set_field_id.get_or_insert(id).clone();
        field_ids.insert(field_id);
        if node.opc_publishing_interval.is_some() || node.opc_publishing_interval_timespan.is_some() {
            return Err(RequestError::bad_request(
                "Publishing interval not allowed on node level. Must be set at writer level.",
            )
            .into());
        }
    }
    if field_ids.len() != nodes.len() {
        return Err(RequestError::bad_request("Field ids must be present and unique.").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpcUaError;
    use serde_json::json;

    #[test]
    fn test_pascal_case_entry() {
        let entry: PublishedNodesEntry = serde_json::from_value(json!({
            "EndpointUrl": "opc.tcp://localhost:50000",
            "DataSetWriterGroup": "Group",
            "OpcNodes": [
                { "Id": "i=2258", "DataSetFieldId": "Time", "OpcSamplingInterval": 1000 },
                { "Id": "nsu=http://test.org/UA/;s=Line1", "BrowsePath": ["Speed"] }
            ]
        }))
        .unwrap();
        assert_eq!(entry.group(), "Group");
        assert_eq!(entry.node_count(), 2);
        let nodes = entry.opc_nodes.unwrap();
        assert_eq!(nodes[0].opc_sampling_interval, Some(1000));
        assert_eq!(nodes[1].browse_path, Some(vec!["Speed".to_string()]));
    }

    #[test]
    fn test_expansion_camel_case() {
        let expansion: PublishedNodeExpansion = serde_json::from_value(json!({
            "createSingleWriter": true,
            "maxLevelsToExpand": 2
        }))
        .unwrap();
        assert!(expansion.create_single_writer);
        assert_eq!(expansion.max_levels_to_expand, 2);
        assert!(!expansion.discard_errors);
    }

    #[test]
    fn test_validate_defaults_field_id() {
        let mut nodes = vec![OpcNode::new("i=2258"), OpcNode::new("i=2259").with_field_id("State")];
        validate_nodes(&mut nodes).unwrap();
        assert_eq!(nodes[0].data_set_field_id.as_deref(), Some("i=2258"));
        assert_eq!(nodes[1].data_set_field_id.as_deref(), Some("State"));
    }

    #[test]
    fn test_validate_rejects() {
        let mut duplicate = vec![OpcNode::new("i=1").with_field_id("a"), OpcNode::new("i=2").with_field_id("a")];
        let err = validate_nodes(&mut duplicate).unwrap_err();
        assert!(matches!(err, OpcUaError::Request(_)));
        assert_eq!(err.to_string(), "Field ids must be present and unique.");

        let mut missing = vec![OpcNode::default()];
        assert!(validate_nodes(&mut missing).is_err());

        let mut interval = vec![OpcNode {
            opc_publishing_interval: Some(100),
            ..OpcNode::new("i=1")
        }];
        assert!(validate_nodes(&mut interval).is_err());
    }
}
