// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request and response models of the node services.
//!
//! Models are plain serde structs in camelCase. Node ids, browse names and
//! data types travel as strings in the forms [`NodeId::parse_with`] accepts;
//! values travel as JSON produced by the [`VariantCodec`].
//!
//! Every response carries an optional `error_info` ([`ServiceResult`]) for
//! failures reported by the server. Requests carry an optional
//! [`RequestHeader`] selecting the diagnostics level.
//!
//! [`NodeId::parse_with`]: crate::types::NodeId::parse_with
//! [`VariantCodec`]: crate::client::VariantCodec

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{RequestHeader, ServiceResult};
use crate::types::{AttributeId, BrowseDirection, NodeClass};

// =============================================================================
// Nodes and references
// =============================================================================

/// Attributes of a node as returned by browse, path and metadata services.
///
/// Only attributes the node has are set. In raw mode (`node_ids_only`) only
/// the id, class and the names known from the reference are filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    /// Node id.
    pub node_id: String,
    /// Node class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class: Option<NodeClass>,
    /// Browse name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_name: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the node has hierarchical children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<bool>,
    /// Type definition of objects and variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition_id: Option<String>,
    /// Data type of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Value rank of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<i32>,
    /// Array dimensions of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
    /// Access level of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<u32>,
    /// User access level of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_access_level: Option<u32>,
    /// Write mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mask: Option<u32>,
    /// User write mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_write_mask: Option<u32>,
    /// Event notifier of objects and views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_notifier: Option<u8>,
    /// IsAbstract of types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,
    /// Symmetric of reference types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric: Option<bool>,
    /// Inverse name of reference types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_name: Option<String>,
    /// ContainsNoLoops of views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_no_loops: Option<bool>,
    /// Executable of methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
    /// UserExecutable of methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_executable: Option<bool>,
    /// Historizing of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historizing: Option<bool>,
    /// Minimum sampling interval of variables in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_sampling_interval: Option<f64>,
    /// Value, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Source timestamp of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Error reading the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

impl NodeModel {
    /// A model with only the id set.
    pub fn with_id(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }
}

/// A reference from a browsed node to its target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReferenceModel {
    /// Reference type id; absent with `target_nodes_only`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type_id: Option<String>,
    /// Direction; absent with `target_nodes_only`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<BrowseDirection>,
    /// Target node.
    pub target: NodeModel,
}

// =============================================================================
// Browse
// =============================================================================

/// First page of a browse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseFirstRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node to browse, the root folder when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Direction, forward when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<BrowseDirection>,
    /// Reference type, HierarchicalReferences when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type_id: Option<String>,
    /// Do not include subtypes of the reference type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_subtypes: Option<bool>,
    /// Node classes of targets to return (empty = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class_filter: Option<Vec<NodeClass>>,
    /// Return targets only, each once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nodes_only: Option<bool>,
    /// Read the values of variable targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_variable_values: Option<bool>,
    /// Raw mode: return ids and reference names without reading nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids_only: Option<bool>,
    /// Page size. `0` returns the node without references; absent lets the
    /// server choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_references_to_return: Option<u32>,
}

/// Response to [`BrowseFirstRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseFirstResponse {
    /// The browsed node.
    pub node: NodeModel,
    /// References of the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<NodeReferenceModel>>,
    /// Token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Next page of a browse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseNextRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Token returned by the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    /// Release the continuation point instead of reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<bool>,
    /// Return targets only, each once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_nodes_only: Option<bool>,
    /// Read the values of variable targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_variable_values: Option<bool>,
    /// Raw mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids_only: Option<bool>,
}

/// Response to [`BrowseNextRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseNextResponse {
    /// References of this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<NodeReferenceModel>>,
    /// Token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Recursive browse producing a stream of chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseStreamRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Start nodes, the root folder when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<Vec<String>>,
    /// Direction, both when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<BrowseDirection>,
    /// Reference type, HierarchicalReferences when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type_id: Option<String>,
    /// Do not include subtypes of the reference type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_subtypes: Option<bool>,
    /// Node classes of targets to return (empty = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class_filter: Option<Vec<NodeClass>>,
    /// Only browse the start nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_recurse: Option<bool>,
    /// Read the values of variable nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_variable_values: Option<bool>,
}

/// One element of a browse stream: either a node or a reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseStreamChunk {
    /// Node the chunk belongs to.
    pub source_id: String,
    /// Attributes of the source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<NodeModel>,
    /// A reference of the source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<NodeReferenceModel>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

// =============================================================================
// Browse paths
// =============================================================================

/// Resolves relative paths from a start node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsePathRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Start node, the root folder when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Paths to resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_paths: Option<Vec<Vec<String>>>,
    /// Read the values of variable targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_variable_values: Option<bool>,
    /// Raw mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids_only: Option<bool>,
}

/// A node a path resolved to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePathTarget {
    /// The path.
    pub browse_path: Vec<String>,
    /// The target.
    pub target: NodeModel,
    /// `-1` when the path resolved completely, else the first unresolved
    /// element.
    pub remaining_path_index: i32,
}

/// Response to [`BrowsePathRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsePathResponse {
    /// Targets of all paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<NodePathTarget>>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

// =============================================================================
// Attribute read / write
// =============================================================================

/// An attribute to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReadRequest {
    /// Node.
    pub node_id: String,
    /// Attribute.
    pub attribute: AttributeId,
}

/// Reads attributes of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Attributes to read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeReadRequest>>,
}

/// Value of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReadResponse {
    /// The value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Response to [`ReadRequest`], one result per attribute in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    /// Results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AttributeReadResponse>>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// An attribute to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeWriteRequest {
    /// Node.
    pub node_id: String,
    /// Attribute.
    pub attribute: AttributeId,
    /// Value, encoded for the attribute's data type.
    #[serde(default)]
    pub value: Value,
}

/// Writes attributes of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Attributes to write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeWriteRequest>>,
}

/// Outcome of one attribute write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeWriteResponse {
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Response to [`WriteRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    /// Results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AttributeWriteResponse>>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Reads the value of a variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueReadRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node, or start of `browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Path from `node_id` (or the root folder) to the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,
    /// Index range (`"n"` or `"a:b"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
    /// Maximum age of a cached value.
    #[serde(
        default,
        with = "crate::types::humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,
}

/// Response to [`ValueReadRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueReadResponse {
    /// The value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Data type name the value is encoded with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Source timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Source picoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_picoseconds: Option<u16>,
    /// Server timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Server picoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_picoseconds: Option<u16>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Writes the value of a variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueWriteRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node, or start of `browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Path from `node_id` (or the root folder) to the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,
    /// Value to write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Data type of the value; read from the node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Index range (`"n"` or `"a:b"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

/// Response to [`ValueWriteRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueWriteResponse {
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

// =============================================================================
// Methods
// =============================================================================

/// Selects a method by id or path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadataRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Method, or start of `method_browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Path from `method_id` (or the root folder) to the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_browse_path: Option<Vec<String>>,
}

/// Formal argument of a method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadataArgument {
    /// Name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value rank, absent for scalars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<i32>,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
    /// Default value.
    #[serde(default)]
    pub default_value: Value,
    /// The data type node.
    #[serde(rename = "type")]
    pub type_node: NodeModel,
    /// Error reading the data type node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Signature and owner of a method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadataModel {
    /// Object the method is a component of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Input arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_arguments: Option<Vec<MethodMetadataArgument>>,
    /// Output arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_arguments: Option<Vec<MethodMetadataArgument>>,
}

/// Response to [`MethodMetadataRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadataResponse {
    /// The metadata.
    #[serde(flatten)]
    pub metadata: MethodMetadataModel,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// A method argument or result value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCallArgument {
    /// The value; absent means the formal default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Data type name or id; matched case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl MethodCallArgument {
    /// An argument with a value and type.
    pub fn new(value: Value, data_type: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            data_type: Some(data_type.into()),
        }
    }
}

/// Calls a method on an object.
///
/// The object is `object_id`, or the target of `object_browse_path` from
/// `object_id` (or the root folder). The method is `method_id`, or the target
/// of `method_browse_path` from `method_id` (or the object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCallRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Path to the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_browse_path: Option<Vec<String>>,
    /// Method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Path to the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_browse_path: Option<Vec<String>>,
    /// Positional input arguments; `None` entries use the formal default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<Option<MethodCallArgument>>>,
}

/// Response to [`MethodCallRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCallResponse {
    /// Output arguments.
    #[serde(default)]
    pub results: Vec<MethodCallArgument>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

// =============================================================================
// Node metadata
// =============================================================================

/// Selects a node by id or path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadataRequest {
    /// Request header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node, or start of `browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Path to the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,
}

/// Type definition of an instance, or the type itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinitionModel {
    /// Type node.
    pub type_definition_id: String,
    /// Browse name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_name: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Supertypes, most derived first.
    #[serde(default)]
    pub type_hierarchy: Vec<NodeModel>,
}

/// Data type information of a variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMetadataModel {
    /// The data type node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<NodeModel>,
    /// Value rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<i32>,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
}

/// Response to [`NodeMetadataRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadataResponse {
    /// Node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Node class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class: Option<NodeClass>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<TypeDefinitionModel>,
    /// Variable metadata of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_metadata: Option<VariableMetadataModel>,
    /// Method metadata of methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_metadata: Option<MethodMetadataModel>,
    /// Error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

// =============================================================================
// ErrorInfo carriers
// =============================================================================

/// A response that reports failures through an inline `error_info`.
pub trait ErrorInfoResponse: Default {
    /// Returns the error, if any.
    fn error_info(&self) -> Option<&ServiceResult>;

    /// Replaces the error.
    fn set_error_info(&mut self, error_info: ServiceResult);

    /// Creates an empty response carrying only an error.
    fn from_error_info(error_info: ServiceResult) -> Self {
        let mut response = Self::default();
        response.set_error_info(error_info);
        response
    }
}

macro_rules! impl_error_info_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ErrorInfoResponse for $ty {
                fn error_info(&self) -> Option<&ServiceResult> {
                    self.error_info.as_ref()
                }

                fn set_error_info(&mut self, error_info: ServiceResult) {
                    self.error_info = Some(error_info);
                }
            }
        )*
    };
}

impl_error_info_response!(
    BrowseFirstResponse,
    BrowseNextResponse,
    BrowseStreamChunk,
    BrowsePathResponse,
    ReadResponse,
    WriteResponse,
    AttributeReadResponse,
    AttributeWriteResponse,
    ValueReadResponse,
    ValueWriteResponse,
    MethodMetadataResponse,
    MethodCallResponse,
    NodeMetadataResponse,
);
