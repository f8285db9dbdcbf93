// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA session capability.
//!
//! The node services never talk to the network themselves. Everything they
//! need from a server goes through [`OpcUaSession`], which mirrors the
//! attribute, view and method service sets. Any transport (or the in-memory
//! [`MemorySession`](super::MemorySession)) can back it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::OpcUaResult;
use crate::status::StatusCode;
use crate::types::{
    AttributeId, BrowseDirection, ExpandedNodeId, LocalizedText, NamespaceTable, NodeClass,
    NodeId, QualifiedName,
};
use crate::variant::{DataValue, ExtensionObject, IndexRange, Variant};

/// Shared handle to a server session.
pub type Connection = Arc<dyn OpcUaSession>;

// =============================================================================
// Browse
// =============================================================================

/// What to browse from one node.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseDescription {
    /// Node to browse.
    pub node_id: NodeId,
    /// Direction of references to follow.
    pub browse_direction: BrowseDirection,
    /// Reference type filter; `None` follows all references.
    pub reference_type_id: Option<NodeId>,
    /// Whether subtypes of the reference type match.
    pub include_subtypes: bool,
    /// Node class mask of targets (0 = all).
    pub node_class_mask: u32,
}

impl BrowseDescription {
    /// Forward hierarchical references of a node.
    pub fn hierarchical(node_id: NodeId) -> Self {
        Self {
            node_id,
            browse_direction: BrowseDirection::Forward,
            reference_type_id: Some(crate::types::reference_types::HIERARCHICAL_REFERENCES),
            include_subtypes: true,
            node_class_mask: 0,
        }
    }

    /// Sets the direction.
    pub fn direction(mut self, direction: BrowseDirection) -> Self {
        self.browse_direction = direction;
        self
    }

    /// Sets the reference type filter.
    pub fn reference_type(mut self, reference_type_id: NodeId, include_subtypes: bool) -> Self {
        self.reference_type_id = Some(reference_type_id);
        self.include_subtypes = include_subtypes;
        self
    }

    /// Sets the node class mask.
    pub fn node_classes(mut self, mask: u32) -> Self {
        self.node_class_mask = mask;
        self
    }
}

/// One reference returned by a browse.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDescription {
    /// Reference type.
    pub reference_type_id: NodeId,
    /// Whether the reference points away from the browsed node.
    pub is_forward: bool,
    /// Target node.
    pub node_id: ExpandedNodeId,
    /// Browse name of the target.
    pub browse_name: QualifiedName,
    /// Display name of the target.
    pub display_name: LocalizedText,
    /// Node class of the target.
    pub node_class: NodeClass,
    /// Type definition of the target (objects and variables).
    pub type_definition: Option<ExpandedNodeId>,
}

/// Result of browsing one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResult {
    /// Status of the browse.
    pub status_code: StatusCode,
    /// Set when more references remain.
    pub continuation_point: Option<Vec<u8>>,
    /// References of this page.
    pub references: Vec<ReferenceDescription>,
}

impl BrowseResult {
    /// A failed browse.
    pub fn failure(status_code: StatusCode) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }
}

// =============================================================================
// TranslateBrowsePaths
// =============================================================================

/// One hop of a relative path.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativePathElement {
    /// Reference type to follow.
    pub reference_type_id: NodeId,
    /// Follow the reference backwards.
    pub is_inverse: bool,
    /// Whether subtypes of the reference type match.
    pub include_subtypes: bool,
    /// Browse name of the target.
    pub target_name: QualifiedName,
}

/// A start node and a relative path.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowsePath {
    /// Start node.
    pub starting_node: NodeId,
    /// Path elements.
    pub relative_path: Vec<RelativePathElement>,
}

/// A node a browse path resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowsePathTarget {
    /// Resolved node.
    pub target_id: ExpandedNodeId,
    /// Index of the first unprocessed element, `u32::MAX` when complete.
    pub remaining_path_index: u32,
}

/// Result of translating one browse path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowsePathResult {
    /// Status of the translation.
    pub status_code: StatusCode,
    /// Matching targets.
    pub targets: Vec<BrowsePathTarget>,
}

// =============================================================================
// Read / Write
// =============================================================================

/// An attribute to read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,
    /// Attribute to read.
    pub attribute_id: AttributeId,
    /// Slice of the value to read.
    pub index_range: Option<IndexRange>,
}

impl ReadValueId {
    /// Reads an attribute of a node.
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
        }
    }

    /// Reads the value of a node.
    pub fn value(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value)
    }
}

/// An attribute to write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    /// Node to write.
    pub node_id: NodeId,
    /// Attribute to write.
    pub attribute_id: AttributeId,
    /// Slice of the value to write.
    pub index_range: Option<IndexRange>,
    /// The value.
    pub value: DataValue,
}

// =============================================================================
// Call
// =============================================================================

/// A method to call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMethodRequest {
    /// Object the method is called on.
    pub object_id: NodeId,
    /// The method.
    pub method_id: NodeId,
    /// Positional input arguments.
    pub input_arguments: Vec<Variant>,
}

/// Outcome of a method call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallMethodResult {
    /// Status of the call.
    pub status_code: StatusCode,
    /// Per input argument status, empty when all are good.
    pub input_argument_results: Vec<StatusCode>,
    /// Output arguments.
    pub output_arguments: Vec<Variant>,
}

impl CallMethodResult {
    /// A failed call.
    pub fn failure(status_code: StatusCode) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }
}

/// Formal method argument as stored in the `InputArguments` and
/// `OutputArguments` properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Data type id.
    pub data_type: NodeId,
    /// Value rank (-1 scalar, 1 one-dimensional array).
    #[serde(default = "scalar_rank")]
    pub value_rank: i32,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value in its JSON form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

fn scalar_rank() -> i32 {
    -1
}

impl Argument {
    /// Creates a scalar argument.
    pub fn new(name: impl Into<String>, data_type: NodeId) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank: -1,
            array_dimensions: None,
            description: None,
            value: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Makes the argument a one-dimensional array.
    pub fn array(mut self) -> Self {
        self.value_rank = 1;
        self.array_dimensions = Some(vec![0]);
        self
    }

    /// Returns `true` for array arguments.
    pub fn is_array(&self) -> bool {
        self.value_rank >= 0 || self.value_rank == -3
    }

    /// Wraps the argument in an extension object.
    pub fn to_extension_object(&self) -> ExtensionObject {
        let mut body = json!({
            "Name": self.name,
            "DataType": self.data_type.to_opc_string(),
            "ValueRank": self.value_rank,
        });
        if let Some(dims) = &self.array_dimensions {
            body["ArrayDimensions"] = json!(dims);
        }
        if let Some(description) = &self.description {
            body["Description"] = Value::String(description.clone());
        }
        if let Some(value) = &self.value {
            body["Value"] = value.clone();
        }
        ExtensionObject::new(NodeId::ARGUMENT, body)
    }

    /// Reads an argument from an extension object body.
    pub fn from_extension_object(object: &ExtensionObject) -> Option<Self> {
        serde_json::from_value(object.body.clone()).ok()
    }

    /// Reads the argument list stored in an `InputArguments` or
    /// `OutputArguments` property value.
    pub fn list_from_variant(value: &Variant) -> Vec<Self> {
        match value {
            Variant::Array(array) => array
                .values
                .iter()
                .filter_map(|v| match v {
                    Variant::ExtensionObject(eo) => Self::from_extension_object(eo),
                    _ => None,
                })
                .collect(),
            Variant::ExtensionObject(eo) => Self::from_extension_object(eo).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Builds the property value for an argument list.
    pub fn list_to_variant(arguments: &[Self]) -> Variant {
        Variant::array(
            crate::types::OpcUaDataType::ExtensionObject,
            arguments
                .iter()
                .map(|a| Variant::from(a.to_extension_object()))
                .collect(),
        )
    }
}

// =============================================================================
// OpcUaSession Trait
// =============================================================================

/// Capability of a connected OPC UA session.
///
/// Each call corresponds to one service request. Operation level failures
/// are reported through the status codes inside the results; an `Err` means
/// the whole request failed.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow concurrent access
/// from multiple tasks.
#[async_trait]
pub trait OpcUaSession: Send + Sync {
    /// Returns the server's namespace table.
    fn namespaces(&self) -> NamespaceTable;

    /// Browses the references of the given nodes.
    ///
    /// `max_references_per_node` of 0 lets the server choose the page size.
    async fn browse(
        &self,
        nodes: &[BrowseDescription],
        max_references_per_node: u32,
    ) -> OpcUaResult<Vec<BrowseResult>>;

    /// Continues (or with `release` abandons) browses.
    async fn browse_next(
        &self,
        release: bool,
        continuation_points: &[Vec<u8>],
    ) -> OpcUaResult<Vec<BrowseResult>>;

    /// Resolves browse paths to node ids.
    async fn translate_browse_paths(
        &self,
        paths: &[BrowsePath],
    ) -> OpcUaResult<Vec<BrowsePathResult>>;

    /// Reads attributes.
    async fn read(&self, nodes: &[ReadValueId], max_age: Duration) -> OpcUaResult<Vec<DataValue>>;

    /// Writes attributes.
    async fn write(&self, values: &[WriteValue]) -> OpcUaResult<Vec<StatusCode>>;

    /// Calls methods.
    async fn call(&self, methods: &[CallMethodRequest]) -> OpcUaResult<Vec<CallMethodResult>>;

    /// Reads a single attribute.
    async fn read_one(&self, node_id: &NodeId, attribute_id: AttributeId) -> OpcUaResult<DataValue> {
        let mut values = self
            .read(&[ReadValueId::new(node_id.clone(), attribute_id)], Duration::ZERO)
            .await?;
        Ok(values.pop().unwrap_or_else(|| DataValue::from_status(StatusCode::BAD_UNEXPECTED_ERROR)))
    }
}
