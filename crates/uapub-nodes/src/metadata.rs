// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified node metadata.
//!
//! Combines the attributes of a node with its type definition and
//! supertype chain. Variables add their data type node; methods add their
//! signature.

use tracing::{debug, warn};

use crate::browse_path::resolve_target;
use crate::client::BrowseDescription;
use crate::error::{OpcUaError, OpcUaResult, OperationError};
use crate::method::method_metadata;
use crate::models::{NodeMetadataRequest, NodeMetadataResponse, NodeModel, TypeDefinitionModel, VariableMetadataModel};
use crate::reader::{NodeReadOptions, NodeReader};
use crate::status::StatusCode;
use crate::types::{reference_types, AttributeId, BrowseDirection, NodeClass, NodeId};

/// Supertypes followed before giving up on a looping hierarchy.
const MAX_SUPERTYPES: usize = 32;

/// Supertypes of a type, most derived first.
async fn type_hierarchy(reader: &NodeReader, type_id: &NodeId) -> OpcUaResult<Vec<NodeModel>> {
    let mut hierarchy = Vec::new();
    let mut current = type_id.clone();
    while hierarchy.len() < MAX_SUPERTYPES {
        let description = BrowseDescription::hierarchical(current.clone())
            .direction(BrowseDirection::Backward)
            .reference_type(reference_types::HAS_SUBTYPE, false);
        let references = reader.browse_all(description).await?;
        let Some(reference) = references.first() else {
            break;
        };
        let Some(parent) = reader.local_id(&reference.node_id) else {
            break;
        };
        hierarchy.push(reader.raw_node(reference));
        current = parent;
    }
    Ok(hierarchy)
}

async fn type_definition(
    reader: &NodeReader,
    node_id: &NodeId,
    node: &NodeModel,
    type_id: &NodeId,
) -> OpcUaResult<TypeDefinitionModel> {
    let type_node = if type_id == node_id {
        node.clone()
    } else {
        match reader.read_node(type_id, NodeReadOptions::default()).await {
            Ok(type_node) => type_node,
            Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
            Err(error) => {
                warn!(type_id = %reader.format_node_id(type_id), error = %error, "Type definition unreadable");
                return Err(OperationError::bad_status(
                    reader.format_node_id(type_id),
                    StatusCode::BAD_TYPE_DEFINITION_INVALID,
                )
                .into());
            }
        }
    };
    Ok(TypeDefinitionModel {
        type_definition_id: type_node.node_id,
        browse_name: type_node.browse_name,
        display_name: type_node.display_name,
        description: type_node.description,
        type_hierarchy: type_hierarchy(reader, type_id).await?,
    })
}

async fn variable_metadata(reader: &NodeReader, node_id: &NodeId, node: &NodeModel) -> OpcUaResult<VariableMetadataModel> {
    let data_type = reader.read_attribute(node_id, AttributeId::DataType).await?;
    let data_type = match data_type.value.as_node_id() {
        Some(id) if data_type.status.is_good() => Some(reader.read_node(id, NodeReadOptions::default()).await?),
        _ => None,
    };
    Ok(VariableMetadataModel {
        data_type,
        value_rank: node.value_rank,
        array_dimensions: node.array_dimensions.clone(),
    })
}

/// Reads the metadata of one node.
pub(crate) async fn get_metadata(
    reader: &NodeReader,
    request: &NodeMetadataRequest,
) -> OpcUaResult<NodeMetadataResponse> {
    let node_id = resolve_target(
        reader,
        request.node_id.as_deref(),
        request.browse_path.as_deref(),
        "browsePath",
    )
    .await?;
    let node = reader.read_node(&node_id, NodeReadOptions::default()).await?;
    let node_class = node.node_class.unwrap_or_default();

    let mut response = NodeMetadataResponse {
        node_id: Some(node.node_id.clone()),
        node_class: node.node_class,
        display_name: node.display_name.clone(),
        description: node.description.clone(),
        ..Default::default()
    };

    if node_class == NodeClass::Method {
        response.method_metadata = Some(method_metadata(reader, &node_id).await?);
        return Ok(response);
    }

    // Instances describe their type; type nodes describe themselves.
    let type_id = match node_class {
        NodeClass::Object | NodeClass::Variable => reader
            .type_definition(&node_id)
            .await?
            .unwrap_or_else(|| node_id.clone()),
        _ => node_id.clone(),
    };
    if matches!(node_class, NodeClass::Variable | NodeClass::VariableType) {
        response.variable_metadata = Some(variable_metadata(reader, &node_id, &node).await?);
    }
    response.type_definition = Some(type_definition(reader, &node_id, &node, &type_id).await?);

    debug!(
        node_id = %node.node_id,
        node_class = %node_class,
        "Read node metadata"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use crate::client::{AddressSpace, Argument, Connection, MemorySession, VariantConverterRegistry};
    use crate::diagnostics::DiagnosticsLevel;
    use crate::types::{OpcUaDataType, QualifiedName};
    use crate::variant::Variant;

    const NS: &str = "http://test.org/UA/";

    fn reader() -> NodeReader {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace(NS);
        let line = NodeId::string(ns, "Line1");
        space.add_object(
            line.clone(),
            QualifiedName::new(ns, "Line1"),
            &NodeId::OBJECTS_FOLDER,
            &reference_types::ORGANIZES,
            &NodeId::BASE_OBJECT_TYPE,
        );
        space.add_variable(
            NodeId::string(ns, "Line1.Speed"),
            QualifiedName::new(ns, "Speed"),
            &line,
            OpcUaDataType::Double,
            Variant::Double(12.5),
        );
        space.add_method(
            NodeId::string(ns, "Line1.Start"),
            QualifiedName::new(ns, "Start"),
            &line,
            vec![Argument::new("Delay", OpcUaDataType::UInt32.node_id())],
            Vec::new(),
        );
        let connection: Connection = Arc::new(MemorySession::new(space));
        NodeReader::new(
            &connection,
            Arc::new(VariantConverterRegistry::with_builtin_converters()),
            DiagnosticsLevel::Status,
            &CancellationToken::new(),
            Duration::from_secs(5),
        )
    }

    fn request(node_id: &str) -> NodeMetadataRequest {
        NodeMetadataRequest {
            node_id: Some(node_id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_variable_metadata() {
        let reader = reader();
        let response = get_metadata(&reader, &request(&format!("{}#s=Line1.Speed", NS)))
            .await
            .unwrap();
        assert_eq!(response.node_class, Some(NodeClass::Variable));
        assert_eq!(response.display_name.as_deref(), Some("Speed"));

        let variable = response.variable_metadata.unwrap();
        assert_eq!(variable.data_type.map(|d| d.node_id), Some("i=11".to_string()));
        assert_eq!(variable.value_rank, Some(-1));

        let type_definition = response.type_definition.unwrap();
        assert_eq!(type_definition.type_definition_id, "i=63");
        assert_eq!(type_definition.type_hierarchy[0].node_id, "i=62");
        assert!(response.method_metadata.is_none());
    }

    #[tokio::test]
    async fn test_object_type_node_describes_itself() {
        let reader = reader();
        let response = get_metadata(&reader, &request("i=61")).await.unwrap();
        assert_eq!(response.node_class, Some(NodeClass::ObjectType));
        let type_definition = response.type_definition.unwrap();
        assert_eq!(type_definition.type_definition_id, "i=61");
        assert_eq!(type_definition.browse_name.as_deref(), Some("FolderType"));
        assert_eq!(
            type_definition.type_hierarchy.iter().map(|t| t.node_id.as_str()).collect::<Vec<_>>(),
            vec!["i=58"]
        );
    }

    #[tokio::test]
    async fn test_method_node_includes_signature() {
        let reader = reader();
        let response = get_metadata(&reader, &request(&format!("{}#s=Line1.Start", NS)))
            .await
            .unwrap();
        assert_eq!(response.node_class, Some(NodeClass::Method));
        assert!(response.type_definition.is_none());
        let method = response.method_metadata.unwrap();
        assert_eq!(method.object_id, Some(format!("{}#s=Line1", NS)));
        assert_eq!(method.input_arguments.unwrap()[0].name, "Delay");
    }

    #[tokio::test]
    async fn test_unknown_node_is_an_error() {
        let reader = reader();
        let err = get_metadata(&reader, &request("i=999999")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }
}
