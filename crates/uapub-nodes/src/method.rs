// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method call invoker.
//!
//! Methods are addressed by id or by browse path relative to their object.
//! The formal signature is read from the `InputArguments` and
//! `OutputArguments` properties of the method node; it supplies defaults for
//! omitted inputs and types for null outputs.

use serde_json::Value;
use tracing::{debug, warn};

use crate::browse_path::{resolve_browse_path_to_node, resolve_target};
use crate::client::{Argument, BrowseDescription, CallMethodRequest, INPUT_ARGUMENTS, OUTPUT_ARGUMENTS};
use crate::error::{OpcUaError, OpcUaResult, OperationError, RequestError};
use crate::models::{
    MethodCallArgument, MethodCallRequest, MethodCallResponse, MethodMetadataArgument,
    MethodMetadataModel, MethodMetadataRequest, MethodMetadataResponse, NodeModel,
};
use crate::reader::{NodeReadOptions, NodeReader};
use crate::types::{reference_types, AttributeId, BrowseDirection, NodeId, OpcUaDataType, QualifiedName};
use crate::variant::Variant;

// =============================================================================
// Formal signature
// =============================================================================

/// Formal arguments of a method; `None` where the property is absent.
#[derive(Debug, Default)]
struct Signature {
    inputs: Option<Vec<Argument>>,
    outputs: Option<Vec<Argument>>,
}

fn argument_property(name: &QualifiedName) -> Option<bool> {
    if *name == QualifiedName::standard(INPUT_ARGUMENTS) {
        Some(true)
    } else if *name == QualifiedName::standard(OUTPUT_ARGUMENTS) {
        Some(false)
    } else {
        None
    }
}

async fn read_arguments(reader: &NodeReader, property: &NodeId) -> OpcUaResult<Option<Vec<Argument>>> {
    let value = reader.read_attribute(property, AttributeId::Value).await?;
    if value.status.is_bad() {
        return Err(OperationError::bad_status(reader.format_node_id(property), value.status).into());
    }
    Ok(match value.value {
        Variant::Empty => None,
        ref v => Some(Argument::list_from_variant(v)),
    })
}

async fn signature(reader: &NodeReader, method_id: &NodeId) -> OpcUaResult<Signature> {
    let description = BrowseDescription::hierarchical(method_id.clone())
        .reference_type(reference_types::HAS_PROPERTY, true);
    let mut signature = Signature::default();
    for reference in reader.browse_all(description).await? {
        let Some(is_input) = argument_property(&reference.browse_name) else {
            continue;
        };
        let Some(property) = reader.local_id(&reference.node_id) else {
            continue;
        };
        let arguments = read_arguments(reader, &property).await?;
        if is_input {
            signature.inputs = arguments;
        } else {
            signature.outputs = arguments;
        }
        if signature.inputs.is_some() && signature.outputs.is_some() {
            break;
        }
    }
    Ok(signature)
}

/// Value rank used to decode an argument value.
fn decode_rank(argument: &Argument) -> Option<i32> {
    match argument.value_rank {
        -1 => Some(-1),
        r if r >= 1 => Some(r),
        _ => None,
    }
}

/// Default input value of a formal argument.
fn formal_default(
    reader: &NodeReader,
    argument: &Argument,
    builtin: OpcUaDataType,
) -> OpcUaResult<Variant> {
    match &argument.value {
        Some(value) => reader.codec().decode(value, builtin, decode_rank(argument)),
        None if argument.is_array() => Ok(Variant::array(builtin, Vec::new())),
        None => Ok(Variant::default_for(builtin)),
    }
}

// =============================================================================
// GetMethodMetadata
// =============================================================================

/// Reads the owner and signature of a method.
pub(crate) async fn get_method_metadata(
    reader: &NodeReader,
    request: &MethodMetadataRequest,
) -> OpcUaResult<MethodMetadataResponse> {
    let method_id = resolve_target(
        reader,
        request.method_id.as_deref(),
        request.method_browse_path.as_deref(),
        "methodBrowsePath",
    )
    .await?;
    let metadata = method_metadata(reader, &method_id).await?;
    Ok(MethodMetadataResponse {
        metadata,
        error_info: None,
    })
}

/// Method metadata of a method node.
pub(crate) async fn method_metadata(
    reader: &NodeReader,
    method_id: &NodeId,
) -> OpcUaResult<MethodMetadataModel> {
    let description = BrowseDescription::hierarchical(method_id.clone())
        .direction(BrowseDirection::Both)
        .reference_type(reference_types::AGGREGATES, true);
    let references = reader.browse_all(description).await?;

    let mut model = MethodMetadataModel::default();
    for reference in references {
        if model.object_id.is_some() && model.input_arguments.is_some() && model.output_arguments.is_some() {
            break;
        }
        if !reference.is_forward {
            if reference.reference_type_id == reference_types::HAS_COMPONENT {
                model.object_id = Some(reader.format_expanded(&reference.node_id));
            }
            continue;
        }
        let Some(is_input) = argument_property(&reference.browse_name) else {
            continue;
        };
        let Some(property) = reader.local_id(&reference.node_id) else {
            continue;
        };
        let Some(arguments) = read_arguments(reader, &property).await? else {
            continue;
        };
        let mut list = Vec::with_capacity(arguments.len());
        for argument in arguments {
            list.push(argument_metadata(reader, argument).await?);
        }
        if is_input {
            model.input_arguments = Some(list);
        } else {
            model.output_arguments = Some(list);
        }
    }
    debug!(
        method_id = %reader.format_node_id(method_id),
        inputs = model.input_arguments.as_ref().map_or(0, Vec::len),
        outputs = model.output_arguments.as_ref().map_or(0, Vec::len),
        "Read method metadata"
    );
    Ok(model)
}

async fn argument_metadata(reader: &NodeReader, argument: Argument) -> OpcUaResult<MethodMetadataArgument> {
    let (type_node, error_info) = match reader.read_node(&argument.data_type, NodeReadOptions::default()).await {
        Ok(node) => (node, None),
        Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
        Err(error) => (
            NodeModel::with_id(reader.format_node_id(&argument.data_type)),
            Some(reader.fault(&error)),
        ),
    };
    Ok(MethodMetadataArgument {
        name: argument.name,
        description: argument.description,
        value_rank: (argument.value_rank != -1).then_some(argument.value_rank),
        array_dimensions: argument.array_dimensions,
        default_value: argument.value.unwrap_or(Value::Null),
        type_node,
        error_info,
    })
}

// =============================================================================
// MethodCall
// =============================================================================

/// Resolves the object and method a call targets.
async fn call_targets(reader: &NodeReader, request: &MethodCallRequest) -> OpcUaResult<(NodeId, NodeId)> {
    let object_id = resolve_target(
        reader,
        request.object_id.as_deref(),
        request.object_browse_path.as_deref(),
        "objectBrowsePath",
    )
    .await?;

    let method_id = match request.method_id.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(id) => Some(reader.parse_node_id(id)?),
        None => None,
    };
    let method_id = match request.method_browse_path.as_deref() {
        Some(path) if !path.is_empty() => {
            let start = method_id.unwrap_or_else(|| object_id.clone());
            resolve_browse_path_to_node(reader, Some(start), path, "methodBrowsePath").await?
        }
        _ => method_id.ok_or_else(|| RequestError::bad_request("Method id missing"))?,
    };
    Ok((object_id, method_id))
}

/// Calls a method with positional inputs.
///
/// Omitted and `None` inputs take the formal default. Output values that
/// come back null are replaced by the formal default when one exists.
pub(crate) async fn method_call(
    reader: &NodeReader,
    request: &MethodCallRequest,
) -> OpcUaResult<MethodCallResponse> {
    let object_missing = request.object_id.as_deref().map_or(true, |o| o.trim().is_empty())
        && request.object_browse_path.as_ref().map_or(true, Vec::is_empty);
    if object_missing {
        return Err(RequestError::bad_request("Object id missing or bad browse path").into());
    }
    let (object_id, method_id) = call_targets(reader, request).await?;
    let formatted = reader.format_node_id(&method_id);

    let (signature, signature_error) = match signature(reader, &method_id).await {
        Ok(signature) => (signature, None),
        Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
        Err(error) => {
            warn!(method_id = %formatted, error = %error, "Failed to read method signature");
            (Signature::default(), Some(error))
        }
    };
    let inputs = signature.inputs.unwrap_or_default();
    let outputs = signature.outputs.unwrap_or_default();
    let provided = request.arguments.as_deref().unwrap_or_default();
    if provided.len() > inputs.len() {
        return Err(match signature_error {
            Some(error) => error,
            None => RequestError::too_many_arguments(inputs.len(), provided.len()).into(),
        });
    }

    let mut input_arguments = Vec::with_capacity(inputs.len());
    for (i, formal) in inputs.iter().enumerate() {
        let formal_type = reader.builtin_type(&formal.data_type).await?;
        let given = provided
            .get(i)
            .and_then(Option::as_ref)
            .and_then(|arg| arg.value.as_ref().map(|value| (value, arg.data_type.as_deref())));
        let value = match given {
            Some((value, data_type)) => {
                let builtin = match data_type.map(str::trim).filter(|t| !t.is_empty()) {
                    Some(name) => reader.resolve_data_type(name).await?,
                    None => formal_type,
                };
                reader.codec().decode(value, builtin, decode_rank(formal))?
            }
            None => formal_default(reader, formal, formal_type)?,
        };
        input_arguments.push(value);
    }

    let result = reader
        .call(CallMethodRequest {
            object_id,
            method_id,
            input_arguments,
        })
        .await?;
    if let Some(error) = reader.status(result.status_code, &format!("Call {}", formatted)) {
        return Ok(MethodCallResponse {
            results: Vec::new(),
            error_info: Some(error),
        });
    }

    let mut results = Vec::with_capacity(result.output_arguments.len());
    for (i, mut value) in result.output_arguments.into_iter().enumerate() {
        let formal = outputs.get(i);
        let formal_type = match formal {
            Some(formal) => Some(reader.builtin_type(&formal.data_type).await?),
            None => None,
        };
        if let (Some(formal), Some(builtin)) = (formal, formal_type) {
            if matches!(value, Variant::Empty) && formal.value.is_some() {
                value = formal_default(reader, formal, builtin)?;
            }
        }
        let data_type = match (&value, formal_type) {
            (Variant::Empty, Some(builtin)) => Some(builtin.name().to_string()),
            (Variant::Empty, None) => None,
            (v, _) => Some(v.data_type().name().to_string()),
        };
        results.push(MethodCallArgument {
            value: Some(reader.codec().encode(&value, value.data_type())?),
            data_type,
        });
    }
    debug!(method_id = %formatted, outputs = results.len(), "Called method");
    Ok(MethodCallResponse {
        results,
        error_info: None,
    })
}

// =============================================================================
// Tests
// =============================================================================
