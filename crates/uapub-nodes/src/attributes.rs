// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Attribute and value services.
//!
//! # Features
//!
//! - **Batch Attributes**: `read` and `write` handle many node/attribute
//!   pairs in one session call; results keep the request order and every
//!   item carries its own error
//! - **Typed Values**: `value_read` and `value_write` convert between JSON
//!   and the node's declared data type, resolving subtypes to their
//!   built-in type
//! - **Index Ranges**: `"n"` and `"a:b"` select elements of arrays and
//!   strings for both directions

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::browse_path::resolve_target;
use crate::client::{ReadValueId, WriteValue};
use crate::diagnostics::ServiceResult;
use crate::error::{OpcUaError, OpcUaResult, RequestError};
use crate::models::{
    AttributeReadResponse, AttributeWriteResponse, ReadRequest, ReadResponse, ValueReadRequest,
    ValueReadResponse, ValueWriteRequest, ValueWriteResponse, WriteRequest, WriteResponse,
};
use crate::reader::NodeReader;
use crate::types::{AttributeId, NodeId, OpcUaDataType};
use crate::variant::{DataValue, IndexRange, Variant};

fn parse_index_range(range: Option<&str>) -> OpcUaResult<Option<IndexRange>> {
    match range.map(str::trim).filter(|r| !r.is_empty()) {
        Some(range) => range.parse().map(Some),
        None => Ok(None),
    }
}

/// Built-in type of a node's value, from its DataType attribute.
async fn value_type(reader: &NodeReader, node_id: &NodeId) -> OpcUaResult<OpcUaDataType> {
    let data_type = reader.read_attribute(node_id, AttributeId::DataType).await?;
    match data_type.value.as_node_id() {
        Some(id) if data_type.status.is_good() => reader.builtin_type(id).await,
        _ => Ok(OpcUaDataType::Variant),
    }
}

// =============================================================================
// Read / Write
// =============================================================================

/// Reads attributes of many nodes.
pub(crate) async fn read(reader: &NodeReader, request: &ReadRequest) -> OpcUaResult<ReadResponse> {
    let attributes = request
        .attributes
        .as_deref()
        .ok_or_else(|| RequestError::bad_request("Missing attributes"))?;
    if attributes.iter().any(|a| a.node_id.trim().is_empty()) {
        return Err(RequestError::bad_request("Bad attributes").into());
    }

    // Unparsable ids fail their item without reaching the server.
    let mut results: Vec<Option<AttributeReadResponse>> = Vec::with_capacity(attributes.len());
    let mut items = Vec::new();
    for attribute in attributes {
        match reader.parse_node_id(&attribute.node_id) {
            Ok(node_id) => {
                items.push(ReadValueId::new(node_id, attribute.attribute));
                results.push(None);
            }
            Err(error) => results.push(Some(AttributeReadResponse {
                value: None,
                error_info: Some(reader.fault(&error)),
            })),
        }
    }

    let mut values = if items.is_empty() {
        Vec::new()
    } else {
        reader.read(&items, Duration::ZERO).await?
    }
    .into_iter()
    .zip(items.iter());
    let results = results
        .into_iter()
        .map(|result| match result {
            Some(failed) => failed,
            None => match values.next() {
                Some((value, item)) => attribute_value(reader, item, value),
                None => AttributeReadResponse::default(),
            },
        })
        .collect::<Vec<_>>();

    debug!(count = results.len(), "Read attributes");
    Ok(ReadResponse {
        results: Some(results),
        error_info: None,
    })
}

fn attribute_value(reader: &NodeReader, item: &ReadValueId, value: DataValue) -> AttributeReadResponse {
    let context = format!("Read {} of {}", item.attribute_id, reader.format_node_id(&item.node_id));
    if let Some(error) = reader.status(value.status, &context) {
        return AttributeReadResponse {
            value: None,
            error_info: Some(error),
        };
    }
    let declared = item
        .attribute_id
        .data_type()
        .unwrap_or_else(|| value.value.data_type());
    match reader.codec().encode(&value.value, declared) {
        Ok(json) => AttributeReadResponse {
            value: Some(json),
            error_info: None,
        },
        Err(error) => AttributeReadResponse {
            value: None,
            error_info: Some(reader.fault(&error)),
        },
    }
}

/// Writes attributes of many nodes.
pub(crate) async fn write(reader: &NodeReader, request: &WriteRequest) -> OpcUaResult<WriteResponse> {
    let attributes = request
        .attributes
        .as_deref()
        .ok_or_else(|| RequestError::bad_request("Missing attributes"))?;
    if attributes.iter().any(|a| a.node_id.trim().is_empty()) {
        return Err(RequestError::bad_request("Missing node id in attributes").into());
    }

    let mut results: Vec<Option<ServiceResult>> = Vec::with_capacity(attributes.len());
    let mut pending = Vec::new();
    for attribute in attributes {
        let decoded = async {
            let node_id = reader.parse_node_id(&attribute.node_id)?;
            let data_type = match attribute.attribute.data_type() {
                Some(dt) => dt,
                None => value_type(reader, &node_id).await?,
            };
            let value = reader.codec().decode(&attribute.value, data_type, None)?;
            Ok::<_, OpcUaError>(WriteValue {
                node_id,
                attribute_id: attribute.attribute,
                index_range: None,
                value: DataValue::new(value),
            })
        };
        match decoded.await {
            Ok(value) => {
                pending.push(value);
                results.push(None);
            }
            Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
            Err(error) => results.push(Some(reader.fault(&error))),
        }
    }

    let statuses = if pending.is_empty() {
        Vec::new()
    } else {
        reader.write(&pending).await?
    };
    let mut statuses = statuses.into_iter().zip(pending.iter());
    let results = results
        .into_iter()
        .map(|result| {
            let error_info = match result {
                Some(failed) => Some(failed),
                None => statuses.next().and_then(|(status, item)| {
                    reader.status(
                        status,
                        &format!("Write {} of {}", item.attribute_id, reader.format_node_id(&item.node_id)),
                    )
                }),
            };
            AttributeWriteResponse { error_info }
        })
        .collect::<Vec<_>>();

    debug!(count = results.len(), "Wrote attributes");
    Ok(WriteResponse {
        results: Some(results),
        error_info: None,
    })
}

// =============================================================================
// ValueRead / ValueWrite
// =============================================================================

/// Reads the value of a variable.
///
/// Values of abstract declared types are returned in the `{Type, Body}` form
/// and `data_type` names the declared type; otherwise `data_type` is the
/// concrete type of the value.
pub(crate) async fn value_read(
    reader: &NodeReader,
    request: &ValueReadRequest,
) -> OpcUaResult<ValueReadResponse> {
    let node_id = resolve_target(
        reader,
        request.node_id.as_deref(),
        request.browse_path.as_deref(),
        "browsePath",
    )
    .await?;
    let index_range = parse_index_range(request.index_range.as_deref())?;
    let formatted = reader.format_node_id(&node_id);

    let mut value_item = ReadValueId::value(node_id.clone());
    value_item.index_range = index_range;
    let items = [value_item, ReadValueId::new(node_id, AttributeId::DataType)];
    let mut values = reader
        .read(&items, request.max_age.unwrap_or(Duration::ZERO))
        .await?
        .into_iter();
    let (Some(value), Some(data_type)) = (values.next(), values.next()) else {
        return Ok(ValueReadResponse::default());
    };

    if let Some(error) = reader.status(value.status, &format!("Read value of {}", formatted)) {
        return Ok(ValueReadResponse {
            error_info: Some(error),
            ..Default::default()
        });
    }
    let declared = match data_type.value.as_node_id() {
        Some(id) if data_type.status.is_good() => reader.builtin_type(id).await?,
        _ => OpcUaDataType::Variant,
    };
    let json = reader.codec().encode(&value.value, declared)?;
    let type_name = match &value.value {
        Variant::Empty => None,
        _ if declared.is_abstract() => Some(declared.name().to_string()),
        v => Some(v.data_type().name().to_string()),
    };

    debug!(node_id = %formatted, data_type = ?type_name, "Read value");
    Ok(ValueReadResponse {
        value: Some(json),
        data_type: type_name,
        source_timestamp: value.source_timestamp,
        source_picoseconds: value.source_picoseconds.filter(|p| *p != 0),
        server_timestamp: value.server_timestamp,
        server_picoseconds: value.server_picoseconds.filter(|p| *p != 0),
        error_info: None,
    })
}

/// Writes the value of a variable.
pub(crate) async fn value_write(
    reader: &NodeReader,
    request: &ValueWriteRequest,
) -> OpcUaResult<ValueWriteResponse> {
    let json = request
        .value
        .as_ref()
        .ok_or_else(|| RequestError::bad_request("Missing value"))?;
    let node_id = resolve_target(
        reader,
        request.node_id.as_deref(),
        request.browse_path.as_deref(),
        "browsePath",
    )
    .await?;
    let index_range = parse_index_range(request.index_range.as_deref())?;

    let data_type = match request.data_type.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => reader.resolve_data_type(name).await?,
        _ => value_type(reader, &node_id).await?,
    };
    let value = decode_value(json, data_type, index_range.is_some(), reader)?;

    let write = WriteValue {
        node_id: node_id.clone(),
        attribute_id: AttributeId::Value,
        index_range,
        value: DataValue::new(value),
    };
    let status = reader
        .write(std::slice::from_ref(&write))
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();
    let formatted = reader.format_node_id(&node_id);
    debug!(node_id = %formatted, status = %status, "Wrote value");
    Ok(ValueWriteResponse {
        error_info: reader.status(status, &format!("Write value of {}", formatted)),
    })
}

/// Decodes a value to write. A JSON array written through an index range
/// stays an array; a scalar selects one element.
fn decode_value(
    json: &Value,
    data_type: OpcUaDataType,
    ranged: bool,
    reader: &NodeReader,
) -> OpcUaResult<Variant> {
    let rank = match (ranged, json) {
        (true, Value::Array(_)) => Some(1),
        (true, _) => Some(-1),
        _ => None,
    };
    reader.codec().decode(json, data_type, rank)
}

// =============================================================================
// Tests
// =============================================================================
