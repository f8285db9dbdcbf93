// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA Variant <-> JSON conversion system.
//!
//! Values travel through the node services as JSON tagged with a data type.
//! This module converts between that representation and [`Variant`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        VariantCodec                             │
//! │        (scalar / array / tagged dispatch, value ranks)          │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   VariantConverterRegistry                      │
//! │                 (one converter per data type)                   │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                 │                 │
//!            ▼                 ▼                 ▼
//! ┌───────────────┐ ┌───────────────┐ ┌───────────────────────────┐
//! │  Primitives   │ │  Identifiers  │ │  Structured / Tagged      │
//! │ (Bool, Int)   │ │ (NodeId, QN)  │ │ (ExtensionObject, Number) │
//! └───────────────┘ └───────────────┘ └───────────────────────────┘
//! ```
//!
//! # JSON forms
//!
//! | type                                  | JSON                               |
//! |---------------------------------------|------------------------------------|
//! | Boolean, integers, Float, Double      | bool / number                      |
//! | Enumeration                           | Int32 number                       |
//! | String, XmlElement                    | string                             |
//! | DateTime                              | RFC 3339 string (UTC)              |
//! | Guid                                  | hyphenated string                  |
//! | ByteString                            | base64 string (input: byte list)   |
//! | NodeId, ExpandedNodeId, QualifiedName | canonical string                   |
//! | StatusCode                            | number (input: symbolic name)      |
//! | LocalizedText                         | `{"Text", "Locale"}`               |
//! | ExtensionObject                       | `{"TypeId", "Body"}`               |
//! | Variant, Number, Integer, UInteger    | `{"Type", "Body"}`                 |
//!
//! Arrays are JSON lists; an empty array stays `[]`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number, Value};
use uuid::Uuid;

use crate::error::{ConversionError, OpcUaError, OpcUaResult};
use crate::status::StatusCode;
use crate::types::{
    ExpandedNodeId, LocalizedText, NamespaceTable, NodeId, OpcUaDataType, QualifiedName,
};
use crate::variant::{Array, DataValue, ExtensionObject, Variant};

/// Key of the type name in tagged values.
pub const TYPE_KEY: &str = "Type";
/// Key of the payload in tagged values.
pub const BODY_KEY: &str = "Body";

fn mismatch(expected: OpcUaDataType, json: &Value) -> OpcUaError {
    OpcUaError::conversion(ConversionError::type_mismatch(
        expected.name(),
        json_kind(json),
    ))
}

fn invalid(target: OpcUaDataType, message: impl Into<String>) -> OpcUaError {
    OpcUaError::conversion(ConversionError::invalid_value(target.name(), message))
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Looks up an object member case-insensitively.
fn member<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

// =============================================================================
// VariantConverter Trait
// =============================================================================

/// Converts scalar values of specific data types to and from JSON.
///
/// Converters only ever see scalars; arrays and the tagged envelope are
/// handled by [`VariantCodec`].
pub trait VariantConverter: Send + Sync {
    /// Returns the data types this converter handles.
    fn supported_types(&self) -> &[OpcUaDataType];

    /// Encodes a scalar.
    fn to_json(&self, value: &Variant, namespaces: &NamespaceTable) -> OpcUaResult<Value>;

    /// Decodes a scalar of `target_type`.
    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant>;

    /// Returns the converter name for logging/debugging.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Primitive Type Converters
// =============================================================================

/// Converter for boolean values.
#[derive(Debug, Clone, Default)]
pub struct BooleanConverter;

impl VariantConverter for BooleanConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::Boolean]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::Boolean(v) => Ok(Value::Bool(*v)),
            other => Err(OpcUaError::type_mismatch("Boolean", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::Bool(v) => Ok(Variant::Boolean(*v)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Variant::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Variant::Boolean(false)),
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "BooleanConverter"
    }
}

/// Converter for all integer types, including enumerations (as Int32).
#[derive(Debug, Clone, Default)]
pub struct IntegerConverter;

impl IntegerConverter {
    fn to_i128(json: &Value, target_type: OpcUaDataType) -> OpcUaResult<i128> {
        match json {
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(v as i128)
                } else if let Some(v) = n.as_u64() {
                    Ok(v as i128)
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.fract() == 0.0 && f.is_finite() {
                        Ok(f as i128)
                    } else {
                        Err(invalid(target_type, format!("{} is not an integer", n)))
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i128>()
                .map_err(|_| invalid(target_type, format!("'{}' is not an integer", s))),
            other => Err(mismatch(target_type, other)),
        }
    }
}

impl VariantConverter for IntegerConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[
            OpcUaDataType::SByte,
            OpcUaDataType::Byte,
            OpcUaDataType::Int16,
            OpcUaDataType::UInt16,
            OpcUaDataType::Int32,
            OpcUaDataType::UInt32,
            OpcUaDataType::Int64,
            OpcUaDataType::UInt64,
            OpcUaDataType::Enumeration,
        ]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::UInt64(v) => Ok(Value::from(*v)),
            other => other
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| OpcUaError::type_mismatch("Integer", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let v = Self::to_i128(json, target_type)?;
        let overflow = || OpcUaError::conversion(ConversionError::overflow(v, target_type.name()));
        Ok(match target_type {
            OpcUaDataType::SByte => Variant::SByte(i8::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::Byte => Variant::Byte(u8::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::Int16 => Variant::Int16(i16::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::UInt16 => Variant::UInt16(u16::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::Int32 | OpcUaDataType::Enumeration => {
                Variant::Int32(i32::try_from(v).map_err(|_| overflow())?)
            }
            OpcUaDataType::UInt32 => Variant::UInt32(u32::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::Int64 => Variant::Int64(i64::try_from(v).map_err(|_| overflow())?),
            OpcUaDataType::UInt64 => Variant::UInt64(u64::try_from(v).map_err(|_| overflow())?),
            other => return Err(mismatch(other, json)),
        })
    }

    fn name(&self) -> &'static str {
        "IntegerConverter"
    }
}

/// Converter for Float and Double.
///
/// Non-finite values are exchanged as the strings `NaN`, `Infinity` and
/// `-Infinity` since JSON numbers cannot carry them.
#[derive(Debug, Clone, Default)]
pub struct FloatConverter;

impl FloatConverter {
    fn encode(v: f64) -> Value {
        if v.is_nan() {
            Value::String("NaN".into())
        } else if v.is_infinite() {
            Value::String(if v > 0.0 { "Infinity" } else { "-Infinity" }.into())
        } else {
            Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
        }
    }
}

impl VariantConverter for FloatConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::Float, OpcUaDataType::Double]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            // shortest decimal form of the f32, not its widened f64 expansion
            Variant::Float(v) => Ok(Self::encode(v.to_string().parse().unwrap_or(*v as f64))),
            Variant::Double(v) => Ok(Self::encode(*v)),
            other => Err(OpcUaError::type_mismatch("Double", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let v = match json {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| invalid(target_type, format!("{} is not a number", n)))?,
            Value::String(s) => match s.trim() {
                "NaN" => f64::NAN,
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                other => other
                    .parse()
                    .map_err(|_| invalid(target_type, format!("'{}' is not a number", s)))?,
            },
            other => return Err(mismatch(target_type, other)),
        };
        match target_type {
            OpcUaDataType::Float => {
                if v.is_finite() && v.abs() > f32::MAX as f64 {
                    return Err(OpcUaError::conversion(ConversionError::overflow(v, "Float")));
                }
                Ok(Variant::Float(v as f32))
            }
            _ => Ok(Variant::Double(v)),
        }
    }

    fn name(&self) -> &'static str {
        "FloatConverter"
    }
}

/// Converter for String and XmlElement.
#[derive(Debug, Clone, Default)]
pub struct StringConverter;

impl VariantConverter for StringConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::String, OpcUaDataType::XmlElement]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| OpcUaError::type_mismatch("String", value.data_type().name()))
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let s = match json {
            Value::String(s) => s.clone(),
            Value::Number(n) if target_type == OpcUaDataType::String => n.to_string(),
            Value::Bool(b) if target_type == OpcUaDataType::String => b.to_string(),
            other => return Err(mismatch(target_type, other)),
        };
        Ok(match target_type {
            OpcUaDataType::XmlElement => Variant::XmlElement(s),
            _ => Variant::String(s),
        })
    }

    fn name(&self) -> &'static str {
        "StringConverter"
    }
}

/// Converter for DateTime values (RFC 3339, UTC).
#[derive(Debug, Clone, Default)]
pub struct DateTimeConverter;

impl VariantConverter for DateTimeConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::DateTime]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::DateTime(v) => Ok(Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            other => Err(OpcUaError::type_mismatch("DateTime", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| Variant::DateTime(dt.with_timezone(&Utc)))
                .map_err(|e| invalid(target_type, e.to_string())),
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "DateTimeConverter"
    }
}

/// Converter for GUID values.
#[derive(Debug, Clone, Default)]
pub struct GuidConverter;

impl VariantConverter for GuidConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::Guid]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::Guid(v) => Ok(Value::String(v.hyphenated().to_string())),
            other => Err(OpcUaError::type_mismatch("Guid", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::String(s) => Uuid::parse_str(s.trim())
                .map(Variant::Guid)
                .map_err(|e| invalid(target_type, e.to_string())),
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "GuidConverter"
    }
}

/// Converter for byte strings.
///
/// Encodes as base64; decodes base64 strings or lists of byte values.
#[derive(Debug, Clone, Default)]
pub struct ByteStringConverter;

impl VariantConverter for ByteStringConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::ByteString]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::ByteString(v) => Ok(Value::String(BASE64.encode(v))),
            other => Err(OpcUaError::type_mismatch("ByteString", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::String(s) => BASE64
                .decode(s.trim())
                .map(Variant::ByteString)
                .map_err(|e| invalid(target_type, e.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| invalid(target_type, "byte values must be 0..=255"))
                })
                .collect::<OpcUaResult<Vec<u8>>>()
                .map(Variant::ByteString),
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "ByteStringConverter"
    }
}

// =============================================================================
// Identifier Converters
// =============================================================================

/// Converter for NodeId and ExpandedNodeId values.
#[derive(Debug, Clone, Default)]
pub struct NodeIdConverter;

impl VariantConverter for NodeIdConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::NodeId, OpcUaDataType::ExpandedNodeId]
    }

    fn to_json(&self, value: &Variant, namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::NodeId(v) => Ok(Value::String(v.format_with(namespaces))),
            Variant::ExpandedNodeId(v) => Ok(Value::String(v.format_with(namespaces))),
            other => Err(OpcUaError::type_mismatch("NodeId", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let Value::String(s) = json else {
            return Err(mismatch(target_type, json));
        };
        match target_type {
            OpcUaDataType::ExpandedNodeId => ExpandedNodeId::parse_with(s, namespaces)
                .map(|id| Variant::ExpandedNodeId(Box::new(id))),
            _ => NodeId::parse_with(s, namespaces).map(Variant::from),
        }
        .map_err(|e| invalid(target_type, e.to_string()))
    }

    fn name(&self) -> &'static str {
        "NodeIdConverter"
    }
}

/// Converter for status codes.
#[derive(Debug, Clone, Default)]
pub struct StatusCodeConverter;

impl VariantConverter for StatusCodeConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::StatusCode]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::StatusCode(v) => Ok(Value::from(v.value())),
            other => Err(OpcUaError::type_mismatch("StatusCode", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(|v| Variant::StatusCode(StatusCode(v)))
                .ok_or_else(|| invalid(target_type, format!("{} is not a status code", n))),
            Value::String(s) => StatusCode::from_name(s.trim())
                .map(Variant::StatusCode)
                .ok_or_else(|| invalid(target_type, format!("unknown status code '{}'", s))),
            Value::Object(o) => member(o, "Code")
                .map(|code| self.from_json(code, target_type, namespaces))
                .unwrap_or_else(|| Err(mismatch(target_type, json))),
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "StatusCodeConverter"
    }
}

/// Converter for qualified names.
#[derive(Debug, Clone, Default)]
pub struct QualifiedNameConverter;

impl VariantConverter for QualifiedNameConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::QualifiedName]
    }

    fn to_json(&self, value: &Variant, namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::QualifiedName(v) => Ok(Value::String(v.format_with(namespaces))),
            other => Err(OpcUaError::type_mismatch("QualifiedName", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::String(s) => QualifiedName::parse_with(s, namespaces)
                .map(Variant::from)
                .map_err(|e| invalid(target_type, e.to_string())),
            Value::Object(o) => {
                let name = member(o, "Name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid(target_type, "missing Name"))?;
                let namespace_index = member(o, "Uri")
                    .and_then(Value::as_u64)
                    .and_then(|v| u16::try_from(v).ok())
                    .unwrap_or(0);
                Ok(Variant::from(QualifiedName::new(namespace_index, name)))
            }
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "QualifiedNameConverter"
    }
}

/// Converter for localized text.
#[derive(Debug, Clone, Default)]
pub struct LocalizedTextConverter;

impl VariantConverter for LocalizedTextConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::LocalizedText]
    }

    fn to_json(&self, value: &Variant, _namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::LocalizedText(v) => {
                let mut object = Map::new();
                object.insert("Text".into(), Value::String(v.text.clone()));
                if let Some(locale) = &v.locale {
                    object.insert("Locale".into(), Value::String(locale.clone()));
                }
                Ok(Value::Object(object))
            }
            other => Err(OpcUaError::type_mismatch("LocalizedText", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        _namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        match json {
            Value::String(s) => Ok(Variant::from(LocalizedText::new(s.as_str()))),
            Value::Object(o) => {
                let text = member(o, "Text").and_then(Value::as_str).unwrap_or_default();
                let locale = member(o, "Locale").and_then(Value::as_str);
                Ok(Variant::from(LocalizedText {
                    locale: locale.map(str::to_string),
                    text: text.to_string(),
                }))
            }
            other => Err(mismatch(target_type, other)),
        }
    }

    fn name(&self) -> &'static str {
        "LocalizedTextConverter"
    }
}

// =============================================================================
// Structured Converters
// =============================================================================

/// Converter for structures, encoded as `{"TypeId", "Body"}`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionObjectConverter;

impl VariantConverter for ExtensionObjectConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::ExtensionObject]
    }

    fn to_json(&self, value: &Variant, namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        match value {
            Variant::ExtensionObject(v) => Ok(json!({
                "TypeId": v.type_id.format_with(namespaces),
                "Body": v.body,
            })),
            other => Err(OpcUaError::type_mismatch("ExtensionObject", other.data_type().name())),
        }
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let Value::Object(o) = json else {
            return Err(mismatch(target_type, json));
        };
        let (type_id, body) = match (member(o, "TypeId"), member(o, "Body")) {
            (Some(Value::String(id)), body) => (
                NodeId::parse_with(id, namespaces)
                    .map_err(|e| invalid(target_type, e.to_string()))?,
                body.cloned().unwrap_or(Value::Null),
            ),
            // a bare structure body without envelope
            _ => (NodeId::null(), json.clone()),
        };
        Ok(Variant::from(ExtensionObject::new(type_id, body)))
    }

    fn name(&self) -> &'static str {
        "ExtensionObjectConverter"
    }
}

/// Converter for data values, encoded as
/// `{"Value", "StatusCode", "SourceTimestamp", "ServerTimestamp"}`.
#[derive(Debug, Clone, Default)]
pub struct DataValueConverter;

impl VariantConverter for DataValueConverter {
    fn supported_types(&self) -> &[OpcUaDataType] {
        &[OpcUaDataType::DataValue]
    }

    fn to_json(&self, value: &Variant, namespaces: &NamespaceTable) -> OpcUaResult<Value> {
        let Variant::DataValue(dv) = value else {
            return Err(OpcUaError::type_mismatch("DataValue", value.data_type().name()));
        };
        let codec = VariantCodec::new(namespaces.clone());
        let mut object = Map::new();
        object.insert(
            "Value".into(),
            codec.encode(&dv.value, OpcUaDataType::Variant)?,
        );
        if !dv.status.is_good() {
            object.insert("StatusCode".into(), Value::from(dv.status.value()));
        }
        let ts = |t: &Option<DateTime<Utc>>| {
            t.map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        };
        if let Some(t) = ts(&dv.source_timestamp) {
            object.insert("SourceTimestamp".into(), t);
        }
        if let Some(t) = ts(&dv.server_timestamp) {
            object.insert("ServerTimestamp".into(), t);
        }
        Ok(Value::Object(object))
    }

    fn from_json(
        &self,
        json: &Value,
        target_type: OpcUaDataType,
        namespaces: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let Value::Object(o) = json else {
            return Err(mismatch(target_type, json));
        };
        let codec = VariantCodec::new(namespaces.clone());
        let value = match member(o, "Value") {
            Some(v) => codec.decode(v, OpcUaDataType::Variant, None)?,
            None => Variant::Empty,
        };
        let status = member(o, "StatusCode")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .map(StatusCode)
            .unwrap_or_default();
        let ts = |key: &str| {
            member(o, key)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        };
        Ok(Variant::DataValue(Box::new(DataValue {
            value,
            status,
            source_timestamp: ts("SourceTimestamp"),
            server_timestamp: ts("ServerTimestamp"),
            ..Default::default()
        })))
    }

    fn name(&self) -> &'static str {
        "DataValueConverter"
    }
}

// =============================================================================
// VariantConverterRegistry
// =============================================================================

/// Registry mapping data types to their converters.
pub struct VariantConverterRegistry {
    converters: HashMap<OpcUaDataType, Arc<dyn VariantConverter>>,
}

impl VariantConverterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in converters.
    pub fn with_builtin_converters() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BooleanConverter));
        registry.register(Arc::new(IntegerConverter));
        registry.register(Arc::new(FloatConverter));
        registry.register(Arc::new(StringConverter));
        registry.register(Arc::new(DateTimeConverter));
        registry.register(Arc::new(GuidConverter));
        registry.register(Arc::new(ByteStringConverter));
        registry.register(Arc::new(NodeIdConverter));
        registry.register(Arc::new(StatusCodeConverter));
        registry.register(Arc::new(QualifiedNameConverter));
        registry.register(Arc::new(LocalizedTextConverter));
        registry.register(Arc::new(ExtensionObjectConverter));
        registry.register(Arc::new(DataValueConverter));
        registry
    }

    /// Registers a converter for all of its supported types.
    pub fn register(&mut self, converter: Arc<dyn VariantConverter>) {
        for data_type in converter.supported_types() {
            self.converters.insert(*data_type, Arc::clone(&converter));
        }
    }

    /// Returns the converter of a data type.
    pub fn get_converter(&self, data_type: OpcUaDataType) -> OpcUaResult<&Arc<dyn VariantConverter>> {
        self.converters.get(&data_type).ok_or_else(|| {
            OpcUaError::conversion(ConversionError::unknown_data_type(data_type.name()))
        })
    }
}

impl Default for VariantConverterRegistry {
    fn default() -> Self {
        Self::with_builtin_converters()
    }
}

impl fmt::Debug for VariantConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.converters.keys().map(|t| t.name()).collect();
        names.sort_unstable();
        f.debug_struct("VariantConverterRegistry")
            .field("types", &names)
            .finish()
    }
}

// =============================================================================
// VariantCodec
// =============================================================================

/// Encodes and decodes values of a declared data type and value rank.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use uapub_nodes::client::VariantCodec;
/// use uapub_nodes::types::{NamespaceTable, OpcUaDataType};
///
/// let codec = VariantCodec::new(NamespaceTable::default());
/// let value = codec.decode(&json!([true, false]), OpcUaDataType::Boolean, Some(1)).unwrap();
/// assert_eq!(codec.encode(&value, OpcUaDataType::Boolean).unwrap(), json!([true, false]));
/// ```
#[derive(Debug, Clone)]
pub struct VariantCodec {
    registry: Arc<VariantConverterRegistry>,
    namespaces: NamespaceTable,
}

impl VariantCodec {
    /// Creates a codec using the built-in converters.
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self {
            registry: Arc::new(VariantConverterRegistry::with_builtin_converters()),
            namespaces,
        }
    }

    /// Creates a codec with a custom registry.
    pub fn with_registry(registry: Arc<VariantConverterRegistry>, namespaces: NamespaceTable) -> Self {
        Self {
            registry,
            namespaces,
        }
    }

    /// Returns the namespace table used for identifiers.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Encodes a value declared with `data_type`.
    ///
    /// Abstract declared types produce the tagged `{Type, Body}` form.
    pub fn encode(&self, value: &Variant, data_type: OpcUaDataType) -> OpcUaResult<Value> {
        match value {
            Variant::Empty => Ok(Value::Null),
            Variant::Array(array)
                if data_type.is_abstract() && !array.element_type.is_abstract() =>
            {
                let body = self.encode_array(array)?;
                Ok(tagged(array.element_type, body))
            }
            Variant::Array(array) => self.encode_array(array),
            scalar if data_type.is_abstract() => {
                let concrete = scalar.data_type();
                let body = self.encode_scalar(scalar)?;
                Ok(tagged(concrete, body))
            }
            scalar => self.encode_scalar(scalar),
        }
    }

    fn encode_array(&self, array: &Array) -> OpcUaResult<Value> {
        array
            .values
            .iter()
            .map(|v| self.encode(v, array.element_type))
            .collect::<OpcUaResult<Vec<_>>>()
            .map(Value::Array)
    }

    fn encode_scalar(&self, value: &Variant) -> OpcUaResult<Value> {
        self.registry
            .get_converter(value.data_type())?
            .to_json(value, &self.namespaces)
    }

    /// Decodes JSON into a value of `data_type`.
    ///
    /// `value_rank` follows the OPC UA convention (-1 scalar, >= 1 array,
    /// others any). With no rank the JSON shape decides; a list of numbers for
    /// a scalar ByteString is read as its bytes.
    pub fn decode(
        &self,
        json: &Value,
        data_type: OpcUaDataType,
        value_rank: Option<i32>,
    ) -> OpcUaResult<Variant> {
        let scalar_rank = value_rank == Some(-1);
        match json {
            Value::Null => Ok(Variant::Empty),
            Value::Array(items)
                if data_type == OpcUaDataType::ByteString
                    && value_rank.map_or(true, |r| r == -1)
                    && items.iter().all(Value::is_number) =>
            {
                self.decode_scalar(json, data_type)
            }
            Value::Array(_) if scalar_rank => Err(OpcUaError::conversion(
                ConversionError::type_mismatch(format!("scalar {}", data_type), "array"),
            )),
            Value::Array(items) => {
                let element_type = if data_type == OpcUaDataType::Null {
                    OpcUaDataType::Variant
                } else {
                    data_type
                };
                let values = items
                    .iter()
                    .map(|item| self.decode(item, element_type, Some(-1)))
                    .collect::<OpcUaResult<Vec<_>>>()?;
                Ok(Variant::array(element_type, values))
            }
            scalar if data_type.is_abstract() => self.decode_tagged(scalar, data_type, value_rank),
            scalar => {
                if matches!(value_rank, Some(r) if r >= 1) {
                    return Err(OpcUaError::conversion(ConversionError::type_mismatch(
                        format!("array of {}", data_type),
                        json_kind(scalar),
                    )));
                }
                self.decode_scalar(scalar, data_type)
            }
        }
    }

    fn decode_scalar(&self, json: &Value, data_type: OpcUaDataType) -> OpcUaResult<Variant> {
        self.registry
            .get_converter(data_type)?
            .from_json(json, data_type, &self.namespaces)
    }

    /// Decodes a value of an abstract type: either `{Type, Body}` or a plain
    /// JSON value whose type is inferred.
    fn decode_tagged(
        &self,
        json: &Value,
        declared: OpcUaDataType,
        value_rank: Option<i32>,
    ) -> OpcUaResult<Variant> {
        if let Value::Object(o) = json {
            if let (Some(Value::String(type_name)), Some(body)) = (member(o, TYPE_KEY), member(o, BODY_KEY)) {
                let concrete = OpcUaDataType::from_name(type_name).ok_or_else(|| {
                    OpcUaError::conversion(ConversionError::unknown_data_type(type_name.as_str()))
                })?;
                if concrete.is_abstract() || !declared.accepts(concrete) {
                    return Err(OpcUaError::conversion(ConversionError::type_mismatch(
                        declared.name(),
                        concrete.name(),
                    )));
                }
                let rank = if body.is_array() && concrete != OpcUaDataType::ByteString {
                    value_rank.filter(|r| *r >= 0).or(Some(1))
                } else {
                    None
                };
                return self.decode(body, concrete, rank);
            }
        }
        let inferred = infer_type(json);
        if !declared.accepts(inferred) {
            return Err(mismatch(declared, json));
        }
        self.decode_scalar(json, inferred)
    }
}

fn tagged(data_type: OpcUaDataType, body: Value) -> Value {
    let mut object = Map::new();
    object.insert(TYPE_KEY.into(), Value::String(data_type.name().to_string()));
    object.insert(BODY_KEY.into(), body);
    Value::Object(object)
}

/// Picks a concrete type for an untagged JSON scalar.
fn infer_type(json: &Value) -> OpcUaDataType {
    match json {
        Value::Bool(_) => OpcUaDataType::Boolean,
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(v), _) if i32::try_from(v).is_ok() => OpcUaDataType::Int32,
            (Some(_), _) => OpcUaDataType::Int64,
            (None, Some(_)) => OpcUaDataType::UInt64,
            _ => OpcUaDataType::Double,
        },
        Value::String(_) => OpcUaDataType::String,
        Value::Object(_) => OpcUaDataType::ExtensionObject,
        Value::Null | Value::Array(_) => OpcUaDataType::Variant,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> VariantCodec {
        VariantCodec::new(NamespaceTable::new([
            "http://opcfoundation.org/UA/",
            "http://test.org/UA/Data/",
        ]))
    }

    fn round_trip(json: Value, data_type: OpcUaDataType, rank: i32) {
        let codec = codec();
        let value = codec
            .decode(&json, data_type, Some(rank))
            .unwrap_or_else(|e| panic!("{data_type} {json}: {e}"));
        let back = codec.encode(&value, data_type).unwrap();
        assert_eq!(back, json, "{data_type}");
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(json!(true), OpcUaDataType::Boolean, -1);
        round_trip(json!(-5), OpcUaDataType::SByte, -1);
        round_trip(json!(255), OpcUaDataType::Byte, -1);
        round_trip(json!(-32768), OpcUaDataType::Int16, -1);
        round_trip(json!(65535), OpcUaDataType::UInt16, -1);
        round_trip(json!(-7), OpcUaDataType::Int32, -1);
        round_trip(json!(4_000_000_000u32), OpcUaDataType::UInt32, -1);
        round_trip(json!(i64::MIN), OpcUaDataType::Int64, -1);
        round_trip(json!(u64::MAX), OpcUaDataType::UInt64, -1);
        round_trip(json!(3.14), OpcUaDataType::Float, -1);
        round_trip(json!(-2.5e300), OpcUaDataType::Double, -1);
        round_trip(json!("NaN"), OpcUaDataType::Double, -1);
        round_trip(json!("text"), OpcUaDataType::String, -1);
        round_trip(json!("2024-05-01T10:20:30.123Z"), OpcUaDataType::DateTime, -1);
        round_trip(json!("550e8400-e29b-41d4-a716-446655440000"), OpcUaDataType::Guid, -1);
        round_trip(json!("AQID"), OpcUaDataType::ByteString, -1);
        round_trip(json!("<a>b</a>"), OpcUaDataType::XmlElement, -1);
        round_trip(json!("http://test.org/UA/Data/#i=10157"), OpcUaDataType::NodeId, -1);
        round_trip(json!("urn:remote#s=X"), OpcUaDataType::ExpandedNodeId, -1);
        round_trip(json!(0x803E_0000u32), OpcUaDataType::StatusCode, -1);
        round_trip(json!("http://test.org/UA/Data/#Static"), OpcUaDataType::QualifiedName, -1);
        round_trip(json!({"Text": "hi", "Locale": "en-US"}), OpcUaDataType::LocalizedText, -1);
        round_trip(json!(3), OpcUaDataType::Enumeration, -1);
        round_trip(
            json!({"TypeId": "i=884", "Body": {"Low": 0.0, "High": 100.0}}),
            OpcUaDataType::ExtensionObject,
            -1,
        );
    }

    #[test]
    fn test_tagged_round_trips() {
        round_trip(json!({"Type": "Int16", "Body": 5}), OpcUaDataType::Variant, -2);
        round_trip(json!({"Type": "Float", "Body": 1.5}), OpcUaDataType::Number, -1);
        round_trip(json!({"Type": "Int64", "Body": -9}), OpcUaDataType::Integer, -1);
        round_trip(json!({"Type": "Byte", "Body": 9}), OpcUaDataType::UInteger, -1);
        round_trip(json!({"Type": "Double", "Body": [1.0, 2.5]}), OpcUaDataType::Number, -2);
        round_trip(
            json!([{"Type": "Int16", "Body": 1}, {"Type": "String", "Body": "x"}]),
            OpcUaDataType::Variant,
            1,
        );
    }

    #[test]
    fn test_tagged_type_checks() {
        let codec = codec();
        let err = codec
            .decode(&json!({"Type": "String", "Body": "x"}), OpcUaDataType::Number, None)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_TYPE_MISMATCH);
        assert!(codec
            .decode(&json!({"Type": "Int32", "Body": 1}), OpcUaDataType::UInteger, None)
            .is_err());
        // untagged numbers are inferred
        let v = codec.decode(&json!(7), OpcUaDataType::Variant, None).unwrap();
        assert_eq!(v, Variant::Int32(7));
    }

    #[test]
    fn test_array_round_trips() {
        round_trip(json!([true, false, true]), OpcUaDataType::Boolean, 1);
        round_trip(json!([1, 2, 3]), OpcUaDataType::UInt16, 1);
        round_trip(json!(["AQI=", ""]), OpcUaDataType::ByteString, 1);
        round_trip(json!([{"Text": "a"}]), OpcUaDataType::LocalizedText, 1);
        for data_type in OpcUaDataType::ALL {
            if data_type != OpcUaDataType::Null {
                round_trip(json!([]), data_type, 1);
            }
        }
    }

    #[test]
    fn test_empty_array_is_not_null() {
        let codec = codec();
        let value = codec.decode(&json!([]), OpcUaDataType::Int32, Some(1)).unwrap();
        assert!(value.is_array());
        assert_eq!(codec.encode(&value, OpcUaDataType::Int32).unwrap(), json!([]));
    }

    #[test]
    fn test_byte_string_forms() {
        let codec = codec();
        let from_list = codec
            .decode(&json!([1, 2, 3]), OpcUaDataType::ByteString, Some(-1))
            .unwrap();
        assert_eq!(from_list, Variant::ByteString(vec![1, 2, 3]));
        assert_eq!(codec.encode(&from_list, OpcUaDataType::ByteString).unwrap(), json!("AQID"));

        let null = codec.decode(&Value::Null, OpcUaDataType::ByteString, Some(-1)).unwrap();
        let empty = codec.decode(&json!(""), OpcUaDataType::ByteString, Some(-1)).unwrap();
        assert_ne!(null, empty);
        assert_eq!(codec.encode(&null, OpcUaDataType::ByteString).unwrap(), Value::Null);
        assert_eq!(codec.encode(&empty, OpcUaDataType::ByteString).unwrap(), json!(""));
    }

    #[test]
    fn test_integer_overflow_and_strings() {
        let codec = codec();
        let err = codec.decode(&json!(300), OpcUaDataType::Byte, Some(-1)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_TYPE_MISMATCH);
        assert_eq!(
            codec.decode(&json!("42"), OpcUaDataType::Int64, None).unwrap(),
            Variant::Int64(42)
        );
        assert!(codec.decode(&json!(1.5), OpcUaDataType::Int32, None).is_err());
    }

    #[test]
    fn test_rank_mismatch() {
        let codec = codec();
        assert!(codec.decode(&json!([1]), OpcUaDataType::Int32, Some(-1)).is_err());
        assert!(codec.decode(&json!(1), OpcUaDataType::Int32, Some(1)).is_err());
        assert!(codec.decode(&json!(1), OpcUaDataType::Int32, Some(-2)).is_ok());
    }

    #[test]
    fn test_status_code_by_name() {
        let codec = codec();
        let v = codec
            .decode(&json!("BadNotFound"), OpcUaDataType::StatusCode, None)
            .unwrap();
        assert_eq!(v, Variant::StatusCode(StatusCode::BAD_NOT_FOUND));
    }

    #[test]
    fn test_registry_debug_lists_types() {
        let registry = VariantConverterRegistry::default();
        let text = format!("{:?}", registry);
        assert!(text.contains("Boolean"));
        assert!(registry.get_converter(OpcUaDataType::Variant).is_err());
    }
}
