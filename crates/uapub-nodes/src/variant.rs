// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed OPC UA values.
//!
//! [`Variant`] is the closed sum over every built-in type. Arrays keep their
//! element type so an empty array still knows what it is an array of.
//! [`DataValue`] adds status and timestamps, and [`IndexRange`] selects a
//! slice of an array or string value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConversionError, OpcUaError, OpcUaResult};
use crate::status::StatusCode;
use crate::types::{ExpandedNodeId, LocalizedText, NodeId, OpcUaDataType, QualifiedName};

// =============================================================================
// ExtensionObject
// =============================================================================

/// A structured value identified by its data type (or encoding) id.
///
/// The body is kept in its JSON form since the binary encoding of structures
/// is left to the transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionObject {
    /// Data type id of the body.
    pub type_id: NodeId,
    /// Encoded body.
    pub body: serde_json::Value,
}

impl ExtensionObject {
    /// Creates a new extension object.
    pub fn new(type_id: NodeId, body: serde_json::Value) -> Self {
        Self { type_id, body }
    }

    /// Returns `true` when the object carries no body.
    pub fn is_null(&self) -> bool {
        self.type_id.is_null() && self.body.is_null()
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A one-dimensional array of values of a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    /// Element type. `Variant` for heterogeneous arrays.
    pub element_type: OpcUaDataType,
    /// Elements.
    pub values: Vec<Variant>,
}

impl Array {
    /// Creates an array.
    pub fn new(element_type: OpcUaDataType, values: Vec<Variant>) -> Self {
        Self {
            element_type,
            values,
        }
    }

    /// Creates an empty array of the given element type.
    pub fn empty(element_type: OpcUaDataType) -> Self {
        Self::new(element_type, Vec::new())
    }
}

/// An OPC UA value of any built-in type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// Null value.
    #[default]
    Empty,
    /// Boolean value.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String value.
    String(String),
    /// Date/time value.
    DateTime(DateTime<Utc>),
    /// GUID value.
    Guid(Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// XML element.
    XmlElement(String),
    /// Node ID.
    NodeId(Box<NodeId>),
    /// Expanded node ID.
    ExpandedNodeId(Box<ExpandedNodeId>),
    /// Status code.
    StatusCode(StatusCode),
    /// Qualified name.
    QualifiedName(Box<QualifiedName>),
    /// Localized text.
    LocalizedText(Box<LocalizedText>),
    /// Structure.
    ExtensionObject(Box<ExtensionObject>),
    /// Data value.
    DataValue(Box<DataValue>),
    /// Array of values.
    Array(Box<Array>),
}

impl Variant {
    /// Returns the data type of this value. Arrays report their element type.
    pub fn data_type(&self) -> OpcUaDataType {
        match self {
            Self::Empty => OpcUaDataType::Null,
            Self::Boolean(_) => OpcUaDataType::Boolean,
            Self::SByte(_) => OpcUaDataType::SByte,
            Self::Byte(_) => OpcUaDataType::Byte,
            Self::Int16(_) => OpcUaDataType::Int16,
            Self::UInt16(_) => OpcUaDataType::UInt16,
            Self::Int32(_) => OpcUaDataType::Int32,
            Self::UInt32(_) => OpcUaDataType::UInt32,
            Self::Int64(_) => OpcUaDataType::Int64,
            Self::UInt64(_) => OpcUaDataType::UInt64,
            Self::Float(_) => OpcUaDataType::Float,
            Self::Double(_) => OpcUaDataType::Double,
            Self::String(_) => OpcUaDataType::String,
            Self::DateTime(_) => OpcUaDataType::DateTime,
            Self::Guid(_) => OpcUaDataType::Guid,
            Self::ByteString(_) => OpcUaDataType::ByteString,
            Self::XmlElement(_) => OpcUaDataType::XmlElement,
            Self::NodeId(_) => OpcUaDataType::NodeId,
            Self::ExpandedNodeId(_) => OpcUaDataType::ExpandedNodeId,
            Self::StatusCode(_) => OpcUaDataType::StatusCode,
            Self::QualifiedName(_) => OpcUaDataType::QualifiedName,
            Self::LocalizedText(_) => OpcUaDataType::LocalizedText,
            Self::ExtensionObject(_) => OpcUaDataType::ExtensionObject,
            Self::DataValue(_) => OpcUaDataType::DataValue,
            Self::Array(a) => a.element_type,
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if this is an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns the array elements.
    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Self::Array(a) => Some(&a.values),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get an integer value as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::SByte(v) => Some(*v as i64),
            Self::Byte(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::UInt16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::UInt32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to get an integer value as u32.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|v| u32::try_from(v).ok())
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Attempts to get the value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::XmlElement(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to get the value as a node id.
    pub fn as_node_id(&self) -> Option<&NodeId> {
        match self {
            Self::NodeId(v) => Some(v),
            Self::ExpandedNodeId(v) => Some(&v.node_id),
            _ => None,
        }
    }

    /// Attempts to get the value as a localized text.
    pub fn as_localized_text(&self) -> Option<&LocalizedText> {
        match self {
            Self::LocalizedText(v) => Some(v),
            _ => None,
        }
    }

    /// Creates an array variant.
    pub fn array(element_type: OpcUaDataType, values: Vec<Variant>) -> Self {
        Self::Array(Box::new(Array::new(element_type, values)))
    }

    /// Returns the default value of a scalar of the given type.
    pub fn default_for(data_type: OpcUaDataType) -> Self {
        match data_type {
            OpcUaDataType::Boolean => Self::Boolean(false),
            OpcUaDataType::SByte => Self::SByte(0),
            OpcUaDataType::Byte => Self::Byte(0),
            OpcUaDataType::Int16 => Self::Int16(0),
            OpcUaDataType::UInt16 => Self::UInt16(0),
            OpcUaDataType::Int32 | OpcUaDataType::Enumeration => Self::Int32(0),
            OpcUaDataType::UInt32 => Self::UInt32(0),
            OpcUaDataType::Int64 => Self::Int64(0),
            OpcUaDataType::UInt64 => Self::UInt64(0),
            OpcUaDataType::Float => Self::Float(0.0),
            OpcUaDataType::Double => Self::Double(0.0),
            OpcUaDataType::StatusCode => Self::StatusCode(StatusCode::GOOD),
            _ => Self::Empty,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) | Self::XmlElement(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::NodeId(v) => write!(f, "{}", v),
            Self::ExpandedNodeId(v) => write!(f, "{}", v),
            Self::StatusCode(v) => write!(f, "{}", v),
            Self::QualifiedName(v) => write!(f, "{}", v),
            Self::LocalizedText(v) => write!(f, "{}", v),
            Self::ExtensionObject(v) => write!(f, "<{}>", v.type_id),
            Self::DataValue(v) => write!(f, "{}", v.value),
            Self::Array(v) => write!(f, "[{} x {}]", v.values.len(), v.element_type),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
    StatusCode => StatusCode,
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NodeId> for Variant {
    fn from(v: NodeId) -> Self {
        Self::NodeId(Box::new(v))
    }
}

impl From<QualifiedName> for Variant {
    fn from(v: QualifiedName) -> Self {
        Self::QualifiedName(Box::new(v))
    }
}

impl From<LocalizedText> for Variant {
    fn from(v: LocalizedText) -> Self {
        Self::LocalizedText(Box::new(v))
    }
}

impl From<ExtensionObject> for Variant {
    fn from(v: ExtensionObject) -> Self {
        Self::ExtensionObject(Box::new(v))
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value with its status and timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// The value.
    pub value: Variant,
    /// Status of the value.
    pub status: StatusCode,
    /// Time the source produced the value.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Sub-tick of the source timestamp.
    pub source_picoseconds: Option<u16>,
    /// Time the server delivered the value.
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Sub-tick of the server timestamp.
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// A good value without timestamps.
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// A value stamped with the current time as source and server timestamp.
    pub fn now(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            source_timestamp: Some(now),
            server_timestamp: Some(now),
            ..Default::default()
        }
    }

    /// A value-less result carrying a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            server_timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// IndexRange
// =============================================================================

/// Selection of a single element or an inclusive range of a one-dimensional
/// value (array, string or byte string).
///
/// ```
/// use uapub_nodes::variant::IndexRange;
///
/// let range: IndexRange = "1:3".parse().unwrap();
/// assert_eq!(range, IndexRange::Range(1, 3));
/// assert!("3:1".parse::<IndexRange>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRange {
    /// Single index.
    Index(usize),
    /// Inclusive range `start..=end` with `start < end`.
    Range(usize, usize),
}

impl IndexRange {
    fn bounds(&self) -> (usize, usize) {
        match *self {
            Self::Index(i) => (i, i),
            Self::Range(a, b) => (a, b),
        }
    }

    /// Selects the range of a value.
    ///
    /// Ranges extending past the end are truncated; a range that starts past
    /// the end yields `IndexRangeNoData`.
    pub fn read(&self, value: &Variant) -> OpcUaResult<Variant> {
        let (start, end) = self.bounds();
        let no_data = || OpcUaError::conversion(ConversionError::index_range_no_data(self.to_string()));
        match value {
            Variant::Array(array) => {
                if start >= array.values.len() {
                    return Err(no_data());
                }
                let end = end.min(array.values.len() - 1);
                Ok(Variant::array(
                    array.element_type,
                    array.values[start..=end].to_vec(),
                ))
            }
            Variant::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                if start >= chars.len() {
                    return Err(no_data());
                }
                let end = end.min(chars.len() - 1);
                Ok(Variant::String(chars[start..=end].iter().collect()))
            }
            Variant::ByteString(bytes) => {
                if start >= bytes.len() {
                    return Err(no_data());
                }
                let end = end.min(bytes.len() - 1);
                Ok(Variant::ByteString(bytes[start..=end].to_vec()))
            }
            _ => Err(no_data()),
        }
    }

    /// Replaces the selected range of `target` with `value`.
    ///
    /// The replacement must have exactly as many elements as the range selects.
    pub fn write(&self, target: &mut Variant, value: Variant) -> OpcUaResult<()> {
        let (start, end) = self.bounds();
        let no_data = || OpcUaError::conversion(ConversionError::index_range_no_data(self.to_string()));
        // no value can hold more than usize::MAX elements
        let count = end
            .checked_sub(start)
            .and_then(|span| span.checked_add(1))
            .ok_or_else(no_data)?;
        let mismatch = |actual: usize| {
            OpcUaError::conversion(ConversionError::invalid_value(
                "IndexRange",
                format!("range selects {} elements, value has {}", count, actual),
            ))
        };
        match (target, value) {
            (Variant::Array(array), Variant::Array(replacement)) => {
                if end >= array.values.len() {
                    return Err(no_data());
                }
                if replacement.values.len() != count {
                    return Err(mismatch(replacement.values.len()));
                }
                array.values.splice(start..=end, replacement.values);
                Ok(())
            }
            (Variant::Array(array), scalar) if count == 1 => {
                let slot = array.values.get_mut(start).ok_or_else(no_data)?;
                *slot = scalar;
                Ok(())
            }
            (Variant::String(s), Variant::String(replacement)) => {
                let mut chars: Vec<char> = s.chars().collect();
                if end >= chars.len() {
                    return Err(no_data());
                }
                let replacement: Vec<char> = replacement.chars().collect();
                if replacement.len() != count {
                    return Err(mismatch(replacement.len()));
                }
                chars.splice(start..=end, replacement);
                *s = chars.into_iter().collect();
                Ok(())
            }
            (Variant::ByteString(bytes), Variant::ByteString(replacement)) => {
                if end >= bytes.len() {
                    return Err(no_data());
                }
                if replacement.len() != count {
                    return Err(mismatch(replacement.len()));
                }
                bytes.splice(start..=end, replacement);
                Ok(())
            }
            (target, value) => Err(OpcUaError::conversion(ConversionError::type_mismatch(
                target.data_type().name(),
                value.data_type().name(),
            ))),
        }
    }
}

impl std::str::FromStr for IndexRange {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            OpcUaError::conversion(ConversionError::invalid_index_range(s, reason))
        };
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| invalid("indices must be non-negative integers"))
        };
        if s.contains(',') {
            return Err(invalid("multi-dimensional ranges are not supported"));
        }
        match s.split_once(':') {
            None => parse(s).map(Self::Index),
            Some((a, b)) => {
                let (a, b) = (parse(a)?, parse(b)?);
                if a >= b {
                    return Err(invalid("range start must be below range end"));
                }
                Ok(Self::Range(a, b))
            }
        }
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Range(a, b) => write!(f, "{}:{}", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i32]) -> Variant {
        Variant::array(
            OpcUaDataType::Int32,
            values.iter().copied().map(Variant::Int32).collect(),
        )
    }

    #[test]
    fn test_empty_array_keeps_type() {
        let v = Variant::array(OpcUaDataType::Guid, vec![]);
        assert!(v.is_array());
        assert_eq!(v.data_type(), OpcUaDataType::Guid);
        assert_eq!(v.as_array().map(<[Variant]>::len), Some(0));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Variant::from(7u16).as_i64(), Some(7));
        assert_eq!(Variant::from(7u16).as_u32(), Some(7));
        assert_eq!(Variant::from(-1i32).as_u32(), None);
        assert_eq!(Variant::from(1.5f32).as_f64(), Some(1.5));
        assert_eq!(Variant::from("x").as_str(), Some("x"));
        assert!(Variant::default().is_null());
    }

    #[test]
    fn test_index_range_parse() {
        assert_eq!("2".parse::<IndexRange>().unwrap(), IndexRange::Index(2));
        assert!("2:2".parse::<IndexRange>().is_err());
        assert!("a".parse::<IndexRange>().is_err());
        assert!("1:2,0:1".parse::<IndexRange>().is_err());
        let err = "-1".parse::<IndexRange>().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_INDEX_RANGE_INVALID);
    }

    #[test]
    fn test_index_range_read() {
        let value = ints(&[1, 2, 3, 4]);
        assert_eq!(IndexRange::Range(1, 2).read(&value).unwrap(), ints(&[2, 3]));
        assert_eq!(IndexRange::Range(2, 9).read(&value).unwrap(), ints(&[3, 4]));
        let err = IndexRange::Index(4).read(&value).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_INDEX_RANGE_NO_DATA);

        let s = Variant::String("hello".into());
        assert_eq!(IndexRange::Range(1, 3).read(&s).unwrap(), Variant::String("ell".into()));
    }

    #[test]
    fn test_index_range_write() {
        let mut value = ints(&[1, 2, 3, 4]);
        IndexRange::Range(1, 2).write(&mut value, ints(&[9, 8])).unwrap();
        assert_eq!(value, ints(&[1, 9, 8, 4]));

        IndexRange::Index(0).write(&mut value, Variant::Int32(5)).unwrap();
        assert_eq!(value, ints(&[5, 9, 8, 4]));

        assert!(IndexRange::Range(0, 1).write(&mut value, ints(&[1])).is_err());
        assert!(IndexRange::Range(3, 5).write(&mut value, ints(&[1, 2, 3])).is_err());
    }

    #[test]
    fn test_index_range_write_to_usize_max() {
        let range: IndexRange = format!("0:{}", usize::MAX).parse().unwrap();
        let mut value = ints(&[1, 2, 3, 4]);
        let err = range.write(&mut value, ints(&[9, 9])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_INDEX_RANGE_NO_DATA);

        let range: IndexRange = format!("1:{}", usize::MAX).parse().unwrap();
        let err = range.write(&mut value, ints(&[9, 9, 9])).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_INDEX_RANGE_NO_DATA);
        assert_eq!(value, ints(&[1, 2, 3, 4]));

        // reads of the same range are truncated
        assert_eq!(range.read(&value).unwrap(), ints(&[2, 3, 4]));
    }

    #[test]
    fn test_data_value_now_has_timestamps() {
        let dv = DataValue::now(1.0f64);
        assert!(dv.is_good());
        assert!(dv.source_timestamp.is_some());
        assert!(dv.server_timestamp.is_some());
    }
}
