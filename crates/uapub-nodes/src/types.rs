// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA identifier and enumeration types shared by all node services.
//!
//! - **NodeId / ExpandedNodeId**: all four identifier kinds with parsing of the
//!   index (`ns=2;s=Name`), uri (`nsu=…;i=1`, `http://uri/#i=1`) and data type
//!   name (`Double`) forms, normalized through a [`NamespaceTable`]
//! - **QualifiedName / LocalizedText**: browse and display names
//! - **OpcUaDataType**: built-in and abstract data types
//! - **NodeClass / AttributeId / BrowseDirection**: protocol enumerations
//! - **reference_types**: well-known reference type ids and names
//!
//! # Examples
//!
//! ```
//! use uapub_nodes::types::{NamespaceTable, NodeId};
//!
//! let mut table = NamespaceTable::default();
//! let ns = table.get_or_add("http://test.org/UA/Data/");
//!
//! let node = NodeId::parse_with("http://test.org/UA/Data/#i=10157", &table).unwrap();
//! assert_eq!(node, NodeId::numeric(ns, 10157));
//! assert_eq!(node.format_with(&table), "http://test.org/UA/Data/#i=10157");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};

/// Uri of the OPC UA standard namespace (index 0).
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

// =============================================================================
// NamespaceTable
// =============================================================================

/// The namespace array of a server session.
///
/// Index 0 is always the OPC UA standard namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates a table from the server's namespace array.
    ///
    /// The standard namespace is inserted at index 0 when missing.
    pub fn new<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut uris: Vec<String> = uris.into_iter().map(Into::into).collect();
        if uris.first().map(String::as_str) != Some(OPC_UA_NAMESPACE_URI) {
            uris.insert(0, OPC_UA_NAMESPACE_URI.to_string());
        }
        Self { uris }
    }

    /// Returns the index of a namespace uri.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        let trimmed = uri.trim_end_matches('/');
        self.uris
            .iter()
            .position(|u| u == uri || u.trim_end_matches('/') == trimmed)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Returns the uri of a namespace index.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }

    /// Returns the index of `uri`, appending it when unknown.
    pub fn get_or_add(&mut self, uri: impl Into<String>) -> u16 {
        let uri = uri.into();
        if let Some(index) = self.index_of(&uri) {
            return index;
        }
        self.uris.push(uri);
        (self.uris.len() - 1) as u16
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Always `false`: the standard namespace is always present.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Returns the uris in index order.
    pub fn as_slice(&self) -> &[String] {
        &self.uris
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId uniquely identifies a node within an OPC UA server.
/// It consists of a namespace index and an identifier which can be
/// numeric, string, GUID, or opaque (byte string).
///
/// Serialized as its index form string (`ns=2;s=Name`).
///
/// # Examples
///
/// ```
/// use uapub_nodes::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let parsed: NodeId = "ns=2;i=1001".parse().unwrap();
/// assert_eq!(numeric, parsed);
///
/// // data type names are shorthand for their namespace 0 id
/// let double: NodeId = "double".parse().unwrap();
/// assert_eq!(double, NodeId::numeric(0, 11));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    // =========================================================================
    // Standard Node IDs
    // =========================================================================

    /// Root folder node (ns=0, i=84).
    pub const ROOT_FOLDER: NodeId = NodeId::numeric(0, 84);

    /// Objects folder node (ns=0, i=85).
    pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);

    /// Types folder node (ns=0, i=86).
    pub const TYPES_FOLDER: NodeId = NodeId::numeric(0, 86);

    /// Views folder node (ns=0, i=87).
    pub const VIEWS_FOLDER: NodeId = NodeId::numeric(0, 87);

    /// Server node (ns=0, i=2253).
    pub const SERVER: NodeId = NodeId::numeric(0, 2253);

    /// BaseObjectType (ns=0, i=58).
    pub const BASE_OBJECT_TYPE: NodeId = NodeId::numeric(0, 58);

    /// FolderType (ns=0, i=61).
    pub const FOLDER_TYPE: NodeId = NodeId::numeric(0, 61);

    /// BaseVariableType (ns=0, i=62).
    pub const BASE_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 62);

    /// BaseDataVariableType (ns=0, i=63).
    pub const BASE_DATA_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 63);

    /// PropertyType (ns=0, i=68).
    pub const PROPERTY_TYPE: NodeId = NodeId::numeric(0, 68);

    /// Argument data type (ns=0, i=296).
    pub const ARGUMENT: NodeId = NodeId::numeric(0, 296);

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns `true` if this is a numeric identifier.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if this is in the standard namespace (ns=0).
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    /// Returns `true` if this is a null node ID (ns=0, i=0).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self::numeric(0, 0)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the namespace 0 numeric value, if any.
    #[inline]
    pub fn as_standard_numeric(&self) -> Option<u32> {
        if self.namespace_index == 0 {
            self.as_numeric()
        } else {
            None
        }
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts to the OPC UA index string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`
    ///
    /// ```
    /// use uapub_nodes::types::NodeId;
    ///
    /// assert_eq!(NodeId::numeric(2, 1001).to_opc_string(), "ns=2;i=1001");
    /// assert_eq!(NodeId::string(0, "MyNode").to_opc_string(), "s=MyNode");
    /// ```
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }

    /// Formats the node id in its canonical absolute form.
    ///
    /// Namespace 0 ids use the bare identifier (`i=85`); other namespaces use
    /// `<uri>#<identifier>` with the reserved characters of string identifiers
    /// percent-encoded. Indices missing from the table fall back to the index
    /// form.
    pub fn format_with(&self, namespaces: &NamespaceTable) -> String {
        if self.namespace_index == 0 {
            return self.identifier.to_string();
        }
        match namespaces.uri(self.namespace_index) {
            Some(uri) => match &self.identifier {
                NodeIdentifier::String(s) => format!("{}#s={}", uri, percent_encode(s)),
                other => format!("{}#{}", uri, other),
            },
            None => self.to_opc_string(),
        }
    }

    /// Parses any accepted textual form against a namespace table.
    ///
    /// Supported formats:
    /// - `i=1001`, `s=MyNode`, `g=<uuid>`, `b=<base64>` (namespace 0)
    /// - `ns=2;i=1001` (namespace index)
    /// - `nsu=http://uri/;s=MyNode` (namespace uri)
    /// - `http://uri/#i=1001` (namespace uri + fragment)
    /// - `Double`, `localizedtext`, … (built-in data type names)
    pub fn parse_with(s: &str, namespaces: &NamespaceTable) -> OpcUaResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(invalid(s, "Empty node id"));
        }

        if let Some(rest) = s.strip_prefix("nsu=") {
            let (uri, id) = rest
                .split_once(';')
                .ok_or_else(|| invalid(s, "Missing identifier after namespace uri"))?;
            let namespace_index = namespaces.index_of(uri).ok_or_else(|| {
                OpcUaError::configuration(ConfigurationError::unknown_namespace(uri))
            })?;
            let identifier = NodeIdentifier::parse(id, false).map_err(|r| invalid(s, r))?;
            return Ok(Self {
                namespace_index,
                identifier,
            });
        }

        if let Some(rest) = s.strip_prefix("ns=") {
            let (ns, id) = rest
                .split_once(';')
                .ok_or_else(|| invalid(s, "Missing identifier after namespace"))?;
            let namespace_index: u16 = ns
                .parse()
                .map_err(|_| invalid(s, "Invalid namespace index"))?;
            let identifier = NodeIdentifier::parse(id, false).map_err(|r| invalid(s, r))?;
            return Ok(Self {
                namespace_index,
                identifier,
            });
        }

        if let Some((uri, id)) = split_uri_form(s) {
            let namespace_index = namespaces.index_of(uri).ok_or_else(|| {
                OpcUaError::configuration(ConfigurationError::unknown_namespace(uri))
            })?;
            let identifier = NodeIdentifier::parse(id, true).map_err(|r| invalid(s, r))?;
            return Ok(Self {
                namespace_index,
                identifier,
            });
        }

        match NodeIdentifier::parse(s, false) {
            Ok(identifier) => Ok(Self {
                namespace_index: 0,
                identifier,
            }),
            Err(reason) => OpcUaDataType::from_name(s)
                .map(|dt| dt.node_id())
                .ok_or_else(|| invalid(s, reason)),
        }
    }
}

fn invalid(node_id: &str, reason: impl Into<String>) -> OpcUaError {
    OpcUaError::configuration(ConfigurationError::invalid_node_id(node_id, reason))
}

/// Splits `<uri>#<rest>` where the part before the first `#` is a uri.
fn split_uri_form(s: &str) -> Option<(&str, &str)> {
    let (uri, rest) = s.split_once('#')?;
    if uri.contains(':') {
        Some((uri, rest))
    } else {
        None
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ';' => out.push_str("%3B"),
            '#' => out.push_str("%23"),
            '&' => out.push_str("%26"),
            other => out.push(other),
        }
    }
    out
}

fn percent_decode(s: &str) -> Result<String, String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .ok_or_else(|| "Truncated percent escape".to_string())?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| format!("Invalid percent escape '%{}'", hex))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| e.to_string())
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses against a table holding only the standard namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, &NamespaceTable::default())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_opc_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier (most efficient, commonly used for standard nodes).
    Numeric(u32),

    /// String identifier (human-readable, used for custom nodes).
    String(String),

    /// GUID identifier (globally unique).
    Guid(Uuid),

    /// Opaque identifier (application-specific byte array).
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Returns the identifier type prefix for OPC UA string format.
    pub const fn type_prefix(&self) -> char {
        match self {
            Self::Numeric(_) => 'i',
            Self::String(_) => 's',
            Self::Guid(_) => 'g',
            Self::Opaque(_) => 'b',
        }
    }

    fn parse(s: &str, percent_encoded: bool) -> Result<Self, String> {
        if let Some(id) = s.strip_prefix("i=") {
            id.parse()
                .map(Self::Numeric)
                .map_err(|_| "Invalid numeric identifier".to_string())
        } else if let Some(id) = s.strip_prefix("s=") {
            if percent_encoded {
                percent_decode(id).map(Self::String)
            } else {
                Ok(Self::String(id.to_string()))
            }
        } else if let Some(id) = s.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(Self::Guid)
                .map_err(|e| format!("Invalid GUID: {}", e))
        } else if let Some(id) = s.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(Self::Opaque)
                .map_err(|e| format!("Invalid base64: {}", e))
        } else {
            Err("Unknown identifier type. Expected i=, s=, g=, or b=".to_string())
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// ExpandedNodeId
// =============================================================================

/// A node id that may reference a namespace by uri or another server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ExpandedNodeId {
    /// The node id. Its namespace index is ignored when `namespace_uri` is set.
    pub node_id: NodeId,
    /// Namespace uri, if the id is not resolved to an index.
    pub namespace_uri: Option<String>,
    /// Index of the server holding the node (0 = local).
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Wraps a local node id.
    pub fn local(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }

    /// Returns `true` when the node lives on the local server.
    pub fn is_local(&self) -> bool {
        self.server_index == 0
    }

    /// Resolves to a local node id, or `None` for remote or unknown namespaces.
    pub fn to_node_id(&self, namespaces: &NamespaceTable) -> Option<NodeId> {
        if !self.is_local() {
            return None;
        }
        match &self.namespace_uri {
            None => Some(self.node_id.clone()),
            Some(uri) => namespaces.index_of(uri).map(|namespace_index| NodeId {
                namespace_index,
                identifier: self.node_id.identifier.clone(),
            }),
        }
    }

    /// Formats in canonical form, like [`NodeId::format_with`].
    pub fn format_with(&self, namespaces: &NamespaceTable) -> String {
        let base = match (&self.namespace_uri, self.to_node_id(namespaces)) {
            (_, Some(local)) => local.format_with(namespaces),
            (Some(uri), None) => match &self.node_id.identifier {
                NodeIdentifier::String(s) => format!("{}#s={}", uri, percent_encode(s)),
                other => format!("{}#{}", uri, other),
            },
            (None, None) => self.node_id.to_opc_string(),
        };
        if self.server_index == 0 {
            base
        } else {
            format!("svr={};{}", self.server_index, base)
        }
    }

    /// Parses like [`NodeId::parse_with`], keeping unknown namespace uris
    /// instead of failing and accepting a `svr=<index>;` prefix.
    pub fn parse_with(s: &str, namespaces: &NamespaceTable) -> OpcUaResult<Self> {
        let s = s.trim();
        let (server_index, rest) = match s.strip_prefix("svr=") {
            Some(rest) => {
                let (svr, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid(s, "Missing identifier after server index"))?;
                let index: u32 = svr.parse().map_err(|_| invalid(s, "Invalid server index"))?;
                (index, id)
            }
            None => (0, s),
        };

        let uri_and_id = rest
            .strip_prefix("nsu=")
            .and_then(|r| r.split_once(';'))
            .map(|(uri, id)| (uri, id, false))
            .or_else(|| split_uri_form(rest).map(|(uri, id)| (uri, id, true)));

        if let Some((uri, id, encoded)) = uri_and_id {
            if namespaces.index_of(uri).is_none() {
                let identifier = NodeIdentifier::parse(id, encoded).map_err(|r| invalid(s, r))?;
                return Ok(Self {
                    node_id: NodeId {
                        namespace_index: 0,
                        identifier,
                    },
                    namespace_uri: Some(uri.to_string()),
                    server_index,
                });
            }
        }

        Ok(Self {
            node_id: NodeId::parse_with(rest, namespaces)?,
            namespace_uri: None,
            server_index,
        })
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self::local(node_id)
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace_uri {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

// =============================================================================
// QualifiedName / LocalizedText
// =============================================================================

/// OPC UA qualified name (namespace-scoped browse name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Creates a qualified name in the standard namespace.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(0, name)
    }

    /// Returns `true` when the name is empty.
    pub fn is_null(&self) -> bool {
        self.name.is_empty()
    }

    /// Formats as `name` (namespace 0), `<uri>#name` or `ns:name`.
    pub fn format_with(&self, namespaces: &NamespaceTable) -> String {
        if self.namespace_index == 0 {
            return self.name.clone();
        }
        match namespaces.uri(self.namespace_index) {
            Some(uri) => format!("{}#{}", uri, self.name),
            None => format!("{}:{}", self.namespace_index, self.name),
        }
    }

    /// Parses `name`, `ns:name` or `<uri>#name`.
    pub fn parse_with(s: &str, namespaces: &NamespaceTable) -> OpcUaResult<Self> {
        if let Some((uri, name)) = split_uri_form(s) {
            let namespace_index = namespaces.index_of(uri).ok_or_else(|| {
                OpcUaError::configuration(ConfigurationError::unknown_namespace(uri))
            })?;
            return Ok(Self::new(namespace_index, name));
        }
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(namespace_index) = ns.parse::<u16>() {
                return Ok(Self::new(namespace_index, name));
            }
        }
        Ok(Self::standard(s))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        match s.split_once(':') {
            Some((ns, name)) => match ns.parse::<u16>() {
                Ok(namespace_index) => Self::new(namespace_index, name),
                Err(_) => Self::standard(s),
            },
            None => Self::standard(s),
        }
    }
}

/// Human readable text with an optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    /// Locale, e.g. `en-US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// The text.
    pub text: String,
}

impl LocalizedText {
    /// Creates a text without locale.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            locale: None,
            text: text.into(),
        }
    }

    /// Creates a text with locale.
    pub fn with_locale(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.into()),
            text: text.into(),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// =============================================================================
// OpcUaDataType
// =============================================================================

/// OPC UA data types understood by the value codec.
///
/// Covers the built-in types plus the abstract `Number`, `Integer`,
/// `UInteger`, `Enumeration` and `Structure` families whose values are
/// exchanged in tagged `{Type, Body}` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OpcUaDataType {
    /// Null / no type.
    Null,
    /// Boolean value.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit IEEE 754 float.
    Float,
    /// 64-bit IEEE 754 double.
    Double,
    /// UTF-8 string.
    String,
    /// Date and time.
    DateTime,
    /// GUID.
    Guid,
    /// Raw byte string.
    ByteString,
    /// XML element.
    XmlElement,
    /// Node ID.
    NodeId,
    /// Expanded node ID.
    ExpandedNodeId,
    /// Status code.
    StatusCode,
    /// Qualified name.
    QualifiedName,
    /// Localized text.
    LocalizedText,
    /// Extension object (Structure).
    ExtensionObject,
    /// Data value.
    DataValue,
    /// Variant (BaseDataType, can contain any type).
    #[default]
    Variant,
    /// Abstract Number.
    Number,
    /// Abstract Integer.
    Integer,
    /// Abstract UInteger.
    UInteger,
    /// Enumeration, transported as Int32.
    Enumeration,
}

impl OpcUaDataType {
    /// All types, in type id order.
    pub const ALL: [OpcUaDataType; 29] = [
        Self::Null,
        Self::Boolean,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::DateTime,
        Self::Guid,
        Self::ByteString,
        Self::XmlElement,
        Self::NodeId,
        Self::ExpandedNodeId,
        Self::StatusCode,
        Self::QualifiedName,
        Self::LocalizedText,
        Self::ExtensionObject,
        Self::DataValue,
        Self::Variant,
        Self::Number,
        Self::Integer,
        Self::UInteger,
        Self::Enumeration,
    ];

    /// Returns the namespace 0 data type id.
    pub const fn type_id(&self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
            Self::Guid => 14,
            Self::ByteString => 15,
            Self::XmlElement => 16,
            Self::NodeId => 17,
            Self::ExpandedNodeId => 18,
            Self::StatusCode => 19,
            Self::QualifiedName => 20,
            Self::LocalizedText => 21,
            Self::ExtensionObject => 22,
            Self::DataValue => 23,
            Self::Variant => 24,
            Self::Number => 26,
            Self::Integer => 27,
            Self::UInteger => 28,
            Self::Enumeration => 29,
        }
    }

    /// Returns the data type node id.
    pub const fn node_id(&self) -> NodeId {
        NodeId::numeric(0, self.type_id())
    }

    /// Looks up a type by its namespace 0 id.
    pub fn from_type_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.type_id() == id)
    }

    /// Looks up a type by data type node id.
    ///
    /// Only namespace 0 ids are known; derived types of other namespaces
    /// must be resolved through the type hierarchy first.
    pub fn from_node_id(node_id: &NodeId) -> Option<Self> {
        node_id.as_standard_numeric().and_then(Self::from_type_id)
    }

    /// Looks up a type by its exact name, case-insensitively.
    ///
    /// `Structure` and `BaseDataType` are accepted as the names of the
    /// corresponding data type nodes.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("Structure") {
            return Some(Self::ExtensionObject);
        }
        if name.eq_ignore_ascii_case("BaseDataType") {
            return Some(Self::Variant);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Returns `true` if this is a numeric type.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns `true` if this is an integer type.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Enumeration
        )
    }

    /// Returns `true` if this is a floating point type.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns `true` if this is a signed type.
    #[inline]
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Float
                | Self::Double
                | Self::Enumeration
        )
    }

    /// Returns `true` for types whose values carry their concrete type in a
    /// `{Type, Body}` envelope.
    #[inline]
    pub const fn is_abstract(&self) -> bool {
        matches!(
            self,
            Self::Variant | Self::Number | Self::Integer | Self::UInteger
        )
    }

    /// Returns `true` if a value of type `concrete` may be stored in a node of
    /// this (possibly abstract) type.
    pub fn accepts(&self, concrete: OpcUaDataType) -> bool {
        match self {
            Self::Variant => true,
            Self::Number => concrete.is_numeric(),
            Self::Integer => matches!(
                concrete,
                Self::SByte | Self::Int16 | Self::Int32 | Self::Int64
            ),
            Self::UInteger => matches!(
                concrete,
                Self::Byte | Self::UInt16 | Self::UInt32 | Self::UInt64
            ),
            Self::Enumeration => matches!(concrete, Self::Int32 | Self::Enumeration),
            other => *other == concrete,
        }
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::XmlElement => "XmlElement",
            Self::NodeId => "NodeId",
            Self::ExpandedNodeId => "ExpandedNodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
            Self::ExtensionObject => "ExtensionObject",
            Self::DataValue => "DataValue",
            Self::Variant => "Variant",
            Self::Number => "Number",
            Self::Integer => "Integer",
            Self::UInteger => "UInteger",
            Self::Enumeration => "Enumeration",
        }
    }
}

impl fmt::Display for OpcUaDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OpcUaDataType {
    type Err = OpcUaError;

    /// Parses a type name, also accepting common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(t) = Self::from_name(s) {
            return Ok(t);
        }
        match s.to_lowercase().as_str() {
            "bool" => Ok(Self::Boolean),
            "int8" | "i8" => Ok(Self::SByte),
            "uint8" | "u8" => Ok(Self::Byte),
            "i16" | "short" => Ok(Self::Int16),
            "u16" | "ushort" => Ok(Self::UInt16),
            "i32" | "int" => Ok(Self::Int32),
            "u32" | "uint" => Ok(Self::UInt32),
            "i64" | "long" => Ok(Self::Int64),
            "u64" | "ulong" => Ok(Self::UInt64),
            "f32" | "single" => Ok(Self::Float),
            "f64" => Ok(Self::Double),
            "uuid" => Ok(Self::Guid),
            "bytes" => Ok(Self::ByteString),
            _ => Err(OpcUaError::conversion(
                crate::error::ConversionError::unknown_data_type(s),
            )),
        }
    }
}

// =============================================================================
// BrowseDirection
// =============================================================================

/// OPC UA browse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BrowseDirection {
    /// Browse forward references.
    #[default]
    Forward,

    /// Browse inverse references.
    Backward,

    /// Browse both forward and inverse references.
    Both,
}

impl BrowseDirection {
    /// Returns the OPC UA value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Backward => 1,
            Self::Both => 2,
        }
    }

    /// Returns `true` if a reference with the given forward flag matches.
    pub const fn matches(&self, is_forward: bool) -> bool {
        match self {
            Self::Forward => is_forward,
            Self::Backward => !is_forward,
            Self::Both => true,
        }
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeClass {
    /// No class known.
    #[default]
    Unspecified,
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Builds a node class mask; an empty set yields 0 (all classes).
    pub fn mask(classes: &[NodeClass]) -> u32 {
        classes.iter().fold(0, |mask, c| mask | c.value())
    }

    /// Returns `true` if this class passes the given mask (0 = all).
    pub const fn matches_mask(&self, mask: u32) -> bool {
        mask == 0 || self.value() & mask != 0
    }

    /// Returns `true` if this node class can have a value.
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Variable | Self::VariableType)
    }

    /// Returns `true` for type definition classes.
    pub const fn is_type(&self) -> bool {
        matches!(
            self,
            Self::ObjectType | Self::VariableType | Self::ReferenceType | Self::DataType
        )
    }

    /// Returns the name of the class.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
            Self::ObjectType => "ObjectType",
            Self::VariableType => "VariableType",
            Self::ReferenceType => "ReferenceType",
            Self::DataType => "DataType",
            Self::View => "View",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Write mask attribute.
    WriteMask,
    /// User write mask attribute.
    UserWriteMask,
    /// Is abstract attribute.
    IsAbstract,
    /// Symmetric attribute.
    Symmetric,
    /// Inverse name attribute.
    InverseName,
    /// Contains no loops attribute.
    ContainsNoLoops,
    /// Event notifier attribute.
    EventNotifier,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Value rank attribute.
    ValueRank,
    /// Array dimensions attribute.
    ArrayDimensions,
    /// Access level attribute.
    AccessLevel,
    /// User access level attribute.
    UserAccessLevel,
    /// Minimum sampling interval attribute.
    MinimumSamplingInterval,
    /// Historizing attribute.
    Historizing,
    /// Executable attribute.
    Executable,
    /// User executable attribute.
    UserExecutable,
    /// Data type definition attribute.
    DataTypeDefinition,
    /// Role permissions attribute.
    RolePermissions,
    /// User role permissions attribute.
    UserRolePermissions,
    /// Access restrictions attribute.
    AccessRestrictions,
    /// Extended access level attribute.
    AccessLevelEx,
}

impl AttributeId {
    /// All attributes in id order.
    pub const ALL: [AttributeId; 27] = [
        Self::NodeId,
        Self::NodeClass,
        Self::BrowseName,
        Self::DisplayName,
        Self::Description,
        Self::WriteMask,
        Self::UserWriteMask,
        Self::IsAbstract,
        Self::Symmetric,
        Self::InverseName,
        Self::ContainsNoLoops,
        Self::EventNotifier,
        Self::Value,
        Self::DataType,
        Self::ValueRank,
        Self::ArrayDimensions,
        Self::AccessLevel,
        Self::UserAccessLevel,
        Self::MinimumSamplingInterval,
        Self::Historizing,
        Self::Executable,
        Self::UserExecutable,
        Self::DataTypeDefinition,
        Self::RolePermissions,
        Self::UserRolePermissions,
        Self::AccessRestrictions,
        Self::AccessLevelEx,
    ];

    /// Returns the OPC UA numeric value.
    pub fn value(&self) -> u32 {
        Self::ALL
            .iter()
            .position(|a| a == self)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        value
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize).copied())
    }

    /// Returns the attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::WriteMask => "WriteMask",
            Self::UserWriteMask => "UserWriteMask",
            Self::IsAbstract => "IsAbstract",
            Self::Symmetric => "Symmetric",
            Self::InverseName => "InverseName",
            Self::ContainsNoLoops => "ContainsNoLoops",
            Self::EventNotifier => "EventNotifier",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::ArrayDimensions => "ArrayDimensions",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
            Self::MinimumSamplingInterval => "MinimumSamplingInterval",
            Self::Historizing => "Historizing",
            Self::Executable => "Executable",
            Self::UserExecutable => "UserExecutable",
            Self::DataTypeDefinition => "DataTypeDefinition",
            Self::RolePermissions => "RolePermissions",
            Self::UserRolePermissions => "UserRolePermissions",
            Self::AccessRestrictions => "AccessRestrictions",
            Self::AccessLevelEx => "AccessLevelEx",
        }
    }

    /// Returns the data type of the attribute's value, or `None` for
    /// `Value` whose type is the node's DataType.
    pub const fn data_type(&self) -> Option<OpcUaDataType> {
        match self {
            Self::NodeId | Self::DataType => Some(OpcUaDataType::NodeId),
            Self::NodeClass | Self::ValueRank => Some(OpcUaDataType::Int32),
            Self::BrowseName => Some(OpcUaDataType::QualifiedName),
            Self::DisplayName | Self::Description | Self::InverseName => {
                Some(OpcUaDataType::LocalizedText)
            }
            Self::WriteMask | Self::UserWriteMask | Self::AccessLevelEx => {
                Some(OpcUaDataType::UInt32)
            }
            Self::IsAbstract
            | Self::Symmetric
            | Self::ContainsNoLoops
            | Self::Historizing
            | Self::Executable
            | Self::UserExecutable => Some(OpcUaDataType::Boolean),
            Self::EventNotifier | Self::AccessLevel | Self::UserAccessLevel => {
                Some(OpcUaDataType::Byte)
            }
            Self::ArrayDimensions => Some(OpcUaDataType::UInt32),
            Self::MinimumSamplingInterval => Some(OpcUaDataType::Double),
            Self::DataTypeDefinition | Self::RolePermissions | Self::UserRolePermissions => {
                Some(OpcUaDataType::ExtensionObject)
            }
            Self::AccessRestrictions => Some(OpcUaDataType::UInt16),
            Self::Value => None,
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeId {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                OpcUaError::configuration(ConfigurationError::invalid_value(
                    "attribute",
                    format!("unknown attribute '{}'", s),
                ))
            })
    }
}

// =============================================================================
// Standard Reference Types (OPC UA Part 5)
// =============================================================================

/// Well-known reference type ids and their browse names.
pub mod reference_types {
    use super::NodeId;

    /// References (abstract base type) - i=31.
    pub const REFERENCES: NodeId = NodeId::numeric(0, 31);
    /// NonHierarchicalReferences (abstract) - i=32.
    pub const NON_HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 32);
    /// HierarchicalReferences (abstract) - i=33.
    pub const HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 33);
    /// HasChild (abstract) - i=34.
    pub const HAS_CHILD: NodeId = NodeId::numeric(0, 34);
    /// Organizes - i=35.
    pub const ORGANIZES: NodeId = NodeId::numeric(0, 35);
    /// HasEventSource - i=36.
    pub const HAS_EVENT_SOURCE: NodeId = NodeId::numeric(0, 36);
    /// HasModellingRule - i=37.
    pub const HAS_MODELLING_RULE: NodeId = NodeId::numeric(0, 37);
    /// HasEncoding - i=38.
    pub const HAS_ENCODING: NodeId = NodeId::numeric(0, 38);
    /// HasDescription - i=39.
    pub const HAS_DESCRIPTION: NodeId = NodeId::numeric(0, 39);
    /// HasTypeDefinition - i=40.
    pub const HAS_TYPE_DEFINITION: NodeId = NodeId::numeric(0, 40);
    /// GeneratesEvent - i=41.
    pub const GENERATES_EVENT: NodeId = NodeId::numeric(0, 41);
    /// Aggregates (abstract) - i=44.
    pub const AGGREGATES: NodeId = NodeId::numeric(0, 44);
    /// HasSubtype - i=45.
    pub const HAS_SUBTYPE: NodeId = NodeId::numeric(0, 45);
    /// HasProperty - i=46.
    pub const HAS_PROPERTY: NodeId = NodeId::numeric(0, 46);
    /// HasComponent - i=47.
    pub const HAS_COMPONENT: NodeId = NodeId::numeric(0, 47);
    /// HasNotifier - i=48.
    pub const HAS_NOTIFIER: NodeId = NodeId::numeric(0, 48);
    /// HasOrderedComponent - i=49.
    pub const HAS_ORDERED_COMPONENT: NodeId = NodeId::numeric(0, 49);

    const NAMES: &[(u32, &str)] = &[
        (31, "References"),
        (32, "NonHierarchicalReferences"),
        (33, "HierarchicalReferences"),
        (34, "HasChild"),
        (35, "Organizes"),
        (36, "HasEventSource"),
        (37, "HasModellingRule"),
        (38, "HasEncoding"),
        (39, "HasDescription"),
        (40, "HasTypeDefinition"),
        (41, "GeneratesEvent"),
        (44, "Aggregates"),
        (45, "HasSubtype"),
        (46, "HasProperty"),
        (47, "HasComponent"),
        (48, "HasNotifier"),
        (49, "HasOrderedComponent"),
    ];

    /// Returns the browse name of a standard reference type.
    pub fn name_of(id: &NodeId) -> Option<&'static str> {
        let value = id.as_standard_numeric()?;
        NAMES.iter().find(|(v, _)| *v == value).map(|(_, n)| *n)
    }

    /// Looks up a standard reference type by browse name (case-insensitive).
    pub fn from_name(name: &str) -> Option<NodeId> {
        NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(v, _)| NodeId::numeric(0, *v))
    }

    /// Returns the standard supertype of a standard reference type.
    pub fn supertype_of(id: &NodeId) -> Option<NodeId> {
        let parent = match id.as_standard_numeric()? {
            32 | 33 => 31,
            34 | 35 | 36 => 33,
            44 | 45 => 34,
            46 | 47 => 44,
            49 => 47,
            48 => 36,
            37 | 38 | 39 | 40 | 41 => 32,
            _ => return None,
        };
        Some(NodeId::numeric(0, parent))
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

/// Serde adapter for humantime durations (`"500ms"`, `"30s"`).
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a humantime string.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    /// Deserializes a duration from a humantime string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Adapter for `Option<Duration>`.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        /// Serializes an optional duration.
        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional duration.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NamespaceTable {
        NamespaceTable::new(["http://opcfoundation.org/UA/", "urn:server", "http://test.org/UA/Data/"])
    }

    // =========================================================================
    // NodeId Tests
    // =========================================================================

    #[test]
    fn test_node_id_numeric() {
        let node = NodeId::numeric(2, 1001);
        assert_eq!(node.namespace_index, 2);
        assert!(node.is_numeric());
        assert_eq!(node.as_numeric(), Some(1001));
        assert_eq!(node.to_opc_string(), "ns=2;i=1001");
    }

    #[test]
    fn test_node_id_parse_forms_normalize() {
        let t = table();
        let expected = NodeId::numeric(2, 10157);
        for text in [
            "ns=2;i=10157",
            "nsu=http://test.org/UA/Data/;i=10157",
            "http://test.org/UA/Data/#i=10157",
            "  http://test.org/UA/Data#i=10157 ",
        ] {
            assert_eq!(NodeId::parse_with(text, &t).unwrap(), expected, "{text}");
        }
        assert_eq!(expected.format_with(&t), "http://test.org/UA/Data/#i=10157");
    }

    #[test]
    fn test_node_id_namespace_zero() {
        let t = table();
        let node = NodeId::parse_with("i=85", &t).unwrap();
        assert_eq!(node, NodeId::OBJECTS_FOLDER);
        assert_eq!(node.format_with(&t), "i=85");
        let node = NodeId::parse_with("http://opcfoundation.org/UA/#i=85", &t).unwrap();
        assert_eq!(node, NodeId::OBJECTS_FOLDER);
    }

    #[test]
    fn test_node_id_string_percent_encoding() {
        let t = table();
        let node = NodeId::string(2, "A;B#C&D%E");
        let text = node.format_with(&t);
        assert_eq!(text, "http://test.org/UA/Data/#s=A%3BB%23C%26D%25E");
        assert_eq!(NodeId::parse_with(&text, &t).unwrap(), node);
    }

    #[test]
    fn test_node_id_guid_and_opaque() {
        let node: NodeId = "ns=2;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(node.to_opc_string(), "ns=2;g=550e8400-e29b-41d4-a716-446655440000");

        let node = NodeId::opaque(0, vec![1, 2, 3, 4]);
        assert_eq!(node.to_opc_string(), "b=AQIDBA==");
        assert_eq!("b=AQIDBA==".parse::<NodeId>().unwrap(), node);
    }

    #[test]
    fn test_node_id_data_type_names() {
        assert_eq!("Boolean".parse::<NodeId>().unwrap(), NodeId::numeric(0, 1));
        assert_eq!("localizedtext".parse::<NodeId>().unwrap(), NodeId::numeric(0, 21));
        assert_eq!("Structure".parse::<NodeId>().unwrap(), NodeId::numeric(0, 22));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("".parse::<NodeId>().is_err());
        assert!("ns=abc;i=1".parse::<NodeId>().is_err());
        assert!("i=notanumber".parse::<NodeId>().is_err());
        assert!("x=1".parse::<NodeId>().is_err());
        let err = NodeId::parse_with("http://unknown.org/#i=1", &table()).unwrap_err();
        assert_eq!(err.status_code(), crate::status::StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn test_node_id_serde_as_string() {
        let node = NodeId::string(3, "Boiler #1");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, "\"ns=3;s=Boiler #1\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_id_standard_nodes() {
        assert_eq!(NodeId::ROOT_FOLDER.as_numeric(), Some(84));
        assert_eq!(NodeId::OBJECTS_FOLDER.as_numeric(), Some(85));
        assert!(NodeId::null().is_null());
    }

    // =========================================================================
    // ExpandedNodeId / QualifiedName Tests
    // =========================================================================

    #[test]
    fn test_expanded_node_id_unknown_namespace_kept() {
        let t = table();
        let id = ExpandedNodeId::parse_with("nsu=urn:other;s=X", &t).unwrap();
        assert_eq!(id.namespace_uri.as_deref(), Some("urn:other"));
        assert!(id.to_node_id(&t).is_none());
        assert_eq!(id.format_with(&t), "urn:other#s=X");

        let id = ExpandedNodeId::parse_with("svr=1;ns=2;i=5", &t).unwrap();
        assert_eq!(id.server_index, 1);
        assert!(!id.is_local());
    }

    #[test]
    fn test_qualified_name_forms() {
        let t = table();
        let a = QualifiedName::parse_with("2:Static", &t).unwrap();
        let b = QualifiedName::parse_with("http://test.org/UA/Data/#Static", &t).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.format_with(&t), "http://test.org/UA/Data/#Static");
        assert_eq!(QualifiedName::parse_with("Objects", &t).unwrap(), QualifiedName::standard("Objects"));
        assert_eq!(QualifiedName::from("2:Static"), a);
    }

    // =========================================================================
    // Enumeration Tests
    // =========================================================================

    #[test]
    fn test_data_type_lookup() {
        assert_eq!(OpcUaDataType::from_name("DOUBLE"), Some(OpcUaDataType::Double));
        assert_eq!(OpcUaDataType::from_name("uInt32"), Some(OpcUaDataType::UInt32));
        assert_eq!(OpcUaDataType::from_type_id(29), Some(OpcUaDataType::Enumeration));
        assert_eq!("bool".parse::<OpcUaDataType>().unwrap(), OpcUaDataType::Boolean);
        assert!("nonsense".parse::<OpcUaDataType>().is_err());
    }

    #[test]
    fn test_data_type_accepts() {
        assert!(OpcUaDataType::Number.accepts(OpcUaDataType::Float));
        assert!(OpcUaDataType::Integer.accepts(OpcUaDataType::Int64));
        assert!(!OpcUaDataType::UInteger.accepts(OpcUaDataType::Int16));
        assert!(OpcUaDataType::Variant.accepts(OpcUaDataType::String));
        assert!(!OpcUaDataType::Double.accepts(OpcUaDataType::Float));
    }

    #[test]
    fn test_node_class_mask() {
        let mask = NodeClass::mask(&[NodeClass::Method, NodeClass::Object]);
        assert_eq!(mask, 5);
        assert!(NodeClass::Method.matches_mask(mask));
        assert!(!NodeClass::Variable.matches_mask(mask));
        assert!(NodeClass::Variable.matches_mask(0));
        assert_eq!(NodeClass::from_value(8), Some(NodeClass::ObjectType));
    }

    #[test]
    fn test_attribute_ids() {
        assert_eq!(AttributeId::NodeId.value(), 1);
        assert_eq!(AttributeId::Value.value(), 13);
        assert_eq!(AttributeId::AccessLevelEx.value(), 27);
        assert_eq!(AttributeId::from_value(17), Some(AttributeId::AccessLevel));
        assert_eq!(AttributeId::from_value(0), None);
        assert_eq!(AttributeId::from_value(28), None);
        assert_eq!("writemask".parse::<AttributeId>().unwrap(), AttributeId::WriteMask);
    }

    #[test]
    fn test_reference_type_names() {
        assert_eq!(reference_types::name_of(&reference_types::HAS_COMPONENT), Some("HasComponent"));
        assert_eq!(reference_types::from_name("organizes"), Some(reference_types::ORGANIZES));
        assert_eq!(
            reference_types::supertype_of(&reference_types::HAS_PROPERTY),
            Some(reference_types::AGGREGATES)
        );
    }

    #[test]
    fn test_browse_direction_matches() {
        assert!(BrowseDirection::Forward.matches(true));
        assert!(!BrowseDirection::Forward.matches(false));
        assert!(BrowseDirection::Backward.matches(false));
        assert!(BrowseDirection::Both.matches(false));
    }
}
