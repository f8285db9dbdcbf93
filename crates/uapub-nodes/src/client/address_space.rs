// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory OPC UA address space.
//!
//! Holds nodes and the references between them. References are stored on
//! both ends, so inverse browsing needs no index of its own. The standard
//! namespace 0 skeleton (folders, base types, reference types and built-in
//! data types) is created by [`AddressSpace::with_standard_nodes`].
//!
//! Address spaces can also be described declaratively with
//! [`AddressSpaceModel`] and loaded from JSON or YAML snapshots.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult};
use crate::status::StatusCode;
use crate::types::{
    reference_types, AttributeId, LocalizedText, NamespaceTable, NodeClass, NodeId,
    OpcUaDataType, QualifiedName,
};
use crate::variant::{DataValue, Variant};

use super::conversion::VariantCodec;
use super::session::Argument;

/// Access level bit allowing reads of the current value.
pub const ACCESS_LEVEL_CURRENT_READ: u8 = 0x01;
/// Access level bit allowing writes of the current value.
pub const ACCESS_LEVEL_CURRENT_WRITE: u8 = 0x02;

/// Browse name of the input argument property of methods.
pub const INPUT_ARGUMENTS: &str = "InputArguments";
/// Browse name of the output argument property of methods.
pub const OUTPUT_ARGUMENTS: &str = "OutputArguments";

// =============================================================================
// Node
// =============================================================================

/// A node and its attributes.
///
/// Attributes a node class does not have are `None` and read as
/// `BadAttributeIdInvalid`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node id.
    pub node_id: NodeId,
    /// Node class.
    pub node_class: NodeClass,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Display name.
    pub display_name: LocalizedText,
    /// Description.
    pub description: Option<LocalizedText>,
    /// Writable attribute bits.
    pub write_mask: u32,
    /// IsAbstract (types).
    pub is_abstract: Option<bool>,
    /// Symmetric (reference types).
    pub symmetric: Option<bool>,
    /// InverseName (reference types).
    pub inverse_name: Option<LocalizedText>,
    /// ContainsNoLoops (views).
    pub contains_no_loops: Option<bool>,
    /// EventNotifier (objects, views).
    pub event_notifier: Option<u8>,
    /// Value (variables, variable types).
    pub value: Option<DataValue>,
    /// DataType (variables, variable types).
    pub data_type: Option<NodeId>,
    /// ValueRank (variables, variable types).
    pub value_rank: Option<i32>,
    /// ArrayDimensions (variables, variable types).
    pub array_dimensions: Option<Vec<u32>>,
    /// AccessLevel (variables).
    pub access_level: Option<u8>,
    /// UserAccessLevel (variables).
    pub user_access_level: Option<u8>,
    /// MinimumSamplingInterval (variables).
    pub minimum_sampling_interval: Option<f64>,
    /// Historizing (variables).
    pub historizing: Option<bool>,
    /// Executable (methods).
    pub executable: Option<bool>,
    /// UserExecutable (methods).
    pub user_executable: Option<bool>,
}

impl Node {
    /// Creates a node with the attributes its class requires.
    pub fn new(node_id: NodeId, node_class: NodeClass, browse_name: QualifiedName) -> Self {
        let display_name = LocalizedText::new(browse_name.name.as_str());
        let mut node = Self {
            node_id,
            node_class,
            browse_name,
            display_name,
            description: None,
            write_mask: 0,
            is_abstract: None,
            symmetric: None,
            inverse_name: None,
            contains_no_loops: None,
            event_notifier: None,
            value: None,
            data_type: None,
            value_rank: None,
            array_dimensions: None,
            access_level: None,
            user_access_level: None,
            minimum_sampling_interval: None,
            historizing: None,
            executable: None,
            user_executable: None,
        };
        match node_class {
            NodeClass::Object => node.event_notifier = Some(0),
            NodeClass::Variable => {
                node.value = Some(DataValue::default());
                node.data_type = Some(OpcUaDataType::Variant.node_id());
                node.value_rank = Some(-1);
                node.access_level = Some(ACCESS_LEVEL_CURRENT_READ);
                node.user_access_level = Some(ACCESS_LEVEL_CURRENT_READ);
                node.minimum_sampling_interval = Some(0.0);
                node.historizing = Some(false);
            }
            NodeClass::VariableType => {
                node.data_type = Some(OpcUaDataType::Variant.node_id());
                node.value_rank = Some(-2);
                node.is_abstract = Some(false);
            }
            NodeClass::Method => {
                node.executable = Some(true);
                node.user_executable = Some(true);
            }
            NodeClass::ObjectType | NodeClass::DataType => node.is_abstract = Some(false),
            NodeClass::ReferenceType => {
                node.is_abstract = Some(false);
                node.symmetric = Some(false);
            }
            NodeClass::View => {
                node.contains_no_loops = Some(true);
                node.event_notifier = Some(0);
            }
            NodeClass::Unspecified => {}
        }
        node
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(LocalizedText::new(description.into()));
        self
    }

    /// Marks the node abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = Some(true);
        self
    }

    /// Returns `true` when the current value may be written.
    pub fn is_writable(&self) -> bool {
        self.access_level
            .map_or(false, |a| a & ACCESS_LEVEL_CURRENT_WRITE != 0)
    }

    /// Returns `true` when the current value may be read.
    pub fn is_readable(&self) -> bool {
        self.access_level
            .map_or(true, |a| a & ACCESS_LEVEL_CURRENT_READ != 0)
    }

    /// Reads a non-value attribute.
    pub fn attribute(&self, attribute: AttributeId) -> Result<Variant, StatusCode> {
        let missing = StatusCode::BAD_ATTRIBUTE_ID_INVALID;
        let v = match attribute {
            AttributeId::NodeId => Variant::from(self.node_id.clone()),
            AttributeId::NodeClass => Variant::Int32(self.node_class.value() as i32),
            AttributeId::BrowseName => Variant::from(self.browse_name.clone()),
            AttributeId::DisplayName => Variant::from(self.display_name.clone()),
            AttributeId::Description => self
                .description
                .clone()
                .map(Variant::from)
                .unwrap_or(Variant::Empty),
            AttributeId::WriteMask | AttributeId::UserWriteMask => Variant::UInt32(self.write_mask),
            AttributeId::IsAbstract => Variant::Boolean(self.is_abstract.ok_or(missing)?),
            AttributeId::Symmetric => Variant::Boolean(self.symmetric.ok_or(missing)?),
            AttributeId::InverseName => match (&self.inverse_name, self.node_class) {
                (Some(name), _) => Variant::from(name.clone()),
                (None, NodeClass::ReferenceType) => Variant::Empty,
                _ => return Err(missing),
            },
            AttributeId::ContainsNoLoops => Variant::Boolean(self.contains_no_loops.ok_or(missing)?),
            AttributeId::EventNotifier => Variant::Byte(self.event_notifier.ok_or(missing)?),
            AttributeId::Value => self.value.as_ref().ok_or(missing)?.value.clone(),
            AttributeId::DataType => Variant::from(self.data_type.clone().ok_or(missing)?),
            AttributeId::ValueRank => Variant::Int32(self.value_rank.ok_or(missing)?),
            AttributeId::ArrayDimensions => match (&self.array_dimensions, self.value_rank) {
                (Some(dims), _) => Variant::array(
                    OpcUaDataType::UInt32,
                    dims.iter().copied().map(Variant::UInt32).collect(),
                ),
                (None, Some(_)) => Variant::Empty,
                (None, None) => return Err(missing),
            },
            AttributeId::AccessLevel => Variant::Byte(self.access_level.ok_or(missing)?),
            AttributeId::UserAccessLevel => Variant::Byte(self.user_access_level.ok_or(missing)?),
            AttributeId::AccessLevelEx => Variant::UInt32(self.access_level.ok_or(missing)? as u32),
            AttributeId::MinimumSamplingInterval => {
                Variant::Double(self.minimum_sampling_interval.ok_or(missing)?)
            }
            AttributeId::Historizing => Variant::Boolean(self.historizing.ok_or(missing)?),
            AttributeId::Executable => Variant::Boolean(self.executable.ok_or(missing)?),
            AttributeId::UserExecutable => Variant::Boolean(self.user_executable.ok_or(missing)?),
            AttributeId::DataTypeDefinition
            | AttributeId::RolePermissions
            | AttributeId::UserRolePermissions
            | AttributeId::AccessRestrictions => return Err(missing),
        };
        Ok(v)
    }

    /// Writes a non-value attribute.
    ///
    /// The write mask bit of the attribute must be set.
    pub fn set_attribute(&mut self, attribute: AttributeId, value: Variant) -> Result<(), StatusCode> {
        let bit = match attribute {
            AttributeId::AccessLevel => 0,
            AttributeId::ArrayDimensions => 1,
            AttributeId::Description => 5,
            AttributeId::DisplayName => 6,
            AttributeId::EventNotifier => 7,
            AttributeId::Executable => 8,
            AttributeId::Historizing => 9,
            AttributeId::IsAbstract => 11,
            AttributeId::MinimumSamplingInterval => 12,
            AttributeId::UserAccessLevel => 16,
            AttributeId::UserExecutable => 17,
            AttributeId::ValueRank => 19,
            AttributeId::WriteMask => 20,
            _ => return Err(StatusCode::BAD_NOT_WRITABLE),
        };
        if self.write_mask & (1 << bit) == 0 {
            return Err(StatusCode::BAD_NOT_WRITABLE);
        }
        // the attribute must exist on this node class
        self.attribute(attribute)?;
        let mismatch = StatusCode::BAD_TYPE_MISMATCH;
        match (attribute, value) {
            (AttributeId::DisplayName, Variant::LocalizedText(t)) => self.display_name = *t,
            (AttributeId::Description, Variant::LocalizedText(t)) => self.description = Some(*t),
            (AttributeId::Description, Variant::Empty) => self.description = None,
            (AttributeId::AccessLevel, Variant::Byte(v)) => self.access_level = Some(v),
            (AttributeId::UserAccessLevel, Variant::Byte(v)) => self.user_access_level = Some(v),
            (AttributeId::EventNotifier, Variant::Byte(v)) => self.event_notifier = Some(v),
            (AttributeId::WriteMask, Variant::UInt32(v)) => self.write_mask = v,
            (AttributeId::Executable, Variant::Boolean(v)) => self.executable = Some(v),
            (AttributeId::UserExecutable, Variant::Boolean(v)) => self.user_executable = Some(v),
            (AttributeId::Historizing, Variant::Boolean(v)) => self.historizing = Some(v),
            (AttributeId::IsAbstract, Variant::Boolean(v)) => self.is_abstract = Some(v),
            (AttributeId::ValueRank, Variant::Int32(v)) => self.value_rank = Some(v),
            (AttributeId::MinimumSamplingInterval, Variant::Double(v)) => {
                self.minimum_sampling_interval = Some(v)
            }
            (AttributeId::ArrayDimensions, Variant::Array(a)) => {
                self.array_dimensions = Some(
                    a.values
                        .iter()
                        .map(|v| v.as_u32().ok_or(mismatch))
                        .collect::<Result<_, _>>()?,
                )
            }
            _ => return Err(mismatch),
        }
        Ok(())
    }
}

/// One end of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Reference type.
    pub reference_type_id: NodeId,
    /// The other node.
    pub target: NodeId,
    /// `true` when stored on the source node.
    pub is_forward: bool,
}

// =============================================================================
// AddressSpace
// =============================================================================

/// Nodes and references of a server.
#[derive(Debug, Clone, Default)]
pub struct AddressSpace {
    namespaces: NamespaceTable,
    nodes: HashMap<NodeId, Node>,
    references: HashMap<NodeId, Vec<Reference>>,
}

impl AddressSpace {
    /// Creates an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an address space with the namespace 0 skeleton.
    pub fn with_standard_nodes() -> Self {
        let mut space = Self::new();
        standard::populate(&mut space);
        space
    }

    /// Returns the namespace table.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Registers a namespace uri and returns its index.
    pub fn register_namespace(&mut self, uri: impl Into<String>) -> u16 {
        let index = self.namespaces.get_or_add(uri);
        let array = Variant::array(
            OpcUaDataType::String,
            self.namespaces
                .as_slice()
                .iter()
                .map(|u| Variant::String(u.clone()))
                .collect(),
        );
        if let Some(node) = self.nodes.get_mut(&standard::NAMESPACE_ARRAY) {
            node.value = Some(DataValue::now(array));
        }
        index
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` without nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node.
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Returns a node for modification.
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Iterates all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns the references of a node in both directions.
    pub fn references(&self, node_id: &NodeId) -> &[Reference] {
        self.references
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Inserts or replaces a node.
    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.node_id.clone(), node);
    }

    /// Adds a reference and its inverse. Duplicates are ignored.
    pub fn add_reference(&mut self, source: &NodeId, reference_type_id: &NodeId, target: &NodeId) {
        let forward = Reference {
            reference_type_id: reference_type_id.clone(),
            target: target.clone(),
            is_forward: true,
        };
        let list = self.references.entry(source.clone()).or_default();
        if list.contains(&forward) {
            return;
        }
        list.push(forward);
        self.references
            .entry(target.clone())
            .or_default()
            .push(Reference {
                reference_type_id: reference_type_id.clone(),
                target: source.clone(),
                is_forward: false,
            });
    }

    /// Removes a node and all references to it.
    pub fn remove(&mut self, node_id: &NodeId) -> Option<Node> {
        if let Some(refs) = self.references.remove(node_id) {
            for r in refs {
                if let Some(other) = self.references.get_mut(&r.target) {
                    other.retain(|o| &o.target != node_id);
                }
            }
        }
        self.nodes.remove(node_id)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    fn add_child(&mut self, node: Node, parent: &NodeId, reference_type_id: &NodeId) {
        let id = node.node_id.clone();
        self.insert(node);
        self.add_reference(parent, reference_type_id, &id);
    }

    fn set_type_definition(&mut self, node_id: &NodeId, type_definition: &NodeId) {
        self.add_reference(node_id, &reference_types::HAS_TYPE_DEFINITION, type_definition);
    }

    /// Adds a folder organized by `parent`.
    pub fn add_folder(&mut self, node_id: NodeId, name: impl Into<QualifiedName>, parent: &NodeId) {
        let node = Node::new(node_id.clone(), NodeClass::Object, name.into());
        self.add_child(node, parent, &reference_types::ORGANIZES);
        self.set_type_definition(&node_id, &NodeId::FOLDER_TYPE);
    }

    /// Adds an object component of `parent`.
    pub fn add_object(
        &mut self,
        node_id: NodeId,
        name: impl Into<QualifiedName>,
        parent: &NodeId,
        reference_type_id: &NodeId,
        type_definition: &NodeId,
    ) {
        let node = Node::new(node_id.clone(), NodeClass::Object, name.into());
        self.add_child(node, parent, reference_type_id);
        self.set_type_definition(&node_id, type_definition);
    }

    /// Adds a data variable component of `parent`.
    ///
    /// Data variables are readable and writable; properties are read-only.
    pub fn add_variable(
        &mut self,
        node_id: NodeId,
        name: impl Into<QualifiedName>,
        parent: &NodeId,
        data_type: OpcUaDataType,
        value: impl Into<Variant>,
    ) {
        let value = value.into();
        let mut node = Node::new(node_id.clone(), NodeClass::Variable, name.into());
        node.data_type = Some(data_type.node_id());
        node.value_rank = Some(if value.is_array() { 1 } else { -1 });
        node.value = Some(DataValue::now(value));
        node.access_level = Some(ACCESS_LEVEL_CURRENT_READ | ACCESS_LEVEL_CURRENT_WRITE);
        node.user_access_level = node.access_level;
        self.add_child(node, parent, &reference_types::HAS_COMPONENT);
        self.set_type_definition(&node_id, &NodeId::BASE_DATA_VARIABLE_TYPE);
    }

    /// Adds a property of `parent`.
    pub fn add_property(
        &mut self,
        node_id: NodeId,
        name: impl Into<QualifiedName>,
        parent: &NodeId,
        data_type: OpcUaDataType,
        value: impl Into<Variant>,
    ) {
        let value = value.into();
        let mut node = Node::new(node_id.clone(), NodeClass::Variable, name.into());
        node.data_type = Some(data_type.node_id());
        node.value_rank = Some(if value.is_array() { 1 } else { -1 });
        node.value = Some(DataValue::now(value));
        self.add_child(node, parent, &reference_types::HAS_PROPERTY);
        self.set_type_definition(&node_id, &NodeId::PROPERTY_TYPE);
    }

    /// Adds a method component of `parent` with its argument properties.
    ///
    /// Argument properties get string ids derived from the method id.
    pub fn add_method(
        &mut self,
        node_id: NodeId,
        name: impl Into<QualifiedName>,
        parent: &NodeId,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
    ) {
        let node = Node::new(node_id.clone(), NodeClass::Method, name.into());
        self.add_child(node, parent, &reference_types::HAS_COMPONENT);
        for (property, arguments) in [(INPUT_ARGUMENTS, inputs), (OUTPUT_ARGUMENTS, outputs)] {
            if arguments.is_empty() {
                continue;
            }
            let id = node_id_for(&node_id, property);
            self.add_property(
                id.clone(),
                QualifiedName::standard(property),
                &node_id,
                OpcUaDataType::ExtensionObject,
                Argument::list_to_variant(&arguments),
            );
            if let Some(n) = self.nodes.get_mut(&id) {
                n.data_type = Some(NodeId::ARGUMENT);
                n.value_rank = Some(1);
            }
        }
    }

    /// Adds a type node of the given class below `supertype`.
    pub fn add_type(
        &mut self,
        node_id: NodeId,
        node_class: NodeClass,
        name: impl Into<QualifiedName>,
        supertype: &NodeId,
    ) {
        let node = Node::new(node_id, node_class, name.into());
        self.add_child(node, supertype, &reference_types::HAS_SUBTYPE);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the first forward target of a reference type.
    pub fn forward_target(&self, node_id: &NodeId, reference_type_id: &NodeId) -> Option<&NodeId> {
        self.references(node_id)
            .iter()
            .find(|r| r.is_forward && &r.reference_type_id == reference_type_id)
            .map(|r| &r.target)
    }

    /// Returns the type definition of an instance.
    pub fn type_definition(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.forward_target(node_id, &reference_types::HAS_TYPE_DEFINITION)
    }

    /// Returns the direct supertype of a type.
    pub fn supertype(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.references(node_id)
            .iter()
            .find(|r| !r.is_forward && r.reference_type_id == reference_types::HAS_SUBTYPE)
            .map(|r| &r.target)
    }

    /// Returns `true` if `sub` is `base` or one of its subtypes.
    pub fn is_subtype_of(&self, sub: &NodeId, base: &NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.supertype(id);
        }
        false
    }

    /// Returns the built-in type values of a data type are encoded with.
    pub fn resolve_data_type(&self, data_type: &NodeId) -> Option<OpcUaDataType> {
        let mut visited = HashSet::new();
        let mut current = Some(data_type);
        while let Some(id) = current {
            if let Some(builtin) = OpcUaDataType::from_node_id(id) {
                return Some(builtin);
            }
            if !visited.insert(id) {
                return None;
            }
            current = self.supertype(id);
        }
        None
    }

    /// Finds a child of `parent` by browse name along forward hierarchical
    /// references.
    pub fn find_child(&self, parent: &NodeId, browse_name: &QualifiedName) -> Option<&NodeId> {
        self.references(parent)
            .iter()
            .filter(|r| r.is_forward)
            .filter(|r| self.is_subtype_of(&r.reference_type_id, &reference_types::HIERARCHICAL_REFERENCES))
            .map(|r| &r.target)
            .find(|t| self.node(t).map_or(false, |n| &n.browse_name == browse_name))
    }

    /// Returns the formal arguments of a method.
    pub fn method_arguments(&self, method_id: &NodeId, property: &str) -> Vec<Argument> {
        self.find_child(method_id, &QualifiedName::standard(property))
            .and_then(|id| self.node(id))
            .and_then(|n| n.value.as_ref())
            .map(|dv| Argument::list_from_variant(&dv.value))
            .unwrap_or_default()
    }

    // =========================================================================
    // Model loading
    // =========================================================================

    /// Loads nodes described by a model.
    ///
    /// Namespaces are registered first, then all nodes are created, then
    /// references and values are resolved, so nodes may refer to nodes
    /// defined later in the model.
    pub fn load_model(&mut self, model: &AddressSpaceModel) -> OpcUaResult<()> {
        for uri in &model.namespaces {
            self.register_namespace(uri.as_str());
        }
        let table = self.namespaces.clone();
        let parse = |s: &str| NodeId::parse_with(s, &table);

        let mut resolved = Vec::with_capacity(model.nodes.len());
        for def in &model.nodes {
            let node_id = parse(&def.node_id)?;
            let browse_name = QualifiedName::parse_with(&def.browse_name, &table)?;
            let mut node = Node::new(node_id.clone(), def.node_class, browse_name);
            if let Some(name) = &def.display_name {
                node.display_name = LocalizedText::new(name.as_str());
            }
            node.description = def.description.as_deref().map(LocalizedText::from);
            if let Some(is_abstract) = def.is_abstract {
                node.is_abstract = Some(is_abstract);
            }
            if let Some(mask) = def.write_mask {
                node.write_mask = mask;
            }
            if matches!(def.node_class, NodeClass::Variable | NodeClass::VariableType) {
                if let Some(dt) = &def.data_type {
                    node.data_type = Some(parse(dt)?);
                }
                if let Some(rank) = def.value_rank {
                    node.value_rank = Some(rank);
                }
            }
            if let Some(level) = def.access_level {
                node.access_level = Some(level);
                node.user_access_level = Some(level);
            }
            if let Some(symmetric) = def.symmetric {
                node.symmetric = Some(symmetric);
            }
            self.insert(node);
            resolved.push(node_id);
        }

        for (def, node_id) in model.nodes.iter().zip(&resolved) {
            if let Some(supertype) = &def.supertype {
                self.add_reference(&parse(supertype)?, &reference_types::HAS_SUBTYPE, node_id);
            }
            if let Some(parent) = &def.parent {
                let parent = parse(parent)?;
                let reference_type = match &def.reference_type {
                    Some(rt) => self.parse_reference_type(rt)?,
                    None => self.default_parent_reference(&parent, def),
                };
                self.add_reference(&parent, &reference_type, node_id);
            }
            match (&def.type_definition, def.node_class) {
                (Some(td), _) => {
                    let td = parse(td)?;
                    self.set_type_definition(node_id, &td);
                }
                (None, NodeClass::Object) => self.set_type_definition(node_id, &NodeId::BASE_OBJECT_TYPE),
                (None, NodeClass::Variable) => {
                    self.set_type_definition(node_id, &NodeId::BASE_DATA_VARIABLE_TYPE)
                }
                _ => {}
            }
            for r in &def.references {
                let rt = self.parse_reference_type(&r.reference_type)?;
                let target = parse(&r.target)?;
                if r.is_forward {
                    self.add_reference(node_id, &rt, &target);
                } else {
                    self.add_reference(&target, &rt, node_id);
                }
            }
            if def.node_class == NodeClass::Method {
                for (property, arguments) in [
                    (INPUT_ARGUMENTS, &def.input_arguments),
                    (OUTPUT_ARGUMENTS, &def.output_arguments),
                ] {
                    if arguments.is_empty() {
                        continue;
                    }
                    let id = node_id_for(node_id, property);
                    self.add_property(
                        id.clone(),
                        QualifiedName::standard(property),
                        node_id,
                        OpcUaDataType::ExtensionObject,
                        Argument::list_to_variant(arguments),
                    );
                    if let Some(n) = self.nodes.get_mut(&id) {
                        n.data_type = Some(NodeId::ARGUMENT);
                        n.value_rank = Some(1);
                    }
                }
            }
        }

        let codec = VariantCodec::new(self.namespaces.clone());
        for (def, node_id) in model.nodes.iter().zip(&resolved) {
            let Some(json) = &def.value else { continue };
            let (data_type, rank) = match self.node(node_id) {
                Some(n) => (n.data_type.clone(), n.value_rank),
                None => continue,
            };
            let builtin = data_type
                .as_ref()
                .and_then(|dt| self.resolve_data_type(dt))
                .unwrap_or(OpcUaDataType::Variant);
            let value = codec.decode(json, builtin, rank)?;
            if let Some(node) = self.nodes.get_mut(node_id) {
                node.value = Some(DataValue::now(value));
            }
        }
        Ok(())
    }

    fn parse_reference_type(&self, text: &str) -> OpcUaResult<NodeId> {
        if let Some(id) = reference_types::from_name(text) {
            return Ok(id);
        }
        if let Some(node) = self
            .nodes
            .values()
            .find(|n| n.node_class == NodeClass::ReferenceType && n.browse_name.name == text)
        {
            return Ok(node.node_id.clone());
        }
        NodeId::parse_with(text, &self.namespaces).map_err(|_| {
            OpcUaError::configuration(ConfigurationError::invalid_value(
                "referenceType",
                format!("unknown reference type '{}'", text),
            ))
        })
    }

    fn default_parent_reference(&self, parent: &NodeId, def: &NodeDefinition) -> NodeId {
        let parent_is_folder = self
            .type_definition(parent)
            .map_or(false, |td| td == &NodeId::FOLDER_TYPE);
        let is_property = def
            .type_definition
            .as_deref()
            .map_or(false, |td| td == "i=68");
        if is_property {
            reference_types::HAS_PROPERTY
        } else if parent_is_folder {
            reference_types::ORGANIZES
        } else {
            reference_types::HAS_COMPONENT
        }
    }
}

/// Id of an argument property: the method's identifier suffixed with the
/// property name.
fn node_id_for(method_id: &NodeId, property: &str) -> NodeId {
    let base = match &method_id.identifier {
        crate::types::NodeIdentifier::String(s) => s.clone(),
        other => other.to_string(),
    };
    NodeId::string(method_id.namespace_index, format!("{}_{}", base, property))
}

// =============================================================================
// AddressSpaceModel
// =============================================================================

/// Declarative description of nodes, loadable from JSON or YAML.
///
/// Node ids use any textual form accepted by [`NodeId::parse_with`] against
/// the model's namespaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpaceModel {
    /// Namespace uris to register, in index order after namespace 0.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Nodes.
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// One node of an [`AddressSpaceModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Node id.
    pub node_id: String,
    /// Node class.
    pub node_class: NodeClass,
    /// Browse name (`Name`, `ns:Name` or `uri#Name`).
    pub browse_name: String,
    /// Display name, defaults to the browse name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Reference type from the parent. Defaults to Organizes below folders,
    /// HasProperty for properties and HasComponent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    /// Type definition of instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<String>,
    /// Supertype of type nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supertype: Option<String>,
    /// Data type of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Value rank of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<i32>,
    /// Value in its JSON form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Access level of variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<u8>,
    /// Writable attribute mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mask: Option<u32>,
    /// IsAbstract of type nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,
    /// Symmetric of reference types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric: Option<bool>,
    /// Input arguments of methods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_arguments: Vec<Argument>,
    /// Output arguments of methods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_arguments: Vec<Argument>,
    /// Additional references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceDefinition>,
}

/// An extra reference of a [`NodeDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDefinition {
    /// Reference type name or id.
    pub reference_type: String,
    /// Target node.
    pub target: String,
    /// Direction.
    #[serde(default = "forward")]
    pub is_forward: bool,
}

fn forward() -> bool {
    true
}

// =============================================================================
// Standard nodes
// =============================================================================

mod standard {
    use super::*;
    use crate::types::reference_types as rt;

    pub(super) const NAMESPACE_ARRAY: NodeId = NodeId::numeric(0, 2255);
    const SERVER_TYPE: NodeId = NodeId::numeric(0, 2004);
    const OBJECT_TYPES_FOLDER: NodeId = NodeId::numeric(0, 88);
    const VARIABLE_TYPES_FOLDER: NodeId = NodeId::numeric(0, 89);
    const DATA_TYPES_FOLDER: NodeId = NodeId::numeric(0, 90);
    const REFERENCE_TYPES_FOLDER: NodeId = NodeId::numeric(0, 91);

    const REFERENCE_TYPES: &[(u32, &str, Option<u32>, bool, Option<&str>)] = &[
        (31, "References", None, true, None),
        (32, "NonHierarchicalReferences", Some(31), true, None),
        (33, "HierarchicalReferences", Some(31), true, None),
        (34, "HasChild", Some(33), true, None),
        (35, "Organizes", Some(33), false, Some("OrganizedBy")),
        (36, "HasEventSource", Some(33), false, Some("EventSourceOf")),
        (37, "HasModellingRule", Some(32), false, Some("ModellingRuleOf")),
        (38, "HasEncoding", Some(32), false, Some("EncodingOf")),
        (39, "HasDescription", Some(32), false, Some("DescriptionOf")),
        (40, "HasTypeDefinition", Some(32), false, Some("TypeDefinitionOf")),
        (41, "GeneratesEvent", Some(32), false, Some("GeneratedBy")),
        (44, "Aggregates", Some(34), true, None),
        (45, "HasSubtype", Some(34), false, Some("SubtypeOf")),
        (46, "HasProperty", Some(44), false, Some("PropertyOf")),
        (47, "HasComponent", Some(44), false, Some("ComponentOf")),
        (48, "HasNotifier", Some(36), false, Some("NotifierOf")),
        (49, "HasOrderedComponent", Some(47), false, Some("OrderedComponentOf")),
    ];

    const DATA_TYPES: &[(u32, &str, u32, bool)] = &[
        (1, "Boolean", 24, false),
        (26, "Number", 24, true),
        (27, "Integer", 26, true),
        (28, "UInteger", 26, true),
        (2, "SByte", 27, false),
        (4, "Int16", 27, false),
        (6, "Int32", 27, false),
        (8, "Int64", 27, false),
        (3, "Byte", 28, false),
        (5, "UInt16", 28, false),
        (7, "UInt32", 28, false),
        (9, "UInt64", 28, false),
        (10, "Float", 26, false),
        (11, "Double", 26, false),
        (290, "Duration", 11, false),
        (12, "String", 24, false),
        (13, "DateTime", 24, false),
        (294, "UtcTime", 13, false),
        (14, "Guid", 24, false),
        (15, "ByteString", 24, false),
        (16, "XmlElement", 24, false),
        (17, "NodeId", 24, false),
        (18, "ExpandedNodeId", 24, false),
        (19, "StatusCode", 24, false),
        (20, "QualifiedName", 24, false),
        (21, "LocalizedText", 24, false),
        (22, "Structure", 24, true),
        (23, "DataValue", 24, false),
        (29, "Enumeration", 24, true),
        (296, "Argument", 22, false),
        (884, "Range", 22, false),
    ];

    pub(super) fn populate(space: &mut AddressSpace) {
        let root = Node::new(NodeId::ROOT_FOLDER, NodeClass::Object, QualifiedName::standard("Root"));
        space.insert(root);

        // base types first so type definitions resolve
        let base_object = Node::new(
            NodeId::BASE_OBJECT_TYPE,
            NodeClass::ObjectType,
            QualifiedName::standard("BaseObjectType"),
        );
        space.insert(base_object);
        space.add_type(NodeId::FOLDER_TYPE, NodeClass::ObjectType, "FolderType", &NodeId::BASE_OBJECT_TYPE);
        space.add_type(SERVER_TYPE, NodeClass::ObjectType, "ServerType", &NodeId::BASE_OBJECT_TYPE);
        space.set_type_definition(&NodeId::ROOT_FOLDER, &NodeId::FOLDER_TYPE);

        space.add_folder(NodeId::OBJECTS_FOLDER, "Objects", &NodeId::ROOT_FOLDER);
        space.add_folder(NodeId::TYPES_FOLDER, "Types", &NodeId::ROOT_FOLDER);
        space.add_folder(NodeId::VIEWS_FOLDER, "Views", &NodeId::ROOT_FOLDER);
        space.add_folder(OBJECT_TYPES_FOLDER, "ObjectTypes", &NodeId::TYPES_FOLDER);
        space.add_folder(VARIABLE_TYPES_FOLDER, "VariableTypes", &NodeId::TYPES_FOLDER);
        space.add_folder(DATA_TYPES_FOLDER, "DataTypes", &NodeId::TYPES_FOLDER);
        space.add_folder(REFERENCE_TYPES_FOLDER, "ReferenceTypes", &NodeId::TYPES_FOLDER);
        space.add_reference(&OBJECT_TYPES_FOLDER, &rt::ORGANIZES, &NodeId::BASE_OBJECT_TYPE);

        // reference types
        for (id, name, supertype, is_abstract, inverse) in REFERENCE_TYPES {
            let mut node = Node::new(
                NodeId::numeric(0, *id),
                NodeClass::ReferenceType,
                QualifiedName::standard(*name),
            );
            node.is_abstract = Some(*is_abstract);
            node.symmetric = Some(*id == 32 || *id == 31);
            node.inverse_name = inverse.map(LocalizedText::from);
            space.insert(node);
            if let Some(supertype) = supertype {
                space.add_reference(&NodeId::numeric(0, *supertype), &rt::HAS_SUBTYPE, &NodeId::numeric(0, *id));
            }
        }
        space.add_reference(&REFERENCE_TYPES_FOLDER, &rt::ORGANIZES, &rt::REFERENCES);

        // variable types
        let mut base_variable = Node::new(
            NodeId::BASE_VARIABLE_TYPE,
            NodeClass::VariableType,
            QualifiedName::standard("BaseVariableType"),
        );
        base_variable.is_abstract = Some(true);
        space.insert(base_variable);
        space.add_reference(&VARIABLE_TYPES_FOLDER, &rt::ORGANIZES, &NodeId::BASE_VARIABLE_TYPE);
        space.add_type(
            NodeId::BASE_DATA_VARIABLE_TYPE,
            NodeClass::VariableType,
            "BaseDataVariableType",
            &NodeId::BASE_VARIABLE_TYPE,
        );
        space.add_type(NodeId::PROPERTY_TYPE, NodeClass::VariableType, "PropertyType", &NodeId::BASE_VARIABLE_TYPE);

        // data types
        let mut base_data_type = Node::new(
            OpcUaDataType::Variant.node_id(),
            NodeClass::DataType,
            QualifiedName::standard("BaseDataType"),
        );
        base_data_type.is_abstract = Some(true);
        space.insert(base_data_type);
        space.add_reference(&DATA_TYPES_FOLDER, &rt::ORGANIZES, &OpcUaDataType::Variant.node_id());
        for (id, name, supertype, is_abstract) in DATA_TYPES {
            space.add_type(NodeId::numeric(0, *id), NodeClass::DataType, *name, &NodeId::numeric(0, *supertype));
            if let Some(node) = space.node_mut(&NodeId::numeric(0, *id)) {
                node.is_abstract = Some(*is_abstract);
            }
        }

        // server object
        space.add_object(
            NodeId::SERVER,
            "Server",
            &NodeId::OBJECTS_FOLDER,
            &rt::ORGANIZES,
            &SERVER_TYPE,
        );
        space.add_property(
            NAMESPACE_ARRAY,
            "NamespaceArray",
            &NodeId::SERVER,
            OpcUaDataType::String,
            Variant::array(OpcUaDataType::String, vec![]),
        );
        space.register_namespace(crate::types::OPC_UA_NAMESPACE_URI);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_nodes() {
        let space = AddressSpace::with_standard_nodes();
        assert!(space.contains(&NodeId::ROOT_FOLDER));
        assert!(space.contains(&NodeId::SERVER));
        assert_eq!(
            space.find_child(&NodeId::ROOT_FOLDER, &QualifiedName::standard("Objects")),
            Some(&NodeId::OBJECTS_FOLDER)
        );
        assert!(space.is_subtype_of(&reference_types::HAS_PROPERTY, &reference_types::HIERARCHICAL_REFERENCES));
        assert!(!space.is_subtype_of(&reference_types::HAS_TYPE_DEFINITION, &reference_types::HIERARCHICAL_REFERENCES));
        assert_eq!(
            space.resolve_data_type(&NodeId::numeric(0, 296)),
            Some(OpcUaDataType::ExtensionObject)
        );
    }

    #[test]
    fn test_references_are_bidirectional() {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace("urn:test");
        let a = NodeId::string(ns, "A");
        space.add_object(a.clone(), QualifiedName::new(ns, "A"), &NodeId::OBJECTS_FOLDER, &reference_types::ORGANIZES, &NodeId::BASE_OBJECT_TYPE);
        let inverse = space
            .references(&a)
            .iter()
            .find(|r| !r.is_forward)
            .map(|r| r.target.clone());
        assert_eq!(inverse, Some(NodeId::OBJECTS_FOLDER));

        // duplicate references are ignored
        let before = space.references(&a).len();
        space.add_reference(&NodeId::OBJECTS_FOLDER, &reference_types::ORGANIZES, &a);
        assert_eq!(space.references(&a).len(), before);

        space.remove(&a);
        assert!(space.references(&NodeId::OBJECTS_FOLDER).iter().all(|r| r.target != a));
    }

    #[test]
    fn test_method_arguments() {
        let mut space = AddressSpace::with_standard_nodes();
        let method = NodeId::string(0, "Echo");
        space.add_method(
            method.clone(),
            "Echo",
            &NodeId::SERVER,
            vec![Argument::new("In", OpcUaDataType::Int32.node_id())],
            vec![Argument::new("Out", OpcUaDataType::Int32.node_id())],
        );
        let inputs = space.method_arguments(&method, INPUT_ARGUMENTS);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "In");
        assert_eq!(space.method_arguments(&method, OUTPUT_ARGUMENTS)[0].name, "Out");
    }

    #[test]
    fn test_load_model() {
        let model: AddressSpaceModel = serde_json::from_value(json!({
            "namespaces": ["urn:plant"],
            "nodes": [
                { "nodeId": "nsu=urn:plant;s=Line1", "nodeClass": "Object", "browseName": "1:Line1",
                  "parent": "i=85" },
                { "nodeId": "nsu=urn:plant;s=Line1.Speed", "nodeClass": "Variable", "browseName": "1:Speed",
                  "parent": "nsu=urn:plant;s=Line1", "dataType": "Double", "value": 12.5, "accessLevel": 3 },
                { "nodeId": "nsu=urn:plant;s=Line1.Tags", "nodeClass": "Variable", "browseName": "1:Tags",
                  "parent": "nsu=urn:plant;s=Line1", "dataType": "String", "valueRank": 1, "value": [] }
            ]
        }))
        .unwrap();
        let mut space = AddressSpace::with_standard_nodes();
        space.load_model(&model).unwrap();

        let line = NodeId::string(1, "Line1");
        assert_eq!(
            space.find_child(&NodeId::OBJECTS_FOLDER, &QualifiedName::new(1, "Line1")),
            Some(&line)
        );
        assert_eq!(space.type_definition(&line), Some(&NodeId::BASE_OBJECT_TYPE));
        let speed = space.node(&NodeId::string(1, "Line1.Speed")).unwrap();
        assert_eq!(speed.value.as_ref().unwrap().value, Variant::Double(12.5));
        assert!(speed.is_writable());
        let tags = space.node(&NodeId::string(1, "Line1.Tags")).unwrap();
        assert_eq!(
            tags.value.as_ref().unwrap().value,
            Variant::array(OpcUaDataType::String, vec![])
        );
    }

    #[test]
    fn test_attribute_access() {
        let mut node = Node::new(NodeId::numeric(1, 1), NodeClass::Variable, QualifiedName::new(1, "V"));
        assert_eq!(node.attribute(AttributeId::ValueRank), Ok(Variant::Int32(-1)));
        assert_eq!(node.attribute(AttributeId::Executable), Err(StatusCode::BAD_ATTRIBUTE_ID_INVALID));
        assert_eq!(
            node.set_attribute(AttributeId::DisplayName, Variant::from(LocalizedText::new("X"))),
            Err(StatusCode::BAD_NOT_WRITABLE)
        );
        node.write_mask = 1 << 6;
        node.set_attribute(AttributeId::DisplayName, Variant::from(LocalizedText::new("X")))
            .unwrap();
        assert_eq!(node.display_name.text, "X");
    }
}
