// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory session for testing and offline operation.
//!
//! [`MemorySession`] serves the attribute, view and method service sets from
//! an [`AddressSpace`] held in memory. It behaves like a server would at the
//! operation level: paging with continuation points, access level checks,
//! type checks on writes and argument validation on calls.
//!
//! # Features
//!
//! - **Thread-Safe**: Uses `parking_lot::RwLock` for the address space
//! - **Continuation Points**: Kept in a `DashMap`, keyed by random tokens
//! - **Method Handlers**: Closures registered per method node; methods without
//!   a handler echo matching inputs and otherwise return default outputs
//!
//! # Example
//!
//! ```rust
//! use uapub_nodes::client::{AddressSpace, MemorySession};
//!
//! let session = MemorySession::new(AddressSpace::with_standard_nodes())
//!     .with_max_references_per_node(100);
//! assert_eq!(session.request_count(), 0);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::OpcUaResult;
use crate::status::StatusCode;
use crate::types::{
    reference_types, AttributeId, ExpandedNodeId, NamespaceTable, NodeClass, NodeId,
    OpcUaDataType,
};
use crate::variant::{DataValue, Variant};

use super::address_space::{AddressSpace, AddressSpaceModel, INPUT_ARGUMENTS, OUTPUT_ARGUMENTS};
use super::session::{
    Argument, BrowseDescription, BrowsePath, BrowsePathResult, BrowsePathTarget, BrowseResult,
    CallMethodRequest, CallMethodResult, OpcUaSession, ReadValueId, ReferenceDescription,
    WriteValue,
};

/// Implementation of a method node.
pub type MethodHandler =
    Arc<dyn Fn(&[Variant]) -> Result<Vec<Variant>, StatusCode> + Send + Sync>;

/// Default page size when the client does not limit it.
pub const DEFAULT_MAX_REFERENCES_PER_NODE: usize = 1000;

/// Default number of continuation points kept at once.
pub const DEFAULT_MAX_CONTINUATION_POINTS: usize = 100;

// =============================================================================
// Continuation Points
// =============================================================================

/// References not yet returned by a browse.
#[derive(Debug)]
struct PendingBrowse {
    references: Vec<ReferenceDescription>,
    page_size: usize,
}

// =============================================================================
// MemorySession
// =============================================================================

/// A session answering from an in-memory address space.
///
/// # Thread Safety
///
/// This struct is `Send + Sync`. The address space and handler table are
/// protected by `parking_lot::RwLock`; continuation points live in a
/// `DashMap` and the request counter is atomic.
pub struct MemorySession {
    /// Nodes and references.
    space: RwLock<AddressSpace>,

    /// Open continuation points.
    continuation_points: DashMap<Vec<u8>, PendingBrowse>,

    /// Registered method implementations.
    handlers: RwLock<HashMap<NodeId, MethodHandler>>,

    /// Server side page size limit.
    max_references_per_node: usize,

    /// Limit of open continuation points.
    max_continuation_points: usize,

    /// Service requests served.
    requests: AtomicU64,
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession")
            .field("nodes", &self.space.read().len())
            .field("continuation_points", &self.continuation_points.len())
            .field("handlers", &self.handlers.read().len())
            .field("max_references_per_node", &self.max_references_per_node)
            .finish()
    }
}

impl MemorySession {
    /// Creates a session over an address space.
    pub fn new(space: AddressSpace) -> Self {
        Self {
            space: RwLock::new(space),
            continuation_points: DashMap::new(),
            handlers: RwLock::new(HashMap::new()),
            max_references_per_node: DEFAULT_MAX_REFERENCES_PER_NODE,
            max_continuation_points: DEFAULT_MAX_CONTINUATION_POINTS,
            requests: AtomicU64::new(0),
        }
    }

    /// Creates a session with the standard nodes plus the nodes of a model.
    pub fn from_model(model: &AddressSpaceModel) -> OpcUaResult<Self> {
        let mut space = AddressSpace::with_standard_nodes();
        space.load_model(model)?;
        Ok(Self::new(space))
    }

    /// Limits the references returned per node and page.
    pub fn with_max_references_per_node(mut self, max: usize) -> Self {
        self.max_references_per_node = max.max(1);
        self
    }

    /// Limits the number of open continuation points.
    pub fn with_max_continuation_points(mut self, max: usize) -> Self {
        self.max_continuation_points = max;
        self
    }

    /// Registers the implementation of a method.
    pub fn register_method<F>(&self, method_id: NodeId, handler: F)
    where
        F: Fn(&[Variant]) -> Result<Vec<Variant>, StatusCode> + Send + Sync + 'static,
    {
        self.handlers.write().insert(method_id, Arc::new(handler));
    }

    /// Runs `f` with read access to the address space.
    pub fn read_space<R>(&self, f: impl FnOnce(&AddressSpace) -> R) -> R {
        f(&self.space.read())
    }

    /// Runs `f` with write access to the address space.
    pub fn modify_space<R>(&self, f: impl FnOnce(&mut AddressSpace) -> R) -> R {
        f(&mut self.space.write())
    }

    /// Number of service requests served.
    #[inline]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Number of open continuation points.
    #[inline]
    pub fn continuation_point_count(&self) -> usize {
        self.continuation_points.len()
    }

    fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Browse
    // =========================================================================

    fn collect_references(
        space: &AddressSpace,
        desc: &BrowseDescription,
    ) -> Result<Vec<ReferenceDescription>, StatusCode> {
        if !space.contains(&desc.node_id) {
            return Err(StatusCode::BAD_NODE_ID_UNKNOWN);
        }
        if let Some(rt) = &desc.reference_type_id {
            let valid = space
                .node(rt)
                .map_or(false, |n| n.node_class == NodeClass::ReferenceType);
            if !valid {
                return Err(StatusCode::BAD_REFERENCE_TYPE_ID_INVALID);
            }
        }

        let references = space
            .references(&desc.node_id)
            .iter()
            .filter(|r| desc.browse_direction.matches(r.is_forward))
            .filter(|r| match &desc.reference_type_id {
                None => true,
                Some(rt) if desc.include_subtypes => space.is_subtype_of(&r.reference_type_id, rt),
                Some(rt) => &r.reference_type_id == rt,
            })
            .filter_map(|r| {
                let target = space.node(&r.target)?;
                if !target.node_class.matches_mask(desc.node_class_mask) {
                    return None;
                }
                let type_definition = match target.node_class {
                    NodeClass::Object | NodeClass::Variable => space
                        .type_definition(&target.node_id)
                        .cloned()
                        .map(ExpandedNodeId::local),
                    _ => None,
                };
                Some(ReferenceDescription {
                    reference_type_id: r.reference_type_id.clone(),
                    is_forward: r.is_forward,
                    node_id: ExpandedNodeId::local(target.node_id.clone()),
                    browse_name: target.browse_name.clone(),
                    display_name: target.display_name.clone(),
                    node_class: target.node_class,
                    type_definition,
                })
            })
            .collect();
        Ok(references)
    }

    /// Returns the first page and parks the rest behind a continuation point.
    fn page(&self, mut references: Vec<ReferenceDescription>, page_size: usize) -> BrowseResult {
        if references.len() <= page_size {
            return BrowseResult {
                status_code: StatusCode::GOOD,
                continuation_point: None,
                references,
            };
        }
        if self.continuation_points.len() >= self.max_continuation_points {
            return BrowseResult::failure(StatusCode::BAD_NO_CONTINUATION_POINTS);
        }
        let rest = references.split_off(page_size);
        let token = rand::random::<[u8; 16]>().to_vec();
        trace!(remaining = rest.len(), "Parking browse continuation");
        self.continuation_points.insert(
            token.clone(),
            PendingBrowse {
                references: rest,
                page_size,
            },
        );
        BrowseResult {
            status_code: StatusCode::GOOD,
            continuation_point: Some(token),
            references,
        }
    }

    // =========================================================================
    // TranslateBrowsePaths
    // =========================================================================

    fn translate(space: &AddressSpace, path: &BrowsePath) -> BrowsePathResult {
        let failure = |status_code| BrowsePathResult {
            status_code,
            targets: Vec::new(),
        };
        if !space.contains(&path.starting_node) {
            return failure(StatusCode::BAD_NODE_ID_UNKNOWN);
        }
        if path.relative_path.is_empty() {
            return failure(StatusCode::BAD_NOTHING_TO_DO);
        }

        let mut current = vec![path.starting_node.clone()];
        for element in &path.relative_path {
            if element.target_name.is_null() {
                return failure(StatusCode::BAD_BROWSE_NAME_INVALID);
            }
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                for r in space.references(node) {
                    if r.is_forward == element.is_inverse {
                        continue;
                    }
                    let type_matches = if element.include_subtypes {
                        space.is_subtype_of(&r.reference_type_id, &element.reference_type_id)
                    } else {
                        r.reference_type_id == element.reference_type_id
                    };
                    if !type_matches {
                        continue;
                    }
                    let name_matches = space
                        .node(&r.target)
                        .map_or(false, |t| t.browse_name == element.target_name);
                    if name_matches && seen.insert(r.target.clone()) {
                        next.push(r.target.clone());
                    }
                }
            }
            if next.is_empty() {
                return failure(StatusCode::BAD_NO_MATCH);
            }
            current = next;
        }

        BrowsePathResult {
            status_code: StatusCode::GOOD,
            targets: current
                .into_iter()
                .map(|id| BrowsePathTarget {
                    target_id: ExpandedNodeId::local(id),
                    remaining_path_index: u32::MAX,
                })
                .collect(),
        }
    }

    // =========================================================================
    // Read / Write
    // =========================================================================

    fn read_attribute(space: &AddressSpace, request: &ReadValueId) -> DataValue {
        let Some(node) = space.node(&request.node_id) else {
            return DataValue::from_status(StatusCode::BAD_NODE_ID_UNKNOWN);
        };
        if request.attribute_id != AttributeId::Value {
            return match node.attribute(request.attribute_id) {
                Ok(value) => DataValue {
                    value,
                    server_timestamp: Some(Utc::now()),
                    ..Default::default()
                },
                Err(status) => DataValue::from_status(status),
            };
        }
        let Some(current) = node.value.as_ref() else {
            return DataValue::from_status(StatusCode::BAD_ATTRIBUTE_ID_INVALID);
        };
        if !node.is_readable() {
            return DataValue::from_status(StatusCode::BAD_NOT_READABLE);
        }
        let mut result = current.clone();
        if let Some(range) = &request.index_range {
            match range.read(&current.value) {
                Ok(slice) => result.value = slice,
                Err(e) => return DataValue::from_status(e.status_code()),
            }
        }
        result.server_timestamp = Some(Utc::now());
        result
    }

    fn write_attribute(space: &mut AddressSpace, request: &WriteValue) -> StatusCode {
        let builtin = match space.node(&request.node_id) {
            None => return StatusCode::BAD_NODE_ID_UNKNOWN,
            Some(node) => node
                .data_type
                .as_ref()
                .and_then(|dt| space.resolve_data_type(dt))
                .unwrap_or(OpcUaDataType::Variant),
        };
        let Some(node) = space.node_mut(&request.node_id) else {
            return StatusCode::BAD_NODE_ID_UNKNOWN;
        };

        if request.attribute_id != AttributeId::Value {
            return match node.set_attribute(request.attribute_id, request.value.value.clone()) {
                Ok(()) => StatusCode::GOOD,
                Err(status) => status,
            };
        }
        if node.value.is_none() {
            return StatusCode::BAD_ATTRIBUTE_ID_INVALID;
        }
        if !node.is_writable() {
            return StatusCode::BAD_NOT_WRITABLE;
        }

        let incoming = &request.value.value;
        if !incoming.is_null() && !builtin.accepts(incoming.data_type()) {
            return StatusCode::BAD_TYPE_MISMATCH;
        }
        if request.index_range.is_none() && !rank_accepts(node.value_rank.unwrap_or(-2), incoming) {
            return StatusCode::BAD_TYPE_MISMATCH;
        }

        let mut stored = node.value.clone().unwrap_or_default();
        match &request.index_range {
            Some(range) => {
                if let Err(e) = range.write(&mut stored.value, incoming.clone()) {
                    return e.status_code();
                }
            }
            None => stored.value = incoming.clone(),
        }
        let now = Utc::now();
        stored.status = request.value.status;
        stored.source_timestamp = request.value.source_timestamp.or(Some(now));
        stored.server_timestamp = Some(now);
        node.value = Some(stored);
        StatusCode::GOOD
    }

    // =========================================================================
    // Call
    // =========================================================================

    fn method_of(space: &AddressSpace, object_id: &NodeId, method_id: &NodeId) -> bool {
        let is_component = |owner: &NodeId| {
            space.references(owner).iter().any(|r| {
                r.is_forward
                    && &r.target == method_id
                    && space.is_subtype_of(&r.reference_type_id, &reference_types::HAS_COMPONENT)
            })
        };
        is_component(object_id)
            || space
                .type_definition(object_id)
                .map_or(false, |td| is_component(td))
    }

    fn call_method(&self, request: &CallMethodRequest) -> CallMethodResult {
        let (inputs, outputs, builtin_of) = {
            let space = self.space.read();
            if !space.contains(&request.object_id) {
                return CallMethodResult::failure(StatusCode::BAD_NODE_ID_UNKNOWN);
            }
            let is_method = space
                .node(&request.method_id)
                .map_or(false, |n| n.node_class == NodeClass::Method);
            if !is_method || !Self::method_of(&space, &request.object_id, &request.method_id) {
                return CallMethodResult::failure(StatusCode::BAD_METHOD_INVALID);
            }
            let inputs = space.method_arguments(&request.method_id, INPUT_ARGUMENTS);
            let outputs = space.method_arguments(&request.method_id, OUTPUT_ARGUMENTS);
            let builtin_of: HashMap<NodeId, OpcUaDataType> = inputs
                .iter()
                .chain(outputs.iter())
                .map(|a| {
                    let builtin = space
                        .resolve_data_type(&a.data_type)
                        .unwrap_or(OpcUaDataType::Variant);
                    (a.data_type.clone(), builtin)
                })
                .collect();
            (inputs, outputs, builtin_of)
        };
        let builtin = |a: &Argument| {
            builtin_of
                .get(&a.data_type)
                .copied()
                .unwrap_or(OpcUaDataType::Variant)
        };

        if request.input_arguments.len() > inputs.len() {
            return CallMethodResult::failure(StatusCode::BAD_TOO_MANY_ARGUMENTS);
        }
        if request.input_arguments.len() < inputs.len() {
            return CallMethodResult::failure(StatusCode::BAD_ARGUMENTS_MISSING);
        }
        let argument_results: Vec<StatusCode> = request
            .input_arguments
            .iter()
            .zip(&inputs)
            .map(|(value, formal)| {
                if argument_accepts(formal, builtin(formal), value) {
                    StatusCode::GOOD
                } else {
                    StatusCode::BAD_TYPE_MISMATCH
                }
            })
            .collect();
        if argument_results.iter().any(|s| s.is_bad()) {
            return CallMethodResult {
                status_code: StatusCode::BAD_INVALID_ARGUMENT,
                input_argument_results: argument_results,
                output_arguments: Vec::new(),
            };
        }

        let handler = self.handlers.read().get(&request.method_id).cloned();
        let outcome = match handler {
            Some(handler) => handler(&request.input_arguments),
            None => Ok(outputs
                .iter()
                .enumerate()
                .map(|(i, formal)| {
                    let builtin = builtin(formal);
                    match request.input_arguments.get(i) {
                        Some(input) if argument_accepts(formal, builtin, input) => input.clone(),
                        _ if formal.is_array() => Variant::array(builtin, Vec::new()),
                        _ => Variant::default_for(builtin),
                    }
                })
                .collect()),
        };
        match outcome {
            Ok(output_arguments) => CallMethodResult {
                status_code: StatusCode::GOOD,
                input_argument_results: Vec::new(),
                output_arguments,
            },
            Err(status) => CallMethodResult::failure(status),
        }
    }
}

/// Checks a value against a value rank.
fn rank_accepts(value_rank: i32, value: &Variant) -> bool {
    match value_rank {
        -1 => !value.is_array(),
        -2 | -3 => true,
        0 => true,
        _ => value.is_array() || value.is_null(),
    }
}

/// Checks an input against its formal argument.
fn argument_accepts(formal: &Argument, builtin: OpcUaDataType, value: &Variant) -> bool {
    if value.is_null() {
        return builtin == OpcUaDataType::Variant;
    }
    formal.is_array() == value.is_array() && builtin.accepts(value.data_type())
}

// =============================================================================
// OpcUaSession Implementation
// =============================================================================

#[async_trait]
impl OpcUaSession for MemorySession {
    fn namespaces(&self) -> NamespaceTable {
        self.space.read().namespaces().clone()
    }

    async fn browse(
        &self,
        nodes: &[BrowseDescription],
        max_references_per_node: u32,
    ) -> OpcUaResult<Vec<BrowseResult>> {
        self.count_request();
        let page_size = match max_references_per_node as usize {
            0 => self.max_references_per_node,
            n => n.min(self.max_references_per_node),
        };
        let collected: Vec<_> = {
            let space = self.space.read();
            nodes
                .iter()
                .map(|desc| Self::collect_references(&space, desc))
                .collect()
        };
        debug!(nodes = nodes.len(), page_size, "Browse");
        Ok(collected
            .into_iter()
            .map(|r| match r {
                Ok(references) => self.page(references, page_size),
                Err(status) => BrowseResult::failure(status),
            })
            .collect())
    }

    async fn browse_next(
        &self,
        release: bool,
        continuation_points: &[Vec<u8>],
    ) -> OpcUaResult<Vec<BrowseResult>> {
        self.count_request();
        Ok(continuation_points
            .iter()
            .map(|token| match self.continuation_points.remove(token) {
                None => BrowseResult::failure(StatusCode::BAD_CONTINUATION_POINT_INVALID),
                Some(_) if release => BrowseResult::default(),
                Some((_, pending)) => self.page(pending.references, pending.page_size),
            })
            .collect())
    }

    async fn translate_browse_paths(
        &self,
        paths: &[BrowsePath],
    ) -> OpcUaResult<Vec<BrowsePathResult>> {
        self.count_request();
        let space = self.space.read();
        Ok(paths.iter().map(|p| Self::translate(&space, p)).collect())
    }

    async fn read(&self, nodes: &[ReadValueId], _max_age: Duration) -> OpcUaResult<Vec<DataValue>> {
        self.count_request();
        let space = self.space.read();
        Ok(nodes
            .iter()
            .map(|request| Self::read_attribute(&space, request))
            .collect())
    }

    async fn write(&self, values: &[WriteValue]) -> OpcUaResult<Vec<StatusCode>> {
        self.count_request();
        let mut space = self.space.write();
        let results: Vec<StatusCode> = values
            .iter()
            .map(|request| Self::write_attribute(&mut space, request))
            .collect();
        debug!(count = values.len(), "Write");
        Ok(results)
    }

    async fn call(&self, methods: &[CallMethodRequest]) -> OpcUaResult<Vec<CallMethodResult>> {
        self.count_request();
        Ok(methods.iter().map(|m| self.call_method(m)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrowseDirection, QualifiedName};
    use crate::variant::IndexRange;
    use crate::client::session::RelativePathElement;

    fn session() -> MemorySession {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace("urn:test");
        let plant = NodeId::string(ns, "Plant");
        space.add_folder(plant.clone(), QualifiedName::new(ns, "Plant"), &NodeId::OBJECTS_FOLDER);
        for i in 0..5 {
            space.add_variable(
                NodeId::numeric(ns, 100 + i),
                QualifiedName::new(ns, format!("Var{}", i)),
                &plant,
                OpcUaDataType::Int32,
                Variant::Int32(i as i32),
            );
        }
        let arr = NodeId::string(ns, "Array");
        space.add_variable(
            arr.clone(),
            QualifiedName::new(ns, "Array"),
            &plant,
            OpcUaDataType::Double,
            Variant::array(OpcUaDataType::Double, vec![Variant::Double(1.0), Variant::Double(2.0), Variant::Double(3.0)]),
        );
        if let Some(node) = space.node_mut(&arr) {
            node.access_level = Some(3);
        }
        space.add_method(
            NodeId::string(ns, "Echo"),
            QualifiedName::new(ns, "Echo"),
            &plant,
            vec![Argument::new("In", OpcUaDataType::Int32.node_id())],
            vec![Argument::new("Out", OpcUaDataType::Int32.node_id())],
        );
        MemorySession::new(space).with_max_references_per_node(3)
    }

    #[tokio::test]
    async fn test_browse_pages_with_continuation_points() {
        let session = session();
        let plant = NodeId::string(1, "Plant");
        let desc = BrowseDescription::hierarchical(plant);
        let first = session.browse(&[desc], 0).await.unwrap().remove(0);
        assert_eq!(first.references.len(), 3);
        let token = first.continuation_point.clone().unwrap();
        assert_eq!(session.continuation_point_count(), 1);

        let next = session.browse_next(false, &[token.clone()]).await.unwrap().remove(0);
        // 5 variables + array + method = 7 children
        assert_eq!(next.references.len(), 3);
        let last = session
            .browse_next(false, &[next.continuation_point.unwrap()])
            .await
            .unwrap()
            .remove(0);
        assert_eq!(last.references.len(), 1);
        assert!(last.continuation_point.is_none());

        let stale = session.browse_next(false, &[token]).await.unwrap().remove(0);
        assert_eq!(stale.status_code, StatusCode::BAD_CONTINUATION_POINT_INVALID);
        assert_eq!(session.continuation_point_count(), 0);
    }

    #[tokio::test]
    async fn test_browse_release_and_errors() {
        let session = session();
        let desc = BrowseDescription::hierarchical(NodeId::string(1, "Plant"));
        let first = session.browse(&[desc.clone()], 2).await.unwrap().remove(0);
        let released = session
            .browse_next(true, &[first.continuation_point.unwrap()])
            .await
            .unwrap()
            .remove(0);
        assert!(released.references.is_empty());
        assert_eq!(session.continuation_point_count(), 0);

        let unknown = BrowseDescription::hierarchical(NodeId::string(1, "Missing"));
        let bad_type = desc.clone().reference_type(NodeId::OBJECTS_FOLDER, true);
        let results = session.browse(&[unknown, bad_type], 0).await.unwrap();
        assert_eq!(results[0].status_code, StatusCode::BAD_NODE_ID_UNKNOWN);
        assert_eq!(results[1].status_code, StatusCode::BAD_REFERENCE_TYPE_ID_INVALID);
    }

    #[tokio::test]
    async fn test_browse_inverse_and_class_mask() {
        let session = session();
        let inverse = BrowseDescription::hierarchical(NodeId::numeric(1, 100))
            .direction(BrowseDirection::Backward);
        let parent = session.browse(&[inverse], 0).await.unwrap().remove(0);
        assert_eq!(parent.references.len(), 1);
        assert_eq!(parent.references[0].node_id.node_id, NodeId::string(1, "Plant"));
        assert!(!parent.references[0].is_forward);

        let methods = BrowseDescription::hierarchical(NodeId::string(1, "Plant"))
            .node_classes(NodeClass::Method.value());
        let found = session.browse(&[methods], 0).await.unwrap().remove(0);
        assert_eq!(found.references.len(), 1);
        assert_eq!(found.references[0].browse_name.name, "Echo");
    }

    #[tokio::test]
    async fn test_translate_browse_paths() {
        let session = session();
        let element = |name: &str| RelativePathElement {
            reference_type_id: reference_types::HIERARCHICAL_REFERENCES,
            is_inverse: false,
            include_subtypes: true,
            target_name: QualifiedName::from(name),
        };
        let path = BrowsePath {
            starting_node: NodeId::ROOT_FOLDER,
            relative_path: vec![element("Objects"), element("1:Plant"), element("1:Var2")],
        };
        let result = session.translate_browse_paths(&[path]).await.unwrap().remove(0);
        assert_eq!(result.status_code, StatusCode::GOOD);
        assert_eq!(result.targets[0].target_id.node_id, NodeId::numeric(1, 102));

        // names are matched with their namespace
        let wrong_ns = BrowsePath {
            starting_node: NodeId::OBJECTS_FOLDER,
            relative_path: vec![element("Plant")],
        };
        let result = session.translate_browse_paths(&[wrong_ns]).await.unwrap().remove(0);
        assert_eq!(result.status_code, StatusCode::BAD_NO_MATCH);
    }

    #[tokio::test]
    async fn test_read_and_write() {
        let session = session();
        let var = NodeId::numeric(1, 100);
        let value = session.read_one(&var, AttributeId::Value).await.unwrap();
        assert_eq!(value.value, Variant::Int32(0));
        assert!(value.server_timestamp.is_some());

        let write = |node_id: NodeId, value: Variant| WriteValue {
            node_id,
            attribute_id: AttributeId::Value,
            index_range: None,
            value: DataValue::new(value),
        };
        session.modify_space(|space| {
            if let Some(node) = space.node_mut(&var) {
                node.access_level = Some(crate::client::ACCESS_LEVEL_CURRENT_READ);
            }
        });
        let status = session.write(&[write(var.clone(), Variant::Int32(5))]).await.unwrap();
        assert_eq!(status[0], StatusCode::BAD_NOT_WRITABLE);

        let arr = NodeId::string(1, "Array");
        let status = session
            .write(&[write(arr.clone(), Variant::String("x".into()))])
            .await
            .unwrap();
        assert_eq!(status[0], StatusCode::BAD_TYPE_MISMATCH);

        let mut partial = write(arr.clone(), Variant::array(OpcUaDataType::Double, vec![Variant::Double(9.0)]));
        partial.index_range = Some(IndexRange::Index(1));
        assert_eq!(session.write(&[partial]).await.unwrap()[0], StatusCode::GOOD);

        let mut read = ReadValueId::value(arr);
        read.index_range = Some(IndexRange::Range(1, 5));
        let slice = session.read(&[read], Duration::ZERO).await.unwrap().remove(0);
        assert_eq!(
            slice.value,
            Variant::array(OpcUaDataType::Double, vec![Variant::Double(9.0), Variant::Double(3.0)])
        );

        let missing = session.read_one(&NodeId::numeric(1, 999), AttributeId::Value).await.unwrap();
        assert_eq!(missing.status, StatusCode::BAD_NODE_ID_UNKNOWN);
        let invalid = session.read_one(&var, AttributeId::Executable).await.unwrap();
        assert_eq!(invalid.status, StatusCode::BAD_ATTRIBUTE_ID_INVALID);
    }

    #[tokio::test]
    async fn test_call_validation_and_handlers() {
        let session = session();
        let plant = NodeId::string(1, "Plant");
        let echo = NodeId::string(1, "Echo");
        let call = |args: Vec<Variant>| CallMethodRequest {
            object_id: plant.clone(),
            method_id: echo.clone(),
            input_arguments: args,
        };

        let echoed = session.call(&[call(vec![Variant::Int32(7)])]).await.unwrap().remove(0);
        assert_eq!(echoed.status_code, StatusCode::GOOD);
        assert_eq!(echoed.output_arguments, vec![Variant::Int32(7)]);

        let results = session
            .call(&[call(vec![]), call(vec![Variant::Int32(1), Variant::Int32(2)]), call(vec![Variant::from("x")])])
            .await
            .unwrap();
        assert_eq!(results[0].status_code, StatusCode::BAD_ARGUMENTS_MISSING);
        assert_eq!(results[1].status_code, StatusCode::BAD_TOO_MANY_ARGUMENTS);
        assert_eq!(results[2].status_code, StatusCode::BAD_INVALID_ARGUMENT);
        assert_eq!(results[2].input_argument_results, vec![StatusCode::BAD_TYPE_MISMATCH]);

        session.register_method(echo.clone(), |args| {
            let v = args[0].as_i64().ok_or(StatusCode::BAD_INVALID_ARGUMENT)?;
            Ok(vec![Variant::Int32(v as i32 * 2)])
        });
        let doubled = session.call(&[call(vec![Variant::Int32(21)])]).await.unwrap().remove(0);
        assert_eq!(doubled.output_arguments, vec![Variant::Int32(42)]);

        let wrong_object = CallMethodRequest {
            object_id: NodeId::OBJECTS_FOLDER,
            method_id: echo,
            input_arguments: vec![Variant::Int32(1)],
        };
        let result = session.call(&[wrong_object]).await.unwrap().remove(0);
        assert_eq!(result.status_code, StatusCode::BAD_METHOD_INVALID);
        assert_eq!(session.request_count(), 4);
    }
}
