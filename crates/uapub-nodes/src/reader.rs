// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request-scoped session access shared by all node services.
//!
//! A [`NodeReader`] lives for one service call. It binds the connection to
//! the diagnostics level, cancellation token and timeout of the request and
//! offers the building blocks the services compose: guarded service calls,
//! id formatting against the session namespace table, node model reads and
//! the translation of failures into inline error records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::{
    BrowseDescription, BrowsePath, BrowsePathResult, BrowseResult, CallMethodRequest,
    CallMethodResult, Connection, ReadValueId, ReferenceDescription, VariantCodec,
    VariantConverterRegistry, WriteValue,
};
use crate::diagnostics::{DiagnosticsLevel, ServiceResult};
use crate::error::{OpcUaError, OpcUaResult, OperationError};
use crate::models::{ErrorInfoResponse, NodeModel};
use crate::status::StatusCode;
use crate::types::{
    reference_types, AttributeId, BrowseDirection, ExpandedNodeId, NodeClass, NodeId,
    OpcUaDataType, QualifiedName,
};
use crate::variant::{DataValue, Variant};

/// Supertype hops followed when resolving a data type to its built-in type.
const MAX_TYPE_HIERARCHY_DEPTH: usize = 32;

/// Attributes read for every node model.
const NODE_ATTRIBUTES: [AttributeId; 20] = [
    AttributeId::NodeClass,
    AttributeId::BrowseName,
    AttributeId::DisplayName,
    AttributeId::Description,
    AttributeId::WriteMask,
    AttributeId::UserWriteMask,
    AttributeId::IsAbstract,
    AttributeId::Symmetric,
    AttributeId::InverseName,
    AttributeId::ContainsNoLoops,
    AttributeId::EventNotifier,
    AttributeId::DataType,
    AttributeId::ValueRank,
    AttributeId::ArrayDimensions,
    AttributeId::AccessLevel,
    AttributeId::UserAccessLevel,
    AttributeId::MinimumSamplingInterval,
    AttributeId::Historizing,
    AttributeId::Executable,
    AttributeId::UserExecutable,
];

/// What [`NodeReader::read_node`] reads besides the attributes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NodeReadOptions {
    /// Read and encode the value of variables.
    pub read_value: bool,
    /// Children flag to report; not computed when `None`.
    pub children: Option<bool>,
}

/// Session handle bound to one request.
pub(crate) struct NodeReader {
    connection: Connection,
    codec: VariantCodec,
    level: DiagnosticsLevel,
    cancel: CancellationToken,
    timeout: Duration,
}

impl NodeReader {
    pub(crate) fn new(
        connection: &Connection,
        registry: Arc<VariantConverterRegistry>,
        level: DiagnosticsLevel,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Self {
        Self {
            codec: VariantCodec::with_registry(registry, connection.namespaces()),
            connection: Arc::clone(connection),
            level,
            cancel: cancel.clone(),
            timeout,
        }
    }

    pub(crate) fn level(&self) -> DiagnosticsLevel {
        self.level
    }

    pub(crate) fn codec(&self) -> &VariantCodec {
        &self.codec
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    pub(crate) fn parse_node_id(&self, s: &str) -> OpcUaResult<NodeId> {
        NodeId::parse_with(s, self.codec.namespaces())
    }

    /// Parses an optional id, falling back to `default` when absent or blank.
    pub(crate) fn parse_node_id_or(&self, s: Option<&str>, default: NodeId) -> OpcUaResult<NodeId> {
        match s.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => self.parse_node_id(s),
            None => Ok(default),
        }
    }

    /// Parses a reference type given by standard browse name or node id.
    pub(crate) fn parse_reference_type(&self, s: &str) -> OpcUaResult<NodeId> {
        match reference_types::from_name(s.trim()) {
            Some(id) => Ok(id),
            None => self.parse_node_id(s),
        }
    }

    pub(crate) fn format_node_id(&self, node_id: &NodeId) -> String {
        node_id.format_with(self.codec.namespaces())
    }

    pub(crate) fn format_expanded(&self, node_id: &ExpandedNodeId) -> String {
        node_id.format_with(self.codec.namespaces())
    }

    pub(crate) fn format_name(&self, name: &QualifiedName) -> String {
        name.format_with(self.codec.namespaces())
    }

    /// Local node id of a reference target, `None` for remote targets.
    pub(crate) fn local_id(&self, node_id: &ExpandedNodeId) -> Option<NodeId> {
        node_id.to_node_id(self.codec.namespaces())
    }

    /// Name of a data type: the built-in name or the formatted id.
    pub(crate) fn data_type_name(&self, data_type_id: &NodeId) -> String {
        match OpcUaDataType::from_node_id(data_type_id) {
            Some(dt) => dt.name().to_string(),
            None => self.format_node_id(data_type_id),
        }
    }

    // =========================================================================
    // Guarded service calls
    // =========================================================================

    /// Runs a session call under the request's cancellation token and
    /// timeout.
    async fn guard<T, F>(&self, service: &'static str, call: F) -> OpcUaResult<T>
    where
        F: Future<Output = OpcUaResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(OpcUaError::Cancelled);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(OpcUaError::Cancelled),
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(result) => result,
                Err(_) => {
                    debug!(service, timeout = ?self.timeout, "Session call timed out");
                    Err(OperationError::service_fault(service, StatusCode::BAD_TIMEOUT).into())
                }
            },
        }
    }

    fn single<T>(service: &'static str, mut results: Vec<T>) -> OpcUaResult<T> {
        results
            .pop()
            .ok_or_else(|| OperationError::service_fault(service, StatusCode::BAD_UNEXPECTED_ERROR).into())
    }

    pub(crate) async fn browse(
        &self,
        description: BrowseDescription,
        max_references: u32,
    ) -> OpcUaResult<BrowseResult> {
        let results = self
            .guard("Browse", self.connection.browse(&[description], max_references))
            .await?;
        Self::single("Browse", results)
    }

    pub(crate) async fn browse_next(
        &self,
        release: bool,
        continuation_point: Vec<u8>,
    ) -> OpcUaResult<BrowseResult> {
        let results = self
            .guard(
                "BrowseNext",
                self.connection.browse_next(release, &[continuation_point]),
            )
            .await?;
        Self::single("BrowseNext", results)
    }

    /// Browses a node and follows continuation points until all references
    /// are collected. A bad browse status becomes an error.
    pub(crate) async fn browse_all(
        &self,
        description: BrowseDescription,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        let node = self.format_node_id(&description.node_id);
        let mut result = self.browse(description, 0).await?;
        let mut references = Vec::new();
        loop {
            if result.status_code.is_bad() {
                return Err(OperationError::bad_status(node, result.status_code).into());
            }
            references.append(&mut result.references);
            match result.continuation_point.take() {
                Some(cp) => result = self.browse_next(false, cp).await?,
                None => break,
            }
        }
        trace!(node_id = %node, count = references.len(), "Browsed all references");
        Ok(references)
    }

    pub(crate) async fn translate(&self, path: BrowsePath) -> OpcUaResult<BrowsePathResult> {
        let results = self
            .guard(
                "TranslateBrowsePathsToNodeIds",
                self.connection.translate_browse_paths(&[path]),
            )
            .await?;
        Self::single("TranslateBrowsePathsToNodeIds", results)
    }

    pub(crate) async fn read(
        &self,
        nodes: &[ReadValueId],
        max_age: Duration,
    ) -> OpcUaResult<Vec<DataValue>> {
        let values = self.guard("Read", self.connection.read(nodes, max_age)).await?;
        if values.len() != nodes.len() {
            return Err(OperationError::service_fault("Read", StatusCode::BAD_UNEXPECTED_ERROR).into());
        }
        Ok(values)
    }

    pub(crate) async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
    ) -> OpcUaResult<DataValue> {
        let values = self
            .read(&[ReadValueId::new(node_id.clone(), attribute_id)], Duration::ZERO)
            .await?;
        Self::single("Read", values)
    }

    pub(crate) async fn write(&self, values: &[WriteValue]) -> OpcUaResult<Vec<StatusCode>> {
        let results = self.guard("Write", self.connection.write(values)).await?;
        if results.len() != values.len() {
            return Err(OperationError::service_fault("Write", StatusCode::BAD_UNEXPECTED_ERROR).into());
        }
        Ok(results)
    }

    pub(crate) async fn call(&self, request: CallMethodRequest) -> OpcUaResult<CallMethodResult> {
        let results = self.guard("Call", self.connection.call(&[request])).await?;
        Self::single("Call", results)
    }

    // =========================================================================
    // Composed reads
    // =========================================================================

    /// Returns `true` when the node has forward hierarchical references.
    pub(crate) async fn has_children(&self, node_id: &NodeId) -> OpcUaResult<bool> {
        let result = self
            .browse(BrowseDescription::hierarchical(node_id.clone()), 1)
            .await?;
        if let Some(cp) = result.continuation_point {
            self.browse_next(true, cp).await?;
        }
        Ok(result.status_code.is_good() && !result.references.is_empty())
    }

    /// Type definition of an object or variable.
    pub(crate) async fn type_definition(&self, node_id: &NodeId) -> OpcUaResult<Option<NodeId>> {
        let description = BrowseDescription::hierarchical(node_id.clone())
            .reference_type(reference_types::HAS_TYPE_DEFINITION, false);
        let references = self.browse_all(description).await?;
        Ok(references.first().and_then(|r| self.local_id(&r.node_id)))
    }

    /// Supertype of a type node.
    pub(crate) async fn supertype(&self, type_id: &NodeId) -> OpcUaResult<Option<NodeId>> {
        let description = BrowseDescription::hierarchical(type_id.clone())
            .direction(BrowseDirection::Backward)
            .reference_type(reference_types::HAS_SUBTYPE, false);
        let references = self.browse_all(description).await?;
        Ok(references.first().and_then(|r| self.local_id(&r.node_id)))
    }

    /// Resolves a data type node to the built-in type its values use.
    ///
    /// Walks the supertype chain until a built-in type is found; unknown
    /// types resolve to `Variant`.
    pub(crate) async fn builtin_type(&self, data_type_id: &NodeId) -> OpcUaResult<OpcUaDataType> {
        let mut current = data_type_id.clone();
        for _ in 0..MAX_TYPE_HIERARCHY_DEPTH {
            if let Some(dt) = OpcUaDataType::from_node_id(&current) {
                return Ok(dt);
            }
            match self.supertype(&current).await? {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(OpcUaDataType::Variant)
    }

    /// Resolves a data type given by built-in name (any case) or node id.
    pub(crate) async fn resolve_data_type(&self, name: &str) -> OpcUaResult<OpcUaDataType> {
        match OpcUaDataType::from_name(name.trim()) {
            Some(dt) => Ok(dt),
            None => {
                let id = self.parse_node_id(name)?;
                self.builtin_type(&id).await
            }
        }
    }

    /// Model of a reference target built only from the reference.
    pub(crate) fn raw_node(&self, reference: &ReferenceDescription) -> NodeModel {
        NodeModel {
            node_id: self.format_expanded(&reference.node_id),
            node_class: Some(reference.node_class),
            browse_name: Some(self.format_name(&reference.browse_name)),
            display_name: Some(reference.display_name.text.clone()),
            type_definition_id: reference
                .type_definition
                .as_ref()
                .map(|t| self.format_expanded(t)),
            ..Default::default()
        }
    }

    /// Reads the attributes of a node into a model.
    ///
    /// An unreadable node class (unknown node) is an error; failures reading
    /// the value are reported on the model's `error_info`.
    pub(crate) async fn read_node(
        &self,
        node_id: &NodeId,
        options: NodeReadOptions,
    ) -> OpcUaResult<NodeModel> {
        let formatted = self.format_node_id(node_id);
        let mut items: Vec<ReadValueId> = NODE_ATTRIBUTES
            .iter()
            .map(|a| ReadValueId::new(node_id.clone(), *a))
            .collect();
        if options.read_value {
            items.push(ReadValueId::value(node_id.clone()));
        }
        let values = self.read(&items, Duration::ZERO).await?;

        let mut model = NodeModel::with_id(formatted.clone());
        model.children = options.children;
        let mut data_type_id = None;
        for (item, dv) in items.iter().zip(values.iter()) {
            if item.attribute_id == AttributeId::NodeClass && dv.status.is_bad() {
                return Err(OperationError::bad_status(formatted, dv.status).into());
            }
            if dv.status.is_bad() || dv.value.is_null() || item.attribute_id == AttributeId::Value {
                continue;
            }
            let v = &dv.value;
            match item.attribute_id {
                AttributeId::NodeClass => {
                    model.node_class = v.as_u32().and_then(NodeClass::from_value)
                }
                AttributeId::BrowseName => {
                    if let Variant::QualifiedName(q) = v {
                        model.browse_name = Some(self.format_name(q));
                    }
                }
                AttributeId::DisplayName => {
                    model.display_name = v.as_localized_text().map(|t| t.text.clone())
                }
                AttributeId::Description => {
                    model.description = v.as_localized_text().map(|t| t.text.clone())
                }
                AttributeId::InverseName => {
                    model.inverse_name = v.as_localized_text().map(|t| t.text.clone())
                }
                AttributeId::WriteMask => model.write_mask = v.as_u32(),
                AttributeId::UserWriteMask => model.user_write_mask = v.as_u32(),
                AttributeId::IsAbstract => model.is_abstract = v.as_bool(),
                AttributeId::Symmetric => model.symmetric = v.as_bool(),
                AttributeId::ContainsNoLoops => model.contains_no_loops = v.as_bool(),
                AttributeId::EventNotifier => {
                    model.event_notifier = v.as_i64().and_then(|n| u8::try_from(n).ok())
                }
                AttributeId::DataType => {
                    if let Some(id) = v.as_node_id() {
                        model.data_type = Some(self.data_type_name(id));
                        data_type_id = Some(id.clone());
                    }
                }
                AttributeId::ValueRank => {
                    model.value_rank = v.as_i64().and_then(|n| i32::try_from(n).ok())
                }
                AttributeId::ArrayDimensions => {
                    model.array_dimensions = v
                        .as_array()
                        .map(|dims| dims.iter().filter_map(Variant::as_u32).collect())
                }
                AttributeId::AccessLevel => model.access_level = v.as_u32(),
                AttributeId::UserAccessLevel => model.user_access_level = v.as_u32(),
                AttributeId::MinimumSamplingInterval => model.minimum_sampling_interval = v.as_f64(),
                AttributeId::Historizing => model.historizing = v.as_bool(),
                AttributeId::Executable => model.executable = v.as_bool(),
                AttributeId::UserExecutable => model.user_executable = v.as_bool(),
                _ => {}
            }
        }

        let node_class = model.node_class.unwrap_or_default();
        if matches!(node_class, NodeClass::Object | NodeClass::Variable) {
            model.type_definition_id = self
                .type_definition(node_id)
                .await?
                .map(|t| self.format_node_id(&t));
        }

        if options.read_value && node_class.has_value() {
            if let Some(dv) = values.last() {
                self.fill_value(&mut model, dv, data_type_id.as_ref()).await?;
            }
        }
        Ok(model)
    }

    async fn fill_value(
        &self,
        model: &mut NodeModel,
        value: &DataValue,
        data_type_id: Option<&NodeId>,
    ) -> OpcUaResult<()> {
        if let Some(error) =
            ServiceResult::from_status(value.status, &format!("Read value of {}", model.node_id), self.level)
        {
            model.error_info = Some(error);
            return Ok(());
        }
        let declared = match data_type_id {
            Some(id) => self.builtin_type(id).await?,
            None => OpcUaDataType::Variant,
        };
        match self.codec.encode(&value.value, declared) {
            Ok(json) => {
                model.value = Some(json);
                model.source_timestamp = value.source_timestamp;
                model.server_timestamp = value.server_timestamp;
            }
            Err(e) => model.error_info = Some(self.fault(&e)),
        }
        Ok(())
    }

    // =========================================================================
    // Error records
    // =========================================================================

    /// Error record of a failure at the request's level.
    pub(crate) fn fault(&self, error: &OpcUaError) -> ServiceResult {
        error.to_service_result(self.level)
    }

    /// Error record of a server status, `None` when good.
    pub(crate) fn status(&self, code: StatusCode, context: &str) -> Option<ServiceResult> {
        ServiceResult::from_status(code, context, self.level)
    }

    /// Finishes a service call: request errors propagate, every other
    /// failure becomes the response's `error_info`.
    pub(crate) fn settle<T: ErrorInfoResponse>(
        &self,
        context: &str,
        result: OpcUaResult<T>,
    ) -> OpcUaResult<T> {
        match result {
            Ok(response) => Ok(response),
            Err(error @ OpcUaError::Request(_)) => {
                error.log(context);
                Err(error)
            }
            Err(error) => {
                error.log(context);
                Ok(T::from_error_info(self.fault(&error)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AddressSpace, MemorySession};
    use crate::models::BrowseFirstResponse;
    use crate::error::RequestError;

    fn reader(space: AddressSpace) -> NodeReader {
        let connection: Connection = Arc::new(MemorySession::new(space));
        NodeReader::new(
            &connection,
            Arc::new(VariantConverterRegistry::with_builtin_converters()),
            DiagnosticsLevel::Verbose,
            &CancellationToken::new(),
            Duration::from_secs(5),
        )
    }

    fn sample() -> AddressSpace {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace("http://test.org/UA/");
        let machine = NodeId::string(ns, "Machine");
        space.add_object(
            machine.clone(),
            QualifiedName::new(ns, "Machine"),
            &NodeId::OBJECTS_FOLDER,
            &reference_types::ORGANIZES,
            &NodeId::BASE_OBJECT_TYPE,
        );
        space.add_variable(
            NodeId::string(ns, "Speed"),
            QualifiedName::new(ns, "Speed"),
            &machine,
            OpcUaDataType::Double,
            Variant::Double(12.5),
        );
        space
    }

    #[tokio::test]
    async fn test_read_node_variable() {
        let reader = reader(sample());
        let id = reader.parse_node_id("http://test.org/UA/#s=Speed").unwrap();
        let model = reader
            .read_node(&id, NodeReadOptions { read_value: true, children: None })
            .await
            .unwrap();
        assert_eq!(model.node_id, "http://test.org/UA/#s=Speed");
        assert_eq!(model.node_class, Some(NodeClass::Variable));
        assert_eq!(model.data_type.as_deref(), Some("Double"));
        assert_eq!(model.value, Some(serde_json::json!(12.5)));
        assert_eq!(model.type_definition_id.as_deref(), Some("i=63"));
        assert!(model.server_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_read_node_unknown() {
        let reader = reader(sample());
        let err = reader
            .read_node(&NodeId::string(0, "bad"), NodeReadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[tokio::test]
    async fn test_has_children_releases_continuation() {
        let reader = reader(sample());
        assert!(reader.has_children(&NodeId::OBJECTS_FOLDER).await.unwrap());
        let speed = reader.parse_node_id("http://test.org/UA/#s=Speed").unwrap();
        assert!(!reader.has_children(&speed).await.unwrap());
    }

    #[tokio::test]
    async fn test_builtin_type_of_subtype() {
        let reader = reader(sample());
        // Duration (i=290) derives from Double
        assert_eq!(
            reader.builtin_type(&NodeId::numeric(0, 290)).await.unwrap(),
            OpcUaDataType::Double
        );
        assert_eq!(
            reader.builtin_type(&NodeId::string(0, "Unknown")).await.unwrap(),
            OpcUaDataType::Variant
        );
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let connection: Connection = Arc::new(MemorySession::new(sample()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reader = NodeReader::new(
            &connection,
            Arc::new(VariantConverterRegistry::with_builtin_converters()),
            DiagnosticsLevel::Status,
            &cancel,
            Duration::from_secs(5),
        );
        let err = reader.has_children(&NodeId::ROOT_FOLDER).await.unwrap_err();
        assert!(matches!(err, OpcUaError::Cancelled));
    }

    #[test]
    fn test_settle_routes_request_errors() {
        let reader = reader(sample());
        let request: OpcUaResult<BrowseFirstResponse> =
            Err(RequestError::bad_request("missing").into());
        assert!(reader.settle("test", request).is_err());

        let failed: OpcUaResult<BrowseFirstResponse> =
            Err(OperationError::bad_status("i=1", StatusCode::BAD_NOT_FOUND).into());
        let response = reader.settle("test", failed).unwrap();
        assert_eq!(
            response.error_info.map(|e| e.status_code),
            Some(StatusCode::BAD_NOT_FOUND)
        );
    }
}
