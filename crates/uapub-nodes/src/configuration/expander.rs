// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Expansion of configured nodes into publishable variables.
//!
//! Every configured node is resolved and classified first. Objects,
//! object types, variables and variable types are then walked into the
//! objects they stand for, and every object into the variables it
//! aggregates:
//!
//! ```text
//! ┌──────────────┐  resolve + NodeClass  ┌──────────────────────────┐
//! │ OpcNode list │ ────────────────────► │ NodeToExpand (per node)  │
//! └──────────────┘                       └────────────┬─────────────┘
//!                                                     │ discover
//!                     ┌───────────────────────────────┼────────────────────┐
//!                     ▼                               ▼                    ▼
//!              Object: Hierarchical          Type: instances from     Variable:
//!              walk for objects              the Objects folder       Aggregates walk
//!                     │                               │                    │
//!                     └──────────────► ObjectToExpand ◄────────────────────┘
//!                                           │ Aggregates walk for variables
//!                                           ▼
//!                     one entry per object, or one merged entry at the end
//! ```
//!
//! Per-node failures never stop the expansion; they are returned as their
//! own results at the end unless errors are discarded.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::browse_path::resolve_target;
use crate::client::ReadValueId;
use crate::configuration::models::{
    validate_nodes, OpcNode, PublishedNodeExpansion, PublishedNodesEntry, ServiceResponse,
};
use crate::configuration::published_nodes::PublishedNodesServices;
use crate::configuration::walker::{Frame, Walk};
use crate::diagnostics::ServiceResult;
use crate::error::{OpcUaError, OpcUaResult};
use crate::reader::NodeReader;
use crate::status::StatusCode;
use crate::types::{reference_types, AttributeId, NodeClass, NodeId};

// =============================================================================
// Expansion state
// =============================================================================

/// An object and the variables found below it.
#[derive(Debug)]
struct ObjectToExpand {
    frame: Frame,
    variables: Vec<Frame>,
    known: HashSet<NodeId>,
    /// Emitted as its own entry; excluded from the merged entry.
    returned: bool,
}

impl ObjectToExpand {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            variables: Vec::new(),
            known: HashSet::new(),
            returned: false,
        }
    }

    fn add_variables(&mut self, frames: impl IntoIterator<Item = Frame>) {
        for frame in frames {
            if self.known.insert(frame.node_id.clone()) {
                self.variables.push(frame);
            }
        }
    }
}

/// A configured node being expanded.
#[derive(Debug)]
struct NodeToExpand {
    config: OpcNode,
    node_id: Option<NodeId>,
    node_class: NodeClass,
    errors: Vec<ServiceResult>,
    objects: Vec<ObjectToExpand>,
    /// Variables found for variable and variable type nodes.
    variables: ObjectToExpand,
    variables_walked: bool,
    known: HashSet<NodeId>,
}

impl NodeToExpand {
    fn new(config: OpcNode) -> Self {
        Self {
            config,
            node_id: None,
            node_class: NodeClass::Unspecified,
            errors: Vec::new(),
            objects: Vec::new(),
            variables: ObjectToExpand::new(Frame::root(NodeId::null(), NodeClass::Variable)),
            variables_walked: false,
            known: HashSet::new(),
        }
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn expands_to_variables(&self) -> bool {
        self.node_class.has_value()
    }

    fn add_found(&mut self, frames: impl IntoIterator<Item = Frame>) {
        if self.expands_to_variables() {
            self.variables.add_variables(frames);
            return;
        }
        for frame in frames {
            if !frame.node_id.is_null() && self.known.insert(frame.node_id.clone()) {
                self.objects.push(ObjectToExpand::new(frame));
            }
        }
    }

    fn object(&self, target: Target) -> &ObjectToExpand {
        match target {
            Target::Object(index) => &self.objects[index],
            Target::Variables => &self.variables,
        }
    }

    fn object_mut(&mut self, target: Target) -> &mut ObjectToExpand {
        match target {
            Target::Object(index) => &mut self.objects[index],
            Target::Variables => &mut self.variables,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Object(usize),
    Variables,
}

// =============================================================================
// Expansion
// =============================================================================

/// Expands the nodes of `entry` into data set writer entries.
///
/// Entries are passed to `sink` before they are emitted. The nodes of the
/// entry must have been validated. The stream ends early when the reader's
/// cancellation token fires.
pub(crate) fn expand(
    reader: NodeReader,
    entry: PublishedNodesEntry,
    options: PublishedNodeExpansion,
    sink: Option<Arc<dyn PublishedNodesServices>>,
) -> BoxStream<'static, ServiceResponse<PublishedNodesEntry>> {
    Box::pin(stream! {
        let mut expansion = Expansion::new(reader, entry, options, sink);
        if expansion.resolve().await.is_err() {
            debug!("Expansion cancelled while resolving nodes");
            return;
        }
        for index in 0..expansion.nodes.len() {
            if expansion.discover(index).await.is_err() {
                debug!("Expansion cancelled");
                return;
            }
            let mut object = 0;
            while object < expansion.nodes[index].objects.len() {
                match expansion.expand_object(index, object).await {
                    Ok(Some(result)) => yield result,
                    Ok(None) => {}
                    Err(_) => {
                        debug!("Expansion cancelled");
                        return;
                    }
                }
                object += 1;
            }
            if expansion.nodes[index].variables_walked {
                if let Some(result) = expansion.process(index, Target::Variables).await {
                    yield result;
                }
            }
            expansion.check_resolved(index);
        }
        if expansion.reader.is_cancelled() {
            return;
        }
        for result in expansion.finish().await {
            yield result;
        }
    })
}

struct Expansion {
    reader: NodeReader,
    template: PublishedNodesEntry,
    options: PublishedNodeExpansion,
    sink: Option<Arc<dyn PublishedNodesServices>>,
    nodes: Vec<NodeToExpand>,
}

impl Expansion {
    fn new(
        reader: NodeReader,
        mut template: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        sink: Option<Arc<dyn PublishedNodesServices>>,
    ) -> Self {
        let nodes = template
            .opc_nodes
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(NodeToExpand::new)
            .collect();
        Self {
            reader,
            template,
            options,
            sink,
            nodes,
        }
    }

    /// Keeps a failure on the node; only cancellation is returned.
    fn record(&mut self, index: usize, error: OpcUaError) -> OpcUaResult<()> {
        if matches!(error, OpcUaError::Cancelled) {
            return Err(error);
        }
        let node = &mut self.nodes[index];
        warn!(
            node_id = node.config.node_id().unwrap_or_default(),
            error = %error,
            "Failed to expand node"
        );
        node.errors.push(self.reader.fault(&error));
        Ok(())
    }

    fn fail(&mut self, index: usize, code: StatusCode, message: String) {
        let error = ServiceResult::with_message(code, message).filtered(self.reader.level());
        self.nodes[index].errors.push(error);
    }

    /// Resolves every node and reads the node classes in one request.
    async fn resolve(&mut self) -> OpcUaResult<()> {
        for index in 0..self.nodes.len() {
            let config = &self.nodes[index].config;
            let resolved = resolve_target(
                &self.reader,
                config.node_id(),
                config.browse_path.as_deref(),
                "BrowsePath",
            )
            .await;
            match resolved {
                Ok(node_id) => {
                    let node = &mut self.nodes[index];
                    node.variables.frame = Frame::root(node_id.clone(), NodeClass::Variable);
                    node.node_id = Some(node_id);
                }
                Err(error) => self.record(index, error)?,
            }
        }

        let reads: Vec<(usize, ReadValueId)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                node.node_id
                    .clone()
                    .map(|id| (index, ReadValueId::new(id, AttributeId::NodeClass)))
            })
            .collect();
        if reads.is_empty() {
            return Ok(());
        }
        let items: Vec<ReadValueId> = reads.iter().map(|(_, item)| item.clone()).collect();
        match self.reader.read(&items, Duration::ZERO).await {
            Ok(values) => {
                for ((index, _), value) in reads.into_iter().zip(values) {
                    match self.reader.status(value.status, "Read") {
                        Some(error) => self.nodes[index].errors.push(error),
                        None => {
                            self.nodes[index].node_class = value
                                .value
                                .as_u32()
                                .and_then(NodeClass::from_value)
                                .unwrap_or_default();
                        }
                    }
                }
            }
            Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
            Err(error) => {
                warn!(error = %error, "Failed to read node classes");
                let fault = self.reader.fault(&error);
                for (index, _) in reads {
                    self.nodes[index].errors.push(fault.clone());
                }
            }
        }
        Ok(())
    }

    /// Finds the objects or variables a node stands for.
    async fn discover(&mut self, index: usize) -> OpcUaResult<()> {
        let node = &self.nodes[index];
        let Some(node_id) = node.node_id.clone() else {
            return Ok(());
        };
        let node_class = node.node_class;
        let has_errors = node.has_errors();
        let include_root = !self.options.exclude_root_if_instance_node;
        let max_depth = self.options.max_depth;
        let levels = self.options.max_levels_to_expand;
        let stop_at_first = self.options.stop_at_first_found_instance;

        let walk = match node_class {
            NodeClass::Object => {
                if include_root {
                    self.nodes[index].add_found([Frame::root(node_id.clone(), node_class)]);
                    if max_depth == 0 {
                        return Ok(());
                    }
                }
                let reference = if stop_at_first {
                    reference_types::ORGANIZES
                } else {
                    reference_types::HIERARCHICAL_REFERENCES
                };
                let walk = Walk::new(reference, Some(max_depth.max(1))).collect(&[NodeClass::Object]);
                Some((walk, Frame::root(node_id, node_class)))
            }
            NodeClass::ObjectType | NodeClass::VariableType => {
                let instance = if node_class == NodeClass::ObjectType {
                    NodeClass::Object
                } else {
                    NodeClass::Variable
                };
                let reference = if stop_at_first && instance == NodeClass::Object {
                    reference_types::ORGANIZES
                } else {
                    reference_types::HIERARCHICAL_REFERENCES
                };
                let walk = Walk::new(reference, (max_depth > 0).then_some(max_depth))
                    .collect(&[instance])
                    .of_type(node_id, !self.options.no_sub_types_of_type_nodes)
                    .stop_at_matches(stop_at_first);
                Some((walk, Frame::root(NodeId::OBJECTS_FOLDER, NodeClass::Object)))
            }
            NodeClass::Variable => {
                if include_root {
                    self.nodes[index].add_found([Frame::root(node_id.clone(), node_class)]);
                    if levels == 0 {
                        return Ok(());
                    }
                }
                let walk = Walk::new(reference_types::AGGREGATES, Some(levels.max(1)))
                    .traverse(&[NodeClass::Variable])
                    .collect(&[NodeClass::Variable]);
                Some((walk, Frame::root(node_id, node_class)))
            }
            NodeClass::Unspecified if has_errors => None,
            other => {
                self.fail(
                    index,
                    StatusCode::BAD_NOT_SUPPORTED,
                    format!("Node class {} not supported.", other),
                );
                None
            }
        };

        if let Some((walk, start)) = walk {
            let node = &mut self.nodes[index];
            node.variables_walked = node.expands_to_variables();
            match walk.run(&self.reader, &start).await {
                Ok(found) => self.nodes[index].add_found(found),
                Err(error) => self.record(index, error)?,
            }
        }
        let node = &self.nodes[index];
        debug!(
            node_id = %self.reader.format_node_id(node.node_id.as_ref().unwrap_or(&NodeId::null())),
            node_class = %node.node_class,
            objects = node.objects.len(),
            variables = node.variables.variables.len(),
            "Node discovered"
        );
        Ok(())
    }

    /// Collects the variables of one object and emits its entry.
    async fn expand_object(
        &mut self,
        index: usize,
        object: usize,
    ) -> OpcUaResult<Option<ServiceResponse<PublishedNodesEntry>>> {
        let levels = self.options.max_levels_to_expand;
        let type_instance = self.nodes[index].node_class == NodeClass::ObjectType;
        let split = type_instance && !self.options.flatten_type_instance;

        let mut traverse = vec![NodeClass::Variable];
        let mut collect = vec![NodeClass::Variable];
        if type_instance {
            traverse.push(NodeClass::Object);
        }
        if split {
            collect.push(NodeClass::Object);
        }
        let walk = Walk::new(reference_types::AGGREGATES, (levels > 0).then_some(levels))
            .traverse(&traverse)
            .collect(&collect)
            .stop_at_objects(split);

        let frame = self.nodes[index].objects[object].frame.clone();
        let start = Frame::root(frame.node_id.clone(), frame.node_class);
        match walk.run(&self.reader, &start).await {
            Ok(found) => {
                let (objects, variables): (Vec<Frame>, Vec<Frame>) = found
                    .into_iter()
                    .partition(|f| f.node_class == NodeClass::Object);
                let node = &mut self.nodes[index];
                node.objects[object].add_variables(variables);
                node.add_found(objects.into_iter().map(|f| f.below(&frame.browse_path)));
            }
            Err(error) => self.record(index, error)?,
        }
        Ok(self.process(index, Target::Object(object)).await)
    }

    /// Emits an object as its own entry unless everything is merged.
    async fn process(
        &mut self,
        index: usize,
        target: Target,
    ) -> Option<ServiceResponse<PublishedNodesEntry>> {
        let node = &self.nodes[index];
        let object = node.object(target);
        if self.options.create_single_writer || node.has_errors() || object.variables.is_empty() {
            return None;
        }
        let field_id = node.config.data_set_field_id.clone().unwrap_or_default();
        let mut ids = HashSet::new();
        let entry = PublishedNodesEntry {
            data_set_name: Some(self.reader.format_node_id(&object.frame.node_id)),
            data_set_writer_id: Some(format!("{}{}", field_id, object.frame.browse_path)),
            opc_nodes: Some(to_opc_nodes(&self.reader, &node.config, object, false, &mut ids)),
            ..self.template.clone()
        };
        let result = self.save(entry).await;
        self.nodes[index].object_mut(target).returned = true;
        if self.options.discard_errors && !result.is_good() {
            return None;
        }
        Some(result)
    }

    fn check_resolved(&mut self, index: usize) {
        let node = &self.nodes[index];
        if node.node_id.is_some()
            && !node.has_errors()
            && node.objects.is_empty()
            && node.variables.variables.is_empty()
        {
            self.fail(index, StatusCode::BAD_NOT_FOUND, "No objects resolved.".to_string());
        }
    }

    /// Merges what was not emitted yet and reports the failed nodes.
    async fn finish(&mut self) -> Vec<ServiceResponse<PublishedNodesEntry>> {
        let mut results = Vec::new();
        let mut ids = HashSet::new();
        let mut good = Vec::new();
        for node in self.nodes.iter().filter(|n| !n.has_errors()) {
            good.extend(all_nodes(&self.reader, node, &mut ids, false));
        }
        if !good.is_empty() {
            let entry = PublishedNodesEntry {
                opc_nodes: Some(good),
                ..self.template.clone()
            };
            let result = self.save(entry).await;
            if !self.options.discard_errors || result.is_good() {
                results.push(result);
            }
        }

        let mut failed = 0usize;
        if !self.options.discard_errors {
            for node in self.nodes.iter().filter(|n| n.has_errors()) {
                let nodes = all_nodes(&self.reader, node, &mut ids, true);
                for error in &node.errors {
                    failed += 1;
                    results.push(ServiceResponse::failed(
                        PublishedNodesEntry {
                            opc_nodes: Some(nodes.clone()),
                            ..self.template.clone()
                        },
                        error.clone(),
                    ));
                }
            }
        }
        info!(
            nodes = self.nodes.len(),
            merged = results.len() - failed,
            failed,
            "Expansion completed"
        );
        results
    }

    /// Validates an entry and hands it to the sink.
    async fn save(&self, mut entry: PublishedNodesEntry) -> ServiceResponse<PublishedNodesEntry> {
        match self.persist(&mut entry).await {
            Ok(()) => ServiceResponse::ok(entry),
            Err(error) => {
                error.log("Expand");
                let error_info = self.reader.fault(&error);
                ServiceResponse::failed(entry, error_info)
            }
        }
    }

    async fn persist(&self, entry: &mut PublishedNodesEntry) -> OpcUaResult<()> {
        if let Some(nodes) = entry.opc_nodes.as_mut() {
            validate_nodes(nodes)?;
        }
        if let Some(sink) = &self.sink {
            sink.create_or_update_data_set_writer_entry(entry).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Node models
// =============================================================================

/// Nodes of an object, field ids derived from the configured field id.
///
/// Long ids include the object path so ids stay distinct when objects are
/// merged into one entry.
fn to_opc_nodes(
    reader: &NodeReader,
    template: &OpcNode,
    object: &ObjectToExpand,
    long_ids: bool,
    ids: &mut HashSet<String>,
) -> Vec<OpcNode> {
    let base = template.data_set_field_id.as_deref().unwrap_or_default();
    object
        .variables
        .iter()
        .map(|frame| {
            let id = if long_ids {
                format!("{}{}{}", base, object.frame.browse_path, frame.browse_path)
            } else {
                format!("{}{}", base, frame.browse_path)
            };
            OpcNode {
                id: Some(reader.format_node_id(&frame.node_id)),
                expanded_node_id: None,
                browse_path: None,
                attribute_id: None,
                data_set_field_id: Some(unique_id(ids, id)),
                display_name: frame
                    .display_name
                    .clone()
                    .or_else(|| template.display_name.clone()),
                ..template.clone()
            }
        })
        .collect()
}

/// Everything of a node not emitted yet; failed nodes lead with the
/// configured node.
fn all_nodes(
    reader: &NodeReader,
    node: &NodeToExpand,
    ids: &mut HashSet<String>,
    failed: bool,
) -> Vec<OpcNode> {
    let mut nodes = Vec::new();
    if failed {
        nodes.push(node.config.clone());
    }
    if node.expands_to_variables() {
        if !node.variables.returned {
            nodes.extend(to_opc_nodes(reader, &node.config, &node.variables, true, ids));
        }
    } else {
        for object in node.objects.iter().filter(|o| !o.returned) {
            nodes.extend(to_opc_nodes(reader, &node.config, object, true, ids));
        }
    }
    nodes
}

fn unique_id(ids: &mut HashSet<String>, id: String) -> String {
    if ids.insert(id.clone()) {
        return id;
    }
    let mut index = 1;
    loop {
        let candidate = format!("{}_{}", id, index);
        if ids.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use crate::client::{
        AddressSpace, Argument, Connection, MemorySession, VariantConverterRegistry,
    };
    use crate::configuration::published_nodes::InMemoryPublishedNodes;
    use crate::diagnostics::DiagnosticsLevel;
    use crate::error::PersistenceError;
    use crate::types::{OpcUaDataType, QualifiedName};
    use crate::variant::Variant;

    const NS: &str = "http://test.org/Plant/";

    fn space() -> AddressSpace {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace(NS);
        let pump_type = NodeId::string(ns, "PumpType");
        space.add_type(
            pump_type.clone(),
            NodeClass::ObjectType,
            QualifiedName::new(ns, "PumpType"),
            &NodeId::BASE_OBJECT_TYPE,
        );
        space.add_type(
            NodeId::string(ns, "ValveType"),
            NodeClass::ObjectType,
            QualifiedName::new(ns, "ValveType"),
            &NodeId::BASE_OBJECT_TYPE,
        );
        let plant = NodeId::string(ns, "Plant");
        space.add_folder(plant.clone(), QualifiedName::new(ns, "Plant"), &NodeId::OBJECTS_FOLDER);
        for name in ["P1", "P2"] {
            let pump = NodeId::string(ns, name);
            space.add_object(
                pump.clone(),
                QualifiedName::new(ns, name),
                &plant,
                &reference_types::ORGANIZES,
                &pump_type,
            );
            for variable in ["Speed", "Temperature"] {
                space.add_variable(
                    NodeId::string(ns, format!("{}.{}", name, variable)),
                    QualifiedName::new(ns, variable),
                    &pump,
                    OpcUaDataType::Double,
                    Variant::Double(1.0),
                );
            }
        }
        let motor = NodeId::string(ns, "P1.Motor");
        space.add_object(
            motor.clone(),
            QualifiedName::new(ns, "Motor"),
            &NodeId::string(ns, "P1"),
            &reference_types::HAS_COMPONENT,
            &NodeId::BASE_OBJECT_TYPE,
        );
        space.add_variable(
            NodeId::string(ns, "P1.Motor.Current"),
            QualifiedName::new(ns, "Current"),
            &motor,
            OpcUaDataType::Double,
            Variant::Double(3.2),
        );
        space.add_method(
            NodeId::string(ns, "P1.Start"),
            QualifiedName::new(ns, "Start"),
            &NodeId::string(ns, "P1"),
            vec![Argument::new("Delay", OpcUaDataType::UInt32.node_id())],
            Vec::new(),
        );
        space
    }

    fn reader(cancel: &CancellationToken) -> NodeReader {
        let connection: Connection = Arc::new(MemorySession::new(space()));
        NodeReader::new(
            &connection,
            Arc::new(VariantConverterRegistry::with_builtin_converters()),
            DiagnosticsLevel::Status,
            cancel,
            Duration::from_secs(5),
        )
    }

    fn entry(nodes: &[(&str, &str)]) -> PublishedNodesEntry {
        let mut nodes: Vec<OpcNode> = nodes
            .iter()
            .map(|(id, field)| OpcNode::new(format!("{}#s={}", NS, id)).with_field_id(*field))
            .collect();
        validate_nodes(&mut nodes).unwrap();
        PublishedNodesEntry::new("opc.tcp://localhost:4840").with_nodes(nodes)
    }

    async fn run(
        entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        sink: Option<Arc<dyn PublishedNodesServices>>,
    ) -> Vec<ServiceResponse<PublishedNodesEntry>> {
        expand(reader(&CancellationToken::new()), entry, options, sink)
            .collect()
            .await
    }

    fn field_ids(result: &ServiceResponse<PublishedNodesEntry>) -> Vec<String> {
        result
            .result
            .as_ref()
            .and_then(|e| e.opc_nodes.as_ref())
            .map(|nodes| nodes.iter().filter_map(|n| n.data_set_field_id.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_object_writer_per_instance() {
        let options = PublishedNodeExpansion {
            exclude_root_if_instance_node: true,
            ..Default::default()
        };
        let results = run(entry(&[("Plant", "Plant")]), options, None).await;

        assert_eq!(results.len(), 2);
        let first = results[0].result.as_ref().unwrap();
        assert!(results.iter().all(ServiceResponse::is_good));
        assert_eq!(first.data_set_writer_id.as_deref(), Some("Plant/P1"));
        assert_eq!(first.data_set_name.as_deref(), Some(&*format!("{}#s=P1", NS)));
        assert_eq!(field_ids(&results[0]), vec!["Plant/Speed", "Plant/Temperature"]);
    }

    #[tokio::test]
    async fn test_object_single_writer_uses_long_ids() {
        let options = PublishedNodeExpansion {
            exclude_root_if_instance_node: true,
            create_single_writer: true,
            ..Default::default()
        };
        let results = run(entry(&[("Plant", "Plant")]), options, None).await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            field_ids(&results[0]),
            vec![
                "Plant/P1/Speed",
                "Plant/P1/Temperature",
                "Plant/P2/Speed",
                "Plant/P2/Temperature"
            ]
        );
    }

    #[tokio::test]
    async fn test_root_object_without_walk() {
        let results = run(entry(&[("P1", "P1")]), PublishedNodeExpansion::default(), None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result.as_ref().unwrap().data_set_writer_id.as_deref(), Some("P1"));
        assert_eq!(field_ids(&results[0]), vec!["P1/Speed", "P1/Temperature"]);
    }

    #[tokio::test]
    async fn test_object_type_instances() {
        let options = PublishedNodeExpansion {
            create_single_writer: true,
            ..Default::default()
        };
        let results = run(entry(&[("PumpType", "Pump")]), options.clone(), None).await;
        assert_eq!(results.len(), 1);
        let ids = field_ids(&results[0]);
        assert_eq!(ids.len(), 5);
        assert!(ids.contains(&"Pump/Plant/P1/Motor/Current".to_string()));

        let split = PublishedNodeExpansion {
            create_single_writer: false,
            ..options.clone()
        };
        let results = run(entry(&[("PumpType", "Pump")]), split, None).await;
        let writers: Vec<_> = results
            .iter()
            .filter_map(|r| r.result.as_ref()?.data_set_writer_id.clone())
            .collect();
        assert_eq!(writers, vec!["Pump/Plant/P1", "Pump/Plant/P2", "Pump/Plant/P1/Motor"]);

        let flatten = PublishedNodeExpansion {
            flatten_type_instance: true,
            create_single_writer: false,
            ..options
        };
        let results = run(entry(&[("PumpType", "Pump")]), flatten, None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(
            field_ids(&results[0]),
            vec!["Pump/Speed", "Pump/Temperature", "Pump/Motor/Current"]
        );
    }

    #[tokio::test]
    async fn test_type_without_instances() {
        let results = run(
            entry(&[("ValveType", "Valve")]),
            PublishedNodeExpansion::default(),
            None,
        )
        .await;
        assert_eq!(results.len(), 1);
        let error = results[0].error_info.as_ref().unwrap();
        assert_eq!(error.status_code, StatusCode::BAD_NOT_FOUND);
        assert_eq!(error.error_message.as_deref(), Some("No objects resolved."));
        assert_eq!(field_ids(&results[0]), vec!["Valve"]);
    }

    #[tokio::test]
    async fn test_variable_root_keeps_field_id() {
        let results = run(
            entry(&[("P1.Speed", "Speed")]),
            PublishedNodeExpansion::default(),
            None,
        )
        .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_good());
        assert_eq!(field_ids(&results[0]), vec!["Speed"]);
    }

    #[tokio::test]
    async fn test_errors_are_isolated() {
        let nodes = &[("Missing", "Missing"), ("P2", "P2")];
        let options = PublishedNodeExpansion {
            create_single_writer: true,
            ..Default::default()
        };
        let results = run(entry(nodes), options.clone(), None).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_good());
        assert_eq!(field_ids(&results[0]), vec!["P2/Speed", "P2/Temperature"]);
        let error = results[1].error_info.as_ref().unwrap();
        assert_eq!(error.status_code, StatusCode::BAD_NODE_ID_UNKNOWN);

        let discard = PublishedNodeExpansion {
            discard_errors: true,
            ..options
        };
        let results = run(entry(nodes), discard, None).await;
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(ServiceResponse::is_good));
    }

    #[tokio::test]
    async fn test_method_not_supported() {
        let results = run(
            entry(&[("P1.Start", "Start")]),
            PublishedNodeExpansion::default(),
            None,
        )
        .await;
        assert_eq!(results.len(), 1);
        let error = results[0].error_info.as_ref().unwrap();
        assert_eq!(error.status_code, StatusCode::BAD_NOT_SUPPORTED);
        assert_eq!(error.error_message.as_deref(), Some("Node class Method not supported."));
        let nodes = results[0].result.as_ref().unwrap().opc_nodes.as_ref().unwrap();
        assert_eq!(nodes[0].id.as_deref(), Some(&*format!("{}#s=P1.Start", NS)));
    }

    #[tokio::test]
    async fn test_entries_are_persisted() {
        let store = Arc::new(InMemoryPublishedNodes::new());
        let options = PublishedNodeExpansion {
            exclude_root_if_instance_node: true,
            ..Default::default()
        };
        let sink: Arc<dyn PublishedNodesServices> = store.clone();
        let results = run(entry(&[("Plant", "Plant")]), options, Some(sink)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.get("", "Plant/P2").is_some());
    }

    struct RejectingSink;

    #[async_trait]
    impl PublishedNodesServices for RejectingSink {
        async fn create_or_update_data_set_writer_entry(
            &self,
            _entry: &PublishedNodesEntry,
        ) -> OpcUaResult<()> {
            Err(PersistenceError::rejected("read only").into())
        }

        async fn remove_data_set_writer_entry(&self, group: &str, writer_id: &str) -> OpcUaResult<()> {
            Err(PersistenceError::entry_not_found(group, writer_id).into())
        }

        async fn get_configured_endpoints(&self) -> OpcUaResult<Vec<PublishedNodesEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_sink_failure_becomes_error_info() {
        let options = PublishedNodeExpansion {
            exclude_root_if_instance_node: true,
            ..Default::default()
        };
        let results = run(entry(&[("Plant", "Plant")]), options.clone(), Some(Arc::new(RejectingSink))).await;
        assert_eq!(results.len(), 2);
        for result in &results {
            let error = result.error_info.as_ref().unwrap();
            assert_eq!(error.status_code, StatusCode::BAD_INVALID_ARGUMENT);
        }

        let discard = PublishedNodeExpansion {
            discard_errors: true,
            ..options
        };
        let results = run(entry(&[("Plant", "Plant")]), discard, Some(Arc::new(RejectingSink))).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_expansion_stops() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results: Vec<_> = expand(
            reader(&cancel),
            entry(&[("Plant", "Plant")]),
            PublishedNodeExpansion::default(),
            None,
        )
        .collect()
        .await;
        assert!(results.is_empty());
    }
}
