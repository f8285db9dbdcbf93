// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration services facade.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::Connection;
use crate::configuration::expander;
use crate::configuration::models::{
    validate_nodes, PublishedNodeExpansion, PublishedNodesEntry, ServiceResponse,
};
use crate::configuration::published_nodes::PublishedNodesServices;
use crate::error::{OpcUaResult, RequestError};
use crate::services::NodeServices;

/// Stream of expansion results.
pub type ExpansionStream = BoxStream<'static, ServiceResponse<PublishedNodesEntry>>;

// =============================================================================
// ConfigurationServicesApi
// =============================================================================

/// Turns configured nodes into data set writer entries.
///
/// Both operations validate the entry before anything is browsed; an
/// invalid entry is returned as an error instead of a stream.
pub trait ConfigurationServicesApi: Send + Sync {
    /// Expands the nodes of `entry` without storing the result.
    fn expand(
        &self,
        connection: &Connection,
        entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ExpansionStream>;

    /// Expands the nodes of `entry` and stores every produced entry.
    fn create_or_update(
        &self,
        connection: &Connection,
        entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ExpansionStream>;
}

// =============================================================================
// ConfigurationServices
// =============================================================================

/// Default [`ConfigurationServicesApi`] implementation.
pub struct ConfigurationServices<P> {
    nodes: NodeServices,
    published: Arc<P>,
}

impl<P: PublishedNodesServices + 'static> ConfigurationServices<P> {
    /// Creates services storing into `published`.
    pub fn new(nodes: NodeServices, published: Arc<P>) -> Self {
        Self { nodes, published }
    }

    /// The store entries are written to.
    pub fn published_nodes(&self) -> &Arc<P> {
        &self.published
    }

    fn start(
        &self,
        connection: &Connection,
        mut entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        cancel: &CancellationToken,
        persist: bool,
    ) -> OpcUaResult<ExpansionStream> {
        let nodes = entry
            .opc_nodes
            .as_mut()
            .ok_or_else(|| RequestError::bad_request("Entry must contain opc nodes"))?;
        if nodes.is_empty() {
            return Ok(stream::empty().boxed());
        }
        validate_nodes(nodes)?;

        info!(
            endpoint = %entry.endpoint_url,
            nodes = entry.node_count(),
            persist,
            "Expanding published nodes"
        );
        let reader = self.nodes.reader(connection, options.header.as_ref(), cancel);
        let sink = persist.then(|| Arc::clone(&self.published) as Arc<dyn PublishedNodesServices>);
        Ok(expander::expand(reader, entry, options, sink))
    }
}

impl<P: PublishedNodesServices + 'static> ConfigurationServicesApi for ConfigurationServices<P> {
    fn expand(
        &self,
        connection: &Connection,
        entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ExpansionStream> {
        self.start(connection, entry, options, cancel, false)
    }

    fn create_or_update(
        &self,
        connection: &Connection,
        entry: PublishedNodesEntry,
        options: PublishedNodeExpansion,
        cancel: &CancellationToken,
    ) -> OpcUaResult<ExpansionStream> {
        self.start(connection, entry, options, cancel, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::{AddressSpace, MemorySession};
    use crate::configuration::models::OpcNode;
    use crate::configuration::published_nodes::InMemoryPublishedNodes;
    use crate::error::OpcUaError;
    use crate::types::{reference_types, NodeId, OpcUaDataType, QualifiedName};
    use crate::variant::Variant;

    const NS: &str = "http://test.org/Boiler/";

    fn connection() -> Connection {
        let mut space = AddressSpace::with_standard_nodes();
        let ns = space.register_namespace(NS);
        let boiler = NodeId::string(ns, "Boiler");
        space.add_object(
            boiler.clone(),
            QualifiedName::new(ns, "Boiler"),
            &NodeId::OBJECTS_FOLDER,
            &reference_types::ORGANIZES,
            &NodeId::BASE_OBJECT_TYPE,
        );
        space.add_variable(
            NodeId::string(ns, "Boiler.Level"),
            QualifiedName::new(ns, "Level"),
            &boiler,
            OpcUaDataType::Double,
            Variant::Double(40.0),
        );
        Arc::new(MemorySession::new(space))
    }

    fn services() -> ConfigurationServices<InMemoryPublishedNodes> {
        ConfigurationServices::new(NodeServices::default(), Arc::new(InMemoryPublishedNodes::new()))
    }

    fn entry(nodes: Vec<OpcNode>) -> PublishedNodesEntry {
        let mut entry = PublishedNodesEntry::new("opc.tcp://boiler:4840").with_nodes(nodes);
        entry.data_set_writer_group = Some("Boilers".into());
        entry
    }

    #[tokio::test]
    async fn test_create_or_update_persists() {
        let services = services();
        let results: Vec<_> = services
            .create_or_update(
                &connection(),
                entry(vec![OpcNode::new(format!("{}#s=Boiler", NS)).with_field_id("Boiler")]),
                PublishedNodeExpansion::default(),
                &CancellationToken::new(),
            )
            .unwrap()
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_good());
        let stored = services.published_nodes().get("Boilers", "Boiler").unwrap();
        assert_eq!(stored.node_count(), 1);
        assert_eq!(
            stored.opc_nodes.unwrap()[0].data_set_field_id.as_deref(),
            Some("Boiler/Level")
        );
    }

    #[tokio::test]
    async fn test_expand_does_not_persist() {
        let services = services();
        let results: Vec<_> = services
            .expand(
                &connection(),
                entry(vec![OpcNode::new(format!("{}#s=Boiler", NS))]),
                PublishedNodeExpansion::default(),
                &CancellationToken::new(),
            )
            .unwrap()
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert!(services.published_nodes().is_empty());
    }

    #[tokio::test]
    async fn test_empty_entry_yields_nothing() {
        let services = services();
        let results: Vec<_> = services
            .create_or_update(
                &connection(),
                entry(Vec::new()),
                PublishedNodeExpansion::default(),
                &CancellationToken::new(),
            )
            .unwrap()
            .collect()
            .await;
        assert!(results.is_empty());
        assert_eq!(services.published_nodes().update_count(), 0);
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let services = services();
        let cancel = CancellationToken::new();
        let missing = PublishedNodesEntry::new("opc.tcp://boiler:4840");
        let result = services.expand(&connection(), missing, PublishedNodeExpansion::default(), &cancel);
        assert!(matches!(result, Err(OpcUaError::Request(_))));

        let duplicate = entry(vec![
            OpcNode::new("i=2258").with_field_id("Time"),
            OpcNode::new("i=2259").with_field_id("Time"),
        ]);
        let result = services.expand(&connection(), duplicate, PublishedNodeExpansion::default(), &cancel);
        match result {
            Err(error) => assert_eq!(error.to_string(), "Field ids must be present and unique."),
            Ok(_) => panic!("duplicate field ids accepted"),
        }
    }
}
