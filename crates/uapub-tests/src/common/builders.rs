// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Fluent builders for requests and published nodes entries.
//!
//! ```rust,ignore
//! let request = BrowseRequestBuilder::new(plant_id("Plant"))
//!     .node_classes(&[NodeClass::Object])
//!     .diagnostics(DiagnosticsLevel::Verbose)
//!     .build();
//!
//! let entry = EntryBuilder::new()
//!     .group("Pumps")
//!     .node(plant_id("P1"), "P1")
//!     .build();
//! ```

use uapub_nodes::{
    BrowseDirection, BrowseFirstRequest, DiagnosticsLevel, NodeClass, OpcNode,
    PublishedNodeExpansion, PublishedNodesEntry, RequestHeader,
};

use super::fixtures::PLANT_ENDPOINT;

/// A request header asking for `level`.
pub fn header(level: DiagnosticsLevel) -> Option<RequestHeader> {
    Some(RequestHeader::with_level(level))
}

// =============================================================================
// BrowseRequestBuilder
// =============================================================================

/// Builder for [`BrowseFirstRequest`].
#[derive(Debug, Clone, Default)]
pub struct BrowseRequestBuilder {
    request: BrowseFirstRequest,
}

impl BrowseRequestBuilder {
    /// Browses `node_id`.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            request: BrowseFirstRequest {
                node_id: Some(node_id.into()),
                ..Default::default()
            },
        }
    }

    /// Browses the root folder.
    pub fn root() -> Self {
        Self::default()
    }

    /// Sets the direction.
    pub fn direction(mut self, direction: BrowseDirection) -> Self {
        self.request.direction = Some(direction);
        self
    }

    /// Follows only `reference_type_id` and, unless disabled, its subtypes.
    pub fn reference_type(mut self, reference_type_id: impl Into<String>, no_subtypes: bool) -> Self {
        self.request.reference_type_id = Some(reference_type_id.into());
        self.request.no_subtypes = Some(no_subtypes);
        self
    }

    /// Keeps only targets of these classes.
    pub fn node_classes(mut self, classes: &[NodeClass]) -> Self {
        self.request.node_class_filter = Some(classes.to_vec());
        self
    }

    /// Limits the references of the first page.
    pub fn max_references(mut self, max: u32) -> Self {
        self.request.max_references_to_return = Some(max);
        self
    }

    /// Returns ids and names only.
    pub fn node_ids_only(mut self) -> Self {
        self.request.node_ids_only = Some(true);
        self
    }

    /// Reads the values of variable targets.
    pub fn read_values(mut self) -> Self {
        self.request.read_variable_values = Some(true);
        self
    }

    /// Returns each target once without reference details.
    pub fn target_nodes_only(mut self) -> Self {
        self.request.target_nodes_only = Some(true);
        self
    }

    /// Requests a diagnostics level.
    pub fn diagnostics(mut self, level: DiagnosticsLevel) -> Self {
        self.request.header = header(level);
        self
    }

    /// Builds the request.
    pub fn build(self) -> BrowseFirstRequest {
        self.request
    }
}

// =============================================================================
// EntryBuilder
// =============================================================================

/// Builder for [`PublishedNodesEntry`].
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    entry: PublishedNodesEntry,
    nodes: Vec<OpcNode>,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryBuilder {
    /// An entry for the plant endpoint.
    pub fn new() -> Self {
        Self {
            entry: PublishedNodesEntry::new(PLANT_ENDPOINT),
            nodes: Vec::new(),
        }
    }

    /// Sets the writer group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.entry.data_set_writer_group = Some(group.into());
        self
    }

    /// Sets the writer id.
    pub fn writer_id(mut self, writer_id: impl Into<String>) -> Self {
        self.entry.data_set_writer_id = Some(writer_id.into());
        self
    }

    /// Adds a node with a field id.
    pub fn node(mut self, id: impl Into<String>, field_id: impl Into<String>) -> Self {
        self.nodes.push(OpcNode::new(id).with_field_id(field_id));
        self
    }

    /// Adds a node addressed by a browse path from `id`.
    pub fn node_at_path<I, S>(mut self, id: impl Into<String>, path: I, field_id: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.push(OpcNode::new(id).with_browse_path(path).with_field_id(field_id));
        self
    }

    /// Adds a raw node.
    pub fn opc_node(mut self, node: OpcNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Builds the entry.
    pub fn build(mut self) -> PublishedNodesEntry {
        self.entry.opc_nodes = Some(self.nodes);
        self.entry
    }
}

// =============================================================================
// ExpansionBuilder
// =============================================================================

/// Builder for [`PublishedNodeExpansion`].
#[derive(Debug, Clone, Default)]
pub struct ExpansionBuilder {
    options: PublishedNodeExpansion,
}

impl ExpansionBuilder {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one writer for all nodes of a config node.
    pub fn single_writer(mut self) -> Self {
        self.options.create_single_writer = true;
        self
    }

    /// Skips the root when it is an instance.
    pub fn exclude_root(mut self) -> Self {
        self.options.exclude_root_if_instance_node = true;
        self
    }

    /// Collapses the instance hierarchy of each type instance.
    pub fn flatten(mut self) -> Self {
        self.options.flatten_type_instance = true;
        self
    }

    /// Ignores subtypes of type nodes.
    pub fn no_subtypes(mut self) -> Self {
        self.options.no_sub_types_of_type_nodes = true;
        self
    }

    /// Stops descending once an instance was found.
    pub fn stop_at_first(mut self) -> Self {
        self.options.stop_at_first_found_instance = true;
        self
    }

    /// Drops failed results.
    pub fn discard_errors(mut self) -> Self {
        self.options.discard_errors = true;
        self
    }

    /// Limits object discovery.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.options.max_depth = depth;
        self
    }

    /// Limits variable expansion.
    pub fn max_levels(mut self, levels: u32) -> Self {
        self.options.max_levels_to_expand = levels;
        self
    }

    /// Requests a diagnostics level.
    pub fn diagnostics(mut self, level: DiagnosticsLevel) -> Self {
        self.options.header = header(level);
        self
    }

    /// Builds the options.
    pub fn build(self) -> PublishedNodeExpansion {
        self.options
    }
}
