// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Breadth-first address space walk used by the expansion.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::client::{BrowseDescription, ReferenceDescription};
use crate::error::{OpcUaError, OpcUaResult};
use crate::reader::NodeReader;
use crate::types::{NodeClass, NodeId};

/// Supertypes followed when matching a type definition.
const MAX_TYPE_DEPTH: usize = 32;

/// A node reached by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub node_id: NodeId,
    pub node_class: NodeClass,
    /// `/Name/Name` path relative to the walk start; empty for the start.
    pub browse_path: String,
    pub display_name: Option<String>,
}

impl Frame {
    /// A frame for a node the walk starts from.
    pub fn root(node_id: NodeId, node_class: NodeClass) -> Self {
        Self {
            node_id,
            node_class,
            browse_path: String::new(),
            display_name: None,
        }
    }

    /// Same node, path prefixed with `prefix`.
    pub fn below(mut self, prefix: &str) -> Self {
        self.browse_path = format!("{}{}", prefix, self.browse_path);
        self
    }

    fn child(&self, reference: &ReferenceDescription, node_id: NodeId) -> Self {
        Self {
            node_id,
            node_class: reference.node_class,
            browse_path: format!("{}/{}", self.browse_path, reference.browse_name.name),
            display_name: Some(reference.display_name.text.clone()),
        }
    }
}

/// What a walk follows and what it collects.
#[derive(Debug, Clone)]
pub(crate) struct Walk {
    pub reference_type: NodeId,
    /// Levels below the start; `None` is unlimited.
    pub max_depth: Option<u32>,
    /// Node classes the walk enters (0 = all).
    pub traverse: u32,
    /// Node classes collected (0 = all).
    pub collect: u32,
    /// Collect only instances of this type.
    pub type_definition: Option<NodeId>,
    pub include_subtypes: bool,
    /// Do not continue below collected nodes.
    pub stop_at_matches: bool,
    /// Do not continue below objects.
    pub stop_at_objects: bool,
}

impl Walk {
    pub fn new(reference_type: NodeId, max_depth: Option<u32>) -> Self {
        Self {
            reference_type,
            max_depth,
            traverse: 0,
            collect: 0,
            type_definition: None,
            include_subtypes: true,
            stop_at_matches: false,
            stop_at_objects: false,
        }
    }

    pub fn traverse(mut self, classes: &[NodeClass]) -> Self {
        self.traverse = NodeClass::mask(classes);
        self
    }

    pub fn collect(mut self, classes: &[NodeClass]) -> Self {
        self.collect = NodeClass::mask(classes);
        self
    }

    pub fn of_type(mut self, type_definition: NodeId, include_subtypes: bool) -> Self {
        self.type_definition = Some(type_definition);
        self.include_subtypes = include_subtypes;
        self
    }

    pub fn stop_at_matches(mut self, stop: bool) -> Self {
        self.stop_at_matches = stop;
        self
    }

    pub fn stop_at_objects(mut self, stop: bool) -> Self {
        self.stop_at_objects = stop;
        self
    }

    /// Runs the walk and returns the collected frames in discovery order.
    pub async fn run(&self, reader: &NodeReader, start: &Frame) -> OpcUaResult<Vec<Frame>> {
        let mut matches = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::from([start.node_id.clone()]);
        let mut is_instance: HashMap<NodeId, bool> = HashMap::new();
        let mut queue = VecDeque::from([(start.clone(), 0u32)]);

        while let Some((frame, depth)) = queue.pop_front() {
            if reader.is_cancelled() {
                return Err(OpcUaError::Cancelled);
            }
            if self.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let description = BrowseDescription::hierarchical(frame.node_id.clone())
                .reference_type(self.reference_type.clone(), true)
                .node_classes(self.traverse);
            for reference in reader.browse_all(description).await? {
                let Some(node_id) = reader.local_id(&reference.node_id) else {
                    continue;
                };
                if !visited.insert(node_id.clone()) {
                    continue;
                }
                let child = frame.child(&reference, node_id);
                let matched = reference.node_class.matches_mask(self.collect)
                    && self.type_matches(reader, &reference, &mut is_instance).await?;
                let descend = !(matched && self.stop_at_matches)
                    && !(self.stop_at_objects && child.node_class == NodeClass::Object);
                if matched {
                    matches.push(child.clone());
                }
                if descend {
                    queue.push_back((child, depth + 1));
                }
            }
        }
        trace!(
            start = %reader.format_node_id(&start.node_id),
            matches = matches.len(),
            "Walk completed"
        );
        Ok(matches)
    }

    async fn type_matches(
        &self,
        reader: &NodeReader,
        reference: &ReferenceDescription,
        cache: &mut HashMap<NodeId, bool>,
    ) -> OpcUaResult<bool> {
        let Some(wanted) = &self.type_definition else {
            return Ok(true);
        };
        let Some(type_id) = reference
            .type_definition
            .as_ref()
            .and_then(|t| reader.local_id(t))
        else {
            return Ok(false);
        };
        if &type_id == wanted {
            return Ok(true);
        }
        if !self.include_subtypes {
            return Ok(false);
        }
        if let Some(known) = cache.get(&type_id) {
            return Ok(*known);
        }
        let mut current = type_id.clone();
        let mut found = false;
        for _ in 0..MAX_TYPE_DEPTH {
            match reader.supertype(&current).await? {
                Some(parent) if &parent == wanted => {
                    found = true;
                    break;
                }
                Some(parent) => current = parent,
                None => break,
            }
        }
        cache.insert(type_id, found);
        Ok(found)
    }
}
