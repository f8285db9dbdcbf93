// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Published nodes configuration.
//!
//! Turns configured nodes (objects, object types, variables, variable
//! types) into data set writer entries that contain only publishable
//! variables, and optionally stores them.
//!
//! # Features
//!
//! - **Expansion**: [`ConfigurationServicesApi::expand`] streams one entry
//!   per object, or one merged entry with [`PublishedNodeExpansion::create_single_writer`]
//! - **Persistence**: [`ConfigurationServicesApi::create_or_update`] hands
//!   every entry to a [`PublishedNodesServices`] store before emitting it
//! - **Error Isolation**: nodes that fail are reported as their own results
//!   and never stop the expansion of the others
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   ConfigurationServices<P>                    │
//! │         validate entry ─► expander ─► ServiceResponse         │
//! └───────────────────────────────────────────────────────────────┘
//!            │ NodeReader                       │ entries
//!            ▼                                  ▼
//! ┌──────────────────────────┐     ┌───────────────────────────────┐
//! │ walker (breadth-first    │     │ PublishedNodesServices (P)    │
//! │ browse of the session)   │     │ InMemoryPublishedNodes        │
//! └──────────────────────────┘     └───────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uapub_nodes::configuration::*;
//!
//! let services = ConfigurationServices::new(NodeServices::default(), Arc::new(InMemoryPublishedNodes::new()));
//! let mut results = services.create_or_update(&connection, entry, PublishedNodeExpansion::default(), &cancel)?;
//! while let Some(result) = results.next().await {
//!     println!("{:?}", result.error_info);
//! }
//! ```

mod expander;
mod models;
mod published_nodes;
mod services;
mod walker;

pub use models::{
    validate_nodes, OpcNode, PublishedNodeExpansion, PublishedNodesEntry, ServiceResponse,
};
pub use published_nodes::{validate_entry, InMemoryPublishedNodes, PublishedNodesServices};
pub use services::{ConfigurationServices, ConfigurationServicesApi, ExpansionStream};
