// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server access for the node services.
//!
//! - **Session Capability**: [`OpcUaSession`], the attribute, view and method
//!   service sets a connection must offer
//! - **Address Space**: [`AddressSpace`] and its declarative
//!   [`AddressSpaceModel`] snapshot form
//! - **In-Memory Session**: [`MemorySession`], an [`OpcUaSession`] served
//!   from an address space
//! - **Value Codec**: [`VariantCodec`], JSON conversion of typed values
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              NodeServices / ConfigurationServices               │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ Connection = Arc<dyn OpcUaSession>
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OpcUaSession                             │
//! │        (browse / browse_next / translate / read / write / call) │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │             MemorySession (AddressSpace) or transport           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod address_space;
mod conversion;
mod memory;
mod session;

pub use address_space::{
    AddressSpace, AddressSpaceModel, Node, NodeDefinition, Reference, ReferenceDefinition,
    ACCESS_LEVEL_CURRENT_READ, ACCESS_LEVEL_CURRENT_WRITE, INPUT_ARGUMENTS, OUTPUT_ARGUMENTS,
};
pub use conversion::{VariantCodec, VariantConverter, VariantConverterRegistry, BODY_KEY, TYPE_KEY};
pub use memory::{
    MemorySession, MethodHandler, DEFAULT_MAX_CONTINUATION_POINTS, DEFAULT_MAX_REFERENCES_PER_NODE,
};
pub use session::{
    Argument, BrowseDescription, BrowsePath, BrowsePathResult, BrowsePathTarget, BrowseResult,
    CallMethodRequest, CallMethodResult, Connection, OpcUaSession, ReadValueId,
    ReferenceDescription, RelativePathElement, WriteValue,
};
