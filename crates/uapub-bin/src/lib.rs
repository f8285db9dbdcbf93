// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapub-bin
//!
//! Command line interface for the uapub node services.
//!
//! - CLI argument parsing with clap
//! - Session runtime built from settings and an address space snapshot
//! - Cancellation on OS signals
//! - Logging initialization
//! - Command implementations (validate, browse, expand, version)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                             │
//! │                      (Entry Point)                          │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   cli.rs    │
//!                    │ (Argument   │
//!                    │  Parsing)   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        └──────────┘ └────┬─────┘ └──────────┘
//!                          │
//!                   ┌──────▼──────┐
//!                   │  shutdown   │
//!                   │  (cancel)   │
//!                   └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Validate settings and a published nodes file
//! uapub -c uapub.yaml validate -p publishednodes.json
//!
//! # Browse the Objects folder of a snapshot
//! uapub browse -a plant.yaml
//!
//! # Walk everything below a node
//! uapub browse -a plant.yaml -n "nsu=http://test.org/Plant/;s=Plant" -r
//!
//! # Expand published nodes into per-object writers
//! uapub expand -a plant.yaml -p publishednodes.json -o expanded.json
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{report_error, BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, SessionRuntime};
pub use shutdown::{ShutdownCoordinator, ShutdownGuard};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
