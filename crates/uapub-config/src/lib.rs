// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uapub-config
//!
//! Settings and data file loading for the uapub node services.
//!
//! ## Features
//!
//! - **Settings Schema**: [`NodeServicesSettings`] with validation and
//!   conversion into [`uapub_nodes::NodeServicesOptions`]
//! - **Multi-Format Support**: YAML, TOML, and JSON settings files
//! - **Environment Overrides**: `UAPUB_*` variables override file values
//! - **Published Nodes Files**: JSON arrays of data set writer entries
//! - **Address Space Snapshots**: declarative node models loaded into an
//!   in-memory session
//!
//! ## Quick Start
//!
//! ```no_run
//! use uapub_config::loader::load_settings;
//!
//! let settings = load_settings("uapub.yaml").unwrap();
//! println!("Diagnostics: {}", settings.diagnostics_level);
//! println!("Timeout: {:?}", settings.operation_timeout);
//! ```
//!
//! ## Environment Variables
//!
//! ```text
//! UAPUB_DIAGNOSTICS_LEVEL=verbose
//! UAPUB_LOG_LEVEL=debug
//! UAPUB_BROWSE_MAX_REFERENCES=100
//! UAPUB_OPERATION_TIMEOUT=5s
//! ```
//!
//! Values in settings files can reference environment variables:
//!
//! ```yaml
//! operation_timeout: "${OPERATION_TIMEOUT:30s}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    BrowseSettings, ExpansionSettings, LogFormat, LogLevel, LoggingSettings,
    NodeServicesSettings,
};

pub use loader::{
    load_address_space, load_published_nodes, load_settings, load_settings_str,
    open_memory_session, save_published_nodes, ConfigFormat, ConfigLoader, ConfigLoaderBuilder,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Prelude
// =============================================================================

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{load_published_nodes, load_settings, ConfigLoader};
    pub use crate::schema::NodeServicesSettings;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "uapub-config");
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_prelude_imports() {
        use prelude::*;
        let settings = NodeServicesSettings::default();
        assert!(settings.validate().is_ok());
    }
}
