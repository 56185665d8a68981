//! Jellarr Core Library
//!
//! Declarative configuration for a Jellyfin server: load a desired-state
//! document, diff it against the live server, and write only what changed.

pub mod api;
pub mod apply;
pub mod config;
pub mod diff;
pub mod dump;
pub mod orchestration;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{RootConfig, ValidationError, load_config, parse_config_str, to_yaml};

    // Server API
    pub use crate::api::{ApiError, JellyfinApi, JellyfinClient};

    // Diff engine
    pub use crate::diff::{Change, DiffOptions, JsonPath, Operation, Patch, apply_patch, diff};

    // Reconciliation
    pub use crate::dump::dump_config;
    pub use crate::orchestration::{Domain, DomainOutcome, Reconciler, RunReport};

    pub use crate::types::TriState;
}
