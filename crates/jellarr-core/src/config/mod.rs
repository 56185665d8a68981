//! Desired-state configuration
//!
//! Loading, schema and validation of the YAML document that describes how
//! the server should be configured.

pub mod parser;
pub mod schema;
pub mod validate;

pub use parser::{load_config, parse_config_str, to_yaml};
pub use schema::{
    BrandingOptionsConfig, CollectionType, DecodingCodec, EncodingOptionsConfig,
    HardwareAccelerationType, LibraryConfig, LibraryOptionsConfig, PathInfoConfig, PluginConfig,
    PluginRepositoryConfig, RootConfig, StartupConfig, SystemConfig, TrickplayOptionsConfig,
    UserConfig, UserPolicyConfig, VirtualFolderConfig,
};
pub use validate::{ValidationError, ValidationIssue, validate_config};

/// Default location of the desired-state document
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";

/// Environment variable holding the server API key
pub const API_KEY_ENV: &str = "JELLARR_API_KEY";
