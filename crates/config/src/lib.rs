//! Configuration loading, validation, env substitution, and env overrides.
//!
//! Config files: `sharebridge.toml`, `sharebridge.yaml`, or `sharebridge.json`
//! Searched in `./` then `~/.config/sharebridge/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, data_dir, discover_and_load,
        find_config_file, find_or_default_config_path, load_config,
    },
    schema::{HandoffConfig, HostConfig, ShareConfig, StorageConfig, wake_uri},
    validate::{Diagnostic, Severity, ValidationResult},
};
