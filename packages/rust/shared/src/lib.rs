//! Shared types, error model, and configuration for JoyBuild.
//!
//! This crate is the foundation depended on by all other JoyBuild crates.
//! It provides:
//! - [`JoyBuildError`], the unified error type
//! - Domain types ([`AssetKind`], [`BuildRequest`], [`BuildResult`], [`AssetGuid`], [`DatabaseEntry`])
//! - Configuration ([`AppConfig`], [`ScanOptions`], [`ReconcileOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, DataPaths, DatabaseConfig, PathsConfig, ReconcileOptions,
    ScanOptions, ShaderDefineConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_config,
};
pub use error::{JoyBuildError, Result};
pub use types::{
    AssetGuid, AssetKind, BINARY_ARTIFACT_SUFFIX, BuildRequest, BuildResult, DatabaseEntry,
    MATERIAL_ARTIFACT_SUFFIX, file_name_of, normalize_relative,
};
