//! Application configuration for JoyBuild.
//!
//! User config lives at `~/.joybuild/joybuild.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JoyBuildError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "joybuild.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".joybuild";

// ---------------------------------------------------------------------------
// Config structs (matching joybuild.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data root and derived locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build dispatch settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Content database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Data root directory holding every source asset.
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Materials directory, relative to the data root.
    #[serde(default = "default_materials_dir")]
    pub materials_dir: String,

    /// Content database file name, relative to the data root.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            materials_dir: default_materials_dir(),
            database_file: default_database_file(),
        }
    }
}

fn default_data_root() -> String {
    "JoyData".into()
}
fn default_materials_dir() -> String {
    "materials".into()
}
fn default_database_file() -> String {
    "data.db".into()
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Whether `.shader` sources are scanned and dispatched. Off by default:
    /// shaders are usually compiled by the runtime instead.
    #[serde(default)]
    pub shaders_enabled: bool,

    /// Named snippets a shader may pull in through its `[defines]` block.
    #[serde(default)]
    pub shader_defines: BTreeMap<String, ShaderDefineConfig>,
}

/// `[build.shader_defines.<NAME>]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderDefineConfig {
    /// Stages the snippet is injected into: "vertex" and/or "fragment".
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,
    /// Source text injected verbatim.
    pub source: String,
}

fn default_stages() -> Vec<String> {
    vec!["vertex".into(), "fragment".into()]
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Extensions (without dot) of files that receive a stable identifier.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Model sources, texture sources (including compressed forms) and derived
/// material/shader text formats.
fn default_allowed_extensions() -> Vec<String> {
    [
        "obj", "fbx", "png", "jpg", "jpeg", "hdr", "tga", "dds", "mtl", "json", "shader", "hlsl",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Resolved filesystem locations for one session.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Data root directory.
    pub data_root: PathBuf,
    /// Materials root used by model cross-references.
    pub materials_root: PathBuf,
    /// Content database file.
    pub database: PathBuf,
}

impl DataPaths {
    /// Resolve paths from config, with an optional data root override.
    pub fn resolve(config: &AppConfig, data_root: Option<&Path>) -> Self {
        let data_root = data_root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&config.paths.data_root));
        Self {
            materials_root: data_root.join(&config.paths.materials_dir),
            database: data_root.join(&config.paths.database_file),
            data_root,
        }
    }
}

/// Options controlling how the asset tree is scanned.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Classify `.shader` files as Shader nodes.
    pub shaders_enabled: bool,
    /// Materials root handed to every Model node.
    pub materials_root: Option<PathBuf>,
}

impl ScanOptions {
    /// Hand `materials_root` to every Model node discovered by the scan.
    pub fn with_materials_root(mut self, materials_root: impl Into<PathBuf>) -> Self {
        self.materials_root = Some(materials_root.into());
        self
    }
}

impl From<&AppConfig> for ScanOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            shaders_enabled: config.build.shaders_enabled,
            materials_root: None,
        }
    }
}

/// Options for content database reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Extensions (without dot, lowercase) that receive identifiers.
    pub allowed_extensions: BTreeSet<String>,
}

impl ReconcileOptions {
    /// Whether a file with extension `ext` belongs in the database.
    pub fn allows(&self, ext: &str) -> bool {
        self.allowed_extensions.contains(&ext.to_ascii_lowercase())
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ReconcileOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            allowed_extensions: config
                .database
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.joybuild/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| JoyBuildError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.joybuild/joybuild.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| JoyBuildError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        JoyBuildError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would only fail later, mid-batch.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for (name, define) in &config.build.shader_defines {
        if let Some(stage) = define
            .stages
            .iter()
            .find(|s| s.as_str() != "vertex" && s.as_str() != "fragment")
        {
            return Err(JoyBuildError::config(format!(
                "shader define {name}: unknown stage '{stage}' (expected 'vertex' or 'fragment')"
            )));
        }
    }
    if config.database.allowed_extensions.is_empty() {
        return Err(JoyBuildError::config(
            "database.allowed_extensions must list at least one extension",
        ));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| JoyBuildError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| JoyBuildError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| JoyBuildError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
