//! Core domain types for JoyBuild asset trees and the content database.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suffix of the sidecar artifact written for materials.
pub const MATERIAL_ARTIFACT_SUFFIX: &str = ".json";

/// Suffix of the sidecar artifact written for models, textures and shaders.
pub const BINARY_ARTIFACT_SUFFIX: &str = ".data";

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// The closed set of node kinds in an asset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Folder,
    Model,
    Texture,
    Material,
    Shader,
}

impl AssetKind {
    /// Classify a file by its extension (without the dot, case-sensitive).
    ///
    /// Returns `None` for extensions the builder does not track. Shader
    /// sources are only recognised when `shaders_enabled` is set.
    pub fn from_extension(ext: &str, shaders_enabled: bool) -> Option<Self> {
        match ext {
            "obj" => Some(Self::Model),
            "png" | "jpg" | "jpeg" | "hdr" | "tga" => Some(Self::Texture),
            "mtl" => Some(Self::Material),
            "shader" if shaders_enabled => Some(Self::Shader),
            _ => None,
        }
    }

    /// Sidecar suffix for this kind, or `None` for folders.
    pub fn artifact_suffix(self) -> Option<&'static str> {
        match self {
            Self::Folder => None,
            Self::Material => Some(MATERIAL_ARTIFACT_SUFFIX),
            Self::Model | Self::Texture | Self::Shader => Some(BINARY_ARTIFACT_SUFFIX),
        }
    }

    /// Path of the sidecar artifact for `source`, or `None` for folders.
    pub fn artifact_path(self, source: &Path) -> Option<PathBuf> {
        let suffix = self.artifact_suffix()?;
        let mut raw = source.as_os_str().to_owned();
        raw.push(suffix);
        Some(PathBuf::from(raw))
    }

    /// Lowercase label used in build messages ("model", "texture", ...).
    pub fn label(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Model => "model",
            Self::Texture => "texture",
            Self::Material => "material",
            Self::Shader => "shader",
        }
    }

    pub fn is_folder(self) -> bool {
        self == Self::Folder
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Folder => "Folder",
            Self::Model => "Model",
            Self::Texture => "Texture",
            Self::Material => "Material",
            Self::Shader => "Shader",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Build requests and results
// ---------------------------------------------------------------------------

/// Everything a builder collaborator receives for one leaf asset.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Kind of the asset being built.
    pub kind: AssetKind,
    /// Absolute path of the source file.
    pub source: &'a Path,
    /// Materials root for resolving cross-references (models only).
    pub materials_root: Option<&'a Path>,
}

impl BuildRequest<'_> {
    /// Where the collaborator must write its output.
    pub fn artifact_path(&self) -> PathBuf {
        let suffix = self.kind.artifact_suffix().unwrap_or(BINARY_ARTIFACT_SUFFIX);
        let mut raw = self.source.as_os_str().to_owned();
        raw.push(suffix);
        PathBuf::from(raw)
    }

    /// File name of the source, used to prefix build messages.
    pub fn file_name(&self) -> String {
        file_name_of(self.source)
    }
}

/// Outcome of one build attempt on a leaf asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Source file the attempt was made on.
    pub path: PathBuf,
    /// Whether the sidecar artifact was produced.
    pub success: bool,
    /// Human-readable outcome, prefixed with the source file name.
    pub message: String,
}

impl BuildResult {
    /// A successful build of `path`.
    pub fn ok(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: true,
            message: format!("{}: OK", file_name_of(path)),
        }
    }

    /// A failed build of a `kind` asset at `path`.
    pub fn failed(path: &Path, kind: AssetKind, reason: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            message: format!(
                "{}: Error building {}\n{reason}",
                file_name_of(path),
                kind.label()
            ),
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Final path component as a displayable string.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// AssetGuid
// ---------------------------------------------------------------------------

/// Stable identifier assigned to an asset path in the content database.
///
/// Random (v4); never derived from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetGuid(pub Uuid);

impl AssetGuid {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetGuid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AssetGuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DatabaseEntry
// ---------------------------------------------------------------------------

/// One `{ "guid", "path" }` record of the content database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    /// Stable identifier.
    pub guid: AssetGuid,
    /// Path relative to the data root, forward-slash separated.
    pub path: String,
}

/// Normalise a relative path to the database key form (`a/b/c.ext`).
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
