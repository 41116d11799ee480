//! Artifact status probe: does a leaf asset already have its sidecar?
//!
//! This is a presence check only. A source edited after its artifact was
//! written still reads as built.

use std::path::Path;

use joybuild_shared::{AssetKind, JoyBuildError, Result};

/// Report whether the sidecar artifact for `source` exists.
///
/// Materials are checked for `<source>.json`, every other leaf kind for
/// `<source>.data`. Filesystem errors other than "not found" propagate
/// instead of reading as "not built". Folders have no artifact and are
/// rejected as an internal fault.
pub fn is_built(kind: AssetKind, source: &Path) -> Result<bool> {
    let artifact = kind
        .artifact_path(source)
        .ok_or_else(|| JoyBuildError::UnknownAssetKind {
            kind,
            path: source.to_path_buf(),
        })?;

    artifact
        .try_exists()
        .map_err(|e| JoyBuildError::io(&artifact, e))
}
