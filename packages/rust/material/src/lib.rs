//! Material builder: `.mtl` text to a JSON material list.
//!
//! Only two directives matter. `newmtl <name>` opens a record and
//! `map_Kd <texture>` sets the diffuse texture of the open record. Every
//! other line is ignored, so the parser has no error path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use joybuild_shared::{JoyBuildError, MATERIAL_ARTIFACT_SUFFIX, Result};

/// Type discriminator written into every material list.
pub const MATERIAL_LIST_TYPE: &str = "standard_material_list";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One material definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    /// Diffuse texture reference; empty when the material has none.
    pub diffuse: String,
}

/// The serialized form of a `.mtl` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialList {
    #[serde(rename = "type")]
    pub kind: String,
    pub materials: Vec<MaterialRecord>,
}

impl Default for MaterialList {
    fn default() -> Self {
        Self {
            kind: MATERIAL_LIST_TYPE.to_string(),
            materials: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `.mtl` text into an ordered material list.
pub fn parse_mtl(text: &str) -> MaterialList {
    let mut list = MaterialList::default();

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(directive), Some(value)) = (tokens.next(), tokens.next()) else {
            continue;
        };

        match directive {
            "newmtl" => list.materials.push(MaterialRecord {
                name: value.to_string(),
                diffuse: String::new(),
            }),
            // Dropped when no material is open yet
            "map_Kd" => {
                if let Some(current) = list.materials.last_mut() {
                    current.diffuse = value.to_string();
                }
            }
            _ => {}
        }
    }

    list
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Where the material list for `source` is written (`<source>.json`).
pub fn output_path(source: &Path) -> PathBuf {
    let mut raw = source.as_os_str().to_owned();
    raw.push(MATERIAL_ARTIFACT_SUFFIX);
    PathBuf::from(raw)
}

/// Read `source`, parse it and write the pretty-printed list beside it.
#[instrument(skip_all, fields(path = %source.display()))]
pub fn build_material(source: &Path) -> Result<MaterialList> {
    let text = std::fs::read_to_string(source).map_err(|e| JoyBuildError::io(source, e))?;
    let list = parse_mtl(&text);

    let output = output_path(source);
    let json = serde_json::to_string_pretty(&list)
        .map_err(|e| JoyBuildError::validation(format!("cannot serialize material list: {e}")))?;
    std::fs::write(&output, json).map_err(|e| JoyBuildError::io(&output, e))?;

    debug!(materials = list.materials.len(), output = %output.display(), "material list written");
    Ok(list)
}
