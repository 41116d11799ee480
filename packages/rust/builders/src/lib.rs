//! Builder collaborators: the per-kind contract and the native builders.
//!
//! A collaborator turns one source file into its `<source>.data` sidecar.
//! Collaborators are not reentrant; a [`BuilderRegistry`] brackets a whole
//! batch with one `initialize_all` and one `terminate_all`.

mod model;
mod registry;
mod shader;
mod texture;

pub use model::{ModelBuilder, Vertex};
pub use registry::{AssetBuilder, BuildFailure, BuildOutcome, BuilderRegistry};
pub use shader::{ShaderBuilder, ShaderDefine};
pub use texture::{TextureBuilder, TextureFormat};

/// Little-endian `u32` helpers shared by the binary artifact writers.
pub(crate) fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Length of a byte section as the `u32` stored in artifact headers.
pub(crate) fn section_len(len: usize, what: &str) -> Result<u32, BuildFailure> {
    u32::try_from(len).map_err(|_| BuildFailure::Unsupported(format!("{what} exceeds 4 GiB")))
}
