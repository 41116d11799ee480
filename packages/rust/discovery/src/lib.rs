//! Asset discovery: the artifact status probe and the asset tree scanner.
//!
//! A session scans the data root once into an [`AssetTree`]. Each leaf is a
//! [`Buildable`] whose built flag starts from [`is_built`]; folders only group
//! children. The [`view`] module projects the tree for display.

mod probe;
mod tree;
pub mod view;

pub use probe::is_built;
pub use tree::{AssetNode, AssetTree, Buildable, FolderNode, LeafAsset, ModelAsset, NodeId};
