//! Display projection over an [`AssetTree`].
//!
//! Views read the tree; they never own build state.

use joybuild_shared::AssetKind;

use crate::tree::{AssetTree, NodeId};

/// One visible row of a tree outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    pub id: NodeId,
    pub depth: usize,
    pub name: String,
    pub kind: AssetKind,
    /// `None` for folders.
    pub built: Option<bool>,
}

/// Flatten the tree into pre-order rows.
pub fn outline(tree: &AssetTree) -> Vec<OutlineRow> {
    tree.walk()
        .into_iter()
        .map(|(depth, id)| {
            let node = tree.node(id);
            OutlineRow {
                id,
                depth,
                name: node.name(),
                kind: node.kind(),
                built: node.built(),
            }
        })
        .collect()
}

/// Render rows as an indented text tree with `[x]`/`[ ]` built markers.
pub fn render_outline(rows: &[OutlineRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match row.built {
            Some(true) => "[x] ",
            Some(false) => "[ ] ",
            None => "",
        };
        let suffix = if row.kind.is_folder() { "/" } else { "" };
        out.push_str(&"  ".repeat(row.depth));
        out.push_str(marker);
        out.push_str(&row.name);
        out.push_str(suffix);
        out.push('\n');
    }
    out
}
