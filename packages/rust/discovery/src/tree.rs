//! Asset tree scanner.
//!
//! Walks the data root once per session and builds an arena-backed tree of
//! [`AssetNode`]s plus a flat, discovery-ordered list of buildable leaves.

use std::path::{Path, PathBuf};

use joybuild_shared::{AssetKind, BuildRequest, JoyBuildError, Result, ScanOptions};
use tracing::{debug, info, instrument};

use crate::probe;

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Index of a node inside its [`AssetTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A directory in the data root.
#[derive(Debug, Clone)]
pub struct FolderNode {
    path: PathBuf,
    children: Vec<NodeId>,
}

impl FolderNode {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Children in tree order: subdirectories first, then files.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A buildable source file and its current built flag.
#[derive(Debug, Clone)]
pub struct LeafAsset {
    kind: AssetKind,
    path: PathBuf,
    built: bool,
}

impl LeafAsset {
    /// Create a leaf, initialising its built flag from the status probe.
    pub fn probe(kind: AssetKind, path: PathBuf) -> Result<Self> {
        let built = probe::is_built(kind, &path)?;
        Ok(Self { kind, path, built })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A model source. Models resolve material references against a shared
/// materials root while building.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    asset: LeafAsset,
    materials_root: Option<PathBuf>,
}

impl ModelAsset {
    pub fn materials_root(&self) -> Option<&Path> {
        self.materials_root.as_deref()
    }
}

/// One node of the asset tree, tagged by kind.
#[derive(Debug, Clone)]
pub enum AssetNode {
    Folder(FolderNode),
    Model(ModelAsset),
    Texture(LeafAsset),
    Material(LeafAsset),
    Shader(LeafAsset),
}

impl AssetNode {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Folder(_) => AssetKind::Folder,
            Self::Model(_) => AssetKind::Model,
            Self::Texture(_) => AssetKind::Texture,
            Self::Material(_) => AssetKind::Material,
            Self::Shader(_) => AssetKind::Shader,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Folder(folder) => &folder.path,
            Self::Model(model) => &model.asset.path,
            Self::Texture(leaf) | Self::Material(leaf) | Self::Shader(leaf) => &leaf.path,
        }
    }

    /// Display name (final path component).
    pub fn name(&self) -> String {
        joybuild_shared::file_name_of(self.path())
    }

    /// Built flag, or `None` for folders.
    pub fn built(&self) -> Option<bool> {
        self.as_buildable().map(|b| b.is_built())
    }

    /// Children of a folder; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Folder(folder) => &folder.children,
            _ => &[],
        }
    }

    /// The build capability of this node, if it has one.
    pub fn as_buildable(&self) -> Option<&dyn Buildable> {
        match self {
            Self::Folder(_) => None,
            Self::Model(model) => Some(model),
            Self::Texture(leaf) | Self::Material(leaf) | Self::Shader(leaf) => Some(leaf),
        }
    }

    pub fn as_buildable_mut(&mut self) -> Option<&mut dyn Buildable> {
        match self {
            Self::Folder(_) => None,
            Self::Model(model) => Some(model),
            Self::Texture(leaf) | Self::Material(leaf) | Self::Shader(leaf) => Some(leaf),
        }
    }

    /// Wrap a leaf in the node variant for its kind. A folder-kind leaf is
    /// an internal fault.
    fn leaf(asset: LeafAsset, materials_root: Option<&Path>) -> Result<Self> {
        let node = match asset.kind {
            AssetKind::Model => Self::Model(ModelAsset {
                asset,
                materials_root: materials_root.map(Path::to_path_buf),
            }),
            AssetKind::Texture => Self::Texture(asset),
            AssetKind::Material => Self::Material(asset),
            AssetKind::Shader => Self::Shader(asset),
            AssetKind::Folder => {
                return Err(JoyBuildError::UnknownAssetKind {
                    kind: asset.kind,
                    path: asset.path,
                });
            }
        };
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// Build capability
// ---------------------------------------------------------------------------

/// What a tree node must offer to be built, independent of how it is shown.
pub trait Buildable {
    /// Describe the build this node needs.
    fn request(&self) -> BuildRequest<'_>;
    /// Whether the node's sidecar artifact existed at last check.
    fn is_built(&self) -> bool;
    /// Record the outcome of a build attempt.
    fn set_built(&mut self, built: bool);
}

impl Buildable for LeafAsset {
    fn request(&self) -> BuildRequest<'_> {
        BuildRequest {
            kind: self.kind,
            source: &self.path,
            materials_root: None,
        }
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn set_built(&mut self, built: bool) {
        self.built = built;
    }
}

impl Buildable for ModelAsset {
    fn request(&self) -> BuildRequest<'_> {
        BuildRequest {
            materials_root: self.materials_root.as_deref(),
            ..self.asset.request()
        }
    }

    fn is_built(&self) -> bool {
        self.asset.built
    }

    fn set_built(&mut self, built: bool) {
        self.asset.built = built;
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// The scanned asset tree for one session.
#[derive(Debug, Clone)]
pub struct AssetTree {
    root_path: PathBuf,
    nodes: Vec<AssetNode>,
    leaves: Vec<NodeId>,
}

impl AssetTree {
    /// Scan `root` recursively.
    ///
    /// - directories whose name starts with `.` are skipped
    /// - files are classified by extension; unknown extensions are skipped
    /// - entries are visited sorted by name (directories first, then files)
    /// - an unreadable directory aborts the scan with [`JoyBuildError::Scan`]
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn scan(root: &Path, opts: &ScanOptions) -> Result<Self> {
        let root_path = std::path::absolute(root).map_err(|e| JoyBuildError::io(root, e))?;

        let mut tree = Self {
            root_path: root_path.clone(),
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        tree.scan_dir(&root_path, opts)?;

        info!(
            nodes = tree.nodes.len(),
            leaves = tree.leaves.len(),
            unbuilt = tree.unbuilt_count(),
            "asset tree scanned"
        );

        Ok(tree)
    }

    fn scan_dir(&mut self, dir: &Path, opts: &ScanOptions) -> Result<NodeId> {
        let id = self.push(AssetNode::Folder(FolderNode {
            path: dir.to_path_buf(),
            children: Vec::new(),
        }));

        let (dirs, files) = list_dir(dir)?;
        let mut children = Vec::with_capacity(dirs.len() + files.len());

        for sub in dirs {
            if is_hidden(&sub) {
                debug!(path = %sub.display(), "skipping hidden directory");
                continue;
            }
            children.push(self.scan_dir(&sub, opts)?);
        }

        for file in files {
            let Some(kind) = file
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| AssetKind::from_extension(e, opts.shaders_enabled))
            else {
                continue;
            };

            let asset = LeafAsset::probe(kind, file)?;
            debug!(path = %asset.path.display(), %kind, built = asset.built, "found asset");
            let leaf = self.push(AssetNode::leaf(asset, opts.materials_root.as_deref())?);
            self.leaves.push(leaf);
            children.push(leaf);
        }

        if let AssetNode::Folder(folder) = &mut self.nodes[id.0] {
            folder.children = children;
        }
        Ok(id)
    }

    fn push(&mut self, node: AssetNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Absolute path of the scanned root.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// The root folder node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &AssetNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AssetNode {
        &mut self.nodes[id.0]
    }

    /// Every buildable leaf, in discovery order.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Total node count, folders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of leaves whose built flag is false.
    pub fn unbuilt_count(&self) -> usize {
        self.leaves
            .iter()
            .filter(|id| self.node(**id).built() == Some(false))
            .count()
    }

    /// Locate a node by path, either absolute/cwd-relative or relative to the root.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        let candidates = [std::path::absolute(path).ok(), Some(self.root_path.join(path))];
        candidates.into_iter().flatten().find_map(|candidate| {
            self.nodes
                .iter()
                .position(|n| n.path() == candidate)
                .map(NodeId)
        })
    }

    /// Pre-order walk yielding `(depth, id)` pairs, root first.
    pub fn walk(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0, self.root())];
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            for child in self.node(id).children().iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// List a directory, returning sorted `(subdirectories, files)`.
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(|e| JoyBuildError::scan(dir, e))? {
        let entry = entry.map_err(|e| JoyBuildError::scan(dir, e))?;
        let file_type = entry.file_type().map_err(|e| JoyBuildError::scan(entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
