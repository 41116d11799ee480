//! Build orchestration over a scanned asset tree.
//!
//! Every batch runs synchronously on the calling thread inside one
//! [`BuildSession`]. A failing asset yields a failed [`BuildResult`] and the
//! batch moves on; only lifecycle and internal faults abort it.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use joybuild_builders::BuilderRegistry;
use joybuild_discovery::{AssetTree, NodeId};
use joybuild_shared::{AssetKind, BuildRequest, BuildResult, JoyBuildError, Result};

use crate::session::BuildSession;

// ---------------------------------------------------------------------------
// Reports & progress
// ---------------------------------------------------------------------------

/// Outcome of one build batch, in build order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<BuildResult>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// The per-asset messages, in build order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.message.as_str())
    }
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a batch starts.
    fn phase(&self, name: &str);
    /// Called before an asset is handed to its builder.
    fn asset_started(&self, path: &Path, current: usize, total: usize);
    /// Called once the asset's result is known.
    fn asset_finished(&self, result: &BuildResult, current: usize, total: usize);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn asset_started(&self, _path: &Path, _current: usize, _total: usize) {}
    fn asset_finished(&self, _result: &BuildResult, _current: usize, _total: usize) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns the session's asset tree and the builders that act on it.
pub struct Orchestrator {
    tree: AssetTree,
    registry: BuilderRegistry,
}

impl Orchestrator {
    pub fn new(tree: AssetTree, registry: BuilderRegistry) -> Self {
        Self { tree, registry }
    }

    pub fn tree(&self) -> &AssetTree {
        &self.tree
    }

    pub fn into_tree(self) -> AssetTree {
        self.tree
    }

    /// Build one node. A leaf yields a single result; a folder yields the
    /// results of every leaf beneath it, in tree order.
    #[instrument(skip_all, fields(path = %self.tree.node(id).path().display()))]
    pub fn build_one(&mut self, id: NodeId, progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let mut targets = Vec::new();
        collect_leaves(&self.tree, id, &mut targets);
        self.run_batch("Building", targets, progress)
    }

    /// Build every leaf whose built flag is false, in discovery order.
    #[instrument(skip_all)]
    pub fn build_unbuilt(&mut self, progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let targets: Vec<NodeId> = self
            .tree
            .leaves()
            .iter()
            .copied()
            .filter(|id| self.tree.node(*id).built() != Some(true))
            .collect();
        self.run_batch("Building unbuilt assets", targets, progress)
    }

    /// Build every leaf unconditionally, in discovery order.
    #[instrument(skip_all)]
    pub fn build_all(&mut self, progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let targets = self.tree.leaves().to_vec();
        let report = self.run_batch("Building all assets", targets, progress)?;
        info!(elapsed_ms = report.elapsed.as_millis() as u64, "build all finished");
        Ok(report)
    }

    fn run_batch(
        &mut self,
        phase: &str,
        targets: Vec<NodeId>,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        progress.phase(phase);

        let Self { tree, registry } = self;
        let mut session = BuildSession::begin(registry)?;
        let total = targets.len();
        let mut results = Vec::with_capacity(total);

        for (index, id) in targets.into_iter().enumerate() {
            let current = index + 1;
            progress.asset_started(tree.node(id).path(), current, total);
            let result = build_leaf(tree, &mut session, id)?;
            progress.asset_finished(&result, current, total);
            results.push(result);
        }
        drop(session);

        let report = BatchReport {
            results,
            elapsed: start.elapsed(),
        };
        info!(
            built = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch complete"
        );
        progress.done(&report);
        Ok(report)
    }
}

/// Pre-order leaves under `id` (or `id` itself when it is a leaf).
fn collect_leaves(tree: &AssetTree, id: NodeId, out: &mut Vec<NodeId>) {
    let node = tree.node(id);
    if node.kind().is_folder() {
        for child in node.children() {
            collect_leaves(tree, *child, out);
        }
    } else {
        out.push(id);
    }
}

/// Build one leaf and overwrite its built flag with the outcome.
fn build_leaf(tree: &mut AssetTree, session: &mut BuildSession<'_>, id: NodeId) -> Result<BuildResult> {
    let node = tree.node(id);
    let buildable = node.as_buildable().ok_or_else(|| JoyBuildError::UnknownAssetKind {
        kind: node.kind(),
        path: node.path().to_path_buf(),
    })?;
    let result = dispatch(session, &buildable.request())?;

    if !result.success {
        warn!(path = %result.path.display(), detail = %result.message, "asset build failed");
    }
    if let Some(buildable) = tree.node_mut(id).as_buildable_mut() {
        buildable.set_built(result.success);
    }
    Ok(result)
}

/// Route a request to the builder for its kind.
fn dispatch(session: &mut BuildSession<'_>, request: &BuildRequest<'_>) -> Result<BuildResult> {
    let source = request.source;
    let result = match request.kind {
        AssetKind::Folder => {
            return Err(JoyBuildError::UnknownAssetKind {
                kind: request.kind,
                path: source.to_path_buf(),
            });
        }
        AssetKind::Material => match joybuild_material::build_material(source) {
            Ok(_) => BuildResult::ok(source),
            Err(e) => BuildResult::failed(source, request.kind, e),
        },
        kind => match session.builder(kind) {
            Some(builder) => match builder.build(request) {
                Ok(()) => BuildResult::ok(source),
                Err(e) => BuildResult::failed(source, kind, e),
            },
            None => BuildResult::failed(
                source,
                kind,
                format!("no builder registered for {} assets", kind.label()),
            ),
        },
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use joybuild_builders::{AssetBuilder, BuildFailure, BuildOutcome};
    use joybuild_shared::ScanOptions;
    use std::path::PathBuf;

    /// Writes the sidecar unless the file name contains "bad".
    struct Stub(AssetKind);

    impl AssetBuilder for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn kind(&self) -> AssetKind {
            self.0
        }
        fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
            if request.file_name().contains("bad") {
                return Err(BuildFailure::Decode("corrupt".into()));
            }
            std::fs::write(request.artifact_path(), b"ok").map_err(|e| BuildFailure::io(request.source, e))
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jb-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn orchestrator(root: &Path) -> Orchestrator {
        let tree = AssetTree::scan(root, &ScanOptions::default()).unwrap();
        let mut registry = BuilderRegistry::empty();
        registry.register(Box::new(Stub(AssetKind::Model)));
        registry.register(Box::new(Stub(AssetKind::Texture)));
        Orchestrator::new(tree, registry)
    }

    #[test]
    fn failures_are_isolated_and_prefixed() {
        let root = temp_dir();
        std::fs::write(root.join("a_bad.png"), b"").unwrap();
        std::fs::write(root.join("b.png"), b"").unwrap();

        let mut orch = orchestrator(&root);
        let report = orch.build_all(&SilentProgress).unwrap();

        let messages: Vec<_> = report.messages().collect();
        assert_eq!(
            messages,
            vec![
                "a_bad.png: Error building texture\ncannot decode source: corrupt",
                "b.png: OK"
            ]
        );
        assert_eq!(report.failed(), 1);
        assert!(root.join("b.png.data").exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn materials_are_built_locally() {
        let root = temp_dir();
        std::fs::write(root.join("m.mtl"), "newmtl m\nmap_Kd m.png\n").unwrap();

        let mut orch = orchestrator(&root);
        let report = orch.build_unbuilt(&SilentProgress).unwrap();
        assert_eq!(report.messages().collect::<Vec<_>>(), vec!["m.mtl: OK"]);
        assert!(root.join("m.mtl.json").exists());
        assert_eq!(orch.tree().unbuilt_count(), 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_builder_is_a_failed_result() {
        let root = temp_dir();
        std::fs::write(root.join("a.png"), b"").unwrap();

        let tree = AssetTree::scan(&root, &ScanOptions::default()).unwrap();
        let mut orch = Orchestrator::new(tree, BuilderRegistry::empty());
        let report = orch.build_all(&SilentProgress).unwrap();
        assert!(!report.results[0].success);
        assert!(report.results[0].message.contains("no builder registered for texture"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn folder_request_is_an_internal_fault() {
        let root = temp_dir();
        let tree = AssetTree::scan(&root, &ScanOptions::default()).unwrap();
        let mut registry = BuilderRegistry::empty();
        let mut session = BuildSession::begin(&mut registry).unwrap();
        let request = BuildRequest {
            kind: AssetKind::Folder,
            source: tree.root_path(),
            materials_root: None,
        };
        let err = dispatch(&mut session, &request).unwrap_err();
        assert!(matches!(err, JoyBuildError::UnknownAssetKind { .. }));

        drop(session);
        let _ = std::fs::remove_dir_all(&root);
    }

    /// Records the (current, total) pair of every started asset.
    #[derive(Default)]
    struct Positions(std::sync::Mutex<Vec<(usize, usize)>>);

    impl ProgressReporter for Positions {
        fn phase(&self, _name: &str) {}
        fn asset_started(&self, _path: &Path, current: usize, total: usize) {
            self.0.lock().unwrap().push((current, total));
        }
        fn asset_finished(&self, _result: &BuildResult, _current: usize, _total: usize) {}
        fn done(&self, _report: &BatchReport) {}
    }

    #[test]
    fn unbuilt_progress_counts_only_attempted_assets() {
        let root = temp_dir();
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            std::fs::write(root.join(name), b"").unwrap();
        }
        std::fs::write(root.join("a.png.data"), b"").unwrap();
        std::fs::write(root.join("b.png.data"), b"").unwrap();

        let mut orch = orchestrator(&root);
        let progress = Positions::default();
        let report = orch.build_unbuilt(&progress).unwrap();

        assert_eq!(report.messages().collect::<Vec<_>>(), vec!["c.png: OK", "d.png: OK"]);
        assert_eq!(*progress.0.lock().unwrap(), vec![(1, 2), (2, 2)]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
