//! Behavioural properties of the build orchestrator.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use joybuild_builders::{AssetBuilder, BuildFailure, BuildOutcome, BuilderRegistry};
use joybuild_core::pipeline::{Orchestrator, SilentProgress};
use joybuild_discovery::{AssetTree, is_built};
use joybuild_shared::{AssetKind, BuildConfig, BuildRequest, ScanOptions};

/// Counts calls and writes the sidecar unless told to fail.
struct Counting {
    kind: AssetKind,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl AssetBuilder for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) || request.file_name().starts_with("broken") {
            return Err(BuildFailure::Decode("simulated failure".into()));
        }
        std::fs::write(request.artifact_path(), b"artifact")
            .map_err(|e| BuildFailure::io(request.source, e))
    }
}

struct Harness {
    root: PathBuf,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl Harness {
    fn new(files: &[&str]) -> Self {
        let root = std::env::temp_dir().join(format!("jb-build-props-{}", uuid::Uuid::now_v7()));
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"").unwrap();
        }
        std::fs::create_dir_all(&root).unwrap();
        Self {
            root,
            calls: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        let tree = AssetTree::scan(&self.root, &ScanOptions::default()).unwrap();
        let mut registry = BuilderRegistry::empty();
        for kind in [AssetKind::Model, AssetKind::Texture] {
            registry.register(Box::new(Counting {
                kind,
                calls: Arc::clone(&self.calls),
                fail: Arc::clone(&self.fail),
            }));
        }
        Orchestrator::new(tree, registry)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn find(orch: &Orchestrator, path: &str) -> joybuild_discovery::NodeId {
    orch.tree().find(Path::new(path)).unwrap()
}

#[test]
fn built_leaf_is_skipped_by_build_unbuilt() {
    let h = Harness::new(&["textures/wall.png", "textures/floor.png"]);
    let mut orch = h.orchestrator();

    let wall = find(&orch, "textures/wall.png");
    orch.build_one(wall, &SilentProgress).unwrap();
    assert_eq!(h.calls(), 1);
    assert_eq!(orch.tree().node(wall).built(), Some(true));

    let report = orch.build_unbuilt(&SilentProgress).unwrap();
    assert_eq!(report.messages().collect::<Vec<_>>(), vec!["floor.png: OK"]);
    assert_eq!(h.calls(), 2);

    // Nothing left to do
    let report = orch.build_unbuilt(&SilentProgress).unwrap();
    assert!(report.results.is_empty());
    assert_eq!(h.calls(), 2);
}

#[test]
fn folder_build_equals_concatenated_child_builds() {
    let h = Harness::new(&[
        "level/props/crate.obj",
        "level/props/broken_barrel.obj",
        "level/floor.png",
        "level/wall.png",
    ]);
    let mut orch = h.orchestrator();
    let level = find(&orch, "level");

    let folder_messages: Vec<String> = orch
        .build_one(level, &SilentProgress)
        .unwrap()
        .results
        .into_iter()
        .map(|r| r.message)
        .collect();

    let children = orch.tree().node(level).children().to_vec();
    let mut child_messages = Vec::new();
    for child in children {
        let report = orch.build_one(child, &SilentProgress).unwrap();
        child_messages.extend(report.results.into_iter().map(|r| r.message));
    }

    assert_eq!(folder_messages, child_messages);
    assert_eq!(
        folder_messages,
        vec![
            "broken_barrel.obj: Error building model\ncannot decode source: simulated failure",
            "crate.obj: OK",
            "floor.png: OK",
            "wall.png: OK",
        ]
    );
}

#[test]
fn failed_rebuild_clears_built_flag() {
    let h = Harness::new(&["wall.png"]);
    let mut orch = h.orchestrator();
    let wall = find(&orch, "wall.png");

    assert!(orch.build_one(wall, &SilentProgress).unwrap().results[0].success);
    assert_eq!(orch.tree().node(wall).built(), Some(true));

    h.fail.store(true, Ordering::SeqCst);
    let report = orch.build_one(wall, &SilentProgress).unwrap();
    assert!(!report.results[0].success);
    assert_eq!(orch.tree().node(wall).built(), Some(false));

    // The stale artifact is still on disk; only the in-memory flag flips
    assert!(is_built(AssetKind::Texture, &h.root.join("wall.png")).unwrap());
}

#[test]
fn batch_continues_past_failures() {
    let h = Harness::new(&["a.png", "broken.png", "c.png"]);
    let mut orch = h.orchestrator();

    let report = orch.build_all(&SilentProgress).unwrap();
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert!(!report.results[1].success);
    assert_eq!(orch.tree().unbuilt_count(), 1);
}

#[test]
fn build_all_with_native_builders() {
    let root = std::env::temp_dir().join(format!("jb-e2e-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("tri.obj"),
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n",
    )
    .unwrap();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]))
        .save(root.join("checker.png"))
        .unwrap();

    let tree = AssetTree::scan(&root, &ScanOptions::default()).unwrap();
    assert_eq!(tree.unbuilt_count(), 2);
    let mut orch = Orchestrator::new(tree, BuilderRegistry::native(&BuildConfig::default()));

    let report = orch.build_all(&SilentProgress).unwrap();
    let mut messages: Vec<_> = report.messages().collect();
    messages.sort_unstable();
    assert_eq!(messages, vec!["checker.png: OK", "tri.obj: OK"]);

    assert!(is_built(AssetKind::Model, &root.join("tri.obj")).unwrap());
    assert!(is_built(AssetKind::Texture, &root.join("checker.png")).unwrap());

    let _ = std::fs::remove_dir_all(&root);
}

/// Records lifecycle calls next to the build count.
struct Lifecycle {
    inits: Arc<AtomicUsize>,
    terms: Arc<AtomicUsize>,
    builds: Arc<AtomicUsize>,
}

impl AssetBuilder for Lifecycle {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Texture
    }

    fn initialize(&mut self) -> joybuild_shared::Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&mut self) {
        self.terms.fetch_add(1, Ordering::SeqCst);
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
        self.builds.fetch_add(1, Ordering::SeqCst);
        std::fs::write(request.artifact_path(), b"artifact")
            .map_err(|e| BuildFailure::io(request.source, e))
    }
}

#[test]
fn builders_are_initialized_once_per_batch() {
    let h = Harness::new(&["a.png", "b.png", "c.png"]);
    let inits = Arc::new(AtomicUsize::new(0));
    let terms = Arc::new(AtomicUsize::new(0));
    let builds = Arc::new(AtomicUsize::new(0));

    let tree = AssetTree::scan(&h.root, &ScanOptions::default()).unwrap();
    let mut registry = BuilderRegistry::empty();
    registry.register(Box::new(Lifecycle {
        inits: Arc::clone(&inits),
        terms: Arc::clone(&terms),
        builds: Arc::clone(&builds),
    }));
    let mut orch = Orchestrator::new(tree, registry);

    let report = orch.build_all(&SilentProgress).unwrap();
    assert_eq!(report.results.len(), 3);
    assert_eq!(builds.load(Ordering::SeqCst), 3);
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(terms.load(Ordering::SeqCst), 1);

    // A second batch brackets its own session
    orch.build_all(&SilentProgress).unwrap();
    assert_eq!(inits.load(Ordering::SeqCst), 2);
    assert_eq!(terms.load(Ordering::SeqCst), 2);
}
