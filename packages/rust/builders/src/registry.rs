//! Collaborator trait and the per-batch registry.

use std::path::PathBuf;

use joybuild_shared::{AssetKind, BuildConfig, BuildRequest, JoyBuildError, Result};
use tracing::{debug, warn};

use crate::{ModelBuilder, ShaderBuilder, TextureBuilder};

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Why a collaborator could not build one asset.
///
/// These never abort a batch; the orchestrator renders them into a failed
/// `BuildResult` and moves on.
#[derive(Debug, thiserror::Error)]
pub enum BuildFailure {
    #[error("cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot decode source: {0}")]
    Decode(String),

    #[error("missing reference '{reference}' (looked in {location})")]
    MissingReference { reference: String, location: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl BuildFailure {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Result of a single collaborator call.
pub type BuildOutcome = std::result::Result<(), BuildFailure>;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A kind-specific builder.
///
/// On success the builder has written `request.artifact_path()` itself.
pub trait AssetBuilder {
    /// Human-readable builder name for tracing.
    fn name(&self) -> &str;

    /// The asset kind this builder handles.
    fn kind(&self) -> AssetKind;

    /// Called once before a batch.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after a batch, whatever its outcome.
    fn terminate(&mut self) {}

    /// Build one asset.
    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds at most one builder per asset kind.
pub struct BuilderRegistry {
    builders: Vec<Box<dyn AssetBuilder>>,
    initialized: usize,
}

impl BuilderRegistry {
    /// A registry with no builders.
    pub fn empty() -> Self {
        Self {
            builders: Vec::new(),
            initialized: 0,
        }
    }

    /// The native model and texture builders, plus the shader assembler
    /// when `config.shaders_enabled` is set.
    pub fn native(config: &BuildConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ModelBuilder::new()));
        registry.register(Box::new(TextureBuilder::new()));
        if config.shaders_enabled {
            registry.register(Box::new(ShaderBuilder::from_config(config)));
        }
        registry
    }

    /// Add a builder, replacing any builder already registered for its kind.
    pub fn register(&mut self, builder: Box<dyn AssetBuilder>) {
        let kind = builder.kind();
        self.builders.retain(|b| b.kind() != kind);
        debug!(builder = builder.name(), %kind, "registered builder");
        self.builders.push(builder);
    }

    pub fn contains(&self, kind: AssetKind) -> bool {
        self.builders.iter().any(|b| b.kind() == kind)
    }

    /// The builder for `kind`, if one is registered.
    pub fn get_mut(&mut self, kind: AssetKind) -> Option<&mut dyn AssetBuilder> {
        for builder in &mut self.builders {
            if builder.kind() == kind {
                return Some(builder.as_mut());
            }
        }
        None
    }

    /// Initialise every builder in registration order.
    ///
    /// If one fails, the builders already initialised are terminated again
    /// before the error is returned.
    pub fn initialize_all(&mut self) -> Result<()> {
        for index in 0..self.builders.len() {
            if let Err(e) = self.builders[index].initialize() {
                warn!(builder = self.builders[index].name(), error = %e, "builder failed to initialize");
                self.initialized = index;
                self.terminate_all();
                return Err(match e {
                    JoyBuildError::Builder(_) => e,
                    other => JoyBuildError::Builder(other.to_string()),
                });
            }
        }
        self.initialized = self.builders.len();
        Ok(())
    }

    /// Terminate every initialised builder, in reverse order.
    pub fn terminate_all(&mut self) {
        for builder in self.builders[..self.initialized].iter_mut().rev() {
            builder.terminate();
        }
        self.initialized = 0;
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::native(&BuildConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        kind: AssetKind,
        fail_init: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl AssetBuilder for Recorder {
        fn name(&self) -> &str {
            self.kind.label()
        }

        fn kind(&self) -> AssetKind {
            self.kind
        }

        fn initialize(&mut self) -> Result<()> {
            if self.fail_init {
                return Err(JoyBuildError::Builder("no device".into()));
            }
            self.log.lock().unwrap().push(format!("init {}", self.kind.label()));
            Ok(())
        }

        fn terminate(&mut self) {
            self.log.lock().unwrap().push(format!("term {}", self.kind.label()));
        }

        fn build(&mut self, _request: &BuildRequest<'_>) -> BuildOutcome {
            Ok(())
        }
    }

    fn recorder(kind: AssetKind, fail_init: bool, log: &Arc<Mutex<Vec<String>>>) -> Box<Recorder> {
        Box::new(Recorder {
            kind,
            fail_init,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn native_registry_kinds() {
        let registry = BuilderRegistry::native(&BuildConfig::default());
        assert!(registry.contains(AssetKind::Model));
        assert!(registry.contains(AssetKind::Texture));
        assert!(!registry.contains(AssetKind::Shader));
        assert!(!registry.contains(AssetKind::Material));

        let config = BuildConfig {
            shaders_enabled: true,
            ..BuildConfig::default()
        };
        assert!(BuilderRegistry::native(&config).contains(AssetKind::Shader));
    }

    #[test]
    fn register_replaces_same_kind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BuilderRegistry::native(&BuildConfig::default());
        registry.register(recorder(AssetKind::Texture, false, &log));

        let builder = registry.get_mut(AssetKind::Texture).unwrap();
        let request = BuildRequest {
            kind: AssetKind::Texture,
            source: Path::new("/nowhere/a.png"),
            materials_root: None,
        };
        // The recorder succeeds without touching the filesystem
        assert!(builder.build(&request).is_ok());
    }

    #[test]
    fn lifecycle_brackets_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BuilderRegistry::empty();
        registry.register(recorder(AssetKind::Model, false, &log));
        registry.register(recorder(AssetKind::Texture, false, &log));

        registry.initialize_all().unwrap();
        registry.terminate_all();
        // A second terminate is a no-op
        registry.terminate_all();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["init model", "init texture", "term texture", "term model"]
        );
    }

    #[test]
    fn failed_initialize_unwinds_earlier_builders() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BuilderRegistry::empty();
        registry.register(recorder(AssetKind::Model, false, &log));
        registry.register(recorder(AssetKind::Texture, true, &log));

        let err = registry.initialize_all().unwrap_err();
        assert!(matches!(err, JoyBuildError::Builder(_)));
        assert_eq!(*log.lock().unwrap(), vec!["init model", "term model"]);
    }

    #[test]
    fn failure_messages() {
        let err = BuildFailure::malformed(3, "face needs at least 3 vertices");
        assert_eq!(err.to_string(), "line 3: face needs at least 3 vertices");

        let err = BuildFailure::MissingReference {
            reference: "sponza.mtl".into(),
            location: "/data/materials".into(),
        };
        assert!(err.to_string().contains("sponza.mtl"));
    }
}
