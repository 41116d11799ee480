//! Scoped builder lifecycle for one batch.

use joybuild_builders::{AssetBuilder, BuilderRegistry};
use joybuild_shared::{AssetKind, Result};
use tracing::debug;

/// Holds the registry's builders initialised for the duration of a batch.
///
/// Acquiring the session calls `initialize` on every builder once; dropping
/// it calls `terminate` once, on every exit path.
pub struct BuildSession<'r> {
    registry: &'r mut BuilderRegistry,
}

impl<'r> BuildSession<'r> {
    pub fn begin(registry: &'r mut BuilderRegistry) -> Result<Self> {
        registry.initialize_all()?;
        debug!("build session started");
        Ok(Self { registry })
    }

    /// The initialised builder for `kind`, if one is registered.
    pub fn builder(&mut self, kind: AssetKind) -> Option<&mut dyn AssetBuilder> {
        self.registry.get_mut(kind)
    }
}

impl Drop for BuildSession<'_> {
    fn drop(&mut self) {
        self.registry.terminate_all();
        debug!("build session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joybuild_builders::BuildOutcome;
    use joybuild_shared::{BuildRequest, JoyBuildError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counts {
        init: AtomicUsize,
        term: AtomicUsize,
    }

    struct Counted(Arc<Counts>);

    impl AssetBuilder for Counted {
        fn name(&self) -> &str {
            "counted"
        }
        fn kind(&self) -> AssetKind {
            AssetKind::Texture
        }
        fn initialize(&mut self) -> Result<()> {
            self.0.init.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn terminate(&mut self) {
            self.0.term.fetch_add(1, Ordering::SeqCst);
        }
        fn build(&mut self, _request: &BuildRequest<'_>) -> BuildOutcome {
            Ok(())
        }
    }

    fn run_and_fail(registry: &mut BuilderRegistry) -> Result<()> {
        let mut session = BuildSession::begin(registry)?;
        assert!(session.builder(AssetKind::Texture).is_some());
        Err(JoyBuildError::validation("early exit"))
    }

    #[test]
    fn terminate_runs_on_early_exit() {
        let counts = Arc::new(Counts::default());
        let mut registry = BuilderRegistry::empty();
        registry.register(Box::new(Counted(Arc::clone(&counts))));

        assert!(run_and_fail(&mut registry).is_err());
        assert_eq!(counts.init.load(Ordering::SeqCst), 1);
        assert_eq!(counts.term.load(Ordering::SeqCst), 1);

        {
            let _session = BuildSession::begin(&mut registry).unwrap();
        }
        assert_eq!(counts.init.load(Ordering::SeqCst), 2);
        assert_eq!(counts.term.load(Ordering::SeqCst), 2);
    }
}
