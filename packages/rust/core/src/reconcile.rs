//! Content database reconciliation against the live data root.
//!
//! Load, prune vanished paths, assign identifiers to new files, persist.
//! Identifiers survive for as long as their path keeps resolving to a file;
//! once a path disappears its identifier is gone for good.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use joybuild_shared::{JoyBuildError, ReconcileOptions, Result, normalize_relative};
use joybuild_storage::ContentDatabase;

/// Summary of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries carried over unchanged.
    pub kept: usize,
    /// Files that received a new identifier.
    pub added: usize,
    /// Entries pruned because their file no longer exists.
    pub removed: usize,
    /// Entries in the persisted database.
    pub total: usize,
    pub elapsed: Duration,
}

/// Reconcile the database at `db_path` with the files under `root`.
///
/// A missing or malformed database aborts before anything is scanned.
#[instrument(skip_all, fields(root = %root.display(), db = %db_path.display()))]
pub fn reconcile(root: &Path, db_path: &Path, opts: &ReconcileOptions) -> Result<ReconcileReport> {
    let start = Instant::now();
    let mut db = ContentDatabase::load(db_path)?;

    let removed = prune(&mut db, root)?;
    let kept = db.len();
    let added = discover(&mut db, root, opts)?;

    db.save(db_path)?;

    let report = ReconcileReport {
        kept,
        added,
        removed,
        total: db.len(),
        elapsed: start.elapsed(),
    };
    info!(
        kept = report.kept,
        added = report.added,
        removed = report.removed,
        total = report.total,
        "content database reconciled"
    );
    Ok(report)
}

/// Drop every entry whose path no longer names a file under `root`.
fn prune(db: &mut ContentDatabase, root: &Path) -> Result<usize> {
    let mut vanished = Vec::new();
    for path in db.paths() {
        let abs = root.join(path);
        let is_file = match std::fs::metadata(&abs) {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(JoyBuildError::io(&abs, e)),
        };
        if !is_file {
            vanished.push(path.to_string());
        }
    }

    for path in &vanished {
        debug!(%path, "pruning vanished entry");
        db.remove(path);
    }
    Ok(vanished.len())
}

/// Assign identifiers to allowed files not yet in the database.
fn discover(db: &mut ContentDatabase, root: &Path, opts: &ReconcileOptions) -> Result<usize> {
    let mut added = 0;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            JoyBuildError::scan(path, e.into())
        })?;
        // Follows symlinks, matching the scanner and `prune`
        if !entry.path().is_file() {
            continue;
        }

        let allowed = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| opts.allows(e));
        if !allowed {
            continue;
        }

        let relative = entry.path().strip_prefix(root).map_err(|_| {
            JoyBuildError::validation(format!(
                "{} is not under {}",
                entry.path().display(),
                root.display()
            ))
        })?;
        let key = normalize_relative(relative);

        let (guid, is_new) = db.assign(&key);
        if is_new {
            debug!(path = %key, %guid, "assigned identifier");
            added += 1;
        }
    }

    Ok(added)
}
