//! Interrupt cleanup.
//!
//! The pipeline registers every staging directory and `.part` file it
//! creates with a [`CleanupRegistry`].  A watcher thread waits for SIGINT or
//! SIGTERM, removes whatever is still registered and exits with
//! [`INTERRUPTED`], so Ctrl-C in the middle of a backup never leaves a
//! cleartext archive in the staging root.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, warn};

/// Exit status after an interrupt (128 + SIGINT).
pub const INTERRUPTED: u8 = 130;

/// Paths to delete if the process is interrupted.
#[derive(Debug, Clone, Default)]
pub struct CleanupRegistry {
    paths: Arc<Mutex<BTreeSet<PathBuf>>>,
}

/// Registration handle; the path is forgotten when this is dropped.
#[derive(Debug)]
pub struct Tracked {
    registry: CleanupRegistry,
    path: PathBuf,
}

impl CleanupRegistry {
    pub fn track(&self, path: &Path) -> Tracked {
        self.lock().insert(path.to_path_buf());
        Tracked {
            registry: self.clone(),
            path: path.to_path_buf(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<PathBuf>> {
        // A panic while holding the lock cannot corrupt a set of paths.
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    /// Delete every registered file or directory; returns how many went.
    pub fn purge(&self) -> usize {
        let paths = std::mem::take(&mut *self.lock());
        let mut removed = 0;
        for path in &paths {
            let result = match fs::symlink_metadata(path) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
                Ok(_) => fs::remove_file(path),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    debug!("removed {}", path.display());
                    removed += 1;
                },
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => warn!("could not remove {}: {e}", path.display()),
            }
        }
        removed
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.path);
    }
}

/// Start the watcher thread.
///
/// Signal handlers are registered before this returns, so nothing the
/// caller stages afterwards can slip through.
pub fn install(registry: CleanupRegistry) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    #[cfg(unix)]
    let (mut sigint, mut sigterm) = {
        use tokio::signal::unix::{SignalKind, signal};

        let _guard = runtime.enter();
        (signal(SignalKind::interrupt())?, signal(SignalKind::terminate())?)
    };

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                #[cfg(unix)]
                tokio::select! {
                    _ = sigint.recv() => {},
                    _ = sigterm.recv() => {},
                }
                #[cfg(not(unix))]
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }

                let removed = registry.purge();
                warn!("interrupted; removed {removed} staged path(s)");
                std::process::exit(i32::from(INTERRUPTED));
            });
        })?;
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_removes_tracked_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".hotbackup-x");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("report.csv.tgz"), b"cleartext").unwrap();
        let part = dir.path().join("report.csv.part");
        fs::write(&part, b"partial").unwrap();

        let registry = CleanupRegistry::default();
        let _a = registry.track(&staging);
        let _b = registry.track(&part);

        assert_eq!(registry.purge(), 2);
        assert!(!staging.exists());
        assert!(!part.exists());
        assert!(registry.tracked().is_empty());
    }

    #[test]
    fn dropped_handle_untracks_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep");
        fs::write(&keep, b"x").unwrap();

        let registry = CleanupRegistry::default();
        drop(registry.track(&keep));

        assert!(registry.tracked().is_empty());
        assert_eq!(registry.purge(), 0);
        assert!(keep.exists());
    }

    #[test]
    fn already_removed_paths_are_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CleanupRegistry::default();
        let _gone = registry.track(&dir.path().join("gone"));
        assert_eq!(registry.purge(), 0);
    }
}
