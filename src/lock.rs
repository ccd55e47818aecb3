use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const LOCK_FILE: &str = "cherrysync.lock";

/// Exclusive claim on a repository for the length of one run.
///
/// Branch resets and applies from two runs would interleave in the same
/// tree, so a second run fails fast instead. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Lock file location: inside `.git/` when it is a directory, else the repo root.
    pub fn lock_path(repo: &Path) -> PathBuf {
        let git_dir = repo.join(".git");
        if git_dir.is_dir() {
            git_dir.join(LOCK_FILE)
        } else {
            repo.join(format!(".{LOCK_FILE}"))
        }
    }

    pub fn acquire(repo: &Path) -> Result<Self> {
        if !repo.is_dir() {
            return Err(Error::Workdir(format!(
                "repository path {} is not a directory",
                repo.display()
            )));
        }
        let path = Self::lock_path(repo);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    warn!(path = %path.display(), error = %e, "failed to record pid in lock file");
                }
                debug!(path = %path.display(), "acquired run lock");
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                Err(Error::Lock(format!(
                    "{} exists (held by pid {}); remove it if no other run is active",
                    path.display(),
                    holder.trim()
                )))
            }
            Err(e) => Err(Error::Lock(format!(
                "failed to create {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
