use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::ProcessOutput;
use crate::review::CherryPickDescriptor;
use crate::vcs::Vcs;

/// Result of one apply attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The apply failed and was aborted; the tree is back to its pre-attempt state.
    Conflict(String),
}

/// Patches split by outcome, each side in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub applied: Vec<CherryPickDescriptor>,
    pub conflicts: Vec<CherryPickDescriptor>,
}

fn ensure_repo_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Workdir(format!(
            "repository path {} is not a directory",
            path.display()
        )))
    }
}

fn require_success(output: &ProcessOutput, what: &str) -> Result<()> {
    if output.interrupted() {
        return Err(Error::Interrupted);
    }
    if output.success() {
        Ok(())
    } else {
        Err(Error::Vcs(format!("{what} failed: {}", output.failure_reason())))
    }
}

/// Run one apply command; on failure run the abort command before returning.
///
/// A `Conflict` is only returned once the abort has been attempted, so
/// callers never see a half-applied tree. `Err` is reserved for failures
/// that make the run meaningless: the VCS could not be run, timed out, or
/// we were interrupted.
pub async fn try_apply<V: Vcs>(vcs: &V, command: &str) -> Result<ApplyOutcome> {
    let output = match vcs.apply(command).await {
        Ok(output) => output,
        Err(e @ Error::Timeout { .. }) => {
            if let Err(abort_err) = vcs.abort().await {
                warn!(error = %abort_err, "abort after timed-out apply failed");
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if output.interrupted() {
        if let Err(abort_err) = vcs.abort().await {
            warn!(error = %abort_err, "abort after interrupted apply failed");
        }
        return Err(Error::Interrupted);
    }

    if output.success() {
        return Ok(ApplyOutcome::Applied);
    }

    let reason = output.failure_reason();
    let abort = vcs.abort().await?;
    if !abort.success() {
        // Expected when the fetch half of the command failed: nothing was started.
        debug!(reason = %abort.failure_reason(), "abort reported nothing to undo");
        ensure_clean(vcs).await?;
    }
    Ok(ApplyOutcome::Conflict(reason))
}

/// After an abort that failed, make sure the apply left no tracked changes behind.
/// A dirty tree is reset to `HEAD`; if that fails the run cannot continue.
async fn ensure_clean<V: Vcs>(vcs: &V) -> Result<()> {
    let status = vcs.status().await?;
    require_success(&status, "status")?;
    if status.stdout_lines.iter().all(|line| line.trim().is_empty()) {
        return Ok(());
    }
    warn!(
        changed = status.stdout_lines.len(),
        "tree still dirty after abort, resetting to HEAD"
    );
    let reset = vcs.reset_hard("HEAD").await?;
    require_success(&reset, "reset to HEAD")
}

/// Resets the integration branch, then replays a patch list onto it in order.
pub struct SequentialApplier<V> {
    vcs: V,
    integration_branch: String,
    upstream_ref: String,
}

impl<V: Vcs> SequentialApplier<V> {
    pub fn new(vcs: V, integration_branch: String, upstream_ref: String) -> Self {
        Self {
            vcs,
            integration_branch,
            upstream_ref,
        }
    }

    pub fn from_config(vcs: V, config: &Config) -> Self {
        Self::new(
            vcs,
            config.integration_branch.clone(),
            config.upstream_ref.clone(),
        )
    }

    /// Check out the integration branch and hard-reset it to upstream.
    /// Discards any uncommitted work in the repository.
    async fn prepare(&self) -> Result<()> {
        ensure_repo_dir(self.vcs.repo_path())?;

        let checkout = self.vcs.checkout(&self.integration_branch).await?;
        require_success(&checkout, &format!("checkout of {}", self.integration_branch))?;

        let reset = self.vcs.reset_hard(&self.upstream_ref).await?;
        require_success(&reset, &format!("reset to {}", self.upstream_ref))?;

        info!(
            branch = %self.integration_branch,
            upstream = %self.upstream_ref,
            "integration branch reset"
        );
        Ok(())
    }

    /// Attempt every patch exactly once, in list order.
    ///
    /// Each attempt builds on the tree left by the earlier ones. A conflict
    /// never stops the loop.
    pub async fn apply_all(&self, patches: &[CherryPickDescriptor]) -> Result<Partition> {
        self.prepare().await?;

        let mut partition = Partition::default();
        for patch in patches {
            match try_apply(&self.vcs, patch.apply_command()).await? {
                ApplyOutcome::Applied => {
                    info!(number = patch.number(), "applied");
                    partition.applied.push(patch.clone());
                }
                ApplyOutcome::Conflict(reason) => {
                    info!(number = patch.number(), reason = %reason, "conflict");
                    partition.conflicts.push(patch.clone());
                }
            }
        }

        info!(
            applied = partition.applied.len(),
            conflicts = partition.conflicts.len(),
            "apply pass complete"
        );
        Ok(partition)
    }
}

/// Try a single apply command in the repository, outside any patch list.
pub async fn run_diagnostic<V: Vcs>(vcs: &V, command: &str) -> Result<bool> {
    ensure_repo_dir(vcs.repo_path())?;
    let outcome = try_apply(vcs, command).await?;
    if let ApplyOutcome::Conflict(ref reason) = outcome {
        info!(reason = %reason, "apply failed");
    }
    Ok(outcome == ApplyOutcome::Applied)
}
