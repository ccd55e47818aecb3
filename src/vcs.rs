use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessOutput, run_command};

/// Validate that a branch or ref name is safe: matches `^[a-zA-Z0-9/_.-]+$` and does not start with `refs/`.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Vcs("branch name must not be empty".to_string()));
    }
    if name.starts_with("refs/") {
        return Err(Error::Vcs(format!(
            "branch name must not start with 'refs/': {name}"
        )));
    }
    if name.starts_with('-') {
        return Err(Error::Vcs(format!(
            "branch name must not start with '-': {name}"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '_' || c == '.' || c == '-')
    {
        return Err(Error::Vcs(format!(
            "branch name contains invalid characters (allowed: a-zA-Z0-9/_.-): {name}"
        )));
    }
    Ok(())
}

/// The four version-control operations the reconciliation needs.
///
/// Every operation reports the raw process outcome; a non-zero exit is not
/// an error at this level. `Err` means the operation could not be run at all.
pub trait Vcs {
    /// Directory every operation runs in.
    fn repo_path(&self) -> &Path;

    /// Switch to the integration branch.
    fn checkout(&self, branch: &str) -> impl Future<Output = Result<ProcessOutput>> + Send;

    /// Discard all local state and point the current branch at `reference`.
    fn reset_hard(&self, reference: &str) -> impl Future<Output = Result<ProcessOutput>> + Send;

    /// Run an opaque apply command handed out by the review service.
    fn apply(&self, command: &str) -> impl Future<Output = Result<ProcessOutput>> + Send;

    /// Abandon an in-progress apply, restoring the pre-apply tree.
    fn abort(&self) -> impl Future<Output = Result<ProcessOutput>> + Send;

    /// Tracked changes in the tree, one line per path; no output means clean.
    fn status(&self) -> impl Future<Output = Result<ProcessOutput>> + Send;
}

/// `git` on the command line, every call bound to `repo_path`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    timeout: Option<Duration>,
}

impl GitCli {
    pub fn new(repo_path: PathBuf, timeout: Option<Duration>) -> Self {
        Self { repo_path, timeout }
    }

    fn git_spec(&self, op: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: "git".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            working_dir: self.repo_path.clone(),
            timeout: self.timeout,
            log_prefix: format!("vcs:{op}"),
        }
    }
}

impl Vcs for GitCli {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn checkout(&self, branch: &str) -> Result<ProcessOutput> {
        run_command(self.git_spec("checkout", &["checkout", branch])).await
    }

    async fn reset_hard(&self, reference: &str) -> Result<ProcessOutput> {
        run_command(self.git_spec("reset", &["reset", "--hard", reference])).await
    }

    async fn apply(&self, command: &str) -> Result<ProcessOutput> {
        let mut spec = CommandSpec::shell(command, self.repo_path.clone(), self.timeout);
        spec.log_prefix = "vcs:apply".to_string();
        run_command(spec).await
    }

    async fn abort(&self) -> Result<ProcessOutput> {
        run_command(self.git_spec("abort", &["cherry-pick", "--abort"])).await
    }

    async fn status(&self) -> Result<ProcessOutput> {
        run_command(self.git_spec(
            "status",
            &["status", "--porcelain", "--untracked-files=no"],
        ))
        .await
    }
}
