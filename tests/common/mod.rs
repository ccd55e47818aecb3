#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use cherrysync::assemble::SortKey;
use cherrysync::config::Config;
use cherrysync::review::CherryPickDescriptor;
use tempfile::TempDir;

pub const REVIEW_BASE: &str = "https://review.example.com";
pub const INTEGRATION_BRANCH: &str = "script_automerger";
pub const UPSTREAM_REF: &str = "aosp/master";

pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test"]);
}

/// An upstream bare repo, an author clone that publishes changes as
/// `refs/changes/*`, and the local fork where patches are applied.
pub struct GitFixture {
    pub upstream: TempDir,
    pub author: TempDir,
    pub local: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        let upstream = TempDir::new().unwrap();
        run_git(upstream.path(), &["init", "--bare"]);
        run_git(upstream.path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);

        let seed = TempDir::new().unwrap();
        run_git(seed.path(), &["init"]);
        configure_identity(seed.path());
        std::fs::write(seed.path().join("a.txt"), "orig\n").unwrap();
        run_git(seed.path(), &["add", "."]);
        run_git(seed.path(), &["commit", "-m", "init"]);
        run_git(seed.path(), &["branch", "-M", "master"]);
        run_git(
            seed.path(),
            &["push", upstream.path().to_str().unwrap(), "master"],
        );

        let author = TempDir::new().unwrap();
        run_git(
            author.path(),
            &["clone", upstream.path().to_str().unwrap(), "."],
        );
        configure_identity(author.path());

        let local = TempDir::new().unwrap();
        run_git(
            local.path(),
            &["clone", "-o", "aosp", upstream.path().to_str().unwrap(), "."],
        );
        configure_identity(local.path());
        run_git(local.path(), &["branch", INTEGRATION_BRANCH, UPSTREAM_REF]);

        Self {
            upstream,
            author,
            local,
        }
    }

    pub fn local_path(&self) -> PathBuf {
        self.local.path().to_path_buf()
    }

    /// Commit `files` on top of `base` in the author clone, publish it as
    /// change `number`, and return the command that fetches and applies it.
    pub fn publish_change(&self, number: u64, base: &str, files: &[(&str, &str)]) -> String {
        let dir = self.author.path();
        run_git(dir, &["checkout", "-q", "--detach", base]);
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
        run_git(dir, &["add", "-A"]);
        run_git(dir, &["commit", "-m", &format!("change {number}")]);
        let change_ref = format!("refs/changes/{:02}/{number}/1", number % 100);
        run_git(dir, &["push", "origin", &format!("HEAD:{change_ref}")]);
        format!(
            "git fetch {} {change_ref} && git cherry-pick FETCH_HEAD",
            self.upstream.path().display()
        )
    }

    pub fn local_git(&self, args: &[&str]) -> String {
        run_git(self.local.path(), args)
    }

    pub fn head_tree(&self) -> String {
        self.local_git(&["rev-parse", "HEAD^{tree}"])
    }

    pub fn is_clean(&self) -> bool {
        self.local_git(&["status", "--porcelain"]).is_empty()
    }
}

/// A descriptor parsed from a minimal, well-formed change object.
pub fn descriptor(number: u64, apply_command: &str) -> CherryPickDescriptor {
    let change = serde_json::json!({
        "change_id": format!("I{number}"),
        "_number": number,
        "created": "2015-10-01 10:00:00.000000000",
        "updated": "2015-10-02 10:00:00.000000000",
        "current_revision": "rev1",
        "revisions": {
            "rev1": { "fetch": { "http": { "commands": { "Cherry Pick": apply_command } } } }
        }
    });
    CherryPickDescriptor::from_change_json(&change, REVIEW_BASE).unwrap()
}

/// Sensible default `Config` for tests. Callers can override fields via struct update syntax.
pub fn default_test_config(repo_path: PathBuf) -> Config {
    Config {
        review_url: REVIEW_BASE.to_string(),
        project: "platform/art".to_string(),
        branch: "master".to_string(),
        integration_branch: INTEGRATION_BRANCH.to_string(),
        upstream_ref: UPSTREAM_REF.to_string(),
        authors: vec!["Alexey Frunze".to_string(), "Lazar Trsic".to_string()],
        repo_path,
        status: "open".to_string(),
        sort: true,
        sort_key: SortKey::Number,
        strict_http: false,
        http_timeout: Duration::from_secs(5),
        command_timeout: Duration::from_secs(60),
        report_template: None,
    }
}
