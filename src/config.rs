use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::assemble::SortKey;
use crate::cli::{Cli, CliCommand};
use crate::error::{Error, Result};
use crate::vcs::validate_branch_name;

pub const DEFAULT_CONFIG_PATH: &str = "cherrysync.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub review_url: Option<String>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub integration_branch: Option<String>,
    pub upstream_ref: Option<String>,
    pub authors: Option<Vec<String>>,
    pub repo_path: Option<String>,
    pub status: Option<String>,
    pub sort: Option<bool>,
    pub sort_key: Option<SortKey>,
    pub strict_http: Option<bool>,
    pub http_timeout: Option<u64>,
    pub command_timeout: Option<u64>,
    pub report_template: Option<String>,
}

/// Fully resolved run configuration. Built once, then passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub review_url: String,
    pub project: String,
    /// Upstream branch name, shown in the report header.
    pub branch: String,
    pub integration_branch: String,
    pub upstream_ref: String,
    pub authors: Vec<String>,
    pub repo_path: PathBuf,
    pub status: String,
    pub sort: bool,
    pub sort_key: SortKey,
    pub strict_http: bool,
    pub http_timeout: Duration,
    pub command_timeout: Duration,
    pub report_template: Option<PathBuf>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = Path::new(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));
        let file_config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            parse_config(&content)?
        } else {
            return Err(Error::ConfigNotFound(config_path.to_path_buf()));
        };

        merge(file_config, cli)
    }

    /// The sort applied to the aggregated patch list, if any.
    pub fn sort_order(&self) -> Option<SortKey> {
        self.sort.then_some(self.sort_key)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref authors) = config.authors {
        validate_authors(authors)?;
    }
    for (name, value) in [
        ("integration_branch", &config.integration_branch),
        ("upstream_ref", &config.upstream_ref),
    ] {
        if let Some(branch) = value {
            validate_branch_name(branch)
                .map_err(|e| Error::ConfigValidation(format!("{name}: {e}")))?;
        }
    }
    if let Some(ref url) = config.review_url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        return Err(Error::ConfigValidation(format!(
            "review_url must be an http(s) URL: {url}"
        )));
    }
    if let Some(ref status) = config.status
        && status.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "status must not be empty".to_string(),
        ));
    }
    for (name, value) in [
        ("http_timeout", config.http_timeout),
        ("command_timeout", config.command_timeout),
    ] {
        if value == Some(0) {
            return Err(Error::ConfigValidation(format!("{name} must be > 0")));
        }
    }
    Ok(())
}

fn validate_authors(authors: &[String]) -> Result<()> {
    if authors.is_empty() {
        return Err(Error::ConfigValidation(
            "authors must list at least one change owner".to_string(),
        ));
    }
    if authors.iter().any(|a| a.trim().is_empty()) {
        return Err(Error::ConfigValidation(
            "authors must not contain blank names".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let authors = if cli.authors.is_empty() {
        file.authors.unwrap_or_default()
    } else {
        cli.authors.clone()
    };
    // `try` applies one command and never queries the review service.
    if !matches!(cli.command, Some(CliCommand::Try { .. })) {
        validate_authors(&authors)?;
    }

    let repo_path = cli
        .repo_path
        .clone()
        .or(file.repo_path)
        .ok_or_else(|| Error::ConfigValidation("repo_path is required".to_string()))?;

    let integration_branch = cli
        .integration_branch
        .clone()
        .or(file.integration_branch)
        .unwrap_or_else(|| "script_automerger".to_string());
    let upstream_ref = cli
        .upstream_ref
        .clone()
        .or(file.upstream_ref)
        .unwrap_or_else(|| "aosp/master".to_string());
    for (name, value) in [
        ("integration_branch", &integration_branch),
        ("upstream_ref", &upstream_ref),
    ] {
        validate_branch_name(value).map_err(|e| Error::ConfigValidation(format!("{name}: {e}")))?;
    }

    Ok(Config {
        review_url: file
            .review_url
            .unwrap_or_else(|| "https://android-review.googlesource.com".to_string()),
        project: cli
            .project
            .clone()
            .or(file.project)
            .unwrap_or_else(|| "platform/art".to_string()),
        branch: file.branch.unwrap_or_else(|| "master".to_string()),
        integration_branch,
        upstream_ref,
        authors,
        repo_path: PathBuf::from(repo_path),
        status: file.status.unwrap_or_else(|| "open".to_string()),
        sort: !cli.no_sort && file.sort.unwrap_or(true),
        sort_key: cli.sort_key.or(file.sort_key).unwrap_or_default(),
        strict_http: cli.strict_http || file.strict_http.unwrap_or(false),
        http_timeout: Duration::from_secs(file.http_timeout.unwrap_or(30)),
        command_timeout: Duration::from_secs(file.command_timeout.unwrap_or(600)),
        report_template: file.report_template.map(PathBuf::from),
    })
}
