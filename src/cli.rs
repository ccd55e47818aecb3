use clap::{Parser, Subcommand};

use crate::assemble::SortKey;

/// cherrysync: replay open Gerrit changes onto a local integration branch
#[derive(Parser, Debug, Clone)]
#[command(name = "cherrysync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Path to config file (default: cherrysync.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Gerrit project to query (e.g. platform/art)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Local repository the patches are applied in
    #[arg(long = "repo", global = true)]
    pub repo_path: Option<String>,

    /// Branch that is reset and receives the patches
    #[arg(long, global = true)]
    pub integration_branch: Option<String>,

    /// Upstream ref the integration branch is reset to (e.g. aosp/master)
    #[arg(long, global = true)]
    pub upstream_ref: Option<String>,

    /// Change owner to include; repeat to build the roster (replaces the configured one)
    #[arg(long = "author", global = true)]
    pub authors: Vec<String>,

    /// Keep patches in roster order instead of sorting them
    #[arg(long, global = true)]
    pub no_sort: bool,

    /// Key used to sort the patch list
    #[arg(long, value_enum, global = true)]
    pub sort_key: Option<SortKey>,

    /// Treat an HTTP error status from the review service as fatal
    #[arg(long, global = true)]
    pub strict_http: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Fetch the open patches and print their apply commands and review URLs
    List,

    /// Try a single apply command against the repository and report OKAY / NOT OKAY
    Try {
        /// Shell command that fetches and applies one patch
        apply_command: String,
    },
}
