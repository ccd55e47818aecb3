use tracing::info;

use crate::apply::SequentialApplier;
use crate::assemble::{PatchList, form_patch_list};
use crate::config::Config;
use crate::error::Result;
use crate::lock::RunLock;
use crate::report::{ReconciliationReport, ReportGenerator};
use crate::review::ChangeSource;
use crate::vcs::Vcs;

/// Wires fetch, apply and report together for one reconciliation run.
pub struct Orchestrator<S, V> {
    source: S,
    applier: SequentialApplier<V>,
    reporter: ReportGenerator,
    config: Config,
}

impl<S: ChangeSource, V: Vcs> Orchestrator<S, V> {
    pub fn new(source: S, vcs: V, config: Config) -> Result<Self> {
        let reporter = ReportGenerator::from_config(&config)?;
        let applier = SequentialApplier::from_config(vcs, &config);
        Ok(Self {
            source,
            applier,
            reporter,
            config,
        })
    }

    /// Fetch and assemble the open patches of the configured roster.
    pub fn fetch(&self) -> Result<PatchList> {
        let patches = form_patch_list(
            &self.source,
            &self.config.project,
            &self.config.status,
            &self.config.authors,
            self.config.sort_order(),
        )?;
        info!(count = patches.len(), "assembled patch list");
        Ok(patches)
    }

    /// Full run: lock the repository, fetch, apply in one pass, render the report.
    ///
    /// Nothing is rendered unless every stage succeeds.
    pub async fn run(&self) -> Result<String> {
        let _lock = RunLock::acquire(&self.config.repo_path)?;
        let patches = self.fetch()?;
        let partition = self.applier.apply_all(&patches).await?;
        let report = ReconciliationReport::new(&patches, &partition);
        self.reporter.render(&report, &self.config)
    }
}
