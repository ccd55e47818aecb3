use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::apply::Partition;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::review::CherryPickDescriptor;

const DEFAULT_REPORT: &str = include_str!("templates/report.txt");

/// Everything one run produced, borrowed from the pipeline for rendering.
#[derive(Debug, Clone)]
pub struct ReconciliationReport<'a> {
    pub open_patches: Vec<&'a str>,
    pub applied: &'a [CherryPickDescriptor],
    pub conflicts: &'a [CherryPickDescriptor],
}

impl<'a> ReconciliationReport<'a> {
    /// `open` is the full patch list as it was handed to the applier.
    pub fn new(open: &'a [CherryPickDescriptor], partition: &'a Partition) -> Self {
        Self {
            open_patches: open.iter().map(CherryPickDescriptor::review_url).collect(),
            applied: &partition.applied,
            conflicts: &partition.conflicts,
        }
    }
}

#[derive(Serialize)]
struct PatchView<'a> {
    number: u64,
    change_id: &'a str,
    url: &'a str,
    command: &'a str,
}

impl<'a> From<&'a CherryPickDescriptor> for PatchView<'a> {
    fn from(d: &'a CherryPickDescriptor) -> Self {
        Self {
            number: d.number(),
            change_id: d.change_id(),
            url: d.review_url(),
            command: d.apply_command(),
        }
    }
}

#[derive(Serialize)]
struct ReportContext<'a> {
    project: &'a str,
    branch: &'a str,
    authors: String,
    open_patches: &'a [&'a str],
    applied: Vec<PatchView<'a>>,
    conflicts: Vec<PatchView<'a>>,
}

/// Renders a `ReconciliationReport` through an `upon` template.
///
/// The sections come out in the order the template lists them; inputs are
/// neither sorted nor filtered.
pub struct ReportGenerator {
    template: String,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::with_template(DEFAULT_REPORT.to_string())
    }
}

impl ReportGenerator {
    pub fn with_template(template: String) -> Self {
        Self { template }
    }

    /// Use the configured override template if there is one.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.report_template {
            Some(ref path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        std::fs::read_to_string(path)
            .map(Self::with_template)
            .map_err(|e| {
                Error::Report(format!(
                    "failed to read report template {}: {e}",
                    path.display()
                ))
            })
    }

    pub fn render(&self, report: &ReconciliationReport<'_>, config: &Config) -> Result<String> {
        let context = ReportContext {
            project: &config.project,
            branch: &config.branch,
            authors: config.authors.join(" "),
            open_patches: &report.open_patches,
            applied: report.applied.iter().map(PatchView::from).collect(),
            conflicts: report.conflicts.iter().map(PatchView::from).collect(),
        };

        let engine = upon::Engine::new();
        let template = engine
            .compile(self.template.as_str())
            .map_err(|e| Error::Report(format!("invalid report template: {e}")))?;
        template
            .render(&engine, &context)
            .to_string()
            .map_err(|e| Error::Report(format!("failed to render report: {e}")))
    }
}

/// Plain listing of a patch list: every apply command, a blank line, then every review URL.
pub fn render_listing(patches: &[CherryPickDescriptor]) -> String {
    let mut out = String::new();
    for patch in patches {
        let _ = writeln!(out, "{}", patch.apply_command());
    }
    out.push('\n');
    for patch in patches {
        let _ = writeln!(out, "{}", patch.review_url());
    }
    out
}
