use std::cmp::Ordering;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::review::{ChangeSource, CherryPickDescriptor};

/// Key used to order the aggregated patch list.
///
/// `Url` compares review URLs as strings, so `#/c/99/` sorts after
/// `#/c/171665/`. It is the historical ordering and stays the default;
/// `Number` orders by the numeric change identifier instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Url,
    Number,
}

impl SortKey {
    pub fn compare(self, a: &CherryPickDescriptor, b: &CherryPickDescriptor) -> Ordering {
        match self {
            SortKey::Url => a.review_url().cmp(b.review_url()),
            SortKey::Number => a.number().cmp(&b.number()),
        }
    }
}

pub type PatchList = Vec<CherryPickDescriptor>;

/// Collect the open patches of every author in roster order.
///
/// Authors with no patches contribute nothing. An author whose batch fails
/// to decode is skipped whole; transport failures abort the assembly.
/// With `sort` set the combined list is stable-sorted by `key`.
pub fn form_patch_list<S: ChangeSource>(
    source: &S,
    project: &str,
    status: &str,
    authors: &[String],
    sort: Option<SortKey>,
) -> Result<PatchList> {
    let mut patches = PatchList::new();

    for author in authors {
        match source.fetch_author_patches(project, author, status) {
            Ok(batch) if batch.is_empty() => {
                info!(author = %author, "no open patches");
            }
            Ok(batch) => {
                info!(author = %author, count = batch.len(), "collected patches");
                patches.extend(batch);
            }
            Err(e) if e.is_batch_local() => {
                warn!(author = %author, error = %e, "skipping author: malformed review response");
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(key) = sort {
        patches.sort_by(|a, b| key.compare(a, b));
    }

    Ok(patches)
}
