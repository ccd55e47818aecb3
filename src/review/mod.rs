pub mod gerrit;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// One pending change, reduced to what is needed to apply and report it.
///
/// Built only from a change object returned by the review service; every
/// field must resolve or construction fails. There are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CherryPickDescriptor {
    change_id: String,
    number: u64,
    created: String,
    updated: String,
    apply_command: String,
    review_url: String,
}

impl CherryPickDescriptor {
    /// Build a descriptor from one element of a `/changes/` response.
    ///
    /// Fields are resolved in order `change_id`, `_number`, `created`,
    /// `updated`, `current_revision`, then
    /// `revisions[current_revision].fetch.http.commands["Cherry Pick"]`.
    /// The first unresolvable one is reported.
    pub fn from_change_json(change: &Value, review_base: &str) -> Result<Self> {
        let change_id = string_at(change, &["change_id"])?;
        let number = change_number(change)?;
        let created = string_at(change, &["created"])?;
        let updated = string_at(change, &["updated"])?;
        let current_revision = string_at(change, &["current_revision"])?;
        let apply_command = string_at(
            change,
            &[
                "revisions",
                &current_revision,
                "fetch",
                "http",
                "commands",
                "Cherry Pick",
            ],
        )?;

        Ok(Self {
            change_id,
            number,
            created,
            updated,
            apply_command,
            review_url: review_url(review_base, number),
        })
    }

    pub fn change_id(&self) -> &str {
        &self.change_id
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn created(&self) -> &str {
        &self.created
    }

    pub fn updated(&self) -> &str {
        &self.updated
    }

    pub fn apply_command(&self) -> &str {
        &self.apply_command
    }

    pub fn review_url(&self) -> &str {
        &self.review_url
    }
}

/// Permanent link to a change's review page: `<base>/#/c/<number>/`.
pub fn review_url(review_base: &str, number: u64) -> String {
    format!("{}/#/c/{number}/", review_base.trim_end_matches('/'))
}

/// A service that can list the pending changes of one author.
pub trait ChangeSource {
    /// Fetch every change owned by `author` in `project` with the given status.
    ///
    /// All or nothing: one malformed change fails the whole batch.
    fn fetch_author_patches(
        &self,
        project: &str,
        author: &str,
        status: &str,
    ) -> Result<Vec<CherryPickDescriptor>>;
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        current = current
            .get(*key)
            .ok_or_else(|| Error::FieldMissing(path[..=depth].join(".")))?;
    }
    Ok(current)
}

fn string_at(root: &Value, path: &[&str]) -> Result<String> {
    lookup(root, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::FieldInvalid(path.join("."), "expected a string".to_string()))
}

fn change_number(change: &Value) -> Result<u64> {
    let raw = lookup(change, &["_number"])?;
    if let Some(n) = raw.as_u64() {
        return Ok(n);
    }
    let reason = match raw.as_i64() {
        Some(n) => format!("must be non-negative, got {n}"),
        None => format!("expected an integer, got {raw}"),
    };
    Err(Error::FieldInvalid("_number".to_string(), reason))
}
