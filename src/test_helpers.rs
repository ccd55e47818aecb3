use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::assemble::SortKey;
use crate::config::Config;
use crate::review::CherryPickDescriptor;

pub const TEST_REVIEW_BASE: &str = "https://review.example.com";

/// A well-formed `/changes/` element whose current revision is `rev1`.
pub fn change_json(number: u64, apply_command: &str) -> Value {
    serde_json::json!({
        "id": format!("platform%2Fart~master~I{number}"),
        "project": "platform/art",
        "branch": "master",
        "change_id": format!("I{number}"),
        "subject": format!("Change {number}"),
        "status": "NEW",
        "created": "2015-10-01 10:00:00.000000000",
        "updated": "2015-10-02 10:00:00.000000000",
        "_number": number,
        "current_revision": "rev1",
        "revisions": {
            "rev1": {
                "_number": 3,
                "fetch": {
                    "http": {
                        "url": "https://android.googlesource.com/platform/art",
                        "ref": format!("refs/changes/65/{number}/3"),
                        "commands": {
                            "Checkout": "git fetch ... && git checkout FETCH_HEAD",
                            "Cherry Pick": apply_command,
                        }
                    }
                }
            }
        }
    })
}

/// Create a `CherryPickDescriptor` with sensible defaults for tests.
pub fn make_descriptor(number: u64, apply_command: &str) -> CherryPickDescriptor {
    CherryPickDescriptor::from_change_json(&change_json(number, apply_command), TEST_REVIEW_BASE)
        .expect("test change json is well-formed")
}

/// Sensible default `Config` for tests. Callers can override fields via struct update syntax.
pub fn test_config() -> Config {
    Config {
        review_url: TEST_REVIEW_BASE.to_string(),
        project: "platform/art".to_string(),
        branch: "master".to_string(),
        integration_branch: "script_automerger".to_string(),
        upstream_ref: "aosp/master".to_string(),
        authors: vec!["Goran Jakovljevic".to_string(), "Chris Larsen".to_string()],
        repo_path: PathBuf::from("."),
        status: "open".to_string(),
        sort: true,
        sort_key: SortKey::Url,
        strict_http: false,
        http_timeout: Duration::from_secs(30),
        command_timeout: Duration::from_secs(600),
        report_template: None,
    }
}
