use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::{ChangeSource, CherryPickDescriptor};

/// Gerrit prepends this to every JSON body to defeat XSSI.
pub const GERRIT_MAGIC_JSON_PREFIX: &str = ")]}'\n";

/// A raw HTTP response, kept even when the status is not 2xx.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over blocking HTTP GETs for testability.
pub trait ReviewClient {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// Real client backed by a `ureq` agent with a request timeout.
struct UreqClient {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqClient {
    fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            timeout,
        }
    }

    fn read(&self, response: ureq::Response) -> Result<HttpResponse> {
        let status = response.status();
        let url = response.get_url().to_string();
        let body = response.into_string().map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                Error::Timeout {
                    what: format!("reading response from {url}"),
                    after: self.timeout,
                }
            } else {
                Error::Network(format!("failed to read response from {url}: {e}"))
            }
        })?;
        Ok(HttpResponse { status, url, body })
    }
}

impl ReviewClient for UreqClient {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut request = self.agent.get(url);
        for (key, value) in params {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => self.read(response),
            // ureq turns 4xx/5xx into errors; the caller decides what a bad status means.
            Err(ureq::Error::Status(_, response)) => self.read(response),
            Err(ureq::Error::Transport(t)) if is_timeout(&t) => Err(Error::Timeout {
                what: format!("GET {url}"),
                after: self.timeout,
            }),
            Err(ureq::Error::Transport(t)) => {
                Err(Error::Network(format!("GET {url} failed: {t}")))
            }
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let io_timeout = std::error::Error::source(transport)
        .and_then(|s| s.downcast_ref::<std::io::Error>())
        .is_some_and(|e| {
            matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });
    io_timeout || transport.to_string().contains("timed out")
}

/// Build the search string selecting one author's changes in a project.
pub fn make_author_query(project: &str, status: &str, owner: &str) -> String {
    format!("project:{project} AND status:{status} AND owner:\"{owner}\"")
}

/// Strip Gerrit's magic prefix and decode the body as JSON.
///
/// With `strict` unset a non-2xx status is only logged and the body is
/// decoded anyway; with it set the status is an error.
pub fn decode_response(response: &HttpResponse, strict: bool) -> Result<Value> {
    if !response.is_success() {
        if strict {
            return Err(Error::Network(format!(
                "{} returned HTTP {}: {}",
                response.url,
                response.status,
                response.body.trim()
            )));
        }
        warn!(
            url = %response.url,
            status = response.status,
            body = %response.body.trim(),
            "review service returned an error status; decoding body anyway"
        );
    }

    let content = response
        .body
        .strip_prefix(GERRIT_MAGIC_JSON_PREFIX)
        .unwrap_or(&response.body);

    serde_json::from_str(content).map_err(|e| Error::Decode(format!("{}: {e}", response.url)))
}

/// Gerrit REST `/changes/` endpoint as a `ChangeSource`.
pub struct GerritSource {
    base_url: String,
    strict_http: bool,
    client: Box<dyn ReviewClient>,
}

impl GerritSource {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.review_url.clone(),
            strict_http: config.strict_http,
            client: Box::new(UreqClient::new(config.http_timeout)),
        }
    }

    pub fn with_client(base_url: &str, strict_http: bool, client: Box<dyn ReviewClient>) -> Self {
        Self {
            base_url: base_url.to_string(),
            strict_http,
            client,
        }
    }

    fn changes_url(&self) -> String {
        format!("{}/changes/", self.base_url.trim_end_matches('/'))
    }
}

impl ChangeSource for GerritSource {
    fn fetch_author_patches(
        &self,
        project: &str,
        author: &str,
        status: &str,
    ) -> Result<Vec<CherryPickDescriptor>> {
        let query = make_author_query(project, status, author);
        let params = [
            ("q", query.as_str()),
            // CURRENT_REVISION is a prerequisite for DOWNLOAD_COMMANDS.
            ("o", "CURRENT_REVISION"),
            ("o", "DOWNLOAD_COMMANDS"),
        ];

        let response = self.client.get(&self.changes_url(), &params)?;
        let decoded = decode_response(&response, self.strict_http)?;
        let changes = decoded.as_array().ok_or_else(|| {
            Error::Decode(format!("{}: expected a JSON array of changes", response.url))
        })?;

        let patches = changes
            .iter()
            .map(|change| CherryPickDescriptor::from_change_json(change, &self.base_url))
            .collect::<Result<Vec<_>>>()?;

        debug!(author, count = patches.len(), "fetched author patches");
        Ok(patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::change_json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Request = (String, Vec<(String, String)>);

    struct MockReviewClient {
        responses: RefCell<Vec<Result<HttpResponse>>>,
        requests: Rc<RefCell<Vec<Request>>>,
    }

    impl MockReviewClient {
        fn new(responses: Vec<Result<HttpResponse>>) -> Self {
            Self {
                responses: RefCell::new(responses),
                requests: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl ReviewClient for MockReviewClient {
        fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
            self.requests.borrow_mut().push((
                url.to_string(),
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                Err(Error::Network("no more mock responses".to_string()))
            } else {
                responses.remove(0)
            }
        }
    }

    fn ok(status: u16, body: String) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            url: "https://r.example.com/changes/".to_string(),
            body,
        })
    }

    fn gerrit_body(changes: &[Value]) -> String {
        format!(
            "{GERRIT_MAGIC_JSON_PREFIX}{}",
            serde_json::to_string(changes).unwrap()
        )
    }

    #[test]
    fn test_make_author_query() {
        assert_eq!(
            make_author_query("platform/art", "open", "Chris Larsen"),
            "project:platform/art AND status:open AND owner:\"Chris Larsen\""
        );
    }

    #[test]
    fn test_request_shape() {
        let client = MockReviewClient::new(vec![ok(200, gerrit_body(&[]))]);
        let requests = client.requests.clone();
        let source = GerritSource::with_client("https://r.example.com/", false, Box::new(client));
        source
            .fetch_author_patches("platform/art", "Duane Sand", "open")
            .unwrap();

        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        let (url, params) = &requests[0];
        assert_eq!(url, "https://r.example.com/changes/");
        let params: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            params,
            vec![
                (
                    "q",
                    "project:platform/art AND status:open AND owner:\"Duane Sand\""
                ),
                ("o", "CURRENT_REVISION"),
                ("o", "DOWNLOAD_COMMANDS"),
            ]
        );
    }

    #[test]
    fn test_fetch_parses_all_changes_in_order() {
        let body = gerrit_body(&[change_json(171665, "cp 171665"), change_json(171700, "cp 171700")]);
        let client = MockReviewClient::new(vec![ok(200, body)]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let patches = source
            .fetch_author_patches("platform/art", "a", "open")
            .unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].number(), 171665);
        assert_eq!(patches[0].review_url(), "https://r.example.com/#/c/171665/");
        assert_eq!(patches[1].apply_command(), "cp 171700");
    }

    #[test]
    fn test_fetch_without_magic_prefix() {
        let body = serde_json::to_string(&[change_json(5, "cp 5")]).unwrap();
        let client = MockReviewClient::new(vec![ok(200, body)]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let patches = source.fetch_author_patches("p", "a", "open").unwrap();
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn test_one_malformed_change_fails_whole_batch() {
        let mut broken = change_json(2, "cp 2");
        broken.as_object_mut().unwrap().remove("updated");
        let body = gerrit_body(&[change_json(1, "cp 1"), broken, change_json(3, "cp 3")]);
        let client = MockReviewClient::new(vec![ok(200, body)]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let err = source.fetch_author_patches("p", "a", "open").unwrap_err();
        assert!(matches!(err, Error::FieldMissing(ref f) if f == "updated"));
    }

    #[test]
    fn test_lenient_mode_decodes_error_status_body() {
        let body = gerrit_body(&[change_json(9, "cp 9")]);
        let client = MockReviewClient::new(vec![ok(500, body)]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let patches = source.fetch_author_patches("p", "a", "open").unwrap();
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn test_lenient_mode_non_json_error_body_is_decode_error() {
        let client = MockReviewClient::new(vec![ok(
            400,
            "Bad Request: invalid query".to_string(),
        )]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let err = source.fetch_author_patches("p", "a", "open").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_strict_mode_rejects_error_status() {
        let body = gerrit_body(&[change_json(9, "cp 9")]);
        let client = MockReviewClient::new(vec![ok(503, body)]);
        let source = GerritSource::with_client("https://r.example.com", true, Box::new(client));
        let err = source.fetch_author_patches("p", "a", "open").unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_non_array_body_is_decode_error() {
        let client = MockReviewClient::new(vec![ok(
            200,
            format!("{GERRIT_MAGIC_JSON_PREFIX}{{\"message\":\"nope\"}}"),
        )]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let err = source.fetch_author_patches("p", "a", "open").unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn test_transport_error_propagated() {
        let client = MockReviewClient::new(vec![Err(Error::Network(
            "connection refused".to_string(),
        ))]);
        let source = GerritSource::with_client("https://r.example.com", false, Box::new(client));
        let err = source.fetch_author_patches("p", "a", "open").unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_decode_response_strips_prefix_only_once() {
        let response = HttpResponse {
            status: 200,
            url: "u".to_string(),
            body: format!("{GERRIT_MAGIC_JSON_PREFIX}[]"),
        };
        assert_eq!(decode_response(&response, true).unwrap(), serde_json::json!([]));
    }
}
