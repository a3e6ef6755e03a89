//! Paginated issue search against the quality server.
//!
//! `SearchTransport` is the seam: `HttpTransport` talks to a real server with
//! `reqwest`, tests plug in a scripted transport. `fetch_remote_issues` owns
//! the pagination policy:
//! - fixed page size of 500, page index starting at 1;
//! - stop on an empty page, once `paging.total` is covered, or when the
//!   server answers with a non-success status (keeping what was gathered);
//! - transport and decode failures abort the whole fetch.

use crate::config::ServerConfig;
use crate::error::RemoteFetchError;
use crate::models::remote::{RemoteIssue, SearchResponse};
use crate::models::SelectedSeverities;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{header, Client};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const PAGE_SIZE: u32 = 500;
const SEARCH_PATH: &str = "api/issues/search";
const OPEN_STATUSES: &str = "OPEN,REOPENED";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One page request of the issue search.
pub struct SearchQuery {
    pub project_key: String,
    pub severities: String,
    /// `projectKey:relative/path` when narrowed to one file.
    pub file_component: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    /// Query-string pairs in wire order. `componentKeys` repeats when a file
    /// filter is present.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("componentKeys", self.project_key.clone()),
            ("severities", self.severities.clone()),
            ("statuses", OPEN_STATUSES.to_string()),
            ("p", self.page.to_string()),
            ("ps", self.page_size.to_string()),
        ];
        if let Some(component) = &self.file_component {
            params.push(("componentKeys", component.clone()));
        }
        params
    }
}

#[derive(Debug)]
/// Result of a single page request that reached the server.
pub enum PageOutcome {
    Page(SearchResponse),
    /// Non-success HTTP status; pagination stops here.
    Rejected { status: u16 },
}

#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(
        &self,
        config: &ServerConfig,
        query: &SearchQuery,
    ) -> Result<PageOutcome, RemoteFetchError>;
}

/// `Authorization` value: basic auth with the token as user, empty password.
pub fn basic_auth_header(token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{token}:")))
}

/// Server-side component key for a local file.
pub fn component_key(project_key: &str, workspace_root: &Path, file: &Path) -> String {
    let rel: PathBuf = pathdiff::diff_paths(file, workspace_root).unwrap_or_else(|| file.to_path_buf());
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{project_key}:{rel}")
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, RemoteFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteFetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn endpoint(server: &str) -> String {
        format!("{}/{}", server.trim_end_matches('/'), SEARCH_PATH)
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn search(
        &self,
        config: &ServerConfig,
        query: &SearchQuery,
    ) -> Result<PageOutcome, RemoteFetchError> {
        let auth = header::HeaderValue::from_str(&basic_auth_header(&config.token))
            .map_err(|e| RemoteFetchError::InvalidHeader(e.to_string()))?;
        let response = self
            .client
            .get(Self::endpoint(&config.server))
            .header(header::AUTHORIZATION, auth)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| RemoteFetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(PageOutcome::Rejected {
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| RemoteFetchError::Request(format!("response read failed: {e}")))?;
        serde_json::from_str(&body)
            .map(PageOutcome::Page)
            .map_err(|e| RemoteFetchError::Decode(e.to_string()))
    }
}

/// Fetch every open issue matching `severities`, optionally narrowed to one
/// file. See the module docs for the stop conditions.
pub async fn fetch_remote_issues(
    transport: &dyn SearchTransport,
    config: &ServerConfig,
    workspace_root: &Path,
    severities: &SelectedSeverities,
    file_filter: Option<&Path>,
) -> Result<Vec<RemoteIssue>, RemoteFetchError> {
    let file_component =
        file_filter.map(|f| component_key(&config.project_key, workspace_root, f));
    let mut collected: Vec<RemoteIssue> = Vec::new();
    let mut page = 1u32;
    loop {
        let query = SearchQuery {
            project_key: config.project_key.clone(),
            severities: severities.to_csv(),
            file_component: file_component.clone(),
            page,
            page_size: PAGE_SIZE,
        };
        let response = match transport.search(config, &query).await? {
            PageOutcome::Page(resp) => resp,
            PageOutcome::Rejected { status } => {
                warn!(
                    "issue search page {page} rejected with status {status}; keeping {} issues",
                    collected.len()
                );
                break;
            }
        };
        let received = response.issues.len();
        collected.extend(response.issues);
        let total = response.paging.map(|p| p.total);
        debug!(page, received, ?total, "fetched issue search page");
        if received == 0 {
            break;
        }
        match total {
            Some(total) if (collected.len() as u64) < total => page += 1,
            _ => break,
        }
    }
    Ok(collected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::remote::Paging;
    use crate::models::Severity;
    use std::sync::Mutex;

    /// Scripted transport: returns queued outcomes in order and records queries.
    pub(crate) struct ScriptedTransport {
        pub(crate) replies: Mutex<Vec<Result<PageOutcome, RemoteFetchError>>>,
        pub(crate) queries: Mutex<Vec<SearchQuery>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Result<PageOutcome, RemoteFetchError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn pages_requested(&self) -> Vec<u32> {
            self.queries.lock().unwrap().iter().map(|q| q.page).collect()
        }
    }

    #[async_trait]
    impl SearchTransport for ScriptedTransport {
        async fn search(
            &self,
            _config: &ServerConfig,
            query: &SearchQuery,
        ) -> Result<PageOutcome, RemoteFetchError> {
            self.queries.lock().unwrap().push(query.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(PageOutcome::Page(SearchResponse::default())))
        }
    }

    pub(crate) fn remote_issue(component: &str) -> RemoteIssue {
        RemoteIssue {
            message: Some("Refactor this function".into()),
            rule: Some("typescript:S3776".into()),
            severity: Some(Severity::Blocker),
            component: Some(component.to_string()),
            text_range: None,
        }
    }

    pub(crate) fn page_of(count: usize, total: u64, component: &str) -> PageOutcome {
        PageOutcome::Page(SearchResponse {
            issues: (0..count).map(|_| remote_issue(component)).collect(),
            paging: Some(Paging { total }),
        })
    }

    pub(crate) fn server() -> ServerConfig {
        ServerConfig {
            server: "https://sonar.example.com".into(),
            token: "squ_token".into(),
            project_key: "acme".into(),
        }
    }

    #[tokio::test]
    async fn test_pagination_covers_total_in_three_pages() {
        let transport = ScriptedTransport::new(vec![
            Ok(page_of(500, 1200, "acme:a.ts")),
            Ok(page_of(500, 1200, "acme:a.ts")),
            Ok(page_of(200, 1200, "acme:a.ts")),
            Ok(page_of(1, 1200, "acme:a.ts")),
        ]);
        let issues = fetch_remote_issues(
            &transport,
            &server(),
            Path::new("/w"),
            &SelectedSeverities::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(issues.len(), 1200);
        assert_eq!(transport.pages_requested(), vec![1, 2, 3]);
        let q = &transport.queries.lock().unwrap()[0];
        assert_eq!(q.page_size, 500);
        assert_eq!(q.severities, "BLOCKER");
        assert!(q.file_component.is_none());
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let transport = ScriptedTransport::new(vec![
            Ok(page_of(500, 5000, "acme:a.ts")),
            Ok(page_of(0, 5000, "acme:a.ts")),
        ]);
        let issues = fetch_remote_issues(
            &transport,
            &server(),
            Path::new("/w"),
            &SelectedSeverities::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(issues.len(), 500);
        assert_eq!(transport.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_rejected_page_keeps_partial_results() {
        let transport = ScriptedTransport::new(vec![
            Ok(page_of(500, 1200, "acme:a.ts")),
            Ok(PageOutcome::Rejected { status: 503 }),
        ]);
        let issues = fetch_remote_issues(
            &transport,
            &server(),
            Path::new("/w"),
            &SelectedSeverities::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(issues.len(), 500);
        assert_eq!(transport.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_transport_error_fails_fetch() {
        let transport = ScriptedTransport::new(vec![
            Ok(page_of(500, 1200, "acme:a.ts")),
            Err(RemoteFetchError::Request("connection reset".into())),
        ]);
        let res = fetch_remote_issues(
            &transport,
            &server(),
            Path::new("/w"),
            &SelectedSeverities::default(),
            None,
        )
        .await;
        assert!(matches!(res, Err(RemoteFetchError::Request(_))));
    }

    #[tokio::test]
    async fn test_file_filter_adds_component_key() {
        let transport = ScriptedTransport::new(vec![Ok(page_of(1, 1, "acme:src/a.ts"))]);
        let sel = SelectedSeverities::new([Severity::Critical, Severity::Major]);
        fetch_remote_issues(
            &transport,
            &server(),
            Path::new("/w"),
            &sel,
            Some(Path::new("/w/src/a.ts")),
        )
        .await
        .unwrap();
        let q = transport.queries.lock().unwrap()[0].clone();
        assert_eq!(q.file_component.as_deref(), Some("acme:src/a.ts"));
        let params = q.params();
        let keys: Vec<&String> = params
            .iter()
            .filter(|(k, _)| *k == "componentKeys")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(keys, vec!["acme", "acme:src/a.ts"]);
        assert!(params.contains(&("severities", "CRITICAL,MAJOR".to_string())));
        assert!(params.contains(&("statuses", "OPEN,REOPENED".to_string())));
    }

    #[test]
    fn test_basic_auth_header_has_empty_password() {
        // base64("squ_token:")
        assert_eq!(basic_auth_header("squ_token"), "Basic c3F1X3Rva2VuOg==");
    }
}
