use crate::core::error::SearchError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default number of links harvested and extracted per search.
///
/// The tool schema advertises the same value so callers that omit
/// `resultLimit` get identical behavior on every surface.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

/// A single web search, as accepted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Search query text.
    pub query: String,
    /// Domains to exclude from the results (each becomes a `-site:` term).
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    /// Maximum number of result pages to visit and extract.
    #[serde(default = "default_result_limit")]
    #[schemars(range(min = 1))]
    pub result_limit: usize,
    /// Truncate each page's article HTML to this many characters before Markdown conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub content_truncate_length: Option<usize>,
    /// Show the browser window instead of running headless.
    #[serde(default, rename = "showUI")]
    pub show_ui: bool,
    /// Proxy server for all browser traffic, e.g. `http://127.0.0.1:8080` or `socks5://host:1080`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            exclude_domains: Vec::new(),
            result_limit: DEFAULT_RESULT_LIMIT,
            content_truncate_length: None,
            show_ui: false,
            proxy_address: None,
        }
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn with_excluded_domain(mut self, domain: impl Into<String>) -> Self {
        self.exclude_domains.push(domain.into());
        self
    }

    pub fn with_truncate_length(mut self, length: usize) -> Self {
        self.content_truncate_length = Some(length);
        self
    }

    /// Check and normalize the request.
    ///
    /// The query is trimmed, blank or duplicate exclusion domains are dropped
    /// (first occurrence wins) and a blank proxy is treated as absent.
    pub fn validate(self) -> Result<Self, SearchError> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        if self.result_limit == 0 {
            return Err(SearchError::InvalidRequest(
                "resultLimit must be a positive integer".to_string(),
            ));
        }
        if self.content_truncate_length == Some(0) {
            return Err(SearchError::InvalidRequest(
                "contentTruncateLength must be a positive integer".to_string(),
            ));
        }

        let mut exclude_domains: Vec<String> = Vec::with_capacity(self.exclude_domains.len());
        for domain in self.exclude_domains {
            let domain = domain.trim().to_string();
            if !domain.is_empty() && !exclude_domains.contains(&domain) {
                exclude_domains.push(domain);
            }
        }

        let proxy_address = self
            .proxy_address
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            query,
            exclude_domains,
            result_limit: self.result_limit,
            content_truncate_length: self.content_truncate_length,
            show_ui: self.show_ui,
            proxy_address,
        })
    }
}

/// A (title, url) pair harvested from a search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub title: String,
    pub url: String,
}

impl CandidateLink {
    /// Returns `None` unless `title` is non-empty and `url` is an absolute http(s) URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Option<Self> {
        let title = title.into();
        let url = url.into();
        if title.trim().is_empty() {
            return None;
        }
        let parsed = Url::parse(&url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        Some(Self { title, url })
    }
}

/// Markdown content extracted from one successfully visited link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ExtractionResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
