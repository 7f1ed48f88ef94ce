use crate::scraping::browser_manager::BrowserName;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse-grained failures that abort a whole search.
///
/// Per-link problems never surface here: the extraction pipeline logs them and
/// drops the link instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("unsupported host operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("no compatible browser found (checked {checked} locations). Install Chrome, Edge, Chromium or Brave, or set CHROME_EXECUTABLE")]
    BrowserNotFound { checked: usize },

    #[error("browser executable not found at {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("{0} is not installed in any known location")]
    BrowserNameNotFound(BrowserName),

    #[error("no {browser} profile named '{name}'")]
    ProfileNotFound { browser: BrowserName, name: String },

    #[error("failed to prepare profile directory {}: {source}", path.display())]
    Profile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("search results could not be harvested: {0}")]
    Harvest(String),
}

impl SearchError {
    pub fn profile(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SearchError::Profile {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = SearchError::BrowserNameNotFound(BrowserName::Edge);
        assert_eq!(err.to_string(), "edge is not installed in any known location");

        let err = SearchError::ProfileNotFound {
            browser: BrowserName::Chrome,
            name: "Work".to_string(),
        };
        assert_eq!(err.to_string(), "no chrome profile named 'Work'");

        let err = SearchError::BrowserNotFound { checked: 4 };
        assert!(err.to_string().contains("checked 4 locations"));
    }
}
