//! Browser engine seam.
//!
//! The pipeline only talks to a browser through these two traits. The
//! production implementation drives Chromium over CDP (see
//! `browser_manager::ChromiumEngine`); tests plug in scripted fakes.
//!
//! Everything that crosses the page boundary is serialized: scripts go in as
//! source strings, results come back as JSON values or HTML text.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One browser tab.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Register a script that runs in every new document before page scripts.
    async fn add_init_script(&self, source: &str) -> Result<()>;

    /// Navigate and resolve once the DOM content has been parsed.
    ///
    /// Sub-resources (images, ads, trackers) are not awaited. Implementations
    /// do not bound the wait themselves; see [`navigate_with_timeout`].
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a JavaScript expression in the page and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// `document.title`, if any.
    async fn title(&self) -> Result<Option<String>>;

    async fn close(&self) -> Result<()>;
}

/// A running browser context that hands out pages.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn BrowserPage>>;

    /// Tear the whole context down. Must tolerate repeated calls.
    async fn close(&self) -> Result<()>;
}

/// Navigate `page` to `url`, failing if the DOM is not ready within `timeout`.
pub async fn navigate_with_timeout(
    page: &dyn BrowserPage,
    url: &str,
    timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout, page.navigate(url)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow!(
            "navigation to {} timed out after {}ms",
            url,
            timeout.as_millis()
        )),
    }
}
