use crate::core::types::{CandidateLink, ExtractionResult};
use crate::scraping::engine::{navigate_with_timeout, BrowserPage};
use crate::scraping::markdown::{html_to_markdown, strip_html};
use crate::scraping::reader::{extract_article, strip_noise, truncate_html};
use crate::scraping::session::Session;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Per-link extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub navigation_timeout: Duration,
    /// Character budget for the article HTML before conversion.
    pub truncate: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            truncate: None,
        }
    }
}

/// Visit `link` in its own page and return its content as Markdown.
///
/// Any failure (navigation, timeout, script or extraction error) skips the
/// link: it is logged and `None` is returned.
pub async fn extract_link(
    session: &Session,
    link: &CandidateLink,
    options: ExtractOptions,
) -> Option<ExtractionResult> {
    let start = Instant::now();
    let outcome = session
        .with_page(|page| async move { extract_from_page(page.as_ref(), link, options).await })
        .await;

    match outcome {
        Ok(result) => {
            info!(
                "✓ Extracted {} ({} chars) in {}ms",
                link.url,
                result.content.len(),
                start.elapsed().as_millis()
            );
            Some(result)
        }
        Err(e) => {
            warn!("Skipping {}: {:#}", link.url, e);
            None
        }
    }
}

/// The extraction steps for one page: navigate, de-noise, read, convert.
pub async fn extract_from_page(
    page: &dyn BrowserPage,
    link: &CandidateLink,
    options: ExtractOptions,
) -> Result<ExtractionResult> {
    let url = Url::parse(&link.url).with_context(|| format!("invalid URL {}", link.url))?;

    navigate_with_timeout(page, &link.url, options.navigation_timeout).await?;
    strip_noise(page).await.context("noise removal failed")?;

    let html = page.content().await?;
    let document_title = page.title().await.ok().flatten();

    let (article_title, article_html) = match extract_article(&html, &url) {
        Some(article) => (Some(article.title), article.content),
        None => {
            debug!("no readable article at {}", link.url);
            (None, String::new())
        }
    };

    let title = pick_title(
        article_title.as_deref(),
        document_title.as_deref(),
        &link.title,
    );

    let article_html = match options.truncate {
        Some(limit) => truncate_html(&article_html, limit),
        None => article_html,
    };
    let content = strip_html(&html_to_markdown(&article_html));

    Ok(ExtractionResult {
        title,
        url: link.url.clone(),
        content,
    })
}

/// Reader title, then document title, then the harvested link title.
fn pick_title(article: Option<&str>, document: Option<&str>, harvested: &str) -> String {
    [article, document]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(harvested)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_in_order() {
        assert_eq!(pick_title(Some("Reader"), Some("Doc"), "Link"), "Reader");
        assert_eq!(pick_title(Some("  "), Some("Doc"), "Link"), "Doc");
        assert_eq!(pick_title(None, None, "Link"), "Link");
    }
}
