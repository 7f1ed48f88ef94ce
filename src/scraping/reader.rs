//! Noise removal inside the page and reader-mode extraction on the host.
//!
//! The page only ever receives a serialized selector list and returns a count;
//! the cleaned DOM comes back as HTML and `readability` runs here.

use super::engine::BrowserPage;
use anyhow::Result;
use readability::extractor;
use tracing::debug;
use url::Url;

/// Elements removed before extraction: non-text media, embeds, and
/// reference/navigation boilerplate.
pub const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "link",
    "svg",
    "canvas",
    "img",
    "picture",
    "video",
    "audio",
    "source",
    "track",
    "iframe",
    "embed",
    "object",
    ".reflist",
    ".references",
    ".mw-references-wrap",
    ".mw-editsection",
    "#toc",
    ".navbox",
];

/// Script removing every element matching `selectors`; evaluates to the
/// number of elements removed.
pub fn noise_removal_script(selectors: &[&str]) -> String {
    // A JSON array of strings is a valid JS array literal.
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
    const selectors = {list};
    let removed = 0;
    for (const selector of selectors) {{
        let nodes;
        try {{ nodes = document.querySelectorAll(selector); }} catch (e) {{ continue; }}
        for (const node of nodes) {{
            if (node.isConnected) {{
                node.remove();
                removed += 1;
            }}
        }}
    }}
    return removed;
}})()"#
    )
}

/// Strip [`NOISE_SELECTORS`] from the live document.
pub async fn strip_noise(page: &dyn BrowserPage) -> Result<u64> {
    let removed = page
        .evaluate(&noise_removal_script(NOISE_SELECTORS))
        .await?
        .as_u64()
        .unwrap_or(0);
    debug!("removed {} noise elements", removed);
    Ok(removed)
}

/// Main content of a document as found by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Cleaned HTML fragment.
    pub content: String,
}

/// Run reader-mode extraction on `html`. `None` when nothing readable is found.
pub fn extract_article(html: &str, url: &Url) -> Option<Article> {
    match extractor::extract(&mut html.as_bytes(), url) {
        Ok(product) if !product.text.trim().is_empty() => Some(Article {
            title: product.title.trim().to_string(),
            content: product.content,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!("reader extraction failed for {}: {}", url, e);
            None
        }
    }
}

/// Keep the first `max_chars` characters of `html`, dropping a trailing tag
/// that the cut left unterminated.
pub fn truncate_html(html: &str, max_chars: usize) -> String {
    let cut = match html.char_indices().nth(max_chars) {
        Some((idx, _)) => &html[..idx],
        None => return html.to_string(),
    };
    match open_tag_start(cut) {
        Some(start) => cut[..start].to_string(),
        None => cut.to_string(),
    }
}

/// Byte offset of the tag still open at the end of `html`, if any.
/// A `>` inside a quoted attribute value does not close the tag.
fn open_tag_start(html: &str) -> Option<usize> {
    let mut tag_start = None;
    let mut quote: Option<char> = None;
    let mut after_equals = false;
    for (idx, ch) in html.char_indices() {
        if tag_start.is_none() {
            if ch == '<' {
                tag_start = Some(idx);
                after_equals = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if after_equals => quote = Some(ch),
            '>' => tag_start = None,
            _ => {}
        }
        if !ch.is_whitespace() {
            after_equals = ch == '=';
        }
    }
    tag_start
}
