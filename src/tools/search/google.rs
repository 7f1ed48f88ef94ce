use crate::core::error::SearchError;
use crate::core::types::{CandidateLink, SearchRequest};
use crate::scraping::engine::navigate_with_timeout;
use crate::scraping::session::Session;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Organic result containers, newest markup first.
const CONTAINER_SELECTORS: &[&str] = &["div#search div.MjjYud", "div#search div.g"];

/// `-site:` exclusions followed by the raw query.
pub fn search_query(request: &SearchRequest) -> String {
    request
        .exclude_domains
        .iter()
        .map(|d| format!("-site:{}", d))
        .chain(std::iter::once(request.query.clone()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Results-page URL. `num` hints the result count, `udm=14` asks for plain web results.
pub fn build_search_url(request: &SearchRequest) -> String {
    format!(
        "{}?q={}&num={}&udm=14",
        SEARCH_ENDPOINT,
        utf8_percent_encode(&search_query(request), NON_ALPHANUMERIC),
        request.result_limit
    )
}

fn normalize_google_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    if href.starts_with("/url?") {
        let url = Url::parse(&format!("https://www.google.com{}", href)).ok()?;
        return url
            .query_pairs()
            .find(|(k, v)| k == "q" && !v.is_empty())
            .map(|(_, v)| v.into_owned());
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    None
}

fn is_google_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| h == "google.com" || h.ends_with(".google.com"))
        .unwrap_or(false)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First anchor in `container` that wraps a heading and points off-site.
fn first_result_link(container: &ElementRef<'_>, link_sel: &Selector, h3_sel: &Selector) -> Option<(String, String)> {
    for a in container.select(link_sel) {
        let Some(heading) = a.select(h3_sel).next() else {
            continue;
        };
        let Some(url) = normalize_google_href(a.value().attr("href").unwrap_or("")) else {
            continue;
        };
        let title = collapse_whitespace(&heading.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        return Some((title, url));
    }
    None
}

/// Pull candidate links out of a results page, in document order.
pub fn parse_results(html: &str) -> Vec<CandidateLink> {
    let doc = Html::parse_document(html);
    let (Ok(link_sel), Ok(h3_sel)) = (Selector::parse("a[href]"), Selector::parse("h3")) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for css in CONTAINER_SELECTORS {
        let Ok(container_sel) = Selector::parse(css) else {
            continue;
        };

        let mut seen = HashSet::new();
        for container in doc.select(&container_sel) {
            let Some((title, url)) = first_result_link(&container, &link_sel, &h3_sel) else {
                continue;
            };
            if is_google_host(&url) || !seen.insert(url.clone()) {
                continue;
            }
            if let Some(link) = CandidateLink::new(title, url) {
                out.push(link);
            }
        }

        if !out.is_empty() {
            break;
        }
    }

    out
}

/// Load the results page for `request` in one scoped page and parse it.
///
/// A page that cannot be loaded fails the whole search; a page with no
/// organic results yields an empty list.
pub async fn harvest(
    session: &Session,
    request: &SearchRequest,
    timeout: Duration,
) -> Result<Vec<CandidateLink>, SearchError> {
    let url = build_search_url(request);
    debug!("harvesting {}", url);

    let html = session
        .with_page(|page| async move {
            navigate_with_timeout(page.as_ref(), &url, timeout).await?;
            page.content().await
        })
        .await
        .map_err(|e| SearchError::Harvest(e.to_string()))?;

    let links = parse_results(&html);
    info!("🔎 Harvested {} candidate links", links.len());
    Ok(links)
}
