//! Scripted in-memory browser for driving the pipeline without Chromium.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scout_search::scraping::engine::{BrowserEngine, BrowserPage};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SERP_PREFIX: &str = "https://www.google.com/search";

/// What a URL does when navigated to.
#[derive(Clone, Debug)]
pub enum Route {
    Serve { title: String, html: String },
    Hang,
    Fail(String),
}

impl Route {
    pub fn serve(title: &str, html: impl Into<String>) -> Self {
        Route::Serve {
            title: title.to_string(),
            html: html.into(),
        }
    }
}

#[derive(Default)]
pub struct Stats {
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub double_closes: AtomicUsize,
    pub init_scripts: Mutex<Vec<String>>,
    pub evaluated: Mutex<Vec<String>>,
    pub navigations: Mutex<Vec<String>>,
    pub engine_closes: AtomicUsize,
}

impl Stats {
    pub fn opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeWeb {
    serp: Option<Route>,
    routes: HashMap<String, Route>,
    fail_page_close: bool,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behavior of every search results page.
    pub fn serp(mut self, route: Route) -> Self {
        self.serp = Some(route);
        self
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn failing_page_close(mut self) -> Self {
        self.fail_page_close = true;
        self
    }

    fn lookup(&self, url: &str) -> Route {
        if url.starts_with(SERP_PREFIX) {
            if let Some(route) = &self.serp {
                return route.clone();
            }
        }
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| Route::Fail(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))
    }
}

pub struct FakeEngine {
    web: Arc<FakeWeb>,
    pub stats: Arc<Stats>,
}

impl FakeEngine {
    pub fn new(web: FakeWeb) -> (Arc<Self>, Arc<Stats>) {
        let stats = Arc::new(Stats::default());
        let engine = Arc::new(Self {
            web: Arc::new(web),
            stats: Arc::clone(&stats),
        });
        (engine, stats)
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn new_page(&self) -> Result<Arc<dyn BrowserPage>> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakePage {
            web: Arc::clone(&self.web),
            stats: Arc::clone(&self.stats),
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.stats.engine_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    web: Arc<FakeWeb>,
    stats: Arc<Stats>,
    current: Mutex<Option<(String, String)>>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn add_init_script(&self, source: &str) -> Result<()> {
        self.stats.init_scripts.lock().unwrap().push(source.to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.stats.navigations.lock().unwrap().push(url.to_string());
        match self.web.lookup(url) {
            Route::Serve { title, html } => {
                *self.current.lock().unwrap() = Some((title, html));
                Ok(())
            }
            Route::Hang => std::future::pending::<Result<()>>().await,
            Route::Fail(reason) => Err(anyhow!(reason)),
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.stats.evaluated.lock().unwrap().push(expression.to_string());
        Ok(Value::from(0u64))
    }

    async fn content(&self) -> Result<String> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, html)| html.clone())
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string()))
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.current.lock().unwrap().as_ref().map(|(t, _)| t.clone()))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            self.stats.double_closes.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.web.fail_page_close {
            return Err(anyhow!("target already detached"));
        }
        Ok(())
    }
}

/// Results page listing `links` as (title, url) in order.
pub fn serp_html(links: &[(&str, &str)]) -> String {
    let items: String = links
        .iter()
        .map(|(title, url)| {
            format!(
                r#"<div class="MjjYud"><div><a href="{url}"><br><h3>{title}</h3></a><cite>{url}</cite></div></div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div id="rso"><div id="search">{items}</div></div></body></html>"#)
}

/// A page the reader can find a substantial article in.
pub fn article_html(title: &str, topic: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>{title}</title><script>window.track = 1;</script></head>
<body>
  <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
  <article>
    <h1>{title}</h1>
    <p>{topic} moved sharply on Tuesday, extending gains from the previous session, as investors weighed fresh inflation data, central bank commentary, and steady inflows into listed funds.</p>
    <p>Analysts said the move in {topic} was driven by short covering, renewed retail interest, and a broader rally in risk assets, although volumes remained below the monthly average across most venues.</p>
    <p>Market participants will watch upcoming employment figures, comments from policymakers, and on-chain activity for signs of whether the rally can hold through the end of the week.</p>
  </article>
  <footer>Copyright, all rights reserved.</footer>
</body></html>"#
    )
}

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
