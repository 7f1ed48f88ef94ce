//! One browser context per search, with scoped page acquisition.

use super::browser_manager::{build_launch_config, resolve_executable, BrowserName, ChromiumEngine, HostOs};
use super::engine::{BrowserEngine, BrowserPage};
use super::profile::{self, PreparedProfile};
use super::stealth;
use crate::core::error::SearchError;
use anyhow::{bail, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything needed to launch a session's browser.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Explicit executable; skips the install-path table.
    pub executable: Option<PathBuf>,
    /// Restrict discovery to one browser. Required for `profile_name`.
    pub browser: Option<BrowserName>,
    /// Persistent user data dir. `None` = disposable temp profile.
    pub profile_dir: Option<PathBuf>,
    /// Named profile of `browser`.
    pub profile_name: Option<String>,
    pub show_ui: bool,
    pub proxy: Option<String>,
}

pub struct Session {
    engine: Arc<dyn BrowserEngine>,
    open_pages: Arc<AtomicUsize>,
    closed: AtomicBool,
    profile: Option<PreparedProfile>,
}

impl Session {
    /// Resolve a browser, prepare its profile and launch it.
    pub async fn open(options: &SessionOptions) -> Result<Self, SearchError> {
        let os = HostOs::current()?;
        let (browser, exe) = resolve_executable(os, options)?;
        let prepared = profile::prepare(os, browser, options)?;

        let config = build_launch_config(
            &exe,
            &prepared,
            options.show_ui,
            options.proxy.as_deref(),
        )
        .map_err(|e| SearchError::Launch(e.to_string()))?;

        info!(
            "🚀 Launching {} ({}) with profile {}{}",
            browser.map(|b| b.to_string()).unwrap_or_else(|| "browser".to_string()),
            exe.display(),
            prepared.user_data_dir.display(),
            if options.show_ui { ", headed" } else { "" }
        );

        let engine = ChromiumEngine::launch(config)
            .await
            .map_err(|e| SearchError::Launch(e.to_string()))?;

        let mut session = Self::with_engine(Arc::new(engine));
        session.profile = Some(prepared);
        Ok(session)
    }

    /// Wrap an already-running engine.
    pub fn with_engine(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            open_pages: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
            profile: None,
        }
    }

    pub fn profile(&self) -> Option<&PreparedProfile> {
        self.profile.as_ref()
    }

    pub fn pages_open(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run `op` against a fresh page with evasions applied.
    ///
    /// The page is closed exactly once whatever `op` returns. If this future is
    /// dropped mid-flight the close is scheduled on the runtime instead. A
    /// failed close is logged and never replaces `op`'s outcome.
    pub async fn with_page<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn BrowserPage>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.is_closed() {
            bail!("browser session is closed");
        }

        let page = self.engine.new_page().await?;
        let mut guard = PageGuard::new(page.clone(), self.open_pages.clone());

        let outcome = match stealth::apply_evasions(page.as_ref()).await {
            Ok(()) => op(page).await,
            Err(e) => Err(e),
        };

        guard.release().await;
        outcome
    }

    /// Shut the browser down. Safe to call more than once; errors are logged.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.engine.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
}

/// Owns one open page until it is released or dropped.
struct PageGuard {
    page: Option<Arc<dyn BrowserPage>>,
    open_pages: Arc<AtomicUsize>,
}

impl PageGuard {
    fn new(page: Arc<dyn BrowserPage>, open_pages: Arc<AtomicUsize>) -> Self {
        open_pages.fetch_add(1, Ordering::SeqCst);
        Self {
            page: Some(page),
            open_pages,
        }
    }

    async fn release(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
        match page.close().await {
            Ok(()) => debug!("page closed"),
            Err(e) => warn!("Failed to close page: {}", e),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        self.open_pages.fetch_sub(1, Ordering::SeqCst);

        // Drop cannot await; hand the close to the runtime if there is one.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!("Failed to close abandoned page: {}", e);
                }
            });
        }
    }
}
