//! Native browser management using `chromiumoxide`.
//!
//! This module is the single source of truth for:
//! * Finding a usable browser executable from a declarative OS × browser
//!   table of install locations (no PATH or registry probing).
//! * Building the launch configuration (profile dir, headless/headed,
//!   proxy, process-level stealth flags).
//! * `ChromiumEngine` / `ChromiumPage`, the CDP implementation of the
//!   `engine::BrowserEngine` / `engine::BrowserPage` seam.
//!
//! Stealth model:
//! - This module provides *process-level* defaults (user-agent rotation, browser flags).
//! - JS-level evasion is injected per page by the session (see `stealth.rs`).

use super::engine::{BrowserEngine, BrowserPage};
use super::profile::PreparedProfile;
use super::session::SessionOptions;
use crate::core::error::SearchError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventDomContentEventFired, NavigateParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// ── Realistic User-Agent pool ────────────────────────────────────────────────

// Chromium-family only: the UA must agree with the engine actually rendering.
const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Edge 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Host / browser identification ────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
}

impl HostOs {
    pub fn from_os_str(os: &str) -> Result<Self, SearchError> {
        match os {
            "linux" => Ok(HostOs::Linux),
            "macos" => Ok(HostOs::MacOs),
            "windows" => Ok(HostOs::Windows),
            other => Err(SearchError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn current() -> Result<Self, SearchError> {
        Self::from_os_str(std::env::consts::OS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BrowserName {
    Chrome,
    Edge,
    Chromium,
    Brave,
}

impl BrowserName {
    pub const ALL: [BrowserName; 4] = [
        BrowserName::Chrome,
        BrowserName::Edge,
        BrowserName::Chromium,
        BrowserName::Brave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserName::Chrome => "chrome",
            BrowserName::Edge => "edge",
            BrowserName::Chromium => "chromium",
            BrowserName::Brave => "brave",
        }
    }
}

impl fmt::Display for BrowserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "google-chrome" => Ok(BrowserName::Chrome),
            "edge" | "msedge" => Ok(BrowserName::Edge),
            "chromium" => Ok(BrowserName::Chromium),
            "brave" => Ok(BrowserName::Brave),
            other => Err(format!(
                "unknown browser '{}' (expected chrome, edge, chromium or brave)",
                other
            )),
        }
    }
}

// ── Browser executable discovery ─────────────────────────────────────────────

/// Install locations per OS and browser, in lookup order.
///
/// `~` expands to the home directory and `%VAR%` to an environment variable;
/// a template whose variable is unset is skipped.
const BROWSER_PATHS: &[(HostOs, BrowserName, &[&str])] = &[
    (
        HostOs::MacOs,
        BrowserName::Chrome,
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ],
    ),
    (
        HostOs::MacOs,
        BrowserName::Edge,
        &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
    ),
    (
        HostOs::MacOs,
        BrowserName::Chromium,
        &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
    ),
    (
        HostOs::MacOs,
        BrowserName::Brave,
        &["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"],
    ),
    (
        HostOs::Linux,
        BrowserName::Chrome,
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/opt/google/chrome/chrome",
        ],
    ),
    (
        HostOs::Linux,
        BrowserName::Edge,
        &[
            "/usr/bin/microsoft-edge",
            "/usr/bin/microsoft-edge-stable",
            "/opt/microsoft/msedge/msedge",
        ],
    ),
    (
        HostOs::Linux,
        BrowserName::Chromium,
        &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
            "/snap/bin/chromium",
        ],
    ),
    (
        HostOs::Linux,
        BrowserName::Brave,
        &[
            "/usr/bin/brave-browser",
            "/usr/bin/brave",
            "/opt/brave.com/brave/brave",
        ],
    ),
    (
        HostOs::Windows,
        BrowserName::Chrome,
        &[
            r"%PROGRAMFILES%\Google\Chrome\Application\chrome.exe",
            r"%PROGRAMFILES(X86)%\Google\Chrome\Application\chrome.exe",
            r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
        ],
    ),
    (
        HostOs::Windows,
        BrowserName::Edge,
        &[
            r"%PROGRAMFILES(X86)%\Microsoft\Edge\Application\msedge.exe",
            r"%PROGRAMFILES%\Microsoft\Edge\Application\msedge.exe",
        ],
    ),
    (
        HostOs::Windows,
        BrowserName::Chromium,
        &[r"%LOCALAPPDATA%\Chromium\Application\chrome.exe"],
    ),
    (
        HostOs::Windows,
        BrowserName::Brave,
        &[
            r"%PROGRAMFILES%\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"%LOCALAPPDATA%\BraveSoftware\Brave-Browser\Application\brave.exe",
        ],
    ),
];

/// Expand a path template from [`BROWSER_PATHS`] or the profile-root table.
///
/// Returns `None` when a referenced variable (or the home dir) is unavailable.
pub fn expand_path_template(
    template: &str,
    home: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    if let Some(rest) = template.strip_prefix("~/") {
        return home.map(|h| h.join(rest));
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('%')?;
        let value = env(&after[..end]).filter(|v| !v.trim().is_empty())?;
        out.push_str(value.trim_end_matches(['\\', '/']));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(PathBuf::from(out))
}

fn host_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// All install candidates for `os`, optionally restricted to one browser.
pub fn browser_candidates(
    os: HostOs,
    requested: Option<BrowserName>,
    home: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Vec<(BrowserName, PathBuf)> {
    BROWSER_PATHS
        .iter()
        .filter(|(entry_os, name, _)| {
            *entry_os == os && requested.map(|r| r == *name).unwrap_or(true)
        })
        .flat_map(|(_, name, templates)| {
            templates
                .iter()
                .filter_map(|t| expand_path_template(t, home, &env))
                .map(move |p| (*name, p))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Pick the first existing candidate.
///
/// Errors with `BrowserNameNotFound` when a specific browser was requested and
/// `BrowserNotFound` otherwise.
pub fn find_browser_executable(
    candidates: &[(BrowserName, PathBuf)],
    requested: Option<BrowserName>,
    exists: impl Fn(&Path) -> bool,
) -> Result<(BrowserName, PathBuf), SearchError> {
    if let Some((name, path)) = candidates.iter().find(|(_, p)| exists(p)) {
        return Ok((*name, path.clone()));
    }
    Err(match requested {
        Some(name) => SearchError::BrowserNameNotFound(name),
        None => SearchError::BrowserNotFound {
            checked: candidates.len(),
        },
    })
}

/// Resolve the executable for a session.
///
/// An explicit path wins and must exist. Otherwise the install table for the
/// current OS is searched. The returned browser name is `None` only for an
/// explicit path with no browser named alongside it.
pub fn resolve_executable(
    os: HostOs,
    options: &SessionOptions,
) -> Result<(Option<BrowserName>, PathBuf), SearchError> {
    if let Some(path) = options.executable.as_ref() {
        if path.exists() {
            return Ok((options.browser, path.clone()));
        }
        return Err(SearchError::ExecutableNotFound(path.clone()));
    }

    let home = dirs::home_dir();
    let candidates = browser_candidates(os, options.browser, home.as_deref(), host_env);
    let (name, path) = find_browser_executable(&candidates, options.browser, |p| p.exists())?;
    Ok((Some(name), path))
}

// ── Launch config builder ────────────────────────────────────────────────────

/// Build a `BrowserConfig` with stealth defaults bound to `profile`.
///
/// Flags chosen for:
/// * Compatibility with CI / restricted environments (`--no-sandbox`, `--disable-dev-shm-usage`).
/// * Stealth: `--disable-blink-features=AutomationControlled` hides the
///   automation flag; UA is randomly drawn from `DESKTOP_USER_AGENTS`.
pub fn build_launch_config(
    exe: &Path,
    profile: &PreparedProfile,
    show_ui: bool,
    proxy_url: Option<&str>,
) -> Result<BrowserConfig> {
    let ua = random_user_agent();

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .user_data_dir(&profile.user_data_dir)
        .viewport(Viewport {
            width: 1920,
            height: 1080,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1920, 1080)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua));

    if show_ui {
        builder = builder.with_head();
    }
    if let Some(dir) = profile.profile_directory.as_deref() {
        builder = builder.arg(format!("--profile-directory={}", dir));
    }
    if let Some(proxy) = proxy_url {
        builder = builder.arg(format!("--proxy-server={}", proxy));
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── CDP engine ───────────────────────────────────────────────────────────────

/// A launched Chromium process plus the task pumping its CDP handler.
pub struct ChromiumEngine {
    inner: Mutex<Option<(Browser, JoinHandle<()>)>>,
}

impl ChromiumEngine {
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let pump = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        Ok(Self {
            inner: Mutex::new(Some((browser, pump))),
        })
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn new_page(&self) -> Result<Arc<dyn BrowserPage>> {
        let guard = self.inner.lock().await;
        let (browser, _) = guard
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already closed"))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open tab: {}", e))?;
        Ok(Arc::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<()> {
        let Some((mut browser, pump)) = self.inner.lock().await.take() else {
            return Ok(());
        };
        let outcome = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| anyhow!("Browser close error: {}", e));
        browser.wait().await.ok();
        pump.abort();
        info!("🛑 Browser session shut down");
        outcome
    }
}

impl Drop for ChromiumEngine {
    fn drop(&mut self) {
        // Drop cannot await; if we're inside a tokio runtime, spawn a task to
        // close the browser to avoid zombie Chromium processes.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        if let Ok(mut guard) = self.inner.try_lock() {
            if let Some((mut browser, pump)) = guard.take() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                    pump.abort();
                });
            }
        }
    }
}

pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn add_init_script(&self, source: &str) -> Result<()> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await
            .map_err(|e| anyhow!("Failed to inject init script: {}", e))?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        // Subscribe before issuing the command so the event cannot be missed.
        let mut dom_events = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| anyhow!("Failed to watch DOMContentLoaded: {}", e))?;

        // chromiumoxide resolves `Page.navigate` only after the `load` event.
        let navigation = async {
            self.page
                .execute(NavigateParams::new(url))
                .await
                .map(|response| response.result.error_text)
                .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))
        };
        let dom_ready = async move { dom_events.next().await.is_some() };

        until_dom_ready(url, navigation, dom_ready).await?;
        ensure_not_error_page(&self.page, url).await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.page
            .evaluate(expression.to_string())
            .await
            .map_err(|e| anyhow!("Script evaluation failed: {}", e))?
            .into_value::<Value>()
            .map_err(|e| anyhow!("Script result was not JSON: {}", e))
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }

    async fn title(&self) -> Result<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(|e| anyhow!("Failed to read page title: {}", e))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| anyhow!("Failed to close tab: {}", e))
    }
}

// ── DOM-ready wait ───────────────────────────────────────────────────────────

fn navigation_outcome(url: &str, outcome: Result<Option<String>>) -> Result<()> {
    match outcome?.as_deref() {
        Some(error_text) if !error_text.is_empty() => {
            Err(anyhow!("Navigation to {} failed: {}", url, error_text))
        }
        _ => Ok(()),
    }
}

/// Resolve as soon as either the navigation command settles or
/// DOMContentLoaded fires, whichever comes first.
///
/// `navigation` yields the command's `errorText`; a settled navigation wins a
/// tie so its error is never hidden. `dom_ready` yields `false` when the event
/// stream ended without an event, in which case the command is awaited.
pub(crate) async fn until_dom_ready<N, D>(url: &str, navigation: N, dom_ready: D) -> Result<()>
where
    N: Future<Output = Result<Option<String>>>,
    D: Future<Output = bool>,
{
    tokio::pin!(navigation);
    let fired = tokio::select! {
        biased;
        outcome = &mut navigation => return navigation_outcome(url, outcome),
        fired = dom_ready => fired,
    };
    if fired {
        debug!("DOM content ready at {}", url);
        return Ok(());
    }
    navigation_outcome(url, navigation.await)
}

const LOCATION_SCRIPT: &str = "location.href";

/// Chromium renders failed navigations as `chrome-error://` documents, which
/// fire DOMContentLoaded like any other page.
async fn ensure_not_error_page(page: &Page, url: &str) -> Result<()> {
    let href = page
        .evaluate(LOCATION_SCRIPT)
        .await
        .ok()
        .and_then(|v| v.into_value::<String>().ok())
        .unwrap_or_default();
    if href.starts_with("chrome-error://") {
        return Err(anyhow!("Navigation to {} failed: browser error page", url));
    }
    Ok(())
}
