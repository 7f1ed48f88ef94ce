use crate::core::types::SearchRequest;
use crate::scraping::browser_manager::BrowserName;
use crate::scraping::session::SessionOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_CONFIG_PATH: &str = "SCOUT_SEARCH_CONFIG";
pub const ENV_BROWSER: &str = "SCOUT_SEARCH_BROWSER";
pub const ENV_PROFILE_DIR: &str = "SCOUT_SEARCH_PROFILE_DIR";
pub const ENV_PROFILE_NAME: &str = "SCOUT_SEARCH_PROFILE_NAME";
pub const ENV_NAV_TIMEOUT_SECS: &str = "SCOUT_SEARCH_NAV_TIMEOUT_SECS";
pub const ENV_HARVEST_TIMEOUT_SECS: &str = "SCOUT_SEARCH_HARVEST_TIMEOUT_SECS";

const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// SearchConfig: file-based config loader (scout-search.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Top-level config loaded from `scout-search.json`.
///
/// Every field is optional; unset fields fall back to the matching
/// environment variable and then to a built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SearchConfig {
    /// Browser to use: `chrome`, `edge`, `chromium` or `brave`. Unset = first one found.
    pub browser: Option<String>,
    /// Explicit browser executable; skips install-path probing.
    pub executable: Option<String>,
    /// Persistent profile directory. Unset = disposable temp profile per search.
    pub profile_dir: Option<String>,
    /// Named profile of the selected browser (as listed in its `Local State`).
    pub profile_name: Option<String>,
    /// Per-link navigation timeout in seconds. Default: 30.
    pub navigation_timeout_secs: Option<u64>,
    /// Search-results page navigation timeout in seconds. Default: 30.
    pub harvest_timeout_secs: Option<u64>,
}

/// Time budgets for the two kinds of navigation a search performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTimeouts {
    pub harvest: Duration,
    pub navigation: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            harvest: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            navigation: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn field_or_env(field: &Option<String>, key: &str) -> Option<String> {
    field
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| env_non_empty(key))
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

impl SearchConfig {
    /// Executable: JSON field → `CHROME_EXECUTABLE` env var → `None` (search install paths).
    pub fn resolve_executable(&self) -> Option<PathBuf> {
        field_or_env(&self.executable, ENV_CHROME_EXECUTABLE).map(|p| expand_tilde(&p))
    }

    /// Browser name: JSON field → `SCOUT_SEARCH_BROWSER` env var → `None`.
    ///
    /// Unknown names are logged and ignored.
    pub fn resolve_browser(&self) -> Option<BrowserName> {
        let raw = field_or_env(&self.browser, ENV_BROWSER)?;
        match raw.parse::<BrowserName>() {
            Ok(name) => Some(name),
            Err(e) => {
                warn!("ignoring browser setting '{}': {}", raw, e);
                None
            }
        }
    }

    /// Profile directory: JSON field → `SCOUT_SEARCH_PROFILE_DIR` env var → `None`.
    pub fn resolve_profile_dir(&self) -> Option<PathBuf> {
        field_or_env(&self.profile_dir, ENV_PROFILE_DIR).map(|p| expand_tilde(&p))
    }

    /// Profile name: JSON field → `SCOUT_SEARCH_PROFILE_NAME` env var → `None`.
    pub fn resolve_profile_name(&self) -> Option<String> {
        field_or_env(&self.profile_name, ENV_PROFILE_NAME)
    }

    fn resolve_secs(field: Option<u64>, key: &str) -> Duration {
        let secs = field
            .or_else(|| env_non_empty(key).and_then(|v| v.parse::<u64>().ok()))
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn pipeline_timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            harvest: Self::resolve_secs(self.harvest_timeout_secs, ENV_HARVEST_TIMEOUT_SECS),
            navigation: Self::resolve_secs(self.navigation_timeout_secs, ENV_NAV_TIMEOUT_SECS),
        }
    }

    /// Merge process-level settings with the per-request browser options.
    pub fn session_options(&self, request: &SearchRequest) -> SessionOptions {
        SessionOptions {
            executable: self.resolve_executable(),
            browser: self.resolve_browser(),
            profile_dir: self.resolve_profile_dir(),
            profile_name: self.resolve_profile_name(),
            show_ui: request.show_ui,
            proxy: request.proxy_address.clone(),
        }
    }
}

/// Load `scout-search.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `SCOUT_SEARCH_CONFIG` env var path
/// 2. `./scout-search.json`
/// 3. `../scout-search.json`
///
/// Missing file → `SearchConfig::default()` (all env-var fallbacks apply).
/// Parse error → log a warning, return `SearchConfig::default()`.
pub fn load_search_config() -> SearchConfig {
    let mut candidates = vec![
        PathBuf::from("scout-search.json"),
        PathBuf::from("../scout-search.json"),
    ];
    if let Some(env_path) = env_non_empty(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match serde_json::from_str::<SearchConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("scout-search.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "scout-search.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                SearchConfig::default()
            }
        };
    }

    SearchConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_take_precedence() {
        let cfg: SearchConfig = serde_json::from_str(
            r#"{"browser":"brave","profile_dir":"/tmp/scout-profile",
                "navigation_timeout_secs":5,"harvest_timeout_secs":12}"#,
        )
        .unwrap();
        assert_eq!(cfg.resolve_browser(), Some(BrowserName::Brave));
        assert_eq!(
            cfg.resolve_profile_dir(),
            Some(PathBuf::from("/tmp/scout-profile"))
        );
        let timeouts = cfg.pipeline_timeouts();
        assert_eq!(timeouts.navigation, Duration::from_secs(5));
        assert_eq!(timeouts.harvest, Duration::from_secs(12));
    }

    #[test]
    fn zero_timeouts_fall_back_to_default() {
        let cfg = SearchConfig {
            navigation_timeout_secs: Some(0),
            harvest_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.pipeline_timeouts(), PipelineTimeouts::default());
    }

    #[test]
    fn session_options_carry_request_browser_settings() {
        let cfg = SearchConfig {
            browser: Some("chromium".to_string()),
            ..Default::default()
        };
        let mut request = SearchRequest::new("q");
        request.show_ui = true;
        request.proxy_address = Some("socks5://127.0.0.1:1080".to_string());

        let options = cfg.session_options(&request);
        assert!(options.show_ui);
        assert_eq!(options.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(options.browser, Some(BrowserName::Chromium));
    }
}
