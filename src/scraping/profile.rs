//! Browser profile directories: initialisation of fresh ones, disposable
//! temp profiles, and lookup of a browser's named profiles.

use super::browser_manager::{expand_path_template, BrowserName, HostOs};
use super::session::SessionOptions;
use crate::core::error::SearchError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_PROFILE_DIR: &str = "Default";
pub const PREFERENCES_FILE: &str = "Preferences";
pub const LOCAL_STATE_FILE: &str = "Local State";

/// Where each browser keeps its user data on each OS.
const USER_DATA_ROOTS: &[(HostOs, BrowserName, &str)] = &[
    (HostOs::Linux, BrowserName::Chrome, "~/.config/google-chrome"),
    (HostOs::Linux, BrowserName::Edge, "~/.config/microsoft-edge"),
    (HostOs::Linux, BrowserName::Chromium, "~/.config/chromium"),
    (HostOs::Linux, BrowserName::Brave, "~/.config/BraveSoftware/Brave-Browser"),
    (HostOs::MacOs, BrowserName::Chrome, "~/Library/Application Support/Google/Chrome"),
    (HostOs::MacOs, BrowserName::Edge, "~/Library/Application Support/Microsoft Edge"),
    (HostOs::MacOs, BrowserName::Chromium, "~/Library/Application Support/Chromium"),
    (
        HostOs::MacOs,
        BrowserName::Brave,
        "~/Library/Application Support/BraveSoftware/Brave-Browser",
    ),
    (HostOs::Windows, BrowserName::Chrome, r"%LOCALAPPDATA%\Google\Chrome\User Data"),
    (HostOs::Windows, BrowserName::Edge, r"%LOCALAPPDATA%\Microsoft\Edge\User Data"),
    (HostOs::Windows, BrowserName::Chromium, r"%LOCALAPPDATA%\Chromium\User Data"),
    (
        HostOs::Windows,
        BrowserName::Brave,
        r"%LOCALAPPDATA%\BraveSoftware\Brave-Browser\User Data",
    ),
];

/// The profile a session launches with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedProfile {
    /// Passed to the browser as `--user-data-dir`.
    pub user_data_dir: PathBuf,
    /// Passed as `--profile-directory` when a named profile was selected.
    pub profile_directory: Option<String>,
    /// Temp profile created for this search only. Left on disk afterwards.
    pub disposable: bool,
}

/// One entry of a browser's `Local State` profile cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserProfile {
    /// Directory under the user data root, e.g. `Default` or `Profile 1`.
    pub directory: String,
    /// Display name shown in the browser's profile picker.
    pub name: String,
}

pub fn default_preferences() -> Value {
    serde_json::json!({
        "plugins": { "always_open_pdf_externally": true }
    })
}

/// Initialise `path` as a browser profile if it does not exist yet.
///
/// Creates `Default/Preferences` with PDFs set to download instead of opening
/// in the viewer. An existing directory is left untouched. Returns whether the
/// directory was created.
pub fn prepare_profile_dir(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let default_dir = path.join(DEFAULT_PROFILE_DIR);
    std::fs::create_dir_all(&default_dir)?;
    let prefs = serde_json::to_vec_pretty(&default_preferences())?;
    std::fs::write(default_dir.join(PREFERENCES_FILE), prefs)?;
    debug!("initialised browser profile at {}", path.display());
    Ok(true)
}

/// Fresh path under the OS temp dir for a one-off profile.
pub fn disposable_profile_dir() -> PathBuf {
    std::env::temp_dir().join(format!("scout-search-profile-{}", uuid::Uuid::new_v4()))
}

pub fn user_data_root(os: HostOs, browser: BrowserName) -> Option<PathBuf> {
    let home = dirs::home_dir();
    USER_DATA_ROOTS
        .iter()
        .find(|(o, b, _)| *o == os && *b == browser)
        .and_then(|(_, _, template)| {
            expand_path_template(template, home.as_deref(), |k| std::env::var(k).ok())
        })
}

/// Read the named profiles recorded in `<user_data_dir>/Local State`.
///
/// A missing or unreadable file yields an empty list.
pub fn list_profiles(user_data_dir: &Path) -> Vec<BrowserProfile> {
    let Ok(raw) = std::fs::read_to_string(user_data_dir.join(LOCAL_STATE_FILE)) else {
        return Vec::new();
    };
    let Ok(state) = serde_json::from_str::<Value>(&raw) else {
        return Vec::new();
    };
    let Some(cache) = state
        .pointer("/profile/info_cache")
        .and_then(|v| v.as_object())
    else {
        return Vec::new();
    };

    let mut profiles: Vec<BrowserProfile> = cache
        .iter()
        .map(|(directory, info)| BrowserProfile {
            directory: directory.clone(),
            name: info
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or(directory)
                .to_string(),
        })
        .collect();
    profiles.sort_by(|a, b| a.directory.cmp(&b.directory));
    profiles
}

/// Match `name` against profile display names, then directory names
/// (case-insensitive).
pub fn find_profile(profiles: &[BrowserProfile], name: &str) -> Option<BrowserProfile> {
    let wanted = name.trim();
    profiles
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(wanted))
        .or_else(|| profiles.iter().find(|p| p.directory.eq_ignore_ascii_case(wanted)))
        .cloned()
}

/// Decide which profile a session launches with.
///
/// * `profile_name` selects a named profile of `browser`, looked up under
///   `profile_dir` if given, else under the browser's own user data root.
/// * `profile_dir` alone is used as the user data dir (initialised if absent).
/// * Neither: a disposable profile under the temp dir.
pub fn prepare(
    os: HostOs,
    browser: Option<BrowserName>,
    options: &SessionOptions,
) -> Result<PreparedProfile, SearchError> {
    if let Some(name) = options.profile_name.as_deref() {
        let browser = browser.ok_or_else(|| {
            SearchError::InvalidRequest(
                "a profile name needs a browser name to locate its profiles".to_string(),
            )
        })?;
        let root = match options.profile_dir.clone() {
            Some(dir) => dir,
            None => user_data_root(os, browser)
                .ok_or_else(|| SearchError::UnsupportedPlatform(format!("{:?}", os)))?,
        };
        let profile = find_profile(&list_profiles(&root), name).ok_or_else(|| {
            SearchError::ProfileNotFound {
                browser,
                name: name.to_string(),
            }
        })?;
        info!(
            "using {} profile '{}' ({})",
            browser, profile.name, profile.directory
        );
        return Ok(PreparedProfile {
            user_data_dir: root,
            profile_directory: Some(profile.directory),
            disposable: false,
        });
    }

    let (path, disposable) = match options.profile_dir.clone() {
        Some(dir) => (dir, false),
        None => (disposable_profile_dir(), true),
    };
    prepare_profile_dir(&path).map_err(|e| SearchError::profile(&path, e))?;

    Ok(PreparedProfile {
        user_data_dir: path,
        profile_directory: None,
        disposable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_local_state(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(LOCAL_STATE_FILE), body).unwrap();
    }

    #[test]
    fn fresh_dir_gets_default_preferences() {
        let tmp = tempfile::tempdir().unwrap();
        let profile = tmp.path().join("profile");

        assert!(prepare_profile_dir(&profile).unwrap());

        let raw = std::fs::read_to_string(profile.join("Default").join("Preferences")).unwrap();
        let prefs: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            prefs.pointer("/plugins/always_open_pdf_externally"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn existing_dir_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!prepare_profile_dir(tmp.path()).unwrap());
        assert!(!tmp.path().join("Default").exists());
    }

    #[test]
    fn disposable_dirs_are_unique_and_under_temp() {
        let a = disposable_profile_dir();
        let b = disposable_profile_dir();
        assert_ne!(a, b);
        assert!(a.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn profiles_are_read_from_local_state() {
        let tmp = tempfile::tempdir().unwrap();
        write_local_state(
            tmp.path(),
            r#"{"profile":{"info_cache":{
                "Profile 1":{"name":"Work"},
                "Default":{"name":"Personal"}
            }}}"#,
        );

        let profiles = list_profiles(tmp.path());
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].directory, "Default");

        let work = find_profile(&profiles, "work").unwrap();
        assert_eq!(work.directory, "Profile 1");
        let by_dir = find_profile(&profiles, "default").unwrap();
        assert_eq!(by_dir.name, "Personal");
        assert!(find_profile(&profiles, "Gaming").is_none());
    }

    #[test]
    fn missing_local_state_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_profiles(tmp.path()).is_empty());
    }

    #[test]
    fn prepare_uses_explicit_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("persistent");
        let options = SessionOptions {
            profile_dir: Some(dir.clone()),
            ..Default::default()
        };

        let prepared = prepare(HostOs::Linux, None, &options).unwrap();
        assert_eq!(prepared.user_data_dir, dir);
        assert!(!prepared.disposable);
        assert!(dir.join("Default").join("Preferences").exists());
    }

    #[test]
    fn prepare_resolves_named_profile_under_explicit_root() {
        let tmp = tempfile::tempdir().unwrap();
        write_local_state(
            tmp.path(),
            r#"{"profile":{"info_cache":{"Profile 2":{"name":"Research"}}}}"#,
        );
        let options = SessionOptions {
            profile_dir: Some(tmp.path().to_path_buf()),
            profile_name: Some("Research".to_string()),
            ..Default::default()
        };

        let prepared = prepare(HostOs::Linux, Some(BrowserName::Chrome), &options).unwrap();
        assert_eq!(prepared.profile_directory.as_deref(), Some("Profile 2"));

        let options = SessionOptions {
            profile_name: Some("Nope".to_string()),
            ..options
        };
        let err = prepare(HostOs::Linux, Some(BrowserName::Chrome), &options).unwrap_err();
        assert!(matches!(err, SearchError::ProfileNotFound { .. }));
    }
}
