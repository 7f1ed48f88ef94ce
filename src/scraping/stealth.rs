//! Page-level automation masking.
//!
//! Process-level flags live in `browser_manager::build_launch_config`; this is
//! the script half, registered on every page before its first navigation.

use super::engine::BrowserPage;
use anyhow::Result;
use tracing::debug;

/// Runs in every new document before the page's own scripts.
pub const EVASION_SCRIPT: &str = r#"
(() => {
    const proto = Navigator.prototype;

    // webdriver: absent rather than false
    try {
        Object.defineProperty(proto, 'webdriver', {
            get: () => undefined,
            configurable: true,
        });
    } catch (e) {}
    try { delete navigator.webdriver; } catch (e) {}

    try {
        Object.defineProperty(proto, 'languages', {
            get: () => ['en-US', 'en'],
            configurable: true,
        });
    } catch (e) {}

    // headless builds report an empty plugin list
    try {
        Object.defineProperty(proto, 'plugins', {
            get: () => [1, 2, 3, 4, 5],
            configurable: true,
        });
    } catch (e) {}

    const permissions = window.navigator.permissions;
    const originalQuery = permissions && permissions.query && permissions.query.bind(permissions);
    if (originalQuery) {
        permissions.query = (parameters) => (
            parameters && parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );
    }
})();
"#;

/// Register [`EVASION_SCRIPT`] on `page`. Call once per page, before navigating.
pub async fn apply_evasions(page: &dyn BrowserPage) -> Result<()> {
    page.add_init_script(EVASION_SCRIPT).await?;
    debug!("evasion script registered");
    Ok(())
}
