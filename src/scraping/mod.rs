pub mod browser_manager;
pub mod engine;
pub mod markdown;
pub mod profile;
pub mod reader;
pub mod session;
pub mod stealth;

pub use engine::{BrowserEngine, BrowserPage};
pub use session::{Session, SessionOptions};
