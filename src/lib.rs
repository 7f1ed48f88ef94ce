pub mod core;
pub mod mcp;
pub mod scraping;
pub mod tools;

pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::{AppState, SearchError};
pub use crate::tools::search::{run_search, search, search_with_session};
