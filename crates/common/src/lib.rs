//! Shelfcheck Common Library
//!
//! Shared types, configuration and the test-result store for the
//! shelfcheck checkout QA suite.

pub mod config;
pub mod error;
pub mod rules;
pub mod scrub;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{profile, resolve_profile, ConnectionProfile};
pub use error::{Error, Result};
pub use rules::FanoutRule;
pub use store::{CategorizeReport, ResultStore, StoreStatistics, WriteOutcome};
pub use types::*;

/// Shelfcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default data directory for locally written result databases
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".shelfcheck")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
