//! Error types for the test harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Artifact capture failed: {0}")]
    Capture(String),

    #[error("Device catalog error: {0}")]
    DeviceCatalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
