//! Screenshot and page-source capture for failing tests
//!
//! Capture is strictly best-effort: the fixture treats a `None` return
//! as "no artifact available" and carries on. Nothing in this module
//! touches the database; the `file://` link threads through to the
//! result store as an opaque string.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::browser::BrowserSession;
use crate::error::{HarnessError, HarnessResult};

/// Longest allowed filename stem; test names can carry long
/// parametrization payloads.
const MAX_STEM_LEN: usize = 100;

/// Files produced for one failing test
#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    pub screenshot_path: PathBuf,
    pub page_source_path: Option<PathBuf>,
    /// `file://` URI of the screenshot, as persisted in `error_link`
    pub link: String,
}

/// Capture utility bound to one artifact directory
pub struct ArtifactCapture {
    dir: PathBuf,
}

impl ArtifactCapture {
    pub fn new(dir: impl Into<PathBuf>) -> HarnessResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Capture a screenshot and page source for a failing test.
    ///
    /// Never raises: any failure is logged and reported as `None`.
    pub fn capture_failure(
        &self,
        session: &dyn BrowserSession,
        test_name: &str,
        stage: Option<&str>,
        is_error: bool,
    ) -> Option<CapturedArtifact> {
        match self.try_capture(session, test_name, stage, is_error) {
            Ok(artifact) => {
                debug!("Captured artifact {}", artifact.link);
                Some(artifact)
            }
            Err(e) => {
                warn!("Artifact capture failed for {}: {}", test_name, e);
                None
            }
        }
    }

    fn try_capture(
        &self,
        session: &dyn BrowserSession,
        test_name: &str,
        stage: Option<&str>,
        is_error: bool,
    ) -> HarnessResult<CapturedArtifact> {
        let stem = file_stem(test_name, stage, is_error);

        let screenshot_path = self.dir.join(format!("{}.png", stem));
        session.save_screenshot(&screenshot_path)?;

        // The page source is a secondary artifact; losing it must not
        // lose the screenshot.
        let page_source_path = match session.page_source() {
            Ok(html) => {
                let path = self.dir.join(format!("{}.html", stem));
                match std::fs::write(&path, html) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        warn!("Page source dump failed for {}: {}", test_name, e);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("Page source read failed for {}: {}", test_name, e);
                None
            }
        };

        let link = file_uri(&screenshot_path)?;
        Ok(CapturedArtifact {
            screenshot_path,
            page_source_path,
            link,
        })
    }
}

/// Build a filesystem-safe stem: sanitized test name, optional stage,
/// failure kind and a UTC timestamp.
fn file_stem(test_name: &str, stage: Option<&str>, is_error: bool) -> String {
    let kind = if is_error { "error" } else { "failure" };
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");

    let mut stem = sanitize(test_name);
    if let Some(stage) = stage {
        stem.push('_');
        stem.push_str(&sanitize(stage));
    }
    if stem.len() > MAX_STEM_LEN {
        let mut end = MAX_STEM_LEN;
        while !stem.is_char_boundary(end) {
            end -= 1;
        }
        stem.truncate(end);
    }

    format!("{}_{}_{}", stem, kind, timestamp)
}

/// Replace characters that are invalid or awkward in filenames
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

fn file_uri(path: &Path) -> HarnessResult<String> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| HarnessError::Capture(format!("cannot resolve {}: {}", path.display(), e)))?;
    Ok(format!("file://{}", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize("test_checkout"), "test_checkout");
        assert_eq!(sanitize("cart page: total?"), "cart_page__total_");
        assert_eq!(sanitize("a/b\\c|d"), "a_b_c_d");
    }

    #[test]
    fn test_file_stem_shape() {
        let stem = file_stem("test_book_purchase", Some("payment"), false);
        assert!(stem.starts_with("test_book_purchase_payment_failure_"));

        let stem = file_stem("test_book_purchase", None, true);
        assert!(stem.contains("_error_"));
    }

    #[test]
    fn test_file_stem_is_length_capped() {
        let long_name = "x".repeat(400);
        let stem = file_stem(&long_name, None, false);
        // stem = capped name + kind + timestamp suffix
        assert!(stem.len() <= MAX_STEM_LEN + "_failure_YYYYmmdd_HHMMSS".len());
    }
}
