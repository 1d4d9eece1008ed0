//! Browser session abstraction and the Playwright-backed implementation
//!
//! The harness consumes browsers through the narrow [`BrowserSession`]
//! trait; the lifecycle fixture and artifact capture never see anything
//! Playwright-specific. [`PlaywrightSession`] generates a small Node
//! script per operation and runs it to completion with the system
//! `node`, parsing a single JSON result line from stdout.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::device::{DeviceContext, DeviceProfile};
use crate::error::{HarnessError, HarnessResult};

/// The browser operations the harness needs from a live session
pub trait BrowserSession {
    /// Navigate to a URL relative to the session's base URL
    fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Whether at least one element matches the selector
    fn find_element(&self, selector: &str) -> HarnessResult<bool>;

    /// Evaluate JavaScript in the page and return its JSON value
    fn execute_script(&self, script: &str) -> HarnessResult<serde_json::Value>;

    /// Write a full-page screenshot to `path`
    fn save_screenshot(&self, path: &Path) -> HarnessResult<()>;

    /// Current page source
    fn page_source(&self) -> HarnessResult<String>;

    /// Resolved viewport width in CSS pixels
    fn viewport_width(&self) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright sessions
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: Browser::Chromium,
            headless: true,
        }
    }
}

/// Playwright-backed browser session
pub struct PlaywrightSession {
    base_url: String,
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
}

/// Create a session for a device profile, returning the session paired
/// with its device context. Lifecycle wrappers receive the context as
/// an argument; there is no shared device slot to read.
pub fn provision(
    config: PlaywrightConfig,
    profile: &DeviceProfile,
) -> HarnessResult<(PlaywrightSession, DeviceContext)> {
    let session = PlaywrightSession::new(config, profile.width, profile.height)?;
    Ok((session, profile.context()))
}

impl PlaywrightSession {
    pub fn new(config: PlaywrightConfig, width: u32, height: u32) -> HarnessResult<Self> {
        Self::check_playwright_installed()?;

        Ok(Self {
            base_url: config.base_url,
            browser: config.browser,
            headless: config.headless,
            viewport_width: width,
            viewport_height: height,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> HarnessResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    /// Wrap an operation body into a complete Playwright script. The
    /// body sees `page` and `baseUrl` and may assign to `result`; the
    /// footer prints one JSON line consumed by [`Self::run_script`].
    fn build_script(&self, body: &str) -> String {
        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  let result = null;

  try {{
{body}
    console.log(JSON.stringify({{ ok: true, result }}));
  }} catch (error) {{
    console.log(JSON.stringify({{ ok: false, error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            base_url = js_quote(&self.base_url),
        )
    }

    /// Run a generated script and return the `result` value it produced
    fn run_script(&self, body: &str) -> HarnessResult<serde_json::Value> {
        let script = self.build_script(body);

        let scratch = tempfile::tempdir()?;
        let script_path = scratch.path().join("op.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = Command::new("node").arg(&script_path).output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("");
        let parsed: serde_json::Value = serde_json::from_str(line).map_err(|_| {
            HarnessError::Playwright(format!(
                "script produced no result:\nstdout: {}\nstderr: {}",
                stdout,
                String::from_utf8_lossy(&output.stderr)
            ))
        })?;

        if parsed["ok"].as_bool() == Some(true) {
            Ok(parsed["result"].clone())
        } else {
            Err(HarnessError::Playwright(
                parsed["error"].as_str().unwrap_or("unknown error").to_string(),
            ))
        }
    }
}

impl BrowserSession for PlaywrightSession {
    fn navigate(&self, url: &str) -> HarnessResult<()> {
        let body = format!("    await page.goto(baseUrl + {});", js_quote(url));
        self.run_script(&body).map(|_| ())
    }

    fn find_element(&self, selector: &str) -> HarnessResult<bool> {
        let body = format!(
            "    result = (await page.locator({}).count()) > 0;",
            js_quote(selector)
        );
        Ok(self.run_script(&body)?.as_bool().unwrap_or(false))
    }

    fn execute_script(&self, script: &str) -> HarnessResult<serde_json::Value> {
        let body = format!("    result = await page.evaluate(() => {{ {} }});", script);
        self.run_script(&body)
    }

    fn save_screenshot(&self, path: &Path) -> HarnessResult<()> {
        let body = format!(
            "    await page.screenshot({{ path: {}, fullPage: true }});",
            js_quote(&path.to_string_lossy())
        );
        self.run_script(&body).map(|_| ())
    }

    fn page_source(&self) -> HarnessResult<String> {
        let body = "    result = await page.content();".to_string();
        Ok(self
            .run_script(&body)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
