//! Per-test lifecycle capture
//!
//! Every test body runs inside [`TestLifecycle::run_case`]. The wrapper
//! measures duration, contains panics, classifies the outcome, captures
//! artifacts for non-passing cases when a live session is available,
//! and finalizes by writing through the result store. Finalization is
//! unconditional: a case moves from `Running` to `Finalized` exactly
//! once, no matter how the body ended, because losing the outcome
//! record is worse than losing any enrichment metadata.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

use shelfcheck_common::{CategorizeReport, OutcomeRecord, ResultStore, TestStatus};

use crate::browser::BrowserSession;
use crate::capture::{ArtifactCapture, CapturedArtifact};
use crate::device::DeviceContext;

/// How a test body reports anything other than a pass
#[derive(Debug, Clone)]
pub enum CaseFailure {
    /// An assertion did not hold; carries the failure representation
    Assertion(String),
    /// The case chose not to run; carries the reason
    Skipped(String),
}

/// What a test body returns
pub type CaseResult = Result<(), CaseFailure>;

/// Lifecycle states of one case invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Running,
    Finalized,
}

/// Everything the wrapper learned about one case
#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub cleaned_name: String,
    pub module: String,
    pub status: TestStatus,
    pub duration_secs: f64,
    pub error_detail: Option<String>,
    pub artifact: Option<CapturedArtifact>,
    /// What the store did with this case
    pub persisted: CategorizeReport,
}

/// Wraps test execution with outcome capture and persistence
pub struct TestLifecycle {
    store: ResultStore,
    capture: ArtifactCapture,
}

impl TestLifecycle {
    pub fn new(store: ResultStore, capture: ArtifactCapture) -> Self {
        Self { store, capture }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run one test body and record its outcome.
    ///
    /// `device` comes straight from session provisioning; `session` is
    /// the live browser handle if the case has one. The final store
    /// write happens on every path out of this function.
    pub fn run_case<F>(
        &self,
        name: &str,
        module: &str,
        device: &DeviceContext,
        session: Option<&dyn BrowserSession>,
        body: F,
    ) -> CaseReport
    where
        F: FnOnce() -> CaseResult,
    {
        let mut state = LifecycleState::Running;
        debug!("{} -> {:?}", name, state);
        let start = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(body));
        let duration_secs = start.elapsed().as_secs_f64();

        let (status, error_detail) = match outcome {
            Ok(Ok(())) => (TestStatus::Passed, None),
            Ok(Err(CaseFailure::Assertion(msg))) => (TestStatus::Failed, Some(msg)),
            Ok(Err(CaseFailure::Skipped(reason))) => {
                debug!("{} skipped: {}", name, reason);
                (TestStatus::Skipped, None)
            }
            Err(panic) => (TestStatus::Error, Some(panic_message(&panic))),
        };

        let artifact = match (status, session) {
            (TestStatus::Failed, Some(session)) => {
                self.capture.capture_failure(session, name, None, false)
            }
            (TestStatus::Error, Some(session)) => {
                self.capture.capture_failure(session, name, None, true)
            }
            _ => None,
        };

        let cleaned_name = shelfcheck_common::scrub::clean_test_name(name);
        let mut record = OutcomeRecord::new(cleaned_name.clone(), module, status)
            .with_device(device.device.clone())
            .with_resolution(device.resolution_label())
            .with_duration(duration_secs);
        if let Some(detail) = &error_detail {
            record = record.with_error_detail(detail.clone());
        }
        if let Some(artifact) = &artifact {
            record = record.with_artifact_link(artifact.link.clone());
        }

        let persisted = self.store.record_and_categorize(&record);
        state = LifecycleState::Finalized;
        debug!("{} -> {:?}", name, state);

        if !persisted.base.is_committed() {
            warn!("Outcome for {} was not persisted", cleaned_name);
        }

        CaseReport {
            name: name.to_string(),
            cleaned_name,
            module: module.to_string(),
            status,
            duration_secs,
            error_detail,
            artifact,
            persisted,
        }
    }
}

/// Best-effort text for a panic payload
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lifecycle(dir: &TempDir) -> TestLifecycle {
        let store = ResultStore::open_memory().unwrap();
        let capture = ArtifactCapture::new(dir.path().join("artifacts")).unwrap();
        TestLifecycle::new(store, capture)
    }

    #[test]
    fn test_passing_case() {
        let dir = TempDir::new().unwrap();
        let fixture = lifecycle(&dir);
        let device = DeviceContext::new("desktop", 1920, 1080);

        let report = fixture.run_case("test_cart[desktop]", "tests.test_cart", &device, None, || {
            Ok(())
        });

        assert_eq!(report.status, TestStatus::Passed);
        assert_eq!(report.cleaned_name, "test_cart");
        assert!(report.artifact.is_none());
        assert!(report.persisted.base.is_committed());

        let rows = fixture.store().query_recent(1).unwrap();
        assert_eq!(rows[0].test_case_name, "test_cart");
        assert_eq!(rows[0].device_name.as_deref(), Some("desktop"));
        assert_eq!(rows[0].screen_resolution.as_deref(), Some("1920x1080"));
        assert!(rows[0].total_time_duration.unwrap() >= 0.0);
    }

    #[test]
    fn test_failed_case_without_session_still_records() {
        let dir = TempDir::new().unwrap();
        let fixture = lifecycle(&dir);
        let device = DeviceContext::unknown("headless");

        let report = fixture.run_case("test_book_purchase", "tests.test_book", &device, None, || {
            Err(CaseFailure::Assertion(
                "TimeoutException: button not clickable".to_string(),
            ))
        });

        assert_eq!(report.status, TestStatus::Failed);
        assert!(report.artifact.is_none());

        let rows = fixture.store().query_recent(1).unwrap();
        assert_eq!(rows[0].test_status, TestStatus::Failed);
        assert_eq!(rows[0].error_summary.as_deref(), Some("button not clickable"));
        assert_eq!(rows[0].screen_resolution.as_deref(), Some("unknown"));
        assert!(rows[0].error_link.is_none());
    }

    #[test]
    fn test_panicking_case_is_an_error() {
        let dir = TempDir::new().unwrap();
        let fixture = lifecycle(&dir);
        let device = DeviceContext::new("laptop", 1280, 720);

        let report = fixture.run_case("test_blows_up", "tests.test_misc", &device, None, || {
            panic!("element vanished mid-click");
        });

        assert_eq!(report.status, TestStatus::Error);
        assert_eq!(
            report.error_detail.as_deref(),
            Some("element vanished mid-click")
        );

        let rows = fixture.store().query_recent(1).unwrap();
        assert_eq!(rows[0].test_status, TestStatus::Error);
    }

    #[test]
    fn test_skipped_case() {
        let dir = TempDir::new().unwrap();
        let fixture = lifecycle(&dir);
        let device = DeviceContext::new("iPad", 768, 1024);

        let report = fixture.run_case("test_flaky", "tests.test_misc", &device, None, || {
            Err(CaseFailure::Skipped("feature flag off".to_string()))
        });

        assert_eq!(report.status, TestStatus::Skipped);
        assert!(report.error_detail.is_none());

        let stats = fixture.store().query_statistics().unwrap();
        assert_eq!(stats.skipped, 1);
    }
}
