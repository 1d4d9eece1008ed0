//! Suite-level aggregation over case reports

use std::time::Instant;

use tracing::{error, info};

use shelfcheck_common::TestStatus;

use crate::browser::BrowserSession;
use crate::device::DeviceContext;
use crate::fixture::{CaseReport, CaseResult, TestLifecycle};

/// Counts and reports for one suite run
#[derive(Debug)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_secs: f64,
    pub reports: Vec<CaseReport>,
}

/// Runs cases through a lifecycle fixture and accumulates their reports
pub struct Suite<'a> {
    lifecycle: &'a TestLifecycle,
    reports: Vec<CaseReport>,
    started: Instant,
}

impl<'a> Suite<'a> {
    pub fn new(lifecycle: &'a TestLifecycle) -> Self {
        Self {
            lifecycle,
            reports: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Run one case and keep its report
    pub fn case<F>(
        &mut self,
        name: &str,
        module: &str,
        device: &DeviceContext,
        session: Option<&dyn BrowserSession>,
        body: F,
    ) -> &CaseReport
    where
        F: FnOnce() -> CaseResult,
    {
        let report = self.lifecycle.run_case(name, module, device, session, body);
        match report.status {
            TestStatus::Passed => info!("✓ {} ({:.2}s)", report.cleaned_name, report.duration_secs),
            TestStatus::Skipped => info!("- {} (skipped)", report.cleaned_name),
            _ => error!(
                "✗ {} - {}",
                report.cleaned_name,
                report.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }
        self.reports.push(report);
        self.reports.last().expect("report just pushed")
    }

    /// Close the suite and log the totals
    pub fn finish(self) -> SuiteSummary {
        let duration_secs = self.started.elapsed().as_secs_f64();

        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut errors = 0;
        for report in &self.reports {
            match report.status {
                TestStatus::Passed => passed += 1,
                TestStatus::Failed => failed += 1,
                TestStatus::Skipped => skipped += 1,
                TestStatus::Error => errors += 1,
            }
        }

        let summary = SuiteSummary {
            total: self.reports.len(),
            passed,
            failed,
            skipped,
            errors,
            duration_secs,
            reports: self.reports,
        };

        info!(
            "Suite results: {} passed, {} failed, {} skipped, {} errors ({:.2}s)",
            summary.passed, summary.failed, summary.skipped, summary.errors, summary.duration_secs
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ArtifactCapture;
    use crate::fixture::CaseFailure;
    use shelfcheck_common::ResultStore;
    use tempfile::TempDir;

    #[test]
    fn test_suite_counts() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open_memory().unwrap();
        let capture = ArtifactCapture::new(dir.path().join("artifacts")).unwrap();
        let lifecycle = TestLifecycle::new(store, capture);

        let device = DeviceContext::new("desktop", 1920, 1080);
        let mut suite = Suite::new(&lifecycle);
        suite.case("test_cart_badge", "tests.test_nav", &device, None, || Ok(()));
        suite.case("test_book_purchase", "tests.test_book", &device, None, || {
            Err(CaseFailure::Assertion("checkout button missing".to_string()))
        });
        suite.case("test_wishlist", "tests.test_nav", &device, None, || {
            Err(CaseFailure::Skipped("not deployed".to_string()))
        });

        let summary = suite.finish();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);

        let stats = lifecycle.store().query_statistics().unwrap();
        assert_eq!(stats.total, 3);
    }
}
