//! Shelfcheck E2E Harness
//!
//! This crate wraps checkout-flow test execution with outcome capture:
//! - Provisions Playwright browser sessions per device profile
//! - Wraps every test body in a lifecycle fixture that measures
//!   duration, classifies the outcome and persists it exactly once
//! - Captures a screenshot and page-source dump for failing tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Test process (one worker)               │
//! ├──────────────────────────────────────────────────────────┤
//! │  provision(profile) -> (PlaywrightSession, DeviceContext)│
//! │  TestLifecycle::run_case(name, module, device, session)  │
//! │    ├── body()            -> pass | fail | skip | panic   │
//! │    ├── ArtifactCapture   -> screenshot + page source     │
//! │    └── ResultStore::record_and_categorize(...)           │
//! │          └── outcome row + order/subscription fan-out    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The store write is the one step that always happens; everything
//! above it degrades best-effort.

pub mod browser;
pub mod capture;
pub mod device;
pub mod error;
pub mod fixture;
pub mod suite;

pub use browser::{provision, Browser, BrowserSession, PlaywrightConfig, PlaywrightSession};
pub use capture::{ArtifactCapture, CapturedArtifact};
pub use device::{DeviceCatalog, DeviceContext, DeviceProfile};
pub use error::{HarnessError, HarnessResult};
pub use fixture::{CaseFailure, CaseReport, CaseResult, TestLifecycle};
pub use suite::{Suite, SuiteSummary};
