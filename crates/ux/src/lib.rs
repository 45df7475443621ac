//! conda-store UX end-to-end driver
//!
//! Drives a real browser through the conda-store web UI the way a user
//! would, from a Rust-controlled harness:
//! - Polls the server until it answers HTTP
//! - Describes the scenario as typed steps built from accessible locators
//! - Renders the steps into one Playwright script and runs it with Node.js
//! - Writes screenshots and a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     UxRunner (Rust)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  wait_for_server() -> Readiness      (HEAD until response)  │
//! │  plan() -> Scenario                                         │
//! │    navigate → login → create → edit (YAML) → edit (widgets) │
//! │    → cancel → delete → expect link hidden                   │
//! │  ScriptBuilder::build(&Scenario) -> String                  │
//! │  PlaywrightDriver::run(script) -> RunOutcome                │
//! │    └── "@@ux {json}" marker lines -> ScriptEvent            │
//! │  write_report() -> test-results/ux-results.json             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod environment;
pub mod error;
pub mod locator;
pub mod readiness;
pub mod runner;
pub mod scenario;
pub mod script;
pub mod step;

pub use config::UxConfig;
pub use environment::{BuildStatus, EnvironmentName, NameGenerator};
pub use error::{UxError, UxResult};
pub use locator::Locator;
pub use readiness::{Readiness, ReadinessPoller};
pub use runner::{ScenarioReport, UxRunner};
pub use step::{Scenario, Step};
