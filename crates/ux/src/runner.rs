//! Main runner that orchestrates readiness polling, the scenario and its report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::UxConfig;
use crate::driver::{PlaywrightDriver, RunOutcome};
use crate::environment::{EnvironmentName, NameGenerator};
use crate::error::{UxError, UxResult};
use crate::readiness::{Readiness, ReadinessPoller};
use crate::scenario;
use crate::script::ScriptBuilder;
use crate::step::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    NotRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotReport {
    pub path: PathBuf,
    pub sha256: String,
}

/// Result of one scenario run, written as `ux-results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub base_url: String,
    pub environment: EnvironmentName,
    pub readiness: Readiness,
    pub success: bool,
    pub steps: Vec<StepReport>,
    pub screenshots: Vec<ScreenshotReport>,
    pub error: Option<String>,
}

impl ScenarioReport {
    /// Turn a failed run into the error of the step that failed
    pub fn into_result(self) -> UxResult<Self> {
        if self.success {
            return Ok(self);
        }
        let step = self
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "scenario".to_string());
        Err(UxError::StepFailed {
            step,
            reason: self.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Runs the conda-store scenario end to end
pub struct UxRunner {
    config: UxConfig,
}

impl UxRunner {
    pub fn new(config: UxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UxConfig {
        &self.config
    }

    /// Build the scenario for a freshly generated environment name
    pub fn plan(&self) -> UxResult<Scenario> {
        let environment = NameGenerator::from_entropy().next_name()?;
        scenario::integration(&self.config, environment)
    }

    /// Render the script that `run` would execute for `scenario`
    pub fn script(&self, scenario: &Scenario) -> String {
        ScriptBuilder::new(&self.config).build(scenario)
    }

    /// Wait for the server (unless disabled); a timeout is logged, not fatal
    pub async fn wait_for_server(&self) -> UxResult<Readiness> {
        if !self.config.readiness.enabled {
            info!("Readiness polling disabled");
            return Ok(Readiness::Skipped);
        }

        let poller = ReadinessPoller::new(&self.config.readiness)?;
        let readiness = poller.wait_for(&self.config.base_url).await?;
        if !readiness.is_ready() {
            warn!("Proceeding without a response from {}", self.config.base_url);
        }
        Ok(readiness)
    }

    /// Create the results directory and return a copy of the configuration
    /// pointing at it by absolute path. Node runs from `project_dir`, so a
    /// relative path would put screenshots somewhere the report never looks.
    pub fn resolve_results_dir(&self) -> UxResult<UxConfig> {
        std::fs::create_dir_all(&self.config.results_dir)?;
        let mut config = self.config.clone();
        config.results_dir = std::fs::canonicalize(&self.config.results_dir)?;
        Ok(config)
    }

    /// Poll, run the scenario and write the report
    pub async fn run(&self) -> UxResult<ScenarioReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let config = self.resolve_results_dir()?;

        let readiness = self.wait_for_server().await?;
        let scenario = self.plan()?;
        info!(
            "Running '{}' against {} with environment {} ({} steps)",
            scenario.name,
            self.config.base_url,
            scenario.environment,
            scenario.steps.len()
        );

        let driver = PlaywrightDriver::new(self.config.playwright.clone())?;
        let outcome = driver
            .run(&ScriptBuilder::new(&config).build(&scenario))
            .await?;

        let report = ScenarioReport {
            run_id: format!("ux-{}", started_at.format("%Y%m%dT%H%M%S%.3fZ")),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            base_url: self.config.base_url.clone(),
            environment: scenario.environment.clone(),
            readiness,
            success: outcome.finished(),
            steps: step_reports(&scenario, &outcome),
            screenshots: collect_screenshots(&config.results_dir, &scenario)?,
            error: run_error(&outcome, self.config.playwright.run_timeout_secs),
        };

        if report.success {
            info!("✓ {} ({} ms)", scenario.name, report.duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                scenario.name,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.write_report(&report)?;
        Ok(report)
    }

    /// Write the report as pretty JSON
    pub fn write_report(&self, report: &ScenarioReport) -> UxResult<PathBuf> {
        std::fs::create_dir_all(&self.config.results_dir)?;

        let path = self.config.report_path();
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Per-step status from the events the script emitted
pub fn step_reports(scenario: &Scenario, outcome: &RunOutcome) -> Vec<StepReport> {
    let failed_at = if outcome.finished() {
        None
    } else {
        match outcome.failure() {
            Some((index, _)) => index.or(Some(0)),
            None => Some(outcome.last_started().unwrap_or(0)),
        }
    };

    scenario
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let status = match failed_at {
                None => StepStatus::Passed,
                Some(failed) if index < failed => StepStatus::Passed,
                Some(failed) if index == failed => StepStatus::Failed,
                Some(_) => StepStatus::NotRun,
            };
            let note = outcome
                .fallbacks()
                .find(|(i, _)| *i == index)
                .map(|(_, message)| format!("fallback used: {}", message));
            StepReport {
                index,
                name: step.name(),
                status,
                note,
            }
        })
        .collect()
}

fn run_error(outcome: &RunOutcome, run_timeout_secs: u64) -> Option<String> {
    if outcome.finished() {
        return None;
    }
    if outcome.timed_out {
        return Some(format!("scenario exceeded {}s and was stopped", run_timeout_secs));
    }
    if let Some((_, error)) = outcome.failure() {
        return Some(error.to_string());
    }
    let stderr = outcome.stderr.trim();
    Some(match outcome.exit_code {
        Some(code) if stderr.is_empty() => format!("node exited with status {}", code),
        Some(code) => format!("node exited with status {}: {}", code, stderr),
        None => "node was terminated by a signal".to_string(),
    })
}

/// Screenshots of the scenario's checkpoints that exist on disk
fn collect_screenshots(results_dir: &Path, scenario: &Scenario) -> UxResult<Vec<ScreenshotReport>> {
    let mut screenshots = Vec::new();
    for checkpoint in scenario.checkpoints() {
        let path = results_dir.join(checkpoint.file_name());
        if !path.exists() {
            continue;
        }
        let bytes = std::fs::read(&path)?;
        screenshots.push(ScreenshotReport {
            sha256: hex::encode(Sha256::digest(&bytes)),
            path,
        });
    }
    Ok(screenshots)
}
