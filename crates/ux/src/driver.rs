//! Playwright browser automation
//!
//! Runs a generated script with Node.js and follows its progress through
//! the marker lines it prints.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{UxError, UxResult};

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ux (\{.*\})\s*$").expect("marker regex is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,

    /// Delay added to every Playwright operation
    pub slow_mo_ms: u64,

    /// Node.js executable
    pub node_binary: PathBuf,

    /// Directory whose `node_modules` provides `@playwright/test`
    pub project_dir: PathBuf,

    /// Hard limit for the whole script
    pub run_timeout_secs: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            slow_mo_ms: 0,
            node_binary: PathBuf::from("node"),
            project_dir: PathBuf::from("."),
            run_timeout_secs: 30 * 60,
        }
    }
}

/// Progress reported by a running script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// Step `index` is starting
    Step { index: usize, name: String },

    /// A visibility check failed and its fallback was clicked
    Fallback { index: usize, message: String },

    Finished,

    /// The script stopped at step `index` (`None` before the first step)
    Failed { index: Option<usize>, error: String },
}

/// Parse a marker line; anything else is ordinary script output
pub fn parse_marker(line: &str) -> Option<ScriptEvent> {
    let caps = MARKER.captures(line)?;
    match serde_json::from_str(&caps[1]) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Unparseable marker line {:?}: {}", line, e);
            None
        }
    }
}

/// What happened when a script ran
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub events: Vec<ScriptEvent>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stderr: String,
}

impl RunOutcome {
    /// The script reached its end and node exited cleanly
    pub fn finished(&self) -> bool {
        !self.timed_out
            && self.exit_code == Some(0)
            && self.events.iter().any(|e| matches!(e, ScriptEvent::Finished))
    }

    /// Index of the last step that started
    pub fn last_started(&self) -> Option<usize> {
        self.events.iter().rev().find_map(|e| match e {
            ScriptEvent::Step { index, .. } => Some(*index),
            _ => None,
        })
    }

    /// Reported failure, if the script caught one
    pub fn failure(&self) -> Option<(Option<usize>, &str)> {
        self.events.iter().find_map(|e| match e {
            ScriptEvent::Failed { index, error } => Some((*index, error.as_str())),
            _ => None,
        })
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = (usize, &str)> {
        self.events.iter().filter_map(|e| match e {
            ScriptEvent::Fallback { index, message } => Some((*index, message.as_str())),
            _ => None,
        })
    }
}

/// Runs generated scripts with Node.js
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
}

impl PlaywrightDriver {
    /// Create a driver, failing early when Playwright is not installed
    pub fn new(config: PlaywrightConfig) -> UxResult<Self> {
        Self::check_playwright_installed(&config.project_dir)?;
        Ok(Self { config })
    }

    fn check_playwright_installed(project_dir: &Path) -> UxResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(UxError::PlaywrightNotFound),
        }
    }

    /// Run `script` to completion, a caught failure, or the run timeout
    pub async fn run(&self, script: &str) -> UxResult<RunOutcome> {
        // Inside the project dir so `require` finds its node_modules
        let temp_dir = tempfile::Builder::new()
            .prefix(".ux-")
            .tempdir_in(&self.config.project_dir)?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(&self.config.project_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                UxError::Playwright(format!(
                    "failed to spawn {}: {}",
                    self.config.node_binary.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| UxError::Playwright("node stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| UxError::Playwright("node stderr was not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let run_timeout = Duration::from_secs(self.config.run_timeout_secs);
        let mut outcome = RunOutcome::default();

        let result = timeout(run_timeout, async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_marker(&line) {
                    Some(event) => {
                        log_event(&event);
                        outcome.events.push(event);
                    }
                    None => debug!(target: "node", "{}", line),
                }
            }
            Ok::<ExitStatus, std::io::Error>(child.wait().await?)
        })
        .await;

        match result {
            Ok(status) => {
                let status = status?;
                outcome.exit_code = status.code();
            }
            Err(_) => {
                error!("Scenario script exceeded {:?}; stopping node", run_timeout);
                terminate(&mut child).await;
                outcome.timed_out = true;
            }
        }

        outcome.stderr = stderr_task.await.unwrap_or_default();
        if !outcome.stderr.trim().is_empty() {
            debug!("node stderr:\n{}", outcome.stderr);
        }

        Ok(outcome)
    }
}

fn log_event(event: &ScriptEvent) {
    match event {
        ScriptEvent::Step { index, name } => info!("[{:>3}] {}", index, name),
        ScriptEvent::Fallback { index, message } => {
            warn!("[{:>3}] not visible, used fallback: {}", index, message)
        }
        ScriptEvent::Finished => info!("Scenario script finished"),
        ScriptEvent::Failed { index, error } => match index {
            Some(index) => error!("[{:>3}] failed: {}", index, error),
            None => error!("Script failed before the first step: {}", error),
        },
    }
}

/// SIGTERM first, then kill if node is still around
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && timeout(Duration::from_secs(2), child.wait()).await.is_ok()
            {
                return;
            }
        }
    }

    let _ = child.kill().await;
}
