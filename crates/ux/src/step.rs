//! Scenario steps
//!
//! Every interaction is data. A scenario can be dumped as YAML for review
//! and is rendered into a single Playwright script for execution.

use serde::{Deserialize, Serialize};

use crate::environment::{BuildStatus, EnvironmentName};
use crate::error::{UxError, UxResult};
use crate::locator::Locator;

/// An ordered list of steps run in one browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Environment created (and deleted) by this scenario
    pub environment: EnvironmentName,

    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn to_yaml(&self) -> UxResult<String> {
        serde_yaml::to_string(self).map_err(UxError::from)
    }

    pub fn from_yaml(yaml: &str) -> UxResult<Self> {
        serde_yaml::from_str(yaml).map_err(UxError::from)
    }

    /// Screenshot checkpoints in the order they are taken
    pub fn checkpoints(&self) -> impl Iterator<Item = Checkpoint> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Screenshot { checkpoint } => Some(*checkpoint),
            _ => None,
        })
    }
}

/// A single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load an absolute URL
    Goto {
        url: String,
        #[serde(default)]
        wait_until: LoadState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    Click { target: Locator },

    /// Click and wait for the navigation it triggers
    ClickAndWaitForNavigation { target: Locator },

    Fill { target: Locator, value: String },

    Clear { target: Locator },

    Press { target: Locator, key: String },

    /// Check a checkbox or radio button
    Check { target: Locator },

    /// Wait for an element to reach a state
    WaitFor {
        target: Locator,
        #[serde(default)]
        state: WaitState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    ExpectVisible { target: Locator },

    ExpectHidden { target: Locator },

    ExpectText { target: Locator, contains: String },

    /// Wait until the page shows the given build status
    WaitForStatus {
        status: BuildStatus,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Expect `target` visible; if it is not, click `fallback` once and move on
    EnsureVisible { target: Locator, fallback: Locator },

    Screenshot { checkpoint: Checkpoint },

    Log { message: String },
}

impl Step {
    /// Short name used in logs and reports
    pub fn name(&self) -> String {
        match self {
            Step::Goto { url, .. } => format!("goto:{}", url),
            Step::Click { target } => format!("click:{}", target),
            Step::ClickAndWaitForNavigation { target } => format!("click+navigate:{}", target),
            Step::Fill { target, .. } => format!("fill:{}", target),
            Step::Clear { target } => format!("clear:{}", target),
            Step::Press { target, key } => format!("press:{}:{}", target, key),
            Step::Check { target } => format!("check:{}", target),
            Step::WaitFor { target, state, .. } => format!("wait:{}:{}", target, state.as_str()),
            Step::ExpectVisible { target } => format!("expect-visible:{}", target),
            Step::ExpectHidden { target } => format!("expect-hidden:{}", target),
            Step::ExpectText { target, contains } => {
                format!("expect-text:{}:{:?}", target, contains)
            }
            Step::WaitForStatus { status, .. } => format!("status:{}", status),
            Step::EnsureVisible { target, .. } => format!("ensure-visible:{}", target),
            Step::Screenshot { checkpoint } => format!("screenshot:{}", checkpoint.as_str()),
            Step::Log { message } => {
                let end = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// Page load milestones accepted by `goto`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

/// Named points where a screenshot may be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Unauthenticated,
    LoginScreen,
    Authenticated,
    NewEnvironment,
    YamlEditor,
}

impl Checkpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Checkpoint::Unauthenticated => "unauthenticated",
            Checkpoint::LoginScreen => "login_screen",
            Checkpoint::Authenticated => "authenticated",
            Checkpoint::NewEnvironment => "new-env",
            Checkpoint::YamlEditor => "yaml-editor",
        }
    }

    pub fn file_name(&self) -> String {
        format!("conda-store-{}.png", self.as_str())
    }
}
