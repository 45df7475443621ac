//! The conda-store UI scenario
//!
//! Log in, create an environment, rebuild it twice (once through the raw
//! YAML editor, once through the package and channel widgets), cancel an
//! edit, then delete it. The accessible names used here are the contract
//! with the UI; renaming a label there breaks the scenario here.

use crate::config::UxConfig;
use crate::environment::{BuildStatus, EnvironmentName, EnvironmentSpec, REPLACEMENT_YAML};
use crate::error::UxResult;
use crate::locator::Locator;
use crate::step::{Checkpoint, LoadState, Scenario, Step, WaitState};

const DESCRIPTION_PLACEHOLDER: &str = "Enter here the description of your environment";

/// Builds the conda-store scenario step by step
pub struct ScenarioBuilder<'a> {
    config: &'a UxConfig,
    steps: Vec<Step>,
}

impl<'a> ScenarioBuilder<'a> {
    pub fn new(config: &'a UxConfig) -> Self {
        Self {
            config,
            steps: Vec::new(),
        }
    }

    pub fn finish(self, environment: EnvironmentName) -> Scenario {
        Scenario {
            name: "conda-store-integration".to_string(),
            description: "Log in, create, edit and delete an environment".to_string(),
            environment,
            steps: self.steps,
        }
    }

    fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    fn click(&mut self, target: Locator) -> &mut Self {
        self.push(Step::Click { target })
    }

    fn fill(&mut self, target: Locator, value: &str) -> &mut Self {
        self.push(Step::Fill {
            target,
            value: value.to_string(),
        })
    }

    fn screenshot(&mut self, checkpoint: Checkpoint) -> &mut Self {
        if self.config.screenshot {
            self.push(Step::Screenshot { checkpoint });
        }
        self
    }

    fn wait_for_completed(&mut self) -> &mut Self {
        self.push(Step::WaitForStatus {
            status: BuildStatus::Completed,
            timeout_ms: Some(self.config.timeouts.build_ms),
        })
    }

    fn create_label(&self) -> String {
        format!("Create a new environment in the {} namespace", self.config.namespace)
    }

    fn edit_button() -> Locator {
        Locator::button("Edit")
    }

    /// Open the package picker, type `package` and pick the exact match
    fn add_package(&mut self, package: &str) -> &mut Self {
        self.click(Locator::button("+ Add Package"))
            .fill(Locator::label("Enter package"), package)
            .click(Locator::option(package).exact())
    }

    fn add_channel(&mut self, channel: &str) -> &mut Self {
        self.click(Locator::button("+ Add Channel"))
            .fill(Locator::label("Enter channel"), channel)
            .push(Step::Press {
                target: Locator::label("Enter channel"),
                key: "Enter".to_string(),
            })
    }

    /// Save and wait for the rebuild
    fn save_and_rebuild(&mut self) -> &mut Self {
        self.click(Locator::button("Save"))
            .push(Step::WaitFor {
                target: Self::edit_button(),
                state: WaitState::Attached,
                timeout_ms: None,
            })
            .wait_for_completed()
    }

    /// Load the UI
    pub fn navigate(&mut self) -> &mut Self {
        let url = self.config.base_url.clone();
        self.push(Step::Goto {
            url,
            wait_until: LoadState::DomContentLoaded,
            timeout_ms: self.config.timeouts.navigation_ms,
        })
        .screenshot(Checkpoint::Unauthenticated)
    }

    /// Log in from the default view and land back on it
    pub fn login(&mut self) -> &mut Self {
        let username = self.config.credentials.username.clone();
        let password = self.config.credentials.password.clone();

        self.click(Locator::css("text=Log in"))
            .screenshot(Checkpoint::LoginScreen)
            .fill(Locator::css(r#"[placeholder="Username"]"#), &username)
            .fill(Locator::css(r#"[placeholder="Password"]"#), &password)
            .push(Step::ClickAndWaitForNavigation {
                target: Locator::css(r#"button:has-text("Sign In")"#),
            })
            .screenshot(Checkpoint::Authenticated)
    }

    /// Create `name` with one package and one channel and wait for its build
    pub fn create_environment(&mut self, name: &EnvironmentName) -> &mut Self {
        let create = self.create_label();

        self.click(Locator::label(create))
            .screenshot(Checkpoint::NewEnvironment)
            .fill(Locator::label("Environment name"), name.as_str())
            .fill(Locator::placeholder(DESCRIPTION_PLACEHOLDER), "description")
            .add_package("rich")
            .click(Locator::button("Channels"))
            .add_channel("conda-forge")
            .click(Locator::button("Create").exact())
            // switch to the build that was just queued
            .click(Locator::text(" - Active"))
            .click(Locator::option(" - Active"))
            .push(Step::ExpectText {
                target: Locator::test_id("build-status"),
                contains: BuildStatus::Building.label().to_string(),
            })
            .wait_for_completed()
    }

    /// Replace the whole specification through the YAML editor and rebuild
    pub fn edit_with_yaml(&mut self, name: &EnvironmentName) -> &mut Self {
        // Matching text near the end of the editor keeps Playwright from
        // acting before the initial value has rendered.
        let editor = Locator::test_id("yaml-editor")
            .locate(Locator::role("textbox"))
            .has_text("variables: {}");

        self.click(Locator::link(name.as_str()))
            .click(Self::edit_button())
            .push(Step::Check {
                target: Locator::label("YAML"),
            })
            .screenshot(Checkpoint::YamlEditor)
            .push(Step::Clear { target: editor })
            .fill(
                Locator::test_id("yaml-editor").locate(Locator::role("textbox")),
                REPLACEMENT_YAML,
            )
            .save_and_rebuild()
    }

    /// Make sure the environment link is reachable, expanding the namespace
    /// group if it is collapsed
    pub fn reveal_environment(&mut self, name: &EnvironmentName) -> &mut Self {
        let expand = format!("{} {}", self.config.namespace, self.create_label());
        self.push(Step::EnsureVisible {
            target: Locator::link(name.as_str()),
            fallback: Locator::button(expand),
        })
    }

    /// Check the edit view reflects `spec`, then edit package by package
    pub fn fine_grained_edits(&mut self, name: &EnvironmentName, spec: &EnvironmentSpec) -> &mut Self {
        self.click(Locator::link(name.as_str()))
            .click(Self::edit_button());

        for package in spec.conda_packages() {
            self.push(Step::ExpectVisible {
                target: Locator::row(package).first(),
            });
        }
        for channel in &spec.channels {
            self.push(Step::ExpectVisible {
                target: Locator::text(channel.as_str()).exact().first(),
            });
        }

        self.fill(Locator::placeholder(DESCRIPTION_PLACEHOLDER), "new description")
            // change the version of an existing package
            .click(Locator::row("rich").locate(Locator::role("button")).first())
            .click(Locator::option("12.5.1"))
            .add_package("click")
            .click(Locator::row("rich").locate(Locator::test_id("RemovePackageTest")))
            // promote a dependency to a requested package
            .click(Locator::test_id("PromoteIcon").first())
            .click(Locator::test_id("DeleteIcon"))
            .add_channel("conda-forge")
            .save_and_rebuild()
    }

    /// Open the editor and leave it without saving
    pub fn cancel_edit(&mut self) -> &mut Self {
        self.click(Self::edit_button())
            .click(Locator::button("Cancel"))
    }

    /// Delete `name` and check its link is gone
    pub fn delete_environment(&mut self, name: &EnvironmentName) -> &mut Self {
        self.click(Self::edit_button())
            .click(Locator::text("Delete environment"))
            .click(Locator::button("Delete"))
            .push(Step::ExpectHidden {
                target: Locator::link(name.as_str()),
            })
    }
}

/// The full integration scenario for `environment`
pub fn integration(config: &UxConfig, environment: EnvironmentName) -> UxResult<Scenario> {
    let replacement = EnvironmentSpec::replacement()?;
    let mut builder = ScenarioBuilder::new(config);

    builder
        .navigate()
        .login()
        .create_environment(&environment)
        .edit_with_yaml(&environment)
        .reveal_environment(&environment)
        .fine_grained_edits(&environment, &replacement)
        .cancel_edit()
        .delete_environment(&environment);

    Ok(builder.finish(environment))
}
