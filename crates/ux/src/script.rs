//! Render a scenario into a Node.js Playwright script
//!
//! The whole scenario runs in one script so that every step shares the same
//! browser page. Progress goes back to Rust as marker lines on stdout:
//!
//! ```text
//! @@ux {"event":"step","index":3,"name":"click:text=Log in"}
//! @@ux {"event":"fallback","index":41,"message":"..."}
//! @@ux {"event":"finished"}
//! @@ux {"event":"failed","index":12,"error":"Timeout 60000ms exceeded"}
//! ```

use std::path::PathBuf;

use crate::config::UxConfig;
use crate::driver::Browser;
use crate::locator::js_str;
use crate::step::{Scenario, Step};

/// Prefix of marker lines emitted by generated scripts
pub const MARKER_PREFIX: &str = "@@ux ";

pub struct ScriptBuilder {
    browser: Browser,
    headless: bool,
    slow_mo_ms: u64,
    default_timeout_ms: u64,
    results_dir: PathBuf,
}

impl ScriptBuilder {
    pub fn new(config: &UxConfig) -> Self {
        Self {
            browser: config.playwright.browser,
            headless: config.playwright.headless,
            slow_mo_ms: config.playwright.slow_mo_ms,
            default_timeout_ms: config.timeouts.default_ms,
            results_dir: config.results_dir.clone(),
        }
    }

    /// Build the complete script for `scenario`
    pub fn build(&self, scenario: &Scenario) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit, expect: baseExpect }} = require("@playwright/test");

const DEFAULT_TIMEOUT = {timeout};
const expect = baseExpect.configure({{ timeout: DEFAULT_TIMEOUT }});

function mark(event) {{
  console.log({marker} + JSON.stringify(event));
}}

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless}, slowMo: {slow_mo} }});
  const page = await browser.newPage();
  page.setDefaultTimeout(DEFAULT_TIMEOUT);
  let current = null;

  async function waitForStatus(label, timeout) {{
    const indicator = page.getByText(label).first();
    await indicator.waitFor({{ state: "attached", timeout }});
    await expect(indicator).toBeVisible();
  }}

  try {{
"#,
            timeout = self.default_timeout_ms,
            marker = js_str(MARKER_PREFIX),
            browser = self.browser.as_str(),
            headless = self.headless,
            slow_mo = self.slow_mo_ms,
        ));

        for (index, step) in scenario.steps.iter().enumerate() {
            script.push_str(&format!(
                "\n    current = {index};\n    mark({{ event: \"step\", index: {index}, name: {name} }});\n",
                index = index,
                name = js_str(&step.name()),
            ));
            script.push_str(&self.step_to_js(step, index));
            script.push('\n');
        }

        script.push_str(
            r#"
    mark({ event: "finished" });
  } catch (error) {
    mark({ event: "failed", index: current, error: String((error && error.message) || error) });
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// JavaScript for one step
    fn step_to_js(&self, step: &Step, index: usize) -> String {
        match step {
            Step::Goto {
                url,
                wait_until,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
                format!(
                    "    await page.goto({}, {{ waitUntil: {}, timeout: {} }});",
                    js_str(url),
                    js_str(wait_until.as_str()),
                    timeout
                )
            }
            Step::Click { target } => format!("    await {}.click();", target.to_js("page")),
            Step::ClickAndWaitForNavigation { target } => format!(
                "    await Promise.all([page.waitForNavigation(), {}.click()]);",
                target.to_js("page")
            ),
            Step::Fill { target, value } => {
                format!("    await {}.fill({});", target.to_js("page"), js_str(value))
            }
            Step::Clear { target } => format!("    await {}.clear();", target.to_js("page")),
            Step::Press { target, key } => {
                format!("    await {}.press({});", target.to_js("page"), js_str(key))
            }
            Step::Check { target } => format!("    await {}.check();", target.to_js("page")),
            Step::WaitFor {
                target,
                state,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
                format!(
                    "    await {}.waitFor({{ state: {}, timeout: {} }});",
                    target.to_js("page"),
                    js_str(state.as_str()),
                    timeout
                )
            }
            Step::ExpectVisible { target } => {
                format!("    await expect({}).toBeVisible();", target.to_js("page"))
            }
            Step::ExpectHidden { target } => {
                format!("    await expect({}).not.toBeVisible();", target.to_js("page"))
            }
            Step::ExpectText { target, contains } => format!(
                "    await expect({}).toContainText({});",
                target.to_js("page"),
                js_str(contains)
            ),
            Step::WaitForStatus { status, timeout_ms } => {
                let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
                format!(
                    "    await waitForStatus({}, {});",
                    js_str(status.label()),
                    timeout
                )
            }
            Step::EnsureVisible { target, fallback } => format!(
                r#"    try {{
      await expect({target}).toBeVisible();
    }} catch (error) {{
      mark({{ event: "fallback", index: {index}, message: String((error && error.message) || error) }});
      await {fallback}.click();
    }}"#,
                target = target.to_js("page"),
                index = index,
                fallback = fallback.to_js("page"),
            ),
            Step::Screenshot { checkpoint } => {
                let path = self.results_dir.join(checkpoint.file_name());
                format!(
                    "    await page.screenshot({{ path: {} }});",
                    js_str(&path.to_string_lossy())
                )
            }
            Step::Log { message } => format!("    console.log({});", js_str(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{BuildStatus, EnvironmentName};
    use crate::locator::Locator;
    use crate::step::{Checkpoint, LoadState, WaitState};

    fn scenario(steps: Vec<Step>) -> Scenario {
        Scenario {
            name: "t".to_string(),
            description: String::new(),
            environment: serde_json::from_str("\"test_env_1\"").unwrap(),
            steps,
        }
    }

    fn render(step: Step) -> String {
        ScriptBuilder::new(&UxConfig::default()).step_to_js(&step, 0)
    }

    #[test]
    fn test_header_reflects_config() {
        let config = UxConfig::default().manual();
        let script = ScriptBuilder::new(&config).build(&scenario(vec![]));
        assert!(script.contains("chromium.launch({ headless: false, slowMo: 500 })"));
        assert!(script.contains("const DEFAULT_TIMEOUT = 60000;"));
        assert!(script.contains(r#"mark({ event: "finished" });"#));
        assert!(script.contains("await browser.close();"));
    }

    #[test]
    fn test_each_step_is_marked() {
        let steps = vec![
            Step::Click {
                target: Locator::css("text=Log in"),
            },
            Step::Log {
                message: "hello".to_string(),
            },
        ];
        let script = ScriptBuilder::new(&UxConfig::default()).build(&scenario(steps));
        assert!(script.contains(r#"mark({ event: "step", index: 0, name: "click:text=Log in" });"#));
        assert!(script.contains(r#"mark({ event: "step", index: 1, name: "log:hello" });"#));
        assert!(script.contains("current = 1;"));
    }

    #[test]
    fn test_goto() {
        let js = render(Step::Goto {
            url: "http://localhost:8000".to_string(),
            wait_until: LoadState::DomContentLoaded,
            timeout_ms: Some(240_000),
        });
        assert_eq!(
            js,
            r#"    await page.goto("http://localhost:8000", { waitUntil: "domcontentloaded", timeout: 240000 });"#
        );
    }

    #[test]
    fn test_wait_for_defaults_timeout() {
        let js = render(Step::WaitFor {
            target: Locator::button("Edit"),
            state: WaitState::Attached,
            timeout_ms: None,
        });
        assert_eq!(
            js,
            r#"    await page.getByRole("button", { name: "Edit" }).waitFor({ state: "attached", timeout: 60000 });"#
        );
    }

    #[test]
    fn test_wait_for_status() {
        let js = render(Step::WaitForStatus {
            status: BuildStatus::Completed,
            timeout_ms: Some(300_000),
        });
        assert_eq!(js, r#"    await waitForStatus("Completed", 300000);"#);
    }

    #[test]
    fn test_fill_multiline_value() {
        let js = render(Step::Fill {
            target: Locator::label("Environment name"),
            value: "a\nb \"c\"".to_string(),
        });
        assert_eq!(
            js,
            r#"    await page.getByLabel("Environment name").fill("a\nb \"c\"");"#
        );
    }

    #[test]
    fn test_ensure_visible_has_fallback() {
        let js = render(Step::EnsureVisible {
            target: Locator::link("test_env_1"),
            fallback: Locator::button("username Create"),
        });
        assert!(js.contains(r#"await expect(page.getByRole("link", { name: "test_env_1" })).toBeVisible();"#));
        assert!(js.contains(r#"event: "fallback", index: 0"#));
        assert!(js.contains(r#"await page.getByRole("button", { name: "username Create" }).click();"#));
    }

    #[test]
    fn test_screenshot_path() {
        let js = render(Step::Screenshot {
            checkpoint: Checkpoint::Authenticated,
        });
        assert_eq!(
            js,
            r#"    await page.screenshot({ path: "test-results/conda-store-authenticated.png" });"#
        );
    }

    #[test]
    fn test_expect_hidden() {
        let name: EnvironmentName = serde_json::from_str("\"test_env_9\"").unwrap();
        let js = render(Step::ExpectHidden {
            target: Locator::link(name.as_str()),
        });
        assert_eq!(
            js,
            r#"    await expect(page.getByRole("link", { name: "test_env_9" })).not.toBeVisible();"#
        );
    }
}
