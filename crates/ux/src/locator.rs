//! Typed Playwright locators
//!
//! A `Locator` describes how to find an element the way a user would: by
//! role and accessible name, label, placeholder, visible text or test id.
//! It renders to a Playwright locator expression rooted at `page`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Raw Playwright selector, e.g. `text=Log in`
    Css { selector: String },

    /// Element containing the given text
    Text {
        text: String,
        #[serde(default)]
        exact: bool,
    },

    /// Form control by its associated label
    Label {
        label: String,
        #[serde(default)]
        exact: bool,
    },

    /// Input by its placeholder
    Placeholder { placeholder: String },

    /// ARIA role with an optional accessible name
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },

    /// `data-testid` attribute
    TestId { id: String },

    /// `child` searched inside `parent`
    Within {
        parent: Box<Locator>,
        child: Box<Locator>,
    },

    /// Narrow `inner` to elements containing `text`
    HasText { inner: Box<Locator>, text: String },

    /// First match of `inner`
    First { inner: Box<Locator> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Locator::Label {
            label: label.into(),
            exact: false,
        }
    }

    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Locator::Placeholder {
            placeholder: placeholder.into(),
        }
    }

    /// Role without a name filter
    pub fn role(role: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: None,
            exact: false,
        }
    }

    /// Role filtered by accessible name (substring match unless `exact`)
    pub fn named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::named("button", name)
    }

    pub fn link(name: impl Into<String>) -> Self {
        Self::named("link", name)
    }

    pub fn option(name: impl Into<String>) -> Self {
        Self::named("option", name)
    }

    pub fn row(name: impl Into<String>) -> Self {
        Self::named("row", name)
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId { id: id.into() }
    }

    /// Require an exact match. Only text, label and named-role locators
    /// carry the flag; other locators are returned unchanged.
    pub fn exact(self) -> Self {
        match self {
            Locator::Text { text, .. } => Locator::Text { text, exact: true },
            Locator::Label { label, .. } => Locator::Label { label, exact: true },
            Locator::Role { role, name, .. } => Locator::Role {
                role,
                name,
                exact: true,
            },
            other => other,
        }
    }

    /// Search for `child` inside this locator
    pub fn locate(self, child: Locator) -> Self {
        Locator::Within {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }

    pub fn has_text(self, text: impl Into<String>) -> Self {
        Locator::HasText {
            inner: Box::new(self),
            text: text.into(),
        }
    }

    pub fn first(self) -> Self {
        Locator::First {
            inner: Box::new(self),
        }
    }

    /// Render as a Playwright expression rooted at `root` (usually `page`)
    pub fn to_js(&self, root: &str) -> String {
        match self {
            Locator::Css { selector } => format!("{}.locator({})", root, js_str(selector)),
            Locator::Text { text, exact } => {
                format!("{}.getByText({}{})", root, js_str(text), exact_opt(*exact))
            }
            Locator::Label { label, exact } => {
                format!("{}.getByLabel({}{})", root, js_str(label), exact_opt(*exact))
            }
            Locator::Placeholder { placeholder } => {
                format!("{}.getByPlaceholder({})", root, js_str(placeholder))
            }
            Locator::Role { role, name, exact } => match name {
                Some(name) if *exact => format!(
                    "{}.getByRole({}, {{ name: {}, exact: true }})",
                    root,
                    js_str(role),
                    js_str(name)
                ),
                Some(name) => format!(
                    "{}.getByRole({}, {{ name: {} }})",
                    root,
                    js_str(role),
                    js_str(name)
                ),
                None => format!("{}.getByRole({})", root, js_str(role)),
            },
            Locator::TestId { id } => format!("{}.getByTestId({})", root, js_str(id)),
            Locator::Within { parent, child } => child.to_js(&parent.to_js(root)),
            Locator::HasText { inner, text } => {
                format!("{}.filter({{ hasText: {} }})", inner.to_js(root), js_str(text))
            }
            Locator::First { inner } => format!("{}.first()", inner.to_js(root)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => write!(f, "{}", selector),
            Locator::Text { text, .. } => write!(f, "text={:?}", text),
            Locator::Label { label, .. } => write!(f, "label={:?}", label),
            Locator::Placeholder { placeholder } => write!(f, "placeholder={:?}", placeholder),
            Locator::Role {
                role,
                name: Some(name),
                ..
            } => write!(f, "{}[name={:?}]", role, name),
            Locator::Role { role, name: None, .. } => write!(f, "{}", role),
            Locator::TestId { id } => write!(f, "testid={}", id),
            Locator::Within { parent, child } => write!(f, "{} >> {}", parent, child),
            Locator::HasText { inner, text } => write!(f, "{}:has-text({:?})", inner, text),
            Locator::First { inner } => write!(f, "{} >> nth=0", inner),
        }
    }
}

/// Quote a string as a JavaScript literal
pub fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn exact_opt(exact: bool) -> &'static str {
    if exact {
        ", { exact: true }"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Locator::css("text=Log in"), r#"page.locator("text=Log in")"#; "css")]
    #[test_case(Locator::text("Completed"), r#"page.getByText("Completed")"#; "text")]
    #[test_case(Locator::label("Enter package"), r#"page.getByLabel("Enter package")"#; "label")]
    #[test_case(Locator::label("YAML").exact(), r#"page.getByLabel("YAML", { exact: true })"#; "exact label")]
    #[test_case(Locator::button("Save"), r#"page.getByRole("button", { name: "Save" })"#; "button")]
    #[test_case(Locator::button("Create").exact(), r#"page.getByRole("button", { name: "Create", exact: true })"#; "exact button")]
    #[test_case(Locator::role("textbox"), r#"page.getByRole("textbox")"#; "bare role")]
    #[test_case(Locator::test_id("build-status"), r#"page.getByTestId("build-status")"#; "test id")]
    fn test_render(locator: Locator, expected: &str) {
        assert_eq!(locator.to_js("page"), expected);
    }

    #[test]
    fn test_render_chain() {
        let editor = Locator::test_id("yaml-editor")
            .locate(Locator::role("textbox"))
            .has_text("variables: {}");
        assert_eq!(
            editor.to_js("page"),
            r#"page.getByTestId("yaml-editor").getByRole("textbox").filter({ hasText: "variables: {}" })"#
        );

        let version = Locator::row("rich").locate(Locator::role("button")).first();
        assert_eq!(
            version.to_js("page"),
            r#"page.getByRole("row", { name: "rich" }).getByRole("button").first()"#
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let locator = Locator::css(r#"button:has-text("Sign In")"#);
        assert_eq!(
            locator.to_js("page"),
            r#"page.locator("button:has-text(\"Sign In\")")"#
        );
        assert_eq!(js_str("it's\n"), r#""it's\n""#);
    }

    #[test]
    fn test_exact_ignored_for_test_id() {
        assert_eq!(Locator::test_id("x").exact(), Locator::test_id("x"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::button("Save").to_string(), r#"button[name="Save"]"#);
        assert_eq!(
            Locator::row("rich").locate(Locator::test_id("RemovePackageTest")).to_string(),
            r#"row[name="rich"] >> testid=RemovePackageTest"#
        );
    }
}
