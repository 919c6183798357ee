//! Locators: lazy descriptions of how to find an element
//!
//! A locator is resolved inside the page by `locator.js`, which computes
//! implicit ARIA roles and accessible names the way assistive technology
//! (and browser test tooling) does. The first visible match is tagged
//! with a `data-pizza-e2e` attribute so the driver can address it by CSS
//! for trusted input events.

use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// In-page resolver installed on every evaluation
pub const LOCATOR_JS: &str = include_str!("locator.js");

pub const MARK_ATTR: &str = "data-pizza-e2e";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// Plain CSS selector
    Css { css: String },

    /// ARIA role, optionally filtered by accessible name (case-insensitive
    /// substring)
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Input or textarea by placeholder
    Placeholder { placeholder: String },

    /// Innermost element whose text contains the string
    Text { text: String },

    /// Element labelled by `aria-label`, `aria-labelledby` or `<label>`
    Label { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    pub selector: Selector,

    /// Restrict matches to descendants of this locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Box<Locator>>,
}

impl Locator {
    fn from_selector(selector: Selector) -> Self {
        Self { selector, within: None }
    }

    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: None,
        })
    }

    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self::from_selector(Selector::Placeholder {
            placeholder: placeholder.into(),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text { text: text.into() })
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label { label: label.into() })
    }

    /// Accessible name filter; only meaningful on role locators.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        if let Selector::Role { name: ref mut slot, .. } = self.selector {
            *slot = Some(name.into());
        }
        self
    }

    /// Scope this locator to descendants of `parent`.
    pub fn within(mut self, parent: Locator) -> Self {
        self.within = Some(Box::new(parent));
        self
    }

    /// JavaScript expression resolving this locator and tagging the match
    /// with `mark`.
    pub fn resolve_expression(&self, mark: &str, has_text: Option<&str>, require_visible: bool) -> E2eResult<String> {
        let spec = serde_json::to_string(self)?;
        let opts = serde_json::json!({
            "hasText": has_text,
            "requireVisible": require_visible,
        });
        Ok(format!(
            "(function() {{\n{}\nreturn window.__pizzaE2e.resolve({}, {}, {});\n}})()",
            LOCATOR_JS,
            spec,
            serde_json::to_string(mark)?,
            opts
        ))
    }

    /// CSS selector for the element tagged with `mark`.
    pub fn mark_selector(mark: &str) -> String {
        format!("[{}=\"{}\"]", MARK_ATTR, mark)
    }
}

/// Expression running one of the resolver's value helpers against a
/// tagged element.
pub(crate) fn helper_expression(helper: &str, mark: &str, value: &str) -> E2eResult<String> {
    Ok(format!(
        "(function() {{\n{}\nreturn window.__pizzaE2e.{}({}, {});\n}})()",
        LOCATOR_JS,
        helper,
        serde_json::to_string(mark)?,
        serde_json::to_string(value)?
    ))
}

/// What `locator.js` reports back for a resolution attempt
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolution {
    pub found: bool,
    pub visible: bool,
    pub count: usize,
    #[serde(default)]
    pub text: Option<String>,
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(parent) = &self.within {
            write!(f, "{} >> ", parent)?;
        }
        match &self.selector {
            Selector::Css { css } => write!(f, "css={}", css),
            Selector::Role { role, name: Some(name) } => write!(f, "role={}[name=\"{}\"]", role, name),
            Selector::Role { role, name: None } => write!(f, "role={}", role),
            Selector::Placeholder { placeholder } => write!(f, "placeholder=\"{}\"", placeholder),
            Selector::Text { text } => write!(f, "text=\"{}\"", text),
            Selector::Label { label } => write!(f, "label=\"{}\"", label),
        }
    }
}
