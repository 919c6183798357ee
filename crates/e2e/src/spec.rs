//! Declarative test specification (Rust-built or YAML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// A complete test specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport override for the browser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate { url: String },

    /// Click an element
    Click { locator: Locator },

    /// Replace an input's value
    Fill { locator: Locator, value: String },

    /// Press a key on an element
    Press { locator: Locator, key: String },

    /// Select an option from a dropdown
    Select { locator: Locator, value: String },

    /// Assert an element's text contains a string
    ExpectText { locator: Locator, text: String },

    /// Assert an element is visible
    ExpectVisible { locator: Locator },

    /// Wait for an element to appear
    Wait {
        locator: Locator,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

impl TestStep {
    /// Short name used in step traces
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url } => format!("navigate:{}", url),
            TestStep::Click { locator } => format!("click:{}", locator),
            TestStep::Fill { locator, .. } => format!("fill:{}", locator),
            TestStep::Press { locator, key } => format!("press:{}:{}", locator, key),
            TestStep::Select { locator, value } => format!("select:{}:{}", locator, value),
            TestStep::ExpectText { locator, text } => format!("expect_text:{}:\"{}\"", locator, text),
            TestStep::ExpectVisible { locator } => format!("expect_visible:{}", locator),
            TestStep::Wait { locator, .. } => format!("wait:{}", locator),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl TestSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            viewport: None,
            steps: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml).map_err(E2eError::from)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("Test '{}' has no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> E2eResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load all test specs from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}
