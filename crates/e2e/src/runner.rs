//! Main test runner that orchestrates the frontend, the browser and the mock routes

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, error, debug};

use crate::browser::{BrowserConfig, BrowserSession, SETTLE_MS};
use crate::error::{E2eError, E2eResult};
use crate::intercept::Exchange;
use crate::scenario;
use crate::server::{ServerConfig, ServerHandle};
use crate::spec::{TestSpec, TestStep};

/// Outcome of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    /// Requests seen by the interceptor
    pub exchanges: Vec<Exchange>,
    pub error: Option<String>,
}

impl TestResult {
    fn errored(name: &str, error: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            steps: vec![],
            exchanges: vec![],
            error: Some(error.to_string()),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    /// Frontend configuration
    server_config: ServerConfig,

    /// Browser configuration
    browser_config: BrowserConfig,

    /// Frontend handle (if started)
    server: Option<ServerHandle>,

    /// Extra YAML specs
    specs_dir: Option<PathBuf>,

    /// Output directory for results
    output_dir: PathBuf,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            server_config: config.server,
            browser_config: config.browser,
            server: None,
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
        }
    }

    /// Start (or attach to) the frontend
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        let server = ServerHandle::start(self.server_config.clone()).await?;

        // Point the browser at wherever the frontend actually listens
        self.browser_config.base_url = server.base_url().to_string();

        self.server = Some(server);
        Ok(())
    }

    /// Stop the frontend
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// The built-in scenario followed by any YAML specs
    pub fn specs(&self) -> E2eResult<Vec<TestSpec>> {
        let mut specs = vec![scenario::purchase_with_login()];
        if let Some(dir) = &self.specs_dir {
            specs.extend(TestSpec::load_all(dir)?);
        }
        Ok(specs)
    }

    /// Run every known test
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = self.specs()?;
        self.run_specs(&specs).await
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = self.specs()?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_specs(&filtered).await
    }

    /// Run a specific test by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<TestResult> {
        let spec = self
            .specs()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.start_server().await?;
        self.run_spec(&spec).await
    }

    /// Run a list of test specs
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        // Ensure the frontend is up
        self.start_server().await?;

        info!("Running {} test(s)...", specs.len());

        for spec in specs {
            let result = match self.run_spec(spec).await {
                Ok(result) => result,
                Err(e) => TestResult::errored(&spec.name, &e),
            };
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(TestSuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single test spec in a fresh browser
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<TestResult> {
        let start = Instant::now();
        debug!("Running test: {}", spec.name);

        let mut config = self.browser_config.clone();
        if let Some(viewport) = &spec.viewport {
            config.viewport_width = viewport.width;
            config.viewport_height = viewport.height;
        }

        let session = BrowserSession::launch(config, Some(scenario::pizza_routes()?)).await?;

        let mut step_results = Vec::new();
        let mut test_error: Option<String> = None;

        for step in &spec.steps {
            let result = self.execute_step(&session, spec, step).await;

            if !result.success {
                test_error = result.error.clone();
                step_results.push(result);
                break; // Stop on first failure
            }

            step_results.push(result);
        }

        if test_error.is_none() {
            let settle_start = Instant::now();
            if let Err(e) = session.settle(Duration::from_millis(SETTLE_MS)).await {
                test_error = Some(e.to_string());
                step_results.push(StepResult {
                    success: false,
                    step_name: "settle".to_string(),
                    duration_ms: settle_start.elapsed().as_millis() as u64,
                    error: test_error.clone(),
                    screenshot_path: None,
                });
            }
        }

        if let (Some(_), Some(last)) = (&test_error, step_results.last_mut()) {
            let path = self.screenshot_path(&spec.name, "failure");
            match session.screenshot(&path, true).await {
                Ok(path) => last.screenshot_path = Some(path),
                Err(e) => warn!("Could not capture failure screenshot: {}", e),
            }
        }

        let exchanges = session.exchanges();
        session.close().await?;

        Ok(TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            exchanges,
            error: test_error,
        })
    }

    /// Execute one step against the session
    async fn execute_step(&self, session: &BrowserSession, spec: &TestSpec, step: &TestStep) -> StepResult {
        let start = Instant::now();
        let step_name = step.name();

        debug!("Executing step: {}", step_name);

        let result = match step {
            TestStep::Navigate { url } => session.goto(url).await.map(|_| None),
            TestStep::Click { locator } => session.click(locator).await.map(|_| None),
            TestStep::Fill { locator, value } => session.fill(locator, value).await.map(|_| None),
            TestStep::Press { locator, key } => session.press(locator, key).await.map(|_| None),
            TestStep::Select { locator, value } => {
                session.select_option(locator, value).await.map(|_| None)
            }
            TestStep::ExpectText { locator, text } => {
                session.expect_text(locator, text).await.map(|_| None)
            }
            TestStep::ExpectVisible { locator } => session.expect_visible(locator).await.map(|_| None),
            TestStep::Wait { locator, timeout_ms } => session
                .wait_for(locator, Duration::from_millis(*timeout_ms))
                .await
                .map(|_| None),
            TestStep::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                session.check_routes().map(|_| None)
            }
            TestStep::Screenshot { name, full_page } => {
                let path = self.screenshot_path(&spec.name, name);
                session.screenshot(&path, *full_page).await.map(Some)
            }
            TestStep::Log { message } => {
                info!("[{}] {}", spec.name, message);
                Ok(None)
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(screenshot_path) => StepResult {
                success: true,
                step_name,
                duration_ms,
                error: None,
                screenshot_path,
            },
            Err(e) => StepResult {
                success: false,
                step_name,
                duration_ms,
                error: Some(e.to_string()),
                screenshot_path: None,
            },
        }
    }

    fn screenshot_path(&self, test: &str, name: &str) -> PathBuf {
        self.output_dir
            .join("screenshots")
            .join(format!("{}-{}.png", file_stem(test), file_stem(name)))
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Write `test-results.json` into `output_dir`
pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Lowercase, dash separated name safe for file systems
fn file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub specs_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            browser: BrowserConfig::default(),
            specs_dir: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("purchase with login"), "purchase-with-login");
        assert_eq!(file_stem("Pay: now!"), "pay-now");
    }

    #[test]
    fn test_specs_include_builtin_scenario_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("docs.yaml"),
            "name: docs\ntags: [smoke]\nsteps:\n  - action: navigate\n    url: /docs\n",
        )
        .unwrap();

        let runner = TestRunner::with_config(RunnerConfig {
            specs_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let specs = runner.specs().unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![scenario::PURCHASE_WITH_LOGIN, "docs"]);
        assert_eq!(TestSpec::filter_by_tag(&specs, "smoke").len(), 2);
    }

    #[test]
    fn test_screenshot_path() {
        let runner = TestRunner::with_config(RunnerConfig {
            output_dir: PathBuf::from("out"),
            ..Default::default()
        });
        assert_eq!(
            runner.screenshot_path("purchase with login", "failure"),
            PathBuf::from("out/screenshots/purchase-with-login-failure.png")
        );
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let suite = TestSuiteResult {
            total: 1,
            passed: 0,
            failed: 1,
            duration_ms: 12,
            results: vec![TestResult {
                name: "purchase with login".to_string(),
                success: false,
                duration_ms: 12,
                steps: vec![StepResult {
                    success: false,
                    step_name: "click:role=button[name=\"Create\"]".to_string(),
                    duration_ms: 3,
                    error: Some("Mock route failed".to_string()),
                    screenshot_path: None,
                }],
                exchanges: vec![Exchange {
                    method: "POST".to_string(),
                    url: "http://localhost:5173/api/franchise".to_string(),
                    mocked: true,
                    status: None,
                    error: Some("Unexpected method".to_string()),
                }],
                error: Some("Mock route failed".to_string()),
            }],
        };
        assert!(!suite.success());

        let path = write_results(dir.path(), &suite).unwrap();
        let written: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.failed, 1);
        assert_eq!(written.results[0].exchanges[0].method, "POST");
    }
}
