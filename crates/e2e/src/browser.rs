//! Chrome automation over the DevTools protocol

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use pizza_common::MockRouter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::intercept::{Exchange, Interceptor};
use crate::locator::{helper_expression, Locator, Resolution};

/// Default timeout for auto-waiting (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Polling interval while auto-waiting
pub const POLL_INTERVAL_MS: u64 = 50;

/// How long requests triggered by the last step get to arrive
pub const SETTLE_MS: u64 = 500;

/// Browser launch and interaction settings
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Chrome/Chromium executable (None = auto-detect)
    pub chrome_executable: Option<PathBuf>,

    pub headless: bool,

    /// Pass --no-sandbox (needed in most containers)
    pub no_sandbox: bool,

    /// Viewport dimensions
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Auto-wait timeout for locators and assertions
    pub timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            chrome_executable: None,
            headless: true,
            no_sandbox: false,
            viewport_width: 1280,
            viewport_height: 720,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Join a path onto the base URL; absolute URLs pass through.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("about:") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// One browser with one page
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    interceptor: Option<Interceptor>,
    config: BrowserConfig,
    marks: AtomicU64,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page, installing `routes` before
    /// anything is loaded.
    pub async fn launch(config: BrowserConfig, routes: Option<MockRouter>) -> E2eResult<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.timeout.max(Duration::from_secs(30)));
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(E2eError::Launch)?;

        info!("Launching browser (headless: {})", config.headless);
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| E2eError::Launch(e.to_string()))?;

        // The connection stalls unless CDP events are drained
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        let interceptor = match routes {
            Some(router) if !router.is_empty() => Some(Interceptor::install(page.clone(), router).await?),
            _ => None,
        };

        Ok(Self {
            browser,
            page,
            handler,
            interceptor,
            config,
            marks: AtomicU64::new(0),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Intercepted requests so far
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.interceptor.as_ref().map(|i| i.exchanges()).unwrap_or_default()
    }

    /// Surface any queued mock route failure.
    pub fn check_routes(&self) -> E2eResult<()> {
        match &self.interceptor {
            Some(interceptor) => interceptor.check(),
            None => Ok(()),
        }
    }

    fn next_mark(&self) -> String {
        format!("m{}", self.marks.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = resolve_url(&self.config.base_url, path);
        debug!("Navigating to {}", url);
        self.page.goto(url.as_str()).await?;
        self.page.wait_for_navigation().await?;
        self.check_routes()
    }

    async fn try_resolve(&self, locator: &Locator, mark: &str, has_text: Option<&str>, require_visible: bool) -> E2eResult<Resolution> {
        let expr = locator.resolve_expression(mark, has_text, require_visible)?;
        let resolution: Resolution = self.page.evaluate(expr).await?.into_value()?;
        Ok(resolution)
    }

    /// Poll until `locator` resolves, returning the mark it was tagged with.
    async fn wait_for_match(
        &self,
        locator: &Locator,
        has_text: Option<&str>,
        require_visible: bool,
        timeout: Duration,
    ) -> Result<String, (E2eError, Option<Resolution>)> {
        let deadline = Instant::now() + timeout;
        let mut last: Option<Resolution> = None;

        loop {
            self.check_routes().map_err(|e| (e, None))?;

            let mark = self.next_mark();
            match self.try_resolve(locator, &mark, has_text, require_visible).await {
                Ok(res) if res.found && (res.visible || !require_visible) => return Ok(mark),
                Ok(res) => last = Some(res),
                // The document may be mid-navigation
                Err(e) => debug!("Resolving {} failed, retrying: {}", locator, e),
            }

            if Instant::now() >= deadline {
                return Err((E2eError::Timeout(locator.to_string()), last));
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    async fn element(&self, locator: &Locator) -> E2eResult<(String, Element)> {
        let mark = self
            .wait_for_match(locator, None, true, self.config.timeout)
            .await
            .map_err(|(e, _)| e)?;
        let element = self
            .page
            .find_element(Locator::mark_selector(&mark))
            .await
            .map_err(|_| E2eError::ElementNotFound(locator.to_string()))?;
        Ok((mark, element))
    }

    pub async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let (_, element) = self.element(locator).await?;
        element.click().await?;
        self.check_routes()
    }

    /// Replace the value of an input, firing input and change events.
    pub async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let (mark, element) = self.element(locator).await?;
        element.focus().await?;
        let filled: bool = self.page.evaluate(helper_expression("fill", &mark, value)?).await?.into_value()?;
        if !filled {
            return Err(E2eError::StepFailed {
                step: format!("fill:{}", locator),
                reason: "element did not accept a value".to_string(),
            });
        }
        self.check_routes()
    }

    /// Press a key (e.g. `Tab`, `Enter`) with the element focused.
    pub async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        let (_, element) = self.element(locator).await?;
        element.press_key(key).await?;
        self.check_routes()
    }

    /// Choose an option by value or visible label.
    pub async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let (mark, _) = self.element(locator).await?;
        let selected: bool = self
            .page
            .evaluate(helper_expression("selectOption", &mark, value)?)
            .await?
            .into_value()?;
        if !selected {
            return Err(E2eError::StepFailed {
                step: format!("select:{}", locator),
                reason: format!("no option with value or label '{}'", value),
            });
        }
        self.check_routes()
    }

    /// Wait until the located element's text contains `expected`.
    pub async fn expect_text(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        match self.wait_for_match(locator, Some(expected), false, self.config.timeout).await {
            Ok(_) => Ok(()),
            Err((E2eError::Timeout(_), last)) => {
                let got = last.and_then(|r| r.text).unwrap_or_else(|| "<no element>".to_string());
                Err(E2eError::AssertionFailed(format!(
                    "expected {} to contain text \"{}\", got \"{}\"",
                    locator, expected, got
                )))
            }
            Err((e, _)) => Err(e),
        }
    }

    pub async fn expect_visible(&self, locator: &Locator) -> E2eResult<()> {
        match self.wait_for_match(locator, None, true, self.config.timeout).await {
            Ok(_) => Ok(()),
            Err((E2eError::Timeout(_), last)) => Err(E2eError::AssertionFailed(format!(
                "expected {} to be visible ({} match(es), none visible)",
                locator,
                last.map(|r| r.count).unwrap_or(0)
            ))),
            Err((e, _)) => Err(e),
        }
    }

    /// Wait for an element without asserting on it.
    pub async fn wait_for(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.wait_for_match(locator, None, true, timeout)
            .await
            .map(|_| ())
            .map_err(|(e, _)| e)
    }

    /// Poll for route failures for `duration`, so a request fired by the
    /// last action still fails the test.
    pub async fn settle(&self, duration: Duration) -> E2eResult<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check_routes()?;
            if Instant::now() >= deadline {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    pub async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(full_page).build(), path)
            .await?;
        Ok(path.to_path_buf())
    }

    /// Close the browser and stop background tasks.
    pub async fn close(mut self) -> E2eResult<()> {
        self.interceptor.take();
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("http://127.0.0.1:5173", "/"), "http://127.0.0.1:5173/");
        assert_eq!(resolve_url("http://127.0.0.1:5173/", "/docs"), "http://127.0.0.1:5173/docs");
        assert_eq!(resolve_url("http://127.0.0.1:5173", "no-exist"), "http://127.0.0.1:5173/no-exist");
        assert_eq!(resolve_url("http://a", "https://b/x"), "https://b/x");
    }

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }
}
