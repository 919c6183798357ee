//! Frontend management - spawning and health checking the app under test

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to the frontend, either spawned by us or already running
pub struct ServerHandle {
    child: Option<Child>,
    pub base_url: String,
}

impl ServerHandle {
    /// Spawn the configured frontend command, or attach to `base_url`
    /// when none is configured, then wait until it answers.
    pub async fn start(config: ServerConfig) -> E2eResult<Self> {
        let handle = match &config.command {
            Some(command) => Self::spawn(&config, command)?,
            None => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                info!("Using running frontend at {}", base_url);
                ServerHandle { child: None, base_url }
            }
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Frontend is healthy at {}", handle.base_url);
        Ok(handle)
    }

    fn spawn(config: &ServerConfig, command: &[String]) -> E2eResult<Self> {
        let plan = SpawnPlan::new(config, command)?;

        info!("Spawning frontend `{} {}` for {}", plan.program, plan.args.join(" "), plan.base_url);

        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .env("PORT", plan.port.to_string())
            .env("BROWSER", "none");

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::null()).stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", plan.program, e))
        })?;

        Ok(ServerHandle {
            child: Some(child),
            base_url: plan.base_url,
        })
    }

    /// Wait for the frontend to serve its index page
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for frontend to start...");
                    }
                    // Connection refused is expected while the dev server boots
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this frontend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the frontend if we started it
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping frontend (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Where the frontend listens when nothing else is configured (Vite's default)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5173";

/// Configuration for the frontend under test
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Command to start the frontend (None = already running at base_url)
    pub command: Option<Vec<String>>,

    /// Working directory for the command
    pub working_dir: Option<PathBuf>,

    /// Where the frontend listens. A spawned command without one is given
    /// a free port through `PORT` and `port_args`.
    pub base_url: Option<String>,

    /// Appended to the command when we pick the port; `{port}` is replaced
    pub port_args: Vec<String>,

    /// Timeout for startup
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: None,
            working_dir: None,
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            port_args: vec!["--".to_string(), "--port".to_string(), "{port}".to_string()],
            startup_timeout: Duration::from_secs(60),
        }
    }
}

/// Resolved program, arguments and address for a spawned frontend
#[derive(Debug, PartialEq)]
struct SpawnPlan {
    program: String,
    args: Vec<String>,
    port: u16,
    base_url: String,
}

impl SpawnPlan {
    fn new(config: &ServerConfig, command: &[String]) -> E2eResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty frontend command".to_string()))?;
        let mut args = args.to_vec();

        let (port, base_url) = match &config.base_url {
            Some(base_url) => (url_port(base_url)?, base_url.clone()),
            None => {
                let port = find_free_port()?;
                let port_str = port.to_string();
                args.extend(config.port_args.iter().map(|a| a.replace("{port}", &port_str)));
                (port, format!("http://127.0.0.1:{}", port))
            }
        };

        Ok(Self {
            program: program.clone(),
            args,
            port,
            base_url,
        })
    }
}

fn url_port(base_url: &str) -> E2eResult<u16> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| E2eError::ServerStartup(format!("Invalid base URL {}: {}", base_url, e)))?;
    url.port_or_known_default()
        .ok_or_else(|| E2eError::ServerStartup(format!("No port in base URL {}", base_url)))
}

/// Split a shell-style command line on whitespace.
pub fn parse_command(line: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
