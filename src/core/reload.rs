//! # Live-Reload Process
//!
//! A single dev-server child process serving component-style sources
//! (`.tsx`, `.jsx`, `.ts`, `.js`) for preview.
//!
//! Starting is idempotent: a live child is reused. Readiness is an explicit
//! check (TCP connect to the configured port) with a deadline, not a fixed
//! sleep. Stopping always kills whatever is running.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::core::error::CoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[async_trait]
pub trait LiveReload: Send + Sync {
    /// Starts the process if needed and returns the address to embed.
    async fn ensure_running(&self) -> Result<String, CoreError>;

    async fn stop(&self);
}

#[derive(Debug, Clone)]
pub struct ReloadSettings {
    /// Shell-style command line; `{port}` is replaced with `port`.
    pub command: String,
    pub port: u16,
    pub startup_timeout: Duration,
    /// Working directory, usually the first workspace root.
    pub cwd: Option<PathBuf>,
}

pub struct ReloadServer {
    settings: ReloadSettings,
    child: Mutex<Option<Child>>,
}

impl ReloadServer {
    pub fn new(settings: ReloadSettings) -> Self {
        Self {
            settings,
            child: Mutex::new(None),
        }
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.settings.port)
    }

    fn spawn(&self) -> Result<Child, CoreError> {
        let line = self
            .settings
            .command
            .replace("{port}", &self.settings.port.to_string());
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| CoreError::ReloadServer("preview command is empty".into()))?;

        let mut command = Command::new(program);
        command
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.settings.cwd {
            command.current_dir(cwd);
        }

        info!("Starting live-reload server: {}", line);
        command
            .spawn()
            .map_err(|e| CoreError::ReloadServer(format!("failed to start `{line}`: {e}")))
    }

    async fn wait_ready(&self) -> Result<(), CoreError> {
        let port = self.settings.port;
        let accepting = async {
            loop {
                if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                    return;
                }
                debug!("Live-reload server not ready on port {}", port);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(self.settings.startup_timeout, accepting)
            .await
            .map_err(|_| {
                CoreError::ReloadServer(format!(
                    "not ready on port {port} after {:?}",
                    self.settings.startup_timeout
                ))
            })
    }
}

#[async_trait]
impl LiveReload for ReloadServer {
    async fn ensure_running(&self) -> Result<String, CoreError> {
        let mut child = self.child.lock().await;

        if let Some(running) = child.as_mut() {
            match running.try_wait() {
                Ok(None) => return Ok(self.url()),
                Ok(Some(status)) => warn!("Live-reload server exited ({}), restarting", status),
                Err(e) => warn!("Could not poll live-reload server: {}", e),
            }
            *child = None;
        }

        let mut spawned = self.spawn()?;
        if let Err(e) = self.wait_ready().await {
            let _ = spawned.kill().await;
            return Err(e);
        }
        info!("Live-reload server ready at {}", self.url());
        *child = Some(spawned);
        Ok(self.url())
    }

    async fn stop(&self) {
        if let Some(mut running) = self.child.lock().await.take() {
            match running.kill().await {
                Ok(()) => info!("Live-reload server stopped"),
                Err(e) => warn!("Failed to stop live-reload server: {}", e),
            }
        }
    }
}
