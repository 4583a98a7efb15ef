//! Spawning the bundled Java gateway and deriving its readiness.
//!
//! Readiness has two independent signals raced against each other: a scan of
//! the child's stdout for the gateway's "server is up" log lines, and an
//! HTTPS polling loop against the target port. Whichever fires first wins;
//! if neither fires within the budget the launch fails, but the spawned
//! process is left running (it may still come up and be adopted later).

mod output;

pub use output::OutputRing;

use crate::classify::classify_as_ready;
use crate::config::{ConfigVariant, GatewayInstall};
use crate::error::{Error, Result};
use crate::healthcheck::{poll_until_ready, HealthChecker};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

/// Gateway entry point class on the classpath.
const GATEWAY_MAIN_CLASS: &str = "ibgroup.web.core.clientportal.gw.GatewayStart";

/// Readiness polling cadence: one probe per second, ~30 attempts.
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lines of child output retained for diagnostics.
const OUTPUT_RING_LINES: usize = 500;

/// Called once when the spawned gateway exits (or its wait fails). The hook
/// runs on a detached task and may fire after the launch call has already
/// returned ready; the manager uses it to downgrade its readiness flag.
pub type ExitHook = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a locally spawned gateway.
///
/// Dropping this handle never terminates the process; the gateway is a
/// shared host-scoped resource that outlives any one client.
#[derive(Debug, Clone)]
pub struct GatewayProcess {
    pid: Option<u32>,
    output: OutputRing,
}

impl GatewayProcess {
    /// Assemble a handle from parts; alternative launcher implementations
    /// (including test fakes) build their handles through this.
    pub fn new(pid: Option<u32>, output: OutputRing) -> Self {
        Self { pid, output }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Tail of the child's combined stdout/stderr.
    pub fn recent_output(&self) -> Vec<String> {
        self.output.recent()
    }
}

/// Spawns a gateway on a port and waits for it to become ready.
#[async_trait]
pub trait GatewayLauncher: Send + Sync {
    async fn launch(
        &self,
        port: u16,
        conf: ConfigVariant,
        on_exit: ExitHook,
    ) -> Result<GatewayProcess>;
}

/// Production launcher: bundled JRE + the gateway's fixed classpath.
pub struct JavaGatewayLauncher {
    install: GatewayInstall,
    checker: Arc<dyn HealthChecker>,
}

impl JavaGatewayLauncher {
    pub fn new(install: GatewayInstall, checker: Arc<dyn HealthChecker>) -> Self {
        Self { install, checker }
    }

    /// JVM arguments up to and including the `--conf` flag. The classpath is
    /// the config dir, the router jar, and the runtime library glob; the
    /// flags keep the JVM off the network DNS resolver, on IPv4, headless,
    /// and inside a bounded heap.
    fn jvm_args(install: &GatewayInstall, conf: ConfigVariant) -> Vec<String> {
        let sep = if cfg!(windows) { ";" } else { ":" };
        let classpath = [
            install.conf_dir().display().to_string(),
            install.jar().display().to_string(),
            format!("{}/*", install.runtime_lib_dir().display()),
        ]
        .join(sep);

        vec![
            "-server".to_string(),
            "-Dvertx.disableDnsResolver=true".to_string(),
            "-Djava.net.preferIPv4Stack=true".to_string(),
            "-Djava.awt.headless=true".to_string(),
            "-Xmx512m".to_string(),
            "-cp".to_string(),
            classpath,
            GATEWAY_MAIN_CLASS.to_string(),
            "--conf".to_string(),
            conf.conf_arg(),
        ]
    }
}

#[async_trait]
impl GatewayLauncher for JavaGatewayLauncher {
    async fn launch(
        &self,
        port: u16,
        conf: ConfigVariant,
        on_exit: ExitHook,
    ) -> Result<GatewayProcess> {
        let java = self.install.runtime_java()?;
        let args = Self::jvm_args(&self.install, conf);

        tracing::info!(
            "Launching gateway on port {} via {} (conf: {})",
            port,
            java.display(),
            conf.conf_arg()
        );

        // Stdio is always piped, never inherited: the parent's stdout may be
        // carrying protocol framing that gateway log noise would corrupt.
        let mut child = Command::new(&java)
            .args(&args)
            .current_dir(self.install.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to spawn gateway: {}", e)))?;

        let pid = child.id();
        let output = OutputRing::new(OUTPUT_RING_LINES);
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        if let Some(stdout) = child.stdout.take() {
            let ring = output.clone();
            let mut ready_tx = Some(ready_tx);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if classify_as_ready(&line) {
                        if let Some(tx) = ready_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    ring.push(line);
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let ring = output.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    ring.push(line);
                }
            });
        }

        // The watcher owns the child from here on. It only observes; the
        // non-kill policy means nobody ever signals this process.
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::warn!("Gateway process exited with {}", status),
                Err(e) => tracing::warn!("Failed to wait on gateway process: {}", e),
            }
            on_exit();
        });

        // A dropped log sender (stdout closed without a ready line) must not
        // decide the race; the health poll is the authority in that case.
        let log_ready = async {
            match ready_rx.await {
                Ok(()) => true,
                Err(_) => std::future::pending().await,
            }
        };

        let ready = tokio::select! {
            hit = log_ready => hit,
            alive = poll_until_ready(
                self.checker.as_ref(),
                port,
                READY_POLL_ATTEMPTS,
                READY_POLL_INTERVAL,
            ) => alive,
        };

        if ready {
            tracing::info!("Gateway ready on port {}", port);
            Ok(GatewayProcess { pid, output })
        } else {
            Err(Error::GatewayStartupTimeout(
                READY_POLL_ATTEMPTS as u64 * READY_POLL_INTERVAL.as_secs(),
            ))
        }
    }
}
