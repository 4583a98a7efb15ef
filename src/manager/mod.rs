//! The gateway lifecycle manager: discovery, startup racing, port
//! negotiation, readiness state, and disconnect-without-kill teardown.
//!
//! One manager instance exists per host process, constructed at the
//! composition root and handed by reference to every caller that needs the
//! gateway. Several independent host processes may compete to bring up the
//! one shared gateway on a machine; the manager prefers adopting an existing
//! instance over launching a redundant one, arbitrated only by OS-level port
//! occupancy (best effort, not a distributed lock).

mod state;

pub use state::{GatewayState, GatewayStatus};

use crate::config::{ConfigVariant, GatewayInstall, GatewayMode, GatewaySettings, TemporaryConfigOverlay};
use crate::error::{Error, Result};
use crate::healthcheck::{GatewayHealthChecker, HealthChecker};
use crate::launcher::{ExitHook, GatewayLauncher, JavaGatewayLauncher};
use crate::port::{
    find_available_port, find_existing_gateway, PortProber, SystemPortProber,
    DEFAULT_GATEWAY_PORT,
};
use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;

/// Ports tried when the default is occupied: default+1 ..= default+9.
const ALTERNATE_PORT_ATTEMPTS: u16 = 9;

/// A background startup in flight. Cloned by every caller that wants to
/// await the same attempt; the result is fanned out to all of them.
type SharedStartup = Shared<BoxFuture<'static, Result<()>>>;

struct ManagerInner {
    mode: GatewayMode,
    host: String,
    install: GatewayInstall,
    prober: Arc<dyn PortProber>,
    checker: Arc<dyn HealthChecker>,
    launcher: Arc<dyn GatewayLauncher>,
    /// Brief synchronous access only; never held across an await.
    state: Mutex<GatewayState>,
    /// At most one background startup per manager. Cleared on failure so a
    /// later caller can retry; left in place (completed) once ready.
    startup: tokio::sync::Mutex<Option<SharedStartup>>,
    /// Serializes the startup sequence itself. A second caller blocks here
    /// instead of racing a duplicate launch, then rechecks readiness.
    startup_serial: tokio::sync::Mutex<()>,
}

/// Handle to the lifecycle manager. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct GatewayManager {
    inner: Arc<ManagerInner>,
}

impl GatewayManager {
    /// Build a manager with production collaborators from settings. The
    /// operating mode is fixed for the manager's lifetime.
    pub fn new(settings: &GatewaySettings) -> Self {
        let mode = settings.mode();
        let install = GatewayInstall::new(settings.gateway_dir());
        let probe_host = match &mode {
            GatewayMode::External { host, .. } => host.clone(),
            GatewayMode::Local => settings.host.clone(),
        };
        let checker: Arc<dyn HealthChecker> = Arc::new(GatewayHealthChecker::new(probe_host));
        let launcher: Arc<dyn GatewayLauncher> =
            Arc::new(JavaGatewayLauncher::new(install.clone(), checker.clone()));
        Self::with_components(
            mode,
            settings.host.clone(),
            install,
            Arc::new(SystemPortProber),
            checker,
            launcher,
        )
    }

    /// Assemble a manager from explicit collaborators (the seam tests use).
    pub fn with_components(
        mode: GatewayMode,
        host: String,
        install: GatewayInstall,
        prober: Arc<dyn PortProber>,
        checker: Arc<dyn HealthChecker>,
        launcher: Arc<dyn GatewayLauncher>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                mode,
                host,
                install,
                prober,
                checker,
                launcher,
                state: Mutex::new(GatewayState::default()),
                startup: tokio::sync::Mutex::new(None),
                startup_serial: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Readiness as last observed. Eventually consistent: the exit watcher
    /// can downgrade it at any time, so per-operation callers should go
    /// through [`ensure_ready`](Self::ensure_ready) instead of caching this.
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().is_ready
    }

    /// The port the gateway is (or will be) reachable on. Can change across
    /// a reinitialization; re-fetch per use.
    pub fn current_port(&self) -> u16 {
        match &self.inner.mode {
            GatewayMode::External { port, .. } => *port,
            GatewayMode::Local => self.inner.state.lock().port(),
        }
    }

    /// Base URL of the gateway's web server.
    pub fn gateway_url(&self) -> String {
        let host = match &self.inner.mode {
            GatewayMode::External { host, .. } => host.as_str(),
            GatewayMode::Local => self.inner.host.as_str(),
        };
        format!("https://{}:{}", host, self.current_port())
    }

    /// Tail of the spawned gateway's output, if this manager launched one.
    pub fn recent_output(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .process
            .as_ref()
            .map(|p| p.recent_output())
            .unwrap_or_default()
    }

    pub fn status(&self) -> GatewayStatus {
        let state = self.inner.state.lock();
        GatewayStatus {
            mode: match &self.inner.mode {
                GatewayMode::Local => "local".to_string(),
                GatewayMode::External { host, port } => format!("external ({}:{})", host, port),
            },
            ready: state.is_ready,
            starting: state.is_starting,
            port: match &self.inner.mode {
                GatewayMode::External { port, .. } => *port,
                GatewayMode::Local => state.port(),
            },
            url: {
                let host = match &self.inner.mode {
                    GatewayMode::External { host, .. } => host.as_str(),
                    GatewayMode::Local => self.inner.host.as_str(),
                };
                let port = match &self.inner.mode {
                    GatewayMode::External { port, .. } => *port,
                    GatewayMode::Local => state.port(),
                };
                format!("https://{}:{}", host, port)
            },
            pid: state.process.as_ref().and_then(|p| p.pid()),
            started_at: state.started_at,
        }
    }

    pub fn install(&self) -> &GatewayInstall {
        &self.inner.install
    }

    /// Fast-path entry for process boot. Adopts an existing gateway
    /// synchronously if discovery finds one; otherwise kicks off a
    /// background startup and returns immediately so the surrounding
    /// server's own handshake is not blocked on a slow JVM boot.
    pub async fn quick_start(&self) -> Result<()> {
        match &self.inner.mode {
            GatewayMode::External { .. } => self.probe_external().await,
            GatewayMode::Local => {
                if let Some(port) = find_existing_gateway(self.inner.prober.as_ref()).await {
                    self.adopt(port);
                    return Ok(());
                }
                self.start_async().await;
                Ok(())
            }
        }
    }

    /// Idempotent background startup. A no-op when a startup is already in
    /// flight or the manager is ready. Failures inside the detached task are
    /// logged and the stored handle is cleared so a later caller can retry.
    pub async fn start_async(&self) {
        let mut slot = self.inner.startup.lock().await;
        if slot.is_some() || self.inner.state.lock().is_ready {
            return;
        }
        let fut = Self::startup_future(self.inner.clone());
        *slot = Some(fut.clone());
        drop(slot);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Err(e) = fut.clone().await {
                tracing::error!("Background gateway startup failed: {}", e);
                // Clear only this attempt's handle: stop() plus a fresh
                // start_async may have replaced it with a newer one.
                let mut slot = inner.startup.lock().await;
                if slot.as_ref().is_some_and(|current| current.ptr_eq(&fut)) {
                    slot.take();
                }
            }
        });
    }

    /// Convergence point called before every operation that needs the
    /// gateway. Three-tier fallback: adopt an existing gateway, await an
    /// in-flight startup, then start fresh. Multiple host processes may be
    /// racing to bring up the one shared gateway; reuse beats relaunching.
    pub async fn ensure_ready(&self) -> Result<()> {
        match &self.inner.mode {
            GatewayMode::External { .. } => self.probe_external().await,
            GatewayMode::Local => {
                if self.inner.state.lock().is_ready {
                    return Ok(());
                }

                // A gateway may have appeared since boot (started by another
                // process instance, or by a launch this manager gave up on).
                if let Some(port) = find_existing_gateway(self.inner.prober.as_ref()).await {
                    self.adopt(port);
                    return Ok(());
                }

                let in_flight = self.inner.startup.lock().await.clone();
                if let Some(fut) = in_flight {
                    match fut.await {
                        Ok(()) if self.inner.state.lock().is_ready => return Ok(()),
                        Ok(()) => {
                            // Ready was reported and then downgraded while
                            // we awaited; fall through to a fresh attempt.
                        }
                        Err(e) => {
                            tracing::debug!(
                                "Awaited in-flight startup failed ({}); starting fresh",
                                e
                            );
                        }
                    }
                }

                start_sync(&self.inner).await
            }
        }
    }

    /// Clear this manager's references to the gateway without touching the
    /// process. The gateway is a host-scoped singleton; a later invocation
    /// of this program (or another program) is expected to rediscover and
    /// reuse it. No kill signal is ever sent.
    pub async fn stop(&self) -> Result<()> {
        self.inner.startup.lock().await.take();
        let overlay = {
            let mut state = self.inner.state.lock();
            state.is_ready = false;
            state.is_starting = false;
            state.process = None;
            state.started_at = None;
            state.generation += 1;
            state.overlay.take()
        };
        // Dropping the overlay deletes its file; done outside the lock.
        drop(overlay);
        tracing::info!("Gateway references cleared (process left running)");
        Ok(())
    }

    /// Passive discovery: adopt an existing gateway (or probe the external
    /// endpoint) without ever triggering a launch. Returns the adopted port.
    pub async fn discover(&self) -> Option<u16> {
        match &self.inner.mode {
            GatewayMode::External { port, .. } => {
                let port = *port;
                self.probe_external().await.ok().map(|_| port)
            }
            GatewayMode::Local => {
                let port = find_existing_gateway(self.inner.prober.as_ref()).await?;
                self.adopt(port);
                Some(port)
            }
        }
    }

    fn adopt(&self, port: u16) {
        let mut state = self.inner.state.lock();
        state.current_port = Some(port);
        state.is_ready = true;
        state.is_starting = false;
        state.generation += 1;
        tracing::info!("Adopted existing gateway on port {}", port);
    }

    /// External mode: exactly one health probe, no discovery, no launch.
    /// Someone else owns that gateway's lifecycle entirely.
    async fn probe_external(&self) -> Result<()> {
        let GatewayMode::External { host, port } = &self.inner.mode else {
            return Err(Error::Config("probe_external outside external mode".into()));
        };
        if self.inner.checker.check(*port).await {
            let mut state = self.inner.state.lock();
            state.current_port = Some(*port);
            state.is_ready = true;
            Ok(())
        } else {
            self.inner.state.lock().is_ready = false;
            Err(Error::ExternalGatewayUnreachable {
                host: host.clone(),
                port: *port,
            })
        }
    }

    fn startup_future(inner: Arc<ManagerInner>) -> SharedStartup {
        async move { start_sync(&inner).await }.boxed().shared()
    }
}

impl std::fmt::Debug for GatewayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("GatewayManager")
            .field("mode", &self.inner.mode)
            .field("is_ready", &state.is_ready)
            .field("is_starting", &state.is_starting)
            .field("current_port", &state.current_port)
            .finish()
    }
}

/// The full synchronous startup sequence, shared by the background and
/// direct paths. Serialized per manager: a concurrent caller waits its turn,
/// then finds the state ready and returns without a duplicate launch.
async fn start_sync(inner: &Arc<ManagerInner>) -> Result<()> {
    let _serial = inner.startup_serial.lock().await;

    {
        let mut state = inner.state.lock();
        if state.is_ready {
            return Ok(());
        }
        state.is_starting = true;
    }

    let result = run_startup_sequence(inner).await;

    if let Err(ref e) = result {
        let mut state = inner.state.lock();
        state.is_starting = false;
        state.is_ready = false;
        tracing::warn!("Gateway startup failed: {}", e);
    }
    result
}

async fn run_startup_sequence(inner: &Arc<ManagerInner>) -> Result<()> {
    // Installation problems are fatal and non-retryable; fail before any
    // port work.
    inner.install.verify()?;

    let default_port = DEFAULT_GATEWAY_PORT;
    let (port, conf, overlay) = if inner.prober.is_port_available(default_port).await {
        (default_port, ConfigVariant::Default, None)
    } else {
        match find_available_port(
            inner.prober.as_ref(),
            default_port + 1,
            ALTERNATE_PORT_ATTEMPTS,
        )
        .await
        {
            Ok(alternate) => {
                tracing::info!(
                    "Default port {} occupied; using alternate port {}",
                    default_port,
                    alternate
                );
                let overlay = TemporaryConfigOverlay::write(&inner.install, alternate)?;
                (alternate, ConfigVariant::Overlay(alternate), Some(overlay))
            }
            Err(Error::NoAvailablePortsFound { .. }) => {
                // Tolerated fallback: attempt the default port anyway and
                // accept the probable collision over failing outright.
                tracing::warn!(
                    "No alternate port free near {}; attempting the default despite its occupant",
                    default_port
                );
                (default_port, ConfigVariant::Default, None)
            }
            Err(e) => return Err(e),
        }
    };

    let generation = {
        let mut state = inner.state.lock();
        state.current_port = Some(port);
        state.generation += 1;
        state.generation
    };

    let hook_inner = Arc::downgrade(inner);
    let on_exit: ExitHook = Box::new(move || {
        let Some(inner) = hook_inner.upgrade() else {
            return;
        };
        let overlay = {
            let mut state = inner.state.lock();
            // A hook belonging to a launch that has since been replaced (or
            // stopped) must not touch the successor's state.
            if state.generation != generation {
                return;
            }
            state.is_ready = false;
            state.is_starting = false;
            state.process = None;
            state.started_at = None;
            state.overlay.take()
        };
        drop(overlay);
        tracing::warn!("Gateway process exit observed; readiness downgraded");
    });

    let process = inner.launcher.launch(port, conf, on_exit).await?;

    let mut state = inner.state.lock();
    state.process = Some(process);
    state.overlay = overlay;
    state.started_at = Some(Utc::now());
    state.is_ready = true;
    state.is_starting = false;
    Ok(())
}
