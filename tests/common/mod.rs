//! Shared fakes and fixtures for manager integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use ib_gateway::config::ConfigVariant;
use ib_gateway::launcher::{ExitHook, GatewayLauncher, GatewayProcess, OutputRing};
use ib_gateway::{Error, GatewayInstall, HealthChecker, PortProber, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Minimal on-disk gateway installation satisfying `GatewayInstall::verify`.
pub fn fake_install(dir: &TempDir) -> GatewayInstall {
    let root = dir.path();
    fs::create_dir_all(root.join("root")).unwrap();
    fs::create_dir_all(root.join("dist")).unwrap();
    fs::create_dir_all(root.join("build/lib/runtime")).unwrap();
    fs::write(
        root.join("dist/ibgroup.web.core.iblink.router.clientportal.gw.jar"),
        b"jar",
    )
    .unwrap();
    fs::write(
        root.join("root/conf.yaml"),
        "ip2loc: \"US\"\nlistenPort: 5000\nlistenSsl: true\n",
    )
    .unwrap();
    GatewayInstall::new(root)
}

/// Prober over a fixed port -> listing map; unlisted ports read available.
pub struct FakeProber {
    listings: Mutex<HashMap<u16, String>>,
    pub calls: AtomicU32,
}

impl FakeProber {
    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn new(entries: &[(u16, &str)]) -> Self {
        Self {
            listings: Mutex::new(entries.iter().map(|(p, s)| (*p, s.to_string())).collect()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn occupy(&self, port: u16, listing: &str) {
        self.listings.lock().insert(port, listing.to_string());
    }
}

#[async_trait]
impl PortProber for FakeProber {
    async fn is_port_available(&self, port: u16) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        !self.listings.lock().contains_key(&port)
    }

    async fn port_listing(&self, port: u16) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.listings.lock().get(&port).cloned().unwrap_or_default()
    }
}

/// Health checker with a scripted answer and a probe counter.
pub struct FakeChecker {
    pub alive: Mutex<bool>,
    pub probes: AtomicU32,
}

impl FakeChecker {
    pub fn alive() -> Self {
        Self {
            alive: Mutex::new(true),
            probes: AtomicU32::new(0),
        }
    }

    pub fn dead() -> Self {
        Self {
            alive: Mutex::new(false),
            probes: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl HealthChecker for FakeChecker {
    async fn check(&self, _port: u16) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        *self.alive.lock()
    }
}

/// Launcher that records invocations and keeps the exit hooks it was given,
/// so tests can simulate the gateway process dying later.
pub struct FakeLauncher {
    pub calls: Mutex<Vec<(u16, ConfigVariant)>>,
    pub hooks: Mutex<Vec<ExitHook>>,
    /// First N launches fail with a startup timeout.
    pub fail_first: AtomicU32,
    /// Simulated startup latency before success is reported.
    pub delay: Duration,
}

impl FakeLauncher {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            fail_first: AtomicU32::new(0),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            fail_first: AtomicU32::new(0),
            delay,
        })
    }

    pub fn failing_first(n: u32) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            fail_first: AtomicU32::new(n),
            delay: Duration::ZERO,
        })
    }

    /// Every launch fails, each taking `delay` to do so.
    pub fn failing_slowly(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            fail_first: AtomicU32::new(u32::MAX),
            delay,
        })
    }

    pub fn launch_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Fire the most recent exit hook, as the real exit watcher would.
    pub fn simulate_exit(&self) {
        if let Some(hook) = self.hooks.lock().pop() {
            hook();
        }
    }
}

#[async_trait]
impl GatewayLauncher for FakeLauncher {
    async fn launch(
        &self,
        port: u16,
        conf: ConfigVariant,
        on_exit: ExitHook,
    ) -> Result<GatewayProcess> {
        self.calls.lock().push((port, conf));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::GatewayStartupTimeout(30));
        }
        self.hooks.lock().push(on_exit);
        Ok(GatewayProcess::new(Some(4242), OutputRing::new(16)))
    }
}
