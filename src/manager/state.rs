use crate::config::TemporaryConfigOverlay;
use crate::launcher::GatewayProcess;
use crate::port::DEFAULT_GATEWAY_PORT;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mutable lifecycle state, owned exclusively by the manager.
///
/// `is_starting` and `is_ready` are never both true outside the single
/// transition at ready detection. `process` is populated only while the
/// manager believes a locally spawned gateway is live; an adopted or
/// external gateway leaves it `None`. `current_port` is meaningful once a
/// gateway has been found or launched; until then it holds the default.
#[derive(Debug, Default)]
pub struct GatewayState {
    pub is_starting: bool,
    pub is_ready: bool,
    pub current_port: Option<u16>,
    pub process: Option<GatewayProcess>,
    pub overlay: Option<TemporaryConfigOverlay>,
    pub started_at: Option<DateTime<Utc>>,
    /// Bumped on every launch, adoption, and stop. An exit hook captures the
    /// generation of its own launch and is a no-op once the state has moved
    /// on, so a process that died after being replaced cannot downgrade the
    /// successor's state or delete its overlay.
    pub generation: u64,
}

impl GatewayState {
    pub fn port(&self) -> u16 {
        self.current_port.unwrap_or(DEFAULT_GATEWAY_PORT)
    }
}

/// Point-in-time snapshot of the manager, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub mode: String,
    pub ready: bool,
    pub starting: bool,
    pub port: u16,
    pub url: String,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
}
