use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file name searched for in the working directory and its parents.
const SETTINGS_FILE: &str = "ib-gateway.yaml";

/// Default install location when neither env nor settings file names one.
const DEFAULT_GATEWAY_DIR: &str = "clientportal.gw";

/// Operating mode, fixed before the manager is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayMode {
    /// This process locates/launches a gateway on the local machine.
    Local,
    /// A gateway managed elsewhere; only health-checked, never launched.
    External { host: String, port: u16 },
}

/// Manager configuration, merged from an optional `ib-gateway.yaml` and the
/// `IB_GATEWAY_*` environment (environment wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Path to the Client Portal Gateway installation directory.
    #[serde(default)]
    pub gateway_dir: Option<PathBuf>,

    /// Hostname probed for liveness (and used in gateway URLs).
    #[serde(default = "default_host")]
    pub host: String,

    /// External gateway endpoint; presence selects external mode.
    #[serde(default)]
    pub external: Option<ExternalEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEndpoint {
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            gateway_dir: None,
            host: default_host(),
            external: None,
        }
    }
}

impl GatewaySettings {
    /// Parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read settings file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Find `ib-gateway.yaml` in `dir` or any parent directory.
    pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir.parent().and_then(Self::find_in_dir)
    }

    /// Load from the ambient environment: an optional settings file found
    /// from the current directory, overridden by `IB_GATEWAY_*` variables.
    pub fn from_env() -> Result<Self> {
        let mut settings = std::env::current_dir()
            .ok()
            .and_then(|d| Self::find_in_dir(&d))
            .map(Self::load)
            .transpose()?
            .unwrap_or_default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Overlay `IB_GATEWAY_DIR` / `IB_GATEWAY_EXTERNAL` / `IB_GATEWAY_HOST` /
    /// `IB_GATEWAY_PORT` onto these settings.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("IB_GATEWAY_DIR") {
            self.gateway_dir = Some(PathBuf::from(dir));
        }
        let external = std::env::var("IB_GATEWAY_EXTERNAL")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if external {
            let host = std::env::var("IB_GATEWAY_HOST").unwrap_or_else(|_| default_host());
            let port = match std::env::var("IB_GATEWAY_PORT") {
                Ok(raw) => raw.parse::<u16>().map_err(|_| {
                    Error::Config(format!("IB_GATEWAY_PORT is not a valid port: '{}'", raw))
                })?,
                Err(_) => crate::port::DEFAULT_GATEWAY_PORT,
            };
            self.external = Some(ExternalEndpoint { host, port });
        }
        Ok(())
    }

    /// The mode a manager built from these settings will run in.
    pub fn mode(&self) -> GatewayMode {
        match &self.external {
            Some(ep) => GatewayMode::External {
                host: ep.host.clone(),
                port: ep.port,
            },
            None => GatewayMode::Local,
        }
    }

    /// Resolve the installation directory (configured or conventional).
    pub fn gateway_dir(&self) -> PathBuf {
        self.gateway_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GATEWAY_DIR))
    }
}
