//! # ib-gateway
//!
//! Lifecycle manager and thin API client for the Interactive Brokers Client
//! Portal Gateway — the locally-run Java process exposing IB's trading REST
//! API.
//!
//! The heart of the crate is [`GatewayManager`]: it discovers an already
//! running gateway, launches the bundled one when none exists, negotiates an
//! alternate port when the default is taken, tracks readiness, and tears
//! down without killing — the gateway is treated as a shared, host-scoped
//! singleton whose lifetime outlives any single client process.
//!
//! ## Quick start
//!
//! ```no_run
//! use ib_gateway::{GatewayManager, GatewaySettings, IbApiClient};
//!
//! # async fn example() -> Result<(), ib_gateway::Error> {
//! let settings = GatewaySettings::from_env()?;
//! let manager = GatewayManager::new(&settings);
//!
//! // Fast-path boot: adopt an existing gateway or start one in the background.
//! manager.quick_start().await?;
//!
//! // Before each operation that needs the gateway:
//! manager.ensure_ready().await?;
//!
//! let api = IbApiClient::new(manager.clone())?;
//! let accounts = api.accounts().await?;
//! println!("{}", accounts);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod classify;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod healthcheck;
pub mod launcher;
pub mod manager;
pub mod port;

pub use api::IbApiClient;
pub use config::{ConfigVariant, GatewayInstall, GatewayMode, GatewaySettings, TemporaryConfigOverlay};
pub use error::{Error, Result};
pub use healthcheck::{GatewayHealthChecker, HealthChecker};
pub use launcher::{GatewayLauncher, GatewayProcess, JavaGatewayLauncher, OutputRing};
pub use manager::{GatewayManager, GatewayStatus};
pub use port::{PortProber, SystemPortProber, DEFAULT_GATEWAY_PORT};
