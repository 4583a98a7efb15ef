//! Configuration: gateway installation layout, manager settings, and the
//! per-port overlay written when the default listen port is taken.

mod install;
mod overlay;
mod settings;

pub use install::{ConfigVariant, GatewayInstall};
pub use overlay::TemporaryConfigOverlay;
pub use settings::{ExternalEndpoint, GatewayMode, GatewaySettings};
