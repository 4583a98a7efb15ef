use miette::Diagnostic;
use thiserror::Error;

/// Error taxonomy for the gateway subsystem.
///
/// Variants own their message text (no boxed sources) so the enum is `Clone`:
/// a failed shared startup future fans its error out to every caller that
/// awaited it.
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway installation not found at '{0}'")]
    #[diagnostic(
        code(ibgw::install::missing),
        help("Set IB_GATEWAY_DIR to the Client Portal Gateway directory, or run `ibgw doctor`")
    )]
    GatewayNotInstalled(String),

    #[error("Bundled Java runtime not found for {platform} (expected at '{path}')")]
    #[diagnostic(
        code(ibgw::runtime::missing),
        help("The runtime directory ships with the gateway bundle; reinstall the bundle for this platform")
    )]
    RuntimeNotFound { platform: String, path: String },

    #[error("No available ports found in range {start}..={end}")]
    #[diagnostic(code(ibgw::port::exhausted))]
    NoAvailablePortsFound { start: u16, end: u16 },

    #[error("Gateway did not become ready within {0} seconds")]
    #[diagnostic(
        code(ibgw::startup::timeout),
        help("The gateway may still be starting; retry, or check recent gateway output with `ibgw status`")
    )]
    GatewayStartupTimeout(u64),

    #[error("External gateway at {host}:{port} is unreachable")]
    #[diagnostic(
        code(ibgw::external::unreachable),
        help("Verify the gateway is running at the configured host:port, or unset IB_GATEWAY_EXTERNAL")
    )]
    ExternalGatewayUnreachable { host: String, port: u16 },

    #[error("Gateway is not ready")]
    #[diagnostic(
        code(ibgw::gateway::not_ready),
        help("Start the gateway with `ibgw start`")
    )]
    GatewayNotReady,

    #[error("Process error: {0}")]
    #[diagnostic(code(ibgw::process::error))]
    Process(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Yaml(e.to_string())
    }
}

impl Error {
    /// True for errors that no amount of retrying will fix (installation or
    /// packaging problems, or an external gateway someone else must revive).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::GatewayNotInstalled(_)
                | Error::RuntimeNotFound { .. }
                | Error::ExternalGatewayUnreachable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::GatewayNotInstalled("/tmp/x".into()).is_fatal());
        assert!(Error::RuntimeNotFound {
            platform: "linux-x64".into(),
            path: "/tmp/x".into()
        }
        .is_fatal());
        assert!(Error::ExternalGatewayUnreachable {
            host: "remote".into(),
            port: 5000
        }
        .is_fatal());
        assert!(!Error::GatewayStartupTimeout(30).is_fatal());
        assert!(!Error::NoAvailablePortsFound {
            start: 5001,
            end: 5009
        }
        .is_fatal());
    }

    #[test]
    fn errors_clone_for_shared_startup_waiters() {
        let err = Error::GatewayStartupTimeout(30);
        let copy = err.clone();
        assert!(matches!(copy, Error::GatewayStartupTimeout(30)));
    }
}
