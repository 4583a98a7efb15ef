//! Port probing and existing-gateway discovery.
//!
//! Availability checks shell out to OS socket-listing tools rather than
//! binding sockets: the point is to inspect who currently holds a port, not
//! to reserve it. A listing tool that is missing or fails to run makes a port
//! read as "available" — an optimistic default, not a verified guarantee.

mod probe;

pub use probe::{ProcessInfo, SystemPortProber};

use crate::classify::classify_as_gateway;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Default Client Portal Gateway listen port.
pub const DEFAULT_GATEWAY_PORT: u16 = 5000;

/// Conventional ports an already-running gateway may occupy, scanned in
/// ascending order during discovery. First match wins.
pub const DISCOVERY_PORTS: [u16; 6] = [5000, 5001, 5002, 5003, 5004, 5005];

/// OS-level port occupancy probe.
///
/// Implemented by [`SystemPortProber`] in production; tests substitute fakes.
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Whether nothing appears to be listening on `port`.
    async fn is_port_available(&self, port: u16) -> bool;

    /// Raw text describing the processes listening on `port` (names plus
    /// command lines), empty when none are found or listing fails.
    async fn port_listing(&self, port: u16) -> String;
}

/// Scan `start, start+1, ..` for up to `max_attempts` ports and return the
/// first available one.
pub async fn find_available_port<P: PortProber + ?Sized>(
    prober: &P,
    start: u16,
    max_attempts: u16,
) -> Result<u16> {
    for offset in 0..max_attempts {
        let port = start + offset;
        if prober.is_port_available(port).await {
            return Ok(port);
        }
    }
    Err(Error::NoAvailablePortsFound {
        start,
        end: start + max_attempts.saturating_sub(1),
    })
}

/// Whether the process occupying `port` looks like a gateway instance.
pub async fn is_gateway_process<P: PortProber + ?Sized>(prober: &P, port: u16) -> bool {
    classify_as_gateway(&prober.port_listing(port).await)
}

/// Scan the conventional ports for an already-running gateway. Returns the
/// lowest occupied port whose listing classifies as a gateway.
pub async fn find_existing_gateway<P: PortProber + ?Sized>(prober: &P) -> Option<u16> {
    for port in DISCOVERY_PORTS {
        if prober.is_port_available(port).await {
            continue;
        }
        if is_gateway_process(prober, port).await {
            tracing::info!("Found existing gateway on port {}", port);
            return Some(port);
        }
        tracing::debug!("Port {} is occupied but does not look like a gateway", port);
    }
    None
}
