//! Gateway health probing.

mod checker;
mod https;

pub use checker::{poll_until_ready, HealthChecker};
pub use https::GatewayHealthChecker;
