use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Health checker for a candidate gateway endpoint.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Single-attempt liveness probe.
    async fn check(&self, port: u16) -> bool;
}

/// Poll `checker` at a fixed interval until it reports alive or the attempt
/// budget runs out. No backoff: the gateway either comes up within the budget
/// or the launch is declared failed.
pub async fn poll_until_ready<C: HealthChecker + ?Sized>(
    checker: &C,
    port: u16,
    max_attempts: u32,
    interval: Duration,
) -> bool {
    for attempt in 0..max_attempts {
        if checker.check(port).await {
            tracing::debug!("Gateway on port {} alive after {} polls", port, attempt + 1);
            return true;
        }
        if attempt < max_attempts - 1 {
            sleep(interval).await;
        }
    }
    false
}
