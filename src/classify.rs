//! Heuristic text classifiers for gateway detection.
//!
//! Both classifiers pattern-match against text the gateway does not guarantee
//! to be stable: process-listing output and the gateway's own log lines. They
//! are kept here, isolated from the state machine, so the fragile patterns can
//! be adjusted (and tested) in one place.

/// Keywords that mark a process listing as "looks like a Client Portal
/// Gateway". Matched case-insensitively. Known to misclassify unrelated Java
/// processes; callers treat a positive as a hint, not proof.
const GATEWAY_INDICATORS: [&str; 4] = ["java", "clientportal", "gateway", "ibkr"];

/// Log substrings the gateway emits once its embedded web server has bound
/// its listen port. Fragile to upstream log-format changes.
const READY_INDICATORS: [&str; 2] = ["open https://localhost", "server listening"];

/// Does this process-listing text look like a running gateway instance?
pub fn classify_as_gateway(listing: &str) -> bool {
    if listing.trim().is_empty() {
        return false;
    }
    let lower = listing.to_lowercase();
    GATEWAY_INDICATORS.iter().any(|kw| lower.contains(kw))
}

/// Does this gateway stdout line indicate the web server is up?
pub fn classify_as_ready(line: &str) -> bool {
    let lower = line.to_lowercase();
    READY_INDICATORS.iter().any(|kw| lower.contains(kw))
}
