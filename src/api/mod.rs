//! Thin authenticated client for the gateway's REST surface.

mod client;

pub use client::IbApiClient;
