//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients for the advisor
//! backend. No request timeout is set: answer streams are long-lived and end
//! when the transport does, so only connection establishment is bounded.

use std::time::Duration;

/// Connection establishment bound
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` for advisor traffic.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("failed to build reqwest client")
}
