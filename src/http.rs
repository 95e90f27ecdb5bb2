//! HTTP client construction with sensible defaults.

use reqwest::Client;
use std::time::Duration;

/// Default timeout for remote API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an HTTP client with the configured default timeout.
///
/// All remote-service adapters share this builder so hung calls are
/// bounded uniformly.
pub fn create_client() -> Client {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}
