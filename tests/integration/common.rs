use std::time::Duration;

use crm_sync::{ClientConfig, RetryConfig};
use wiremock::MockServer;

/// Install the log subscriber once per test binary.
pub fn init() {
    crm_sync::init_tracing();
}

/// Default retry behavior with short delays.
pub fn fast_retry() -> ClientConfig {
    ClientConfig::builder()
        .with_retry(RetryConfig::default().with_initial_delay(Duration::from_millis(50)))
        .build()
}

/// API root on a mock server, e.g. `http://127.0.0.1:1234/api/v1/`.
pub fn api_root(server: &MockServer, prefix: &str) -> String {
    format!("{}/{}/", server.uri(), prefix.trim_matches('/'))
}
