pub mod downloader;
pub mod xkcd;

use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Global HTTP client shared by the fetcher, the downloader and the
/// SendGrid transport.
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Returns a reference to the shared HTTP client.
/// The client is lazily initialized on first use.
pub fn http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(concat!("xkcd_checker/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2) // One run, a handful of requests
            .build()
            .expect("Failed to create HTTP client")
    })
}
