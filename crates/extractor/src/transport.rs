#![allow(clippy::redundant_pub_crate)]

use alloy::{
    providers::{RootProvider, WsConnect},
    transports::layers::RetryBackoffLayer,
};
use alloy_rpc_client::ClientBuilder;
use eyre::{Result, WrapErr};
use tracing::info;
use url::Url;

/// Transport-level retry settings for rate limited or refused requests.
///
/// These retries live inside the RPC client and never span more than one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum retries per request
    pub max_retries: u32,
    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Compute units per second budget used to pace retries
    pub compute_units_per_sec: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { max_retries: 9, initial_backoff_ms: 100, compute_units_per_sec: 330 }
    }
}

/// Whether the URL should be served over a websocket.
pub(crate) fn is_websocket(url: &Url) -> bool {
    matches!(url.scheme(), "ws" | "wss")
}

/// Connect a read-only provider, picking HTTP or websocket from the URL scheme.
pub(crate) async fn connect(url: Url, config: TransportConfig) -> Result<RootProvider> {
    let retry = RetryBackoffLayer::new(
        config.max_retries,
        config.initial_backoff_ms,
        config.compute_units_per_sec,
    );

    let client = if is_websocket(&url) {
        info!(url = %url, "Connecting to node over websocket");
        ClientBuilder::default()
            .layer(retry)
            .ws(WsConnect::new(url.as_str()))
            .await
            .wrap_err_with(|| format!("failed to connect to {url}"))?
    } else {
        info!(url = %url, "Connecting to node over HTTP");
        ClientBuilder::default().layer(retry).http(url)
    };

    Ok(RootProvider::new(client))
}
