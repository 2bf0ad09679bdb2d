//! Debrid service adapters.
//!
//! Each supported service implements [`DebridProvider`]. The resolver picks
//! one per request from the caller's [`ProviderConfig`].

mod all_debrid;
mod real_debrid;
mod torbox;
mod types;

pub use all_debrid::AllDebridProvider;
pub use real_debrid::RealDebridProvider;
pub use torbox::TorboxProvider;
pub use types::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ProvidersConfig;
use crate::metrics;

/// Build the shared HTTP client used by all provider adapters.
pub fn build_http_client(config: &ProvidersConfig) -> Result<Client, DebridError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs as u64))
        .user_agent(concat!("kaistream/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DebridError::Api(format!("Failed to create HTTP client: {}", e)))
}

/// Create the adapter for `config`.
pub fn create_provider(
    config: &ProviderConfig,
    endpoints: &ProvidersConfig,
    client: Client,
) -> Result<Arc<dyn DebridProvider>, DebridError> {
    let api_key = config.api_key.trim().to_string();
    let provider: Arc<dyn DebridProvider> = match config.kind()? {
        ProviderKind::RealDebrid => Arc::new(RealDebridProvider::new(
            client,
            &endpoints.real_debrid_url,
            api_key,
        )),
        ProviderKind::AllDebrid => Arc::new(AllDebridProvider::new(
            client,
            &endpoints.all_debrid_url,
            api_key,
            &endpoints.agent,
        )),
        ProviderKind::Torbox => {
            Arc::new(TorboxProvider::new(client, &endpoints.torbox_url, api_key))
        }
    };
    Ok(provider)
}

/// Source of provider adapters for the resolver.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DebridProvider>, DebridError>;
}

/// Factory for the real HTTP adapters. All adapters share one client.
pub struct HttpProviderFactory {
    endpoints: ProvidersConfig,
    client: Client,
}

impl HttpProviderFactory {
    pub fn new(endpoints: ProvidersConfig) -> Result<Self, DebridError> {
        let client = build_http_client(&endpoints)?;
        Ok(Self { endpoints, client })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DebridProvider>, DebridError> {
        create_provider(config, &self.endpoints, self.client.clone())
    }
}

/// Raw HTTP exchange shared by the adapters.
pub(crate) struct Exchange {
    pub status: StatusCode,
    pub body: String,
}

impl Exchange {
    /// Decode a successful body, mapping failure statuses to errors.
    pub fn json<T: DeserializeOwned>(&self, kind: ProviderKind) -> Result<T, DebridError> {
        self.ensure_success(kind)?;
        self.decode()
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DebridError> {
        serde_json::from_str(&self.body).map_err(|e| {
            DebridError::Parse(format!(
                "{}: {}",
                e,
                self.body.chars().take(200).collect::<String>()
            ))
        })
    }

    pub fn ensure_success(&self, kind: ProviderKind) -> Result<(), DebridError> {
        if self.status.is_success() {
            return Ok(());
        }
        match self.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DebridError::InvalidCredentials(kind.to_string()))
            }
            StatusCode::NOT_FOUND => Err(DebridError::NotFound(format!(
                "{} returned 404",
                kind
            ))),
            status => Err(DebridError::Api(format!(
                "HTTP {}: {}",
                status,
                self.body.chars().take(200).collect::<String>()
            ))),
        }
    }
}

/// Send a request, timing it under the provider's label.
pub(crate) async fn send(
    kind: ProviderKind,
    request: RequestBuilder,
) -> Result<Exchange, DebridError> {
    let start = Instant::now();
    let response = request.send().await;
    metrics::EXTERNAL_REQUEST_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(start.elapsed().as_secs_f64());

    let response = response?;
    let status = response.status();
    let body = response.text().await?;
    Ok(Exchange { status, body })
}
