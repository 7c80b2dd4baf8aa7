//! Transport used to fetch remote value domains.

use async_trait::async_trait;
use inputspec_fields::{HttpMethod, Protocol};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::TransportError;
use crate::request::ValuesRequest;

/// Issues one request for a remote value domain and returns the raw body.
///
/// Implementations are injected into the resolver so tests can script
/// responses and hosts can supply their own networking.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: &ValuesRequest) -> Result<String, TransportError>;
}

/// HTTP(S) transport on `reqwest`.
///
/// Relative URIs are joined onto the configured base URL. GET sends the
/// request parameters as a query string, POST as a JSON object body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::from_client(Client::new())
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Build a client honoring the configured timeout and base URL.
    pub fn with_config(config: &ResolverConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| TransportError::Request {
            url: config.base_url.clone().unwrap_or_default(),
            source,
        })?;
        let transport = Self::from_client(client);
        match &config.base_url {
            Some(base) => transport.with_base_url(base),
            None => Ok(transport),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self, TransportError> {
        // A trailing slash keeps the last path segment when joining.
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let url = Url::parse(&normalized).map_err(|e| TransportError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    fn resolve_url(&self, uri: &str) -> Result<Url, TransportError> {
        if let Ok(url) = Url::parse(uri) {
            return Ok(url);
        }
        let base = self.base_url.as_ref().ok_or_else(|| TransportError::InvalidUrl {
            url: uri.to_string(),
            reason: "relative uri without a base url".to_string(),
        })?;
        base.join(uri.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl {
                url: uri.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: &ValuesRequest) -> Result<String, TransportError> {
        if !matches!(request.protocol, Protocol::Http | Protocol::Https) {
            return Err(TransportError::UnsupportedProtocol(request.protocol));
        }
        let mut url = self.resolve_url(&request.uri)?;

        let builder = match request.method {
            HttpMethod::Get => {
                if !request.params.is_empty() {
                    let mut query = url.query_pairs_mut();
                    for (name, value) in request.query_pairs() {
                        query.append_pair(&name, &value);
                    }
                }
                self.client.get(url.clone())
            }
            HttpMethod::Post => self
                .client
                .post(url.clone())
                .json(&Value::Object(request.params.clone())),
        };
        let builder = request
            .headers
            .iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));

        debug!(method = request.method.as_str(), url = %url, "sending values request");
        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })
    }
}
