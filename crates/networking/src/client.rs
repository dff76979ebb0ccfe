//! HTTP client implementation.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// HTTP client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Timeout")]
    Timeout,
    #[error("HTTP error: {status}")]
    Status { status: u16 },
    #[error("Request error: {0}")]
    Request(String),
    #[error("Response error: {0}")]
    Response(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() || err.is_body() {
            ClientError::Response(err.to_string())
        } else {
            ClientError::Request(err.to_string())
        }
    }
}

/// HTTP client for talking to the kit server.
pub struct HttpClient {
    /// Inner reqwest client.
    inner: reqwest::Client,
    /// Server root every relative path is resolved against.
    base_url: Url,
    /// Client configuration.
    config: ClientConfig,
    /// Connection semaphore.
    connection_semaphore: Arc<Semaphore>,
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Maximum connections per host.
    pub max_connections_per_host: usize,
    /// Total maximum concurrent requests.
    pub max_total_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("kit-creator/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
            max_connections_per_host: 16,
            max_total_connections: 64,
        }
    }
}

impl HttpClient {
    /// Create a new HTTP client for a server.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(config.max_connections_per_host)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self {
            inner,
            base_url,
            connection_semaphore: Arc::new(Semaphore::new(config.max_total_connections.max(1))),
            config,
        })
    }

    /// Resolve a server-relative path.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Resolve a path and append encoded query parameters.
    pub fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let _permit = self
            .connection_semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Connection("Connection limit reached".to_string()))?;

        let response = self.inner.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Fetch a server-relative path and return the body bytes.
    pub async fn fetch(&self, path: &str) -> Result<Bytes, ClientError> {
        self.fetch_with_query(path, &[]).await
    }

    /// GET a JSON document with query parameters.
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let body = self.fetch_with_query(path, query).await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Response(e.to_string()))
    }

    /// Fetch a server-relative path with query parameters appended.
    pub async fn fetch_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Bytes, ClientError> {
        let url = self.url_with_query(path, query)?;
        let _permit = self
            .connection_semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::Connection("Connection limit reached".to_string()))?;

        let response = self.inner.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?)
    }

    /// Server root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// HTTP client builder.
pub struct HttpClientBuilder {
    base_url: String,
    config: ClientConfig,
}

impl HttpClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            config: ClientConfig::default(),
        }
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Limit concurrent requests.
    pub fn max_total_connections(mut self, max: usize) -> Self {
        self.config.max_total_connections = max;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, ClientError> {
        HttpClient::with_config(&self.base_url, self.config)
    }
}
