use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Never refetch for an unknown key id more often than this
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("failed to fetch signing keys: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Where the gate finds the identity provider's public keys
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn key_set(&self) -> Result<Arc<JwkSet>, KeySetError>;

    /// Called when a token names a key id missing from [`key_set`](Self::key_set).
    /// Returns a newer set, or `None` when nothing newer can be had.
    async fn refresh(&self) -> Result<Option<Arc<JwkSet>>, KeySetError> {
        Ok(None)
    }
}

/// Fixed key set, for tests and deployments that pin their keys
pub struct StaticKeySet(Arc<JwkSet>);

impl StaticKeySet {
    pub fn new(keys: JwkSet) -> Self {
        Self(Arc::new(keys))
    }
}

#[async_trait]
impl KeySource for StaticKeySet {
    async fn key_set(&self) -> Result<Arc<JwkSet>, KeySetError> {
        Ok(self.0.clone())
    }
}

struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Key set published at the identity provider's JWKS endpoint.
///
/// With a zero TTL every call fetches; otherwise the last fetch is shared
/// process-wide until it is older than the TTL.
pub struct RemoteKeySet {
    url: Url,
    client: reqwest::Client,
    ttl: Duration,
    cache: RwLock<Option<CachedKeySet>>,
}

impl RemoteKeySet {
    pub fn new(url: Url, ttl: Duration) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, KeySetError> {
        let keys: JwkSet = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let keys = Arc::new(keys);

        debug!("Fetched {} signing keys from {}", keys.keys.len(), self.url);
        if !self.ttl.is_zero() {
            *self.cache.write().await = Some(CachedKeySet {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(keys)
    }

    async fn cached_within(&self, age: Duration) -> Option<Arc<JwkSet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < age)
            .map(|cached| cached.keys.clone())
    }
}

#[async_trait]
impl KeySource for RemoteKeySet {
    async fn key_set(&self) -> Result<Arc<JwkSet>, KeySetError> {
        if let Some(keys) = self.cached_within(self.ttl).await {
            return Ok(keys);
        }
        self.fetch().await
    }

    async fn refresh(&self) -> Result<Option<Arc<JwkSet>>, KeySetError> {
        // Uncached sets were fetched moments ago by key_set
        if self.ttl.is_zero() || self.cached_within(MIN_REFRESH_INTERVAL).await.is_some() {
            return Ok(None);
        }
        info!("Refreshing signing keys from {}", self.url);
        self.fetch().await.map(Some)
    }
}
