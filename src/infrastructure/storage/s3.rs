use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode, Url};
use tracing::{debug, warn};

use super::sigv4::{Signer, uri_encode};
use crate::domain::cache_keys::CacheKey;
use crate::domain::errors::CacheError;
use crate::domain::repositories::ArtifactCache;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// S3 refuses pre-signed URLs valid for longer than a week.
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const CONTENT_TYPE: &str = "image/jpeg";

/// How bucket names are put into request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AddressingStyle {
    /// `https://endpoint/bucket/key`
    #[default]
    Path,
    /// `https://bucket.endpoint/key`
    Virtual,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub addressing_style: AddressingStyle,
}

/// Artifact cache backed by an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3ArtifactCache {
    client: reqwest::Client,
    signer: Signer,
    scheme: String,
    host: String,
    bucket: String,
    addressing_style: AddressingStyle,
}

impl S3ArtifactCache {
    pub fn new(config: S3Config) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("invalid storage url: {}", config.endpoint))?;
        let Some(endpoint_host) = endpoint.host_str() else {
            bail!("storage url has no host: {}", config.endpoint);
        };
        if config.bucket.trim().is_empty() {
            bail!("a storage bucket is required");
        }

        let endpoint_host = match endpoint.port() {
            Some(port) => format!("{endpoint_host}:{port}"),
            None => endpoint_host.to_string(),
        };
        let host = match config.addressing_style {
            AddressingStyle::Path => endpoint_host,
            AddressingStyle::Virtual => format!("{}.{endpoint_host}", config.bucket),
        };

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to configure storage HTTP client")?;

        Ok(Self {
            client,
            signer: Signer::new(
                config.access_key_id,
                config.secret_access_key,
                config.region,
            ),
            scheme: endpoint.scheme().to_string(),
            host,
            bucket: config.bucket,
            addressing_style: config.addressing_style,
        })
    }

    fn canonical_uri(&self, key: &CacheKey) -> String {
        let key = uri_encode(key.as_str(), false);
        match self.addressing_style {
            AddressingStyle::Path => format!("/{}/{key}", uri_encode(&self.bucket, true)),
            AddressingStyle::Virtual => format!("/{key}"),
        }
    }

    fn object_url(&self, canonical_uri: &str) -> String {
        format!("{}://{}{canonical_uri}", self.scheme, self.host)
    }

    async fn send(
        &self,
        method: Method,
        key: &CacheKey,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, CacheError> {
        let canonical_uri = self.canonical_uri(key);
        let payload = body.as_deref().unwrap_or_default();
        let signed = self.signer.sign_headers(
            method.as_str(),
            &self.host,
            &canonical_uri,
            payload,
            Utc::now(),
        );

        let mut request = self
            .client
            .request(method.clone(), self.object_url(&canonical_uri))
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header(reqwest::header::AUTHORIZATION, &signed.authorization);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                .body(body);
        }

        request.send().await.map_err(|e| {
            warn!(%method, key = %key, error = %e, "storage request failed");
            CacheError::unavailable(format!("storage request failed: {e}"))
        })
    }
}

fn status_error(operation: &str, key: &CacheKey, status: StatusCode) -> CacheError {
    warn!(operation, key = %key, %status, "storage returned an error response");
    let message = format!("storage {operation} of {key} returned {status}");
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        CacheError::unavailable(message)
    } else {
        CacheError::rejected(message)
    }
}

#[async_trait]
impl ArtifactCache for S3ArtifactCache {
    async fn has(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let response = self.send(Method::HEAD, key, None).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error("lookup", key, status)),
        }
    }

    async fn put(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), CacheError> {
        let size = bytes.len();
        let response = self.send(Method::PUT, key, Some(bytes)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error("upload", key, status));
        }
        debug!(key = %key, bytes = size, "stored artifact");
        Ok(())
    }

    async fn issue_url(&self, key: &CacheKey, ttl: Duration) -> Result<String, CacheError> {
        let ttl = ttl.min(MAX_PRESIGN_TTL);
        let canonical_uri = self.canonical_uri(key);
        let query = self
            .signer
            .presign_get(&self.host, &canonical_uri, ttl, Utc::now());
        Ok(format!("{}?{query}", self.object_url(&canonical_uri)))
    }

    async fn read_bytes(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        let response = self.send(Method::GET, key, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error("download", key, status));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::unavailable(format!("failed to read artifact {key}: {e}")))?;
        Ok(bytes.to_vec())
    }
}
