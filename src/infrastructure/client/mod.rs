use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};

use crate::application::errors::ErrorResponse;
use crate::application::services::ThumbnailLink;
use crate::domain::requests::RenderOptions;

/// Talks to a running thumbnail service.
pub struct ThumbnailClient {
    base_url: Url,
    http: Client,
    token: Option<String>,
}

impl ThumbnailClient {
    pub fn new(base_url: Url, token: Option<String>) -> Result<Self> {
        let mut normalized = base_url;
        if !normalized.path().ends_with('/') {
            normalized.set_path(&format!("{}/", normalized.path().trim_end_matches('/')));
        }

        let http = Client::builder()
            .user_agent("thumbservice-cli/1.0")
            .build()
            .context("failed to configure HTTP client")?;

        Ok(Self {
            base_url: normalized,
            http,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_base_url(base_url: &str, token: Option<String>) -> Result<Self> {
        let url = Url::parse(base_url).with_context(|| format!("invalid service url: {base_url}"))?;
        Self::new(url, token)
    }

    /// Ask for a pre-signed link to the thumbnail of `frame` (an id or basename).
    pub async fn link(&self, frame: &str, options: &RenderOptions) -> Result<ThumbnailLink> {
        let url = self.endpoint(frame)?;
        let response = self
            .request(url)
            .query(&query_pairs(options))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Fetch the thumbnail image itself.
    pub async fn image(&self, frame: &str, options: &RenderOptions) -> Result<Vec<u8>> {
        let url = self.endpoint(frame)?;
        let mut query = query_pairs(options);
        query.push(("image", "true".to_string()));
        let response = self.request(url).query(&query).send().await?;

        if response.status().is_success() {
            let bytes = response
                .bytes()
                .await
                .context("failed to read thumbnail body")?;
            Ok(bytes.to_vec())
        } else {
            Err(self.response_error(response).await)
        }
    }

    pub(crate) fn endpoint(&self, frame: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("service url cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .push(frame)
            .push("");
        Ok(url)
    }

    /// Build a request, forwarding the archive token if one is configured.
    pub(crate) fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }
        request
    }

    pub(crate) async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .context("failed to deserialize response body")
        } else {
            Err(self.response_error(response).await)
        }
    }

    pub(crate) async fn response_error(&self, response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_slice::<ErrorResponse>(&bytes) {
            return anyhow!("request failed ({status}, {}): {}", err.kind, err.message);
        }

        let message = String::from_utf8_lossy(&bytes);
        anyhow!("request failed ({status}): {message}")
    }
}

fn query_pairs(options: &RenderOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("width", options.width.to_string()),
        ("height", options.height.to_string()),
        ("quality", options.quality.to_string()),
        ("percentile", options.percentile.to_string()),
    ];
    if let Some(label) = &options.label {
        query.push(("label", label.clone()));
    }
    if options.color {
        query.push(("color", "true".to_string()));
    }
    if options.median {
        query.push(("median", "true".to_string()));
    }
    query
}
