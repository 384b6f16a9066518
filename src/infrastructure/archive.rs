use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::errors::ArchiveError;
use crate::domain::frames::FrameMetadata;
use crate::domain::ids::{FrameId, ObservationRequestId};
use crate::domain::repositories::FrameArchive;

pub const DEFAULT_ARCHIVE_API_URL: &str = "https://archive-api.lco.global/";
const USER_AGENT: &str = "thumbservice/1.0";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const LISTING_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Frame archive reached over its REST API.
#[derive(Clone)]
pub struct HttpFrameArchive {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFrameArchive {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid archive API url: {base_url}"))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path().trim_end_matches('/')));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to configure archive HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ArchiveError> {
        self.base_url
            .join(path)
            .map_err(|e| ArchiveError::Unavailable(format!("invalid archive path {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        authorization: Option<&str>,
        timeout: Duration,
    ) -> Result<T, ArchiveError> {
        let mut request = self.client.get(url.clone()).query(query).timeout(timeout);
        if let Some(authorization) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = request.send().await.map_err(|e| request_error(&url, &e))?;
        let response = check_status(&url, response)?;

        response.json::<T>().await.map_err(|e| {
            ArchiveError::Unavailable(format!("unreadable archive response from {url}: {e}"))
        })
    }
}

#[async_trait]
impl FrameArchive for HttpFrameArchive {
    async fn get(
        &self,
        id: FrameId,
        authorization: Option<&str>,
    ) -> Result<FrameMetadata, ArchiveError> {
        let url = self.endpoint(&format!("frames/{id}/"))?;
        let record: FrameRecord = self
            .get_json(url, &[], authorization, LOOKUP_TIMEOUT)
            .await?;
        Ok(record.into_domain())
    }

    async fn find_by_basename(
        &self,
        basename: &str,
        authorization: Option<&str>,
    ) -> Result<Vec<FrameMetadata>, ArchiveError> {
        let url = self.endpoint("frames/")?;
        let listing: FrameListing = self
            .get_json(
                url,
                &[("basename_exact", basename.to_string())],
                authorization,
                LOOKUP_TIMEOUT,
            )
            .await?;
        Ok(listing.into_domain())
    }

    async fn list_for_request(
        &self,
        request_id: ObservationRequestId,
        reduction_level: i32,
        authorization: Option<&str>,
    ) -> Result<Vec<FrameMetadata>, ArchiveError> {
        let url = self.endpoint("frames/")?;
        let listing: FrameListing = self
            .get_json(
                url,
                &[
                    ("request_id", request_id.to_string()),
                    ("reduction_level", reduction_level.to_string()),
                ],
                authorization,
                LISTING_TIMEOUT,
            )
            .await?;
        Ok(listing.into_domain())
    }

    async fn download(
        &self,
        frame: &FrameMetadata,
        destination: &Path,
    ) -> Result<(), ArchiveError> {
        let raw_url = frame.data_url.as_deref().unwrap_or_default();
        let url = Url::parse(raw_url).map_err(|e| {
            ArchiveError::Unavailable(format!("frame {} has an invalid data url: {e}", frame.id))
        })?;

        let response = self
            .client
            .get(url.clone())
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(&url, &e))?;
        let mut response = check_status(&url, response)?;

        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            ArchiveError::Unavailable(format!("failed to create {}: {e}", destination.display()))
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(&url, &e))?
        {
            file.write_all(&chunk).await.map_err(|e| {
                ArchiveError::Unavailable(format!("failed to write {}: {e}", destination.display()))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            ArchiveError::Unavailable(format!("failed to flush {}: {e}", destination.display()))
        })?;

        debug!(frame.id = %frame.id, bytes = written, "downloaded raw frame");
        Ok(())
    }
}

fn request_error(url: &Url, err: &reqwest::Error) -> ArchiveError {
    if err.is_timeout() {
        return ArchiveError::Timeout(url.to_string());
    }
    warn!(%url, error = %err, "archive request failed");
    ArchiveError::Unavailable(format!("error accessing {url}"))
}

fn check_status(url: &Url, response: reqwest::Response) -> Result<reqwest::Response, ArchiveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(ArchiveError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ArchiveError::Unauthorized(status.as_u16()))
        }
        _ => {
            warn!(%url, %status, "archive returned an error response");
            Err(ArchiveError::Unavailable(format!(
                "got error response {status} from the archive"
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrameListing {
    #[serde(default)]
    results: Vec<FrameRecord>,
}

impl FrameListing {
    fn into_domain(self) -> Vec<FrameMetadata> {
        self.results
            .into_iter()
            .map(FrameRecord::into_domain)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    id: i64,
    #[serde(default)]
    basename: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    request_id: Option<i64>,
    #[serde(default)]
    primary_optical_element: Option<String>,
    #[serde(default)]
    reduction_level: Option<i32>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    proposal_id: Option<String>,
    #[serde(default)]
    configuration_type: Option<String>,
    #[serde(default)]
    public_date: Option<DateTime<Utc>>,
}

impl FrameRecord {
    fn into_domain(self) -> FrameMetadata {
        FrameMetadata {
            id: FrameId::new(self.id),
            basename: self.basename.unwrap_or_default(),
            filename: self.filename.unwrap_or_default(),
            request_id: self.request_id.map(ObservationRequestId::new),
            filter: self.primary_optical_element.unwrap_or_default(),
            reduction_level: self.reduction_level.unwrap_or_default(),
            data_url: self.url,
            proposal_id: self.proposal_id,
            configuration_type: self.configuration_type,
            proprietary: self.public_date.is_some_and(|date| date > Utc::now()),
        }
    }
}
