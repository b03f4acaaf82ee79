use std::time::Duration;

use bytes::Bytes;
use collector_core::{Group, Job};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::{FailureKind, FetchError};

const ERROR_BODY_EXCERPT: usize = 512;

/// Raw result payload, consumed chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    /// Upper bound for the whole listing request.
    pub request_timeout: Duration,
    /// Upper bound between two reads of a result stream.
    pub read_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(120),
        }
    }
}

/// The two calls the collector makes against a job provider.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn list_jobs(&self, group: &Group) -> Result<Vec<Job>, FetchError>;

    /// Opens the result stream for a job. A non-2xx answer is an error; nothing is streamed.
    async fn open_results(&self, group: &Group, job_id: &str) -> Result<ByteStream, FetchError>;
}

#[derive(Deserialize)]
struct JobListing {
    data: Vec<Job>,
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl ReqwestJobClient {
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn get(&self, group: &Group, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(AUTHORIZATION, group.authorization_header())
            .header(ACCEPT, "application/json")
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobClient {
    async fn list_jobs(&self, group: &Group) -> Result<Vec<Job>, FetchError> {
        let response = self
            .get(group, group.jobs_url())
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let listing: JobListing = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::InvalidBody, err.to_string()))?;
        Ok(listing.data)
    }

    async fn open_results(&self, group: &Group, job_id: &str) -> Result<ByteStream, FetchError> {
        let response = self
            .get(group, group.job_result_url(job_id))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

/// Turns a non-2xx response into `HttpStatus` carrying an excerpt of the body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::new(
        FailureKind::HttpStatus(status.as_u16()),
        excerpt(&body),
    ))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_EXCERPT {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_EXCERPT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(ERROR_BODY_EXCERPT + 10);
        let cut = excerpt(&body);
        assert_eq!(cut.len(), ERROR_BODY_EXCERPT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn short_bodies_are_trimmed_only() {
        assert_eq!(excerpt("  oops \n"), "oops");
    }
}
