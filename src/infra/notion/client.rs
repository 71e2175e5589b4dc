use std::{
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{
    Client, Method, Response, StatusCode, Url,
    header::{AUTHORIZATION, HeaderMap, RETRY_AFTER},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    application::repos::{ContentSource, CursorPage, RepoError},
    config::NotionSettings,
    domain::{
        blocks::Block,
        ids::NotionId,
        posts::{PUBLISHED_STATUS, PostRecord},
    },
    infra::telemetry::{NOTION_REQUEST_MS, NOTION_REQUESTS, NOTION_RETRIES},
};

use super::{
    NotionError, RequestGate,
    wire::{ErrorBody, ListEnvelope, block_from_value, post_from_value},
};

const NOTION_VERSION_HEADER: &str = "Notion-Version";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct NotionClientConfig {
    pub base_url: Url,
    pub token: String,
    pub api_version: String,
    pub data_source_id: Option<NotionId>,
    pub page_size: NonZeroU32,
    pub min_request_interval: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
}

impl From<&NotionSettings> for NotionClientConfig {
    fn from(settings: &NotionSettings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            token: settings.token.clone(),
            api_version: settings.api_version.clone(),
            data_source_id: settings.data_source_id.clone(),
            page_size: settings.page_size,
            min_request_interval: settings.min_request_interval,
            max_retries: settings.max_retries,
            retry_base_delay: settings.retry_base_delay,
            request_timeout: settings.request_timeout,
        }
    }
}

/// Notion REST client shared by every request path; all requests pass one gate.
#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base: Url,
    token: String,
    api_version: String,
    data_source_id: Option<NotionId>,
    page_size: NonZeroU32,
    max_retries: u32,
    retry_base_delay: Duration,
    gate: Arc<RequestGate>,
}

impl NotionClient {
    pub fn new(config: NotionClientConfig) -> Result<Self, NotionError> {
        let http = Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base: config.base_url.join("/")?,
            token: config.token,
            api_version: config.api_version,
            data_source_id: config.data_source_id,
            page_size: config.page_size,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            gate: Arc::new(RequestGate::new(config.min_request_interval)),
        })
    }

    fn url(&self, path: &str) -> Result<Url, NotionError> {
        Ok(self.base.join(path)?)
    }

    /// Send with throttling and retries, returning the decoded success body.
    async fn send<T>(
        &self,
        op: &'static str,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, NotionError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt: u32 = 0;

        loop {
            self.gate.wait().await;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(AUTHORIZATION, format!("Bearer {}", self.token))
                .header(NOTION_VERSION_HEADER, self.api_version.as_str());
            if let Some(body) = body {
                request = request.json(body);
            }

            counter!(NOTION_REQUESTS, "op" => op).increment(1);
            let started = Instant::now();
            let outcome = request.send().await;
            histogram!(NOTION_REQUEST_MS, "op" => op)
                .record(started.elapsed().as_secs_f64() * 1000.0);

            let delay = match outcome {
                Ok(response) if response.status().is_success() => {
                    let bytes = response.bytes().await?;
                    return serde_json::from_slice(&bytes).map_err(|err| {
                        NotionError::Decode(format!("{op}: failed to parse body: {err}"))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    if attempt >= self.max_retries || !is_retryable(status) {
                        return Err(failure(op, attempt, response).await);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        retry_after(response.headers()).unwrap_or_else(|| self.backoff(attempt))
                    } else {
                        self.backoff(attempt)
                    }
                }
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    debug!(op, error = %err, "Transient Notion transport error");
                    self.backoff(attempt)
                }
                Err(err) => return Err(err.into()),
            };

            attempt += 1;
            counter!(NOTION_RETRIES, "op" => op).increment(1);
            warn!(
                op,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying Notion request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(MAX_BACKOFF)
    }

    async fn list_children_page(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<CursorPage<Block>, NotionError> {
        let mut url = self.url(&format!("v1/blocks/{block_id}/children"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &self.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }

        let envelope: ListEnvelope = self.send("list_children", Method::GET, url, None).await?;
        let next_cursor = envelope.continuation();
        let items = envelope
            .results
            .iter()
            .filter_map(block_from_value)
            .collect();

        Ok(CursorPage { items, next_cursor })
    }

    async fn query_page(
        &self,
        data_source: &NotionId,
        cursor: Option<&str>,
    ) -> Result<CursorPage<PostRecord>, NotionError> {
        let url = self.url(&format!("v1/data_sources/{data_source}/query"))?;
        let mut body = json!({
            "filter": {
                "property": "status",
                "status": { "equals": PUBLISHED_STATUS }
            },
            "sorts": [{ "property": "createdAt", "direction": "descending" }],
            "page_size": self.page_size.get(),
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = Value::String(cursor.to_string());
        }

        let envelope: ListEnvelope = self
            .send("query_data_source", Method::POST, url, Some(&body))
            .await?;
        let next_cursor = envelope.continuation();
        let items = envelope
            .results
            .iter()
            .filter_map(post_from_value)
            .collect();

        Ok(CursorPage { items, next_cursor })
    }

    async fn retrieve_page(&self, id: &NotionId) -> Result<Option<PostRecord>, NotionError> {
        let url = self.url(&format!("v1/pages/{id}"))?;
        match self.send::<Value>("retrieve_page", Method::GET, url, None).await {
            Ok(page) => Ok(post_from_value(&page)),
            Err(NotionError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn query_published(
        &self,
        cursor: Option<&str>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        let Some(data_source) = self.data_source_id.as_ref() else {
            return Ok(CursorPage::last(Vec::new()));
        };
        Ok(self.query_page(data_source, cursor).await?)
    }

    async fn retrieve_post(&self, id: &NotionId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.retrieve_page(id).await?)
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<CursorPage<Block>, RepoError> {
        Ok(self.list_children_page(block_id, cursor).await?)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Server-requested delay, never longer than `MAX_BACKOFF`.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    let delay = Duration::try_from_secs_f64(seconds).unwrap_or(MAX_BACKOFF);
    Some(delay.min(MAX_BACKOFF))
}

async fn failure(op: &'static str, retries: u32, response: Response) -> NotionError {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
        .unwrap_or_default();

    if status == StatusCode::NOT_FOUND || body.code == "object_not_found" {
        return NotionError::NotFound;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return NotionError::RateLimited { retries };
    }

    warn!(
        op,
        status = status.as_u16(),
        code = %body.code,
        "Notion request failed"
    );
    NotionError::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message,
    }
}
