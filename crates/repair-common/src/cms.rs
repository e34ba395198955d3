use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CommonError;

/// Largest page the CMS list API will return.
pub const MAX_LIST_LIMIT: u32 = 100;

const API_KEY_HEADER: &str = "X-MICROCMS-API-KEY";
const DEFAULT_ORDERS: &str = "-createdAt";

#[derive(Clone, Debug)]
pub struct CmsClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl CmsClientConfig {
    /// Defaults for a microCMS service, e.g. `shop` -> `https://shop.microcms.io/api/v1`.
    pub fn for_service(service_domain: &str, api_key: &str) -> Self {
        Self {
            base_url: format!("https://{}.microcms.io/api/v1", service_domain.trim()),
            api_key: api_key.to_string(),
            default_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

/// Query for a list endpoint. `limit` is clamped to [`MAX_LIST_LIMIT`] when sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u32,
    pub filters: Option<String>,
    pub orders: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            filters: None,
            orders: Some(DEFAULT_ORDERS.to_string()),
        }
    }
}

impl ListQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    /// Matches contents whose `field` equals `value` exactly.
    pub fn equals(field: &str, value: &str) -> Self {
        Self {
            filters: Some(format!("{field}[equals]{value}")),
            ..Self::default()
        }
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.min(MAX_LIST_LIMIT)
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.effective_limit().to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(filters) = self.filters.as_deref().filter(|f| !f.is_empty()) {
            pairs.push(("filters", filters.to_string()));
        }
        if let Some(orders) = self.orders.as_deref().filter(|o| !o.is_empty()) {
            pairs.push(("orders", orders.to_string()));
        }
        pairs
    }
}

/// Envelope of every CMS list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub contents: Vec<T>,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Clone)]
pub struct CmsClient {
    config: CmsClientConfig,
    http: reqwest::Client,
}

impl CmsClient {
    pub fn new(config: CmsClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("repair-catalog")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CmsClientConfig {
        &self.config
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &ListQuery,
    ) -> Result<ListResponse<T>, CommonError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let pairs = query.to_pairs();
        debug!(endpoint, ?pairs, "cms list request");
        self.request_with_retry(|| async {
            let resp = self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .query(&pairs)
                .timeout(self.config.default_timeout)
                .send()
                .await?;
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await
        })
        .await
    }

    async fn parse_json_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, CommonError> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        let body = read_limited_text(resp, max_error_body_bytes).await;
        let message = serde_json::from_str::<CmsErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body);
        Err(CommonError::Upstream { status, message })
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CommonError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "cms request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CmsErrorBody {
    message: Option<String>,
}

fn should_retry(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
        CommonError::Upstream { status, .. } => retryable_status(*status),
        CommonError::InvalidJson(_) => false,
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            b.truncate(max_bytes);
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read cms error body");
            "<failed to read error body>".to_string()
        }
    }
}
