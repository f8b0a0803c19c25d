use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use snafu::{ResultExt, ensure};
use tracing::{debug, warn};

use crate::{
    config::ApiConfig,
    models::{
        request_params::SeriesRequestParams,
        series::{ApiSeries, BlsResponse},
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, HttpSnafu, ProviderError, ProviderInitError,
        ReqwestSnafu, SeriesProvider, ValidationSnafu,
        bls_rest::{
            ApiKeyPool, RetryPolicy,
            params::{BlsPayload, construct_payload},
        },
    },
    requests::historical::ChunkLimits,
};

/// Public v2 timeseries endpoint.
pub const BLS_V2_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";

/// Characters of an error body kept in [`ProviderError::Http`].
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for the BLS v2 API.
///
/// Each chunk is sent as one POST with a randomly chosen registration key and
/// retried according to the injected [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct BlsRestProvider {
    client: Client,
    url: String,
    keys: ApiKeyPool,
    retry: RetryPolicy,
    limits: ChunkLimits,
}

impl BlsRestProvider {
    /// Creates a provider reading registration keys from the environment.
    ///
    /// Keys are the values of every variable starting with
    /// [`ApiConfig::key_env_prefix`] (`BLS_API_KEY_` by default).
    pub fn new(config: &ApiConfig, retry: RetryPolicy) -> Result<Self, ProviderInitError> {
        let keys = ApiKeyPool::from_env(&config.key_env_prefix)?;
        Self::with_keys(config, keys, retry)
    }

    /// Creates a provider with an explicit key pool.
    pub fn with_keys(
        config: &ApiConfig,
        keys: ApiKeyPool,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            url: config.url.clone(),
            keys,
            retry,
            limits: ChunkLimits {
                series_limit: config.series_limit,
                years_limit: config.years_limit,
            },
        })
    }

    /// The retry policy in effect.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn post_once(&self, payload: &BlsPayload) -> Result<BlsResponse, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return HttpSnafu {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
            }
            .fail();
        }

        let data = response.json::<BlsResponse>().await.context(ReqwestSnafu)?;
        ensure!(
            data.is_success(),
            ApiSnafu {
                status: data.status.clone(),
                message: data.message_text(),
            }
        );
        Ok(data)
    }

    async fn post_with_retry(&self, payload: &BlsPayload) -> Result<BlsResponse, ProviderError> {
        let mut retry = 0u32;
        loop {
            match self.post_once(payload).await {
                Ok(data) => return Ok(data),
                Err(err) if retry < self.retry.max_retries && self.retry.is_retryable(&err) => {
                    retry += 1;
                    let delay = self.retry.backoff(retry);
                    warn!(
                        retry,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "transient BLS API failure, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl SeriesProvider for BlsRestProvider {
    async fn fetch_chunk(
        &self,
        params: &SeriesRequestParams,
    ) -> Result<Vec<ApiSeries>, ProviderError> {
        ensure!(
            !params.series_ids.is_empty(),
            ValidationSnafu {
                message: "No series IDs provided."
            }
        );
        ensure!(
            params.series_ids.len() <= self.limits.series_limit,
            ValidationSnafu {
                message: format!(
                    "{} series exceed the per-request limit of {}",
                    params.series_ids.len(),
                    self.limits.series_limit
                )
            }
        );

        let mut payload = construct_payload(params);
        payload.registrationkey = self.keys.choose().map(str::to_string);

        debug!(
            series = payload.seriesid.len(),
            start = ?params.start_year,
            end = ?params.end_year,
            "posting BLS request"
        );

        let data = self.post_with_retry(&payload).await?;
        Ok(data.into_series())
    }

    fn limits(&self) -> ChunkLimits {
        self.limits
    }
}
