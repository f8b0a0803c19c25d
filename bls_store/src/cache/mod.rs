//! Freshness-aware fetching.
//!
//! [`CachedFetcher`] answers a series request from the local store when every
//! requested code was extracted recently enough, and otherwise fetches only
//! the stale codes from the remote API, persists them and merges them with
//! what was already stored:
//!
//! ```text
//! use_cache && db ok && !force_refresh
//!     stale = get_stale_series(max_age) ∩ codes  ∪  codes without freshness
//!     stale = {}  -> cached response, 0 requests
//!     else        -> fetch(stale) -> persist -> merge(cached, fetched)
//! otherwise       -> fetch(codes) -> persist
//! ```
//!
//! The store is best effort: any database failure is logged and the request
//! is served remotely. Only remote failures reach the caller.

pub mod merge;

use std::{collections::HashSet, time::Instant};

use bls_ingestor::{
    models::{
        request_params::{RequestOptions, SeriesRequestParams},
        series::{ApiSeries, BlsResponse},
    },
    parse_results,
    providers::{ProviderError, SeriesProvider},
    requests::historical::{fetch_series, plan_chunks},
    SeriesRow,
};
use diesel::SqliteConnection;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    db::connection::{connect_sqlite, health_check},
    repository::{ExtractionRecord, SeriesItem, SeriesRepo, SqliteRepo},
};

/// Default freshness threshold.
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Failures of the cache decision phase. Never surfaced past [`CachedFetcher`].
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache database is unavailable")]
    Unavailable,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Entirely from the local store.
    Cache,
    /// Entirely from the remote API.
    Remote,
    /// Stored series plus freshly fetched stale ones.
    Merged,
}

/// Result of [`CachedFetcher::fetch_with_cache`].
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFetch {
    pub response: BlsResponse,
    pub source: DataSource,
    /// Remote requests issued while serving this call.
    pub api_requests: usize,
}

impl CachedFetch {
    /// Flattens the response, attaching aliases from `trace`.
    pub fn into_rows(self, trace: &IndexMap<String, Vec<String>>) -> Vec<SeriesRow> {
        parse_results(&self.response, trace)
    }
}

enum CachePlan {
    Fresh(Vec<ApiSeries>),
    Partial { cached: Vec<ApiSeries>, stale: Vec<String> },
}

/// Remote provider fronted by the SQLite store.
pub struct CachedFetcher<P> {
    provider: P,
    conn: Option<SqliteConnection>,
    repo: SqliteRepo,
    max_age_hours: i64,
    options: RequestOptions,
}

impl<P: SeriesProvider> CachedFetcher<P> {
    /// Opens `database_url` and checks it with `SELECT 1`. A failure leaves the
    /// fetcher in remote-only mode.
    pub fn new(provider: P, database_url: &str, max_age_hours: i64) -> Self {
        let conn = match connect_sqlite(database_url).and_then(|mut c| health_check(&mut c).map(|_| c)) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Cache database unavailable, fetching remotely only: {e:#}");
                None
            }
        };
        Self {
            provider,
            conn,
            repo: SqliteRepo::new(),
            max_age_hours,
            options: RequestOptions::default(),
        }
    }

    /// Uses an already open connection.
    pub fn with_connection(provider: P, conn: SqliteConnection, max_age_hours: i64) -> Self {
        Self {
            provider,
            conn: Some(conn),
            repo: SqliteRepo::new(),
            max_age_hours,
            options: RequestOptions::default(),
        }
    }

    /// A fetcher with no store at all.
    pub fn remote_only(provider: P) -> Self {
        Self {
            provider,
            conn: None,
            repo: SqliteRepo::new(),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            options: RequestOptions::default(),
        }
    }

    /// Optional request flags sent with every remote fetch.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// True when a store connection is held.
    pub fn cache_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Gives the connection back, e.g. to inspect what was persisted.
    pub fn into_connection(self) -> Option<SqliteConnection> {
        self.conn
    }

    /// Serves `codes` over `[start_year, end_year]`, from the store where fresh.
    pub async fn fetch_with_cache(
        &mut self,
        codes: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
        use_cache: bool,
        force_refresh: bool,
    ) -> Result<CachedFetch, ProviderError> {
        if !use_cache || self.conn.is_none() || force_refresh {
            debug!(use_cache, force_refresh, "bypassing cache lookup");
            return self.remote(codes, start_year, end_year).await;
        }

        match self.plan(codes, start_year, end_year) {
            Ok(CachePlan::Fresh(series)) => {
                info!(series = series.len(), "all requested series fresh, served from cache");
                Ok(CachedFetch {
                    response: BlsResponse::succeeded(series),
                    source: DataSource::Cache,
                    api_requests: 0,
                })
            }
            Ok(CachePlan::Partial { cached, stale }) => {
                info!(
                    stale = stale.len(),
                    requested = codes.len(),
                    "refreshing stale series"
                );
                let (fetched, api_requests) = self.fetch_and_persist(&stale, start_year, end_year).await?;
                let merged = merge::merge_series(codes, cached, fetched.into_series());
                Ok(CachedFetch {
                    response: BlsResponse::succeeded(merged),
                    source: DataSource::Merged,
                    api_requests,
                })
            }
            Err(e) => {
                warn!("Cache lookup failed, falling back to remote fetch: {e:#}");
                self.remote(codes, start_year, end_year).await
            }
        }
    }

    fn plan(&mut self, codes: &[String], start_year: Option<i32>, end_year: Option<i32>) -> Result<CachePlan, CacheError> {
        let conn = self.conn.as_mut().ok_or(CacheError::Unavailable)?;

        let stored = self.repo.get_series_data(conn, codes, start_year, end_year, true)?;
        let freshness = self.repo.get_data_freshness(conn, codes)?;
        let stale_all: HashSet<String> = self
            .repo
            .get_stale_series(conn, self.max_age_hours)?
            .into_iter()
            .collect();

        let stale: Vec<String> = codes
            .iter()
            .filter(|c| stale_all.contains(*c) || !freshness.contains_key(*c))
            .cloned()
            .collect();

        let cached = merge::stored_to_series(stored);
        if stale.is_empty() {
            Ok(CachePlan::Fresh(merge::merge_series(codes, cached, Vec::new())))
        } else {
            Ok(CachePlan::Partial { cached, stale })
        }
    }

    async fn remote(
        &mut self,
        codes: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<CachedFetch, ProviderError> {
        let (response, api_requests) = self.fetch_and_persist(codes, start_year, end_year).await?;
        Ok(CachedFetch {
            response,
            source: DataSource::Remote,
            api_requests,
        })
    }

    async fn fetch_and_persist(
        &mut self,
        codes: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<(BlsResponse, usize), ProviderError> {
        let params = SeriesRequestParams::new(codes.to_vec(), start_year, end_year).with_options(self.options);
        let api_requests = plan_chunks(&params, self.provider.limits()).len();
        let extraction_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        match fetch_series(&self.provider, &params).await {
            Ok(response) => {
                let record = ExtractionRecord::completed(&extraction_id, codes, Default::default())
                    .with_years(start_year, end_year)
                    .with_run(api_requests, started.elapsed());
                self.persist(response.series(), record);
                Ok((response, api_requests))
            }
            Err(e) => {
                let record = ExtractionRecord::failed(&extraction_id, codes, e.to_string())
                    .with_years(start_year, end_year)
                    .with_run(api_requests, started.elapsed());
                self.log_failure(&record);
                Err(e)
            }
        }
    }

    fn persist(&mut self, series: &[ApiSeries], mut record: ExtractionRecord) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        let repo = self.repo;
        let items: Vec<SeriesItem> = series.iter().map(SeriesItem::from).collect();

        let result = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
            let counts = repo.upsert_series_data(conn, &items, Some(&record.extraction_id))?;
            record.counts = counts;
            repo.log_extraction(conn, &record)?;
            Ok(counts)
        });
        match result {
            Ok(counts) => info!(
                extraction_id = %record.extraction_id,
                inserted = counts.inserted,
                updated = counts.updated,
                skipped = counts.skipped,
                "persisted fetched series"
            ),
            Err(e) => warn!("Failed to persist fetched series: {e:#}"),
        }
    }

    fn log_failure(&mut self, record: &ExtractionRecord) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        if let Err(e) = self.repo.log_extraction(conn, record) {
            warn!("Failed to record failed extraction: {e:#}");
        }
    }
}
