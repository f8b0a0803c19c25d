//! Persistence for series metadata, observations, freshness and extraction logs.
//!
//! Every method takes the caller's `&mut SqliteConnection` and never commits:
//! wrap calls in `conn.immediate_transaction(..)` to make them atomic.
use std::time::Duration;

use bls_ingestor::models::series::ApiSeries;
use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use indexmap::IndexMap;
use serde::Serialize;

use crate::models::SeriesRecord;

mod repo;

pub use repo::SqliteRepo;

#[derive(thiserror::Error, Debug)]
/// Domain failures raised by the repository (database errors travel as `anyhow`).
pub enum RepoError {
    #[error("series {series_id} is not stored")]
    /// A freshness update named a series that has no metadata row.
    UnknownSeries {
        /// The requested series.
        series_id: String,
    },

    #[error("invalid argument: {0}")]
    /// A caller-supplied bound was out of range.
    InvalidArgument(String),
}

/// Result type used throughout the repository for fallible operations.
pub type RepoResult<T> = anyhow::Result<T>;

/// Catalog metadata carried with a series to persist. `None` means "unknown",
/// never "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMetadata {
    pub series_title: Option<String>,
    pub survey_name: Option<String>,
    pub measure_data_type: Option<String>,
    pub area: Option<String>,
    pub item: Option<String>,
    pub seasonality: Option<String>,
}

/// One observation to persist. `value` is the raw API text.
#[derive(Debug, Clone, PartialEq)]
pub struct PointItem {
    pub year: i32,
    pub period: String,
    pub period_name: Option<String>,
    pub value: Option<String>,
    /// Footnote texts joined with `"; "`.
    pub footnotes: Option<String>,
}

/// One series and its observations, as handed to [`SeriesRepo::upsert_series_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesItem {
    pub series_id: String,
    pub metadata: SeriesMetadata,
    pub latest: Option<bool>,
    pub points: Vec<PointItem>,
}

impl From<&ApiSeries> for SeriesItem {
    fn from(s: &ApiSeries) -> Self {
        let metadata = s
            .catalog
            .as_ref()
            .map(|c| SeriesMetadata {
                series_title: c.series_title.clone(),
                survey_name: c.survey_name.clone(),
                measure_data_type: c.measure_data_type.clone(),
                area: c.area.clone(),
                item: c.item.clone(),
                seasonality: c.seasonality.clone(),
            })
            .unwrap_or_default();
        Self {
            series_id: s.series_id.clone(),
            metadata,
            latest: s.latest,
            points: s
                .data
                .iter()
                .map(|p| PointItem {
                    year: p.year,
                    period: p.period.clone(),
                    period_name: p.period_name.clone(),
                    value: p.value.clone(),
                    footnotes: p.footnote_text(),
                })
                .collect(),
        }
    }
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    /// New series metadata rows plus new observations.
    pub inserted: usize,
    /// Observations overwritten in place.
    pub updated: usize,
    /// Observations whose value was present but not numeric.
    pub skipped: usize,
}

impl UpsertCounts {
    /// Rows written (inserted + updated).
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Catalog fields returned with stored rows when requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMetadata {
    pub series_title: Option<String>,
    pub survey_name: Option<String>,
    pub measure_data_type: Option<String>,
    pub area: Option<String>,
    pub item: Option<String>,
    pub seasonality: Option<String>,
    pub latest: bool,
}

impl From<&SeriesRecord> for StoredMetadata {
    fn from(r: &SeriesRecord) -> Self {
        Self {
            series_title: r.series_title.clone(),
            survey_name: r.survey_name.clone(),
            measure_data_type: r.measure_data_type.clone(),
            area: r.area.clone(),
            item: r.item.clone(),
            seasonality: r.seasonality.clone(),
            latest: r.latest,
        }
    }
}

/// A stored observation joined with its series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub period_name: Option<String>,
    /// `YYYY-MM-DD`, first day of the period.
    pub date: String,
    pub value: f64,
    pub footnotes: Option<String>,
    pub extraction_id: Option<String>,
    /// Present when requested with `include_metadata`.
    pub metadata: Option<StoredMetadata>,
}

/// Freshness of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreshnessInfo {
    pub last_extracted: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub data_completeness: f64,
    pub expected_update_frequency: String,
    pub next_expected_update: Option<DateTime<Utc>>,
    pub extraction_priority: i32,
}

impl FreshnessInfo {
    /// True when never extracted or extracted more than `max_age_hours` before `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_hours: i64) -> bool {
        let Some(t) = self.last_extracted else {
            return true;
        };
        chrono::TimeDelta::try_hours(max_age_hours).is_some_and(|max| now - t > max)
    }
}

/// Final state of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Pending,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }
}

/// One fetch invocation to append to the extraction log.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord {
    pub extraction_id: String,
    pub series_ids: Vec<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub counts: UpsertCounts,
    pub status: ExtractionStatus,
    pub error_message: Option<String>,
    pub api_calls_made: usize,
    pub duration: Option<Duration>,
    pub metadata: Option<serde_json::Value>,
}

impl ExtractionRecord {
    /// A successful run with its counts.
    pub fn completed(extraction_id: impl Into<String>, series_ids: &[String], counts: UpsertCounts) -> Self {
        Self {
            extraction_id: extraction_id.into(),
            series_ids: series_ids.to_vec(),
            start_year: None,
            end_year: None,
            counts,
            status: ExtractionStatus::Completed,
            error_message: None,
            api_calls_made: 0,
            duration: None,
            metadata: None,
        }
    }

    /// A failed run carrying the error text.
    pub fn failed(extraction_id: impl Into<String>, series_ids: &[String], error: impl Into<String>) -> Self {
        Self {
            status: ExtractionStatus::Failed,
            error_message: Some(error.into()),
            ..Self::completed(extraction_id, series_ids, UpsertCounts::default())
        }
    }

    /// Sets the requested year span.
    pub fn with_years(mut self, start_year: Option<i32>, end_year: Option<i32>) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    /// Sets the number of remote requests and wall time.
    pub fn with_run(mut self, api_calls_made: usize, duration: Duration) -> Self {
        self.api_calls_made = api_calls_made;
        self.duration = Some(duration);
        self
    }
}

/// Table counts and the most recent extraction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub series_count: i64,
    pub data_point_count: i64,
    pub extraction_count: i64,
    pub latest_extraction: Option<String>,
}

/// Portable surface, SQLite implementation lives in `repo.rs`.
pub trait SeriesRepo {
    /// Inserts or refreshes series metadata and observations, then touches each
    /// series' freshness row. A missing `extraction_id` gets a fresh UUID v4.
    fn upsert_series_data(
        &self,
        conn: &mut SqliteConnection,
        items: &[SeriesItem],
        extraction_id: Option<&str>,
    ) -> RepoResult<UpsertCounts>;

    /// Stored observations for `codes` within the inclusive year bounds,
    /// ordered by (series_id, year, period).
    fn get_series_data(
        &self,
        conn: &mut SqliteConnection,
        codes: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
        include_metadata: bool,
    ) -> RepoResult<Vec<StoredRow>>;

    /// Series never extracted, or extracted more than `max_age_hours` ago.
    fn get_stale_series(&self, conn: &mut SqliteConnection, max_age_hours: i64) -> RepoResult<Vec<String>>;

    /// Freshness rows for `codes`; codes without a row are absent from the map.
    fn get_data_freshness(
        &self,
        conn: &mut SqliteConnection,
        codes: &[String],
    ) -> RepoResult<IndexMap<String, FreshnessInfo>>;

    /// Touches the freshness row of `series_id` as of now.
    fn mark_series_updated(
        &self,
        conn: &mut SqliteConnection,
        series_id: &str,
        extraction_id: &str,
    ) -> RepoResult<()>;

    /// Appends one extraction log row, returning its id.
    fn log_extraction(&self, conn: &mut SqliteConnection, record: &ExtractionRecord) -> RepoResult<i32>;

    /// Case-insensitive substring search over title, area and item.
    fn search_series(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
        limit: i64,
    ) -> RepoResult<Vec<SeriesRecord>>;

    /// Table counts.
    fn stats(&self, conn: &mut SqliteConnection) -> RepoResult<DbStats>;

    /// Deletes extraction logs older than `retention_days`, returning how many.
    fn cleanup_extraction_logs(&self, conn: &mut SqliteConnection, retention_days: i64) -> RepoResult<usize>;
}
