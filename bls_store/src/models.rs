//! Diesel models mapping to the database schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`]:
//! - [`crate::schema::bls_series`]: one metadata row per series
//! - [`crate::schema::bls_data_points`]: observations, unique per (series, year, period)
//! - [`crate::schema::bls_data_freshness`]: when each series was last ingested
//! - [`crate::schema::bls_extraction_logs`]: append-only record of fetch runs
//! - [`crate::schema::bls_aliases`]: persisted alias -> series mapping
//!
//! Timestamps are RFC 3339 UTC strings with millisecond precision, see
//! [`crate::timestamps`].

use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::bls_series`].
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = bls_series, primary_key(series_id), check_for_backend(diesel::sqlite::Sqlite))]
pub struct SeriesRecord {
    /// BLS series ID (e.g. "CUUR0000SA0").
    pub series_id: String,
    /// Catalog title.
    pub series_title: Option<String>,
    /// Survey name (e.g. "Consumer Price Index").
    pub survey_name: Option<String>,
    /// Measure type reported by the catalog.
    pub measure_data_type: Option<String>,
    /// Area label (e.g. "U.S. city average").
    pub area: Option<String>,
    /// Item label (e.g. "All items").
    pub item: Option<String>,
    /// Seasonality label.
    pub seasonality: Option<String>,
    /// Index base period (e.g. "1982-84=100").
    pub base_period: Option<String>,
    /// First year with data, from the master list.
    pub begin_year: Option<i32>,
    /// First period with data.
    pub begin_period: Option<String>,
    /// Last year with data.
    pub end_year: Option<i32>,
    /// Last period with data.
    pub end_period: Option<String>,
    /// Series-level latest flag from the most recent ingestion.
    pub latest: bool,
    /// "monthly" unless known otherwise.
    pub data_frequency: String,
    /// When metadata last changed.
    pub last_updated: Option<String>,
    /// Row creation timestamp.
    pub created_at: String,
    /// Row update timestamp.
    pub updated_at: String,
}

/// Insertable form of [`SeriesRecord`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bls_series)]
pub struct NewSeries<'a> {
    pub series_id: &'a str,
    pub series_title: Option<&'a str>,
    pub survey_name: Option<&'a str>,
    pub measure_data_type: Option<&'a str>,
    pub area: Option<&'a str>,
    pub item: Option<&'a str>,
    pub seasonality: Option<&'a str>,
    pub base_period: Option<&'a str>,
    pub begin_year: Option<i32>,
    pub begin_period: Option<&'a str>,
    pub end_year: Option<i32>,
    pub end_period: Option<&'a str>,
    pub latest: bool,
    pub last_updated: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Metadata update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = bls_series)]
pub struct SeriesChanges<'a> {
    pub series_title: Option<&'a str>,
    pub survey_name: Option<&'a str>,
    pub measure_data_type: Option<&'a str>,
    pub area: Option<&'a str>,
    pub item: Option<&'a str>,
    pub seasonality: Option<&'a str>,
    pub base_period: Option<&'a str>,
    pub begin_year: Option<i32>,
    pub begin_period: Option<&'a str>,
    pub end_year: Option<i32>,
    pub end_period: Option<&'a str>,
    pub latest: Option<bool>,
    pub last_updated: Option<&'a str>,
    pub updated_at: Option<&'a str>,
}

/// A row in [`crate::schema::bls_data_points`].
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = bls_data_points, check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(belongs_to(SeriesRecord, foreign_key = series_id))]
pub struct DataPointRecord {
    /// Database primary key.
    pub id: i32,
    /// FK to [`SeriesRecord::series_id`].
    pub series_id: String,
    pub year: i32,
    /// BLS period code (`M01`, `Q02`, `A01`...).
    pub period: String,
    pub period_name: Option<String>,
    /// First day of the period as `YYYY-MM-DD`; see [`crate::period::period_to_date`].
    pub date: String,
    pub value: f64,
    /// Footnote texts joined with `"; "`.
    pub footnotes: Option<String>,
    /// Origin of the value; "api" for everything ingested here.
    pub data_source: String,
    /// Extraction run that last wrote this row.
    pub extraction_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable form of [`DataPointRecord`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bls_data_points)]
pub struct NewDataPoint<'a> {
    pub series_id: &'a str,
    pub year: i32,
    pub period: &'a str,
    pub period_name: Option<&'a str>,
    pub date: &'a str,
    pub value: f64,
    pub footnotes: Option<&'a str>,
    pub extraction_id: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Overwrite of an existing observation. `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bls_data_points, treat_none_as_null = true)]
pub struct DataPointUpdate<'a> {
    pub period_name: Option<&'a str>,
    pub date: &'a str,
    pub value: f64,
    pub footnotes: Option<&'a str>,
    pub extraction_id: Option<&'a str>,
    pub updated_at: &'a str,
}

/// A row in [`crate::schema::bls_data_freshness`].
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = bls_data_freshness, primary_key(series_id), check_for_backend(diesel::sqlite::Sqlite))]
pub struct FreshnessRecord {
    pub series_id: String,
    /// Last time the series was fetched and stored; NULL means never.
    pub last_extracted: Option<String>,
    pub last_updated: Option<String>,
    /// Fraction of expected points present, 0.0 to 1.0.
    pub data_completeness: f64,
    /// Human-readable cadence such as "1 month".
    pub expected_update_frequency: String,
    pub next_expected_update: Option<String>,
    /// 1 = high .. 10 = low.
    pub extraction_priority: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable form of [`FreshnessRecord`]; other columns take their defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bls_data_freshness)]
pub struct NewFreshness<'a> {
    pub series_id: &'a str,
    pub last_extracted: Option<&'a str>,
    pub last_updated: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// A row in [`crate::schema::bls_extraction_logs`]. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = bls_extraction_logs, check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExtractionLogRecord {
    pub id: i32,
    pub extraction_id: String,
    /// JSON array of the requested series IDs.
    pub series_ids: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub records_extracted: i32,
    pub records_updated: i32,
    pub records_inserted: i32,
    /// "pending" | "completed" | "failed".
    pub extraction_status: String,
    pub error_message: Option<String>,
    pub api_calls_made: i32,
    pub extraction_duration_seconds: Option<i32>,
    /// Free-form JSON object.
    pub extraction_metadata: Option<String>,
    pub created_at: String,
}

/// Insertable form of [`ExtractionLogRecord`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bls_extraction_logs)]
pub struct NewExtractionLog<'a> {
    pub extraction_id: &'a str,
    pub series_ids: &'a str,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub records_extracted: i32,
    pub records_updated: i32,
    pub records_inserted: i32,
    pub extraction_status: &'a str,
    pub error_message: Option<&'a str>,
    pub api_calls_made: i32,
    pub extraction_duration_seconds: Option<i32>,
    pub extraction_metadata: Option<&'a str>,
    pub created_at: &'a str,
}

/// A row in [`crate::schema::bls_aliases`].
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = bls_aliases, check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(belongs_to(SeriesRecord, foreign_key = series_id))]
pub struct AliasRecord {
    pub id: i32,
    /// Normalized alias key.
    pub alias: String,
    pub series_id: String,
    /// "user" for aliases synced from a mapping file.
    pub alias_type: String,
    pub created_at: String,
}

/// Insertable form of [`AliasRecord`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bls_aliases)]
pub struct NewAlias<'a> {
    pub alias: &'a str,
    pub series_id: &'a str,
    pub alias_type: &'a str,
    pub created_at: &'a str,
}
