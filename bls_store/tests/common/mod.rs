#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bls_ingestor::{
    models::{
        request_params::SeriesRequestParams,
        series::{ApiDataPoint, ApiSeries, Footnote, SeriesCatalog},
    },
    providers::{ProviderError, SeriesProvider, ValidationSnafu},
};
use bls_store::{
    db::{connection, migrate},
    repository::{PointItem, SeriesItem, SeriesMetadata},
};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}
#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    n: i64,
}
#[derive(QueryableByName)]
struct FkViolation {
    #[diesel(sql_type = Text)]
    table: String,
}

pub struct TestDb {
    _dir: TempDir,
    pub path: String,
}

/// Migrated database in a fresh temp dir, plus a connection with PRAGMAs applied.
pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    diesel::sql_query(format!("SELECT COUNT(*) AS n FROM {table}"))
        .get_result::<Count>(conn)
        .unwrap()
        .n
}

pub fn fk_check_empty(conn: &mut SqliteConnection) {
    let violations: Vec<FkViolation> = diesel::sql_query("PRAGMA foreign_key_check;").load(conn).unwrap();
    let tables: Vec<String> = violations.into_iter().map(|v| v.table).collect();
    assert!(tables.is_empty(), "foreign key violations in {tables:?}");
}

/// Backdates the freshness of `series_id` by `hours`.
pub fn age_freshness(conn: &mut SqliteConnection, series_id: &str, hours: i64) {
    let ts = bls_store::timestamps::hours_before(chrono::Utc::now(), hours);
    diesel::sql_query("UPDATE bls_data_freshness SET last_extracted = ? WHERE series_id = ?")
        .bind::<Text, _>(ts)
        .bind::<Text, _>(series_id)
        .execute(conn)
        .unwrap();
}

pub fn point(year: i32, period: &str, value: Option<&str>) -> PointItem {
    PointItem {
        year,
        period: period.to_string(),
        period_name: None,
        value: value.map(str::to_string),
        footnotes: None,
    }
}

pub fn item(series_id: &str, title: Option<&str>, points: Vec<PointItem>) -> SeriesItem {
    SeriesItem {
        series_id: series_id.to_string(),
        metadata: SeriesMetadata {
            series_title: title.map(str::to_string),
            ..Default::default()
        },
        latest: None,
        points,
    }
}

/// One `M01` observation per year in the request span, valued `marker`.
pub fn synthetic_series(code: &str, params: &SeriesRequestParams, marker: &str) -> ApiSeries {
    let end = params.end_year.unwrap_or(2024);
    let start = params.start_year.unwrap_or(end);
    ApiSeries {
        series_id: code.to_string(),
        catalog: Some(SeriesCatalog {
            series_title: Some(format!("Title of {code}")),
            ..Default::default()
        }),
        latest: Some(false),
        data: (start..=end)
            .map(|year| ApiDataPoint {
                year,
                period: "M01".to_string(),
                period_name: Some("January".to_string()),
                latest: None,
                value: Some(marker.to_string()),
                footnotes: vec![Footnote::default()],
            })
            .collect(),
    }
}

/// Serves synthetic series and records every chunk it was asked for.
#[derive(Default)]
pub struct RecordingProvider {
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<Vec<String>>>,
    pub marker: String,
}

impl RecordingProvider {
    pub fn with_marker(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_codes(&self) -> Vec<String> {
        self.requested.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl SeriesProvider for RecordingProvider {
    async fn fetch_chunk(&self, params: &SeriesRequestParams) -> Result<Vec<ApiSeries>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(params.series_ids.clone());
        Ok(params
            .series_ids
            .iter()
            .map(|c| synthetic_series(c, params, &self.marker))
            .collect())
    }
}

/// Fails every request.
#[derive(Default)]
pub struct FailingProvider {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SeriesProvider for FailingProvider {
    async fn fetch_chunk(&self, _params: &SeriesRequestParams) -> Result<Vec<ApiSeries>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ValidationSnafu {
            message: "remote unavailable",
        }
        .fail()
    }
}
