use anyhow::Context;
use chrono::Utc;
use diesel::prelude::*;
use indexmap::IndexMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    models::{
        DataPointRecord, DataPointUpdate, FreshnessRecord, NewDataPoint, NewExtractionLog, NewFreshness,
        NewSeries, SeriesChanges, SeriesRecord,
    },
    period::period_date_string,
    repository::{
        DbStats, ExtractionRecord, FreshnessInfo, RepoError, RepoResult, SeriesItem, SeriesRepo,
        StoredMetadata, StoredRow, UpsertCounts,
    },
    schema::{bls_data_freshness, bls_data_points, bls_extraction_logs, bls_series},
    timestamps::{days_before, hours_before, now_rfc3339, parse_ts_to_utc},
};

/// Repository over the SQLite schema in [`crate::schema`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRepo;

impl SqliteRepo {
    pub fn new() -> Self {
        Self
    }
}

/// Inserts the series row, or overwrites only the fields the item carries.
/// Returns true when a new row was created.
fn upsert_metadata(conn: &mut SqliteConnection, item: &SeriesItem, now: &str) -> QueryResult<bool> {
    let m = &item.metadata;
    let exists = bls_series::table
        .find(&item.series_id)
        .select(bls_series::series_id)
        .first::<String>(conn)
        .optional()?
        .is_some();

    if exists {
        let changes = SeriesChanges {
            series_title: m.series_title.as_deref(),
            survey_name: m.survey_name.as_deref(),
            measure_data_type: m.measure_data_type.as_deref(),
            area: m.area.as_deref(),
            item: m.item.as_deref(),
            seasonality: m.seasonality.as_deref(),
            latest: item.latest,
            last_updated: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        diesel::update(bls_series::table.find(&item.series_id))
            .set(&changes)
            .execute(conn)?;
        Ok(false)
    } else {
        let row = NewSeries {
            series_id: &item.series_id,
            series_title: m.series_title.as_deref(),
            survey_name: m.survey_name.as_deref(),
            measure_data_type: m.measure_data_type.as_deref(),
            area: m.area.as_deref(),
            item: m.item.as_deref(),
            seasonality: m.seasonality.as_deref(),
            base_period: None,
            begin_year: None,
            begin_period: None,
            end_year: None,
            end_period: None,
            latest: item.latest.unwrap_or(false),
            last_updated: Some(now),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(bls_series::table).values(&row).execute(conn)?;
        Ok(true)
    }
}

/// Creates or refreshes the freshness row with every timestamp set to `now`.
fn touch_freshness(conn: &mut SqliteConnection, series_id: &str, now: &str) -> QueryResult<usize> {
    use crate::schema::bls_data_freshness::dsl as f;

    let row = NewFreshness {
        series_id,
        last_extracted: Some(now),
        last_updated: Some(now),
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(f::bls_data_freshness)
        .values(&row)
        .on_conflict(f::series_id)
        .do_update()
        .set((
            f::last_extracted.eq(now),
            f::last_updated.eq(now),
            f::updated_at.eq(now),
        ))
        .execute(conn)
}

fn parse_opt_ts(s: Option<&str>) -> RepoResult<Option<chrono::DateTime<Utc>>> {
    s.map(parse_ts_to_utc).transpose()
}

impl SeriesRepo for SqliteRepo {
    fn upsert_series_data(
        &self,
        conn: &mut SqliteConnection,
        items: &[SeriesItem],
        extraction_id: Option<&str>,
    ) -> RepoResult<UpsertCounts> {
        use crate::schema::bls_data_points::dsl as dp;

        let extraction_id = extraction_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = now_rfc3339();
        let mut counts = UpsertCounts::default();

        for item in items {
            if upsert_metadata(conn, item, &now)
                .with_context(|| format!("upsert metadata for {}", item.series_id))?
            {
                counts.inserted += 1;
            }

            for point in &item.points {
                let Some(raw) = point.value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
                    continue;
                };
                let Some(value) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) else {
                    debug!(
                        series = %item.series_id,
                        year = point.year,
                        period = %point.period,
                        "skipping non-numeric value {raw:?}"
                    );
                    counts.skipped += 1;
                    continue;
                };
                let date = period_date_string(point.year, &point.period);

                let existing = dp::bls_data_points
                    .filter(
                        dp::series_id
                            .eq(&item.series_id)
                            .and(dp::year.eq(point.year))
                            .and(dp::period.eq(&point.period)),
                    )
                    .select(dp::id)
                    .first::<i32>(conn)
                    .optional()?;

                match existing {
                    Some(point_id) => {
                        diesel::update(dp::bls_data_points.find(point_id))
                            .set(&DataPointUpdate {
                                period_name: point.period_name.as_deref(),
                                date: &date,
                                value,
                                footnotes: point.footnotes.as_deref(),
                                extraction_id: Some(&extraction_id),
                                updated_at: &now,
                            })
                            .execute(conn)?;
                        counts.updated += 1;
                    }
                    None => {
                        diesel::insert_into(dp::bls_data_points)
                            .values(&NewDataPoint {
                                series_id: &item.series_id,
                                year: point.year,
                                period: &point.period,
                                period_name: point.period_name.as_deref(),
                                date: &date,
                                value,
                                footnotes: point.footnotes.as_deref(),
                                extraction_id: Some(&extraction_id),
                                created_at: &now,
                                updated_at: &now,
                            })
                            .execute(conn)?;
                        counts.inserted += 1;
                    }
                }
            }

            touch_freshness(conn, &item.series_id, &now)?;
        }

        debug!(
            extraction_id = %extraction_id,
            series = items.len(),
            inserted = counts.inserted,
            updated = counts.updated,
            skipped = counts.skipped,
            "upserted series data"
        );
        Ok(counts)
    }

    fn get_series_data(
        &self,
        conn: &mut SqliteConnection,
        codes: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
        include_metadata: bool,
    ) -> RepoResult<Vec<StoredRow>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let (start_year, end_year) = match (start_year, end_year) {
            (Some(s), Some(e)) if s > e => (Some(e), Some(s)),
            bounds => bounds,
        };

        let mut query = bls_data_points::table
            .inner_join(bls_series::table)
            .select((DataPointRecord::as_select(), SeriesRecord::as_select()))
            .filter(bls_data_points::series_id.eq_any(codes))
            .order_by((
                bls_data_points::series_id.asc(),
                bls_data_points::year.asc(),
                bls_data_points::period.asc(),
            ))
            .into_boxed();
        if let Some(s) = start_year {
            query = query.filter(bls_data_points::year.ge(s));
        }
        if let Some(e) = end_year {
            query = query.filter(bls_data_points::year.le(e));
        }

        let rows = query.load::<(DataPointRecord, SeriesRecord)>(conn)?;
        Ok(rows
            .into_iter()
            .map(|(p, s)| StoredRow {
                metadata: include_metadata.then(|| StoredMetadata::from(&s)),
                series_id: p.series_id,
                year: p.year,
                period: p.period,
                period_name: p.period_name,
                date: p.date,
                value: p.value,
                footnotes: p.footnotes,
                extraction_id: p.extraction_id,
            })
            .collect())
    }

    fn get_stale_series(&self, conn: &mut SqliteConnection, max_age_hours: i64) -> RepoResult<Vec<String>> {
        use crate::schema::bls_data_freshness::dsl as f;

        if max_age_hours < 0 {
            return Err(RepoError::InvalidArgument(format!("max_age_hours must be >= 0, got {max_age_hours}")).into());
        }
        let cutoff = hours_before(Utc::now(), max_age_hours);
        let stale = f::bls_data_freshness
            .filter(f::last_extracted.is_null().or(f::last_extracted.lt(&cutoff)))
            .select(f::series_id)
            .order_by(f::series_id.asc())
            .load::<String>(conn)?;
        Ok(stale)
    }

    fn get_data_freshness(
        &self,
        conn: &mut SqliteConnection,
        codes: &[String],
    ) -> RepoResult<IndexMap<String, FreshnessInfo>> {
        if codes.is_empty() {
            return Ok(IndexMap::new());
        }
        let records = bls_data_freshness::table
            .filter(bls_data_freshness::series_id.eq_any(codes))
            .select(FreshnessRecord::as_select())
            .load::<FreshnessRecord>(conn)?;
        let mut by_code: IndexMap<String, FreshnessRecord> =
            records.into_iter().map(|r| (r.series_id.clone(), r)).collect();

        let mut out = IndexMap::new();
        for code in codes {
            let Some(r) = by_code.shift_remove(code) else {
                continue;
            };
            out.insert(
                code.clone(),
                FreshnessInfo {
                    last_extracted: parse_opt_ts(r.last_extracted.as_deref())?,
                    last_updated: parse_opt_ts(r.last_updated.as_deref())?,
                    data_completeness: r.data_completeness,
                    expected_update_frequency: r.expected_update_frequency,
                    next_expected_update: parse_opt_ts(r.next_expected_update.as_deref())?,
                    extraction_priority: r.extraction_priority,
                },
            );
        }
        Ok(out)
    }

    fn mark_series_updated(
        &self,
        conn: &mut SqliteConnection,
        series_id: &str,
        extraction_id: &str,
    ) -> RepoResult<()> {
        let known = bls_series::table
            .find(series_id)
            .select(bls_series::series_id)
            .first::<String>(conn)
            .optional()?
            .is_some();
        if !known {
            return Err(RepoError::UnknownSeries {
                series_id: series_id.to_string(),
            }
            .into());
        }
        touch_freshness(conn, series_id, &now_rfc3339())?;
        debug!(series_id, extraction_id, "marked series updated");
        Ok(())
    }

    fn log_extraction(&self, conn: &mut SqliteConnection, record: &ExtractionRecord) -> RepoResult<i32> {
        let series_ids = serde_json::to_string(&record.series_ids)?;
        let metadata = record.metadata.as_ref().map(serde_json::to_string).transpose()?;
        let to_i32 = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        let now = now_rfc3339();

        let row = NewExtractionLog {
            extraction_id: &record.extraction_id,
            series_ids: &series_ids,
            start_year: record.start_year,
            end_year: record.end_year,
            records_extracted: to_i32(record.counts.written()),
            records_updated: to_i32(record.counts.updated),
            records_inserted: to_i32(record.counts.inserted),
            extraction_status: record.status.as_str(),
            error_message: record.error_message.as_deref(),
            api_calls_made: to_i32(record.api_calls_made),
            extraction_duration_seconds: record
                .duration
                .map(|d| i32::try_from(d.as_secs()).unwrap_or(i32::MAX)),
            extraction_metadata: metadata.as_deref(),
            created_at: &now,
        };
        let id = diesel::insert_into(bls_extraction_logs::table)
            .values(&row)
            .returning(bls_extraction_logs::id)
            .get_result::<i32>(conn)?;
        if record.error_message.is_some() {
            warn!(
                extraction_id = %record.extraction_id,
                status = record.status.as_str(),
                "logged failed extraction"
            );
        }
        Ok(id)
    }

    fn search_series(
        &self,
        conn: &mut SqliteConnection,
        query: &str,
        limit: i64,
    ) -> RepoResult<Vec<SeriesRecord>> {
        use crate::schema::bls_series::dsl as s;

        // LIKE is case-insensitive for ASCII in SQLite.
        let pattern = format!("%{}%", query.trim());
        let found = s::bls_series
            .filter(
                s::series_title
                    .like(&pattern)
                    .or(s::area.like(&pattern))
                    .or(s::item.like(&pattern)),
            )
            .select(SeriesRecord::as_select())
            .order_by(s::series_id.asc())
            .limit(limit.max(0))
            .load::<SeriesRecord>(conn)?;
        Ok(found)
    }

    fn stats(&self, conn: &mut SqliteConnection) -> RepoResult<DbStats> {
        let series_count = bls_series::table.count().get_result::<i64>(conn)?;
        let data_point_count = bls_data_points::table.count().get_result::<i64>(conn)?;
        let extraction_count = bls_extraction_logs::table.count().get_result::<i64>(conn)?;
        let latest_extraction = bls_extraction_logs::table
            .select(diesel::dsl::max(bls_extraction_logs::created_at))
            .first::<Option<String>>(conn)?;
        Ok(DbStats {
            series_count,
            data_point_count,
            extraction_count,
            latest_extraction,
        })
    }

    fn cleanup_extraction_logs(&self, conn: &mut SqliteConnection, retention_days: i64) -> RepoResult<usize> {
        use crate::schema::bls_extraction_logs::dsl as l;

        if retention_days < 0 {
            return Err(RepoError::InvalidArgument(format!("retention_days must be >= 0, got {retention_days}")).into());
        }
        let cutoff = days_before(Utc::now(), retention_days);
        let deleted = diesel::delete(l::bls_extraction_logs.filter(l::created_at.lt(&cutoff))).execute(conn)?;
        debug!(deleted, retention_days, "cleaned up extraction logs");
        Ok(deleted)
    }
}
