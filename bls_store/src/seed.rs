//! Seeds `bls_series` from the CPI series master list.

use std::path::Path;

use anyhow::Context;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    models::{NewSeries, SeriesChanges},
    schema::bls_series,
    timestamps::now_rfc3339,
};

/// Survey name recorded for every seeded series.
pub const CPI_SURVEY_NAME: &str = "Consumer Price Index";

#[derive(Debug, Deserialize)]
struct MasterListRow {
    series_id: String,
    #[serde(default)]
    series_title: Option<String>,
    #[serde(default, alias = "area")]
    area_name: Option<String>,
    #[serde(default, alias = "item")]
    item_name: Option<String>,
    #[serde(default, alias = "seasonality")]
    seasonal: Option<String>,
    #[serde(default)]
    base_period: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    begin_year: Option<i32>,
    #[serde(default)]
    begin_period: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    end_year: Option<i32>,
    #[serde(default)]
    end_period: Option<String>,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Inserts or refreshes one `bls_series` row per master-list line.
///
/// Returns the number of rows written. A missing file is not an error: it
/// logs a warning and returns 0.
pub fn seed_series_metadata(conn: &mut SqliteConnection, master_list: &Path) -> anyhow::Result<usize> {
    if !master_list.exists() {
        warn!("CPI master list not found at {}", master_list.display());
        return Ok(0);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(master_list)
        .with_context(|| format!("open {}", master_list.display()))?;
    let rows = reader
        .deserialize::<MasterListRow>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("read {}", master_list.display()))?;

    let now = now_rfc3339();
    let written = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let mut written = 0usize;
        for row in rows.iter().filter(|r| !r.series_id.trim().is_empty()) {
            let new = NewSeries {
                series_id: row.series_id.trim(),
                series_title: non_blank(&row.series_title),
                survey_name: Some(CPI_SURVEY_NAME),
                measure_data_type: None,
                area: non_blank(&row.area_name),
                item: non_blank(&row.item_name),
                seasonality: non_blank(&row.seasonal),
                base_period: non_blank(&row.base_period),
                begin_year: row.begin_year,
                begin_period: non_blank(&row.begin_period),
                end_year: row.end_year,
                end_period: non_blank(&row.end_period),
                latest: false,
                last_updated: None,
                created_at: &now,
                updated_at: &now,
            };
            let changes = SeriesChanges {
                series_title: new.series_title,
                survey_name: new.survey_name,
                area: new.area,
                item: new.item,
                seasonality: new.seasonality,
                base_period: new.base_period,
                begin_year: new.begin_year,
                begin_period: new.begin_period,
                end_year: new.end_year,
                end_period: new.end_period,
                updated_at: Some(&now),
                ..Default::default()
            };
            diesel::insert_into(bls_series::table)
                .values(&new)
                .on_conflict(bls_series::series_id)
                .do_update()
                .set(&changes)
                .execute(conn)?;
            written += 1;
        }
        Ok(written)
    })?;

    info!(written, path = %master_list.display(), "seeded series metadata");
    Ok(written)
}
