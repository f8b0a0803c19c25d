//! Conversions between stored rows and wire series, and the cache/remote merge.

use bls_ingestor::models::series::{ApiDataPoint, ApiSeries, Footnote, SeriesCatalog};
use indexmap::IndexMap;

use crate::repository::{StoredMetadata, StoredRow};

fn catalog_of(m: &StoredMetadata) -> SeriesCatalog {
    SeriesCatalog {
        series_title: m.series_title.clone(),
        survey_name: m.survey_name.clone(),
        measure_data_type: m.measure_data_type.clone(),
        area: m.area.clone(),
        item: m.item.clone(),
        seasonality: m.seasonality.clone(),
    }
}

fn footnotes_of(joined: Option<&str>) -> Vec<Footnote> {
    joined
        .map(|s| {
            s.split("; ")
                .filter(|t| !t.trim().is_empty())
                .map(|t| Footnote {
                    code: None,
                    text: Some(t.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Regroups stored rows into one [`ApiSeries`] per code, in first-seen order.
///
/// Values are rendered back to text so the parser treats cached and fetched
/// series identically.
pub fn stored_to_series(rows: Vec<StoredRow>) -> Vec<ApiSeries> {
    let mut grouped: IndexMap<String, ApiSeries> = IndexMap::new();
    for row in rows {
        let entry = grouped.entry(row.series_id.clone()).or_insert_with(|| ApiSeries {
            series_id: row.series_id.clone(),
            catalog: row.metadata.as_ref().map(catalog_of),
            latest: row.metadata.as_ref().map(|m| m.latest),
            data: Vec::new(),
        });
        entry.data.push(ApiDataPoint {
            year: row.year,
            footnotes: footnotes_of(row.footnotes.as_deref()),
            period: row.period,
            period_name: row.period_name,
            latest: None,
            value: Some(row.value.to_string()),
        });
    }
    grouped.into_values().collect()
}

/// Combines cached and freshly fetched series.
///
/// A code present in `fetched` takes every fetched entry and drops its cached
/// one; other cached series are kept as they are. Output follows `codes`;
/// entries for codes outside `codes` trail in arrival order.
pub fn merge_series(codes: &[String], cached: Vec<ApiSeries>, fetched: Vec<ApiSeries>) -> Vec<ApiSeries> {
    let mut fetched_by_code: IndexMap<String, Vec<ApiSeries>> = IndexMap::new();
    for s in fetched {
        fetched_by_code.entry(s.series_id.clone()).or_default().push(s);
    }
    let mut cached_by_code: IndexMap<String, Vec<ApiSeries>> = IndexMap::new();
    for s in cached {
        cached_by_code.entry(s.series_id.clone()).or_default().push(s);
    }

    let mut out = Vec::new();
    for code in codes {
        if let Some(fresh) = fetched_by_code.shift_remove(code) {
            cached_by_code.shift_remove(code);
            out.extend(fresh);
        } else if let Some(old) = cached_by_code.shift_remove(code) {
            out.extend(old);
        }
    }
    out.extend(fetched_by_code.into_values().flatten());
    out.extend(cached_by_code.into_values().flatten());
    out
}
