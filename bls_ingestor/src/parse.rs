//! Flattens a [`BlsResponse`] into sorted [`SeriesRow`]s.

use indexmap::IndexMap;

use crate::models::{
    row::SeriesRow,
    series::{ApiSeries, BlsResponse, SeriesCatalog},
};

/// One row per data point, sorted by `(series_id, year, period)`.
///
/// `trace` maps a series ID to the user tokens that produced it; those become
/// the row's `alias` joined with `|`.
pub fn parse_results(response: &BlsResponse, trace: &IndexMap<String, Vec<String>>) -> Vec<SeriesRow> {
    let mut rows: Vec<SeriesRow> = response
        .series()
        .iter()
        .flat_map(|s| series_rows(s, trace))
        .collect();
    rows.sort_by(|a, b| {
        (&a.series_id, a.year, &a.period).cmp(&(&b.series_id, b.year, &b.period))
    });
    rows
}

fn series_rows<'a>(
    series: &'a ApiSeries,
    trace: &'a IndexMap<String, Vec<String>>,
) -> impl Iterator<Item = SeriesRow> + 'a {
    let empty = SeriesCatalog::default();
    let catalog = series.catalog.as_ref();
    let alias = trace
        .get(&series.series_id)
        .filter(|tokens| !tokens.is_empty())
        .map(|tokens| tokens.join("|"));

    series.data.iter().map(move |point| {
        let cat = catalog.unwrap_or(&empty);
        SeriesRow {
            series_id: series.series_id.clone(),
            alias: alias.clone(),
            year: point.year,
            period: point.period.clone(),
            period_name: point.period_name.clone(),
            value: point.numeric_value(),
            latest: point.latest.or(series.latest),
            seasonality: cat.seasonality.clone(),
            series_title: cat.series_title.clone(),
            survey_name: cat.survey_name.clone(),
            measure_data_type: cat.measure_data_type.clone(),
            area: cat.area.clone(),
            item: cat.item.clone(),
            footnotes: point.footnote_text(),
        }
    })
}
