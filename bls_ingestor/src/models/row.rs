//! Flat, tabular representation of parsed observations.

use serde::{Deserialize, Serialize};

/// One observation of one series, flattened with its catalog metadata.
///
/// Field order matches the CSV column order written by
/// [`crate::io::sink::CsvFileSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub series_id: String,
    /// Original alias tokens that resolved to this series, joined with `|`.
    pub alias: Option<String>,
    pub year: i32,
    pub period: String,
    pub period_name: Option<String>,
    /// `None` when the source value was empty or not numeric.
    pub value: Option<f64>,
    pub latest: Option<bool>,
    pub seasonality: Option<String>,
    pub series_title: Option<String>,
    pub survey_name: Option<String>,
    pub measure_data_type: Option<String>,
    pub area: Option<String>,
    pub item: Option<String>,
    /// Footnote texts joined with `"; "`.
    pub footnotes: Option<String>,
}

impl SeriesRow {
    /// Column names, in serialization order.
    pub const COLUMNS: [&'static str; 14] = [
        "series_id",
        "alias",
        "year",
        "period",
        "period_name",
        "value",
        "latest",
        "seasonality",
        "series_title",
        "survey_name",
        "measure_data_type",
        "area",
        "item",
        "footnotes",
    ];
}
