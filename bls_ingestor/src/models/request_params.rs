use serde::{Deserialize, Serialize};

/// Parameters for one logical fetch against the BLS timeseries endpoint.
///
/// A single `SeriesRequestParams` may expand into many HTTP requests once the
/// series list and year span are split to respect the API limits; see
/// [`crate::requests::historical::plan_chunks`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRequestParams {
    /// Canonical BLS series IDs (e.g. `["CUUR0000SA0"]`).
    pub series_ids: Vec<String>,

    /// First year of the requested window (inclusive).
    ///
    /// When either bound is missing the API falls back to its default window,
    /// which is typically the most recent few years only.
    pub start_year: Option<i32>,

    /// Last year of the requested window (inclusive).
    pub end_year: Option<i32>,

    /// Optional response enrichments.
    #[serde(default)]
    pub options: RequestOptions,
}

impl SeriesRequestParams {
    /// Builds params for the given codes and year bounds with default options.
    pub fn new(series_ids: Vec<String>, start_year: Option<i32>, end_year: Option<i32>) -> Self {
        Self {
            series_ids,
            start_year,
            end_year,
            options: RequestOptions::default(),
        }
    }

    /// Replaces the enrichment flags.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Optional enrichments understood by the v2 API. Each flag is only sent when set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Include series catalog metadata (title, survey, area, item...).
    pub catalog: bool,
    /// Include net and percent changes computed by the API.
    pub calculations: bool,
    /// Include annual averages (period `M13`) where available.
    pub annualaverage: bool,
    /// Include aspect data.
    pub aspects: bool,
}
