//! Chunked historical fetches.
//!
//! The v2 API accepts at most 50 series and 20 years per request. A logical
//! [`SeriesRequestParams`] is therefore planned into one request per
//! (series chunk x year window), series chunks outer and year windows inner:
//!
//! ```text
//! 120 codes, 1980..=2024  ->  [50, 50, 20] x [1980-1999, 2000-2019, 2020-2024]  ->  9 requests
//! ```
//!
//! [`fetch_series`] runs the plan sequentially and fails as a whole on the first
//! error. [`fetch_series_parallel`] dispatches over a bounded pool and keeps
//! whatever chunks succeed.

mod batch_request;
mod single_request;

pub use batch_request::fetch_series_parallel;
pub use single_request::fetch_series;

use serde::{Deserialize, Serialize};

use crate::models::request_params::SeriesRequestParams;

/// Per-request API limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLimits {
    /// Maximum series codes per request.
    pub series_limit: usize,
    /// Maximum inclusive year span per request.
    pub years_limit: u32,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            series_limit: 50,
            years_limit: 20,
        }
    }
}

/// Splits `[start, end]` into inclusive windows of at most `years_limit` years.
///
/// Bounds given in reverse order are swapped.
pub fn year_chunks(start: i32, end: i32, years_limit: u32) -> Vec<(i32, i32)> {
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    let step = years_limit.max(1) as i32;

    let mut chunks = Vec::new();
    let mut s = start;
    while s <= end {
        let e = s.saturating_add(step - 1).min(end);
        chunks.push((s, e));
        if e == i32::MAX {
            break;
        }
        s = e + 1;
    }
    chunks
}

/// Expands a logical request into the per-request chunks, in dispatch order.
pub fn plan_chunks(params: &SeriesRequestParams, limits: ChunkLimits) -> Vec<SeriesRequestParams> {
    let windows: Vec<(Option<i32>, Option<i32>)> = match (params.start_year, params.end_year) {
        (Some(s), Some(e)) => year_chunks(s, e, limits.years_limit)
            .into_iter()
            .map(|(s, e)| (Some(s), Some(e)))
            .collect(),
        (s, e) => vec![(s, e)],
    };

    params
        .series_ids
        .chunks(limits.series_limit.max(1))
        .flat_map(|codes| {
            windows.iter().map(move |&(start_year, end_year)| SeriesRequestParams {
                series_ids: codes.to_vec(),
                start_year,
                end_year,
                options: params.options,
            })
        })
        .collect()
}
