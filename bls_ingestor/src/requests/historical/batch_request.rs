use futures::stream::{self, StreamExt};
use snafu::ensure;
use tracing::{info, warn};

use crate::{
    models::{
        request_params::SeriesRequestParams,
        series::{ApiSeries, BlsResponse},
    },
    providers::{ProviderError, SeriesProvider, ValidationSnafu},
    requests::historical::plan_chunks,
};

/// Fetches the chunks of `params` with at most `workers` requests in flight.
///
/// Partial success: a failed chunk is logged and left out while its siblings
/// continue. If every chunk fails the result is an empty (successful) response.
/// Results are grouped by series ID in request order, each series keeping its
/// chunks in plan order, so the output does not depend on which request
/// finished first.
pub async fn fetch_series_parallel<P>(
    provider: &P,
    params: &SeriesRequestParams,
    workers: usize,
) -> Result<BlsResponse, ProviderError>
where
    P: SeriesProvider + ?Sized,
{
    ensure!(
        !params.series_ids.is_empty(),
        ValidationSnafu {
            message: "No series IDs provided."
        }
    );

    let plan = plan_chunks(params, provider.limits());
    let total = plan.len();
    info!(
        series = params.series_ids.len(),
        requests = total,
        workers,
        "fetching BLS series in parallel"
    );

    let mut done: Vec<(usize, Vec<ApiSeries>)> = stream::iter(plan.iter().enumerate())
        .map(|(idx, chunk)| async move { (idx, chunk, provider.fetch_chunk(chunk).await) })
        .buffer_unordered(workers.max(1))
        .filter_map(|(idx, chunk, result)| async move {
            match result {
                Ok(series) => Some((idx, series)),
                Err(e) => {
                    warn!(
                        chunk = idx,
                        series = chunk.series_ids.len(),
                        start = ?chunk.start_year,
                        end = ?chunk.end_year,
                        "chunk failed, continuing without it: {e}"
                    );
                    None
                }
            }
        })
        .collect()
        .await;

    if done.len() < total {
        warn!(succeeded = done.len(), total, "some BLS chunks failed");
    }

    done.sort_by_key(|(idx, _)| *idx);
    let mut merged: Vec<ApiSeries> = done.into_iter().flat_map(|(_, series)| series).collect();
    // stable: chunk order survives within each series
    merged.sort_by_key(|s| {
        params
            .series_ids
            .iter()
            .position(|id| *id == s.series_id)
            .unwrap_or(usize::MAX)
    });
    Ok(BlsResponse::succeeded(merged))
}
