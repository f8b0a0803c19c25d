use snafu::ensure;
use tracing::{debug, info};

use crate::{
    models::{request_params::SeriesRequestParams, series::BlsResponse},
    providers::{ProviderError, SeriesProvider, ValidationSnafu},
    requests::historical::plan_chunks,
};

/// Fetches every chunk of `params` in order and merges the series entries.
///
/// Any chunk failure (after the provider's own retries) aborts the whole fetch;
/// no partial result is returned.
pub async fn fetch_series<P>(provider: &P, params: &SeriesRequestParams) -> Result<BlsResponse, ProviderError>
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
    info!(
        series = params.series_ids.len(),
        requests = plan.len(),
        "fetching BLS series"
    );

    let mut merged = Vec::new();
    for (idx, chunk) in plan.iter().enumerate() {
        let series = provider.fetch_chunk(chunk).await?;
        debug!(chunk = idx, returned = series.len(), "chunk done");
        merged.extend(series);
    }

    Ok(BlsResponse::succeeded(merged))
}
