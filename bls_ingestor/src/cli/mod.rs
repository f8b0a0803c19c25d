//! Command-line front end for `bls-fetch`.

pub mod commands;
pub mod params;

pub use commands::{Cli, FetchArgs};

use tracing::info;

use crate::{
    config::IngestorConfig,
    errors::Error,
    io::sink::{CsvFileSink, RowSink, StdoutPreview},
    models::row::SeriesRow,
    parse::parse_results,
    providers::bls_rest::BlsRestProvider,
    requests::historical::{fetch_series, fetch_series_parallel},
};

/// Resolves, fetches and parses the rows requested by `args`.
pub async fn fetch_rows(args: &FetchArgs, cfg: &IngestorConfig) -> Result<Vec<SeriesRow>, Error> {
    let resolution = args.resolve(cfg)?;
    let provider = BlsRestProvider::new(&cfg.api, cfg.retry.clone())?;
    let params = args.request_params(resolution.codes.clone());

    let response = if args.parallel {
        fetch_series_parallel(&provider, &params, cfg.api.workers).await?
    } else {
        fetch_series(&provider, &params).await?
    };
    let rows = parse_results(&response, &resolution.trace);
    info!(series = response.series().len(), rows = rows.len(), "fetch complete");
    Ok(rows)
}

/// Writes `rows` to `--out`, or previews them on stdout.
pub async fn emit_rows(args: &FetchArgs, rows: &[SeriesRow]) -> Result<(), Error> {
    match &args.out {
        Some(path) => {
            CsvFileSink::new(path).write(rows).await?;
        }
        None => {
            StdoutPreview::default().write(rows).await?;
        }
    }
    Ok(())
}

/// Full `bls-fetch` run after logging is set up.
pub async fn run(cli: &Cli, cfg: &IngestorConfig) -> Result<(), Error> {
    let rows = fetch_rows(&cli.fetch, cfg).await?;
    emit_rows(&cli.fetch, &rows).await
}
