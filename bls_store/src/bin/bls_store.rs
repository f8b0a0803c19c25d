use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use bls_ingestor::{
    cli::{FetchArgs, emit_rows},
    providers::bls_rest::BlsRestProvider,
    resolve::{catalog::DEFAULT_MASTER_LIST, read_mapping_file},
};
use bls_store::{
    aliases::{SyncOptions, load_alias_map, sync_aliases},
    cache::CachedFetcher,
    config::{StoreConfig, load_config},
    db::{connection::connect_sqlite, migrate},
    repository::{SeriesRepo, SqliteRepo},
    seed::seed_series_metadata,
};
use clap::{Args, Parser, Subcommand};
use shared_utils::logging::init_tracing;
use tracing::{error, info, warn};

/// BLS series store: cached fetches, freshness and maintenance.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations
    Migrate,
    /// Fetch series through the local cache
    Fetch(FetchCmd),
    /// List series extracted longer ago than the freshness threshold
    Stale {
        #[arg(long)]
        max_age_hours: Option<i64>,
    },
    /// Show freshness of the given series
    Freshness {
        #[arg(required = true, num_args = 1..)]
        codes: Vec<String>,
    },
    /// Table counts
    Stats,
    /// Search stored series by title, area or item
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Delete old extraction logs
    Cleanup {
        #[arg(long, default_value_t = 90)]
        retention_days: i64,
    },
    /// Alias table maintenance
    Aliases(AliasesCmd),
    /// Load series metadata from the CPI master list
    SeedSeries {
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FetchCmd {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Skip the cache lookup (results are still stored)
    #[arg(long)]
    no_cache: bool,

    /// Re-fetch every requested series
    #[arg(long)]
    force_refresh: bool,

    /// Override `[cache] max_age_hours`
    #[arg(long)]
    max_age_hours: Option<i64>,
}

#[derive(Args)]
struct AliasesCmd {
    #[command(subcommand)]
    sub: AliasesSub,
}

#[derive(Subcommand)]
enum AliasesSub {
    /// Make the alias table match a mapping file
    Sync {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        prune: bool,
    },
}

async fn fetch(cmd: &FetchCmd, cfg: &StoreConfig) -> Result<()> {
    if let Err(e) = migrate::run_all(&cfg.database.url) {
        warn!("Could not migrate {}: {e:#}", cfg.database.url);
    }
    if cmd.fetch.parallel {
        warn!("--parallel is ignored for cached fetches");
    }

    let mut aliases = cmd.fetch.load_aliases(&cfg.ingestor);
    if aliases.is_empty() {
        match connect_sqlite(&cfg.database.url).and_then(|mut c| load_alias_map(&mut c)) {
            Ok(stored) if !stored.is_empty() => {
                info!(entries = stored.len(), "using aliases stored in the database");
                aliases = stored;
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read stored aliases: {e:#}"),
        }
    }
    let resolution = cmd.fetch.resolve_with(&cfg.ingestor, &aliases)?;
    let provider = BlsRestProvider::new(&cfg.ingestor.api, cfg.ingestor.retry.clone())?;
    let max_age = cmd.max_age_hours.unwrap_or(cfg.cache.max_age_hours);
    let mut fetcher =
        CachedFetcher::new(provider, &cfg.database.url, max_age).with_options(cmd.fetch.request_options());

    let fetched = fetcher
        .fetch_with_cache(
            &resolution.codes,
            cmd.fetch.start,
            cmd.fetch.end,
            cfg.cache.enabled && !cmd.no_cache,
            cmd.force_refresh,
        )
        .await?;
    info!(
        source = ?fetched.source,
        requests = fetched.api_requests,
        "fetch complete"
    );
    let rows = fetched.into_rows(&resolution.trace);
    emit_rows(&cmd.fetch, &rows).await?;
    Ok(())
}

async fn run(cli: Cli, cfg: StoreConfig) -> Result<()> {
    let repo = SqliteRepo::new();
    let url = cfg.database.url.as_str();

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_all(url)?;
            info!("migrations applied to {url}");
        }
        Cmd::Fetch(cmd) => fetch(&cmd, &cfg).await?,
        Cmd::Stale { max_age_hours } => {
            let mut conn = connect_sqlite(url)?;
            let hours = max_age_hours.unwrap_or(cfg.cache.max_age_hours);
            for id in repo.get_stale_series(&mut conn, hours)? {
                println!("{id}");
            }
        }
        Cmd::Freshness { codes } => {
            let mut conn = connect_sqlite(url)?;
            let info = repo.get_data_freshness(&mut conn, &codes)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Cmd::Stats => {
            let mut conn = connect_sqlite(url)?;
            println!("{}", serde_json::to_string_pretty(&repo.stats(&mut conn)?)?);
        }
        Cmd::Search { query, limit } => {
            let mut conn = connect_sqlite(url)?;
            for s in repo.search_series(&mut conn, &query, limit)? {
                println!("{}\t{}", s.series_id, s.series_title.as_deref().unwrap_or(""));
            }
        }
        Cmd::Cleanup { retention_days } => {
            let mut conn = connect_sqlite(url)?;
            let deleted = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
                repo.cleanup_extraction_logs(conn, retention_days)
            })?;
            info!(deleted, retention_days, "extraction logs cleaned up");
        }
        Cmd::Aliases(AliasesCmd {
            sub: AliasesSub::Sync { file, dry_run, prune },
        }) => {
            let map = read_mapping_file(&file).with_context(|| format!("load {}", file.display()))?;
            let mut conn = connect_sqlite(url)?;
            let diff = sync_aliases(&mut conn, &map, SyncOptions { dry_run, prune })?;
            print!("{diff}");
        }
        Cmd::SeedSeries { file } => {
            let path = file
                .or_else(|| cfg.ingestor.catalog.master_list.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MASTER_LIST));
            let mut conn = connect_sqlite(url)?;
            let n = seed_series_metadata(&mut conn, &path)?;
            println!("{n}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.log.as_deref().unwrap_or(&cfg.ingestor.logging.level));

    match run(cli, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
