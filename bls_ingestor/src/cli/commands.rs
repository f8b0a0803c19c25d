use std::path::PathBuf;

use clap::{Args, Parser};

/// Fetch BLS time series data (v2 API) with alias mapping.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a TOML config file (bls.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    pub log: Option<String>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// What to fetch and how. Shared by every binary that fetches series.
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Series IDs, aliases from the mapping file, or CU:key=value filters
    #[arg(required = true, num_args = 1..)]
    pub codes: Vec<String>,

    /// Start year (YYYY)
    #[arg(long)]
    pub start: Option<i32>,

    /// End year (YYYY)
    #[arg(long)]
    pub end: Option<i32>,

    /// Path to mapping file (CSV/JSON); disables the fallback search
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Path to the CPI series master list used by CU: filters
    #[arg(long)]
    pub catalog_file: Option<PathBuf>,

    /// Include series catalog metadata
    #[arg(long)]
    pub catalog: bool,

    /// Include net/percent changes (API computed)
    #[arg(long)]
    pub calculations: bool,

    /// Include annual averages (M13) when available
    #[arg(long)]
    pub annualaverage: bool,

    /// Include aspects
    #[arg(long)]
    pub aspects: bool,

    /// Dispatch chunks concurrently and keep whichever succeed
    #[arg(long)]
    pub parallel: bool,

    /// Write CSV to this path instead of printing a preview
    #[arg(long)]
    pub out: Option<PathBuf>,
}
