//! Resolve, fetch and flatten BLS time series.
//!
//! ```text
//! tokens --resolve--> series IDs --fetch--> BlsResponse --parse--> Vec<SeriesRow>
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod io;
pub mod models;
pub mod parse;
pub mod providers;
pub mod requests;
pub mod resolve;

pub use errors::Error;
pub use models::{row::SeriesRow, series::BlsResponse};
pub use parse::parse_results;
pub use resolve::{Resolution, resolve};
