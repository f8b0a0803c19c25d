use thiserror::Error;

use crate::{
    io::sink::SinkError,
    providers::{ProviderError, ProviderInitError},
    resolve::{CatalogError, MappingError, ResolveError},
};

/// The unified error type for the `bls_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more input tokens could not be resolved to series IDs.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An error originating from a data provider (e.g., API error, validation).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider could not be constructed (no API keys, HTTP client setup).
    #[error("Provider setup error: {0}")]
    ProviderInit(#[from] ProviderInitError),

    /// A mapping file could not be read or understood.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The code catalog could not be read or queried.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An error originating from a data sink (e.g., file I/O).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// An error related to configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
