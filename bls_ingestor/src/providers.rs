//! Provider abstraction for BLS time-series sources.
//!
//! This module defines the [`SeriesProvider`] trait, the seam between the
//! chunk planner in [`crate::requests::historical`] and a concrete transport.
//! [`bls_rest::BlsRestProvider`] talks to the public v2 HTTP API; tests plug in
//! in-memory providers to count or fail requests.
//!
//! A provider only ever sees requests that already fit the API limits it
//! advertises through [`SeriesProvider::limits`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use bls_ingestor::models::{request_params::SeriesRequestParams, series::ApiSeries};
//! use bls_ingestor::providers::{ProviderError, SeriesProvider};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl SeriesProvider for Empty {
//!     async fn fetch_chunk(
//!         &self,
//!         _params: &SeriesRequestParams,
//!     ) -> Result<Vec<ApiSeries>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod bls_rest;

use async_trait::async_trait;
use snafu::{Backtrace, IntoError, Snafu};

use crate::{
    models::{request_params::SeriesRequestParams, series::ApiSeries},
    requests::historical::ChunkLimits,
};

/// Fetches series observations for a request that already respects the API limits.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Fetches one chunk: at most `limits().series_limit` codes and at most
    /// `limits().years_limit` years.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ApiSeries>)` - The series entries returned for this chunk.
    /// * `Err(ProviderError)` - Transport failure after retries, or an
    ///   application-level failure status.
    async fn fetch_chunk(&self, params: &SeriesRequestParams)
    -> Result<Vec<ApiSeries>, ProviderError>;

    /// Per-request limits this provider enforces.
    fn limits(&self) -> ChunkLimits {
        ChunkLimits::default()
    }
}

#[async_trait]
impl<P: SeriesProvider + ?Sized> SeriesProvider for std::sync::Arc<P> {
    async fn fetch_chunk(
        &self,
        params: &SeriesRequestParams,
    ) -> Result<Vec<ApiSeries>, ProviderError> {
        (**self).fetch_chunk(params).await
    }

    fn limits(&self) -> ChunkLimits {
        (**self).limits()
    }
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// No registration key found under the configured prefix.
    #[snafu(display("No BLS API keys found in environment with prefix '{prefix}'"))]
    NoApiKeys { prefix: String, backtrace: Backtrace },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `SeriesProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Transport failure (connect, timeout, body decode).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The server answered with a non-success HTTP status.
    #[snafu(display("BLS API HTTP error {status}: {body}"))]
    Http {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The API processed the request but reported a failure status.
    #[snafu(display("BLS API returned status={status}: {message}"))]
    Api {
        status: String,
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl From<ProviderInitError> for ProviderError {
    fn from(source: ProviderInitError) -> Self {
        InitSnafu.into_error(source)
    }
}
