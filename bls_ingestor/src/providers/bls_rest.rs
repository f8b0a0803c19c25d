//! BLS public API v2 over HTTPS.

pub mod keys;
pub mod params;
pub mod provider;
pub mod retry;

pub use keys::ApiKeyPool;
pub use params::BlsPayload;
pub use provider::{BLS_V2_URL, BlsRestProvider};
pub use retry::RetryPolicy;
