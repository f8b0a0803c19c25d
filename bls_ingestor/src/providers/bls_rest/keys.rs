use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::env_values_with_prefix;
use snafu::ensure;

use crate::providers::{NoApiKeysSnafu, ProviderInitError};

/// Default environment prefix for registration keys (`BLS_API_KEY_0`, `BLS_API_KEY_1`, ...).
pub const DEFAULT_KEY_PREFIX: &str = "BLS_API_KEY_";

/// Pool of BLS registration keys; one is picked at random per request.
///
/// Spreading requests over several keys keeps each under its daily quota.
#[derive(Clone)]
pub struct ApiKeyPool {
    keys: Vec<SecretString>,
}

impl std::fmt::Debug for ApiKeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyPool")
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl ApiKeyPool {
    /// Reads every non-empty variable whose name starts with `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, ProviderInitError> {
        let keys = env_values_with_prefix(prefix);
        ensure!(!keys.is_empty(), NoApiKeysSnafu { prefix });
        Ok(Self::from_keys(keys))
    }

    /// Builds a pool from explicit key values.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|k| {
                    let key: String = k.into();
                    SecretString::new(key.into())
                })
                .collect(),
        }
    }

    /// Number of keys in the pool.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the pool holds no key; requests then go out unauthenticated.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Picks one key uniformly at random.
    pub fn choose(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..self.keys.len());
        Some(self.keys[idx].expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn choose_returns_a_member() {
        let pool = ApiKeyPool::from_keys(["a", "b", "c"]);
        for _ in 0..20 {
            let k = pool.choose().unwrap();
            assert!(["a", "b", "c"].contains(&k));
        }
        assert!(ApiKeyPool::from_keys(Vec::<String>::new()).choose().is_none());
    }

    #[test]
    #[serial]
    fn from_env_requires_at_least_one_key() {
        let err = ApiKeyPool::from_env("BLS_KEYS_TEST_NONE_").unwrap_err();
        assert!(err.to_string().contains("BLS_KEYS_TEST_NONE_"));

        // SAFETY: serialized test; no other thread reads these variables.
        unsafe { std::env::set_var("BLS_KEYS_TEST_SOME_0", "secret") };
        let pool = ApiKeyPool::from_env("BLS_KEYS_TEST_SOME_").unwrap();
        assert_eq!(pool.len(), 1);
        assert!(!format!("{pool:?}").contains("secret"));
        unsafe { std::env::remove_var("BLS_KEYS_TEST_SOME_0") };
    }
}
