use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Collects the values of every environment variable whose name starts with `prefix`.
///
/// Empty values are ignored. The result is ordered by variable name so callers
/// see a stable pool regardless of process environment ordering.
pub fn env_values_with_prefix(prefix: &str) -> Vec<String> {
    let mut pairs: Vec<(String, String)> = std::env::vars()
        .filter(|(k, v)| k.starts_with(prefix) && !v.trim().is_empty())
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.into_iter().map(|(_, v)| v).collect()
}
