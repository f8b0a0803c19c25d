//! Turns user tokens into canonical BLS series IDs.
//!
//! A token is one of:
//! - a `CU:` filter expression evaluated against a [`CodeCatalog`]
//!   (`CU:area_code=0000,seasonal=U`, or bare `CU:` for every code),
//! - an alias found in the [`AliasMap`],
//! - something shaped like a series ID, accepted verbatim.
//!
//! Anything else makes the whole resolution fail.

pub mod alias;
pub mod catalog;

pub use alias::{AliasMap, MappingError, MappingValue, load_mapping, normalize_alias, read_mapping_file};
pub use catalog::{CatalogError, CodeCatalog, CuSeriesCatalog, parse_filters};

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Case-insensitive marker for catalog filter tokens.
pub const CU_PREFIX: &str = "CU:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown codes (not BLS series IDs and not in mapping): {}", tokens.join(", "))]
    Unknown { tokens: Vec<String> },
}

/// Resolved codes plus the tokens each came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Unique, in first-seen order.
    pub codes: Vec<String>,
    /// code -> original tokens. Raw IDs accepted verbatim are not traced.
    pub trace: IndexMap<String, Vec<String>>,
}

/// `true` for strings shaped like a BLS series ID: 8 to 25 characters with
/// at least one letter and one digit.
pub fn looks_like_series_id(token: &str) -> bool {
    let t = token.trim();
    (8..=25).contains(&t.chars().count())
        && t.chars().any(|c| c.is_ascii_digit())
        && t.chars().any(|c| c.is_ascii_alphabetic())
}

fn strip_cu_prefix(token: &str) -> Option<&str> {
    let head = token.get(..CU_PREFIX.len())?;
    head.eq_ignore_ascii_case(CU_PREFIX)
        .then(|| &token[CU_PREFIX.len()..])
}

fn catalog_codes(token: &str, expr: &str, catalog: Option<&dyn CodeCatalog>) -> Vec<String> {
    let Some(catalog) = catalog else {
        warn!("No series catalog configured; ignoring {token}");
        return Vec::new();
    };
    let filters = match parse_filters(expr) {
        Ok(f) => f,
        Err(e) => {
            warn!("{e}");
            return Vec::new();
        }
    };
    match catalog.query(&filters) {
        Ok(codes) if codes.is_empty() => {
            warn!("No series found matching filters: {expr}");
            codes
        }
        Ok(codes) => {
            debug!(token, matched = codes.len(), "CU filter resolved");
            codes
        }
        Err(e) => {
            warn!("Error processing CU filter '{token}': {e}");
            Vec::new()
        }
    }
}

/// Resolves `tokens` in order.
///
/// Fails with [`ResolveError::Unknown`] if any non-empty token is neither a
/// filter, an alias, nor code-shaped.
pub fn resolve<S: AsRef<str>>(
    tokens: &[S],
    aliases: &AliasMap,
    catalog: Option<&dyn CodeCatalog>,
) -> Result<Resolution, ResolveError> {
    let mut codes: IndexSet<String> = IndexSet::new();
    let mut trace: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut unknown: BTreeSet<String> = BTreeSet::new();

    let mut traced = |code: String, token: &str, codes: &mut IndexSet<String>| {
        let entry = trace.entry(code.clone()).or_default();
        if !entry.iter().any(|t| t == token) {
            entry.push(token.to_string());
        }
        codes.insert(code);
    };

    for raw in tokens {
        let token = raw.as_ref().trim();
        if token.is_empty() {
            continue;
        }

        if let Some(expr) = strip_cu_prefix(token) {
            for code in catalog_codes(token, expr, catalog) {
                traced(code, token, &mut codes);
            }
        } else if let Some(value) = aliases.get(token) {
            for code in value.codes() {
                traced(code, token, &mut codes);
            }
        } else if looks_like_series_id(token) {
            codes.insert(token.to_string());
        } else {
            unknown.insert(token.to_string());
        }
    }

    if !unknown.is_empty() {
        return Err(ResolveError::Unknown {
            tokens: unknown.into_iter().collect(),
        });
    }

    Ok(Resolution {
        codes: codes.into_iter().collect(),
        trace,
    })
}
