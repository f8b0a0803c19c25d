//! Local CPI series catalog used by `CU:` filter tokens.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default location of the CPI series master list.
pub const DEFAULT_MASTER_LIST: &str = "cpi_series_master_list.csv";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Series catalog not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read series catalog {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },

    #[error("series catalog has no '{0}' column")]
    UnknownColumn(String),

    #[error("Invalid CU filter format '{0}'. Use key=value.")]
    InvalidFilter(String),
}

/// A source of known series codes that can be narrowed by column filters.
pub trait CodeCatalog {
    /// Codes whose rows match every `(column, value)` filter exactly (after
    /// trimming). An empty filter list returns every code.
    fn query(&self, filters: &[(String, String)]) -> Result<Vec<String>, CatalogError>;
}

/// Parses `key=value,key2=value2` into trimmed pairs. An empty string yields no filters.
///
/// Each clause needs exactly one `=` and a non-empty key.
pub fn parse_filters(expr: &str) -> Result<Vec<(String, String)>, CatalogError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(Vec::new());
    }
    expr.split(',')
        .map(|part| match part.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() && !v.contains('=') => {
                Ok((k.trim().to_string(), v.trim().to_string()))
            }
            _ => Err(CatalogError::InvalidFilter(part.trim().to_string())),
        })
        .collect()
}

/// In-memory copy of `cpi_series_master_list.csv` (must contain `series_id`).
#[derive(Debug, Clone)]
pub struct CuSeriesCatalog {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    series_idx: usize,
}

impl CuSeriesCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }
        let read_err = |source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(str::to_string)
            .collect();
        let series_idx = columns
            .iter()
            .position(|c| c == "series_id")
            .ok_or_else(|| CatalogError::UnknownColumn("series_id".into()))?;

        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(read_err)?;

        Ok(Self {
            columns,
            rows,
            series_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CodeCatalog for CuSeriesCatalog {
    fn query(&self, filters: &[(String, String)]) -> Result<Vec<String>, CatalogError> {
        let indexed = filters
            .iter()
            .map(|(col, val)| {
                self.columns
                    .iter()
                    .position(|c| c == col)
                    .map(|i| (i, val.as_str()))
                    .ok_or_else(|| CatalogError::UnknownColumn(col.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        fn cell(row: &[String], i: usize) -> &str {
            row.get(i).map(|s| s.trim()).unwrap_or("")
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| indexed.iter().all(|&(i, v)| cell(row, i) == v))
            .map(|row| cell(row, self.series_idx).to_string())
            .filter(|code| !code.is_empty())
            .collect())
    }
}
