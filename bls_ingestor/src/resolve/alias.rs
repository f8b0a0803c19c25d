//! Alias mapping files: parsing, normalization, and fallback loading.
//!
//! An alias file maps human-friendly names (`cpi_all_items`, `CPI All Items`)
//! to one or more BLS series IDs. Keys are normalized with [`normalize_alias`]
//! so lookups are forgiving about case, spacing and punctuation.
//!
//! Accepted formats:
//! - CSV with a header containing one of `alias|name|label|code` and one of
//!   `series|series_id|seriesid`, or any CSV with exactly two columns
//!   (alias, series).
//! - JSON as a flat object (`{"alias": "ID"}` or `{"alias": ["ID1", "ID2"]}`),
//!   an object with a `groups` array, or a top-level array of group objects.
//!
//! Repeated aliases accumulate into [`MappingValue::ManyCodes`] instead of
//! overwriting each other.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// File names tried, in order, in each search directory when no explicit path is given.
pub const FALLBACK_FILE_NAMES: [&str; 6] = [
    "code_mapping.csv",
    "series_map.csv",
    "series_mapping.csv",
    "code_mapping.json",
    "series_map.json",
    "series_mapping.json",
];

const ALIAS_COLUMNS: [&str; 4] = ["alias", "name", "label", "code"];
const SERIES_COLUMNS: [&str; 3] = ["series", "series_id", "seriesid"];

/// Errors raised while reading a single mapping file.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "{file} header must include alias/name/label/code and series/series_id, or be exactly two columns. Found: {found:?}"
    )]
    Header { file: String, found: Vec<String> },

    #[error("Unsupported JSON mapping schema in {path}")]
    Schema { path: PathBuf },

    #[error("{path} is neither .csv nor .json")]
    Extension { path: PathBuf },
}

/// The series ID(s) an alias stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingValue {
    OneCode(String),
    ManyCodes(Vec<String>),
}

impl MappingValue {
    /// The mapped codes as a list, trimmed, blanks removed.
    pub fn codes(&self) -> Vec<String> {
        let raw: &[String] = match self {
            MappingValue::OneCode(c) => std::slice::from_ref(c),
            MappingValue::ManyCodes(cs) => cs,
        };
        raw.iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Adds `code`, promoting to `ManyCodes` when a second distinct code arrives.
    fn accumulate(&mut self, code: String) {
        match self {
            MappingValue::OneCode(prev) if *prev == code => {}
            MappingValue::OneCode(prev) => {
                let prev = std::mem::take(prev);
                *self = MappingValue::ManyCodes(vec![prev, code]);
            }
            MappingValue::ManyCodes(list) => {
                if !list.contains(&code) {
                    list.push(code);
                }
            }
        }
    }
}

/// Normalized alias -> series ID(s).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: IndexMap<String, MappingValue>,
}

/// Normalizes a mapping key: trim, case-fold, drop `-`, `_`, space, `.` and `/`.
pub fn normalize_alias(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '.' | '/'))
        .collect()
}

impl AliasMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(alias, code)` pairs, accumulating repeats.
    pub fn from_pairs<I, A, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: Into<String>,
    {
        let mut map = Self::new();
        for (alias, code) in pairs {
            map.insert(alias.as_ref(), code);
        }
        map
    }

    /// Adds one `alias -> code` definition. Blank aliases or codes are ignored.
    pub fn insert(&mut self, alias: &str, code: impl Into<String>) {
        let key = normalize_alias(alias);
        let code = code.into().trim().to_string();
        if key.is_empty() || code.is_empty() {
            return;
        }
        match self.entries.get_mut(&key) {
            Some(existing) => existing.accumulate(code),
            None => {
                self.entries.insert(key, MappingValue::OneCode(code));
            }
        }
    }

    /// Adds every code of `value` under `alias`.
    pub fn insert_value(&mut self, alias: &str, value: MappingValue) {
        for code in value.codes() {
            self.insert(alias, code);
        }
    }

    /// Looks up a raw (not yet normalized) token.
    pub fn get(&self, token: &str) -> Option<&MappingValue> {
        self.entries.get(&normalize_alias(token))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized aliases and their values, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads a CSV alias file.
pub fn read_csv_mapping(path: &Path) -> Result<AliasMap, MappingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| MappingError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let cols: Vec<String> = reader
        .headers()
        .map_err(|source| MappingError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let find = |names: &[&str]| names.iter().find_map(|n| cols.iter().position(|c| c == n));
    let (alias_idx, series_idx) = match (find(&ALIAS_COLUMNS), find(&SERIES_COLUMNS)) {
        (Some(a), Some(s)) => (a, s),
        _ if cols.len() == 2 => (0, 1),
        _ => {
            return Err(MappingError::Header {
                file: file_label(path),
                found: cols,
            });
        }
    };

    let mut map = AliasMap::new();
    for record in reader.records() {
        let record = record.map_err(|source| MappingError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if let (Some(alias), Some(code)) = (record.get(alias_idx), record.get(series_idx)) {
            map.insert(alias, code);
        }
    }
    Ok(map)
}

/// Reads a JSON alias file.
pub fn read_json_mapping(path: &Path) -> Result<AliasMap, MappingError> {
    let text = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_str(&text).map_err(|source| MappingError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut map = AliasMap::new();
    match data {
        Value::Object(obj) => match obj.get("groups") {
            Some(Value::Array(groups)) => {
                for g in groups {
                    insert_group(&mut map, g);
                }
            }
            _ => {
                for (alias, v) in obj {
                    if let Some(value) = json_codes(&v) {
                        map.insert_value(&alias, value);
                    }
                }
            }
        },
        Value::Array(groups) => {
            for g in &groups {
                insert_group(&mut map, g);
            }
        }
        _ => {
            return Err(MappingError::Schema {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(map)
}

fn json_codes(v: &Value) -> Option<MappingValue> {
    serde_json::from_value::<MappingValue>(v.clone()).ok()
}

fn insert_group(map: &mut AliasMap, g: &Value) {
    let Some(obj) = g.as_object() else {
        return;
    };
    let first_present = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| obj.get(*k))
            .find(|v| !v.is_null() && v.as_str().is_none_or(|s| !s.is_empty()))
    };
    let alias = first_present(&ALIAS_COLUMNS).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let codes = first_present(&SERIES_COLUMNS).and_then(json_codes);
    if let (Some(alias), Some(codes)) = (alias, codes) {
        map.insert_value(&alias, codes);
    }
}

/// Reads one mapping file, choosing the parser by extension.
pub fn read_mapping_file(path: &Path) -> Result<AliasMap, MappingError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv_mapping(path),
        "json" => read_json_mapping(path),
        _ => Err(MappingError::Extension {
            path: path.to_path_buf(),
        }),
    }
}

/// Candidate files for [`load_mapping`], in the order they are tried.
pub fn mapping_candidates(explicit: Option<&Path>, search_dirs: &[PathBuf]) -> Vec<PathBuf> {
    match explicit {
        Some(p) => vec![p.to_path_buf()],
        None => search_dirs
            .iter()
            .flat_map(|dir| FALLBACK_FILE_NAMES.iter().map(move |n| dir.join(n)))
            .collect(),
    }
}

/// Loads the first usable, non-empty mapping among the candidates.
///
/// Unreadable or malformed files are logged and skipped. When nothing usable
/// is found the map is empty and only raw series IDs will resolve.
pub fn load_mapping(explicit: Option<&Path>, search_dirs: &[PathBuf]) -> AliasMap {
    for path in mapping_candidates(explicit, search_dirs) {
        if !path.exists() {
            continue;
        }
        match read_mapping_file(&path) {
            Ok(map) if !map.is_empty() => {
                info!(
                    "Loaded code mapping from {} ({} entries)",
                    file_label(&path),
                    map.len()
                );
                return map;
            }
            Ok(_) | Err(MappingError::Extension { .. }) => {}
            Err(e) => warn!("Failed to read {}: {e}", file_label(&path)),
        }
    }
    info!("No mapping file found; only raw series IDs will be accepted.");
    AliasMap::new()
}
