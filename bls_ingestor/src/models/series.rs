//! Wire model of the BLS v2 timeseries response.
//!
//! The API is loose about types: years arrive as strings, `latest` as the
//! string `"true"`, `message` as either a string or a list, and footnote lists
//! commonly contain empty objects. The helpers in [`de`] absorb those
//! variations so the rest of the crate works with plain Rust types.

use serde::{Deserialize, Serialize};

/// Application-level status the API reports for a successful request.
pub const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

/// Top-level response: `{status, Results: {series: [...]}, message}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlsResponse {
    /// `REQUEST_SUCCEEDED` or a failure code such as `REQUEST_NOT_PROCESSED`.
    #[serde(default)]
    pub status: String,

    /// Server messages (warnings on success, the reason on failure).
    #[serde(default, deserialize_with = "de::messages")]
    pub message: Vec<String>,

    /// Result payload.
    #[serde(rename = "Results", default, deserialize_with = "de::results")]
    pub results: BlsResults,
}

/// The `Results` object of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlsResults {
    /// One entry per returned series.
    #[serde(default)]
    pub series: Vec<ApiSeries>,
}

impl BlsResponse {
    /// A successful response carrying `series`.
    pub fn succeeded(series: Vec<ApiSeries>) -> Self {
        Self {
            status: REQUEST_SUCCEEDED.to_string(),
            message: Vec::new(),
            results: BlsResults { series },
        }
    }

    /// True when the application-level status reports success.
    pub fn is_success(&self) -> bool {
        self.status == REQUEST_SUCCEEDED
    }

    /// Server messages joined for display.
    pub fn message_text(&self) -> String {
        self.message.join("; ")
    }

    /// Returned series entries.
    pub fn series(&self) -> &[ApiSeries] {
        &self.results.series
    }

    /// Consumes the response, returning its series entries.
    pub fn into_series(self) -> Vec<ApiSeries> {
        self.results.series
    }
}

/// One series entry in `Results.series`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSeries {
    /// Series code (`seriesID` on the wire).
    #[serde(rename = "seriesID")]
    pub series_id: String,

    /// Catalog metadata, present when requested with `catalog=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<SeriesCatalog>,

    /// Series-level latest flag.
    #[serde(default, deserialize_with = "de::opt_bool", skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,

    /// Observations, newest first as returned by the API.
    #[serde(default)]
    pub data: Vec<ApiDataPoint>,
}

/// Catalog metadata for a series.
///
/// The API sends snake_case keys; camelCase spellings seen in older payloads
/// are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesCatalog {
    #[serde(default, alias = "seriesTitle", skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(default, alias = "surveyName", skip_serializing_if = "Option::is_none")]
    pub survey_name: Option<String>,
    #[serde(default, alias = "measureDataType", skip_serializing_if = "Option::is_none")]
    pub measure_data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<String>,
}

/// A single observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDataPoint {
    #[serde(deserialize_with = "de::year")]
    pub year: i32,

    /// `M01`..`M13`, `Q01`..`Q05`, `S01`..`S03`, `A01`.
    pub period: String,

    #[serde(rename = "periodName", default, skip_serializing_if = "Option::is_none")]
    pub period_name: Option<String>,

    #[serde(default, deserialize_with = "de::opt_bool", skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,

    /// Raw value text; `"-"` or empty when the BLS has no estimate.
    #[serde(default, deserialize_with = "de::opt_string")]
    pub value: Option<String>,

    #[serde(default, deserialize_with = "de::footnotes")]
    pub footnotes: Vec<Footnote>,
}

impl ApiDataPoint {
    /// The numeric value, or `None` when the text is missing, empty or not a number.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Non-empty footnote texts joined with `"; "`.
    pub fn footnote_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .footnotes
            .iter()
            .filter_map(|f| f.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("; "))
        }
    }
}

/// Footnote attached to an observation. Usually `{}` or `{code, text}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footnote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

mod de {
    use serde::{Deserialize, Deserializer, de::Error};

    use super::{BlsResults, Footnote};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
    }

    impl Scalar {
        fn into_text(self) -> String {
            match self {
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Str(s) => s,
            }
        }
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        match Scalar::deserialize(d)? {
            Scalar::Int(n) => i32::try_from(n).map_err(D::Error::custom),
            Scalar::Str(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| D::Error::custom(format!("invalid year: {s:?}"))),
            other => Err(D::Error::custom(format!(
                "invalid year: {}",
                other.into_text()
            ))),
        }
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_text))
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Scalar>::deserialize(d)? {
            Some(Scalar::Bool(b)) => Some(b),
            Some(Scalar::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn messages<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Messages {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Option::<Messages>::deserialize(d)? {
            None => Vec::new(),
            Some(Messages::One(s)) if s.is_empty() => Vec::new(),
            Some(Messages::One(s)) => vec![s],
            Some(Messages::Many(v)) => v,
        })
    }

    /// Failed requests may send `"Results": {}` or omit series; anything that is
    /// not an object becomes an empty result.
    pub fn results<'de, D: Deserializer<'de>>(d: D) -> Result<BlsResults, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        if value.is_object() {
            serde_json::from_value(value).map_err(D::Error::custom)
        } else {
            Ok(BlsResults::default())
        }
    }

    pub fn footnotes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Footnote>, D::Error> {
        let raw = Option::<Vec<Option<Footnote>>>::deserialize(d)?;
        Ok(raw.unwrap_or_default().into_iter().flatten().collect())
    }
}
