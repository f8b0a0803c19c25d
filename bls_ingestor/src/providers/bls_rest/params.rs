use serde::Serialize;

use crate::models::request_params::SeriesRequestParams;

/// JSON body of a `POST /publicAPI/v2/timeseries/data/` request.
///
/// Optional fields are omitted entirely rather than sent as `null` or `false`;
/// the API treats a present flag as a request for the enrichment.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BlsPayload {
    pub seriesid: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startyear: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endyear: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrationkey: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub catalog: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub calculations: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub annualaverage: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub aspects: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Builds the payload for one chunk. The key is attached separately so that
/// logs and tests can inspect the payload without exposing a secret.
pub fn construct_payload(params: &SeriesRequestParams) -> BlsPayload {
    BlsPayload {
        seriesid: params.series_ids.clone(),
        startyear: params.start_year.map(|y| y.to_string()),
        endyear: params.end_year.map(|y| y.to_string()),
        registrationkey: None,
        catalog: params.options.catalog,
        calculations: params.options.calculations,
        annualaverage: params.options.annualaverage,
        aspects: params.options.aspects,
    }
}
