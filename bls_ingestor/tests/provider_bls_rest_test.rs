use bls_ingestor::{
    config::ApiConfig,
    models::request_params::SeriesRequestParams,
    parse_results,
    providers::{
        ProviderError,
        bls_rest::{ApiKeyPool, BlsRestProvider, RetryPolicy},
    },
    requests::historical::{fetch_series, fetch_series_parallel},
};
use indexmap::IndexMap;
use mockito::{Matcher, Server};
use serde_json::{Value, json};

const PATH: &str = "/publicAPI/v2/timeseries/data/";

fn provider(server: &Server, retry: RetryPolicy) -> BlsRestProvider {
    let config = ApiConfig {
        url: format!("{}{PATH}", server.url()),
        timeout_secs: 5,
        ..Default::default()
    };
    BlsRestProvider::with_keys(&config, ApiKeyPool::from_keys(["test-key"]), retry).unwrap()
}

fn codes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("CUUR{i:04}SA0")).collect()
}

fn series_body(id: &str, year: &str) -> String {
    json!({
        "status": "REQUEST_SUCCEEDED",
        "message": [],
        "Results": {"series": [{
            "seriesID": id,
            "data": [{"year": year, "period": "M01", "periodName": "January",
                      "value": "100.5", "footnotes": [{}]}]
        }]}
    })
    .to_string()
}

/// Echoes the first requested code and the window start back as one series.
fn echo_body(req: &mockito::Request) -> Vec<u8> {
    let body: Value = req
        .body()
        .ok()
        .and_then(|b| serde_json::from_slice(b).ok())
        .unwrap_or(Value::Null);
    let id = body["seriesid"][0].as_str().unwrap_or("UNKNOWN");
    let year = body["startyear"].as_str().unwrap_or("2024");
    series_body(id, year).into_bytes()
}

/// Answers with one series per requested code, stamped with the window start.
fn echo_all_body(req: &mockito::Request) -> Vec<u8> {
    let body: Value = req
        .body()
        .ok()
        .and_then(|b| serde_json::from_slice(b).ok())
        .unwrap_or(Value::Null);
    let year = body["startyear"].as_str().unwrap_or("2024");
    let series: Vec<Value> = body["seriesid"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .map(|id| {
                    json!({"seriesID": id, "data": [{"year": year, "period": "M01",
                           "periodName": "January", "value": "1", "footnotes": []}]})
                })
                .collect()
        })
        .unwrap_or_default();
    json!({"status": "REQUEST_SUCCEEDED", "message": [], "Results": {"series": series}})
        .to_string()
        .into_bytes()
}

#[tokio::test]
async fn chunked_fetch_issues_one_request_per_chunk() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({"registrationkey": "test-key"})))
        .with_status(200)
        .with_body_from_request(echo_body)
        .expect(9)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::none());
    let params = SeriesRequestParams::new(codes(120), Some(1980), Some(2024));
    let response = fetch_series(&p, &params).await.unwrap();

    mock.assert_async().await;
    assert!(response.is_success());

    let order: Vec<(String, i32)> = response
        .series()
        .iter()
        .map(|s| (s.series_id.clone(), s.data[0].year))
        .collect();
    assert_eq!(
        order,
        vec![
            ("CUUR0000SA0".to_string(), 1980),
            ("CUUR0000SA0".to_string(), 2000),
            ("CUUR0000SA0".to_string(), 2020),
            ("CUUR0050SA0".to_string(), 1980),
            ("CUUR0050SA0".to_string(), 2000),
            ("CUUR0050SA0".to_string(), 2020),
            ("CUUR0100SA0".to_string(), 1980),
            ("CUUR0100SA0".to_string(), 2000),
            ("CUUR0100SA0".to_string(), 2020),
        ]
    );
}

#[tokio::test]
async fn transient_status_is_retried_then_succeeds() {
    let mut server = Server::new_async().await;
    let unavailable = server
        .mock("POST", PATH)
        .with_status(503)
        .with_body("upstream busy")
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(series_body("CUUR0000SA0", "2024"))
        .expect(1)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::immediate(3));
    let params = SeriesRequestParams::new(vec!["CUUR0000SA0".into()], Some(2024), Some(2024));
    let response = fetch_series(&p, &params).await.unwrap();

    unavailable.assert_async().await;
    ok.assert_async().await;
    let rows = parse_results(&response, &IndexMap::new());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, Some(100.5));
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(503)
        .with_body("x".repeat(800))
        .expect(3)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::immediate(2));
    let params = SeriesRequestParams::new(vec!["CUUR0000SA0".into()], None, None);
    let err = fetch_series(&p, &params).await.unwrap_err();

    mock.assert_async().await;
    match err {
        ProviderError::Http { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body.len(), 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn client_error_status_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(400)
        .with_body("bad request")
        .expect(1)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::immediate(5));
    let params = SeriesRequestParams::new(vec!["CUUR0000SA0".into()], None, None);
    let err = fetch_series(&p, &params).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ProviderError::Http { status: 400, .. }));
}

#[tokio::test]
async fn application_failure_aborts_sequential_fetch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(
            json!({
                "status": "REQUEST_NOT_PROCESSED",
                "message": ["Daily threshold for total number of requests allocated has been reached."],
                "Results": {}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::immediate(5));
    let params = SeriesRequestParams::new(codes(60), Some(2020), Some(2024));
    let err = fetch_series(&p, &params).await.unwrap_err();

    mock.assert_async().await;
    match err {
        ProviderError::Api { status, message, .. } => {
            assert_eq!(status, "REQUEST_NOT_PROCESSED");
            assert!(message.contains("Daily threshold"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn parallel_fetch_keeps_successful_chunks_in_plan_order() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", PATH)
        .match_body(Matcher::PartialJson(json!({"startyear": "1980"})))
        .with_status(400)
        .with_body("bad window")
        .expect(3)
        .create_async()
        .await;
    let ok = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex(r#""startyear":"20[0-9]{2}""#.to_string()))
        .with_status(200)
        .with_body_from_request(echo_body)
        .expect(6)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::none());
    let params = SeriesRequestParams::new(codes(120), Some(1980), Some(2024));
    let response = fetch_series_parallel(&p, &params, 5).await.unwrap();

    failing.assert_async().await;
    ok.assert_async().await;

    let order: Vec<(String, i32)> = response
        .series()
        .iter()
        .map(|s| (s.series_id.clone(), s.data[0].year))
        .collect();
    assert_eq!(
        order,
        vec![
            ("CUUR0000SA0".to_string(), 2000),
            ("CUUR0000SA0".to_string(), 2020),
            ("CUUR0050SA0".to_string(), 2000),
            ("CUUR0050SA0".to_string(), 2020),
            ("CUUR0100SA0".to_string(), 2000),
            ("CUUR0100SA0".to_string(), 2020),
        ]
    );
}

#[tokio::test]
async fn parallel_fetch_groups_windows_by_series() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body_from_request(echo_all_body)
        .expect(2)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::none());
    let params = SeriesRequestParams::new(codes(2), Some(1990), Some(2024));
    let response = fetch_series_parallel(&p, &params, 5).await.unwrap();
    mock.assert_async().await;

    let order: Vec<(&str, i32)> = response
        .series()
        .iter()
        .map(|s| (s.series_id.as_str(), s.data[0].year))
        .collect();
    assert_eq!(
        order,
        vec![
            ("CUUR0000SA0", 1990),
            ("CUUR0000SA0", 2010),
            ("CUUR0001SA0", 1990),
            ("CUUR0001SA0", 2010),
        ]
    );
}

#[tokio::test]
async fn parallel_fetch_with_no_success_is_empty() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(400)
        .with_body("nope")
        .expect(2)
        .create_async()
        .await;

    let p = provider(&server, RetryPolicy::none());
    let params = SeriesRequestParams::new(codes(60), None, None);
    let response = fetch_series_parallel(&p, &params, 5).await.unwrap();

    mock.assert_async().await;
    assert!(response.is_success());
    assert!(response.series().is_empty());
}

#[tokio::test]
async fn empty_code_list_is_rejected_without_requests() {
    let server = Server::new_async().await;
    let p = provider(&server, RetryPolicy::none());
    let params = SeriesRequestParams::new(Vec::new(), None, None);

    assert!(matches!(
        fetch_series(&p, &params).await,
        Err(ProviderError::Validation { .. })
    ));
    assert!(matches!(
        fetch_series_parallel(&p, &params, 5).await,
        Err(ProviderError::Validation { .. })
    ));
}
