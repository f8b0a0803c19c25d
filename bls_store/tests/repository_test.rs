mod common;
use common::{age_freshness, count, fk_check_empty, item, point, setup_db};

use std::time::Duration;

use bls_store::{
    models::ExtractionLogRecord,
    repository::{ExtractionRecord, ExtractionStatus, PointItem, RepoError, SeriesMetadata, SeriesRepo, SqliteRepo},
    schema::{bls_data_points, bls_extraction_logs, bls_series},
};
use chrono::Utc;
use diesel::prelude::*;

#[test]
fn upsert_counts_inserts_then_updates() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let items = vec![item(
        "CUUR0000SA0",
        Some("All items"),
        vec![point(2024, "M01", Some("308.417")), point(2024, "M02", Some("310.326"))],
    )];

    let first = repo.upsert_series_data(&mut conn, &items, Some("run-1")).unwrap();
    assert_eq!(first.inserted, 3, "one series row plus two observations");
    assert_eq!(first.updated, 0);

    let second = repo.upsert_series_data(&mut conn, &items, Some("run-2")).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 2);

    assert_eq!(count(&mut conn, "bls_series"), 1);
    assert_eq!(count(&mut conn, "bls_data_points"), 2);
    assert_eq!(count(&mut conn, "bls_data_freshness"), 1);

    let ids: Vec<Option<String>> = bls_data_points::table
        .select(bls_data_points::extraction_id)
        .load(&mut conn)
        .unwrap();
    assert!(ids.iter().all(|id| id.as_deref() == Some("run-2")));
    fk_check_empty(&mut conn);
}

#[test]
fn blank_values_are_omitted_and_garbage_is_skipped() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let items = vec![item(
        "CUUR0000SA0",
        None,
        vec![
            point(2024, "M01", Some("")),
            point(2024, "M02", None),
            point(2024, "M03", Some("-")),
            point(2024, "M04", Some("NaN")),
            point(2024, "M05", Some("312.0")),
        ],
    )];

    let counts = repo.upsert_series_data(&mut conn, &items, None).unwrap();
    assert_eq!(counts.skipped, 2);
    assert_eq!(counts.inserted, 2);
    assert_eq!(count(&mut conn, "bls_data_points"), 1);

    // a generated extraction id is a UUID
    let id: Option<String> = bls_data_points::table
        .select(bls_data_points::extraction_id)
        .first(&mut conn)
        .unwrap();
    assert!(uuid::Uuid::parse_str(id.as_deref().unwrap()).is_ok());
}

#[test]
fn metadata_keeps_stored_fields_when_incoming_is_absent() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();

    let mut full = item("CUUR0000SA0", Some("All items"), vec![]);
    full.metadata.area = Some("U.S. city average".into());
    repo.upsert_series_data(&mut conn, &[full], None).unwrap();

    let mut partial = item("CUUR0000SA0", None, vec![]);
    partial.metadata = SeriesMetadata {
        item: Some("All items".into()),
        ..Default::default()
    };
    partial.latest = Some(true);
    repo.upsert_series_data(&mut conn, &[partial], None).unwrap();

    let (title, area, it, latest): (Option<String>, Option<String>, Option<String>, bool) = bls_series::table
        .select((bls_series::series_title, bls_series::area, bls_series::item, bls_series::latest))
        .first(&mut conn)
        .unwrap();
    assert_eq!(title.as_deref(), Some("All items"));
    assert_eq!(area.as_deref(), Some("U.S. city average"));
    assert_eq!(it.as_deref(), Some("All items"));
    assert!(latest);
}

#[test]
fn series_data_filters_orders_and_dates() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let items = vec![
        item(
            "CUUR0000SA0",
            Some("All items"),
            vec![
                point(2023, "M12", Some("306.746")),
                point(2021, "Q02", Some("1.0")),
                point(2022, "M07", Some("296.276")),
            ],
        ),
        item("CUUR0000SAF1", Some("Food"), vec![point(2022, "M01", Some("1.5"))]),
    ];
    repo.upsert_series_data(&mut conn, &items, None).unwrap();

    let codes = vec!["CUUR0000SAF1".to_string(), "CUUR0000SA0".to_string()];
    let rows = repo
        .get_series_data(&mut conn, &codes, Some(2023), Some(2022), true)
        .unwrap();
    let keys: Vec<(&str, i32, &str)> = rows
        .iter()
        .map(|r| (r.series_id.as_str(), r.year, r.period.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("CUUR0000SA0", 2022, "M07"),
            ("CUUR0000SA0", 2023, "M12"),
            ("CUUR0000SAF1", 2022, "M01"),
        ]
    );
    assert_eq!(rows[0].date, "2022-07-01");
    assert_eq!(
        rows[2].metadata.as_ref().and_then(|m| m.series_title.as_deref()),
        Some("Food")
    );

    let all = repo.get_series_data(&mut conn, &codes[1..], None, None, false).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].date, "2021-04-01");
    assert!(all[0].metadata.is_none());

    assert!(repo.get_series_data(&mut conn, &[], None, None, false).unwrap().is_empty());
}

#[test]
fn stale_detection_honours_threshold() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let items = vec![
        item("AAAA0000SA0", None, vec![point(2024, "M01", Some("1"))]),
        item("BBBB0000SA0", None, vec![point(2024, "M01", Some("1"))]),
    ];
    repo.upsert_series_data(&mut conn, &items, None).unwrap();
    assert!(repo.get_stale_series(&mut conn, 24).unwrap().is_empty());

    age_freshness(&mut conn, "BBBB0000SA0", 48);
    assert_eq!(repo.get_stale_series(&mut conn, 24).unwrap(), vec!["BBBB0000SA0"]);
    assert!(repo.get_stale_series(&mut conn, 72).unwrap().is_empty());

    let codes = vec!["AAAA0000SA0".to_string(), "BBBB0000SA0".to_string(), "ZZZZ0000SA0".to_string()];
    let freshness = repo.get_data_freshness(&mut conn, &codes).unwrap();
    assert_eq!(freshness.len(), 2);
    let now = Utc::now();
    assert!(!freshness["AAAA0000SA0"].is_stale(now, 24));
    assert!(freshness["BBBB0000SA0"].is_stale(now, 24));
    assert_eq!(freshness["AAAA0000SA0"].extraction_priority, 5);

    repo.mark_series_updated(&mut conn, "BBBB0000SA0", "manual").unwrap();
    assert!(repo.get_stale_series(&mut conn, 24).unwrap().is_empty());

    let err = repo.mark_series_updated(&mut conn, "ZZZZ0000SA0", "manual").unwrap_err();
    assert!(matches!(err.downcast_ref::<RepoError>(), Some(RepoError::UnknownSeries { .. })));
}

#[test]
fn out_of_range_ages_treat_nothing_as_stale() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    repo.upsert_series_data(&mut conn, &[item("AAAA0000SA0", None, vec![point(2024, "M01", Some("1"))])], None)
        .unwrap();
    age_freshness(&mut conn, "AAAA0000SA0", 24 * 365 * 50);

    assert!(repo.get_stale_series(&mut conn, 10_000_000_000_000).unwrap().is_empty());
    assert!(repo.get_stale_series(&mut conn, i64::MAX).unwrap().is_empty());
    assert_eq!(repo.cleanup_extraction_logs(&mut conn, i64::MAX).unwrap(), 0);

    let codes = vec!["AAAA0000SA0".to_string()];
    let freshness = repo.get_data_freshness(&mut conn, &codes).unwrap();
    assert!(!freshness["AAAA0000SA0"].is_stale(Utc::now(), i64::MAX));
    assert!(freshness["AAAA0000SA0"].is_stale(Utc::now(), 24));
}

#[test]
fn extraction_logs_record_runs_and_clean_up() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let codes = vec!["CUUR0000SA0".to_string()];

    let counts = repo
        .upsert_series_data(
            &mut conn,
            &[item("CUUR0000SA0", None, vec![point(2024, "M01", Some("1"))])],
            Some("ok-run"),
        )
        .unwrap();
    let ok = ExtractionRecord::completed("ok-run", &codes, counts)
        .with_years(Some(2020), Some(2024))
        .with_run(3, Duration::from_secs(2));
    let failed = ExtractionRecord::failed("bad-run", &codes, "HTTP 503");
    let first = repo.log_extraction(&mut conn, &ok).unwrap();
    let second = repo.log_extraction(&mut conn, &failed).unwrap();
    assert!(second > first);

    let logs: Vec<ExtractionLogRecord> = bls_extraction_logs::table
        .select(ExtractionLogRecord::as_select())
        .order_by(bls_extraction_logs::id)
        .load(&mut conn)
        .unwrap();
    assert_eq!(logs[0].series_ids, r#"["CUUR0000SA0"]"#);
    assert_eq!(logs[0].extraction_status, ExtractionStatus::Completed.as_str());
    assert_eq!(logs[0].records_inserted, 2);
    assert_eq!(logs[0].api_calls_made, 3);
    assert_eq!(logs[0].extraction_duration_seconds, Some(2));
    assert_eq!(logs[1].extraction_status, "failed");
    assert_eq!(logs[1].error_message.as_deref(), Some("HTTP 503"));

    let stats = repo.stats(&mut conn).unwrap();
    assert_eq!((stats.series_count, stats.data_point_count, stats.extraction_count), (1, 1, 2));
    assert!(stats.latest_extraction.is_some());

    diesel::update(bls_extraction_logs::table.filter(bls_extraction_logs::id.eq(first)))
        .set(bls_extraction_logs::created_at.eq("2000-01-01T00:00:00.000Z"))
        .execute(&mut conn)
        .unwrap();
    assert_eq!(repo.cleanup_extraction_logs(&mut conn, 30).unwrap(), 1);
    assert_eq!(count(&mut conn, "bls_extraction_logs"), 1);
    assert!(repo.cleanup_extraction_logs(&mut conn, -1).is_err());
}

#[test]
fn search_matches_title_area_and_item() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let mut food = item("CUUR0000SAF1", Some("Food in U.S. city average"), vec![]);
    food.metadata.item = Some("Food".into());
    let mut energy = item("CUUR0100SA0E", Some("Energy"), vec![]);
    energy.metadata.area = Some("Northeast".into());
    repo.upsert_series_data(&mut conn, &[food, energy], None).unwrap();

    let hits: Vec<String> = repo
        .search_series(&mut conn, "food", 10)
        .unwrap()
        .into_iter()
        .map(|s| s.series_id)
        .collect();
    assert_eq!(hits, vec!["CUUR0000SAF1"]);

    let hits = repo.search_series(&mut conn, "NORTHEAST", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(repo.search_series(&mut conn, "", 1).unwrap().len(), 1);
}

#[test]
fn upsert_rolls_back_with_the_callers_transaction() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteRepo::new();
    let items = vec![item("CUUR0000SA0", None, vec![PointItem {
        footnotes: Some("preliminary".into()),
        ..point(2024, "M01", Some("1"))
    }])];

    let res = conn.immediate_transaction::<(), anyhow::Error, _>(|conn| {
        repo.upsert_series_data(conn, &items, None)?;
        anyhow::bail!("abort");
    });
    assert!(res.is_err());
    assert_eq!(count(&mut conn, "bls_series"), 0);
    assert_eq!(count(&mut conn, "bls_data_points"), 0);
}
