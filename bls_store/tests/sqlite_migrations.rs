mod common;
use common::{assert_sqlite_pragmas, fk_check_empty, setup_db};

use bls_store::db::connection::{connect_sqlite, health_check};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_query;
use diesel::sql_types::Integer;

#[derive(QueryableByName)]
struct TblCnt {
    #[diesel(sql_type = Integer)]
    cnt: i32,
}

#[test]
fn migrations_create_every_table_and_pragmas_hold() {
    let (db, mut conn) = setup_db();
    assert_sqlite_pragmas(&mut conn);
    health_check(&mut conn).expect("select 1");

    let tbls: TblCnt = sql_query(
        "SELECT COUNT(*) AS cnt
            FROM sqlite_master
            WHERE type='table'
            AND name IN ('bls_series','bls_data_points','bls_aliases',
                         'bls_extraction_logs','bls_data_freshness');",
    )
    .get_result(&mut conn)
    .unwrap();
    assert_eq!(tbls.cnt, 5);

    // second connection to the same file gets the same PRAGMAs
    let mut second = connect_sqlite(&format!("sqlite://{}", db.path)).expect("connect with scheme");
    assert_sqlite_pragmas(&mut second);
    fk_check_empty(&mut conn);
}

#[test]
fn data_points_are_unique_per_series_year_period() {
    let (_db, mut conn) = setup_db();
    sql_query(
        "INSERT INTO bls_series (series_id, created_at, updated_at)
         VALUES ('CUUR0000SA0', '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');",
    )
    .execute(&mut conn)
    .unwrap();

    let insert = "INSERT INTO bls_data_points
        (series_id, year, period, date, value, created_at, updated_at)
        VALUES ('CUUR0000SA0', 2024, 'M01', '2024-01-01', 308.4,
                '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');";
    sql_query(insert).execute(&mut conn).unwrap();

    let err = sql_query(insert).execute(&mut conn).unwrap_err();
    assert!(matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    ));
}

#[test]
fn data_points_require_a_series_row() {
    let (_db, mut conn) = setup_db();
    let err = sql_query(
        "INSERT INTO bls_data_points
            (series_id, year, period, date, value, created_at, updated_at)
         VALUES ('NOPE0000', 2024, 'M01', '2024-01-01', 1.0,
                 '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');",
    )
    .execute(&mut conn)
    .unwrap_err();
    assert!(matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    ));
}

#[test]
fn extraction_status_is_constrained() {
    let (_db, mut conn) = setup_db();
    let res = sql_query(
        "INSERT INTO bls_extraction_logs (extraction_id, series_ids, extraction_status, created_at)
         VALUES ('x', '[]', 'exploded', '2024-01-01T00:00:00.000Z');",
    )
    .execute(&mut conn);
    assert!(res.is_err(), "CHECK constraint should reject unknown status");
}
