//! Alias table synchronization.
//!
//! A mapping file (CSV or JSON, see [`bls_ingestor::resolve::alias`]) is the
//! desired state; `bls_aliases` is made to match it:
//! - pairs in the file but not in the table are inserted,
//! - with `prune`, pairs in the table but not in the file are deleted,
//! - series IDs that have no `bls_series` row yet get a bare stub row first,
//!   since aliases reference series by foreign key.
//!
//! Everything runs inside one `BEGIN IMMEDIATE` transaction. With `dry_run`
//! the diff is computed and returned but nothing is written. Running the same
//! sync twice yields an empty diff the second time.

mod diff;

pub use diff::{AliasDiff, AliasPair};

use std::collections::BTreeSet;

use bls_ingestor::resolve::AliasMap;
use diesel::prelude::*;
use tracing::info;

use crate::{
    models::{NewAlias, NewSeries},
    schema::{bls_aliases, bls_series},
    timestamps::now_rfc3339,
};

/// Alias type recorded for rows that come from a mapping file.
pub const USER_ALIAS_TYPE: &str = "user";

/// Options for alias synchronization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Compute the diff only.
    pub dry_run: bool,
    /// Delete stored aliases absent from the file.
    pub prune: bool,
}

fn wanted_pairs(map: &AliasMap) -> BTreeSet<AliasPair> {
    map.iter()
        .flat_map(|(alias, value)| value.codes().into_iter().map(move |code| (alias.to_string(), code)))
        .collect()
}

fn current_pairs(conn: &mut SqliteConnection) -> QueryResult<BTreeSet<AliasPair>> {
    let rows: Vec<AliasPair> = bls_aliases::table
        .select((bls_aliases::alias, bls_aliases::series_id))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

fn apply(conn: &mut SqliteConnection, diff: &AliasDiff) -> QueryResult<()> {
    let now = now_rfc3339();

    for id in &diff.series_stubs {
        diesel::insert_or_ignore_into(bls_series::table)
            .values(&NewSeries {
                series_id: id,
                series_title: None,
                survey_name: None,
                measure_data_type: None,
                area: None,
                item: None,
                seasonality: None,
                base_period: None,
                begin_year: None,
                begin_period: None,
                end_year: None,
                end_period: None,
                latest: false,
                last_updated: None,
                created_at: &now,
                updated_at: &now,
            })
            .execute(conn)?;
    }

    for (alias, id) in &diff.aliases_insert {
        diesel::insert_or_ignore_into(bls_aliases::table)
            .values(&NewAlias {
                alias,
                series_id: id,
                alias_type: USER_ALIAS_TYPE,
                created_at: &now,
            })
            .execute(conn)?;
    }

    for (alias, id) in &diff.aliases_delete {
        diesel::delete(
            bls_aliases::table.filter(bls_aliases::alias.eq(alias).and(bls_aliases::series_id.eq(id))),
        )
        .execute(conn)?;
    }
    Ok(())
}

/// Makes `bls_aliases` match `map`, returning what changed (or would change).
pub fn sync_aliases(conn: &mut SqliteConnection, map: &AliasMap, opt: SyncOptions) -> anyhow::Result<AliasDiff> {
    let wanted = wanted_pairs(map);

    let diff = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let current = current_pairs(conn)?;
        let known: BTreeSet<String> = bls_series::table
            .select(bls_series::series_id)
            .load::<String>(conn)?
            .into_iter()
            .collect();

        let diff = AliasDiff::compute(&wanted, &current, &known, opt.prune);
        if !opt.dry_run && !diff.is_noop() {
            apply(conn, &diff)?;
        }
        Ok(diff)
    })?;

    info!(
        dry_run = opt.dry_run,
        inserted = diff.aliases_insert.len(),
        deleted = diff.aliases_delete.len(),
        stubs = diff.series_stubs.len(),
        "alias sync"
    );
    Ok(diff)
}

/// Reads `bls_aliases` back into an [`AliasMap`].
pub fn load_alias_map(conn: &mut SqliteConnection) -> anyhow::Result<AliasMap> {
    let rows: Vec<AliasPair> = bls_aliases::table
        .select((bls_aliases::alias, bls_aliases::series_id))
        .order_by(bls_aliases::id.asc())
        .load(conn)?;
    Ok(AliasMap::from_pairs(rows))
}
