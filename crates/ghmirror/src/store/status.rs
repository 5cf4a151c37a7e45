//! Per-organization progress counters.
//!
//! Counters only ever grow: the producer adds to `total`, workers add to
//! `done` or `failed`. Rows are created on first touch.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::entity_kind::EntityKind;
use crate::entity::sync_status::{ActiveModel, Column, Entity as SyncStatus, Model};

use super::errors::Result;

/// Create the (org, kind) row if it does not exist yet.
pub async fn ensure_status<C: ConnectionTrait>(db: &C, org: &str, kind: EntityKind) -> Result<()> {
    let row = ActiveModel {
        id: Set(Uuid::new_v4()),
        org: Set(org.to_string()),
        entity: Set(kind),
        total: Set(0),
        done: Set(0),
        failed: Set(0),
        updated_at: Set(Utc::now().fixed_offset()),
    };
    SyncStatus::insert(row)
        .on_conflict(
            OnConflict::columns([Column::Org, Column::Entity])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Add `n` published jobs.
pub async fn add_total<C: ConnectionTrait>(db: &C, org: &str, kind: EntityKind, n: u64) -> Result<()> {
    bump(db, org, kind, Column::Total, n).await
}

/// Add `n` successfully synced jobs.
pub async fn add_done<C: ConnectionTrait>(db: &C, org: &str, kind: EntityKind, n: u64) -> Result<()> {
    bump(db, org, kind, Column::Done, n).await
}

/// Add `n` failed jobs.
pub async fn add_failed<C: ConnectionTrait>(db: &C, org: &str, kind: EntityKind, n: u64) -> Result<()> {
    bump(db, org, kind, Column::Failed, n).await
}

/// All counters for `org`, ordered by kind.
pub async fn status_for_org<C: ConnectionTrait>(db: &C, org: &str) -> Result<Vec<Model>> {
    Ok(SyncStatus::find()
        .filter(Column::Org.eq(org))
        .order_by_asc(Column::Entity)
        .all(db)
        .await?)
}

async fn bump<C: ConnectionTrait>(
    db: &C,
    org: &str,
    kind: EntityKind,
    column: Column,
    n: u64,
) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    ensure_status(db, org, kind).await?;
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    SyncStatus::update_many()
        .col_expr(column, Expr::col(column).add(n))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Org.eq(org))
        .filter(Column::Entity.eq(kind))
        .exec(db)
        .await?;
    Ok(())
}
