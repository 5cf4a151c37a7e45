use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, IntoActiveModel, ModelTrait, QueryFilter,
    SqlErr,
};
use uuid::Uuid;

use super::errors::{Result, StoreError};
use super::mirror::MirrorEntity;

/// What [`upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Find the record's row by natural identity; insert it if absent,
/// otherwise overwrite the whole row.
///
/// The find and the write are separate statements. If an insert fails on
/// the unique identity index, another writer got there first: the row is
/// re-read and updated instead.
pub async fn upsert<E, C>(db: &C, record: &E::Record) -> Result<UpsertOutcome>
where
    E: MirrorEntity,
    E::Model: IntoActiveModel<E::Active>,
    C: ConnectionTrait,
{
    let model = E::build(record, Utc::now().fixed_offset());

    if let Some(existing) = find::<E, C>(db, record).await? {
        overwrite::<E, C>(db, &existing, model).await?;
        return Ok(UpsertOutcome::Updated);
    }

    let mut insert_model = model.clone();
    insert_model.set(E::id_column(), Uuid::new_v4().into());

    match insert_model.insert(db).await {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            let table = E::default().table_name().to_owned();
            tracing::debug!(
                table = %table,
                identity = %E::describe(record),
                "insert lost a race, updating the winning row"
            );
            let existing = find::<E, C>(db, record).await?.ok_or_else(|| {
                StoreError::ConflictVanished {
                    table,
                    identity: E::describe(record),
                }
            })?;
            overwrite::<E, C>(db, &existing, model).await?;
            Ok(UpsertOutcome::Updated)
        }
        Err(err) => Err(err.into()),
    }
}

async fn find<E, C>(db: &C, record: &E::Record) -> Result<Option<E::Model>>
where
    E: MirrorEntity,
    C: ConnectionTrait,
{
    Ok(E::find().filter(E::identity(record)).one(db).await?)
}

async fn overwrite<E, C>(db: &C, existing: &E::Model, mut model: E::Active) -> Result<()>
where
    E: MirrorEntity,
    E::Model: IntoActiveModel<E::Active>,
    C: ConnectionTrait,
{
    let id_column = E::id_column();
    model.set(id_column, existing.get(id_column));
    model.update(db).await?;
    Ok(())
}
