//! Per-organization progress counters, one row per (org, entity kind).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::entity_kind::EntityKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub org: String,
    pub entity: EntityKind,
    /// Jobs published by the producer.
    pub total: i64,
    /// Jobs synced successfully.
    pub done: i64,
    /// Jobs that failed and were logged.
    pub failed: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Jobs neither done nor failed yet.
    pub fn pending(&self) -> i64 {
        (self.total - self.done - self.failed).max(0)
    }
}
