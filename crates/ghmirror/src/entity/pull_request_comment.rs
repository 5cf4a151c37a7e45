//! Pull request review comment entity, identified by GitHub id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pull_request_comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub github_id: i64,
    pub repository_owner: String,
    pub repository_name: String,
    /// Parsed from the payload's `pull_request_url` when present.
    pub pull_number: Option<i64>,
    #[sea_orm(column_type = "Json")]
    pub payload: serde_json::Value,
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
