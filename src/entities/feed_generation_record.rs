use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One audit row per generation attempt. Append-only; rows are never
/// mutated after insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_generation_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub feed_id: Uuid,
    pub status: FeedGenerationStatus,
    pub product_count: i32,
    /// Json list of `{product_id, field, message, severity}` objects
    #[sea_orm(column_type = "Json")]
    pub validation_errors: Json,
    pub generation_time_ms: i64,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feed_config::Entity",
        from = "Column::FeedId",
        to = "super::feed_config::Column::Id"
    )]
    FeedConfig,
}

impl Related<super::feed_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeedConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum FeedGenerationStatus {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "partial")]
    Partial,
}
