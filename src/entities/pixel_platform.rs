use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A configured tracking pixel for one advertising platform. Maintained by
/// the admin back office; events reference these rows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pixel_platforms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub platform: String,
    pub pixel_id: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tracked_event::Entity")]
    TrackedEvents,
}

impl Related<super::tracked_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackedEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
