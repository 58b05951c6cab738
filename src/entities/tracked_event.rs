use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One behavioral signal emitted by the storefront UI.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracked_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pixel_platform_id: Uuid,
    pub event_type: TrackedEventType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub value: Option<Decimal>,
    pub currency: String,
    /// Catalog join key: variant sku when present, uuid fallback. The
    /// referenced item may no longer be in the active catalog.
    pub product_id: Option<String>,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pixel_platform::Entity",
        from = "Column::PixelPlatformId",
        to = "super::pixel_platform::Column::Id"
    )]
    PixelPlatform,
}

impl Related<super::pixel_platform::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PixelPlatform.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Behavioral event taxonomy shared by the ingestion endpoint and the
/// dedup guard.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackedEventType {
    #[sea_orm(string_value = "page_view")]
    PageView,
    #[sea_orm(string_value = "view_content")]
    ViewContent,
    #[sea_orm(string_value = "add_to_cart")]
    AddToCart,
    #[sea_orm(string_value = "initiate_checkout")]
    InitiateCheckout,
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "search")]
    Search,
    #[sea_orm(string_value = "custom")]
    Custom,
}
