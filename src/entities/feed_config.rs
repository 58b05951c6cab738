use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named export configuration maintained by the admin back office.
/// This crate reads active rows only; create/edit/delete happen elsewhere.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// URL-safe identifier, unique across configs
    #[sea_orm(unique)]
    pub slug: String,
    pub platform: String,
    pub format: String,
    pub is_active: bool,
    /// Json array of category uuids; empty means all categories
    #[sea_orm(column_type = "Json")]
    pub category_filter: Json,
    pub include_variants: bool,
    /// Null or 0 falls back to the per-platform recommendation
    pub cache_duration_secs: Option<i32>,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub generation_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::feed_generation_record::Entity")]
    FeedGenerationRecords,
}

impl Related<super::feed_generation_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeedGenerationRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-z0-9](?:[a-z0-9-]{1,48}[a-z0-9])$").unwrap());

/// Checks the documented slug shape: 3-50 chars, lowercase alphanumeric plus
/// hyphen, no leading or trailing hyphen.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= 50 && SLUG_RE.is_match(slug)
}

impl Model {
    /// Category ids this feed is restricted to; empty means no restriction.
    pub fn category_filter_ids(&self) -> Vec<Uuid> {
        serde_json::from_value::<Vec<Uuid>>(self.category_filter.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_shape() {
        assert!(is_valid_slug("meta-daily"));
        assert!(is_valid_slug("abc"));
        assert!(is_valid_slug("a1-b2-c3"));
        assert!(!is_valid_slug("ab"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("UPPER-case"));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug(&"x".repeat(51)));
    }
}
