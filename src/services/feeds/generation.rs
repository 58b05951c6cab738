use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::feed_config;
use crate::entities::feed_generation_record::{self, FeedGenerationStatus};
use crate::errors::ServiceError;
use crate::services::feeds::catalog::{CatalogBuilder, CatalogOptions, ValidationIssue};
use crate::services::feeds::formatters::{format_for_platform, FeedPlatform};
use crate::services::feeds::serializers::{serialize_records, ChannelInfo, FeedFormat};

/// A fully rendered feed document plus the metadata the HTTP layer exposes.
#[derive(Debug, Clone)]
pub struct GeneratedFeed {
    pub body: String,
    pub content_type: &'static str,
    pub cache_seconds: u32,
    pub product_count: usize,
    pub generation_time_ms: u64,
    pub warnings: Vec<ValidationIssue>,
}

/// Orchestrates catalog build, platform formatting and serialization for a
/// configured feed, and keeps the generation audit trail.
pub struct FeedGenerationService {
    db: Arc<DatabaseConnection>,
    store_base_url: String,
}

impl FeedGenerationService {
    pub fn new(db: Arc<DatabaseConnection>, store_base_url: String) -> Self {
        Self { db, store_base_url }
    }

    /// Generate the feed for an active config. `NotFound` (unknown or
    /// inactive slug) is decided before the generation stage, so it leaves no
    /// audit row; every attempt past that point writes one.
    #[instrument(skip(self))]
    pub async fn generate_by_slug(&self, slug: &str) -> Result<GeneratedFeed, ServiceError> {
        let config = feed_config::Entity::find()
            .filter(feed_config::Column::Slug.eq(slug))
            .filter(feed_config::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("feed '{slug}' not found")))?;

        let started = Instant::now();

        match self.render(&config).await {
            Ok((feed, warnings)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let status = if warnings.is_empty() {
                    FeedGenerationStatus::Success
                } else {
                    FeedGenerationStatus::Partial
                };

                self.record_generation(
                    config.id,
                    status,
                    feed.product_count,
                    &warnings,
                    elapsed_ms,
                    feed.body.len() as i64,
                )
                .await;
                self.touch_config(&config).await;

                info!(
                    slug = %config.slug,
                    products = feed.product_count,
                    elapsed_ms,
                    "generated feed"
                );

                Ok(GeneratedFeed {
                    generation_time_ms: elapsed_ms,
                    warnings,
                    ..feed
                })
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let failure = ValidationIssue {
                    product_id: String::new(),
                    field: "feed".to_string(),
                    message: err.to_string(),
                    severity: "error".to_string(),
                };
                self.record_generation(
                    config.id,
                    FeedGenerationStatus::Failed,
                    0,
                    &[failure],
                    elapsed_ms,
                    0,
                )
                .await;

                error!(slug = %config.slug, error = %err, "feed generation failed");

                match err {
                    // Registry misconfiguration keeps its own class so it is
                    // diagnosable; everything else becomes a generation error.
                    ServiceError::ConfigurationError(_) => Err(err),
                    other => Err(ServiceError::GenerationError(other.to_string())),
                }
            }
        }
    }

    async fn render(
        &self,
        config: &feed_config::Model,
    ) -> Result<(GeneratedFeed, Vec<ValidationIssue>), ServiceError> {
        let platform = FeedPlatform::parse(&config.platform)?;
        let format = FeedFormat::parse(&config.format)?;

        let options = CatalogOptions {
            category_filter: config.category_filter_ids(),
            include_variants: config.include_variants,
            store_base_url: self.store_base_url.clone(),
        };

        let (entries, warnings) = CatalogBuilder::new(self.db.clone()).build(&options).await?;
        let records = format_for_platform(platform, &entries);

        let channel = ChannelInfo {
            title: config.name.clone(),
            link: self.store_base_url.clone(),
            description: format!("{} product feed", platform),
        };
        let body = serialize_records(format, platform, &records, &channel)?;

        let feed = GeneratedFeed {
            product_count: records.len(),
            content_type: format.content_type(),
            cache_seconds: cache_seconds(config, platform),
            body,
            generation_time_ms: 0,
            warnings: Vec::new(),
        };

        Ok((feed, warnings))
    }

    /// Append one audit row. Best-effort: a failed insert is logged and
    /// never fails the response already computed.
    async fn record_generation(
        &self,
        feed_id: Uuid,
        status: FeedGenerationStatus,
        product_count: usize,
        issues: &[ValidationIssue],
        generation_time_ms: u64,
        file_size_bytes: i64,
    ) {
        let record = feed_generation_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            feed_id: Set(feed_id),
            status: Set(status),
            product_count: Set(product_count as i32),
            validation_errors: Set(serde_json::to_value(issues).unwrap_or_default()),
            generation_time_ms: Set(generation_time_ms as i64),
            file_size_bytes: Set(file_size_bytes),
            created_at: Set(Utc::now()),
        };

        if let Err(err) = record.insert(&*self.db).await {
            warn!(%feed_id, error = %err, "failed to write feed generation record");
        }
    }

    /// Best-effort bump of the config's generation bookkeeping.
    async fn touch_config(&self, config: &feed_config::Model) {
        let mut update: feed_config::ActiveModel = config.clone().into();
        update.last_generated_at = Set(Some(Utc::now()));
        update.generation_count = Set(config.generation_count + 1);
        update.updated_at = Set(Utc::now());

        if let Err(err) = update.update(&*self.db).await {
            warn!(slug = %config.slug, error = %err, "failed to update feed generation counter");
        }
    }
}

/// Effective cache lifetime: the config's explicit value when positive,
/// otherwise the per-platform recommendation.
fn cache_seconds(config: &feed_config::Model, platform: FeedPlatform) -> u32 {
    match config.cache_duration_secs {
        Some(secs) if secs > 0 => secs as u32,
        _ => platform.default_cache_secs(),
    }
}
