pub mod catalog;
pub mod formatters;
pub mod generation;
pub mod serializers;

pub use catalog::{CanonicalCatalogEntry, CatalogBuilder, CatalogOptions, ValidationIssue};
pub use formatters::{format_for_platform, FeedPlatform, PlatformRecord};
pub use generation::{FeedGenerationService, GeneratedFeed};
pub use serializers::FeedFormat;
