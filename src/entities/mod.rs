pub mod category;
pub mod feed_config;
pub mod feed_generation_record;
pub mod pixel_platform;
pub mod product;
pub mod product_category;
pub mod product_image;
pub mod product_variant;
pub mod tracked_event;

pub use category::Entity as Category;
pub use feed_config::Entity as FeedConfig;
pub use feed_generation_record::Entity as FeedGenerationRecord;
pub use pixel_platform::Entity as PixelPlatform;
pub use product::Entity as Product;
pub use product_category::Entity as ProductCategory;
pub use product_image::Entity as ProductImage;
pub use product_variant::Entity as ProductVariant;
pub use tracked_event::Entity as TrackedEvent;
