use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

use crate::errors::ServiceError;
use crate::services::feeds::catalog::{Availability, CanonicalCatalogEntry};

/// One formatted record, keyed by platform-defined field names. Insertion
/// order is preserved (serde_json preserve_order), so the CSV header and XML
/// element order follow the formatter, not the alphabet.
pub type PlatformRecord = Map<String, Value>;

/// The closed set of supported advertising platforms. Adding a variant
/// without extending the formatter table below is a compile error.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum FeedPlatform {
    Meta,
    Google,
    Tiktok,
    Pinterest,
    Snapchat,
    Microsoft,
    Twitter,
    Linkedin,
    Generic,
}

impl FeedPlatform {
    /// Parse a stored platform name. Unknown names are a configuration
    /// error and must fail fast, never fall through to a default formatter.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        raw.to_lowercase().parse::<FeedPlatform>().map_err(|_| {
            ServiceError::ConfigurationError(format!("unknown feed platform: {raw}"))
        })
    }

    /// Recommended cache lifetime when the feed config does not set one.
    pub fn default_cache_secs(self) -> u32 {
        match self {
            FeedPlatform::Google => 86_400,
            FeedPlatform::Tiktok | FeedPlatform::Snapchat => 21_600,
            _ => 3_600,
        }
    }

    pub fn limits(self) -> PlatformLimits {
        match self {
            // TODO: confirm with the product owner whether Meta caps titles
            // at 150 or 200 (legacy exporters disagree; 150/5000 is the
            // stricter pair and is what we enforce here).
            FeedPlatform::Meta => PlatformLimits {
                title_max: Some(150),
                description_max: Some(5000),
            },
            FeedPlatform::Google => PlatformLimits {
                title_max: Some(150),
                description_max: Some(5000),
            },
            _ => PlatformLimits::default(),
        }
    }

    fn formatter(self) -> fn(&CanonicalCatalogEntry) -> PlatformRecord {
        match self {
            FeedPlatform::Meta => format_meta,
            FeedPlatform::Google => format_google,
            FeedPlatform::Tiktok => format_tiktok,
            FeedPlatform::Pinterest => format_pinterest,
            FeedPlatform::Snapchat => format_snapchat,
            FeedPlatform::Microsoft => format_microsoft,
            FeedPlatform::Twitter => format_twitter,
            FeedPlatform::Linkedin => format_linkedin,
            FeedPlatform::Generic => format_generic,
        }
    }
}

/// Documented field-length caps. `None` means the platform does not cap the
/// field.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformLimits {
    pub title_max: Option<usize>,
    pub description_max: Option<usize>,
}

/// How many extra images Pinterest accepts, and the join delimiter. The
/// legacy exporters disagreed between `,` and `|`; `|` is the one Pinterest
/// bulk uploads document, so that is the deliberate pick.
const PINTEREST_IMAGE_CAP: usize = 5;
const PINTEREST_IMAGE_DELIMITER: &str = "|";

/// Transform canonical entries into platform records. Pure: the same
/// entries always produce the same records.
pub fn format_for_platform(
    platform: FeedPlatform,
    entries: &[CanonicalCatalogEntry],
) -> Vec<PlatformRecord> {
    let formatter = platform.formatter();
    entries.iter().map(formatter).collect()
}

/// Truncate to `max` characters, reserving three of them for the ellipsis.
/// The budget is always honored: the result never exceeds `max` chars.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn apply_limit(text: &str, limit: Option<usize>) -> String {
    match limit {
        Some(max) => truncate_with_ellipsis(text, max),
        None => text.to_string(),
    }
}

fn availability_spaced(availability: Availability) -> &'static str {
    match availability {
        Availability::InStock => "in stock",
        Availability::OutOfStock => "out of stock",
    }
}

fn availability_screaming(availability: Availability) -> &'static str {
    match availability {
        Availability::InStock => "IN_STOCK",
        Availability::OutOfStock => "OUT_OF_STOCK",
    }
}

fn availability_twitter(availability: Availability) -> &'static str {
    match availability {
        Availability::InStock => "available",
        Availability::OutOfStock => "unavailable",
    }
}

fn availability_canonical(availability: Availability) -> &'static str {
    match availability {
        Availability::InStock => "in_stock",
        Availability::OutOfStock => "out_of_stock",
    }
}

fn price_with_currency(entry: &CanonicalCatalogEntry) -> String {
    format!("{} {}", entry.price.normalize(), entry.currency)
}

fn price_number(entry: &CanonicalCatalogEntry) -> Value {
    let price = entry.price.normalize();
    if price.is_integer() {
        if let Some(n) = price.to_i64() {
            return Value::Number(n.into());
        }
    }
    price
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(price.to_string()))
}

fn insert(record: &mut PlatformRecord, key: &str, value: impl Into<Value>) {
    record.insert(key.to_string(), value.into());
}

/// Insert only when the value is non-empty. Meta rejects null-ish fields, so
/// they are dropped from the record entirely.
fn insert_nonempty(record: &mut PlatformRecord, key: &str, value: Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            record.insert(key.to_string(), Value::String(v));
        }
    }
}

fn joined_additional_images(entry: &CanonicalCatalogEntry, cap: usize, sep: &str) -> Option<String> {
    if entry.additional_images.is_empty() {
        return None;
    }
    Some(
        entry
            .additional_images
            .iter()
            .take(cap)
            .cloned()
            .collect::<Vec<_>>()
            .join(sep),
    )
}

fn format_meta(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let limits = FeedPlatform::Meta.limits();
    let mut record = PlatformRecord::new();

    let id = entry.sku.clone().unwrap_or_else(|| entry.id.clone());
    insert(&mut record, "id", id);
    insert(
        &mut record,
        "title",
        apply_limit(&entry.title, limits.title_max),
    );
    insert_nonempty(
        &mut record,
        "description",
        Some(apply_limit(&entry.description, limits.description_max)),
    );
    insert(&mut record, "availability", availability_spaced(entry.availability));
    insert(&mut record, "condition", entry.condition);
    insert(&mut record, "price", price_with_currency(entry));
    insert(&mut record, "link", entry.product_url.clone());
    insert_nonempty(&mut record, "image_link", Some(entry.image_url.clone()));
    insert_nonempty(
        &mut record,
        "additional_image_link",
        joined_additional_images(entry, 10, ","),
    );
    insert_nonempty(&mut record, "brand", entry.brand.clone());
    insert_nonempty(&mut record, "product_type", Some(entry.category.clone()));
    // Meta takes the first two tags as indexed custom labels.
    insert_nonempty(&mut record, "custom_label_0", entry.tags.first().cloned());
    insert_nonempty(&mut record, "custom_label_1", entry.tags.get(1).cloned());

    record
}

fn format_google(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let limits = FeedPlatform::Google.limits();
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(
        &mut record,
        "title",
        apply_limit(&entry.title, limits.title_max),
    );
    insert(
        &mut record,
        "description",
        apply_limit(&entry.description, limits.description_max),
    );
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(&mut record, "availability", availability_spaced(entry.availability));
    insert(&mut record, "price", price_with_currency(entry));
    insert(&mut record, "condition", entry.condition);
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "product_type", entry.category.clone());
    insert(
        &mut record,
        "identifier_exists",
        if entry.sku.is_some() { "TRUE" } else { "FALSE" },
    );
    insert(&mut record, "shipping_weight", "1 kg");

    record
}

fn format_tiktok(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "sku_id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(
        &mut record,
        "availability",
        availability_screaming(entry.availability),
    );
    insert(&mut record, "condition", "NEW");
    insert(&mut record, "price", price_number(entry));
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "category", entry.category.clone());

    record
}

fn format_pinterest(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(
        &mut record,
        "additional_image_link",
        joined_additional_images(entry, PINTEREST_IMAGE_CAP, PINTEREST_IMAGE_DELIMITER)
            .unwrap_or_default(),
    );
    insert(&mut record, "price", price_with_currency(entry));
    insert(&mut record, "availability", availability_spaced(entry.availability));
    insert(&mut record, "condition", entry.condition);
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "product_type", entry.category.clone());

    record
}

fn format_snapchat(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(&mut record, "price", price_number(entry));
    insert(&mut record, "availability", availability_spaced(entry.availability));
    insert(&mut record, "condition", entry.condition);
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "item_group_id", entry.category.clone());

    record
}

fn format_microsoft(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(&mut record, "price", price_with_currency(entry));
    insert(&mut record, "availability", availability_spaced(entry.availability));
    insert(&mut record, "condition", entry.condition);
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "product_category", entry.category.clone());

    record
}

fn format_twitter(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "link", entry.product_url.clone());
    insert(&mut record, "image_link", entry.image_url.clone());
    insert(&mut record, "price", price_number(entry));
    insert(&mut record, "currency", entry.currency.clone());
    insert(
        &mut record,
        "availability",
        availability_twitter(entry.availability),
    );
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );

    record
}

fn format_linkedin(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "product_id", entry.id.clone());
    insert(&mut record, "name", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "url", entry.product_url.clone());
    insert(&mut record, "image_url", entry.image_url.clone());
    insert(&mut record, "price", price_number(entry));
    insert(&mut record, "currency", entry.currency.clone());
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "category", entry.category.clone());

    record
}

fn format_generic(entry: &CanonicalCatalogEntry) -> PlatformRecord {
    let mut record = PlatformRecord::new();

    insert(&mut record, "id", entry.id.clone());
    insert(&mut record, "title", entry.title.clone());
    insert(&mut record, "description", entry.description.clone());
    insert(&mut record, "price", price_number(entry));
    insert(&mut record, "currency", entry.currency.clone());
    insert(
        &mut record,
        "availability",
        availability_canonical(entry.availability),
    );
    insert(&mut record, "condition", entry.condition);
    insert(
        &mut record,
        "brand",
        entry.brand.clone().unwrap_or_default(),
    );
    insert(&mut record, "category", entry.category.clone());
    insert(&mut record, "image_url", entry.image_url.clone());
    insert(
        &mut record,
        "additional_images",
        Value::Array(
            entry
                .additional_images
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        ),
    );
    insert(&mut record, "product_url", entry.product_url.clone());
    insert(
        &mut record,
        "sku",
        entry.sku.clone().unwrap_or_default(),
    );
    insert(&mut record, "inventory", entry.inventory);
    insert(
        &mut record,
        "tags",
        Value::Array(entry.tags.iter().cloned().map(Value::String).collect()),
    );

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use strum::IntoEnumIterator;

    fn entry() -> CanonicalCatalogEntry {
        CanonicalCatalogEntry {
            id: "ASH-100".to_string(),
            title: "Ashwagandha Capsules".to_string(),
            description: "Organic root extract".to_string(),
            price: dec!(1200),
            currency: "PKR".to_string(),
            availability: Availability::InStock,
            condition: "new",
            brand: Some("Herbal Co".to_string()),
            category: "Supplements".to_string(),
            image_url: "https://cdn.example.com/ash.jpg".to_string(),
            additional_images: vec![
                "https://cdn.example.com/ash-2.jpg".to_string(),
                "https://cdn.example.com/ash-3.jpg".to_string(),
            ],
            product_url: "https://shop.example.com/products/ashwagandha-capsules".to_string(),
            sku: Some("ASH-100".to_string()),
            inventory: 10,
            tags: vec!["wellness".to_string(), "herbal".to_string(), "roots".to_string()],
        }
    }

    #[test]
    fn parse_rejects_unknown_platform() {
        let err = FeedPlatform::parse("myspace").unwrap_err();
        assert!(matches!(err, ServiceError::ConfigurationError(_)));
        assert_eq!(FeedPlatform::parse("meta").unwrap(), FeedPlatform::Meta);
    }

    #[test]
    fn meta_formats_price_and_availability() {
        let record = format_for_platform(FeedPlatform::Meta, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(record["id"], "ASH-100");
        assert_eq!(record["price"], "1200 PKR");
        assert_eq!(record["availability"], "in stock");
        assert_eq!(record["custom_label_0"], "wellness");
        assert_eq!(record["custom_label_1"], "herbal");
        assert!(!record.contains_key("custom_label_2"));
    }

    #[test]
    fn meta_drops_empty_fields_entirely() {
        let mut e = entry();
        e.brand = None;
        e.image_url = String::new();
        e.tags.clear();
        let record = format_for_platform(FeedPlatform::Meta, &[e]).pop().unwrap();
        assert!(!record.contains_key("brand"));
        assert!(!record.contains_key("image_link"));
        assert!(!record.contains_key("custom_label_0"));
    }

    #[test]
    fn google_sets_identifier_exists_from_sku() {
        let with_sku = format_for_platform(FeedPlatform::Google, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(with_sku["identifier_exists"], "TRUE");
        assert_eq!(with_sku["shipping_weight"], "1 kg");

        let mut e = entry();
        e.sku = None;
        let without_sku = format_for_platform(FeedPlatform::Google, &[e]).pop().unwrap();
        assert_eq!(without_sku["identifier_exists"], "FALSE");
    }

    #[test]
    fn tiktok_uses_screaming_availability_and_numeric_price() {
        let record = format_for_platform(FeedPlatform::Tiktok, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(record["availability"], "IN_STOCK");
        assert_eq!(record["condition"], "NEW");
        assert!(record["price"].is_number());
    }

    #[test]
    fn pinterest_joins_extra_images_with_pipe() {
        let record = format_for_platform(FeedPlatform::Pinterest, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(
            record["additional_image_link"],
            "https://cdn.example.com/ash-2.jpg|https://cdn.example.com/ash-3.jpg"
        );
    }

    #[test]
    fn twitter_and_linkedin_split_out_currency() {
        let twitter = format_for_platform(FeedPlatform::Twitter, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(twitter["currency"], "PKR");
        assert_eq!(twitter["availability"], "available");

        let linkedin = format_for_platform(FeedPlatform::Linkedin, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(linkedin["product_id"], "ASH-100");
        assert_eq!(linkedin["name"], "Ashwagandha Capsules");
        assert_eq!(
            linkedin["url"],
            "https://shop.example.com/products/ashwagandha-capsules"
        );
    }

    #[test]
    fn generic_passes_canonical_fields_through() {
        let record = format_for_platform(FeedPlatform::Generic, &[entry()])
            .pop()
            .unwrap();
        assert_eq!(record["availability"], "in_stock");
        assert!(record["price"].is_number());
        assert!(record["additional_images"].is_array());
        assert_eq!(record["inventory"], 10);
    }

    #[test]
    fn truncation_reserves_the_ellipsis_budget() {
        let long_title = "x".repeat(400);
        let truncated = truncate_with_ellipsis(&long_title, 150);
        assert_eq!(truncated.chars().count(), 150);
        assert!(truncated.ends_with("..."));

        let short = truncate_with_ellipsis("short", 150);
        assert_eq!(short, "short");
        assert!(!short.ends_with("..."));
    }

    #[test]
    fn every_platform_respects_its_title_limit() {
        let mut e = entry();
        e.title = "t".repeat(1000);
        for platform in FeedPlatform::iter() {
            let record = format_for_platform(platform, &[e.clone()]).pop().unwrap();
            let title_key = if platform == FeedPlatform::Linkedin {
                "name"
            } else {
                "title"
            };
            let title = record[title_key].as_str().unwrap();
            if let Some(max) = platform.limits().title_max {
                assert!(title.chars().count() <= max, "{platform} exceeded cap");
                assert!(title.ends_with("..."), "{platform} missing ellipsis");
            } else {
                assert_eq!(title.chars().count(), 1000);
            }
        }
    }

    #[test]
    fn default_cache_lifetimes_follow_the_recommendation_table() {
        assert_eq!(FeedPlatform::Meta.default_cache_secs(), 3600);
        assert_eq!(FeedPlatform::Google.default_cache_secs(), 86_400);
        assert_eq!(FeedPlatform::Tiktok.default_cache_secs(), 21_600);
        assert_eq!(FeedPlatform::Snapchat.default_cache_secs(), 21_600);
        assert_eq!(FeedPlatform::Pinterest.default_cache_secs(), 3600);
    }
}
