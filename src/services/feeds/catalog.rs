use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{category, product, product_category, product_image, product_variant};
use crate::errors::ServiceError;

const DEFAULT_CATEGORY: &str = "Uncategorized";

/// One sellable unit, platform-agnostic. Built fresh for every generation
/// pass, never persisted, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalCatalogEntry {
    /// Variant sku if present, else variant id, else product sku, else
    /// product id. Unique within one generation pass.
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub availability: Availability,
    pub condition: &'static str,
    pub brand: Option<String>,
    pub category: String,
    /// Empty when the product has no primary image; platform formatters
    /// decide whether that matters.
    pub image_url: String,
    /// Remaining images in sort order, primary excluded
    pub additional_images: Vec<String>,
    pub product_url: String,
    pub sku: Option<String>,
    pub inventory: i32,
    pub tags: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    InStock,
    OutOfStock,
}

impl Availability {
    pub fn from_inventory(inventory: i32) -> Self {
        if inventory > 0 {
            Availability::InStock
        } else {
            Availability::OutOfStock
        }
    }

    pub fn is_in_stock(self) -> bool {
        matches!(self, Availability::InStock)
    }
}

/// A source row that could not be turned into a catalog entry. Skipped rows
/// never abort the batch; they surface on the generation audit record.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ValidationIssue {
    pub product_id: String,
    pub field: String,
    pub message: String,
    pub severity: String,
}

impl ValidationIssue {
    pub fn warning(product_id: impl Into<String>, field: &str, message: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            field: field.to_string(),
            message: message.into(),
            severity: "warning".to_string(),
        }
    }
}

/// Options controlling one catalog build, taken from the feed config.
#[derive(Clone, Debug, Default)]
pub struct CatalogOptions {
    /// Restrict to products carrying at least one of these category ids;
    /// empty means all products.
    pub category_filter: Vec<Uuid>,
    pub include_variants: bool,
    /// Absolute base for product links, e.g. `https://shop.example.com`
    pub store_base_url: String,
}

/// Joined source rows for one build pass, loaded in a single sweep so the
/// assembly step stays pure and testable.
#[derive(Debug, Default)]
pub struct CatalogRows {
    pub products: Vec<product::Model>,
    pub variants_by_product: HashMap<Uuid, Vec<product_variant::Model>>,
    pub images_by_product: HashMap<Uuid, Vec<product_image::Model>>,
    pub category_by_product: HashMap<Uuid, String>,
    pub category_ids_by_product: HashMap<Uuid, Vec<Uuid>>,
}

/// Builds the canonical catalog for one feed generation pass.
pub struct CatalogBuilder {
    db: std::sync::Arc<DatabaseConnection>,
}

impl CatalogBuilder {
    pub fn new(db: std::sync::Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load all active catalog rows and assemble canonical entries.
    /// Ordering is stable: products by creation time descending, variants of
    /// one product consecutive in position order.
    pub async fn build(
        &self,
        options: &CatalogOptions,
    ) -> Result<(Vec<CanonicalCatalogEntry>, Vec<ValidationIssue>), ServiceError> {
        let rows = self.load_rows(options).await?;
        Ok(assemble_entries(rows, options))
    }

    async fn load_rows(&self, options: &CatalogOptions) -> Result<CatalogRows, ServiceError> {
        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        if products.is_empty() {
            return Ok(CatalogRows::default());
        }

        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

        let mut variants_by_product: HashMap<Uuid, Vec<product_variant::Model>> = HashMap::new();
        if options.include_variants {
            let variants = product_variant::Entity::find()
                .filter(product_variant::Column::ProductId.is_in(product_ids.clone()))
                .filter(product_variant::Column::IsActive.eq(true))
                .order_by_asc(product_variant::Column::Position)
                .all(&*self.db)
                .await?;

            for variant in variants {
                variants_by_product
                    .entry(variant.product_id)
                    .or_default()
                    .push(variant);
            }
        }

        let mut images_by_product: HashMap<Uuid, Vec<product_image::Model>> = HashMap::new();
        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.is_in(product_ids.clone()))
            .order_by_asc(product_image::Column::SortOrder)
            .all(&*self.db)
            .await?;
        for image in images {
            images_by_product
                .entry(image.product_id)
                .or_default()
                .push(image);
        }

        let links = product_category::Entity::find()
            .filter(product_category::Column::ProductId.is_in(product_ids.clone()))
            .all(&*self.db)
            .await?;

        let category_ids: Vec<Uuid> = links.iter().map(|l| l.category_id).collect();
        let categories = if category_ids.is_empty() {
            Vec::new()
        } else {
            category::Entity::find()
                .filter(category::Column::Id.is_in(category_ids))
                .order_by_asc(category::Column::SortOrder)
                .all(&*self.db)
                .await?
        };
        let category_names: HashMap<Uuid, (i32, String)> = categories
            .into_iter()
            .map(|c| (c.id, (c.sort_order, c.name)))
            .collect();

        let mut category_by_product: HashMap<Uuid, String> = HashMap::new();
        let mut category_ids_by_product: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut best_order: HashMap<Uuid, i32> = HashMap::new();
        for link in links {
            category_ids_by_product
                .entry(link.product_id)
                .or_default()
                .push(link.category_id);

            if let Some((order, name)) = category_names.get(&link.category_id) {
                let better = match best_order.get(&link.product_id) {
                    Some(current) => order < current,
                    None => true,
                };
                if better {
                    best_order.insert(link.product_id, *order);
                    category_by_product.insert(link.product_id, name.clone());
                }
            }
        }

        Ok(CatalogRows {
            products,
            variants_by_product,
            images_by_product,
            category_by_product,
            category_ids_by_product,
        })
    }
}

/// Pure assembly of canonical entries from pre-loaded rows.
pub fn assemble_entries(
    rows: CatalogRows,
    options: &CatalogOptions,
) -> (Vec<CanonicalCatalogEntry>, Vec<ValidationIssue>) {
    let mut entries = Vec::new();
    let mut issues = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for product in &rows.products {
        if !options.category_filter.is_empty() {
            let matched = rows
                .category_ids_by_product
                .get(&product.id)
                .map(|ids| ids.iter().any(|id| options.category_filter.contains(id)))
                .unwrap_or(false);
            if !matched {
                continue;
            }
        }

        if product.name.trim().is_empty() {
            warn!(product_id = %product.id, "skipping product without a name");
            issues.push(ValidationIssue::warning(
                product.id.to_string(),
                "name",
                "product has no name",
            ));
            continue;
        }

        let images = rows
            .images_by_product
            .get(&product.id)
            .map(|imgs| imgs.as_slice())
            .unwrap_or(&[]);
        let category = rows
            .category_by_product
            .get(&product.id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let variants = rows
            .variants_by_product
            .get(&product.id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        if options.include_variants && !variants.is_empty() {
            for variant in variants {
                let entry = entry_for_variant(product, variant, images, &category, options);
                push_unique(entry, &mut entries, &mut seen_ids, &mut issues);
            }
        } else {
            let entry = entry_for_product(product, images, &category, options);
            push_unique(entry, &mut entries, &mut seen_ids, &mut issues);
        }
    }

    (entries, issues)
}

fn push_unique(
    entry: CanonicalCatalogEntry,
    entries: &mut Vec<CanonicalCatalogEntry>,
    seen_ids: &mut HashSet<String>,
    issues: &mut Vec<ValidationIssue>,
) {
    if !seen_ids.insert(entry.id.clone()) {
        warn!(id = %entry.id, "skipping entry with duplicate feed id");
        issues.push(ValidationIssue::warning(
            entry.id.clone(),
            "id",
            "duplicate feed id within one generation pass",
        ));
        return;
    }
    entries.push(entry);
}

fn entry_for_product(
    product: &product::Model,
    images: &[product_image::Model],
    category: &str,
    options: &CatalogOptions,
) -> CanonicalCatalogEntry {
    let (image_url, additional_images) = split_images(images);
    let id = product
        .sku
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| product.id.to_string());

    CanonicalCatalogEntry {
        id,
        title: product.name.clone(),
        description: strip_html(product.description.as_deref().unwrap_or_default()).into_owned(),
        price: product.price,
        currency: product.currency.clone(),
        availability: Availability::from_inventory(product.quantity),
        condition: "new",
        brand: product.brand.clone(),
        category: category.to_string(),
        image_url,
        additional_images,
        product_url: product_link(&options.store_base_url, &product.slug),
        sku: product.sku.clone().filter(|s| !s.trim().is_empty()),
        inventory: product.quantity.max(0),
        tags: split_tags(product.tags.as_deref()),
    }
}

fn entry_for_variant(
    product: &product::Model,
    variant: &product_variant::Model,
    images: &[product_image::Model],
    category: &str,
    options: &CatalogOptions,
) -> CanonicalCatalogEntry {
    let (image_url, additional_images) = split_images(images);

    // Variant-first resolution with product fallback.
    let sku = variant
        .sku
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| product.sku.clone().filter(|s| !s.trim().is_empty()));
    let id = variant
        .sku
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| variant.id.to_string());
    let price = variant.price.unwrap_or(product.price);
    let inventory = variant.quantity.unwrap_or(product.quantity);
    let description = variant
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| product.description.clone())
        .unwrap_or_default();

    CanonicalCatalogEntry {
        id,
        title: format!("{} - {}", product.name, variant.name),
        description: strip_html(&description).into_owned(),
        price,
        currency: product.currency.clone(),
        availability: Availability::from_inventory(inventory),
        condition: "new",
        brand: product.brand.clone(),
        category: category.to_string(),
        image_url,
        additional_images,
        product_url: format!(
            "{}?variant={}",
            product_link(&options.store_base_url, &product.slug),
            variant.id
        ),
        sku,
        inventory: inventory.max(0),
        tags: split_tags(product.tags.as_deref()),
    }
}

fn split_images(images: &[product_image::Model]) -> (String, Vec<String>) {
    let mut urls = images.iter().map(|img| img.url.clone());
    let primary = urls.next().unwrap_or_default();
    (primary, urls.collect())
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn product_link(base: &str, slug: &str) -> String {
    format!("{}/products/{}", base.trim_end_matches('/'), slug)
}

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]*>").unwrap());

fn strip_html(input: &str) -> Cow<'_, str> {
    if HTML_TAG_RE.is_match(input) {
        Cow::Owned(HTML_TAG_RE.replace_all(input, "").to_string())
    } else {
        Cow::Borrowed(input)
    }
}
