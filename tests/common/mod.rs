use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefeed_api::{
    config::AppConfig,
    db,
    entities::{feed_config, pixel_platform, product, product_image, product_variant},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up application state backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // The in-memory database lives and dies with its one connection.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = storefeed_api::api_routes().with_state(state.clone());

        Self { router, state }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed")
    }

    pub async fn options(&self, path: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri(path)
                    .header("origin", "https://ads.example.net")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed")
    }
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("body was not utf-8")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).expect("body was not json")
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Seed one product row; returns its id.
#[allow(clippy::too_many_arguments)]
pub async fn seed_product(
    app: &TestApp,
    name: &str,
    sku: Option<&str>,
    price: Decimal,
    currency: &str,
    quantity: i32,
) -> Uuid {
    let id = Uuid::new_v4();
    product::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        slug: Set(name.to_lowercase().replace(' ', "-")),
        description: Set(Some(format!("{name} description"))),
        brand: Set(Some("Herbal Co".to_string())),
        sku: Set(sku.map(str::to_string)),
        price: Set(price),
        currency: Set(currency.to_string()),
        quantity: Set(quantity),
        tags: Set(Some("wellness, herbal".to_string())),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed product");
    id
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_variant(
    app: &TestApp,
    product_id: Uuid,
    name: &str,
    sku: Option<&str>,
    price: Option<Decimal>,
    quantity: Option<i32>,
    position: i32,
) -> Uuid {
    let id = Uuid::new_v4();
    product_variant::ActiveModel {
        id: Set(id),
        product_id: Set(product_id),
        name: Set(name.to_string()),
        sku: Set(sku.map(str::to_string)),
        price: Set(price),
        description: Set(None),
        quantity: Set(quantity),
        position: Set(position),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed variant");
    id
}

pub async fn seed_image(app: &TestApp, product_id: Uuid, url: &str, sort_order: i32) {
    product_image::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        url: Set(url.to_string()),
        alt_text: Set(None),
        sort_order: Set(sort_order),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed image");
}

/// Seed one feed config; returns its id.
pub async fn seed_feed_config(
    app: &TestApp,
    slug: &str,
    platform: &str,
    format: &str,
    include_variants: bool,
    is_active: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    feed_config::ActiveModel {
        id: Set(id),
        name: Set(format!("{slug} feed")),
        slug: Set(slug.to_string()),
        platform: Set(platform.to_string()),
        format: Set(format.to_string()),
        is_active: Set(is_active),
        category_filter: Set(serde_json::json!([])),
        include_variants: Set(include_variants),
        cache_duration_secs: Set(None),
        last_generated_at: Set(None),
        generation_count: Set(0),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed feed config");
    id
}

/// Seed one pixel platform; returns its id.
pub async fn seed_pixel_platform(app: &TestApp, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    pixel_platform::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        platform: Set("meta".to_string()),
        pixel_id: Set("px-123456".to_string()),
        is_enabled: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed pixel platform");
    id
}
