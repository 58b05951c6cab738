mod common;

use axum::http::StatusCode;
use common::{assert_status, body_json, seed_pixel_platform, TestApp};
use sea_orm::EntityTrait;
use serde_json::json;
use storefeed_api::entities::tracked_event;

#[tokio::test]
async fn valid_event_is_accepted_and_queued() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    let response = app
        .post_json(
            "/pixel-events",
            json!({
                "pixel_platform_id": platform_id,
                "event_type": "view_content",
                "value": "1200",
                "currency": "PKR",
                "product_id": "ASH-100",
                "session_id": "sess-1",
            }),
        )
        .await;

    assert_status(&response, StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["queued"], 1);
    assert_eq!(body["queue_size"], 1);
    assert_eq!(body["deduplicated"], 0);
}

#[tokio::test]
async fn queue_size_reflects_prior_queue_length() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    for (i, expected_size) in [(0, 1), (1, 2), (2, 3)] {
        let response = app
            .post_json(
                "/pixel-events",
                json!({
                    "pixel_platform_id": platform_id,
                    "event_type": "view_content",
                    "product_id": format!("P-{i}"),
                    "session_id": "sess-1",
                }),
            )
            .await;
        let body = body_json(response).await;
        assert_eq!(body["queue_size"], expected_size);
    }
}

#[tokio::test]
async fn purchase_without_order_id_is_a_field_level_400() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    let response = app
        .post_json(
            "/pixel-events",
            json!({
                "pixel_platform_id": platform_id,
                "event_type": "purchase",
                "value": "5400",
            }),
        )
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields = body["details"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["field"], "order_id");
    assert_eq!(fields[0]["index"], 0);
}

#[tokio::test]
async fn batched_submission_reports_errors_by_index() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    let response = app
        .post_json(
            "/pixel-events",
            json!([
                {
                    "pixel_platform_id": platform_id,
                    "event_type": "page_view",
                },
                {
                    "pixel_platform_id": platform_id,
                    "event_type": "not_a_thing",
                },
            ]),
        )
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields = body["details"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["index"], 1);
    assert_eq!(fields[0]["field"], "event_type");
}

#[tokio::test]
async fn duplicate_purchase_for_one_order_is_suppressed() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    let purchase = json!({
        "pixel_platform_id": platform_id,
        "event_type": "purchase",
        "order_id": "ORDER-77",
        "value": "5400",
    });

    let first = body_json(app.post_json("/pixel-events", purchase.clone()).await).await;
    assert_eq!(first["queued"], 1);

    let second = body_json(app.post_json("/pixel-events", purchase).await).await;
    assert_eq!(second["queued"], 0);
    assert_eq!(second["deduplicated"], 1);
}

#[tokio::test]
async fn full_batch_is_flushed_to_durable_storage() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    // Distinct product ids keep the dedup guard out of the way; 50 events
    // hit the batch threshold and flush in one write.
    let events: Vec<_> = (0..50)
        .map(|i| {
            json!({
                "pixel_platform_id": platform_id,
                "event_type": "view_content",
                "product_id": format!("P-{i}"),
                "session_id": "sess-1",
            })
        })
        .collect();

    let response = app.post_json("/pixel-events", json!(events)).await;
    assert_status(&response, StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["queued"], 50);

    assert!(app.state.services.event_queue().is_empty());

    let stored = tracked_event::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(stored.len(), 50);
}

#[tokio::test]
async fn listing_filters_by_event_type_newest_first() {
    let app = TestApp::new().await;
    let platform_id = seed_pixel_platform(&app, "Meta pixel").await;

    let mut events = Vec::new();
    for i in 0..30 {
        events.push(json!({
            "pixel_platform_id": platform_id,
            "event_type": if i % 2 == 0 { "page_view" } else { "search" },
            "product_id": format!("P-{i}"),
            "session_id": "sess-1",
        }));
    }
    app.post_json("/pixel-events", json!(events)).await;
    // Below the batch threshold; force the durable write for the read side.
    app.state.services.event_queue().flush().await;

    let response = app
        .get("/pixel-events?event_type=page_view&limit=10")
        .await;
    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    let listed = body["events"].as_array().unwrap();
    assert_eq!(listed.len(), 10);
    assert!(listed.iter().all(|e| e["event_type"] == "page_view"));
    assert_eq!(body["limit"], 10);
}

#[tokio::test]
async fn listing_clamps_limit_and_rejects_unknown_event_type() {
    let app = TestApp::new().await;

    let response = app.get("/pixel-events?limit=99999").await;
    assert_status(&response, StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["limit"], 1000);

    let response = app.get("/pixel-events?event_type=bogus").await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_rejected_without_reaching_the_queue() {
    let app = TestApp::new().await;

    let response = app.post_json("/pixel-events", json!("not an event")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(app.state.services.event_queue().is_empty());
}
