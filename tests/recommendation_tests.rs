mod common;

use axum::http::StatusCode;
use common::{Req, fixture, test_app, test_app_with};
use mountify::chatbot::{FAILURE_TEXT, INTRO_TEXT, MAX_CARDS};
use serde_json::json;

#[tokio::test]
async fn test_mountain_recommendations() {
    let t = test_app().await;
    let preferences = json!({ "max_kesulitan_skala": 5, "prioritas": "pemandangan" });

    let response = t
        .send(Req::post("/api/recommendations/mountains").json(preferences.clone()))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["recommendations"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["nama_gunung"], "Gunung Merbabu");
    // The engine received the request body verbatim.
    assert_eq!(response.body["metadata"]["input"], preferences);
}

#[tokio::test]
async fn test_trail_recommendations() {
    let t = test_app().await;

    let response = t
        .send(Req::post("/api/recommendations/trails").json(json!({})))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["recommendations"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id_jalur"], 10);
}

#[tokio::test]
async fn test_engine_failures_return_empty_list() {
    for script in ["failing_engine.sh", "garbage_engine.sh", "missing_engine.sh"] {
        let t = test_app_with(|config| config.recommender.script = fixture(script)).await;

        let response = t
            .send(Req::post("/api/recommendations/mountains").json(json!({})))
            .await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{}", script);
        assert_eq!(response.body["recommendations"], json!([]));
        assert!(response.body["message"].is_string());
    }
}

#[tokio::test]
async fn test_engine_timeout() {
    let t = test_app_with(|config| {
        config.recommender.script = fixture("slow_engine.sh");
        config.recommender.timeout = std::time::Duration::from_millis(200);
    })
    .await;

    let response = t
        .send(Req::post("/api/recommendations/trails").json(json!({})))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_webhook_answers_with_cards() {
    let t = test_app().await;

    let response = t
        .send(Req::post("/api/chatbot/webhook").json(json!({
            "queryResult": {
                "parameters": { "kesulitan": "pemula", "keamanan": "aman" }
            }
        })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let messages = response.body["fulfillmentMessages"].as_array().unwrap();
    assert_eq!(messages.len(), 1 + MAX_CARDS);
    assert_eq!(messages[0]["text"]["text"][0], INTRO_TEXT);
    assert_eq!(messages[1]["card"]["title"], "Gunung Merbabu");
    assert_eq!(messages[1]["card"]["buttons"][0]["postback"], "/gunung/1");
}

#[tokio::test]
async fn test_webhook_failure_is_still_200() {
    let t = test_app_with(|config| config.recommender.script = fixture("failing_engine.sh")).await;

    let response = t
        .send(Req::post("/api/chatbot/webhook").json(json!({ "queryResult": {} })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["fulfillmentText"], FAILURE_TEXT);
}

#[tokio::test]
async fn test_detect_intent_without_endpoint() {
    let t = test_app().await;

    let response = t
        .send(
            Req::post("/api/chatbot/detect-intent")
                .json(json!({ "text": "halo", "session_id": "abc" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let response = t
        .send(Req::post("/api/chatbot/detect-intent").json(json!({ "session_id": "abc" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
