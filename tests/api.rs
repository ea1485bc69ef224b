//! HTTP API flow tests against the full router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use granary::dashboard::build_router;
use granary::dashboard::routes::{AppState, DashboardState};
use granary::engine::{DecisionEngine, EngineConfig};

fn test_state() -> AppState {
    let engine = DecisionEngine::with_seed(EngineConfig::default(), 42).unwrap();
    Arc::new(DashboardState::new(engine))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn decide_body() -> Value {
    json!({
        "current_price": 20.0,
        "forecast_price_median": 20.0,
        "forecast_price_std": 1.0,
        "yield_kg": 1000.0,
        "plant_health_score": 0.9,
        "storage_cost_per_day": 10.0,
        "use_thompson": true
    })
}

#[tokio::test]
async fn test_decision_lifecycle_over_http() {
    let state = test_state();

    // 1. Request a decision.
    let resp = build_router(state.clone())
        .oneshot(post("/api/decide", decide_body()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let decision = body_json(resp).await;
    let id = decision["id"].as_str().unwrap().to_string();
    assert_eq!(decision["estimates"].as_array().unwrap().len(), 3);
    assert_eq!(decision["posteriors"].as_array().unwrap().len(), 3);
    assert_eq!(decision["overridden"], json!(false));

    // 2. It shows up as pending.
    let resp = build_router(state.clone()).oneshot(get("/api/pending")).await.unwrap();
    let pending = body_json(resp).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["id"].as_str().unwrap(), id);

    // 3. Report its outcome.
    let resp = build_router(state.clone())
        .oneshot(post("/api/outcomes", json!({"decision_id": id, "reward": 1.0})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome = body_json(resp).await;
    assert_eq!(outcome["reward"], json!(1.0));

    // 4. Beliefs moved for the chosen arm.
    let chosen_idx = match decision["chosen_action"].as_str().unwrap() {
        "HarvestNow" => 0,
        "Wait3Days" => 1,
        "Wait7Days" => 2,
        other => panic!("unexpected action: {other}"),
    };
    let resp = build_router(state.clone()).oneshot(get("/api/posteriors")).await.unwrap();
    let posteriors = body_json(resp).await;
    let arm = &posteriors.as_array().unwrap()[chosen_idx];
    assert_eq!(arm["arm"], json!(chosen_idx));
    assert_eq!(arm["alpha"], json!(2.0));
    assert_eq!(arm["beta"], json!(1.0));

    // 5. Stats and history agree.
    let resp = build_router(state.clone()).oneshot(get("/api/stats")).await.unwrap();
    let stats = body_json(resp).await;
    assert_eq!(stats["total_decisions"], json!(1));
    assert_eq!(stats["resolved"], json!(1));
    assert_eq!(stats["pending"], json!(0));

    let resp = build_router(state.clone()).oneshot(get("/api/history")).await.unwrap();
    let history = body_json(resp).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // 6. Resolving the same decision again is a 404.
    let resp = build_router(state)
        .oneshot(post("/api/outcomes", json!({"decision_id": id, "reward": 1.0})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_greedy_mode_is_deterministic() {
    // Flat forecast with a mild rise below the override thresholds: the
    // greedy pick maximises expected profit and is seed-independent.
    let body = json!({
        "current_price": 20.0,
        "forecast_price_median": 21.0,
        "forecast_price_std": 1.0,
        "yield_kg": 1000.0,
        "plant_health_score": 0.9,
        "storage_cost_per_day": 10.0,
        "use_thompson": false
    });

    for seed in [1u64, 2, 3] {
        let engine = DecisionEngine::with_seed(EngineConfig::default(), seed).unwrap();
        let state: AppState = Arc::new(DashboardState::new(engine));
        let resp = build_router(state)
            .oneshot(post("/api/decide", body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let decision = body_json(resp).await;
        assert_eq!(decision["mode"], json!("Greedy"));
        assert_eq!(decision["chosen_action"], json!("Wait3Days"));
    }
}

#[tokio::test]
async fn test_invalid_inputs_are_422() {
    let state = test_state();

    let mut bad_yield = decide_body();
    bad_yield["yield_kg"] = json!(0.0);
    let resp = build_router(state.clone())
        .oneshot(post("/api/decide", bad_yield))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err = body_json(resp).await;
    assert!(err["error"].as_str().unwrap().contains("Invalid input"));

    let mut bad_health = decide_body();
    bad_health["plant_health_score"] = json!(1.5);
    let resp = build_router(state.clone())
        .oneshot(post("/api/decide", bad_health))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // An out-of-range reward must not consume the pending decision.
    let resp = build_router(state.clone())
        .oneshot(post("/api/decide", decide_body()))
        .await
        .unwrap();
    let decision = body_json(resp).await;
    let id = decision["id"].as_str().unwrap().to_string();

    let resp = build_router(state.clone())
        .oneshot(post("/api/outcomes", json!({"decision_id": id, "reward": 2.0})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = build_router(state.clone())
        .oneshot(post("/api/outcomes", json!({"decision_id": id, "reward": 0.7})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_decision_is_404() {
    let state = test_state();
    let resp = build_router(state)
        .oneshot(post(
            "/api/outcomes",
            json!({"decision_id": "00000000-0000-0000-0000-000000000000", "reward": 0.5}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_caps_at_100_entries() {
    let state = test_state();
    for _ in 0..120 {
        let resp = build_router(state.clone())
            .oneshot(post("/api/decide", decide_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = build_router(state).oneshot(get("/api/history")).await.unwrap();
    let history = body_json(resp).await;
    assert_eq!(history.as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn test_health() {
    let resp = build_router(test_state()).oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
