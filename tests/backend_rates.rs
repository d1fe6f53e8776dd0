use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use content_planner::config::PlannerConfig;
use content_planner::estimate::RateContext;
use content_planner::rates_client::{effective_rates_or_local, RateSource, RatesClient};
use content_planner::{Lesson, Section, TrainingPlan};

type Captured = Arc<Mutex<Vec<Value>>>;

async fn effective_rates(
    Path(project_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let is_lesson = query.get("lesson_index").is_some();
    let fallback = if project_id == "acme corp" { 150.0 } else { 100.0 };
    Json(json!({
        "is_advanced": is_lesson,
        "rates": { "presentation": 300.0, "quiz": 90.0 },
        "completion_times": { "presentation": 10, "one_pager": 3, "quiz": 5, "video_lesson": 6 },
        "fallback_single_rate": fallback
    }))
}

async fn save_plan(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    captured.lock().expect("capture lock").push(body);
    Json(json!({ "status": "ok" }))
}

async fn spawn_backend() -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/custom/projects/:project_id/effective-rates", get(effective_rates))
        .route("/api/custom/projects/:project_id/training-plan", put(save_plan))
        .with_state(Arc::clone(&captured));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), captured)
}

async fn unreachable_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

fn client(endpoint: String) -> RatesClient {
    RatesClient::new(endpoint, "/api/custom".to_string(), Duration::from_secs(2)).expect("client builds")
}

#[test]
fn project_urls_encode_ids_and_trim_slashes() {
    let rates = RatesClient::new(
        "http://localhost:8000/".to_string(),
        "/api/custom/".to_string(),
        Duration::from_secs(1),
    )
    .expect("client builds");
    assert_eq!(
        rates.project_url("acme corp/1", "effective-rates"),
        "http://localhost:8000/api/custom/projects/acme%20corp%2F1/effective-rates"
    );

    let bare = RatesClient::new("http://localhost:8000".to_string(), String::new(), Duration::from_secs(1))
        .expect("client builds");
    assert_eq!(
        bare.project_url("p1", "training-plan"),
        "http://localhost:8000/projects/p1/training-plan"
    );
}

#[tokio::test]
async fn fetches_effective_rates_from_backend() {
    let (endpoint, _) = spawn_backend().await;
    let rates = client(endpoint);

    let response = rates
        .effective_rates("acme corp", Some(0), Some(2))
        .await
        .expect("backend answers");
    assert!(response.is_advanced);
    assert_eq!(response.rates.presentation, Some(300.0));
    assert_eq!(response.rates.one_pager, None);
    assert_eq!(response.fallback_single_rate, Some(150.0));
    assert_eq!(response.completion_times.map(|times| times.video_lesson), Some(6));

    let context = response.rate_context(200.0);
    assert!(context.advanced);
    assert!((context.single_rate - 150.0).abs() < 1e-6);
    assert!((context.rate_for(content_planner::ContentProduct::OnePager) - 150.0).abs() < 1e-6);

    let section_level = rates
        .effective_rates("p2", Some(0), None)
        .await
        .expect("backend answers");
    assert!(!section_level.is_advanced);
}

#[tokio::test]
async fn backend_rates_win_over_local() {
    let (endpoint, _) = spawn_backend().await;
    let rates = client(endpoint);

    let resolved = effective_rates_or_local(
        Some(&rates),
        "p1",
        Some(1),
        Some(0),
        RateContext::single(80.0),
        200.0,
    )
    .await;

    assert_eq!(resolved.source, RateSource::Backend);
    assert!(resolved.context.advanced);
    assert!((resolved.context.single_rate - 100.0).abs() < 1e-6);
    assert_eq!(resolved.completion_times.map(|times| times.presentation), Some(10));
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_local_rates() {
    let endpoint = unreachable_endpoint().await;
    let rates = RatesClient::new(endpoint, "/api/custom".to_string(), Duration::from_millis(500))
        .expect("client builds");
    let local = RateContext::single(80.0);

    let resolved = effective_rates_or_local(Some(&rates), "p1", None, None, local, 200.0).await;

    assert_eq!(resolved.source, RateSource::Local);
    assert_eq!(resolved.context, local);
    assert!(resolved.completion_times.is_none());
}

#[tokio::test]
async fn missing_client_uses_local_rates() {
    let local = RateContext::single(75.0);
    let resolved = effective_rates_or_local(None, "p1", None, None, local, 200.0).await;
    assert_eq!(resolved.source, RateSource::Local);
    assert_eq!(resolved.context, local);
}

#[tokio::test]
async fn error_status_is_reported() {
    let (endpoint, _) = spawn_backend().await;
    let rates = RatesClient::new(endpoint, "/api/other".to_string(), Duration::from_secs(2))
        .expect("client builds");

    let err = rates
        .effective_rates("p1", None, None)
        .await
        .expect_err("route does not exist");
    assert!(err.contains("404"), "unexpected error: {}", err);
}

#[tokio::test]
async fn saves_plan_to_backend() {
    let (endpoint, captured) = spawn_backend().await;
    let rates = client(endpoint);
    let mut section = Section::new("Safety", vec![Lesson::new("Introduction to Safety")]);
    section.lessons[0].hours = Some(33.0);
    section.recompute_total_hours();
    let plan = TrainingPlan {
        sections: vec![section],
    };

    rates.save_plan("p1", &plan).await.expect("save succeeds");

    let bodies = captured.lock().expect("capture lock").clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["sections"][0]["title"], "Safety");
    assert_eq!(bodies[0]["sections"][0]["totalHours"], 33.0);
}

#[test]
fn config_reads_partial_toml() {
    let config = PlannerConfig::from_toml(
        r#"
[rates]
fallback_rate = 150.0

[completion]
quiz = 10

[backend]
endpoint = "https://planner.example.com"
"#,
    )
    .expect("config parses");

    assert!((config.rates.fallback_rate - 150.0).abs() < 1e-6);
    assert_eq!(config.completion.quiz, 10);
    assert_eq!(config.completion.presentation, 8);
    assert_eq!(config.autosave.debounce_ms, 2000);
    assert_eq!(config.backend.endpoint, "https://planner.example.com");
    assert_eq!(config.backend.api_prefix, "/api/custom");

    assert!(PlannerConfig::from_toml("[rates]\nfallback_rate = \"lots\"").is_err());
}

#[test]
fn config_write_round_trips() {
    let path = std::env::temp_dir()
        .join(format!("content-planner-{}", std::process::id()))
        .join("planner.toml");
    let mut config = PlannerConfig::default();
    config.autosave.debounce_ms = 750;
    config.completion.video_lesson = 12;

    config.write(&path).expect("config written");
    let contents = std::fs::read_to_string(&path).expect("config readable");
    let loaded = PlannerConfig::from_toml(&contents).expect("config parses");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.autosave.debounce_ms, 750);
    assert_eq!(loaded.completion.video_lesson, 12);
    assert!((loaded.rates.fallback_rate - 200.0).abs() < 1e-6);
}

#[test]
fn env_overrides_apply_after_file() {
    std::env::set_var("PLANNER_FALLBACK_RATE", "125");
    std::env::set_var("PLANNER_AUTOSAVE_MS", "not-a-number");
    std::env::set_var("PLANNER_BACKEND_ENDPOINT", "http://rates.internal:9000");

    let missing = std::env::temp_dir().join("content-planner-missing-config.toml");
    let (config, path) = PlannerConfig::load(Some(missing.clone())).expect("defaults load");

    std::env::remove_var("PLANNER_FALLBACK_RATE");
    std::env::remove_var("PLANNER_AUTOSAVE_MS");
    std::env::remove_var("PLANNER_BACKEND_ENDPOINT");

    assert_eq!(path, Some(missing));
    assert!((config.rates.fallback_rate - 125.0).abs() < 1e-6);
    assert_eq!(config.autosave.debounce_ms, 2000);
    assert_eq!(config.backend.endpoint, "http://rates.internal:9000");
}
