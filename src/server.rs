use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::api::{
    ApiCompletionRequest, ApiCompletionResponse, ApiEditRequest, ApiEditResponse,
    ApiPlanRequest, ApiPlanResponse, ApiRecommendationRequest, ApiRecommendationResponse,
};
use content_planner::config::PlannerConfig;
use content_planner::planner::Planner;

#[derive(Clone)]
struct AppState {
    config: Arc<PlannerConfig>,
    planner: Arc<Planner>,
}

pub async fn serve(args: crate::ServeArgs, config: PlannerConfig) -> Result<(), String> {
    let app = router(config, &args.web_root);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind server: {}", err))?;
    info!(%addr, "content planner listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

fn router(config: PlannerConfig, web_root: &str) -> Router {
    let state = AppState {
        planner: Arc::new(Planner::from_config(&config)),
        config: Arc::new(config),
    };

    let index_path = format!("{}/index.html", web_root.trim_end_matches('/'));
    let static_service = ServeDir::new(web_root).not_found_service(ServeFile::new(index_path));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/recommendations", post(recommendations_handler))
        .route("/api/completion", post(completion_handler))
        .route("/api/plan/recompute", post(recompute_handler))
        .route("/api/plan/lesson", post(edit_handler))
        .nest_service("/", static_service)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn recommendations_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiRecommendationRequest>,
) -> Json<ApiRecommendationResponse> {
    let estimate = request.estimate(&state.config);
    Json(ApiRecommendationResponse::from_estimate(estimate))
}

async fn completion_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiCompletionRequest>,
) -> Json<ApiCompletionResponse> {
    Json(request.aggregate(&state.config))
}

async fn recompute_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiPlanRequest>,
) -> Json<ApiPlanResponse> {
    Json(request.recompute(&state.planner))
}

async fn edit_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiEditRequest>,
) -> Result<Json<ApiEditResponse>, (StatusCode, String)> {
    request
        .apply(&state.planner)
        .map(Json)
        .map_err(|err| (StatusCode::BAD_REQUEST, err))
}
