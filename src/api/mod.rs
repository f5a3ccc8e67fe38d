//! HTTP API
//!
//! | Method | Path       | Purpose                                   |
//! |--------|------------|-------------------------------------------|
//! | GET    | `/`        | service information                       |
//! | GET    | `/health`  | liveness check                            |
//! | GET    | `/analyze` | `?query=user=<u>\|ip=<ip>\|ts=<iso8601>`  |
//! | POST   | `/analyze` | JSON `{"user", "ip", "ts"}`               |
//! | POST   | `/purge`   | delete all login history                  |
//! | GET    | `/stats`   | record and user counts                    |

pub mod responses;

pub use responses::ErrorResponse;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, Request, State,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::detection::ImpossibleTravelAnalyzer;
use crate::error::TravelError;
use crate::models::{AnalysisResult, HistoryStats, LoginQuery, PurgeResult};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ImpossibleTravelAnalyzer>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub query: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze", get(analyze_query).post(analyze_json))
        .route("/purge", axum::routing::post(purge))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Impossible Travel Detection API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze": "/analyze?query=user=email|ip=1.2.3.4|ts=2025-12-10T10:17:54",
            "purge": "/purge (POST)",
            "stats": "/stats",
            "health": "/health",
        },
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "impossible-travel-detection",
    }))
}

async fn analyze_query(
    State(state): State<AppState>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return TravelError::Validation(format!("Invalid query string: {}", rejection.body_text()))
                .into_response()
        }
    };
    let raw = match params.query {
        Some(raw) => raw,
        None => {
            return ErrorResponse::bad_request(
                "Missing query parameter. Expected format: user=email|ip=1.2.3.4|ts=2025-12-10T10:17:54",
            )
        }
    };
    log::info!("Received analyze request: {}", raw);

    match LoginQuery::parse(&raw) {
        Ok(query) => run_analysis(&state, query).await.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn analyze_json(
    State(state): State<AppState>,
    payload: Result<Json<LoginQuery>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(query)) => run_analysis(&state, query).await.into_response(),
        Err(rejection) => {
            TravelError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
                .into_response()
        }
    }
}

async fn run_analysis(
    state: &AppState,
    query: LoginQuery,
) -> Result<Json<AnalysisResult>, TravelError> {
    log::info!(
        "Analyzing login for user={}, ip={}, ts={}",
        query.user,
        query.ip,
        query.ts
    );
    let result = state
        .analyzer
        .analyze(&query.user, &query.ip, &query.ts)
        .await?;
    Ok(Json(result))
}

async fn purge(State(state): State<AppState>) -> Result<Json<PurgeResult>, TravelError> {
    log::warn!("Database purge requested");
    Ok(Json(state.analyzer.purge_all().await?))
}

async fn stats(State(state): State<AppState>) -> Result<Json<HistoryStats>, TravelError> {
    Ok(Json(state.analyzer.stats().await?))
}
