//! # API REST
//!
//! REST API implementation for QuickCode.
//!
//! Handles:
//! - HTTP endpoints with axum (`POST /api/analyze`, `GET /health`)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status mapping, CORS)
//!
//! Review sessions live with the front end; this crate only exposes the extraction gateway.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    AnalyzeReq, AnalyzeRes, CodeRes, ErrorRes, HealthRes, HealthService, ANALYSIS_FAILED_ERROR,
    NOTE_REQUIRED_ERROR,
};
use quickcode_core::{AnalysisResult, ExtractionError, ExtractionGateway};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    gateway: ExtractionGateway,
}

impl AppState {
    pub fn new(gateway: ExtractionGateway) -> Self {
        Self { gateway }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, analyze),
    components(schemas(HealthRes, AnalyzeReq, AnalyzeRes, CodeRes, ErrorRes))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Build the full REST router, including Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeReq,
    responses(
        (status = 200, description = "Suggested codes and visit summary", body = AnalyzeRes),
        (status = 400, description = "Note missing or blank", body = ErrorRes),
        (status = 500, description = "Provider failure or unusable model output", body = ErrorRes)
    )
)]
/// Analyse a clinical note into suggested billing codes.
///
/// Provider outages and malformed model output both map to `500` with the same message; the
/// distinction is kept in the logs.
///
/// # Errors
/// - `400 Bad Request` if the body is not JSON, lacks a string `note`, or the note is blank.
/// - `500 Internal Server Error` on any downstream failure.
#[axum::debug_handler]
async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<AnalyzeRes>, ApiError> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::warn!("Rejected analyze body: {rejection}");
            return Err(bad_request());
        }
    };

    match state.gateway.analyze(&req.note).await {
        Ok(result) => Ok(Json(analysis_to_wire(&result))),
        Err(ExtractionError::InvalidInput(_)) => Err(bad_request()),
        Err(e) => {
            tracing::error!("Analyze error: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorRes::new(ANALYSIS_FAILED_ERROR)),
            ))
        }
    }
}

fn bad_request() -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorRes::new(NOTE_REQUIRED_ERROR)),
    )
}

fn analysis_to_wire(result: &AnalysisResult) -> AnalyzeRes {
    AnalyzeRes {
        summary: result.summary().to_string(),
        codes: result
            .codes()
            .iter()
            .map(|c| CodeRes {
                code: c.code.clone(),
                code_type: c.code_type.label().to_string(),
                description: c.description.clone(),
                confidence: c.confidence,
            })
            .collect(),
    }
}
