//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::handlers;
use super::models::{ErrorBody, QuizRequest, VideoInfoRequest};
use crate::config::Config;
use crate::pipeline::{CoursePipeline, GenerationRequest};
use crate::progress::simulated_progress;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CoursePipeline>,
    pub config: Arc<Config>,
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // The frontend is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/transcribe/progress/:id", get(progress_handler))
        .route("/video-info", post(video_info_handler))
        .route("/generate-quiz", post(generate_quiz_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 API server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn internal_error(state: &AppState, message: &str, err: &dyn std::error::Error) -> Response {
    error!("{}: {}", message, err);
    let body = ErrorBody::new(message, err.to_string(), state.config.server.dev_mode);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Malformed bodies get the same JSON envelope as any other failure
fn invalid_body(state: &AppState, rejection: JsonRejection) -> Response {
    let details = rejection.body_text();
    warn!("Rejected request body: {}", details);
    let body = ErrorBody::new("Solicitud inválida", details, state.config.server.dev_mode);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check()))
}

/// Transcription-stage failures come back as 200 with `status: "error"`
async fn transcribe_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return invalid_body(&state, rejection),
    };

    match handlers::transcribe(&state.pipeline, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => internal_error(&state, "Error al procesar el video", &e),
    }
}

async fn video_info_handler(
    State(state): State<AppState>,
    payload: Result<Json<VideoInfoRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => (StatusCode::OK, Json(handlers::video_info(&request))).into_response(),
        Err(rejection) => invalid_body(&state, rejection),
    }
}

async fn generate_quiz_handler(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return invalid_body(&state, rejection),
    };

    match handlers::generate_quiz(&state.pipeline, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => internal_error(&state, "Error al generar el quiz", &e),
    }
}

/// Simulated SSE progress stream
async fn progress_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!("📡 Progress stream opened for {}", id);

    let tick = Duration::from_millis(state.config.server.progress_tick_ms);
    let stream = simulated_progress(id, tick, state.config.server.progress_step)
        .map(|update| Event::default().json_data(update));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
