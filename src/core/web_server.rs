//! HTTP transport for analysis and downloads.
//!
//! Routes are mounted at the root and again under `/api`:
//! - `POST /analyze`  - metadata summary
//! - `POST /download` - binary media body
//! - `GET  /health`   - tool availability

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::core::validation::{validate_media_url, ValidationError};
use crate::download::builder::{DownloadOptions, DownloadRequest};
use crate::download::error::DownloadError;
use crate::download::pipeline::MediaService;
use crate::download::ytdlp_errors::{classify_failure, Operation};

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    service: MediaService,
}

impl AppState {
    pub fn new(service: MediaService) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadBody {
    url: Option<String>,
    format: Option<String>,
    // Option so explicit nulls read as false.
    remove_watermark: Option<bool>,
    audio_only: Option<bool>,
}

/// Build the router. Kept separate from [`start_web_server`] so tests can
/// drive it in-process.
pub fn router(service: MediaService) -> Router {
    let routes = Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/download", post(download_handler))
        .route("/health", get(health_handler));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(service))
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn start_web_server(service: MediaService) -> anyhow::Result<()> {
    let addr = service.config().bind_addr;
    let app = router(service);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  POST /analyze   - Video metadata");
    log::info!("  POST /download  - Download media");
    log::info!("  GET  /health    - Health check");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn validation_response(err: &ValidationError) -> Response {
    let message = match err {
        ValidationError::MissingUrl => "URL is required",
        ValidationError::UnsupportedUrl(_) => "Invalid or unsupported URL",
    };
    log::warn!("Rejected request: {}", err);
    error_response(StatusCode::BAD_REQUEST, message)
}

fn rejection_response(rejection: &JsonRejection) -> Response {
    log::warn!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, "Invalid JSON body")
}

fn failure_response(err: &DownloadError, op: Operation) -> Response {
    let category = classify_failure(err);
    log::error!(
        "{:?} failed [{}/{}]: {}",
        op,
        err.subcategory(),
        category.as_str(),
        err
    );
    error_response(StatusCode::INTERNAL_SERVER_ERROR, category.user_message(op))
}

/// POST /analyze
async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };

    let media = match validate_media_url(body.url.as_deref().unwrap_or_default()) {
        Ok(media) => media,
        Err(e) => return validation_response(&e),
    };

    log::info!("Analyzing video: {}", media.as_str());
    match state.service.analyze(&media).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => failure_response(&e, Operation::Analyze),
    }
}

/// POST /download
async fn download_handler(
    State(state): State<AppState>,
    body: Result<Json<DownloadBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(&rejection),
    };

    let options = DownloadOptions {
        format: body.format.unwrap_or_default(),
        audio_only: body.audio_only.unwrap_or(false),
        remove_watermark: body.remove_watermark.unwrap_or(false),
    };
    let request = match DownloadRequest::new(body.url.as_deref().unwrap_or_default(), options) {
        Ok(request) => request,
        Err(e) => return validation_response(&e),
    };

    log::info!(
        "Download requested: {} (format={:?}, audio_only={}, remove_watermark={})",
        request.media.as_str(),
        request.options.format,
        request.options.audio_only,
        request.options.remove_watermark
    );

    // Detached so a client disconnect does not abort the download mid-way.
    let service = state.service.clone();
    let task = tokio::spawn(async move { service.download(&request).await });
    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(DownloadError::Task(e.to_string())),
    };

    match result {
        Ok(outcome) => {
            let payload = outcome.payload;
            (
                [
                    (header::CONTENT_TYPE, payload.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, payload.content_disposition()),
                    (header::CONTENT_LENGTH, payload.bytes.len().to_string()),
                ],
                payload.bytes,
            )
                .into_response()
        }
        Err(e) => failure_response(&e, Operation::Download),
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Response {
    match state.service.health().await {
        Ok(report) => Json(json!({
            "status": "ok",
            "message": "yt-dlp is available",
            "version": report.version,
            "ffmpeg": report.ffmpeg,
        }))
        .into_response(),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "yt-dlp not found",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
