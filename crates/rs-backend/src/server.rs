//! HTTP surface.
//!
//! Handlers are thin: they decode the body, hand the blocking storage work to
//! the runtime's blocking pool and map [`Error`] kinds onto status codes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::record::{StoryCreate, StoryRecord, SurveySubmission};
use crate::report::SurveyReport;
use crate::service::{Ack, SurveyService};
use crate::storage::Storage;

/// Response header echoing the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    service: SurveyService,
    app_name: Arc<str>,
}

impl AppState {
    /// Build state over an initialized storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, app_name: &str) -> Self {
        Self {
            service: SurveyService::new(storage),
            app_name: Arc::from(app_name),
        }
    }
}

/// Error response: a status and a JSON body with `detail` and `kind`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

/// HTTP status used for each error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::StoragePermissionDenied | ErrorKind::StorageNotFound => StatusCode::BAD_GATEWAY,
        ErrorKind::ConfigurationInvalid | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        Self {
            status: status_for(kind),
            body: json!({ "detail": err.to_string(), "kind": kind.as_str() }),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: json!({ "detail": rejection.body_text(), "kind": "validation_error" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Run a service call on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, call: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SurveyService) -> Result<T> + Send + 'static,
{
    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?;
    outcome.map_err(|e| {
        warn!(kind = %e.kind(), "Request failed: {e}");
        ApiError::from(e)
    })
}

async fn submit_survey(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SurveySubmission>, JsonRejection>,
) -> ApiResult<Ack> {
    let Json(submission) = payload?;
    let ack = run_blocking(&state, move |service| service.submit_survey(submission)).await?;
    Ok(Json(ack))
}

async fn survey_report(State(state): State<AppState>) -> ApiResult<SurveyReport> {
    let report = run_blocking(&state, SurveyService::get_survey_report).await?;
    Ok(Json(report))
}

async fn submit_story(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StoryCreate>, JsonRejection>,
) -> ApiResult<StoryRecord> {
    let Json(story) = payload?;
    let record = run_blocking(&state, move |service| service.submit_story(story)).await?;
    Ok(Json(record))
}

async fn list_stories(State(state): State<AppState>) -> ApiResult<Vec<StoryRecord>> {
    let stories = run_blocking(&state, SurveyService::list_stories).await?;
    Ok(Json(stories))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "app_name": &*state.app_name,
        "backend": state.service.storage().name(),
    }))
}

/// Wrap each request in a span carrying a fresh request id.
async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let started = Instant::now();
        let mut response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Handled request"
        );
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/survey/", post(submit_survey))
        .route("/survey", post(submit_survey))
        .route("/survey/reports", get(survey_report))
        .route("/stories/", get(list_stories).post(submit_story))
        .route("/stories", get(list_stories).post(submit_story))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound, or the
/// server fails.
pub async fn serve(config: &Config, storage: Arc<dyn Storage>) -> Result<()> {
    let addr = config.bind_addr()?;
    let backend = storage.name();
    let app = build_router(AppState::new(storage, &config.app_name));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "{} listening on http://{} ({backend} storage)",
        config.app_name,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{self, Method};
    use tower::ServiceExt;

    use super::*;
    use crate::storage::sheets::memory::MemorySheetsApi;
    use crate::storage::{CsvStorage, SheetsStorage};

    fn csv_app() -> (tempfile::TempDir, Router) {
        crate::logging::init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let storage = CsvStorage::initialize(dir.path()).unwrap();
        (dir, build_router(AppState::new(Arc::new(storage), "Test")))
    }

    fn sheets_app() -> (MemorySheetsApi, Router) {
        crate::logging::init_test_logging();
        let api = MemorySheetsApi::new("s");
        let storage = SheetsStorage::initialize(api.clone(), "s").unwrap();
        (api, build_router(AppState::new(Arc::new(storage), "Test")))
    }

    fn post_json(uri: &str, body: &Value) -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_status_table() {
        assert_eq!(
            status_for(ErrorKind::StorageUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(ErrorKind::StoragePermissionDenied),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(ErrorKind::StorageNotFound), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(ErrorKind::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_submit_survey_then_report() {
        let (_dir, app) = csv_app();

        let (status, ack) = send(
            &app,
            post_json(
                "/survey/",
                &json!({"q_set_goal": "yes", "q_made_progress": "no", "organization": "relief society"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            ack,
            json!({"message": "Survey submitted successfully", "status": "ok"})
        );

        let (status, report) = send(&app, get("/survey/reports")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["total_responses"], 1);
        assert_eq!(report["organization_breakdown"]["relief society"], 1);
        assert_eq!(report["question_stats"]["q_set_goal"], json!({"yes": 1, "no": 0}));
        assert_eq!(
            report["question_stats"]["q_made_progress"],
            json!({"yes": 0, "no": 1})
        );
    }

    #[tokio::test]
    async fn test_empty_report() {
        let (_dir, app) = csv_app();
        let (status, report) = send(&app, get("/survey/reports")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            report,
            json!({
                "total_responses": 0,
                "organization_breakdown": {},
                "question_stats": {},
                "question_stats_by_org": {}
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_survey_is_rejected() {
        let (dir, app) = csv_app();

        for body in [
            json!({"q_set_goal": "maybe", "q_made_progress": "no", "organization": "relief society"}),
            json!({"q_set_goal": "yes", "q_made_progress": "no", "organization": "primary"}),
            json!({"q_set_goal": "yes", "organization": "relief society"}),
        ] {
            let (status, error) = send(&app, post_json("/survey/", &body)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
            assert!(error["detail"].is_string());
        }

        let storage = CsvStorage::initialize(dir.path()).unwrap();
        assert!(storage.read_all_surveys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stories_round_trip_with_and_without_slash() {
        let (_dir, app) = csv_app();

        let (status, story) = send(&app, post_json("/stories/", &json!({"content": ""}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(story["content"], "");
        assert_eq!(
            story["datetime_submitted"].as_str().unwrap().len(),
            crate::record::TIMESTAMP_LEN
        );

        let (status, _) = send(&app, post_json("/stories", &json!({"content": "second"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, stories) = send(&app, get("/stories")).await;
        assert_eq!(status, StatusCode::OK);
        let contents: Vec<&str> = stories
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, ["", "second"]);
    }

    #[tokio::test]
    async fn test_storage_errors_map_to_status() {
        let (api, app) = sheets_app();

        for (injected, expected, kind) in [
            (503, StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
            (403, StatusCode::BAD_GATEWAY, "storage_permission_denied"),
            (404, StatusCode::BAD_GATEWAY, "storage_not_found"),
        ] {
            api.fail_with(injected);
            let (status, error) = send(&app, get("/stories/")).await;
            assert_eq!(status, expected);
            assert_eq!(error["kind"], kind);
            assert!(error["detail"].as_str().unwrap().contains("injected"));
        }

        api.clear_failure();
        let (status, _) = send(&app, get("/stories/")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_survey_write_is_reported() {
        let (api, app) = sheets_app();
        api.fail_with(500);

        let (status, error) = send(
            &app,
            post_json(
                "/survey",
                &json!({"q_set_goal": "no", "q_made_progress": "no", "organization": "young mens"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error["kind"], "storage_unavailable");
    }

    #[tokio::test]
    async fn test_healthz_and_request_id() {
        let (_dir, app) = csv_app();

        let res = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let request_id = res.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let health: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health, json!({"status": "ok", "app_name": "Test", "backend": "csv"}));
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let (_dir, app) = csv_app();
        let res = app
            .oneshot(
                http::Request::builder()
                    .method(Method::GET)
                    .uri("/survey/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
