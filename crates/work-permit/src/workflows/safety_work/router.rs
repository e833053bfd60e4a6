use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::domain::{ApplicationNumber, DeletionReport, Page};
use super::repository::SafetyWorkRepository;
use super::service::{DeleteOutcome, SafetyWorkError, SafetyWorkService};
use super::validation::FieldErrors;

const RETRY_LATER: &str = "the request could not be completed, please try again later";

/// Router builder exposing the intake, history and maintenance endpoints.
pub fn safety_work_router<R>(service: Arc<SafetyWorkService<R>>) -> Router
where
    R: SafetyWorkRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/safety-work/applications",
            post(submit_handler::<R>).get(history_handler::<R>),
        )
        .route(
            "/api/v1/safety-work/applications/:number",
            get(application_handler::<R>).delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/safety-work/applications/:number/prefill",
            get(prefill_handler::<R>),
        )
        .route(
            "/api/v1/safety-work/users/:phone/applications",
            delete(delete_for_user_handler::<R>),
        )
        .route("/api/v1/safety-work/users/lookup", post(lookup_handler::<R>))
        .route("/api/v1/safety-work/options", get(options_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    phone: String,
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LookupRequest {
    #[serde(default)]
    phone: String,
    name: Option<String>,
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(%rejection, "safety work submission body rejected");
            let mut errors = FieldErrors::new();
            errors.insert("form", "request body must be a JSON object");
            return error_response(SafetyWorkError::Validation(errors));
        }
    };

    match service.submit_form(body).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    let page = Page::new(query.limit, query.offset);
    match service.history(&query.phone, page).await {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Path(number): Path<String>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    match service.get(&ApplicationNumber(number)).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn prefill_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Path(number): Path<String>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    match service.prefill(&ApplicationNumber(number)).await {
        Ok(candidate) => (StatusCode::OK, Json(candidate)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Path(number): Path<String>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    let number = ApplicationNumber(number);
    match service.delete(&number).await {
        Ok(DeleteOutcome::Deleted(report)) => {
            (StatusCode::OK, Json(deletion_payload(true, report))).into_response()
        }
        Ok(DeleteOutcome::NotFound) => {
            let payload = json!({
                "deleted": false,
                "message": format!("application {number} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_for_user_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Path(phone): Path<String>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    match service.delete_for_user(&phone).await {
        Ok(report) => {
            let deleted = !report.is_empty();
            (StatusCode::OK, Json(deletion_payload(deleted, report))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lookup_handler<R>(
    State(service): State<Arc<SafetyWorkService<R>>>,
    Json(request): Json<LookupRequest>,
) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    match service
        .lookup_user(&request.phone, request.name.as_deref())
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn options_handler<R>(State(service): State<Arc<SafetyWorkService<R>>>) -> Response
where
    R: SafetyWorkRepository + 'static,
{
    (StatusCode::OK, Json(service.option_listing())).into_response()
}

fn deletion_payload(deleted: bool, report: DeletionReport) -> serde_json::Value {
    json!({
        "deleted": deleted,
        "applications": report.applications,
        "accompanyingPersons": report.accompanying_persons,
        "rowsRemoved": report.rows_removed(),
    })
}

/// Map service failures to status codes. Infrastructure detail stays in the logs.
pub(crate) fn error_response(error: SafetyWorkError) -> Response {
    match error {
        SafetyWorkError::Validation(errors) => {
            let payload = json!({
                "message": errors.summary(),
                "errors": errors,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        SafetyWorkError::NotFound(what) => {
            let payload = json!({
                "message": format!("{what} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        SafetyWorkError::Conflict => {
            let payload = json!({
                "message": RETRY_LATER,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        SafetyWorkError::Unavailable(detail) => {
            error!(detail = %detail, "safety work request failed: storage unavailable");
            let payload = json!({
                "message": RETRY_LATER,
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        SafetyWorkError::Internal(detail) => {
            error!(detail = %detail, "safety work request failed");
            let payload = json!({
                "message": RETRY_LATER,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
