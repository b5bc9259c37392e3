use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::admin::{AdminFilters, AppliedWindow};
use super::domain::ApplicationId;
use super::exchange::{self, ExchangeFormat};
use super::query::ListParams;
use super::repository::{ApplicationRepository, RepositoryError};
use super::service::{ApplicationServiceError, JobApplicationService, Listing};
use super::validation::{ApplicationPayload, ValidationErrors};

pub const APPLICATIONS_PATH: &str = "/api/applications";

type SharedService<R> = State<Arc<JobApplicationService<R>>>;

/// Router builder exposing the CRUD, exchange and admin endpoints.
pub fn application_router<R>(service: Arc<JobApplicationService<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            APPLICATIONS_PATH,
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/applications/export", get(export_handler::<R>))
        .route(
            "/api/applications/import",
            axum::routing::post(import_handler::<R>),
        )
        .route(
            "/api/applications/:application_id",
            get(retrieve_handler::<R>)
                .put(replace_handler::<R>)
                .patch(patch_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route("/api/admin/applications", get(admin_handler::<R>))
        .with_state(service)
}

pub(crate) async fn list_handler<R>(
    State(service): SharedService<R>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed_request(rejection.body_text()),
    };

    match service.list_from_params(&params, APPLICATIONS_PATH) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<R>(
    State(service): SharedService<R>,
    payload: Result<Json<ApplicationPayload>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_request(rejection.body_text()),
    };

    match on_blocking_pool(service, move |service| service.create(payload)).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn retrieve_handler<R>(
    State(service): SharedService<R>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Some(id) = ApplicationId::parse(&application_id) else {
        return not_found();
    };

    match service.get(&id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn replace_handler<R>(
    State(service): SharedService<R>,
    Path(application_id): Path<String>,
    payload: Result<Json<ApplicationPayload>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Some(id) = ApplicationId::parse(&application_id) else {
        return not_found();
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_request(rejection.body_text()),
    };

    match on_blocking_pool(service, move |service| service.replace(&id, payload)).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn patch_handler<R>(
    State(service): SharedService<R>,
    Path(application_id): Path<String>,
    payload: Result<Json<ApplicationPayload>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Some(id) = ApplicationId::parse(&application_id) else {
        return not_found();
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_request(rejection.body_text()),
    };

    match on_blocking_pool(service, move |service| service.patch(&id, payload)).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): SharedService<R>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Some(id) = ApplicationId::parse(&application_id) else {
        return not_found();
    };

    match on_blocking_pool(service, move |service| service.delete(&id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportParams {
    #[serde(default)]
    format: Option<String>,
}

pub(crate) async fn export_handler<R>(
    State(service): SharedService<R>,
    params: Result<Query<ListParams>, QueryRejection>,
    export: Result<Query<ExportParams>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let (Query(mut params), Query(export)) = match (params, export) {
        (Ok(params), Ok(export)) => (params, export),
        (Err(rejection), _) | (_, Err(rejection)) => {
            return malformed_request(rejection.body_text())
        }
    };
    // Exports always cover every matching record.
    params.page = None;
    params.page_size = None;

    let format = match export.format.as_deref() {
        None | Some("") => ExchangeFormat::Json,
        Some(raw) => match raw.parse::<ExchangeFormat>() {
            Ok(format) => format,
            Err(err) => {
                return validation_response(ValidationErrors::single("format", err.to_string()))
            }
        },
    };

    let records = match service.list_from_params(&params, APPLICATIONS_PATH) {
        Ok(Listing::All(records)) => records,
        Ok(Listing::Page(page)) => page.results,
        Err(err) => return error_response(err),
    };

    let mut body = Vec::new();
    if let Err(err) = exchange::export(&records, format, &mut body) {
        tracing::error!(error = %err, "application export failed");
        return internal_error(err.to_string());
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        body,
    )
        .into_response()
}

pub(crate) async fn import_handler<R>(
    State(service): SharedService<R>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let format = match headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        None => ExchangeFormat::Json,
        Some(raw) => match raw
            .parse::<mime::Mime>()
            .ok()
            .as_ref()
            .and_then(ExchangeFormat::from_mime)
        {
            Some(format) => format,
            None => {
                let payload = json!({
                    "detail": format!("Unsupported media type \"{raw}\" in request."),
                });
                return (StatusCode::UNSUPPORTED_MEDIA_TYPE, Json(payload)).into_response();
            }
        },
    };

    let payloads = match exchange::import(format, body.as_ref()) {
        Ok(payloads) => payloads,
        Err(err) => return malformed_request(err.to_string()),
    };

    match on_blocking_pool(service, move |service| service.import(payloads)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdminParams {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    applied: Option<String>,
}

impl AdminParams {
    fn into_filters(self) -> Result<AdminFilters, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut filters = AdminFilters {
            search: self.search,
            ..AdminFilters::default()
        };

        if let Some(raw) = self.status.filter(|raw| !raw.trim().is_empty()) {
            match raw.trim().parse() {
                Ok(status) => filters.status = Some(status),
                Err(err) => errors.add("status", format!("{err}")),
            }
        }
        if let Some(raw) = self.priority.filter(|raw| !raw.trim().is_empty()) {
            match raw.trim().parse() {
                Ok(priority) => filters.priority = Some(priority),
                Err(err) => errors.add("priority", format!("{err}")),
            }
        }
        if let Some(raw) = self.applied {
            match raw.parse::<AppliedWindow>() {
                Ok(window) => filters.applied = window,
                Err(err) => errors.add("applied", err.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(filters)
        } else {
            Err(errors)
        }
    }
}

pub(crate) async fn admin_handler<R>(
    State(service): SharedService<R>,
    params: Result<Query<AdminParams>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed_request(rejection.body_text()),
    };
    let filters = match params.into_filters() {
        Ok(filters) => filters,
        Err(errors) => return validation_response(errors),
    };

    match service.admin_table(&filters) {
        Ok(table) => (StatusCode::OK, Json(table)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Runs a write on tokio's blocking pool. A snapshot-backed store writes its
/// file while holding the store lock.
async fn on_blocking_pool<R, T, F>(
    service: Arc<JobApplicationService<R>>,
    write: F,
) -> Result<T, ApplicationServiceError>
where
    R: ApplicationRepository + 'static,
    T: Send + 'static,
    F: FnOnce(&JobApplicationService<R>) -> Result<T, ApplicationServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || write(&service)).await {
        Ok(result) => result,
        Err(err) => Err(ApplicationServiceError::Repository(
            RepositoryError::Unavailable(format!("storage task failed: {err}")),
        )),
    }
}

pub(crate) fn error_response(err: ApplicationServiceError) -> Response {
    match err {
        ApplicationServiceError::Validation(errors) => validation_response(errors),
        ApplicationServiceError::InvalidPage(_) => {
            let payload = json!({ "detail": "Invalid page." });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        ApplicationServiceError::Repository(RepositoryError::NotFound) => not_found(),
        ApplicationServiceError::Repository(RepositoryError::Conflict) => {
            let payload = json!({
                "error": "application already exists",
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        ApplicationServiceError::Repository(other) => {
            tracing::error!(error = %other, "application repository failure");
            internal_error(other.to_string())
        }
    }
}

fn validation_response(errors: ValidationErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
}

fn malformed_request(message: String) -> Response {
    let payload = json!({ "non_field_errors": [message] });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn not_found() -> Response {
    let payload = json!({ "detail": "Not found." });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn internal_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
