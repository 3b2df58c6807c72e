pub mod api;
mod forms;
mod middleware;
mod public;
mod web;

pub use api::{ApiState, build_api_router};

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

use crate::application::authors::AuthorService;
use crate::application::books::BookService;
use crate::application::error::ErrorReport;
use crate::infra::db::PostgresRepositories;
use crate::infra::uploads::UploadStorage;

use self::middleware::{log_responses, set_request_context};

/// State for the HTML pages and static upload serving.
#[derive(Clone)]
pub struct HttpState {
    pub books: Arc<BookService>,
    pub authors: Arc<AuthorService>,
    pub upload_storage: Arc<UploadStorage>,
    /// Present only when running against Postgres.
    pub db: Option<PostgresRepositories>,
}

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Assemble every surface into one router with request logging applied.
pub fn build_router(state: RouterState, max_request_bytes: usize) -> Router {
    build_api_router()
        .merge(web::build_web_router())
        .merge(public::build_public_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
