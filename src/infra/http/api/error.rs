use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookshelf_api_types::ApiFailure;

use crate::application::error::{ErrorReport, INTERNAL_ERROR_MESSAGE};
use crate::domain::validation::ValidationErrors;

pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// JSON failure envelope with an attached diagnostic report.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    errors: BTreeMap<String, Vec<String>>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &'static str, detail: Option<String>) -> Self {
        Self {
            status,
            message,
            errors: BTreeMap::new(),
            detail,
        }
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        let detail = errors.to_string();
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: VALIDATION_MESSAGE,
            errors: errors.into_map(),
            detail: Some(detail),
        }
    }

    pub fn bad_request(message: &'static str, detail: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, detail)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, None)
    }

    /// A failure whose cause must stay out of the response body.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_MESSAGE,
            Some(detail.into()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .detail
            .clone()
            .unwrap_or_else(|| self.message.to_string());
        let body = ApiFailure::new(self.message, self.errors);
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http::api", self.status, detail).attach(&mut response);
        response
    }
}
