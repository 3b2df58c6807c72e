//! API handlers organized by resource type.
//!
//! Error conversion helpers shared by the resource modules live here.

mod authors;
mod books;

pub use authors::*;
pub use books::*;

use serde::Deserialize;
use tracing::error;

use crate::application::authors::AuthorServiceError;
use crate::application::books::{BookServiceError, CatalogError};
use crate::application::pagination::PageRequest;

use super::error::ApiError;

const LOG_TARGET: &str = "bookshelf::http::api";

// ----- Shared query structs -----

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PriceRangeQuery {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

// ----- Error conversion helpers -----

pub(crate) fn book_to_api(err: BookServiceError) -> ApiError {
    match err {
        BookServiceError::Validation(errors) => ApiError::validation(errors),
        BookServiceError::Catalog(err) => catalog_to_api(err),
        BookServiceError::Authors(err) => {
            error!(target = LOG_TARGET, error = %err, "author lookup failed");
            ApiError::internal(err.to_string())
        }
        BookServiceError::Storage(err) => {
            error!(target = LOG_TARGET, error = %err, "image storage failed");
            ApiError::internal(err.to_string())
        }
    }
}

pub(crate) fn catalog_to_api(err: CatalogError) -> ApiError {
    match err {
        CatalogError::NotFound { .. } => ApiError::not_found("Book not found"),
        CatalogError::InvalidInput(message) => {
            ApiError::bad_request("Invalid request", Some(message))
        }
        CatalogError::Pagination(err) => {
            ApiError::bad_request("Invalid pagination", Some(err.to_string()))
        }
        CatalogError::PersistenceFailure { operation } => {
            ApiError::internal(format!("book {operation} failed"))
        }
        CatalogError::Store(err) => {
            error!(target = LOG_TARGET, error = %err, "book store query failed");
            ApiError::internal(err.to_string())
        }
    }
}

pub(crate) fn author_to_api(err: AuthorServiceError) -> ApiError {
    match err {
        AuthorServiceError::Validation(errors) => ApiError::validation(errors),
        AuthorServiceError::Repo(err) => {
            error!(target = LOG_TARGET, error = %err, "author store query failed");
            ApiError::internal(err.to_string())
        }
    }
}
