//! Authors handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bookshelf_api_types::{ApiSuccess, AuthorCreateRequest};

use crate::domain::authors::NewAuthorInput;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::page_response;
use crate::infra::http::api::state::ApiState;

use super::{PageQuery, author_to_api, book_to_api};

pub async fn list_authors(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let authors = state.authors.list().await.map_err(author_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Authors retrieved successfully",
        authors,
    )))
}

pub async fn create_author(
    State(state): State<ApiState>,
    Json(payload): Json<AuthorCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state
        .authors
        .create(NewAuthorInput {
            name: payload.name,
            bio: payload.bio,
            email: payload.email,
        })
        .await
        .map_err(author_to_api)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new("Author created successfully", author)),
    ))
}

pub async fn author_books(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state
        .authors
        .find(id)
        .await
        .map_err(author_to_api)?
        .is_none()
    {
        return Err(ApiError::not_found("Author not found"));
    }

    let page = state
        .books
        .books_by_author(id, query.request())
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Books retrieved successfully",
        page_response(page),
    )))
}
