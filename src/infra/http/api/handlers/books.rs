//! Books handlers

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bookshelf_api_types::{
    ApiSuccess, BookCreateRequest, BookUpdateRequest, BulkFeaturedRequest, BulkFeaturedResponse,
};

use crate::application::pagination::PageRequest;
use crate::domain::books::{BookPatchInput, NewBookInput};
use crate::domain::validation::ValidationErrors;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::page_response;
use crate::infra::http::api::state::ApiState;
use crate::infra::http::forms::read_multipart;

use super::{PageQuery, PriceRangeQuery, SearchQuery, YearQuery, book_to_api};

const IMAGE_FIELD: &str = "image";

pub async fn list_books(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let books = state.books.list_books().await.map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new("Books retrieved successfully", books)))
}

pub async fn paginate_books(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .books
        .paginated(query.request())
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Books retrieved successfully",
        page_response(page),
    )))
}

pub async fn search_books(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .books
        .search(
            &query.q,
            PageRequest::from_query(query.page, query.per_page),
        )
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Search results retrieved successfully",
        page_response(page),
    )))
}

pub async fn featured_books(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .books
        .featured(query.request())
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Featured books retrieved successfully",
        page_response(page),
    )))
}

pub async fn trashed_books(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .books
        .trashed(query.request())
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Trashed books retrieved successfully",
        page_response(page),
    )))
}

pub async fn books_by_price_range(
    State(state): State<ApiState>,
    Query(query): Query<PriceRangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = ValidationErrors::new();
    if query.min.is_none() {
        errors.add("min", "The min field is required.");
    }
    if query.max.is_none() {
        errors.add("max", "The max field is required.");
    }
    let (Some(min), Some(max)) = (query.min, query.max) else {
        return Err(ApiError::validation(errors));
    };

    let page = state
        .books
        .by_price_range(
            min,
            max,
            PageRequest::from_query(query.page, query.per_page),
        )
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Books retrieved successfully",
        page_response(page),
    )))
}

pub async fn book_statistics(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let statistics = state.books.statistics().await.map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Statistics retrieved successfully",
        statistics,
    )))
}

pub async fn books_by_month(
    State(state): State<ApiState>,
    Query(query): Query<YearQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let months = state
        .books
        .books_by_month(query.year)
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Monthly counts retrieved successfully",
        months,
    )))
}

pub async fn bulk_update_featured(
    State(state): State<ApiState>,
    Json(payload): Json<BulkFeaturedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let affected = state
        .books
        .bulk_update_featured(&payload.ids, payload.featured)
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new(
        "Books updated successfully",
        BulkFeaturedResponse { affected },
    )))
}

pub async fn get_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.books.get_book(id).await.map_err(book_to_api)?;
    match book {
        Some(book) => Ok(Json(ApiSuccess::new("Book retrieved successfully", book))),
        None => Err(ApiError::not_found("Book not found")),
    }
}

pub async fn create_book(
    State(state): State<ApiState>,
    Json(payload): Json<BookCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = NewBookInput {
        title: payload.title,
        description: payload.description,
        price: payload.price,
        author_id: payload.author_id,
        featured: payload.featured,
    };
    let book = state.books.store(input, None).await.map_err(book_to_api)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new("Book created successfully", book)),
    ))
}

pub async fn update_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = BookPatchInput {
        title: payload.title,
        description: payload.description,
        price: payload.price,
        author_id: payload.author_id,
        featured: payload.featured,
    };
    let book = state
        .books
        .update(id, input, None)
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new("Book updated successfully", book)))
}

pub async fn upload_book_image(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_multipart(multipart, IMAGE_FIELD)
        .await
        .map_err(|err| ApiError::bad_request("Invalid multipart payload", Some(err.to_string())))?;
    let Some(image) = form.image else {
        return Err(ApiError::validation(ValidationErrors::single(
            IMAGE_FIELD,
            "The image field is required.",
        )));
    };

    let book = state
        .books
        .update(id, BookPatchInput::default(), Some(image))
        .await
        .map_err(book_to_api)?;
    Ok(Json(ApiSuccess::new("Book updated successfully", book)))
}

pub async fn delete_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.books.delete(id).await.map_err(book_to_api)? {
        return Err(ApiError::not_found("Book not found"));
    }
    Ok(Json(ApiSuccess::new("Book deleted successfully", ())))
}

pub async fn restore_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.books.restore(id).await.map_err(book_to_api)? {
        return Err(ApiError::not_found("Book not found"));
    }
    Ok(Json(ApiSuccess::new("Book restored successfully", ())))
}

pub async fn force_delete_book(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.books.force_delete(id).await.map_err(book_to_api)? {
        return Err(ApiError::not_found("Book not found"));
    }
    Ok(Json(ApiSuccess::new("Book permanently deleted", ())))
}
