pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::infra::http::RouterState;

pub fn build_api_router() -> Router<RouterState> {
    Router::new()
        .route(
            "/api/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route("/api/books/page", get(handlers::paginate_books))
        .route("/api/books/search", get(handlers::search_books))
        .route(
            "/api/books/featured",
            get(handlers::featured_books).post(handlers::bulk_update_featured),
        )
        .route("/api/books/trashed", get(handlers::trashed_books))
        .route("/api/books/price-range", get(handlers::books_by_price_range))
        .route("/api/books/statistics", get(handlers::book_statistics))
        .route("/api/books/by-month", get(handlers::books_by_month))
        .route(
            "/api/books/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/api/books/{id}/restore", post(handlers::restore_book))
        .route("/api/books/{id}/force", delete(handlers::force_delete_book))
        .route("/api/books/{id}/image", post(handlers::upload_book_image))
        .route(
            "/api/authors",
            get(handlers::list_authors).post(handlers::create_author),
        )
        .route("/api/authors/{id}/books", get(handlers::author_books))
}
