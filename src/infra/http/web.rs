//! Server-rendered book and author pages.

use axum::{
    Form, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        authors::AuthorServiceError, books::BookServiceError, error::HttpError,
        pagination::{MAX_PER_PAGE, PageRequest},
    },
    domain::{
        authors::NewAuthorInput, books::NewBookInput, validation::ValidationErrors,
    },
    presentation::views::{
        AuthorFormView, AuthorsPageView, AuthorsTemplate, BookFormView, BooksPageView,
        BooksTemplate, Notice, render_template_response,
    },
};

use super::{
    HttpState, RouterState,
    forms::{MultipartForm, read_multipart},
};

const SOURCE: &str = "infra::http::web";

pub(super) fn build_web_router() -> Router<RouterState> {
    Router::new()
        .route("/books", get(books_page).post(create_book))
        .route("/books/{id}/delete", post(delete_book))
        .route("/books/{id}/restore", post(restore_book))
        .route("/authors", get(authors_page).post(create_author))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoticeQuery {
    notice: Option<String>,
}

impl NoticeQuery {
    fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::from_code)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorForm {
    name: String,
    email: String,
    bio: String,
}

fn redirect_with(path: &str, notice: Notice) -> Response {
    Redirect::to(&format!("{path}?notice={}", notice.code())).into_response()
}

async fn books_page(State(state): State<HttpState>, Query(query): Query<NoticeQuery>) -> Response {
    match load_books_page(&state, BookFormView::default()).await {
        Ok(view) => render_template_response(
            BooksTemplate {
                view: view.with_notice(query.notice()),
            },
            StatusCode::OK,
        ),
        Err(err) => err.into_response(),
    }
}

async fn load_books_page(
    state: &HttpState,
    form: BookFormView,
) -> Result<BooksPageView, HttpError> {
    let books = state.books.list_books().await.map_err(book_to_http)?;
    let trashed = state
        .books
        .trashed(PageRequest::from_query(Some(1), Some(MAX_PER_PAGE)))
        .await
        .map_err(book_to_http)?;
    let authors = state.authors.list().await.map_err(author_to_http)?;
    Ok(BooksPageView::new(&books, &trashed.items, &authors, form))
}

async fn create_book(State(state): State<HttpState>, multipart: Multipart) -> Response {
    let form = match read_multipart(multipart, "image").await {
        Ok(form) => form,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid form submission",
                &err,
            )
            .into_response();
        }
    };

    let sticky = BookFormView {
        title: form.text("title").unwrap_or_default(),
        description: form.text("description").unwrap_or_default(),
        price: form.text("price").unwrap_or_default(),
        author_id: form.parsed::<i64>("author_id").ok().flatten(),
        featured: form.flag("featured"),
    };

    let result = match book_input(&form) {
        Ok(input) => state.books.store(input, form.image).await,
        Err(errors) => Err(BookServiceError::Validation(errors)),
    };

    match result {
        Ok(_) => redirect_with("/books", Notice::BookCreated),
        Err(BookServiceError::Validation(errors)) => {
            match load_books_page(&state, sticky).await {
                Ok(view) => render_template_response(
                    BooksTemplate {
                        view: view.with_errors(&errors),
                    },
                    StatusCode::UNPROCESSABLE_ENTITY,
                ),
                Err(err) => err.into_response(),
            }
        }
        Err(err) => book_to_http(err).into_response(),
    }
}

/// Fields that fail to parse are reported the same way validation failures are.
fn book_input(form: &MultipartForm) -> Result<NewBookInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let price = form.parsed::<f64>("price").unwrap_or_else(|_| {
        errors.add("price", "The price must be a number.");
        None
    });
    let author_id = form.parsed::<i64>("author_id").unwrap_or_else(|_| {
        errors.add("author_id", "The selected author id is invalid.");
        None
    });

    errors.finish(|| NewBookInput {
        title: form.text("title"),
        description: form.text("description"),
        price,
        author_id,
        featured: Some(form.flag("featured")),
    })
}

async fn delete_book(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.books.delete(id).await {
        Ok(true) => redirect_with("/books", Notice::BookDeleted),
        Ok(false) => book_not_found(id),
        Err(err) => book_to_http(err).into_response(),
    }
}

async fn restore_book(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.books.restore(id).await {
        Ok(true) => redirect_with("/books", Notice::BookRestored),
        Ok(false) => book_not_found(id),
        Err(err) => book_to_http(err).into_response(),
    }
}

fn book_not_found(id: i64) -> Response {
    HttpError::new(
        SOURCE,
        StatusCode::NOT_FOUND,
        "Book not found",
        format!("Book `{id}` does not exist"),
    )
    .into_response()
}

async fn authors_page(
    State(state): State<HttpState>,
    Query(query): Query<NoticeQuery>,
) -> Response {
    match state.authors.list().await {
        Ok(authors) => render_template_response(
            AuthorsTemplate {
                view: AuthorsPageView::new(&authors, AuthorFormView::default())
                    .with_notice(query.notice()),
            },
            StatusCode::OK,
        ),
        Err(err) => author_to_http(err).into_response(),
    }
}

async fn create_author(State(state): State<HttpState>, Form(form): Form<AuthorForm>) -> Response {
    let input = NewAuthorInput {
        name: Some(form.name.clone()),
        bio: Some(form.bio.clone()),
        email: Some(form.email.clone()),
    };

    match state.authors.create(input).await {
        Ok(_) => redirect_with("/authors", Notice::AuthorCreated),
        Err(AuthorServiceError::Validation(errors)) => match state.authors.list().await {
            Ok(authors) => {
                let sticky = AuthorFormView {
                    name: form.name,
                    email: form.email,
                    bio: form.bio,
                };
                render_template_response(
                    AuthorsTemplate {
                        view: AuthorsPageView::new(&authors, sticky).with_errors(&errors),
                    },
                    StatusCode::UNPROCESSABLE_ENTITY,
                )
            }
            Err(err) => author_to_http(err).into_response(),
        },
        Err(err) => author_to_http(err).into_response(),
    }
}

fn book_to_http(err: BookServiceError) -> HttpError {
    match err {
        BookServiceError::Catalog(err) => err.into(),
        BookServiceError::Authors(err) => err.into(),
        BookServiceError::Validation(errors) => HttpError::new(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "The given data was invalid.",
            errors.to_string(),
        ),
        BookServiceError::Storage(err) => {
            warn!(target = "bookshelf::http::web", error = %err, "image storage failed");
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded file",
                &err,
            )
        }
    }
}

fn author_to_http(err: AuthorServiceError) -> HttpError {
    match err {
        AuthorServiceError::Repo(err) => err.into(),
        AuthorServiceError::Validation(errors) => HttpError::new(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "The given data was invalid.",
            errors.to_string(),
        ),
    }
}
