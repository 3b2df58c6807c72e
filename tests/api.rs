use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use bookshelf::application::authors::AuthorService;
use bookshelf::application::books::{BookCatalog, BookService};
use bookshelf::cache::{CacheConfig, build_cache};
use bookshelf::infra::http::{ApiState, HttpState, RouterState, build_router};
use bookshelf::infra::memory::InMemoryRepositories;
use bookshelf::infra::uploads::UploadStorage;

const BODY_LIMIT: usize = 4 * 1024 * 1024;

fn app() -> (Router, TempDir) {
    let uploads = tempfile::tempdir().expect("tempdir");
    let storage = Arc::new(UploadStorage::new(uploads.path().to_path_buf()).expect("storage"));
    let repos = Arc::new(InMemoryRepositories::new());
    let catalog = Arc::new(BookCatalog::new(
        repos.clone(),
        repos.clone(),
        build_cache(&CacheConfig::default()),
        Duration::from_secs(60),
    ));
    let books = Arc::new(BookService::new(catalog, repos.clone(), storage.clone()));
    let authors = Arc::new(AuthorService::new(repos));

    let state = RouterState {
        http: HttpState {
            books: books.clone(),
            authors: authors.clone(),
            upload_storage: storage,
            db: None,
        },
        api: ApiState { books, authors },
    };
    (build_router(state, BODY_LIMIT), uploads)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_author(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Author created successfully");
    body["data"]["id"].as_i64().expect("author id")
}

async fn create_book(app: &Router, author_id: i64, title: &str, price: f64) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": title, "price": price, "author_id": author_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().expect("book id")
}

#[tokio::test]
async fn book_lifecycle_end_to_end() {
    let (app, _uploads) = app();
    let author_id = create_author(&app, "A").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "T", "price": 9.99, "author_id": author_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Book created successfully");
    assert_eq!(body["data"]["title"], "T");
    assert_eq!(body["data"]["price"], 9.99);
    assert_eq!(body["data"]["featured"], false);
    assert_eq!(body["data"]["author"]["name"], "A");
    let id = body["data"]["id"].as_i64().expect("id");

    let (status, body) = send(&app, Method::GET, &format!("/api/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book retrieved successfully");

    let (status, body) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Books retrieved successfully");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, Method::DELETE, &format!("/api/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book deleted successfully");

    let (status, body) = send(&app, Method::GET, &format!("/api/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Book not found");

    let (_, body) = send(&app, Method::GET, "/api/books/trashed", None).await;
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/books/{id}/restore"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book restored successfully");

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/books/{id}/force"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book permanently deleted");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/books/{id}/restore"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_books_return_field_errors() {
    let (app, _uploads) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "", "price": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "The given data was invalid.");
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["price"].is_array());
    assert!(body["errors"]["author_id"].is_array());
}

#[tokio::test]
async fn updates_apply_partial_changes() {
    let (app, _uploads) = app();
    let author_id = create_author(&app, "Gibson").await;
    let id = create_book(&app, author_id, "Neuromancer", 12.0).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/books/{id}"),
        Some(json!({ "featured": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");
    assert_eq!(body["data"]["title"], "Neuromancer");
    assert_eq!(body["data"]["featured"], true);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/books/999",
        Some(json!({ "title": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_paginate_and_filter() {
    let (app, _uploads) = app();
    let author_id = create_author(&app, "Herbert").await;
    for (title, price) in [("Dune", 10.0), ("Dune Messiah", 20.0), ("Children of Dune", 30.0)] {
        create_book(&app, author_id, title, price).await;
    }

    let (status, body) = send(&app, Method::GET, "/api/books/page?per_page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["per_page"], 2);
    assert_eq!(body["data"]["current_page"], 1);
    assert_eq!(body["data"]["last_page"], 2);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));

    let (_, body) = send(&app, Method::GET, "/api/books/search?q=messiah", None).await;
    assert_eq!(body["message"], "Search results retrieved successfully");
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/books/price-range?min=15&max=30",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);

    let (status, body) = send(&app, Method::GET, "/api/books/price-range?min=15", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["max"].is_array());

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/authors/{author_id}/books"),
        None,
    )
    .await;
    assert_eq!(body["data"]["total"], 3);

    let (status, body) = send(&app, Method::GET, "/api/authors/999/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Author not found");
}

#[tokio::test]
async fn statistics_and_bulk_featured() {
    let (app, _uploads) = app();
    let author_id = create_author(&app, "Banks").await;
    let a = create_book(&app, author_id, "Excession", 10.0).await;
    let b = create_book(&app, author_id, "Look to Windward", 20.0).await;
    create_book(&app, author_id, "Matter", 30.0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books/featured",
        Some(json!({ "ids": [a, b], "featured": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["affected"], 2);

    let (_, body) = send(&app, Method::GET, "/api/books/featured", None).await;
    assert_eq!(body["data"]["total"], 2);

    let (status, body) = send(&app, Method::GET, "/api/books/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active_books"], 3);
    assert_eq!(body["data"]["featured_books"], 2);
    assert_eq!(body["data"]["average_price"], 20.0);
    assert_eq!(body["data"]["min_price"], 10.0);
    assert_eq!(body["data"]["max_price"], 30.0);

    let (status, body) = send(&app, Method::GET, "/api/books/by-month?year=1999", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn html_pages_render_and_redirect() {
    let (app, _uploads) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/authors")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=Ursula&email=ursula%40example.com&bio="))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("location"),
        "/authors?notice=author-created"
    );

    let boundary = "bookshelf-test-boundary";
    let multipart = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         The Lathe of Heaven\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"price\"\r\n\r\n\
         12.5\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"author_id\"\r\n\r\n\
         1\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         \r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/books")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let request = Request::builder()
        .uri("/books?notice=book-created")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let html = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(html.contains("Book created successfully"));
    assert!(html.contains("The Lathe of Heaven"));
    assert!(html.contains("$12.50"));
    assert!(html.contains("Ursula"));
}

#[tokio::test]
async fn html_validation_failures_re_render_with_errors() {
    let (app, _uploads) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/authors")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=&email=nope&bio="))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let html = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(html.contains("The name field is required."));
}

#[tokio::test]
async fn health_and_missing_uploads() {
    let (app, _uploads) = app();

    let (status, _) = send(&app, Method::GET, "/_health/db", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/uploads/books/missing.png", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
