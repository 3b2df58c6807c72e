//! Store tests against a real PostgreSQL database.
//!
//! - Each test gets a fresh database with the embedded migrations applied.
//! - Marked `#[ignore]` because they need `DATABASE_URL`; run with
//!   `cargo test --test postgres -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use time::macros::datetime;

use bookshelf::application::books::{BookCatalog, CatalogError};
use bookshelf::application::pagination::PageRequest;
use bookshelf::application::repos::{
    AuthorsRepo, BookQueryFilter, BookScope, BooksRepo, BooksWriteRepo, CreateAuthorParams,
    CreateBookParams, UpdateBookParams,
};
use bookshelf::cache::{CacheConfig, MemoryCache};
use bookshelf::domain::types::Price;
use bookshelf::infra::db::PostgresRepositories;

async fn seed_author(repos: &PostgresRepositories, name: &str) -> i64 {
    repos
        .create_author(CreateAuthorParams {
            name: name.to_string(),
            bio: Some("Writes things.".to_string()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
        })
        .await
        .expect("create author")
        .id
}

fn params(author_id: i64, title: &str, cents: i64) -> CreateBookParams {
    CreateBookParams {
        title: title.to_string(),
        description: Some(format!("About {title}")),
        price: Price::from_cents(cents).expect("price"),
        image: None,
        author_id,
        featured: false,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn books_round_trip_with_author_projection(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author_id = seed_author(&repos, "Lem").await;

    let created = repos
        .create_book(params(author_id, "Solaris", 1999))
        .await
        .expect("create book");
    assert_eq!(created.price.cents(), 1999);
    assert!(!created.deletion.is_deleted());

    let found = repos
        .find_book(created.id, BookScope::Active)
        .await
        .expect("find book")
        .expect("book exists");
    assert_eq!(found.book.title, "Solaris");
    assert_eq!(
        found.author.as_ref().map(|author| author.name.as_str()),
        Some("Lem")
    );

    let updated = repos
        .update_book(
            created.id,
            UpdateBookParams {
                description: Some(None),
                featured: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update book");
    assert!(updated.description.is_none());
    assert!(updated.featured);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn soft_delete_scopes_and_restore(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author_id = seed_author(&repos, "Strugatsky").await;
    let book = repos
        .create_book(params(author_id, "Roadside Picnic", 1000))
        .await
        .expect("create book");

    assert!(
        repos
            .soft_delete_book(book.id, datetime!(2024-05-01 00:00 UTC))
            .await
            .expect("soft delete")
    );
    assert!(
        repos
            .find_book(book.id, BookScope::Active)
            .await
            .expect("find")
            .is_none()
    );
    let trashed = repos
        .paginate_books(
            &BookQueryFilter::scoped(BookScope::Trashed),
            PageRequest::default(),
        )
        .await
        .expect("trashed");
    assert_eq!(trashed.total, 1);

    assert!(repos.restore_book(book.id).await.expect("restore"));
    assert!(repos.force_delete_book(book.id).await.expect("force delete"));
    assert!(!repos.restore_book(book.id).await.expect("restore missing"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn aggregates_and_search_match_the_memory_store(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let author_id = seed_author(&repos, "Vonnegut").await;
    let catalog = BookCatalog::new(
        repos.clone(),
        repos.clone(),
        Arc::new(MemoryCache::new(&CacheConfig::default())),
        Duration::from_secs(60),
    );

    let mut ids = Vec::new();
    for (title, cents) in [("Ten", 1000), ("Twenty", 2000), ("Thirty", 3000)] {
        ids.push(
            catalog
                .create(params(author_id, title, cents))
                .await
                .expect("create")
                .book
                .id,
        );
    }

    let statistics = catalog.statistics().await.expect("statistics");
    assert_eq!(statistics.average_price, 20.0);
    assert_eq!(statistics.min_price, 10.0);
    assert_eq!(statistics.max_price, 30.0);
    assert_eq!(statistics.active_books, 3);
    assert_eq!(statistics.total_authors, 1);

    let found = catalog
        .search("VONNEGUT", PageRequest::default())
        .await
        .expect("search");
    assert_eq!(found.total, 3);

    assert_eq!(
        catalog
            .bulk_update_featured(&ids[..2], true)
            .await
            .expect("bulk featured"),
        2
    );
    assert!(matches!(
        catalog.restore(9_999).await,
        Err(CatalogError::NotFound { id: 9_999 })
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn search_treats_like_wildcards_as_plain_text(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let author_id = seed_author(&repos, "Borges").await;
    let catalog = BookCatalog::new(
        repos.clone(),
        repos.clone(),
        Arc::new(MemoryCache::new(&CacheConfig::default())),
        Duration::from_secs(60),
    );
    for title in ["Plain Title", "100% Pure"] {
        catalog
            .create(CreateBookParams {
                description: None,
                ..params(author_id, title, 500)
            })
            .await
            .expect("create");
    }

    let percent = catalog
        .search("%", PageRequest::default())
        .await
        .expect("search percent");
    assert_eq!(percent.total, 1);
    assert_eq!(percent.items[0].book.title, "100% Pure");

    let underscore = catalog
        .search("_", PageRequest::default())
        .await
        .expect("search underscore");
    assert_eq!(underscore.total, 0);
}
