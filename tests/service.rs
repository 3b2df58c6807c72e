use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;

use bookshelf::application::authors::{AuthorService, AuthorServiceError};
use bookshelf::application::books::{BookCatalog, BookService, BookServiceError};
use bookshelf::application::pagination::PageRequest;
use bookshelf::cache::{CacheConfig, build_cache};
use bookshelf::domain::authors::NewAuthorInput;
use bookshelf::domain::books::{BookPatchInput, NewBookInput};
use bookshelf::domain::uploads::ImageUpload;
use bookshelf::infra::memory::InMemoryRepositories;
use bookshelf::infra::uploads::UploadStorage;

struct Harness {
    _uploads: TempDir,
    storage: Arc<UploadStorage>,
    books: BookService,
    authors: AuthorService,
}

fn harness() -> Harness {
    let uploads = tempfile::tempdir().expect("tempdir");
    let storage = Arc::new(UploadStorage::new(uploads.path().to_path_buf()).expect("storage"));
    let repos = Arc::new(InMemoryRepositories::new());
    let catalog = Arc::new(BookCatalog::new(
        repos.clone(),
        repos.clone(),
        build_cache(&CacheConfig::default()),
        Duration::from_secs(60),
    ));

    Harness {
        books: BookService::new(catalog, repos.clone(), storage.clone()),
        authors: AuthorService::new(repos),
        storage,
        _uploads: uploads,
    }
}

fn cover(name: &str) -> ImageUpload {
    ImageUpload::new(
        name,
        Some("image/png".to_string()),
        Bytes::from_static(b"\x89PNG fake image"),
    )
}

fn stored(root: &Path, reference: &str) -> bool {
    root.join(reference).is_file()
}

async fn author(harness: &Harness, name: &str) -> i64 {
    harness
        .authors
        .create(NewAuthorInput {
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', ""))),
            bio: None,
        })
        .await
        .expect("author")
        .id
}

fn new_book(author_id: i64, title: &str, price: f64) -> NewBookInput {
    NewBookInput {
        title: Some(title.to_string()),
        price: Some(price),
        author_id: Some(author_id),
        ..Default::default()
    }
}

#[tokio::test]
async fn store_defaults_featured_and_rounds_the_price() {
    let h = harness();
    let author_id = author(&h, "Le Guin").await;

    let book = h
        .books
        .store(new_book(author_id, "The Dispossessed", 10.456), None)
        .await
        .expect("store");
    assert!(!book.book.featured);
    assert_eq!(book.book.price.cents(), 1046);
    assert!(book.book.image.is_none());
}

#[tokio::test]
async fn store_reports_every_invalid_field() {
    let h = harness();

    let err = h
        .books
        .store(
            NewBookInput {
                title: Some("   ".to_string()),
                price: Some(-1.0),
                ..Default::default()
            },
            None,
        )
        .await
        .expect_err("invalid input");
    let BookServiceError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.contains("title"));
    assert!(errors.contains("price"));
    assert!(errors.contains("author_id"));
}

#[tokio::test]
async fn unknown_authors_are_rejected() {
    let h = harness();

    let err = h
        .books
        .store(new_book(42, "Orphan", 5.0), None)
        .await
        .expect_err("unknown author");
    let BookServiceError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.contains("author_id"));
}

#[tokio::test]
async fn images_are_stored_replaced_and_removed() {
    let h = harness();
    let root = h.storage.root().to_path_buf();
    let author_id = author(&h, "Jemisin").await;

    let created = h
        .books
        .store(
            new_book(author_id, "The Fifth Season", 14.0),
            Some(cover("first.png")),
        )
        .await
        .expect("store");
    let first = created.book.image.clone().expect("image reference");
    assert!(first.starts_with("books/"));
    assert!(stored(&root, &first));

    let updated = h
        .books
        .update(
            created.book.id,
            BookPatchInput::default(),
            Some(cover("second.png")),
        )
        .await
        .expect("update");
    let second = updated.book.image.clone().expect("new reference");
    assert_ne!(first, second);
    assert!(!stored(&root, &first));
    assert!(stored(&root, &second));

    assert!(h.books.force_delete(created.book.id).await.expect("force delete"));
    assert!(!stored(&root, &second));
}

#[tokio::test]
async fn rejected_images_are_not_stored() {
    let h = harness();
    let author_id = author(&h, "Tiptree").await;

    let err = h
        .books
        .store(
            new_book(author_id, "Houston, Houston", 3.0),
            Some(ImageUpload::new(
                "notes.txt",
                Some("text/plain".to_string()),
                Bytes::from_static(b"plain text"),
            )),
        )
        .await
        .expect_err("bad image");
    let BookServiceError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.contains("image"));
    let entries = std::fs::read_dir(h.storage.root())
        .expect("read root")
        .count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn patches_leave_unspecified_fields_alone() {
    let h = harness();
    let author_id = author(&h, "Wolfe").await;
    let created = h
        .books
        .store(
            NewBookInput {
                description: Some("Severian's journey".to_string()),
                featured: Some(true),
                ..new_book(author_id, "Shadow of the Torturer", 9.0)
            },
            None,
        )
        .await
        .expect("store");

    let updated = h
        .books
        .update(
            created.book.id,
            BookPatchInput {
                price: Some(11.5),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("update");
    assert_eq!(updated.book.price.cents(), 1150);
    assert_eq!(updated.book.title, "Shadow of the Torturer");
    assert!(updated.book.featured);
    assert_eq!(
        updated.book.description.as_deref(),
        Some("Severian's journey")
    );

    let cleared = h
        .books
        .update(
            created.book.id,
            BookPatchInput {
                description: Some(None),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("clear description");
    assert!(cleared.book.description.is_none());
}

#[tokio::test]
async fn price_range_bounds_are_validated() {
    let h = harness();
    let page = PageRequest::default();

    let Err(BookServiceError::Validation(errors)) = h.books.by_price_range(-1.0, 5.0, page).await
    else {
        panic!("negative minimum should be rejected");
    };
    assert!(errors.contains("min"));

    let Err(BookServiceError::Validation(errors)) = h.books.by_price_range(9.0, 5.0, page).await
    else {
        panic!("inverted range should be rejected");
    };
    assert!(errors.contains("min"));

    let empty = h.books.by_price_range(0.0, 5.0, page).await.expect("range");
    assert_eq!(empty.total, 0);
}

#[tokio::test]
async fn authors_are_validated_and_listed_by_name() {
    let h = harness();
    author(&h, "Zelazny").await;
    author(&h, "Asimov").await;

    let names: Vec<String> = h
        .authors
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|author| author.name)
        .collect();
    assert_eq!(names, vec!["Asimov".to_string(), "Zelazny".to_string()]);

    let err = h
        .authors
        .create(NewAuthorInput {
            name: None,
            email: Some("not-an-address".to_string()),
            bio: None,
        })
        .await
        .expect_err("invalid author");
    let AuthorServiceError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.contains("name"));
    assert!(errors.contains("email"));
}
