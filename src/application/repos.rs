//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{AuthorRecord, BookRecord, BookSummary, BookWithAuthor};
use crate::domain::types::Price;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which rows a book query may see with respect to soft deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookScope {
    #[default]
    Active,
    Trashed,
    WithTrashed,
}

impl BookScope {
    pub fn admits(self, deleted: bool) -> bool {
        match self {
            BookScope::Active => !deleted,
            BookScope::Trashed => deleted,
            BookScope::WithTrashed => true,
        }
    }
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

impl PriceRange {
    pub fn contains(&self, price: Price) -> bool {
        self.min <= price && price <= self.max
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookQueryFilter {
    pub scope: BookScope,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
    pub price: Option<PriceRange>,
    /// Case-insensitive substring over title, description and author name.
    pub search: Option<String>,
}

impl BookQueryFilter {
    pub fn scoped(scope: BookScope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBookParams {
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub image: Option<String>,
    pub author_id: i64,
    pub featured: bool,
}

impl CreateBookParams {
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = vec!["title", "price", "author_id", "featured"];
        if self.description.is_some() {
            fields.push("description");
        }
        if self.image.is_some() {
            fields.push("image");
        }
        fields
    }
}

/// Partial update; `None` leaves a column untouched. Nullable columns use a
/// nested option where `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateBookParams {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Price>,
    pub image: Option<Option<String>>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

impl UpdateBookParams {
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.price.is_some() {
            fields.push("price");
        }
        if self.image.is_some() {
            fields.push("image");
        }
        if self.author_id.is_some() {
            fields.push("author_id");
        }
        if self.featured.is_some() {
            fields.push("featured");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

/// Raw aggregate counters as produced by a store, before rounding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookAggregates {
    pub total_books: u64,
    pub active_books: u64,
    pub featured_books: u64,
    pub deleted_books: u64,
    pub average_price_cents: Option<f64>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub total_authors: u64,
    pub latest_book: Option<BookSummary>,
    pub oldest_book: Option<BookSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyBookCount {
    /// Calendar month, 1 through 12.
    pub month: u8,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub name: String,
    pub bio: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait BooksRepo: Send + Sync {
    /// Every book matching the filter, newest first.
    async fn list_books(&self, filter: &BookQueryFilter) -> Result<Vec<BookWithAuthor>, RepoError>;

    async fn paginate_books(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, RepoError>;

    async fn find_book(&self, id: i64, scope: BookScope)
    -> Result<Option<BookWithAuthor>, RepoError>;

    async fn book_aggregates(&self) -> Result<BookAggregates, RepoError>;

    /// Active books created in `year`, grouped by month; months without books are omitted.
    async fn count_books_by_month(&self, year: i32) -> Result<Vec<MonthlyBookCount>, RepoError>;
}

#[async_trait]
pub trait BooksWriteRepo: Send + Sync {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError>;

    /// Update an active book. Returns `RepoError::NotFound` when no active row matches.
    async fn update_book(&self, id: i64, params: UpdateBookParams)
    -> Result<BookRecord, RepoError>;

    async fn soft_delete_book(&self, id: i64, at: OffsetDateTime) -> Result<bool, RepoError>;

    async fn restore_book(&self, id: i64) -> Result<bool, RepoError>;

    async fn force_delete_book(&self, id: i64) -> Result<bool, RepoError>;

    /// Set the featured flag on every active book in `ids`, returning the affected count.
    async fn set_featured(&self, ids: &[i64], featured: bool) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    /// Active authors ordered by name.
    async fn list_authors(&self) -> Result<Vec<AuthorRecord>, RepoError>;

    async fn find_author(&self, id: i64) -> Result<Option<AuthorRecord>, RepoError>;

    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;
}
