//! Book data-access layer: the single gateway for book reads and writes.
//!
//! Reads of the full listing, single books and statistics go through the
//! injected cache. Every write forgets the entries it could have changed
//! before returning, so the next read observes the write.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::application::pagination::{Page, PageRequest, PaginationError};
use crate::application::repos::{
    BookQueryFilter, BookScope, BooksRepo, BooksWriteRepo, CreateBookParams, PriceRange,
    RepoError, UpdateBookParams,
};
use crate::cache::{BookCacheKey, CacheStore, remember};
use crate::domain::books::month_name;
use crate::domain::entities::{BookStatistics, BookWithAuthor, MonthCount};
use crate::domain::types::{Price, cents_to_amount};

const LOG_TARGET: &str = "bookshelf::books";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book {id} not found")]
    NotFound { id: i64 },
    #[error("book {operation} failed")]
    PersistenceFailure { operation: &'static str },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Store(#[from] RepoError),
}

pub struct BookCatalog {
    reader: Arc<dyn BooksRepo>,
    writer: Arc<dyn BooksWriteRepo>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl BookCatalog {
    pub fn new(
        reader: Arc<dyn BooksRepo>,
        writer: Arc<dyn BooksWriteRepo>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            ttl,
        }
    }

    /// Every active book with its author, newest first.
    pub async fn all(&self) -> Result<Vec<BookWithAuthor>, CatalogError> {
        let filter = BookQueryFilter::default();
        remember(
            self.cache.as_ref(),
            &BookCacheKey::All.as_key(),
            self.ttl,
            || async { self.reader.list_books(&filter).await },
        )
        .await
        .map_err(CatalogError::from)
    }

    pub async fn paginate(&self, page: PageRequest) -> Result<Page<BookWithAuthor>, CatalogError> {
        self.page_of(BookQueryFilter::default(), page).await
    }

    pub async fn find(&self, id: i64) -> Result<Option<BookWithAuthor>, CatalogError> {
        remember(
            self.cache.as_ref(),
            &BookCacheKey::Book(id).as_key(),
            self.ttl,
            || async { self.reader.find_book(id, BookScope::Active).await },
        )
        .await
        .map_err(CatalogError::from)
    }

    pub async fn find_or_fail(&self, id: i64) -> Result<BookWithAuthor, CatalogError> {
        self.find(id).await?.ok_or(CatalogError::NotFound { id })
    }

    /// Look a book up regardless of soft deletion. Not cached.
    pub async fn find_with_trashed(
        &self,
        id: i64,
    ) -> Result<Option<BookWithAuthor>, CatalogError> {
        Ok(self.reader.find_book(id, BookScope::WithTrashed).await?)
    }

    pub async fn create(&self, params: CreateBookParams) -> Result<BookWithAuthor, CatalogError> {
        let fields = params.field_names();
        let record = self
            .writer
            .create_book(params)
            .await
            .map_err(|err| persistence_failure("creation", None, &fields, err))?;

        self.forget_aggregates();
        info!(
            target = LOG_TARGET,
            book_id = record.id,
            author_id = record.author_id,
            "book created"
        );

        self.reload(record.id).await
    }

    pub async fn update(
        &self,
        id: i64,
        params: UpdateBookParams,
    ) -> Result<BookWithAuthor, CatalogError> {
        self.find_or_fail(id).await?;

        let fields = params.field_names();
        let result = if params.is_empty() {
            Ok(())
        } else {
            self.writer.update_book(id, params).await.map(|_| ())
        };
        self.forget_book(id);
        match result {
            Ok(()) => {}
            Err(RepoError::NotFound) => return Err(CatalogError::NotFound { id }),
            Err(err) => return Err(persistence_failure("update", Some(id), &fields, err)),
        }

        info!(target = LOG_TARGET, book_id = id, fields = ?fields, "book updated");
        self.reload(id).await
    }

    /// Soft delete: the row stays in storage and can be restored.
    pub async fn delete(&self, id: i64) -> Result<bool, CatalogError> {
        self.find_or_fail(id).await?;

        let deleted = self
            .writer
            .soft_delete_book(id, OffsetDateTime::now_utc())
            .await
            .map_err(|err| persistence_failure("deletion", Some(id), &[], err))?;
        self.forget_book(id);

        info!(target = LOG_TARGET, book_id = id, deleted, "book soft-deleted");
        Ok(deleted)
    }

    pub async fn restore(&self, id: i64) -> Result<bool, CatalogError> {
        self.ensure_exists_with_trashed(id).await?;

        let restored = self
            .writer
            .restore_book(id)
            .await
            .map_err(|err| persistence_failure("restore", Some(id), &[], err))?;
        self.forget_book(id);

        info!(target = LOG_TARGET, book_id = id, restored, "book restored");
        Ok(restored)
    }

    /// Permanent removal, bypassing soft delete.
    pub async fn force_delete(&self, id: i64) -> Result<bool, CatalogError> {
        self.ensure_exists_with_trashed(id).await?;

        let removed = self
            .writer
            .force_delete_book(id)
            .await
            .map_err(|err| persistence_failure("permanent deletion", Some(id), &[], err))?;
        self.forget_book(id);

        info!(target = LOG_TARGET, book_id = id, removed, "book permanently deleted");
        Ok(removed)
    }

    pub async fn search(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, CatalogError> {
        let trimmed = query.trim();
        let filter = BookQueryFilter {
            search: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..Default::default()
        };
        self.page_of(filter, page).await
    }

    pub async fn find_by_author(
        &self,
        author_id: i64,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, CatalogError> {
        let filter = BookQueryFilter {
            author_id: Some(author_id),
            ..Default::default()
        };
        self.page_of(filter, page).await
    }

    pub async fn featured(&self, page: PageRequest) -> Result<Page<BookWithAuthor>, CatalogError> {
        let filter = BookQueryFilter {
            featured: Some(true),
            ..Default::default()
        };
        self.page_of(filter, page).await
    }

    /// Soft-deleted books only.
    pub async fn trashed(&self, page: PageRequest) -> Result<Page<BookWithAuthor>, CatalogError> {
        self.page_of(BookQueryFilter::scoped(BookScope::Trashed), page)
            .await
    }

    pub async fn by_price_range(
        &self,
        min: Price,
        max: Price,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, CatalogError> {
        if min > max {
            return Err(CatalogError::InvalidInput(format!(
                "minimum price {min} exceeds maximum price {max}"
            )));
        }
        let filter = BookQueryFilter {
            price: Some(PriceRange { min, max }),
            ..Default::default()
        };
        self.page_of(filter, page).await
    }

    /// Set the featured flag on every active book in `ids`. An empty or
    /// unmatched id set is a no-op returning zero.
    pub async fn bulk_update_featured(
        &self,
        ids: &[i64],
        featured: bool,
    ) -> Result<u64, CatalogError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let affected = self
            .writer
            .set_featured(&unique, featured)
            .await
            .map_err(|err| persistence_failure("bulk featured update", None, &["featured"], err))?;

        for id in &unique {
            self.cache.forget(&BookCacheKey::Book(*id).as_key());
        }
        self.forget_aggregates();

        info!(
            target = LOG_TARGET,
            requested = unique.len(),
            affected,
            featured,
            "featured flag updated"
        );
        Ok(affected)
    }

    pub async fn statistics(&self) -> Result<BookStatistics, CatalogError> {
        remember(
            self.cache.as_ref(),
            &BookCacheKey::Statistics.as_key(),
            self.ttl,
            || async {
                let aggregates = self.reader.book_aggregates().await?;
                Ok::<_, RepoError>(BookStatistics {
                    total_books: aggregates.total_books,
                    active_books: aggregates.active_books,
                    featured_books: aggregates.featured_books,
                    deleted_books: aggregates.deleted_books,
                    average_price: aggregates.average_price_cents.map_or(0.0, cents_to_amount),
                    min_price: aggregates.min_price.map_or(0.0, Price::amount),
                    max_price: aggregates.max_price.map_or(0.0, Price::amount),
                    total_authors: aggregates.total_authors,
                    latest_book: aggregates.latest_book,
                    oldest_book: aggregates.oldest_book,
                })
            },
        )
        .await
        .map_err(CatalogError::from)
    }

    /// Active books created per month of `year` (current UTC year when `None`).
    pub async fn books_by_month(&self, year: Option<i32>) -> Result<Vec<MonthCount>, CatalogError> {
        let year = year.unwrap_or_else(|| OffsetDateTime::now_utc().year());
        let mut counts = self.reader.count_books_by_month(year).await?;
        counts.retain(|entry| entry.count > 0);
        counts.sort_by_key(|entry| entry.month);

        counts
            .into_iter()
            .map(|entry| {
                let month = time::Month::try_from(entry.month).map_err(|_| {
                    CatalogError::Store(RepoError::Integrity {
                        message: format!("month {} out of range", entry.month),
                    })
                })?;
                Ok(MonthCount {
                    month: month_name(month),
                    count: entry.count,
                })
            })
            .collect()
    }

    async fn page_of(
        &self,
        filter: BookQueryFilter,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, CatalogError> {
        Ok(self.reader.paginate_books(&filter, page).await?)
    }

    async fn ensure_exists_with_trashed(&self, id: i64) -> Result<(), CatalogError> {
        match self.find_with_trashed(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::NotFound { id }),
        }
    }

    /// Fetch a freshly written book straight from the store.
    async fn reload(&self, id: i64) -> Result<BookWithAuthor, CatalogError> {
        self.reader
            .find_book(id, BookScope::Active)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    fn forget_book(&self, id: i64) {
        self.cache.forget(&BookCacheKey::Book(id).as_key());
        self.forget_aggregates();
    }

    fn forget_aggregates(&self) {
        for key in BookCacheKey::AGGREGATES {
            self.cache.forget(&key.as_key());
        }
        debug!(target = LOG_TARGET, "aggregate cache entries cleared");
    }
}

/// Log a failed write with its context and collapse it into a caller-safe error.
fn persistence_failure(
    operation: &'static str,
    book_id: Option<i64>,
    fields: &[&'static str],
    err: RepoError,
) -> CatalogError {
    error!(
        target = LOG_TARGET,
        operation,
        book_id,
        fields = ?fields,
        error = %err,
        "book write failed"
    );
    CatalogError::PersistenceFailure { operation }
}
