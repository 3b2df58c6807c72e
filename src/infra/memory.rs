//! Process-local repositories used when no database is configured, and by tests.
//!
//! Rows live behind one `RwLock`; every query clones out of it so no guard is
//! held across an await point.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::pagination::{Page, PageRequest, paginate_slice};
use crate::application::repos::{
    AuthorsRepo, BookAggregates, BookQueryFilter, BookScope, BooksRepo, BooksWriteRepo,
    CreateAuthorParams, CreateBookParams, MonthlyBookCount, RepoError, UpdateBookParams,
};
use crate::domain::entities::{AuthorRecord, BookRecord, BookSummary, BookWithAuthor};
use crate::domain::types::DeletionState;
use crate::cache::lock::{rw_read, rw_write};

const LOCK_TARGET: &str = "bookshelf::infra::memory";

#[derive(Default)]
struct MemoryState {
    authors: BTreeMap<i64, AuthorRecord>,
    books: BTreeMap<i64, BookRecord>,
    next_author_id: i64,
    next_book_id: i64,
    clock: Option<OffsetDateTime>,
}

impl MemoryState {
    fn now(&self) -> OffsetDateTime {
        self.clock.unwrap_or_else(OffsetDateTime::now_utc)
    }

    fn active_author(&self, id: i64) -> Option<&AuthorRecord> {
        self.authors
            .get(&id)
            .filter(|author| !author.deletion.is_deleted())
    }

    fn with_author(&self, book: &BookRecord) -> BookWithAuthor {
        BookWithAuthor {
            book: book.clone(),
            author: self.active_author(book.author_id).map(AuthorRecord::summary),
        }
    }

    fn matches(&self, book: &BookRecord, filter: &BookQueryFilter) -> bool {
        if !filter.scope.admits(book.deletion.is_deleted()) {
            return false;
        }
        if filter.author_id.is_some_and(|id| id != book.author_id) {
            return false;
        }
        if filter.featured.is_some_and(|featured| featured != book.featured) {
            return false;
        }
        if filter.price.is_some_and(|range| !range.contains(book.price)) {
            return false;
        }
        match filter.search.as_deref() {
            Some(needle) => self.matches_search(book, &needle.to_lowercase()),
            None => true,
        }
    }

    fn matches_search(&self, book: &BookRecord, needle: &str) -> bool {
        let author_name = self
            .active_author(book.author_id)
            .map(|author| author.name.to_lowercase());
        book.title.to_lowercase().contains(needle)
            || book
                .description
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(needle))
            || author_name.is_some_and(|name| name.contains(needle))
    }

    fn select(&self, filter: &BookQueryFilter) -> Vec<BookWithAuthor> {
        let mut books: Vec<&BookRecord> = self
            .books
            .values()
            .filter(|book| self.matches(book, filter))
            .collect();
        books.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        books.into_iter().map(|book| self.with_author(book)).collect()
    }
}

/// Repositories backed by in-process maps. Cloning shares the same rows.
#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the timestamp applied to new and updated rows; `None` restores the wall clock.
    pub fn set_clock(&self, now: Option<OffsetDateTime>) {
        rw_write(&self.state, LOCK_TARGET, "set_clock").clock = now;
    }

    pub fn book_count(&self) -> usize {
        rw_read(&self.state, LOCK_TARGET, "book_count").books.len()
    }
}

#[async_trait]
impl BooksRepo for InMemoryRepositories {
    async fn list_books(&self, filter: &BookQueryFilter) -> Result<Vec<BookWithAuthor>, RepoError> {
        Ok(rw_read(&self.state, LOCK_TARGET, "list_books").select(filter))
    }

    async fn paginate_books(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, RepoError> {
        let rows = rw_read(&self.state, LOCK_TARGET, "paginate_books").select(filter);
        Ok(paginate_slice(&rows, page))
    }

    async fn find_book(
        &self,
        id: i64,
        scope: BookScope,
    ) -> Result<Option<BookWithAuthor>, RepoError> {
        let state = rw_read(&self.state, LOCK_TARGET, "find_book");
        Ok(state
            .books
            .get(&id)
            .filter(|book| scope.admits(book.deletion.is_deleted()))
            .map(|book| state.with_author(book)))
    }

    async fn book_aggregates(&self) -> Result<BookAggregates, RepoError> {
        let state = rw_read(&self.state, LOCK_TARGET, "book_aggregates");
        let active: Vec<&BookRecord> = state
            .books
            .values()
            .filter(|book| !book.deletion.is_deleted())
            .collect();

        let prices: Vec<i64> = active.iter().map(|book| book.price.cents()).collect();
        let average_price_cents = (!prices.is_empty())
            .then(|| prices.iter().sum::<i64>() as f64 / prices.len() as f64);
        let authors: BTreeSet<i64> = active.iter().map(|book| book.author_id).collect();

        let summary = |book: &&BookRecord| BookSummary {
            id: book.id,
            title: book.title.clone(),
            created_at: book.created_at,
        };
        let latest_book = active
            .iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(summary);
        let oldest_book = active
            .iter()
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(summary);

        Ok(BookAggregates {
            total_books: state.books.len() as u64,
            active_books: active.len() as u64,
            featured_books: active.iter().filter(|book| book.featured).count() as u64,
            deleted_books: (state.books.len() - active.len()) as u64,
            average_price_cents,
            min_price: active.iter().map(|book| book.price).min(),
            max_price: active.iter().map(|book| book.price).max(),
            total_authors: authors.len() as u64,
            latest_book,
            oldest_book,
        })
    }

    async fn count_books_by_month(&self, year: i32) -> Result<Vec<MonthlyBookCount>, RepoError> {
        let state = rw_read(&self.state, LOCK_TARGET, "count_books_by_month");
        let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
        for book in state.books.values() {
            if book.deletion.is_deleted() || book.created_at.year() != year {
                continue;
            }
            *counts.entry(u8::from(book.created_at.month())).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(month, count)| MonthlyBookCount { month, count })
            .collect())
    }
}

#[async_trait]
impl BooksWriteRepo for InMemoryRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "create_book");
        let now = state.now();
        state.next_book_id += 1;
        let record = BookRecord {
            id: state.next_book_id,
            title: params.title,
            description: params.description,
            price: params.price,
            image: params.image,
            author_id: params.author_id,
            featured: params.featured,
            deletion: DeletionState::Active,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_book(
        &self,
        id: i64,
        params: UpdateBookParams,
    ) -> Result<BookRecord, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "update_book");
        let now = state.now();
        let book = state
            .books
            .get_mut(&id)
            .filter(|book| !book.deletion.is_deleted())
            .ok_or(RepoError::NotFound)?;

        if let Some(title) = params.title {
            book.title = title;
        }
        if let Some(description) = params.description {
            book.description = description;
        }
        if let Some(price) = params.price {
            book.price = price;
        }
        if let Some(image) = params.image {
            book.image = image;
        }
        if let Some(author_id) = params.author_id {
            book.author_id = author_id;
        }
        if let Some(featured) = params.featured {
            book.featured = featured;
        }
        book.updated_at = now;
        Ok(book.clone())
    }

    async fn soft_delete_book(&self, id: i64, at: OffsetDateTime) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "soft_delete_book");
        match state.books.get_mut(&id) {
            Some(book) if !book.deletion.is_deleted() => {
                book.deletion = DeletionState::Deleted { at };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_book(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "restore_book");
        match state.books.get_mut(&id) {
            Some(book) => {
                book.deletion = DeletionState::Active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn force_delete_book(&self, id: i64) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "force_delete_book");
        Ok(state.books.remove(&id).is_some())
    }

    async fn set_featured(&self, ids: &[i64], featured: bool) -> Result<u64, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "set_featured");
        let now = state.now();
        let mut affected = 0;
        for id in ids {
            if let Some(book) = state
                .books
                .get_mut(id)
                .filter(|book| !book.deletion.is_deleted())
            {
                book.featured = featured;
                book.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl AuthorsRepo for InMemoryRepositories {
    async fn list_authors(&self) -> Result<Vec<AuthorRecord>, RepoError> {
        let state = rw_read(&self.state, LOCK_TARGET, "list_authors");
        let mut authors: Vec<AuthorRecord> = state
            .authors
            .values()
            .filter(|author| !author.deletion.is_deleted())
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(authors)
    }

    async fn find_author(&self, id: i64) -> Result<Option<AuthorRecord>, RepoError> {
        let state = rw_read(&self.state, LOCK_TARGET, "find_author");
        Ok(state.active_author(id).cloned())
    }

    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let mut state = rw_write(&self.state, LOCK_TARGET, "create_author");
        let now = state.now();
        state.next_author_id += 1;
        let record = AuthorRecord {
            id: state.next_author_id,
            name: params.name,
            bio: params.bio,
            email: params.email,
            deletion: DeletionState::Active,
            created_at: now,
            updated_at: now,
        };
        state.authors.insert(record.id, record.clone());
        Ok(record)
    }
}
