//! Cache key definitions.

use std::fmt;

/// Cache entries maintained by the book catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookCacheKey {
    /// Every active book with its author, newest first.
    All,
    /// One active book by id.
    Book(i64),
    /// Aggregate statistics snapshot.
    Statistics,
}

impl BookCacheKey {
    /// Entries derived from the whole table, invalidated by every write.
    pub const AGGREGATES: [BookCacheKey; 2] = [BookCacheKey::All, BookCacheKey::Statistics];

    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BookCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookCacheKey::All => f.write_str("books.all"),
            BookCacheKey::Book(id) => write!(f, "books.{id}"),
            BookCacheKey::Statistics => f.write_str("books.statistics"),
        }
    }
}
