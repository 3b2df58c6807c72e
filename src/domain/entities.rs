//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{DeletionState, Price};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub deletion: DeletionState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AuthorRecord {
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
        }
    }

    /// Display label combining name and email, e.g. `Ada - ada@example.com`.
    pub fn full_info(&self) -> String {
        format!("{} - {}", self.name, self.email.as_deref().unwrap_or(""))
    }
}

/// Reduced author projection attached to book results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub image: Option<String>,
    pub author_id: i64,
    pub featured: bool,
    pub deletion: DeletionState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A book joined with its author projection. The author is absent when the
/// referenced author no longer resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: BookRecord,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookStatistics {
    pub total_books: u64,
    pub active_books: u64,
    pub featured_books: u64,
    pub deleted_books: u64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_authors: u64,
    pub latest_book: Option<BookSummary>,
    pub oldest_book: Option<BookSummary>,
}

/// Number of books created in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}
