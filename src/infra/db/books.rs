use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    BookAggregates, BookQueryFilter, BookScope, BooksRepo, BooksWriteRepo, CreateBookParams,
    MonthlyBookCount, RepoError, UpdateBookParams,
};
use crate::domain::entities::{AuthorSummary, BookRecord, BookSummary, BookWithAuthor};
use crate::domain::types::{DeletionState, Price};

use super::util::convert_count;
use super::{BOOK_COUNT, BOOK_ORDER, BOOK_SELECT, PostgresRepositories, map_sqlx_error};

const BOOK_RETURNING: &str = " RETURNING id, title, description, price_cents, image, author_id, \
     featured, deleted_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    description: Option<String>,
    price_cents: i64,
    image: Option<String>,
    author_id: i64,
    featured: bool,
    deleted_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<BookRow> for BookRecord {
    type Error = RepoError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let price = Price::from_cents(row.price_cents).map_err(|err| RepoError::Integrity {
            message: format!("book {}: {err}", row.id),
        })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price,
            image: row.image,
            author_id: row.author_id,
            featured: row.featured,
            deletion: DeletionState::from_column(row.deleted_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookWithAuthorRow {
    #[sqlx(flatten)]
    book: BookRow,
    author_ref_id: Option<i64>,
    author_name: Option<String>,
    author_email: Option<String>,
    author_bio: Option<String>,
}

impl TryFrom<BookWithAuthorRow> for BookWithAuthor {
    type Error = RepoError;

    fn try_from(row: BookWithAuthorRow) -> Result<Self, Self::Error> {
        let author = match (row.author_ref_id, row.author_name) {
            (Some(id), Some(name)) => Some(AuthorSummary {
                id,
                name,
                email: row.author_email,
                bio: row.author_bio,
            }),
            _ => None,
        };
        Ok(Self {
            book: BookRecord::try_from(row.book)?,
            author,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    total_books: i64,
    active_books: i64,
    featured_books: i64,
    deleted_books: i64,
    average_price_cents: Option<f64>,
    min_price_cents: Option<i64>,
    max_price_cents: Option<i64>,
    total_authors: i64,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    title: String,
    created_at: OffsetDateTime,
}

impl From<SummaryRow> for BookSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MonthRow {
    month: i32,
    count: i64,
}

fn optional_price(cents: Option<i64>) -> Result<Option<Price>, RepoError> {
    cents
        .map(|value| {
            Price::from_cents(value).map_err(|err| RepoError::Integrity {
                message: err.to_string(),
            })
        })
        .transpose()
}

fn into_books(rows: Vec<BookWithAuthorRow>) -> Result<Vec<BookWithAuthor>, RepoError> {
    rows.into_iter().map(BookWithAuthor::try_from).collect()
}

impl PostgresRepositories {
    async fn book_summary(&self, newest: bool) -> Result<Option<BookSummary>, RepoError> {
        let order = if newest { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT id, title, created_at FROM books WHERE deleted_at IS NULL \
             ORDER BY created_at {order}, id {order} LIMIT 1"
        );
        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BookSummary::from))
    }
}

#[async_trait]
impl BooksRepo for PostgresRepositories {
    async fn list_books(&self, filter: &BookQueryFilter) -> Result<Vec<BookWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        Self::apply_book_filter(&mut qb, filter);
        qb.push(BOOK_ORDER);

        let rows = qb
            .build_query_as::<BookWithAuthorRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        into_books(rows)
    }

    async fn paginate_books(
        &self,
        filter: &BookQueryFilter,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, RepoError> {
        let mut count_qb = QueryBuilder::<Postgres>::new(BOOK_COUNT);
        Self::apply_book_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let limit = i64::try_from(page.limit())
            .map_err(|_| RepoError::InvalidInput {
                message: "page size out of range".to_string(),
            })?;
        let offset = i64::try_from(page.offset())
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset out of range".to_string(),
            })?;

        let mut qb = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        Self::apply_book_filter(&mut qb, filter);
        qb.push(BOOK_ORDER);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<BookWithAuthorRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(into_books(rows)?, convert_count(total)?, page))
    }

    async fn find_book(
        &self,
        id: i64,
        scope: BookScope,
    ) -> Result<Option<BookWithAuthor>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        Self::apply_book_filter(&mut qb, &BookQueryFilter::scoped(scope));
        qb.push(" AND b.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<BookWithAuthorRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(BookWithAuthor::try_from).transpose()
    }

    async fn book_aggregates(&self) -> Result<BookAggregates, RepoError> {
        let row = sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT
                COUNT(*) AS total_books,
                COUNT(*) FILTER (WHERE deleted_at IS NULL) AS active_books,
                COUNT(*) FILTER (WHERE deleted_at IS NULL AND featured) AS featured_books,
                COUNT(*) FILTER (WHERE deleted_at IS NOT NULL) AS deleted_books,
                (AVG(price_cents) FILTER (WHERE deleted_at IS NULL))::DOUBLE PRECISION
                    AS average_price_cents,
                MIN(price_cents) FILTER (WHERE deleted_at IS NULL) AS min_price_cents,
                MAX(price_cents) FILTER (WHERE deleted_at IS NULL) AS max_price_cents,
                COUNT(DISTINCT author_id) FILTER (WHERE deleted_at IS NULL) AS total_authors
            FROM books
            "#,
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BookAggregates {
            total_books: convert_count(row.total_books)?,
            active_books: convert_count(row.active_books)?,
            featured_books: convert_count(row.featured_books)?,
            deleted_books: convert_count(row.deleted_books)?,
            average_price_cents: row.average_price_cents,
            min_price: optional_price(row.min_price_cents)?,
            max_price: optional_price(row.max_price_cents)?,
            total_authors: convert_count(row.total_authors)?,
            latest_book: self.book_summary(true).await?,
            oldest_book: self.book_summary(false).await?,
        })
    }

    async fn count_books_by_month(&self, year: i32) -> Result<Vec<MonthlyBookCount>, RepoError> {
        let rows = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT
                EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT4 AS month,
                COUNT(*) AS count
            FROM books
            WHERE deleted_at IS NULL
              AND EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::INT4 = $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(year)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let month = u8::try_from(row.month).map_err(|_| RepoError::Integrity {
                    message: format!("month {} out of range", row.month),
                })?;
                Ok(MonthlyBookCount {
                    month,
                    count: convert_count(row.count)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BooksWriteRepo for PostgresRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<BookRecord, RepoError> {
        let sql = format!(
            "INSERT INTO books (title, description, price_cents, image, author_id, featured) \
             VALUES ($1, $2, $3, $4, $5, $6){BOOK_RETURNING}"
        );
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(params.title)
            .bind(params.description)
            .bind(params.price.cents())
            .bind(params.image)
            .bind(params.author_id)
            .bind(params.featured)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        BookRecord::try_from(row)
    }

    async fn update_book(
        &self,
        id: i64,
        params: UpdateBookParams,
    ) -> Result<BookRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE books SET updated_at = now()");

        if let Some(title) = params.title {
            qb.push(", title = ");
            qb.push_bind(title);
        }
        if let Some(description) = params.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(price) = params.price {
            qb.push(", price_cents = ");
            qb.push_bind(price.cents());
        }
        if let Some(image) = params.image {
            qb.push(", image = ");
            qb.push_bind(image);
        }
        if let Some(author_id) = params.author_id {
            qb.push(", author_id = ");
            qb.push_bind(author_id);
        }
        if let Some(featured) = params.featured {
            qb.push(", featured = ");
            qb.push_bind(featured);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND deleted_at IS NULL");
        qb.push(BOOK_RETURNING);

        let row = qb
            .build_query_as::<BookRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        BookRecord::try_from(row)
    }

    async fn soft_delete_book(&self, id: i64, at: OffsetDateTime) -> Result<bool, RepoError> {
        let result =
            sqlx::query("UPDATE books SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(at)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_book(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE books SET deleted_at = NULL WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn force_delete_book(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_featured(&self, ids: &[i64], featured: bool) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE books SET featured = $1, updated_at = now() \
             WHERE id = ANY($2) AND deleted_at IS NULL",
        )
        .bind(featured)
        .bind(ids)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
