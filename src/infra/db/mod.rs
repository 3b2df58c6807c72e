//! Postgres-backed repository implementations.

mod authors;
mod books;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{BookQueryFilter, BookScope};

use util::escape_like;

/// Book columns plus the author projection, shared by every book read.
const BOOK_SELECT: &str = "SELECT b.id, b.title, b.description, b.price_cents, b.image, \
     b.author_id, b.featured, b.deleted_at, b.created_at, b.updated_at, \
     a.id AS author_ref_id, a.name AS author_name, a.email AS author_email, \
     a.bio AS author_bio \
     FROM books b \
     LEFT JOIN authors a ON a.id = b.author_id AND a.deleted_at IS NULL \
     WHERE 1=1 ";

const BOOK_COUNT: &str = "SELECT COUNT(*) FROM books b \
     LEFT JOIN authors a ON a.id = b.author_id AND a.deleted_at IS NULL \
     WHERE 1=1 ";

const BOOK_ORDER: &str = " ORDER BY b.created_at DESC, b.id DESC ";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_book_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookQueryFilter) {
        match filter.scope {
            BookScope::Active => {
                qb.push(" AND b.deleted_at IS NULL ");
            }
            BookScope::Trashed => {
                qb.push(" AND b.deleted_at IS NOT NULL ");
            }
            BookScope::WithTrashed => {}
        }

        if let Some(author_id) = filter.author_id {
            qb.push(" AND b.author_id = ");
            qb.push_bind(author_id);
        }

        if let Some(featured) = filter.featured {
            qb.push(" AND b.featured = ");
            qb.push_bind(featured);
        }

        if let Some(range) = filter.price {
            qb.push(" AND b.price_cents BETWEEN ");
            qb.push_bind(range.min.cents());
            qb.push(" AND ");
            qb.push_bind(range.max.cents());
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (b.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR b.description ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.name ILIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }
    }
}
