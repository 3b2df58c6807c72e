//! Author listing and creation.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{AuthorsRepo, CreateAuthorParams, RepoError};
use crate::domain::authors::{NewAuthorInput, validate_new_author};
use crate::domain::entities::AuthorRecord;
use crate::domain::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum AuthorServiceError {
    #[error("author input is invalid: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct AuthorService {
    repo: Arc<dyn AuthorsRepo>,
}

impl AuthorService {
    pub fn new(repo: Arc<dyn AuthorsRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<AuthorRecord>, AuthorServiceError> {
        Ok(self.repo.list_authors().await?)
    }

    pub async fn find(&self, id: i64) -> Result<Option<AuthorRecord>, AuthorServiceError> {
        Ok(self.repo.find_author(id).await?)
    }

    pub async fn create(&self, input: NewAuthorInput) -> Result<AuthorRecord, AuthorServiceError> {
        let author = validate_new_author(input).map_err(AuthorServiceError::Validation)?;
        let created = self
            .repo
            .create_author(CreateAuthorParams {
                name: author.name,
                bio: author.bio,
                email: author.email,
            })
            .await?;

        info!(
            target = "bookshelf::authors",
            author_id = created.id,
            "author created"
        );
        Ok(created)
    }
}
