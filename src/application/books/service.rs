use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::application::files::{FileStoreError, ImageStore};
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{AuthorsRepo, CreateBookParams, RepoError, UpdateBookParams};
use crate::domain::books::{BookPatchInput, NewBookInput, validate_book_patch, validate_new_book};
use crate::domain::entities::{BookStatistics, BookWithAuthor, MonthCount};
use crate::domain::types::Price;
use crate::domain::uploads::{ImageUpload, validate_image};
use crate::domain::validation::ValidationErrors;

use super::catalog::{BookCatalog, CatalogError};

const IMAGE_NAMESPACE: &str = "books";

#[derive(Debug, Error)]
pub enum BookServiceError {
    #[error("book input is invalid: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("author lookup failed")]
    Authors(#[source] RepoError),
    #[error("image storage failed")]
    Storage(#[source] FileStoreError),
}

/// Orchestrates validation, defaults and image files around the catalogue.
pub struct BookService {
    catalog: Arc<BookCatalog>,
    authors: Arc<dyn AuthorsRepo>,
    images: Arc<dyn ImageStore>,
}

impl BookService {
    pub fn new(
        catalog: Arc<BookCatalog>,
        authors: Arc<dyn AuthorsRepo>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            catalog,
            authors,
            images,
        }
    }

    pub async fn list_books(&self) -> Result<Vec<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.all().await?)
    }

    pub async fn paginated(
        &self,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.paginate(page).await?)
    }

    pub async fn get_book(&self, id: i64) -> Result<Option<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.find(id).await?)
    }

    /// Validate and create a book, storing the optional cover image first.
    pub async fn store(
        &self,
        input: NewBookInput,
        image: Option<ImageUpload>,
    ) -> Result<BookWithAuthor, BookServiceError> {
        let validated = validate_new_book(input);
        let book = match (validated, check_image(image.as_ref())) {
            (Ok(book), Ok(())) => book,
            (Ok(_), Err(errors)) | (Err(errors), Ok(())) => {
                return Err(BookServiceError::Validation(errors));
            }
            (Err(mut errors), Err(image_errors)) => {
                errors.merge(image_errors);
                return Err(BookServiceError::Validation(errors));
            }
        };

        self.ensure_author(book.author_id).await?;
        let image_ref = self.store_image(image.as_ref()).await?;

        let params = CreateBookParams {
            title: book.title,
            description: book.description,
            price: book.price,
            image: image_ref.clone(),
            author_id: book.author_id,
            featured: book.featured.unwrap_or(false),
        };

        match self.catalog.create(params).await {
            Ok(created) => Ok(created),
            Err(err) => {
                self.discard_image(image_ref.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Apply a partial update. A new image replaces and removes the old one.
    pub async fn update(
        &self,
        id: i64,
        input: BookPatchInput,
        image: Option<ImageUpload>,
    ) -> Result<BookWithAuthor, BookServiceError> {
        let validated = validate_book_patch(input);
        let patch = match (validated, check_image(image.as_ref())) {
            (Ok(patch), Ok(())) => patch,
            (Ok(_), Err(errors)) | (Err(errors), Ok(())) => {
                return Err(BookServiceError::Validation(errors));
            }
            (Err(mut errors), Err(image_errors)) => {
                errors.merge(image_errors);
                return Err(BookServiceError::Validation(errors));
            }
        };

        let existing = self.catalog.find_or_fail(id).await?;
        if let Some(author_id) = patch.author_id {
            self.ensure_author(author_id).await?;
        }
        let image_ref = self.store_image(image.as_ref()).await?;

        let params = UpdateBookParams {
            title: patch.title,
            description: patch.description,
            price: patch.price,
            image: image_ref.clone().map(Some),
            author_id: patch.author_id,
            featured: patch.featured,
        };

        match self.catalog.update(id, params).await {
            Ok(updated) => {
                if image_ref.is_some() {
                    self.discard_image(existing.book.image.as_deref()).await;
                }
                Ok(updated)
            }
            Err(err) => {
                self.discard_image(image_ref.as_deref()).await;
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<bool, BookServiceError> {
        Ok(self.catalog.delete(id).await?)
    }

    pub async fn restore(&self, id: i64) -> Result<bool, BookServiceError> {
        Ok(self.catalog.restore(id).await?)
    }

    /// Permanently remove a book and its stored image.
    pub async fn force_delete(&self, id: i64) -> Result<bool, BookServiceError> {
        let image = self
            .catalog
            .find_with_trashed(id)
            .await?
            .and_then(|found| found.book.image);
        let removed = self.catalog.force_delete(id).await?;
        if removed {
            self.discard_image(image.as_deref()).await;
        }
        Ok(removed)
    }

    pub async fn search(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.search(query, page).await?)
    }

    pub async fn books_by_author(
        &self,
        author_id: i64,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.find_by_author(author_id, page).await?)
    }

    pub async fn featured(
        &self,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.featured(page).await?)
    }

    pub async fn trashed(
        &self,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        Ok(self.catalog.trashed(page).await?)
    }

    pub async fn by_price_range(
        &self,
        min: f64,
        max: f64,
        page: PageRequest,
    ) -> Result<Page<BookWithAuthor>, BookServiceError> {
        let mut errors = ValidationErrors::new();
        let min = Price::from_amount(min)
            .map_err(|_| errors.add("min", "The min must be a number of at least 0."))
            .ok();
        let max = Price::from_amount(max)
            .map_err(|_| errors.add("max", "The max must be a number of at least 0."))
            .ok();

        match (min, max) {
            (Some(min), Some(max)) if min <= max => {
                Ok(self.catalog.by_price_range(min, max, page).await?)
            }
            (Some(_), Some(_)) => Err(BookServiceError::Validation(ValidationErrors::single(
                "min",
                "The min must be less than or equal to max.",
            ))),
            _ => Err(BookServiceError::Validation(errors)),
        }
    }

    pub async fn bulk_update_featured(
        &self,
        ids: &[i64],
        featured: bool,
    ) -> Result<u64, BookServiceError> {
        Ok(self.catalog.bulk_update_featured(ids, featured).await?)
    }

    pub async fn statistics(&self) -> Result<BookStatistics, BookServiceError> {
        Ok(self.catalog.statistics().await?)
    }

    pub async fn books_by_month(
        &self,
        year: Option<i32>,
    ) -> Result<Vec<MonthCount>, BookServiceError> {
        Ok(self.catalog.books_by_month(year).await?)
    }

    async fn ensure_author(&self, author_id: i64) -> Result<(), BookServiceError> {
        match self
            .authors
            .find_author(author_id)
            .await
            .map_err(BookServiceError::Authors)?
        {
            Some(_) => Ok(()),
            None => Err(BookServiceError::Validation(ValidationErrors::single(
                "author_id",
                "The selected author id is invalid.",
            ))),
        }
    }

    async fn store_image(
        &self,
        image: Option<&ImageUpload>,
    ) -> Result<Option<String>, BookServiceError> {
        match image {
            Some(upload) => self
                .images
                .store(IMAGE_NAMESPACE, upload)
                .await
                .map(Some)
                .map_err(BookServiceError::Storage),
            None => Ok(None),
        }
    }

    async fn discard_image(&self, reference: Option<&str>) {
        let Some(reference) = reference else {
            return;
        };
        if let Err(err) = self.images.delete(reference).await {
            warn!(
                target = "bookshelf::books",
                reference,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}

fn check_image(image: Option<&ImageUpload>) -> Result<(), ValidationErrors> {
    image.map_or(Ok(()), validate_image)
}
