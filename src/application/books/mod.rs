//! Book catalogue: the cached data-access layer and the service around it.

mod catalog;
mod service;

pub use catalog::{BookCatalog, CatalogError};
pub use service::{BookService, BookServiceError};
