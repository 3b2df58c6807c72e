//! Domain layer types and invariants.

pub mod authors;
pub mod books;
pub mod entities;
pub mod error;
pub mod types;
pub mod uploads;
pub mod validation;
