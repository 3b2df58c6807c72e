//! Book and author catalogue: a cached data-access layer over pluggable
//! storage, exposed through a JSON API and server-rendered pages.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
