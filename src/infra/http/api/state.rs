use std::sync::Arc;

use crate::application::authors::AuthorService;
use crate::application::books::BookService;

#[derive(Clone)]
pub struct ApiState {
    pub books: Arc<BookService>,
    pub authors: Arc<AuthorService>,
}
