use crate::application::error::HttpError;
use crate::domain::books::format_human_date;
use crate::domain::entities::{AuthorRecord, BookWithAuthor};
use crate::domain::validation::ValidationErrors;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Flash-style message shown above a list after a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    BookCreated,
    BookDeleted,
    BookRestored,
    AuthorCreated,
}

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            Notice::BookCreated => "book-created",
            Notice::BookDeleted => "book-deleted",
            Notice::BookRestored => "book-restored",
            Notice::AuthorCreated => "author-created",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "book-created" => Some(Notice::BookCreated),
            "book-deleted" => Some(Notice::BookDeleted),
            "book-restored" => Some(Notice::BookRestored),
            "author-created" => Some(Notice::AuthorCreated),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::BookCreated => "Book created successfully",
            Notice::BookDeleted => "Book deleted successfully",
            Notice::BookRestored => "Book restored successfully",
            Notice::AuthorCreated => "Author created successfully",
        }
    }
}

pub struct BookRowView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub price: String,
    pub image_url: Option<String>,
    pub featured: bool,
    pub created_on: String,
}

impl From<&BookWithAuthor> for BookRowView {
    fn from(entry: &BookWithAuthor) -> Self {
        let book = &entry.book;
        Self {
            id: book.id,
            title: book.title.clone(),
            description: book.description.clone().unwrap_or_default(),
            author_name: entry
                .author
                .as_ref()
                .map(|author| author.name.clone())
                .unwrap_or_else(|| "Unknown author".to_string()),
            price: format!("${}", book.price),
            image_url: book.image.as_ref().map(|path| format!("/uploads/{path}")),
            featured: book.featured,
            created_on: format_human_date(book.created_at.date()),
        }
    }
}

pub struct AuthorOptionView {
    pub id: i64,
    pub label: String,
    pub selected: bool,
}

/// Values echoed back into the create form after a failed submission.
#[derive(Debug, Clone, Default)]
pub struct BookFormView {
    pub title: String,
    pub description: String,
    pub price: String,
    pub author_id: Option<i64>,
    pub featured: bool,
}

pub struct BooksPageView {
    pub notice: Option<&'static str>,
    pub errors: Vec<String>,
    pub books: Vec<BookRowView>,
    pub trashed: Vec<BookRowView>,
    pub authors: Vec<AuthorOptionView>,
    pub form: BookFormView,
}

impl BooksPageView {
    pub fn new(
        books: &[BookWithAuthor],
        trashed: &[BookWithAuthor],
        authors: &[AuthorRecord],
        form: BookFormView,
    ) -> Self {
        Self {
            notice: None,
            errors: Vec::new(),
            books: books.iter().map(BookRowView::from).collect(),
            trashed: trashed.iter().map(BookRowView::from).collect(),
            authors: authors
                .iter()
                .map(|author| AuthorOptionView {
                    id: author.id,
                    label: author.full_info(),
                    selected: form.author_id == Some(author.id),
                })
                .collect(),
            form,
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice.map(Notice::message);
        self
    }

    pub fn with_errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = errors.messages().map(str::to_string).collect();
        self
    }
}

#[derive(Template)]
#[template(path = "books/index.html")]
pub struct BooksTemplate {
    pub view: BooksPageView,
}

pub struct AuthorRowView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorFormView {
    pub name: String,
    pub email: String,
    pub bio: String,
}

pub struct AuthorsPageView {
    pub notice: Option<&'static str>,
    pub errors: Vec<String>,
    pub authors: Vec<AuthorRowView>,
    pub form: AuthorFormView,
}

impl AuthorsPageView {
    pub fn new(authors: &[AuthorRecord], form: AuthorFormView) -> Self {
        Self {
            notice: None,
            errors: Vec::new(),
            authors: authors
                .iter()
                .map(|author| AuthorRowView {
                    id: author.id,
                    name: author.name.clone(),
                    email: author.email.clone().unwrap_or_default(),
                    bio: author.bio.clone().unwrap_or_default(),
                })
                .collect(),
            form,
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice.map(Notice::message);
        self
    }

    pub fn with_errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = errors.messages().map(str::to_string).collect();
        self
    }
}

#[derive(Template)]
#[template(path = "authors/index.html")]
pub struct AuthorsTemplate {
    pub view: AuthorsPageView,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::{AuthorSummary, BookRecord};
    use crate::domain::types::{DeletionState, Price};

    fn sample_book() -> BookWithAuthor {
        BookWithAuthor {
            book: BookRecord {
                id: 7,
                title: "Dune <1965>".to_string(),
                description: None,
                price: Price::from_cents(1250).expect("price"),
                image: Some("books/abc-cover.png".to_string()),
                author_id: 3,
                featured: true,
                deletion: DeletionState::Active,
                created_at: datetime!(2024-03-05 10:00 UTC),
                updated_at: datetime!(2024-03-05 10:00 UTC),
            },
            author: Some(AuthorSummary {
                id: 3,
                name: "Frank".to_string(),
                email: None,
                bio: None,
            }),
        }
    }

    #[test]
    fn book_rows_format_price_and_image_url() {
        let row = BookRowView::from(&sample_book());
        assert_eq!(row.price, "$12.50");
        assert_eq!(row.image_url.as_deref(), Some("/uploads/books/abc-cover.png"));
        assert_eq!(row.author_name, "Frank");
    }

    #[test]
    fn notice_codes_round_trip() {
        for notice in [
            Notice::BookCreated,
            Notice::BookDeleted,
            Notice::BookRestored,
            Notice::AuthorCreated,
        ] {
            assert_eq!(Notice::from_code(notice.code()), Some(notice));
        }
        assert_eq!(Notice::from_code("nope"), None);
    }

    #[test]
    fn books_page_escapes_titles() {
        let view = BooksPageView::new(&[sample_book()], &[], &[], BookFormView::default())
            .with_notice(Some(Notice::BookCreated));
        let html = BooksTemplate { view }.render().expect("render");
        assert!(html.contains("Dune &#60;1965&#62;") || html.contains("Dune &lt;1965&gt;"));
        assert!(html.contains("Book created successfully"));
        assert!(html.contains("$12.50"));
    }
}
