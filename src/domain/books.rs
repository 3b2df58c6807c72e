//! Book input rules and calendar helpers.

use time::{Date, Month, format_description::FormatItem, macros::format_description};

use super::types::Price;
use super::validation::{
    ValidationErrors, check_max_chars, check_required_text, normalize_optional,
};

pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");

/// Fields supplied when creating a book, as received from a client.
#[derive(Debug, Clone, Default)]
pub struct NewBookInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

/// Fields supplied when updating a book. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct BookPatchInput {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidNewBook {
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub author_id: i64,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidBookPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Price>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

pub fn validate_new_book(input: NewBookInput) -> Result<ValidNewBook, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    check_required_text(&mut errors, "title", input.title.as_deref(), TITLE_MAX_CHARS);

    let description = normalize_optional(input.description);
    if let Some(text) = description.as_deref() {
        check_max_chars(&mut errors, "description", text, DESCRIPTION_MAX_CHARS);
    }

    let price = match input.price {
        None => {
            errors.add("price", "The price field is required.");
            None
        }
        Some(amount) => check_price(&mut errors, amount),
    };

    let author_id = match input.author_id {
        None => {
            errors.add("author_id", "The author id field is required.");
            None
        }
        Some(id) => check_author_id(&mut errors, id),
    };

    match (price, author_id) {
        (Some(price), Some(author_id)) if errors.is_empty() => Ok(ValidNewBook {
            title: input.title.unwrap_or_default().trim().to_string(),
            description,
            price,
            author_id,
            featured: input.featured,
        }),
        _ => Err(errors),
    }
}

pub fn validate_book_patch(input: BookPatchInput) -> Result<ValidBookPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = input.title.map(|title| {
        check_required_text(&mut errors, "title", Some(&title), TITLE_MAX_CHARS);
        title.trim().to_string()
    });

    let description = input.description.map(normalize_optional);
    if let Some(Some(text)) = description.as_ref() {
        check_max_chars(&mut errors, "description", text, DESCRIPTION_MAX_CHARS);
    }

    let price = input
        .price
        .and_then(|amount| check_price(&mut errors, amount));
    let author_id = input
        .author_id
        .and_then(|id| check_author_id(&mut errors, id));

    errors.finish(|| ValidBookPatch {
        title,
        description,
        price,
        author_id,
        featured: input.featured,
    })
}

fn check_price(errors: &mut ValidationErrors, amount: f64) -> Option<Price> {
    match Price::from_amount(amount) {
        Ok(price) => Some(price),
        Err(_) if amount.is_finite() && amount < 0.0 => {
            errors.add("price", "The price must be at least 0.");
            None
        }
        Err(_) => {
            errors.add("price", "The price must be a number.");
            None
        }
    }
}

fn check_author_id(errors: &mut ValidationErrors, id: i64) -> Option<i64> {
    if id > 0 {
        Some(id)
    } else {
        errors.add("author_id", "The selected author id is invalid.");
        None
    }
}

/// English month name, e.g. `January`.
pub fn month_name(month: Month) -> String {
    month.to_string()
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewBookInput {
        NewBookInput {
            title: Some("  Dune ".to_string()),
            description: Some("Spice".to_string()),
            price: Some(9.99),
            author_id: Some(1),
            featured: None,
        }
    }

    #[test]
    fn accepts_valid_input_and_trims_title() {
        let book = validate_new_book(valid_input()).expect("valid");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.price.cents(), 999);
        assert_eq!(book.featured, None);
    }

    #[test]
    fn reports_every_missing_required_field() {
        let errors = validate_new_book(NewBookInput {
            title: Some("Incomplete Book".to_string()),
            ..Default::default()
        })
        .expect_err("invalid");

        assert!(errors.contains("price"));
        assert!(errors.contains("author_id"));
        assert!(!errors.contains("title"));
    }

    #[test]
    fn rejects_long_title_and_description() {
        let errors = validate_new_book(NewBookInput {
            title: Some("t".repeat(TITLE_MAX_CHARS + 1)),
            description: Some("d".repeat(DESCRIPTION_MAX_CHARS + 1)),
            ..valid_input()
        })
        .expect_err("too long");

        assert!(errors.contains("title"));
        assert!(errors.contains("description"));
    }

    #[test]
    fn rejects_negative_price() {
        let errors = validate_new_book(NewBookInput {
            price: Some(-1.0),
            ..valid_input()
        })
        .expect_err("negative");
        assert_eq!(
            errors.messages().collect::<Vec<_>>(),
            vec!["The price must be at least 0."]
        );
    }

    #[test]
    fn blank_description_becomes_none() {
        let book = validate_new_book(NewBookInput {
            description: Some("   ".to_string()),
            ..valid_input()
        })
        .expect("valid");
        assert_eq!(book.description, None);
    }

    #[test]
    fn patch_allows_omitted_fields_but_checks_present_ones() {
        let patch = validate_book_patch(BookPatchInput {
            price: Some(150.0),
            description: Some(None),
            ..Default::default()
        })
        .expect("valid patch");
        assert_eq!(patch.price.map(Price::cents), Some(15_000));
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.title, None);

        let errors = validate_book_patch(BookPatchInput {
            title: Some(" ".to_string()),
            author_id: Some(0),
            ..Default::default()
        })
        .expect_err("invalid patch");
        assert!(errors.contains("title"));
        assert!(errors.contains("author_id"));
    }

    #[test]
    fn month_names_are_english() {
        assert_eq!(month_name(Month::January), "January");
        assert_eq!(month_name(Month::March), "March");
    }
}
