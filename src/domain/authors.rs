//! Author input rules.

use super::validation::{
    ValidationErrors, check_max_chars, check_required_text, normalize_optional,
};

pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const BIO_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct NewAuthorInput {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNewAuthor {
    pub name: String,
    pub bio: Option<String>,
    pub email: Option<String>,
}

pub fn validate_new_author(input: NewAuthorInput) -> Result<ValidNewAuthor, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    check_required_text(&mut errors, "name", input.name.as_deref(), NAME_MAX_CHARS);

    let bio = normalize_optional(input.bio);
    if let Some(text) = bio.as_deref() {
        check_max_chars(&mut errors, "bio", text, BIO_MAX_CHARS);
    }

    let email = normalize_optional(input.email);
    if let Some(address) = email.as_deref() {
        check_max_chars(&mut errors, "email", address, EMAIL_MAX_CHARS);
        if !looks_like_email(address) {
            errors.add("email", "The email must be a valid email address.");
        }
    }

    let name = input.name.unwrap_or_default().trim().to_string();
    errors.finish(|| ValidNewAuthor { name, bio, email })
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_required() {
        let errors = validate_new_author(NewAuthorInput::default()).expect_err("missing name");
        assert!(errors.contains("name"));
    }

    #[test]
    fn email_is_optional_but_checked() {
        let author = validate_new_author(NewAuthorInput {
            name: Some("Ada".to_string()),
            email: Some("".to_string()),
            ..Default::default()
        })
        .expect("valid");
        assert_eq!(author.email, None);

        let errors = validate_new_author(NewAuthorInput {
            name: Some("Ada".to_string()),
            email: Some("not-an-email".to_string()),
            ..Default::default()
        })
        .expect_err("bad email");
        assert!(errors.contains("email"));
    }
}
