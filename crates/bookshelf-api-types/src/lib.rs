//! Shared request and response types for the Bookshelf JSON API.
//!
//! Every response body is wrapped in either [`ApiSuccess`] or [`ApiFailure`] so
//! clients can branch on the `success` flag without inspecting status codes.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Successful response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Failed response envelope. `errors` maps field names to messages and is empty
/// for failures that are not tied to a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiFailure {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
        }
    }
}

/// Offset pagination metadata returned alongside a page of items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub last_page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookCreateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

/// Partial update. Nullable fields distinguish "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub author_id: Option<i64>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFeaturedRequest {
    pub ids: Vec<i64>,
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkFeaturedResponse {
    pub affected: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorCreateRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let cleared: BookUpdateRequest =
            serde_json::from_str(r#"{"description": null}"#).expect("parse");
        assert_eq!(cleared.description, Some(None));

        let untouched: BookUpdateRequest = serde_json::from_str(r#"{"title": "x"}"#).expect("parse");
        assert_eq!(untouched.description, None);
        assert_eq!(untouched.title.as_deref(), Some("x"));
    }

    #[test]
    fn failure_envelope_serializes_success_false() {
        let mut errors = BTreeMap::new();
        errors.insert("title".to_string(), vec!["The title field is required.".to_string()]);
        let body = serde_json::to_value(ApiFailure::new("Validation failed", errors)).expect("json");

        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["title"][0], "The title field is required.");
    }
}
