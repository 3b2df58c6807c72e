//! Multipart form decoding shared by the JSON and HTML surfaces.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use crate::domain::uploads::ImageUpload;

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// Text field parsed into `T`. Blank input is `None`; unparsable input is `Err`.
    pub fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, T::Err> {
        match self.fields.get(name).map(|value| value.trim()) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }

    /// Checkbox semantics: present and not `0`/`false`/`off` means true.
    pub fn flag(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .map(|value| !matches!(value.trim(), "" | "0" | "false" | "off"))
            .unwrap_or(false)
    }
}

/// Drain a multipart body. The file part named `file_field` becomes the image;
/// an empty file part (a form submitted without choosing a file) is ignored.
pub async fn read_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<MultipartForm, MultipartError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            if filename.is_empty() && data.is_empty() {
                continue;
            }
            form.image = Some(ImageUpload::new(filename, content_type, data));
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
