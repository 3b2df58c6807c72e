//! Conversions from application results into wire types.

use bookshelf_api_types::PageResponse;

use crate::application::pagination::Page;

pub fn page_response<T>(page: Page<T>) -> PageResponse<T> {
    PageResponse {
        items: page.items,
        total: page.total,
        per_page: page.per_page,
        current_page: page.current_page,
        last_page: page.last_page,
    }
}
