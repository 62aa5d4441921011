//! Turning unstructured completion text into stages, books and signals.

pub mod books;
pub mod signals;
pub mod stages;

pub use books::{format_structured, parse_books};
pub use stages::parse_stages;

/// The first `max_chars` characters of `text`.
pub fn leading_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
