//! Book extraction from free-form completion text.
//!
//! The structured pass reads `Field: value` lines separated by `---`. When it
//! finds nothing, a heuristic pass treats bullet or number-prefixed lines as
//! the start of a record and mines the following lines for an author, a
//! rating and a review count.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::BookRecord;

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year regex"));
static RE_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("valid decimal regex"));
static RE_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid integer regex"));

static RE_ITEM_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\*\-•]+[\.\):]?\s+").expect("valid item start regex"));
static RE_ITEM_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']([^"']+)["']|[\d\*\-•]+[\.\):]?\s+([^:\n]+?)(?:\s+by\s+|$)"#)
        .expect("valid item title regex")
});
static RE_LOOSE_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:by|author[:\s]+)\s*([A-Z][^,\n\(\)]+?)(?:\s*\(|\s*,|\s*$)")
        .expect("valid author regex")
});
static RE_LOOSE_RATING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+\.?\d*)\s*(?:/5|stars?|rating)").expect("valid rating regex")
});
static RE_LOOSE_REVIEWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d,]+)\s*(?:reviews?|ratings?)").expect("valid reviews regex")
});

/// Record separator in the structured format.
pub const SEPARATOR: &str = "---";

/// Words that keep a heuristic line out of the accumulated reason.
const NON_REASON_KEYWORDS: [&str; 5] = ["title", "author", "rating", "year", "publication"];

/// Parse book records out of `text`.
///
/// Never fails: unparseable numbers keep their defaults and records without
/// a title are dropped. Ratings are clamped into `0.0..=5.0`.
pub fn parse_books(text: &str) -> Vec<BookRecord> {
    let mut books = parse_structured(text);
    if books.is_empty() {
        books = parse_heuristic(text);
    }
    books.retain(|b| !b.title.trim().is_empty());
    for book in &mut books {
        book.rating = book.rating.clamp(0.0, 5.0);
    }
    books
}

/// Render records in the structured format understood by [`parse_books`].
pub fn format_structured(books: &[BookRecord]) -> String {
    let mut out = String::new();
    for book in books {
        out.push_str(&format!("Title: {}\n", book.title));
        out.push_str(&format!("Author: {}\n", book.author));
        if let Some(year) = &book.year {
            out.push_str(&format!("Year: {year}\n"));
        }
        out.push_str(&format!("Rating: {}\n", book.rating));
        out.push_str(&format!("Reviews: {}\n", book.review_count));
        out.push_str(&format!("Why: {}\n", book.reason));
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Structured pass
// ---------------------------------------------------------------------------

fn parse_structured(text: &str) -> Vec<BookRecord> {
    let mut books = Vec::new();
    let mut current: Option<BookRecord> = None;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(title) = line.strip_prefix("Title:") {
            books.extend(current.take());
            current = Some(BookRecord::new(title.trim()));
            continue;
        }
        if line == SEPARATOR {
            books.extend(current.take());
            continue;
        }
        let Some(book) = current.as_mut() else {
            continue;
        };

        if let Some(author) = line.strip_prefix("Author:") {
            let author = author.trim();
            if !author.is_empty() {
                book.author = author.to_string();
            }
        } else if let Some(year) = line.strip_prefix("Year:") {
            book.year = RE_YEAR.find(year).map(|m| m.as_str().to_string());
        } else if let Some(rating) = line.strip_prefix("Rating:") {
            book.rating = first_decimal(rating).unwrap_or(0.0);
        } else if let Some(reviews) = line.strip_prefix("Reviews:") {
            book.review_count = first_integer(&reviews.replace(',', "")).unwrap_or(0);
        } else if let Some(reason) = line.strip_prefix("Why:") {
            let reason = reason.trim();
            if !reason.is_empty() {
                book.reason = reason.to_string();
            }
        }
    }
    books.extend(current);
    books
}

fn first_decimal(text: &str) -> Option<f64> {
    RE_DECIMAL
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn first_integer(text: &str) -> Option<u64> {
    RE_INTEGER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ---------------------------------------------------------------------------
// Heuristic pass
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Draft {
    title: Option<String>,
    author: Option<String>,
    rating: Option<f64>,
    review_count: Option<u64>,
    reason: Option<String>,
}

impl Draft {
    fn into_record(self) -> Option<BookRecord> {
        let mut book = BookRecord::new(self.title?);
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
        if let Some(count) = self.review_count {
            book.review_count = count;
        }
        if let Some(reason) = self.reason {
            book.reason = reason;
        }
        Some(book)
    }

    fn push_reason(&mut self, line: &str) {
        match &mut self.reason {
            Some(reason) => {
                reason.push(' ');
                reason.push_str(line);
            }
            None => self.reason = Some(line.to_string()),
        }
    }
}

fn parse_heuristic(text: &str) -> Vec<BookRecord> {
    let mut books = Vec::new();
    let mut current: Option<Draft> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            books.extend(current.take().and_then(Draft::into_record));
            continue;
        }

        if RE_ITEM_START.is_match(line) {
            books.extend(current.take().and_then(Draft::into_record));
            let title = RE_ITEM_TITLE.captures(line).and_then(|c| {
                c.get(1)
                    .or_else(|| c.get(2))
                    .map(|m| {
                        m.as_str()
                            .trim()
                            .trim_matches(|c| c == '"' || c == '\'')
                            .to_string()
                    })
            });
            current = Some(Draft {
                title,
                ..Draft::default()
            });
        }

        let Some(draft) = current.as_mut() else {
            continue;
        };
        let lower = line.to_lowercase();

        if lower.contains("by") || lower.contains("author") {
            if let Some(author) = RE_LOOSE_AUTHOR.captures(line).and_then(|c| c.get(1)) {
                draft.author = Some(author.as_str().trim().to_string());
            }
        }
        if let Some(rating) = RE_LOOSE_RATING
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            draft.rating = Some(rating);
        }
        if let Some(count) = RE_LOOSE_REVIEWS
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
        {
            draft.review_count = Some(count);
        }
        if !NON_REASON_KEYWORDS.iter().any(|k| lower.contains(k)) {
            draft.push_reason(line);
        }
    }
    books.extend(current.and_then(Draft::into_record));
    books
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_record_with_all_fields() {
        let text = "\
Title: Introduction to Algorithms
Author: Thomas H. Cormen
Year: Published 2009 (3rd edition)
Rating: 4.3/5
Reviews: 12,345 ratings
Why: The standard reference.
---";
        let books = parse_books(text);
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "Introduction to Algorithms");
        assert_eq!(book.author, "Thomas H. Cormen");
        assert_eq!(book.year.as_deref(), Some("2009"));
        assert!((book.rating - 4.3).abs() < 1e-9);
        assert_eq!(book.review_count, 12_345);
        assert_eq!(book.reason, "The standard reference.");
    }

    #[test]
    fn structured_new_title_flushes_previous() {
        let text = "Title: A\nRating: 4.0\nTitle: B\nRating: 4.5\n";
        let books = parse_books(text);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert!((books[1].rating - 4.5).abs() < 1e-9);
    }

    #[test]
    fn structured_non_numeric_fields_keep_defaults() {
        let text = "Title: Mystery\nYear: unknown\nRating: n/a\nReviews: many\n---";
        let books = parse_books(text);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].year, None);
        assert_eq!(books[0].rating, 0.0);
        assert_eq!(books[0].review_count, 0);
        assert_eq!(books[0].author, "Unknown");
        assert_eq!(books[0].reason, BookRecord::DEFAULT_REASON);
    }

    #[test]
    fn fields_without_a_title_are_ignored() {
        let text = "Author: Nobody\nRating: 5\n---\nTitle: Real\n";
        let books = parse_books(text);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Real");
        assert_eq!(books[0].author, "Unknown");
    }

    #[test]
    fn ratings_are_clamped_and_empty_titles_dropped() {
        let text = "Title: Loud\nRating: 9.5\n---\nTitle:\nRating: 4\n---";
        let books = parse_books(text);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].rating, 5.0);
    }

    #[test]
    fn heuristic_numbered_list() {
        let text = "\
Here are some picks:

1. \"Grokking Algorithms\" by Aditya Bhargava (2016)
Rated 4.4/5 with 3,210 reviews
A gentle illustrated introduction.

2. The Algorithm Design Manual by Steven Skiena
4.6 stars
";
        let books = parse_books(text);
        assert_eq!(books.len(), 2);

        assert_eq!(books[0].title, "Grokking Algorithms");
        assert_eq!(books[0].author, "Aditya Bhargava");
        assert!((books[0].rating - 4.4).abs() < 1e-9);
        assert_eq!(books[0].review_count, 3_210);
        assert!(books[0].reason.contains("gentle illustrated"));

        assert_eq!(books[1].title, "The Algorithm Design Manual");
        assert_eq!(books[1].author, "Steven Skiena");
        assert!((books[1].rating - 4.6).abs() < 1e-9);
        assert_eq!(books[1].review_count, 0);
    }

    #[test]
    fn unstructured_prose_yields_nothing() {
        assert!(parse_books("I could not find any books, sorry.").is_empty());
        assert!(parse_books("").is_empty());
    }

    #[test]
    fn format_structured_parses_back() {
        let book = BookRecord {
            title: "Clean Code".to_string(),
            author: "Robert C. Martin".to_string(),
            year: Some("2008".to_string()),
            rating: 4.4,
            review_count: 950,
            reason: "Readable code habits".to_string(),
        };
        let books = parse_books(&format_structured(std::slice::from_ref(&book)));
        assert_eq!(books, vec![book]);
    }
}
