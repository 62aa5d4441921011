//! Book scoring and the minimum-rating quality filter.

use crate::model::BookRecord;

/// Popularity-weighted quality score: `rating * ln(max(reviews, 1) + 1)`.
///
/// Never negative for a non-negative rating, and monotonic in both inputs.
pub fn score(rating: f64, review_count: u64) -> f64 {
    let reviews = review_count.max(1) as f64;
    rating * (reviews + 1.0).ln()
}

/// Threshold below which relaxation is no longer attempted.
pub const RELAXATION_FLOOR: f64 = 3.5;

/// How far the threshold drops on the single relaxation step.
pub const RELAXATION_STEP: f64 = 0.3;

/// Outcome of [`QualityFilter::apply`].
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Surviving books, best score first.
    pub books: Vec<BookRecord>,
    /// The threshold that produced `books`.
    pub applied_threshold: f64,
    pub relaxed: bool,
}

/// Minimum-rating filter with one relaxation step.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    pub threshold: f64,
    /// Fewer survivors than this triggers relaxation.
    pub min_survivors: usize,
    /// Cap on the number of books kept.
    pub max_books: usize,
}

impl QualityFilter {
    pub fn new(threshold: f64, min_survivors: usize, max_books: usize) -> Self {
        Self {
            threshold,
            min_survivors,
            max_books,
        }
    }

    /// Keep books rated at or above the threshold. When fewer than
    /// `min_survivors` pass and the threshold is above
    /// [`RELAXATION_FLOOR`], retry once with the threshold lowered by
    /// [`RELAXATION_STEP`]. Survivors are sorted by score, descending, and
    /// capped at `max_books`.
    pub fn apply(&self, candidates: &[BookRecord]) -> FilterOutcome {
        let mut applied_threshold = self.threshold;
        let mut relaxed = false;
        let mut books = Self::at_or_above(candidates, applied_threshold);

        if books.len() < self.min_survivors && self.threshold > RELAXATION_FLOOR {
            applied_threshold = self.threshold - RELAXATION_STEP;
            relaxed = true;
            books = Self::at_or_above(candidates, applied_threshold);
        }

        books.sort_by(|a, b| b.score().total_cmp(&a.score()));
        books.truncate(self.max_books);

        FilterOutcome {
            books,
            applied_threshold,
            relaxed,
        }
    }

    fn at_or_above(candidates: &[BookRecord], threshold: f64) -> Vec<BookRecord> {
        candidates
            .iter()
            .filter(|b| b.rating >= threshold)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, rating: f64, reviews: u64) -> BookRecord {
        BookRecord {
            rating,
            review_count: reviews,
            ..BookRecord::new(title)
        }
    }

    #[test]
    fn score_matches_formula() {
        assert!((score(4.5, 100) - 4.5 * 101f64.ln()).abs() < 1e-9);
        // Zero reviews are treated as one.
        assert!((score(4.0, 0) - 4.0 * 2f64.ln()).abs() < 1e-9);
        assert_eq!(score(0.0, 5000), 0.0);
    }

    #[test]
    fn score_is_monotonic() {
        assert!(score(4.0, 100) < score(4.5, 100));
        assert!(score(4.0, 100) < score(4.0, 1000));
    }

    #[test]
    fn filter_sorts_and_caps() {
        let candidates: Vec<_> = (0..7)
            .map(|i| book(&format!("b{i}"), 4.0 + f64::from(i) * 0.1, 100))
            .collect();
        let outcome = QualityFilter::new(4.0, 2, 5).apply(&candidates);

        assert!(!outcome.relaxed);
        assert_eq!(outcome.books.len(), 5);
        assert_eq!(outcome.books[0].title, "b6");
        assert!(
            outcome
                .books
                .windows(2)
                .all(|w| w[0].score() >= w[1].score())
        );
    }

    #[test]
    fn filter_relaxes_once() {
        let candidates = vec![
            book("a", 4.2, 10),
            book("b", 3.8, 10),
            book("c", 3.6, 10),
        ];
        let outcome = QualityFilter::new(4.0, 2, 5).apply(&candidates);

        assert!(outcome.relaxed);
        assert!((outcome.applied_threshold - 3.7).abs() < 1e-9);
        let titles: Vec<_> = outcome.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn filter_does_not_relax_at_floor() {
        let candidates = vec![book("a", 3.4, 10)];
        let outcome = QualityFilter::new(3.5, 2, 5).apply(&candidates);
        assert!(!outcome.relaxed);
        assert!(outcome.books.is_empty());
    }
}
