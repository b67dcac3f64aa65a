//! Values derived from the collection on demand. Nothing here is persisted.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::Book;

/// Mean rating over the rated books of a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageRating {
    /// No book in the collection carries a rating.
    NoRatings,
    Rated { mean: f64, count: usize },
}

impl AverageRating {
    pub fn mean(&self) -> Option<f64> {
        match self {
            Self::NoRatings => None,
            Self::Rated { mean, .. } => Some(*mean),
        }
    }

    /// Number of rated books that contributed to the mean.
    pub fn count(&self) -> usize {
        match self {
            Self::NoRatings => 0,
            Self::Rated { count, .. } => *count,
        }
    }

    /// The displayed (two-decimal) mean rounded to the nearest whole star,
    /// so "2.50" always shows three stars.
    pub fn rounded_stars(&self) -> Option<u8> {
        self.mean().map(|m| ((m * 100.0).round() / 100.0).round() as u8)
    }
}

/// Compute the average over every book with a rating.
pub fn average_rating(books: &[Book]) -> AverageRating {
    let (sum, count) = books
        .iter()
        .filter_map(|b| b.rating)
        .fold((0u64, 0usize), |(sum, count), r| (sum + u64::from(r.get()), count + 1));

    if count == 0 {
        AverageRating::NoRatings
    } else {
        AverageRating::Rated {
            mean: sum as f64 / count as f64,
            count,
        }
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRatings => f.write_str("No ratings yet"),
            Self::Rated { mean, count } => {
                let noun = if *count == 1 { "book" } else { "books" };
                write!(f, "{mean:.2} ({count} {noun})")
            }
        }
    }
}

/// Serialized as `{"average": 4.0, "count": 3}`, or `{"average": null, "count": 0}`.
impl Serialize for AverageRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            average: Option<f64>,
            count: usize,
        }

        Wire {
            average: self.mean(),
            count: self.count(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookId, NewBook};
    use chrono::Utc;

    fn book(rating: Option<u8>) -> Book {
        let mut input = NewBook::new("Title", "Author");
        if let Some(r) = rating {
            input = input.with_rating(r);
        }
        input
            .validate()
            .unwrap()
            .into_book(BookId::generate(), Utc::now())
    }

    #[test]
    fn test_average_ignores_unrated() {
        let books = vec![book(Some(4)), book(Some(5)), book(None), book(Some(3))];
        let avg = average_rating(&books);
        assert_eq!(avg, AverageRating::Rated { mean: 4.0, count: 3 });
        assert_eq!(avg.rounded_stars(), Some(4));
    }

    #[test]
    fn test_stars_follow_displayed_mean() {
        let mut books: Vec<Book> = (0..100).map(|_| book(Some(3))).collect();
        books.extend((0..101).map(|_| book(Some(2))));

        let avg = average_rating(&books);
        assert!(avg.mean().unwrap() < 2.5);
        assert_eq!(avg.to_string(), "2.50 (201 books)");
        assert_eq!(avg.rounded_stars(), Some(3));
    }

    #[test]
    fn test_no_ratings_is_distinct_from_zero() {
        assert_eq!(average_rating(&[]), AverageRating::NoRatings);
        let avg = average_rating(&[book(None), book(None)]);
        assert_eq!(avg, AverageRating::NoRatings);
        assert_eq!(avg.mean(), None);
        assert_eq!(avg.count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(AverageRating::NoRatings.to_string(), "No ratings yet");
        assert_eq!(
            average_rating(&[book(Some(4)), book(Some(5))]).to_string(),
            "4.50 (2 books)"
        );
        assert_eq!(average_rating(&[book(Some(3))]).to_string(), "3.00 (1 book)");
    }

    #[test]
    fn test_serialize() {
        let rated = serde_json::to_value(average_rating(&[book(Some(2)), book(Some(5))])).unwrap();
        assert_eq!(rated, serde_json::json!({"average": 3.5, "count": 2}));

        let none = serde_json::to_value(AverageRating::NoRatings).unwrap();
        assert_eq!(none, serde_json::json!({"average": null, "count": 0}));
    }
}
