use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{BooklistError, Result};

// ─── BookId ─────────────────────────────────────────────────

/// Opaque record identifier. Only equality and string comparison are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Fresh identifier (UUID v7, so ids sort roughly by creation time).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BookId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── Rating ─────────────────────────────────────────────────

/// A whole-star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(out_of_range())
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = BooklistError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn out_of_range() -> BooklistError {
    BooklistError::validation("Rating must be between 1 and 5")
}

/// A rating as submitted by a caller, before validation.
///
/// Browsers submit form values as strings, so numeric text is accepted
/// alongside JSON numbers. Blank text means "no rating".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingInput {
    Number(f64),
    Text(String),
}

impl RatingInput {
    /// Validate into a stored rating. `Ok(None)` means the input was blank.
    pub fn resolve(&self) -> Result<Option<Rating>> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed.parse::<f64>().map_err(|_| {
                    BooklistError::validation(format!("Rating is not a number: {trimmed:?}"))
                })?
            }
        };

        if !value.is_finite() || value.fract() != 0.0 {
            return Err(BooklistError::validation("Rating must be a whole number"));
        }
        if value < f64::from(Rating::MIN) || value > f64::from(Rating::MAX) {
            return Err(out_of_range());
        }
        Ok(Some(Rating(value as u8)))
    }
}

impl From<u8> for RatingInput {
    fn from(v: u8) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for RatingInput {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<f64> for RatingInput {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for RatingInput {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RatingInput {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ─── Book ───────────────────────────────────────────────────

/// One entry of the reading list, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,

    /// `null` on disk when the book is unrated.
    #[serde(default)]
    pub rating: Option<Rating>,

    #[serde(default)]
    pub note: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ─── Create input ───────────────────────────────────────────

/// Input for creating a book. Required fields are optional here so that a
/// missing field is reported as a validation failure, not a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: Option<RatingInput>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            rating: None,
            note: None,
        }
    }

    pub fn with_rating(mut self, rating: impl Into<RatingInput>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check every field and normalize whitespace. Performs no I/O.
    pub fn validate(&self) -> Result<BookDraft> {
        let title = required_text("Title", self.title.as_deref())?;
        let author = required_text("Author", self.author.as_deref())?;
        let rating = match &self.rating {
            Some(input) => input.resolve()?,
            None => None,
        };
        let note = self.note.as_deref().map(str::trim).unwrap_or_default().to_string();

        Ok(BookDraft {
            title,
            author,
            rating,
            note,
        })
    }
}

/// A validated [`NewBook`] waiting for an id and a creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub rating: Option<Rating>,
    pub note: String,
}

impl BookDraft {
    pub fn into_book(self, id: BookId, created_at: DateTime<Utc>) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            rating: self.rating,
            note: self.note,
            created_at,
            updated_at: None,
        }
    }
}

// ─── Update input ───────────────────────────────────────────

/// Partial update. Omitted fields are left untouched.
///
/// `rating` has three states: omitted (`None`), cleared (`Some(None)`, sent
/// as JSON `null`), or set (`Some(Some(_))`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<RatingInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BookPatch {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<RatingInput>) -> Self {
        self.rating = Some(Some(rating.into()));
        self
    }

    pub fn clear_rating(mut self) -> Self {
        self.rating = Some(None);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Validate only the supplied fields.
    pub fn validate(&self) -> Result<ValidPatch> {
        let title = self
            .title
            .as_deref()
            .map(|t| required_text("Title", Some(t)))
            .transpose()?;
        let author = self
            .author
            .as_deref()
            .map(|a| required_text("Author", Some(a)))
            .transpose()?;
        let rating = match &self.rating {
            None => None,
            Some(None) => Some(None),
            Some(Some(input)) => Some(input.resolve()?),
        };
        let note = self.note.as_deref().map(|n| n.trim().to_string());

        Ok(ValidPatch {
            title,
            author,
            rating,
            note,
        })
    }
}

/// A validated [`BookPatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<Option<Rating>>,
    pub note: Option<String>,
}

impl ValidPatch {
    /// Apply in place. `updated_at` is set even when nothing else changes.
    pub fn apply(self, book: &mut Book, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
        if let Some(note) = self.note {
            book.note = note;
        }
        book.updated_at = Some(now);
    }
}

fn required_text(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BooklistError::validation(format!("{field} is required"))),
    }
}

/// Distinguishes an explicit `null` from a missing key (serde's `default`
/// covers the missing case).
fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
