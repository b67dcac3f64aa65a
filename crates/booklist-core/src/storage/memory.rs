use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::Result;
use crate::models::Book;

use super::Storage;

/// In-process storage with the same whole-collection contract as the file
/// adapter. Counts saves so callers can check how often a collection was written.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    books: RwLock<Vec<Book>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: RwLock::new(books),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of what is currently "persisted".
    pub fn snapshot(&self) -> Vec<Book> {
        self.books.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Vec<Book>> {
        Ok(self.snapshot())
    }

    fn save(&self, books: &[Book]) -> Result<()> {
        let mut guard = self.books.write().unwrap_or_else(PoisonError::into_inner);
        *guard = books.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
