//! Persistence adapters. Every adapter loads and saves the whole collection.

mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use crate::models::Book;

/// Durable home of the book collection.
///
/// `load` on a location that does not exist yet returns an empty collection.
/// `save` replaces the persisted collection in one step: a reader sees either
/// the old collection or the new one, never a mix.
pub trait Storage: Send + Sync {
    fn load(&self) -> Result<Vec<Book>>;
    fn save(&self, books: &[Book]) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn load(&self) -> Result<Vec<Book>> {
        (**self).load()
    }

    fn save(&self, books: &[Book]) -> Result<()> {
        (**self).save(books)
    }
}
