use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::info;

use crate::error::{BooklistError, Result};
use crate::models::{Book, BookId, BookPatch, NewBook};
use crate::stats::{self, AverageRating};
use crate::storage::Storage;

/// Owner of the canonical book collection.
///
/// Every operation loads the full collection from its [`Storage`]; mutating
/// operations then write the full collection back. Mutations are serialized
/// by a store-wide writer lock held across the whole load → mutate → save
/// sequence, so two overlapping writers cannot lose each other's changes.
/// Reads never take the lock.
#[derive(Debug)]
pub struct RecordStore<S> {
    storage: S,
    writer: Mutex<()>,
}

impl<S: Storage> RecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            writer: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All books, in insertion order.
    pub fn list(&self) -> Result<Vec<Book>> {
        self.storage.load()
    }

    pub fn get(&self, id: &BookId) -> Result<Book> {
        self.storage
            .load()?
            .into_iter()
            .find(|b| &b.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Validate, assign an id, append and persist.
    pub fn add(&self, input: NewBook) -> Result<Book> {
        let draft = input.validate()?;

        let _guard = self.lock_writer();
        let mut books = self.storage.load()?;
        let id = unique_id(&books);
        let book = draft.into_book(id, Utc::now());
        books.push(book.clone());
        self.storage.save(&books)?;

        info!(id = %book.id, title = %book.title, "book added");
        Ok(book)
    }

    /// Apply the supplied fields of `patch` to the book with `id`.
    ///
    /// An unknown id is reported before the patch is validated; neither
    /// failure touches the collection or storage.
    pub fn update(&self, id: &BookId, patch: BookPatch) -> Result<Book> {
        let _guard = self.lock_writer();
        let mut books = self.storage.load()?;
        let book = books
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| not_found(id))?;
        let patch = patch.validate()?;
        patch.apply(book, Utc::now());
        let updated = book.clone();
        self.storage.save(&books)?;

        info!(id = %updated.id, "book updated");
        Ok(updated)
    }

    /// Delete the book with `id` and return it. Storage is not written when
    /// the id is unknown.
    pub fn remove(&self, id: &BookId) -> Result<Book> {
        let _guard = self.lock_writer();
        let mut books = self.storage.load()?;
        let index = books
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| not_found(id))?;
        let removed = books.remove(index);
        self.storage.save(&books)?;

        info!(id = %removed.id, "book removed");
        Ok(removed)
    }

    /// Average over the current collection, recomputed on every call.
    pub fn average_rating(&self) -> Result<AverageRating> {
        Ok(stats::average_rating(&self.storage.load()?))
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &BookId) -> BooklistError {
    BooklistError::BookNotFound(id.to_string())
}

fn unique_id(books: &[Book]) -> BookId {
    let taken: HashSet<&str> = books.iter().map(|b| b.id.as_str()).collect();
    loop {
        let id = BookId::generate();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StorageError};
    use crate::models::Rating;
    use crate::storage::MemoryStorage;

    fn store() -> RecordStore<MemoryStorage> {
        RecordStore::new(MemoryStorage::new())
    }

    /// Loads fine, refuses every save.
    struct ReadOnlyStorage(MemoryStorage);

    impl Storage for ReadOnlyStorage {
        fn load(&self) -> Result<Vec<Book>> {
            self.0.load()
        }

        fn save(&self, _books: &[Book]) -> Result<()> {
            Err(StorageError::io("books.json", std::io::Error::other("disk full")).into())
        }
    }

    #[test]
    fn test_add_assigns_unique_ids_and_keeps_order() {
        let store = store();
        let a = store.add(NewBook::new("A", "X")).unwrap();
        let b = store.add(NewBook::new("B", "Y")).unwrap();
        let c = store.add(NewBook::new("C", "Z")).unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        let titles: Vec<_> = store.list().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["A", "B", "C"]);
    }

    #[test]
    fn test_add_accepts_every_whole_rating() {
        let store = store();
        for r in 1..=5u8 {
            let book = store.add(NewBook::new("T", "A").with_rating(r)).unwrap();
            assert_eq!(book.rating.map(Rating::get), Some(r));
        }
    }

    #[test]
    fn test_add_rejects_bad_input_without_writing() {
        let store = store();
        let bad = [
            NewBook::new("T", "A").with_rating(0),
            NewBook::new("T", "A").with_rating(6),
            NewBook::new("T", "A").with_rating(3.5),
            NewBook::new("", "A"),
            NewBook::new("   ", "A"),
            NewBook::new("T", " "),
        ];
        for input in bad {
            let err = store.add(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(store.storage().save_count(), 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_trims_text_fields() {
        let store = store();
        let book = store
            .add(NewBook::new("  Dune  ", " Herbert ").with_note("  spice  "))
            .unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.note, "spice");
        assert_eq!(book.updated_at, None);
    }

    #[test]
    fn test_add_persists_exactly_once() {
        let store = store();
        let book = store.add(NewBook::new("Dune", "Herbert")).unwrap();
        assert_eq!(store.storage().save_count(), 1);
        assert_eq!(store.storage().snapshot(), vec![book]);
    }

    #[test]
    fn test_update_only_note() {
        let store = store();
        let book = store
            .add(NewBook::new("Dune", "Herbert").with_rating(5))
            .unwrap();

        let updated = store
            .update(&book.id, BookPatch::default().with_note(" reread "))
            .unwrap();
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.author, "Herbert");
        assert_eq!(updated.rating, book.rating);
        assert_eq!(updated.note, "reread");
        assert_eq!(updated.created_at, book.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(store.get(&book.id).unwrap(), updated);
    }

    #[test]
    fn test_update_with_empty_patch_still_touches_updated_at() {
        let store = store();
        let book = store.add(NewBook::new("Dune", "Herbert")).unwrap();
        let updated = store.update(&book.id, BookPatch::default()).unwrap();
        assert!(updated.updated_at.is_some());
        assert!(updated.updated_at.unwrap() >= updated.created_at);
    }

    #[test]
    fn test_update_can_clear_rating() {
        let store = store();
        let book = store.add(NewBook::new("T", "A").with_rating(2)).unwrap();
        let updated = store
            .update(&book.id, BookPatch::default().clear_rating())
            .unwrap();
        assert_eq!(updated.rating, None);
    }

    #[test]
    fn test_update_keeps_position() {
        let store = store();
        let first = store.add(NewBook::new("First", "A")).unwrap();
        store.add(NewBook::new("Second", "B")).unwrap();
        store
            .update(&first.id, BookPatch::default().with_title("Renamed"))
            .unwrap();
        assert_eq!(store.list().unwrap()[0].title, "Renamed");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let store = store();
        store.add(NewBook::new("Dune", "Herbert")).unwrap();
        let before = store.storage().snapshot();

        let err = store
            .update(&BookId::from("missing"), BookPatch::default().with_note("x"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.storage().save_count(), 1);
        assert_eq!(store.storage().snapshot(), before);
    }

    #[test]
    fn test_update_unknown_id_wins_over_invalid_patch() {
        let store = store();
        store.add(NewBook::new("Dune", "Herbert")).unwrap();

        let err = store
            .update(&BookId::from("missing"), BookPatch::default().with_rating(9))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn test_update_rejects_invalid_supplied_fields() {
        let store = store();
        let book = store.add(NewBook::new("Dune", "Herbert")).unwrap();
        for patch in [
            BookPatch::default().with_title(""),
            BookPatch::default().with_author("  "),
            BookPatch::default().with_rating(9),
        ] {
            let err = store.update(&book.id, patch).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(store.get(&book.id).unwrap(), book);
    }

    #[test]
    fn test_remove_drops_exactly_one() {
        let store = store();
        let a = store.add(NewBook::new("A", "X")).unwrap();
        let b = store.add(NewBook::new("B", "Y")).unwrap();

        let removed = store.remove(&a.id).unwrap();
        assert_eq!(removed, a);
        assert_eq!(store.list().unwrap(), vec![b.clone()]);
        assert_eq!(store.storage().snapshot(), vec![b]);
    }

    #[test]
    fn test_remove_unknown_id_does_not_write() {
        let store = store();
        store.add(NewBook::new("A", "X")).unwrap();
        let err = store.remove(&BookId::from("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn test_failed_save_is_not_committed() {
        let seed = store();
        let book = seed.add(NewBook::new("Dune", "Herbert")).unwrap();
        let storage = ReadOnlyStorage(MemoryStorage::with_books(vec![book.clone()]));
        let store = RecordStore::new(storage);

        let err = store.add(NewBook::new("Emma", "Austen")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(store.update(&book.id, BookPatch::default().with_note("x")).is_err());
        assert!(store.remove(&book.id).is_err());
        assert_eq!(store.list().unwrap(), vec![book]);
    }

    #[test]
    fn test_average_rating_recomputed() {
        let store = store();
        assert_eq!(store.average_rating().unwrap(), AverageRating::NoRatings);

        store.add(NewBook::new("A", "X").with_rating(4)).unwrap();
        store.add(NewBook::new("B", "X").with_rating(5)).unwrap();
        let c = store.add(NewBook::new("C", "X").with_rating(3)).unwrap();
        store.add(NewBook::new("D", "X")).unwrap();
        assert_eq!(
            store.average_rating().unwrap(),
            AverageRating::Rated { mean: 4.0, count: 3 }
        );

        store.remove(&c.id).unwrap();
        assert_eq!(
            store.average_rating().unwrap(),
            AverageRating::Rated { mean: 4.5, count: 2 }
        );
    }

    #[test]
    fn test_unique_id_skips_taken() {
        let store = store();
        let book = store.add(NewBook::new("A", "X")).unwrap();
        let books = store.list().unwrap();
        assert_ne!(unique_id(&books), book.id);
    }
}
