use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::models::Book;

use super::Storage;

/// The collection as one pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Book>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "data file absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::io(&self.path, e).into()),
        };

        let books: Vec<Book> =
            serde_json::from_str(&contents).map_err(|e| StorageError::json(&self.path, e))?;
        ensure_unique_ids(&books)?;

        debug!(path = %self.path.display(), count = books.len(), "loaded books");
        Ok(books)
    }

    fn save(&self, books: &[Book]) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let json =
            serde_json::to_string_pretty(books).map_err(|e| StorageError::json(&self.path, e))?;

        // Write next to the target so the final rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), count = books.len(), "saved books");
        Ok(())
    }
}

fn ensure_unique_ids(books: &[Book]) -> std::result::Result<(), StorageError> {
    let mut seen = HashSet::with_capacity(books.len());
    for book in books {
        if !seen.insert(book.id.as_str()) {
            return Err(StorageError::Corrupt(format!("duplicate book id {}", book.id)));
        }
    }
    Ok(())
}
