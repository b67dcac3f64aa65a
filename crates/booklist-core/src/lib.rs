//! Record store for a personal reading list: books with a rating and a note,
//! kept as one JSON document and rewritten whole on every change.

pub mod config;
pub mod error;
pub mod models;
pub mod stats;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use error::{BooklistError, ErrorKind, ExitCode, Result, StorageError};
pub use models::*;

pub use stats::{AverageRating, average_rating};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::RecordStore;
