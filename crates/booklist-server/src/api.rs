//! REST routes under `/api/books`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use booklist_core::{AverageRating, Book, BookId, BookPatch, NewBook, RecordStore, Storage};
use serde_json::{Value, json};

use crate::error::ApiError;

pub type SharedStore = Arc<RecordStore<Box<dyn Storage>>>;

#[derive(Clone)]
pub struct AppState {
    store: SharedStore,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/books", get(list_books).post(create_book))
        .route("/api/books/stats", get(rating_stats))
        .route("/api/books/{id}", put(update_book).delete(delete_book))
        .with_state(state)
}

/// Store calls do blocking file I/O, so they run off the async workers.
async fn blocking<T, F>(state: &AppState, failure: &'static str, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&RecordStore<Box<dyn Storage>>) -> booklist_core::Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::internal(failure, e))?
        .map_err(|e| ApiError::from_store(e, failure))
}

async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    let books = blocking(&state, "Failed to read books", |store| store.list()).await?;
    Ok(Json(books))
}

async fn create_book(
    State(state): State<AppState>,
    Json(input): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = blocking(&state, "Failed to add book", move |store| store.add(input)).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>, ApiError> {
    let id = BookId::from(id);
    let book = blocking(&state, "Failed to update book", move |store| {
        store.update(&id, patch)
    })
    .await?;
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = BookId::from(id);
    blocking(&state, "Failed to delete book", move |store| store.remove(&id)).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}

async fn rating_stats(State(state): State<AppState>) -> Result<Json<AverageRating>, ApiError> {
    let avg = blocking(&state, "Failed to read books", |store| store.average_rating()).await?;
    Ok(Json(avg))
}
