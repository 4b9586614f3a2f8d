//! Studio directory and availability API.
//!
//! Serves `/studios/search`, `/studios/{id}` and `/studios/{id}/availability`
//! from a SQLite database of venues, rooms and open slots.

pub mod checker;
pub mod db;
pub mod error;
pub mod routes;
pub mod search;

pub use error::ApiError;

use axum::{routing::get, Router};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/studios/search", get(routes::search_studios))
        .route("/studios/{id}", get(routes::get_studio))
        .route("/studios/{id}/availability", get(routes::studio_availability))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
