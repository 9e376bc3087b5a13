//! File bed server
//!
//! Uploads are relayed to a Telegram chat and recorded in SQLite under a
//! short key; reads re-resolve the stored reference and stream the bytes
//! back through a response cache.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod gallery;
pub mod ingest;
pub mod keys;
pub mod pages;
pub mod resolve;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result, ServerError};
pub use server::{create_router, start_server};
pub use state::{AppState, SharedState};
