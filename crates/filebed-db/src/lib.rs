pub mod media;
pub mod migrate;
pub mod pool;
pub mod types;

pub use pool::{connect, connect_in_memory};
pub use sqlx::sqlite::SqlitePool;
pub use types::*;
