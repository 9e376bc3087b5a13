use sqlx::SqlitePool;
use tracing::{debug, info};

/// Apply pending migrations from `migrations/`; already-applied ones are skipped
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let migrator = sqlx::migrate!();
    debug!(available = migrator.iter().count(), "Applying media store migrations");
    migrator
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    info!("Media store schema is up to date");
    Ok(())
}
