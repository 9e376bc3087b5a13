use std::collections::BTreeSet;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::types::{MediaPage, MediaRow, NewMedia, SortOrder};

/// Bound parameters per DELETE statement
const DELETE_CHUNK: usize = 500;

/// Whether an insert failed because the key is already taken
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Insert a media row. Fails with a unique violation if the key exists.
pub async fn insert(pool: &SqlitePool, p: &NewMedia) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO media (key, blob_ref, content_type, extension, size_bytes, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&p.key)
    .bind(&p.blob_ref)
    .bind(&p.content_type)
    .bind(&p.extension)
    .bind(p.size_bytes)
    .bind(p.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get a media row by key
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<MediaRow>, sqlx::Error> {
    sqlx::query_as::<_, MediaRow>(
        r#"
        SELECT key, blob_ref, content_type, extension, size_bytes, created_at
        FROM media
        WHERE key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Count all media rows
pub async fn count(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
        .fetch_one(pool)
        .await?;
    Ok(count.max(0) as u64)
}

/// Fetch one page of media rows in insertion order.
///
/// `page` is 1-based; values below 1 are treated as 1. The count and the
/// page are read inside one transaction so `total_pages` always describes
/// the same snapshot as `records`. Pages past the end are empty.
pub async fn list_page(
    pool: &SqlitePool,
    page: u32,
    page_size: u32,
    order: SortOrder,
) -> Result<MediaPage, sqlx::Error> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let offset = (i64::from(page) - 1) * i64::from(page_size);

    let sql = match order {
        SortOrder::Newest => {
            r#"
            SELECT key, blob_ref, content_type, extension, size_bytes, created_at
            FROM media
            ORDER BY created_at DESC, key DESC
            LIMIT ? OFFSET ?
            "#
        }
        SortOrder::Oldest => {
            r#"
            SELECT key, blob_ref, content_type, extension, size_bytes, created_at
            FROM media
            ORDER BY created_at ASC, key ASC
            LIMIT ? OFFSET ?
            "#
        }
    };

    let mut tx = pool.begin().await?;

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
        .fetch_one(&mut *tx)
        .await?;

    let records = sqlx::query_as::<_, MediaRow>(sql)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;

    let total_count = total_count.max(0) as u64;
    let total_pages = total_count.div_ceil(u64::from(page_size));

    Ok(MediaPage {
        records,
        page,
        page_size,
        total_count,
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
    })
}

/// Delete media rows by key, returning how many rows were removed.
///
/// Unknown keys are ignored.
pub async fn delete_many(pool: &SqlitePool, keys: &BTreeSet<String>) -> Result<u64, sqlx::Error> {
    if keys.is_empty() {
        return Ok(0);
    }

    let keys: Vec<&String> = keys.iter().collect();
    let mut tx = pool.begin().await?;
    let mut deleted = 0;

    for chunk in keys.chunks(DELETE_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM media WHERE key IN (");
        let mut separated = builder.separated(", ");
        for key in chunk {
            separated.push_bind(key.as_str());
        }
        separated.push_unseparated(")");

        deleted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(deleted)
}
