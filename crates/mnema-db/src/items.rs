//! Item repository.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::debug;

use mnema_core::{DateRange, EmbeddingSpace, Error, Item, NewItem, Result};

/// All columns of the items table, in `Item` field order.
const ITEM_COLUMNS: &str = "id, file_path, file_hash, kind, has_consent, is_rotated, \
     created_at, latitude, longitude, transcript, image_index_id, text_index_id, event_id";

/// Compute the catalog content hash of plaintext bytes.
///
/// Always computed over the bytes *before* encryption, so the same content
/// hashes identically regardless of nonce.
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// SQLite implementation of the item repository.
#[derive(Debug, Clone)]
pub struct ItemStore {
    pool: SqlitePool,
}

impl ItemStore {
    /// Create a new ItemStore with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new item row, returning its assigned id.
    ///
    /// Uniqueness of `file_path` and `file_hash` is enforced by the schema;
    /// callers check for duplicates first and treat them as a status, not
    /// an error.
    pub async fn create(&self, item: &NewItem) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO items
                (file_path, file_hash, kind, has_consent, is_rotated,
                 created_at, latitude, longitude, transcript)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.file_path)
        .bind(&item.file_hash)
        .bind(item.kind)
        .bind(item.has_consent)
        .bind(item.is_rotated)
        .bind(item.created_at)
        .bind(item.latitude)
        .bind(item.longitude)
        .bind(&item.transcript)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Fetch an item by id.
    pub async fn get(&self, id: i64) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Fetch an item by its content hash.
    pub async fn get_by_hash(&self, file_hash: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE file_hash = ?",
            ITEM_COLUMNS
        ))
        .bind(file_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Fetch an item by its file path.
    pub async fn get_by_path(&self, file_path: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE file_path = ?",
            ITEM_COLUMNS
        ))
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Current consent flag of an item, `None` if the item does not exist.
    pub async fn consent_of(&self, id: i64) -> Result<Option<bool>> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT has_consent FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(consent,)| consent))
    }

    /// Update the consent flag. Returns `false` when the item is missing
    /// (callers treat that as a no-op, not an error).
    pub async fn set_consent(&self, id: i64, consent: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET has_consent = ? WHERE id = ?")
            .bind(consent)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the vector-index internal id for an item in one space.
    ///
    /// The mapping is set exactly once: overwriting an existing id would
    /// orphan a live index slot, so a second write is rejected.
    pub async fn set_index_id(&self, id: i64, space: EmbeddingSpace, internal_id: i64) -> Result<()> {
        let column = match space {
            EmbeddingSpace::Image => "image_index_id",
            EmbeddingSpace::Text => "text_index_id",
        };

        let result = sqlx::query(&format!(
            "UPDATE items SET {} = ? WHERE id = ? AND {} IS NULL",
            column, column
        ))
        .bind(internal_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(_) => Err(Error::Index(format!(
                    "item {} already has a {} index id",
                    id, space
                ))),
                None => Err(Error::ItemNotFound(id)),
            };
        }
        Ok(())
    }

    /// Null the index mapping of every item in one space. Only a rebuild
    /// calls this; the set-once rule starts over afterwards.
    pub async fn clear_index_ids(&self, space: EmbeddingSpace) -> Result<()> {
        let column = match space {
            EmbeddingSpace::Image => "image_index_id",
            EmbeddingSpace::Text => "text_index_id",
        };
        sqlx::query(&format!("UPDATE items SET {} = NULL", column))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Consented items whose creation timestamp falls in the range,
    /// newest first. The consent predicate lives in the query so no
    /// search path can see a revoked item even before fusion.
    pub async fn list_in_range(&self, range: &DateRange) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE has_consent = 1 \
             AND created_at >= ? AND created_at < ? \
             ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Consented items carrying GPS coordinates.
    pub async fn list_geotagged(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE has_consent = 1 \
             AND latitude IS NOT NULL AND longitude IS NOT NULL",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Every item in the catalog, oldest first.
    pub async fn list_all(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items ORDER BY id",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Creation timestamps of all items (timeline statistics input).
    pub async fn list_timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as("SELECT created_at FROM items")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(ts,)| ts).collect())
    }

    /// Counts of (consented, total) items.
    pub async fn consent_counts(&self) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(has_consent), 0), COUNT(*) FROM items",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete an item row. Any event using it as cover photo loses the
    /// reference first. Returns `false` when the item did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        sqlx::query("UPDATE events SET cover_item_id = NULL WHERE cover_item_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(item_id = id, deleted = result.rows_affected() > 0, "item delete");
        Ok(result.rows_affected() > 0)
    }
}
