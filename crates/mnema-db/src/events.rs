//! Event repository.

use sqlx::SqlitePool;
use tracing::debug;

use mnema_core::{Event, Item, NewEvent, Result};

const EVENT_COLUMNS: &str =
    "id, title, start_date, end_date, main_location, summary, cover_item_id";

/// SQLite implementation of the event repository.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new event, returning its assigned id.
    pub async fn create(&self, event: &NewEvent) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO events (title, start_date, end_date, main_location, summary)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.title)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.main_location)
        .bind(&event.summary)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Fetch an event by id.
    pub async fn get(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = ?",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    /// All events, ordered by start date.
    pub async fn list_all(&self) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events ORDER BY start_date",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    /// Point an event at a cover item. Passing `None` clears the cover.
    pub async fn set_cover(&self, event_id: i64, item_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query("UPDATE events SET cover_item_id = ? WHERE id = ?")
            .bind(item_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assign an item to an event. Passing `None` detaches the item.
    pub async fn assign_item(&self, item_id: i64, event_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET event_id = ? WHERE id = ?")
            .bind(event_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All items assigned to an event, oldest first.
    pub async fn items_of(&self, event_id: i64) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT id, file_path, file_hash, kind, has_consent, is_rotated, \
             created_at, latitude, longitude, transcript, image_index_id, \
             text_index_id, event_id \
             FROM items WHERE event_id = ? ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Delete an event. Member items survive with their `event_id` nulled
    /// by the foreign key. Returns `false` when the event did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(event_id = id, deleted = result.rows_affected() > 0, "event delete");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use mnema_core::{ItemKind, NewItem};

    fn new_event(title: &str) -> NewEvent {
        NewEvent {
            title: title.into(),
            start_date: "2025-06-14T00:00:00Z".parse().unwrap(),
            end_date: "2025-06-16T00:00:00Z".parse().unwrap(),
            main_location: Some("Istanbul".into()),
            summary: None,
        }
    }

    fn new_item(path: &str, hash: &str) -> NewItem {
        NewItem {
            file_path: path.into(),
            file_hash: hash.into(),
            kind: ItemKind::Photo,
            has_consent: true,
            is_rotated: false,
            created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
            latitude: None,
            longitude: None,
            transcript: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::connect_in_memory().await.unwrap();
        let events = db.events();

        let id = events.create(&new_event("Weekend trip")).await.unwrap();
        let event = events.get(id).await.unwrap().unwrap();
        assert_eq!(event.title, "Weekend trip");
        assert_eq!(event.main_location.as_deref(), Some("Istanbul"));
        assert!(event.cover_item_id.is_none());
    }

    #[tokio::test]
    async fn test_assign_and_list_items() {
        let db = Database::connect_in_memory().await.unwrap();
        let events = db.events();
        let items = db.items();

        let event_id = events.create(&new_event("Trip")).await.unwrap();
        let a = items.create(&new_item("/p/a.jpg", "sha256:a")).await.unwrap();
        let b = items.create(&new_item("/p/b.jpg", "sha256:b")).await.unwrap();

        assert!(events.assign_item(a, Some(event_id)).await.unwrap());
        assert!(events.assign_item(b, Some(event_id)).await.unwrap());
        assert_eq!(events.items_of(event_id).await.unwrap().len(), 2);

        assert!(events.assign_item(b, None).await.unwrap());
        assert_eq!(events.items_of(event_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_event_detaches_items() {
        let db = Database::connect_in_memory().await.unwrap();
        let events = db.events();
        let items = db.items();

        let event_id = events.create(&new_event("Trip")).await.unwrap();
        let item_id = items.create(&new_item("/p/a.jpg", "sha256:a")).await.unwrap();
        events.assign_item(item_id, Some(event_id)).await.unwrap();

        assert!(events.delete(event_id).await.unwrap());

        // Item survives, back-reference is gone
        let item = items.get(item_id).await.unwrap().unwrap();
        assert!(item.event_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_cover_item_clears_reference() {
        let db = Database::connect_in_memory().await.unwrap();
        let events = db.events();
        let items = db.items();

        let event_id = events.create(&new_event("Trip")).await.unwrap();
        let item_id = items.create(&new_item("/p/a.jpg", "sha256:a")).await.unwrap();
        events.set_cover(event_id, Some(item_id)).await.unwrap();

        items.delete(item_id).await.unwrap();

        let event = events.get(event_id).await.unwrap().unwrap();
        assert!(event.cover_item_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_event() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.events().delete(404).await.unwrap());
    }
}
