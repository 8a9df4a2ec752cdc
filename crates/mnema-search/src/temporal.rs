//! Date-range search and timeline statistics.

use tracing::debug;

use mnema_core::{DateRange, Item, Result, TimelineStats};
use mnema_db::ItemStore;

/// Answers "what happened in this interval" queries from the catalog.
#[derive(Clone)]
pub struct TemporalSearcher {
    items: ItemStore,
}

impl TemporalSearcher {
    pub fn new(items: ItemStore) -> Self {
        Self { items }
    }

    /// Consented items inside the half-open range, newest first.
    pub async fn search(&self, range: &DateRange) -> Result<Vec<Item>> {
        let items = self.items.list_in_range(range).await?;
        debug!(start = %range.start, end = %range.end, hits = items.len(), "temporal search");
        Ok(items)
    }

    /// Per-year and per-month item counts over the whole catalog.
    pub async fn timeline(&self) -> Result<TimelineStats> {
        let mut stats = TimelineStats::default();
        for timestamp in self.items.list_timestamps().await? {
            stats.record(timestamp);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnema_core::{ItemKind, NewItem};
    use mnema_db::Database;

    fn item_at(path: &str, hash: &str, timestamp: &str) -> NewItem {
        NewItem {
            file_path: path.into(),
            file_hash: hash.into(),
            kind: ItemKind::Photo,
            has_consent: true,
            is_rotated: false,
            created_at: timestamp.parse().unwrap(),
            latitude: None,
            longitude: None,
            transcript: None,
        }
    }

    #[tokio::test]
    async fn test_range_is_half_open() {
        let db = Database::connect_in_memory().await.unwrap();
        let items = db.items();
        items
            .create(&item_at("/p/a.jpg", "sha256:a", "2025-01-01T00:00:00Z"))
            .await
            .unwrap();
        items
            .create(&item_at("/p/b.jpg", "sha256:b", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        let searcher = TemporalSearcher::new(items);
        let hits = searcher.search(&DateRange::year(2025).unwrap()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "/p/a.jpg");
    }

    #[tokio::test]
    async fn test_unconsented_item_in_range_is_invisible() {
        let db = Database::connect_in_memory().await.unwrap();
        let items = db.items();
        let mut hidden = item_at("/p/hidden.jpg", "sha256:h", "2025-03-01T00:00:00Z");
        hidden.has_consent = false;
        let id = items.create(&hidden).await.unwrap();

        let searcher = TemporalSearcher::new(items);
        let hits = searcher.search(&DateRange::year(2025).unwrap()).await.unwrap();
        assert!(hits.iter().all(|item| item.id != id));
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_timeline_counts() {
        let db = Database::connect_in_memory().await.unwrap();
        let items = db.items();
        items
            .create(&item_at("/p/a.jpg", "sha256:a", "2025-06-01T00:00:00Z"))
            .await
            .unwrap();
        items
            .create(&item_at("/p/b.jpg", "sha256:b", "2025-06-15T00:00:00Z"))
            .await
            .unwrap();
        items
            .create(&item_at("/p/c.jpg", "sha256:c", "2024-12-31T00:00:00Z"))
            .await
            .unwrap();

        let stats = TemporalSearcher::new(items).timeline().await.unwrap();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.items_by_year[&2025], 2);
        assert_eq!(stats.items_by_year[&2024], 1);
        assert_eq!(stats.earliest.unwrap(), "2024-12-31T00:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
    }
}
