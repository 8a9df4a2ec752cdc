//! Geodesic radius search around a coordinate or a place name.

use std::sync::Arc;

use tracing::debug;

use mnema_core::geo::geodesic_distance_km;
use mnema_core::{GeoPoint, Geocoder, Item, Result};
use mnema_db::ItemStore;

/// One spatial hit with its distance from the query center.
#[derive(Debug, Clone)]
pub struct SpatialHit {
    pub item: Item,
    pub distance_km: f64,
}

/// Radius search over the geotagged part of the catalog.
#[derive(Clone)]
pub struct SpatialSearcher {
    items: ItemStore,
    geocoder: Arc<dyn Geocoder>,
}

impl SpatialSearcher {
    pub fn new(items: ItemStore, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { items, geocoder }
    }

    /// Consented items within `radius_km` of a coordinate, nearest first.
    pub async fn near(&self, center: GeoPoint, radius_km: f64) -> Result<Vec<SpatialHit>> {
        let mut hits: Vec<SpatialHit> = self
            .items
            .list_geotagged()
            .await?
            .into_iter()
            .filter_map(|item| {
                let position = item.position()?;
                let distance_km = geodesic_distance_km(center, position);
                (distance_km <= radius_km).then_some(SpatialHit { item, distance_km })
            })
            .collect();
        hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        debug!(
            latitude = center.latitude,
            longitude = center.longitude,
            radius_km,
            hits = hits.len(),
            "spatial search"
        );
        Ok(hits)
    }

    /// Items within `radius_km` of a named place.
    ///
    /// Returns the resolved center alongside the hits. An unresolvable
    /// place yields `(None, [])`, not an error.
    pub async fn near_place(
        &self,
        place: &str,
        radius_km: f64,
    ) -> Result<(Option<GeoPoint>, Vec<SpatialHit>)> {
        let Some(center) = self.geocoder.geocode(place).await? else {
            debug!(place, "place did not resolve, empty spatial result");
            return Ok((None, Vec::new()));
        };
        let hits = self.near(center, radius_km).await?;
        Ok((Some(center), hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnema_core::traits::mock::MockGeocoder;
    use mnema_core::{ItemKind, NewItem};
    use mnema_db::Database;

    fn item_at(path: &str, hash: &str, position: Option<(f64, f64)>) -> NewItem {
        NewItem {
            file_path: path.into(),
            file_hash: hash.into(),
            kind: ItemKind::Photo,
            has_consent: true,
            is_rotated: false,
            created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
            latitude: position.map(|p| p.0),
            longitude: position.map(|p| p.1),
            transcript: None,
        }
    }

    async fn searcher_with(geocoder: Arc<MockGeocoder>) -> (SpatialSearcher, ItemStore) {
        let db = Database::connect_in_memory().await.unwrap();
        let items = db.items();
        (SpatialSearcher::new(items.clone(), geocoder), items)
    }

    const ISTANBUL: GeoPoint = GeoPoint { latitude: 41.0082, longitude: 28.9784 };

    #[tokio::test]
    async fn test_near_filters_by_radius() {
        let (searcher, items) = searcher_with(Arc::new(MockGeocoder::new())).await;

        // ~1 km away and ~350 km away
        items
            .create(&item_at("/p/close.jpg", "sha256:a", Some((41.017, 28.978))))
            .await
            .unwrap();
        items
            .create(&item_at("/p/far.jpg", "sha256:b", Some((39.93, 32.86))))
            .await
            .unwrap();
        items
            .create(&item_at("/p/untagged.jpg", "sha256:c", None))
            .await
            .unwrap();

        let hits = searcher.near(ISTANBUL, 5.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.file_path, "/p/close.jpg");
        assert!(hits[0].distance_km < 5.0);
    }

    #[tokio::test]
    async fn test_unconsented_item_nearby_is_invisible() {
        let (searcher, items) = searcher_with(Arc::new(MockGeocoder::new())).await;

        let mut hidden = item_at("/p/hidden.jpg", "sha256:h", Some((41.017, 28.978)));
        hidden.has_consent = false;
        let id = items.create(&hidden).await.unwrap();

        let hits = searcher.near(ISTANBUL, 5.0).await.unwrap();
        assert!(hits.iter().all(|hit| hit.item.id != id));
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_near_sorts_nearest_first() {
        let (searcher, items) = searcher_with(Arc::new(MockGeocoder::new())).await;

        items
            .create(&item_at("/p/b.jpg", "sha256:b", Some((41.03, 28.98))))
            .await
            .unwrap();
        items
            .create(&item_at("/p/a.jpg", "sha256:a", Some((41.01, 28.98))))
            .await
            .unwrap();

        let hits = searcher.near(ISTANBUL, 10.0).await.unwrap();
        assert_eq!(hits[0].item.file_path, "/p/a.jpg");
        assert!(hits[0].distance_km <= hits[1].distance_km);
    }

    #[tokio::test]
    async fn test_near_place_resolves_center() {
        let geocoder = Arc::new(MockGeocoder::new());
        geocoder.insert("Istanbul", ISTANBUL);
        let (searcher, items) = searcher_with(geocoder).await;

        items
            .create(&item_at("/p/a.jpg", "sha256:a", Some((41.01, 28.98))))
            .await
            .unwrap();

        let (center, hits) = searcher.near_place("Istanbul", 20.0).await.unwrap();
        assert!(center.is_some());
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_place_is_empty_not_error() {
        let (searcher, items) = searcher_with(Arc::new(MockGeocoder::new())).await;
        items
            .create(&item_at("/p/a.jpg", "sha256:a", Some((41.01, 28.98))))
            .await
            .unwrap();

        let (center, hits) = searcher.near_place("Atlantis", 20.0).await.unwrap();
        assert!(center.is_none());
        assert!(hits.is_empty());
    }
}
