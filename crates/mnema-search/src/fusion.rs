//! Multi-filter search with intersection semantics.
//!
//! A fused query may carry any combination of a free-text clause, a date
//! range, and a spatial clause (place name or raw coordinate). Each
//! present clause runs as its own sub-search; with two or more clauses
//! the result is the intersection of their item sets, so every returned
//! item satisfies every filter.

use std::collections::{HashMap, HashSet};

use tracing::{info, instrument};

use mnema_core::defaults::{PLACE_SEARCH_RADIUS_KM, SEARCH_K, SEARCH_RADIUS_KM};
use mnema_core::{DateRange, GeoPoint, Item, Result};
use mnema_db::ItemStore;

use crate::semantic::SemanticSearcher;
use crate::spatial::SpatialSearcher;
use crate::temporal::TemporalSearcher;

/// One fused query. Absent fields simply do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct FusedQuery {
    /// Free-text clause for semantic search.
    pub text: Option<String>,
    /// Date-range clause.
    pub range: Option<DateRange>,
    /// Place-name clause, resolved through the geocoder.
    pub place: Option<String>,
    /// Raw coordinate clause. Ignored when `place` is set.
    pub center: Option<GeoPoint>,
    /// Radius override for the spatial clause, in kilometers.
    pub radius_km: Option<f64>,
    /// Result cap. Zero means the default.
    pub k: usize,
}

impl FusedQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            text: Some(query.into()),
            ..Self::default()
        }
    }

    fn limit(&self) -> usize {
        if self.k == 0 {
            SEARCH_K
        } else {
            self.k
        }
    }

    fn has_spatial(&self) -> bool {
        self.place.is_some() || self.center.is_some()
    }
}

/// One result item. `score` is present only when the semantic clause
/// contributed; other clauses are binary filters.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: Item,
    pub score: Option<f32>,
}

/// Outcome of a fused query.
#[derive(Debug, Clone, Default)]
pub struct FusedResults {
    pub items: Vec<ScoredItem>,
    /// Names of the clauses that actually ran, e.g. `["semantic", "temporal"]`.
    pub filters_applied: Vec<String>,
    /// Coordinate a place clause resolved to, when it did.
    pub resolved_center: Option<GeoPoint>,
}

/// Runs fused queries against the sub-searchers.
///
/// Every sub-search already consent-filters its own candidates; the
/// hydration loop here re-checks the flag as a second gate, so items
/// whose consent is off are dropped before the cap and callers can
/// never tell a revoked item from an absent one.
pub struct SearchEngine {
    items: ItemStore,
    semantic: SemanticSearcher,
    temporal: TemporalSearcher,
    spatial: SpatialSearcher,
}

impl SearchEngine {
    pub fn new(
        items: ItemStore,
        semantic: SemanticSearcher,
        temporal: TemporalSearcher,
        spatial: SpatialSearcher,
    ) -> Self {
        Self {
            items,
            semantic,
            temporal,
            spatial,
        }
    }

    #[instrument(skip(self, query), fields(k = query.limit()))]
    pub async fn search(&self, query: &FusedQuery) -> Result<FusedResults> {
        let k = query.limit();
        let mut results = FusedResults::default();

        // Ordered candidate list per clause; the first clause's ordering
        // wins after intersection.
        let mut family_ids: Vec<Vec<i64>> = Vec::new();
        let mut scores: HashMap<i64, f32> = HashMap::new();
        let mut hydrated: HashMap<i64, Item> = HashMap::new();

        if let Some(text) = &query.text {
            let hits = self.semantic.search(text, k).await?;
            family_ids.push(hits.iter().map(|&(id, _)| id).collect());
            scores.extend(hits);
            results.filters_applied.push("semantic".to_string());
        }

        if let Some(range) = &query.range {
            let items = self.temporal.search(range).await?;
            family_ids.push(items.iter().map(|item| item.id).collect());
            hydrated.extend(items.into_iter().map(|item| (item.id, item)));
            results.filters_applied.push("temporal".to_string());
        }

        if query.has_spatial() {
            let hits = if let Some(place) = &query.place {
                let radius = query.radius_km.unwrap_or(PLACE_SEARCH_RADIUS_KM);
                let (center, hits) = self.spatial.near_place(place, radius).await?;
                results.resolved_center = center;
                hits
            } else {
                let radius = query.radius_km.unwrap_or(SEARCH_RADIUS_KM);
                let center = query.center.ok_or_else(|| {
                    mnema_core::Error::InvalidInput("spatial clause without center".to_string())
                })?;
                results.resolved_center = Some(center);
                self.spatial.near(center, radius).await?
            };
            family_ids.push(hits.iter().map(|hit| hit.item.id).collect());
            hydrated.extend(hits.into_iter().map(|hit| (hit.item.id, hit.item)));
            results.filters_applied.push("spatial".to_string());
        }

        if family_ids.is_empty() {
            return Ok(results);
        }

        // Intersect across clauses, preserving the first clause's order.
        // A single clause yields no set and filters nothing.
        let survivors: Option<HashSet<i64>> = family_ids[1..]
            .iter()
            .map(|ids| ids.iter().copied().collect::<HashSet<i64>>())
            .reduce(|a, b| a.intersection(&b).copied().collect());

        let mut seen = HashSet::new();
        for id in &family_ids[0] {
            if results.items.len() >= k {
                break;
            }
            if let Some(survivors) = &survivors {
                if !survivors.contains(id) {
                    continue;
                }
            }
            if !seen.insert(*id) {
                continue;
            }

            let item = match hydrated.remove(id) {
                Some(item) => item,
                None => match self.items.get(*id).await? {
                    Some(item) => item,
                    // Index hit for a row deleted since indexing
                    None => continue,
                },
            };
            if !item.has_consent {
                continue;
            }
            results.items.push(ScoredItem {
                score: scores.get(id).copied(),
                item,
            });
        }

        info!(
            filters = ?results.filters_applied,
            hits = results.items.len(),
            "fused search"
        );
        Ok(results)
    }
}
