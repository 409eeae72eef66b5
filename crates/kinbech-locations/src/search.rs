//! Query-side helpers shared by the cache and the autocomplete pipeline.

use kinbech_location_client::{FetchError, LocationKind, LocationService, MIN_QUERY_LEN, SearchHit};
use tracing::debug;

use crate::config::HierarchyScope;

/// Run one search against the service for the given scope.
///
/// Queries shorter than [`MIN_QUERY_LEN`] trimmed characters resolve to an
/// empty set locally, without a network call. In area scope the hits are
/// re-filtered to `area` kind client-side even though the endpoint already
/// filters — a malformed payload must not leak non-leaf nodes into an
/// area-only picker.
pub(crate) async fn run_scope_search<S>(
    service: &S,
    scope: HierarchyScope,
    query: &str,
) -> Result<Vec<SearchHit>, FetchError>
where
    S: LocationService + ?Sized,
{
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }

    let hits = match scope {
        HierarchyScope::AllLevels => service.search_locations(trimmed).await?,
        HierarchyScope::AreaOnly => {
            let hits = service.search_areas(trimmed).await?;
            hits.into_iter()
                .filter(|hit| hit.node.kind == LocationKind::Area)
                .collect()
        }
    };
    debug!(query = trimmed, hits = hits.len(), "location search resolved");
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kinbech_location_client::{
        LocationNode, Province, ProvinceSubtree, fixtures::FixtureService,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn short_queries_never_reach_the_service() {
        let service = FixtureService::new();

        let hits = run_scope_search(&service, HierarchyScope::AreaOnly, "t").await.unwrap();
        assert!(hits.is_empty());
        let hits = run_scope_search(&service, HierarchyScope::AreaOnly, "  t  ").await.unwrap();
        assert!(hits.is_empty(), "whitespace does not count toward the minimum");
        assert_eq!(service.search_calls(), 0);

        // Exactly two characters is the boundary that does trigger a call.
        run_scope_search(&service, HierarchyScope::AreaOnly, "th").await.unwrap();
        assert_eq!(service.search_calls(), 1);
        assert_eq!(service.searched_queries(), vec!["th"]);
    }

    #[tokio::test]
    async fn all_levels_scope_uses_the_wide_search() {
        let service = FixtureService::new();
        let hits = run_scope_search(&service, HierarchyScope::AllLevels, "kathmandu")
            .await
            .unwrap();
        assert!(hits.iter().any(|h| h.node.kind == LocationKind::District));
        assert!(hits.iter().any(|h| h.node.kind == LocationKind::Municipality));
    }

    /// A service whose area search leaks non-area hits, to prove the
    /// client-side safety net.
    struct LeakyService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationService for LeakyService {
        async fn fetch_hierarchy(&self) -> kinbech_location_client::Result<Vec<Province>> {
            Ok(Vec::new())
        }

        async fn fetch_area_roots(&self) -> kinbech_location_client::Result<Vec<LocationNode>> {
            Ok(Vec::new())
        }

        async fn fetch_province_subtree(
            &self,
            _province_id: i64,
        ) -> kinbech_location_client::Result<ProvinceSubtree> {
            Ok(ProvinceSubtree { districts: Vec::new() })
        }

        async fn search_locations(
            &self,
            _query: &str,
        ) -> kinbech_location_client::Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn search_areas(&self, _query: &str) -> kinbech_location_client::Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                SearchHit {
                    node: LocationNode {
                        id: 9,
                        name: "Thamel".to_owned(),
                        kind: LocationKind::Area,
                        parent_id: None,
                    },
                    hierarchy_info: None,
                },
                SearchHit {
                    node: LocationNode {
                        id: 11,
                        name: "Kathmandu".to_owned(),
                        kind: LocationKind::District,
                        parent_id: None,
                    },
                    hierarchy_info: None,
                },
            ])
        }
    }

    #[tokio::test]
    async fn area_scope_filters_leaked_non_area_hits() {
        let service = LeakyService {
            calls: AtomicUsize::new(0),
        };
        let hits = run_scope_search(&service, HierarchyScope::AreaOnly, "kath")
            .await
            .unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.kind, LocationKind::Area);
    }
}
