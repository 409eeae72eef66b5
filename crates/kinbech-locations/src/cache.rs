//! Partially materialized hierarchy tree and its fetch discipline.
//!
//! The tree is loaded in two strokes: the province roots once, eagerly, and
//! each province's district→municipality→ward→area subtree on first
//! expansion. Both strokes coalesce concurrent callers onto a single
//! in-flight request, and both leave the cache untouched on failure so a
//! retry simply re-fetches.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use kinbech_location_client::{
    FetchError, LocationNode, LocationService, ProvinceSubtree, SearchHit,
};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::{config::HierarchyScope, search::run_scope_search};

type SubtreeCell = Arc<OnceCell<Arc<ProvinceSubtree>>>;

/// Owns the hierarchy tree; the only place that mutates it.
///
/// The scope is fixed at construction, so idempotency of the root load is per
/// scope by construction: one cache, one backing root query.
pub struct HierarchyCache<S> {
    service: Arc<S>,
    scope: HierarchyScope,
    roots: OnceCell<Arc<Vec<LocationNode>>>,
    subtrees: Mutex<AHashMap<i64, SubtreeCell>>,
}

impl<S: LocationService> HierarchyCache<S> {
    pub fn new(service: Arc<S>, scope: HierarchyScope) -> Self {
        Self {
            service,
            scope,
            roots: OnceCell::new(),
            subtrees: Mutex::new(AHashMap::new()),
        }
    }

    pub fn scope(&self) -> HierarchyScope {
        self.scope
    }

    /// Fetch the province roots, once.
    ///
    /// Concurrent callers before resolution share a single service call and
    /// observe the same set. After a failure the cell stays empty, so calling
    /// again retries.
    #[instrument(name = "Load hierarchy roots", level = "debug", skip(self))]
    pub async fn load_root(&self) -> Result<Arc<Vec<LocationNode>>, FetchError> {
        self.roots
            .get_or_try_init(|| async {
                let nodes = match self.scope {
                    HierarchyScope::AreaOnly => self.service.fetch_area_roots().await?,
                    HierarchyScope::AllLevels => self
                        .service
                        .fetch_hierarchy()
                        .await?
                        .into_iter()
                        .map(|province| province.node)
                        .collect(),
                };
                debug!(provinces = nodes.len(), "hierarchy roots loaded");
                Ok(Arc::new(nodes))
            })
            .await
            .cloned()
    }

    /// The cached province roots, if loaded.
    pub fn provinces(&self) -> Option<Arc<Vec<LocationNode>>> {
        self.roots.get().cloned()
    }

    /// Fetch one province's subtree, once.
    ///
    /// Concurrent expansions of the same province coalesce onto one request;
    /// different provinces proceed independently. An already expanded
    /// province resolves immediately from cache. The fetched subtree is
    /// stored wholesale — never merged into a previous one — so a re-fetch
    /// can never duplicate children.
    #[instrument(name = "Expand province", level = "debug", skip(self))]
    pub async fn expand_province(&self, province_id: i64) -> Result<Arc<ProvinceSubtree>, FetchError> {
        let cell = {
            let mut subtrees = self.subtrees.lock().expect("subtree lock poisoned");
            Arc::clone(subtrees.entry(province_id).or_default())
        };

        cell.get_or_try_init(|| async {
            let subtree = self.service.fetch_province_subtree(province_id).await?;
            debug!(
                province_id,
                districts = subtree.districts.len(),
                "province subtree loaded"
            );
            Ok(Arc::new(subtree))
        })
        .await
        .cloned()
    }

    /// The cached subtree for a province, if expanded.
    pub fn subtree(&self, province_id: i64) -> Option<Arc<ProvinceSubtree>> {
        let subtrees = self.subtrees.lock().expect("subtree lock poisoned");
        subtrees.get(&province_id).and_then(|cell| cell.get().cloned())
    }

    pub fn is_expanded(&self, province_id: i64) -> bool {
        self.subtree(province_id).is_some()
    }

    /// Scope-appropriate search; see [`run_scope_search`] for the guards.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, FetchError> {
        run_scope_search(self.service.as_ref(), self.scope, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinbech_location_client::fixtures::FixtureService;

    fn area_cache(service: &Arc<FixtureService>) -> HierarchyCache<FixtureService> {
        HierarchyCache::new(Arc::clone(service), HierarchyScope::AreaOnly)
    }

    #[tokio::test]
    async fn concurrent_root_loads_share_one_call() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        let (a, b) = tokio::join!(cache.load_root(), cache.load_root());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a, b, "both callers observe the same set");
        assert_eq!(service.area_root_calls(), 1);

        // Repeat loads after resolution stay off the network too.
        cache.load_root().await.unwrap();
        assert_eq!(service.area_root_calls(), 1);
    }

    #[tokio::test]
    async fn all_levels_scope_loads_through_the_full_hierarchy() {
        let service = Arc::new(FixtureService::new());
        let cache = HierarchyCache::new(Arc::clone(&service), HierarchyScope::AllLevels);

        let roots = cache.load_root().await.unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(service.hierarchy_calls(), 1);
        assert_eq!(service.area_root_calls(), 0);
    }

    #[tokio::test]
    async fn failed_root_load_is_retryable() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        service.set_roots_failing(true);
        assert!(cache.load_root().await.is_err());
        assert!(cache.provinces().is_none(), "nothing cached after failure");

        service.set_roots_failing(false);
        assert!(cache.load_root().await.is_ok());
        assert_eq!(cache.provinces().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_expansions_of_one_province_coalesce() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        let (a, b) = tokio::join!(cache.expand_province(1), cache.expand_province(1));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(service.subtree_calls(), 1);

        // A different province is its own request.
        cache.expand_province(2).await.unwrap();
        assert_eq!(service.subtree_calls(), 2);
        assert!(cache.is_expanded(1));
        assert!(cache.is_expanded(2));
    }

    #[tokio::test]
    async fn expansion_is_a_noop_once_cached() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        cache.expand_province(1).await.unwrap();
        cache.expand_province(1).await.unwrap();
        assert_eq!(service.subtree_calls(), 1);
    }

    #[tokio::test]
    async fn failed_expansion_leaves_province_unexpanded() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        service.set_subtree_failing(1);
        assert!(cache.expand_province(1).await.is_err());
        assert!(!cache.is_expanded(1), "prior state retained for retry");

        service.clear_failing_subtree(1);
        let subtree = cache.expand_province(1).await.unwrap();
        assert_eq!(subtree.districts[0].node.id, 11);
    }

    #[tokio::test]
    async fn search_delegates_with_scope_guards() {
        let service = Arc::new(FixtureService::new());
        let cache = area_cache(&service);

        assert!(cache.search("t").await.unwrap().is_empty());
        assert_eq!(service.search_calls(), 0);

        let hits = cache.search("thamel").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node.id, 9);
    }
}
