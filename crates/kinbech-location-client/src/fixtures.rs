//! Deterministic in-memory [`LocationService`] used by tests across the
//! workspace.
//!
//! The dataset is a small slice of Nepal's hierarchy with stable ids, plus
//! enough instrumentation to assert on network behavior: per-endpoint call
//! counters, a log of issued search queries, response gates for forcing
//! response-arrival order, and failure injection for the fetch paths.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{
    error::{FetchError, Result},
    model::{District, LocationKind, LocationNode, Municipality, Province, ProvinceSubtree, SearchHit, Ward},
    service::LocationService,
};

fn node(id: i64, name: &str, kind: LocationKind, parent_id: Option<i64>) -> LocationNode {
    LocationNode {
        id,
        name: name.to_owned(),
        kind,
        parent_id,
    }
}

fn area(id: i64, name: &str) -> LocationNode {
    node(id, name, LocationKind::Area, None)
}

/// Build the fixture hierarchy. Ids are chosen so the common walk reads
/// naturally in tests: province 1 → district 11 → municipality 111 →
/// ward 3 → area 9.
fn nepal_provinces() -> Vec<Province> {
    vec![
        Province {
            node: node(1, "Bagmati", LocationKind::Province, None),
            districts: Some(vec![
                District {
                    node: node(11, "Kathmandu", LocationKind::District, Some(1)),
                    municipalities: Some(vec![
                        Municipality {
                            node: node(
                                111,
                                "Kathmandu Metropolitan City",
                                LocationKind::Municipality,
                                Some(11),
                            ),
                            wards: Some(vec![
                                Ward {
                                    ward_number: 3,
                                    areas: Some(vec![area(9, "Thamel"), area(10, "Chhetrapati")]),
                                },
                                Ward {
                                    ward_number: 1,
                                    areas: Some(vec![area(13, "Naxal")]),
                                },
                            ]),
                        },
                        Municipality {
                            node: node(
                                112,
                                "Lalitpur Metropolitan City",
                                LocationKind::Municipality,
                                Some(11),
                            ),
                            wards: Some(vec![Ward {
                                ward_number: 3,
                                areas: Some(vec![area(22, "Patan Durbar Square")]),
                            }]),
                        },
                    ]),
                },
                District {
                    node: node(12, "Bhaktapur", LocationKind::District, Some(1)),
                    municipalities: Some(vec![Municipality {
                        node: node(121, "Bhaktapur Municipality", LocationKind::Municipality, Some(12)),
                        wards: Some(vec![Ward {
                            ward_number: 4,
                            areas: Some(vec![area(31, "Durbar Square")]),
                        }]),
                    }]),
                },
            ]),
        },
        Province {
            node: node(2, "Gandaki", LocationKind::Province, None),
            districts: Some(vec![District {
                node: node(21, "Kaski", LocationKind::District, Some(2)),
                municipalities: Some(vec![Municipality {
                    node: node(211, "Pokhara Metropolitan City", LocationKind::Municipality, Some(21)),
                    wards: Some(vec![Ward {
                        ward_number: 6,
                        areas: Some(vec![area(41, "Lakeside")]),
                    }]),
                }]),
            }]),
        },
    ]
}

/// In-memory location service with call accounting.
pub struct FixtureService {
    provinces: Vec<Province>,
    hits: Vec<SearchHit>,

    hierarchy_calls: AtomicUsize,
    area_root_calls: AtomicUsize,
    subtree_calls: AtomicUsize,
    search_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,

    roots_failing: AtomicBool,
    search_failing: AtomicBool,
    failing_subtrees: Mutex<Vec<i64>>,
    search_gates: Mutex<HashMap<String, std::sync::Arc<Semaphore>>>,
}

impl FixtureService {
    #[must_use]
    pub fn new() -> Self {
        let provinces = nepal_provinces();
        let hits = flatten_hits(&provinces);
        Self {
            provinces,
            hits,
            hierarchy_calls: AtomicUsize::new(0),
            area_root_calls: AtomicUsize::new(0),
            subtree_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            roots_failing: AtomicBool::new(false),
            search_failing: AtomicBool::new(false),
            failing_subtrees: Mutex::new(Vec::new()),
            search_gates: Mutex::new(HashMap::new()),
        }
    }

    // --- call accounting ---

    pub fn hierarchy_calls(&self) -> usize {
        self.hierarchy_calls.load(Ordering::SeqCst)
    }

    pub fn area_root_calls(&self) -> usize {
        self.area_root_calls.load(Ordering::SeqCst)
    }

    pub fn subtree_calls(&self) -> usize {
        self.subtree_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Every query string the service was actually asked, in issuance order.
    pub fn searched_queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock poisoned").clone()
    }

    // --- failure injection ---

    /// Make root fetches fail with a 503 until switched off again.
    pub fn set_roots_failing(&self, failing: bool) {
        self.roots_failing.store(failing, Ordering::SeqCst);
    }

    /// Make searches fail with a 503 until switched off again. The calls are
    /// still counted and their queries recorded.
    pub fn set_search_failing(&self, failing: bool) {
        self.search_failing.store(failing, Ordering::SeqCst);
    }

    /// Make subtree fetches for `province_id` fail with a 503 until
    /// [`Self::clear_failing_subtree`] is called.
    pub fn set_subtree_failing(&self, province_id: i64) {
        self.failing_subtrees
            .lock()
            .expect("failing_subtrees lock poisoned")
            .push(province_id);
    }

    pub fn clear_failing_subtree(&self, province_id: i64) {
        self.failing_subtrees
            .lock()
            .expect("failing_subtrees lock poisoned")
            .retain(|id| *id != province_id);
    }

    // --- response gating ---

    /// Hold the response for `query` until the returned gate is released.
    /// Lets tests deliver responses in an order different from issuance.
    pub fn gate_search(&self, query: &str) -> SearchGate {
        let semaphore = std::sync::Arc::new(Semaphore::new(0));
        self.search_gates
            .lock()
            .expect("search_gates lock poisoned")
            .insert(query.to_owned(), std::sync::Arc::clone(&semaphore));
        SearchGate { semaphore }
    }

    async fn record_search(&self, query: &str) {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("queries lock poisoned")
            .push(query.to_owned());

        let gate = self
            .search_gates
            .lock()
            .expect("search_gates lock poisoned")
            .get(query)
            .cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn matching_hits(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        self.hits
            .iter()
            .filter(|hit| hit.node.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

impl Default for FixtureService {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for a response held by [`FixtureService::gate_search`].
pub struct SearchGate {
    semaphore: std::sync::Arc<Semaphore>,
}

impl SearchGate {
    /// Let one held response through.
    pub fn release(&self) {
        self.semaphore.add_permits(1);
    }
}

fn flatten_hits(provinces: &[Province]) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for province in provinces {
        hits.push(SearchHit {
            node: province.node.clone(),
            hierarchy_info: None,
        });
        for district in province.districts.as_deref().unwrap_or_default() {
            hits.push(SearchHit {
                node: district.node.clone(),
                hierarchy_info: Some(province.node.name.clone()),
            });
            for municipality in district.municipalities.as_deref().unwrap_or_default() {
                hits.push(SearchHit {
                    node: municipality.node.clone(),
                    hierarchy_info: Some(format!("{}, {}", district.node.name, province.node.name)),
                });
                for ward in municipality.wards.as_deref().unwrap_or_default() {
                    for area_node in ward.areas.as_deref().unwrap_or_default() {
                        hits.push(SearchHit {
                            node: area_node.clone(),
                            hierarchy_info: Some(format!(
                                "Ward {}, {}, {}",
                                ward.ward_number, municipality.node.name, district.node.name
                            )),
                        });
                    }
                }
            }
        }
    }
    hits
}

#[async_trait]
impl LocationService for FixtureService {
    async fn fetch_hierarchy(&self) -> Result<Vec<Province>> {
        self.hierarchy_calls.fetch_add(1, Ordering::SeqCst);
        if self.roots_failing.load(Ordering::SeqCst) {
            return Err(FetchError::service(503, "hierarchy unavailable"));
        }
        Ok(self.provinces.clone())
    }

    async fn fetch_area_roots(&self) -> Result<Vec<LocationNode>> {
        self.area_root_calls.fetch_add(1, Ordering::SeqCst);
        if self.roots_failing.load(Ordering::SeqCst) {
            return Err(FetchError::service(503, "hierarchy unavailable"));
        }
        Ok(self.provinces.iter().map(|p| p.node.clone()).collect())
    }

    async fn fetch_province_subtree(&self, province_id: i64) -> Result<ProvinceSubtree> {
        self.subtree_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_subtrees
            .lock()
            .expect("failing_subtrees lock poisoned")
            .contains(&province_id);
        if failing {
            return Err(FetchError::service(503, "subtree unavailable"));
        }
        self.provinces
            .iter()
            .find(|p| p.node.id == province_id)
            .and_then(|p| p.districts.clone())
            .map(|districts| ProvinceSubtree { districts })
            .ok_or_else(|| FetchError::service(404, format!("unknown province {province_id}")))
    }

    async fn search_locations(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.record_search(query).await;
        if self.search_failing.load(Ordering::SeqCst) {
            return Err(FetchError::service(503, "search unavailable"));
        }
        Ok(self.matching_hits(query))
    }

    async fn search_areas(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.record_search(query).await;
        if self.search_failing.load(Ordering::SeqCst) {
            return Err(FetchError::service(503, "search unavailable"));
        }
        Ok(self
            .matching_hits(query)
            .into_iter()
            .filter(|hit| hit.node.kind == LocationKind::Area)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subtree_lookup_matches_roots() {
        let service = FixtureService::new();
        let roots = service.fetch_area_roots().await.unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].id, 1);

        let subtree = service.fetch_province_subtree(1).await.unwrap();
        assert_eq!(subtree.districts[0].node.id, 11);
        assert_eq!(service.subtree_calls(), 1);
    }

    #[tokio::test]
    async fn area_search_filters_kinds() {
        let service = FixtureService::new();
        let all = service.search_locations("kathmandu").await.unwrap();
        assert!(all.iter().any(|h| h.node.kind == LocationKind::District));

        let areas = service.search_areas("thamel").await.unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].node.id, 9);
        assert!(
            areas[0]
                .hierarchy_info
                .as_deref()
                .is_some_and(|info| info.contains("Ward 3"))
        );
    }

    #[tokio::test]
    async fn failure_injection_recovers() {
        let service = FixtureService::new();
        service.set_subtree_failing(1);
        assert!(service.fetch_province_subtree(1).await.is_err());
        service.clear_failing_subtree(1);
        assert!(service.fetch_province_subtree(1).await.is_ok());
    }
}
