//! The boundary trait for the location-hierarchy service.
//!
//! The selector core only ever talks to the backend through this trait, so
//! tests drive it with the in-memory [`fixtures`](crate::fixtures) service
//! and production wires up [`HttpLocationService`](crate::HttpLocationService).
//! Result relevance ordering for the search calls is owned by the service and
//! opaque to callers.

use async_trait::async_trait;

use crate::{
    error::Result,
    model::{LocationNode, Province, ProvinceSubtree, SearchHit},
};

/// Minimum trimmed query length before a search is worth issuing.
///
/// Shorter queries must be answered with an empty result set locally, without
/// touching the network.
pub const MIN_QUERY_LEN: usize = 2;

#[async_trait]
pub trait LocationService: Send + Sync {
    /// All-levels hierarchy roots. Provinces may arrive with nested districts
    /// (the listing pages consume the nesting; the selector uses only the
    /// root nodes).
    async fn fetch_hierarchy(&self) -> Result<Vec<Province>>;

    /// Area-only hierarchy roots: provinces whose paths terminate in an
    /// `area` leaf, without deep children.
    async fn fetch_area_roots(&self) -> Result<Vec<LocationNode>>;

    /// The full district→municipality→ward→area subtree of one province.
    async fn fetch_province_subtree(&self, province_id: i64) -> Result<ProvinceSubtree>;

    /// Substring search over every location kind.
    async fn search_locations(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Substring search restricted to `area` leaves.
    async fn search_areas(&self, query: &str) -> Result<Vec<SearchHit>>;
}
