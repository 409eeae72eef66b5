//! Hierarchy-backed filtering support for the listing pages.
//!
//! The ad search UI filters by location name ("Kathmandu", "Thamel", or the
//! sentinel "all"), but the ads API wants a location id. [`LocationIndex`]
//! flattens a fully nested hierarchy into O(1) lookup maps so the page never
//! walks the tree per keystroke, and [`AdFilters`] turns the active filter
//! set into wire query parameters.

use ahash::AHashMap;
use kinbech_location_client::{LocationNode, Province};

/// Default page size for listing queries.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Upper bound the backend enforces on page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// The name filter value meaning "no location filter".
const ALL_LOCATIONS: &str = "all";

/// Flattened lookup maps over a fully nested hierarchy.
///
/// Wards are not indexed — they have neither a global id nor a name. When two
/// nodes share a name (a district and its seat city, say), the shallower one
/// wins: a coarser filter is the safer default for a listing query.
#[derive(Debug, Default)]
pub struct LocationIndex {
    by_name: AHashMap<String, LocationNode>,
    by_id: AHashMap<i64, LocationNode>,
}

impl LocationIndex {
    #[must_use]
    pub fn from_provinces(provinces: &[Province]) -> Self {
        let mut index = Self::default();
        for province in provinces {
            index.insert(&province.node);
            for district in province.districts.as_deref().unwrap_or_default() {
                index.insert(&district.node);
                for municipality in district.municipalities.as_deref().unwrap_or_default() {
                    index.insert(&municipality.node);
                    for ward in municipality.wards.as_deref().unwrap_or_default() {
                        for area in ward.areas.as_deref().unwrap_or_default() {
                            index.insert(area);
                        }
                    }
                }
            }
        }
        index
    }

    fn insert(&mut self, node: &LocationNode) {
        self.by_name
            .entry(node.name.trim().to_lowercase())
            .or_insert_with(|| node.clone());
        self.by_id.entry(node.id).or_insert_with(|| node.clone());
    }

    /// Resolve a location filter name to an id. Empty names and the "all"
    /// sentinel resolve to `None` (no filter).
    #[must_use]
    pub fn location_id(&self, name: &str) -> Option<i64> {
        self.node_by_name(name).map(|node| node.id)
    }

    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&LocationNode> {
        let key = name.trim().to_lowercase();
        if key.is_empty() || key == ALL_LOCATIONS {
            return None;
        }
        self.by_name.get(&key)
    }

    #[must_use]
    pub fn node_by_id(&self, id: i64) -> Option<&LocationNode> {
        self.by_id.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Listing condition filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdCondition {
    New,
    Used,
    Refurbished,
}

impl AdCondition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Refurbished => "refurbished",
        }
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }
}

/// The active filter set of a listing page.
#[derive(Debug, Clone)]
pub struct AdFilters {
    /// Location filter by name, as the UI stores it. `None` or `"all"` means
    /// unfiltered.
    pub location: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub condition: Option<AdCondition>,
    pub sort: SortOrder,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
}

impl Default for AdFilters {
    fn default() -> Self {
        Self {
            location: None,
            min_price: None,
            max_price: None,
            condition: None,
            sort: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AdFilters {
    /// Whether anything beyond the defaults is filtering the listing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.location
            .as_deref()
            .is_some_and(|name| !name.is_empty() && name != ALL_LOCATIONS)
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.condition.is_some()
            || self.sort != SortOrder::default()
    }

    /// Build the ads API query, resolving the location name through `index`.
    ///
    /// A name the index knows becomes `location_id`; an unknown name is
    /// passed through as `location` so the backend can still match it
    /// server-side. Pagination is always present; `per_page` is clamped to
    /// the backend's bounds.
    #[must_use]
    pub fn to_query_params(&self, index: &LocationIndex) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(name) = self.location.as_deref() {
            if let Some(id) = index.location_id(name) {
                params.push(("location_id", id.to_string()));
            } else if !name.is_empty() && name != ALL_LOCATIONS {
                params.push(("location", name.to_owned()));
            }
        }
        if let Some(min) = self.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price", max.to_string()));
        }
        if let Some(condition) = self.condition {
            params.push(("condition", condition.as_str().to_owned()));
        }
        if self.sort != SortOrder::default() {
            params.push(("sort", self.sort.as_str().to_owned()));
        }

        let limit = self.per_page.clamp(1, MAX_PAGE_SIZE);
        let offset = (self.page.max(1) - 1) * limit;
        params.push(("limit", limit.to_string()));
        params.push(("offset", offset.to_string()));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinbech_location_client::{LocationService, fixtures::FixtureService};

    async fn fixture_index() -> LocationIndex {
        let provinces = FixtureService::new().fetch_hierarchy().await.unwrap();
        LocationIndex::from_provinces(&provinces)
    }

    #[tokio::test]
    async fn index_resolves_names_case_insensitively() {
        let index = fixture_index().await;
        assert_eq!(index.location_id("Thamel"), Some(9));
        assert_eq!(index.location_id("  thamel "), Some(9));
        assert_eq!(index.location_id("KATHMANDU"), Some(11));
        assert_eq!(index.location_id("nowhere"), None);
        assert_eq!(index.location_id("all"), None);
        assert_eq!(index.location_id(""), None);
        assert_eq!(index.node_by_id(111).unwrap().name, "Kathmandu Metropolitan City");
    }

    #[tokio::test]
    async fn shallower_node_wins_name_collisions() {
        let index = fixture_index().await;
        // "Durbar Square" exists only as an area; districts keep their own
        // names. The invariant worth pinning: a name resolves to exactly one
        // node and lookups are stable across rebuilds.
        let first = index.location_id("Durbar Square");
        let again = fixture_index().await.location_id("Durbar Square");
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn query_params_resolve_known_location_names() {
        let index = fixture_index().await;
        let filters = AdFilters {
            location: Some("Thamel".to_owned()),
            min_price: Some(1000),
            ..AdFilters::default()
        };

        let params = filters.to_query_params(&index);
        assert!(params.contains(&("location_id", "9".to_owned())));
        assert!(params.contains(&("min_price", "1000".to_owned())));
        assert!(params.contains(&("limit", "20".to_owned())));
        assert!(params.contains(&("offset", "0".to_owned())));
        assert!(!params.iter().any(|(k, _)| *k == "location"));
        assert!(!params.iter().any(|(k, _)| *k == "sort"), "default sort omitted");
    }

    #[tokio::test]
    async fn unknown_location_names_pass_through() {
        let index = fixture_index().await;
        let filters = AdFilters {
            location: Some("Biratnagar".to_owned()),
            ..AdFilters::default()
        };
        let params = filters.to_query_params(&index);
        assert!(params.contains(&("location", "Biratnagar".to_owned())));
    }

    #[tokio::test]
    async fn pagination_is_clamped_and_offset_derived() {
        let index = fixture_index().await;
        let filters = AdFilters {
            page: 3,
            per_page: 500,
            sort: SortOrder::PriceDesc,
            ..AdFilters::default()
        };
        let params = filters.to_query_params(&index);
        assert!(params.contains(&("limit", "100".to_owned())));
        assert!(params.contains(&("offset", "200".to_owned())));
        assert!(params.contains(&("sort", "price_desc".to_owned())));
    }

    #[test]
    fn is_active_ignores_pagination() {
        assert!(!AdFilters::default().is_active());
        assert!(!AdFilters { page: 7, ..AdFilters::default() }.is_active());
        assert!(
            !AdFilters {
                location: Some("all".to_owned()),
                ..AdFilters::default()
            }
            .is_active()
        );
        assert!(
            AdFilters {
                condition: Some(AdCondition::Used),
                ..AdFilters::default()
            }
            .is_active()
        );
    }
}
