//! The selection state machine behind the cascading location picker.
//!
//! A selection is five ordered slots, largest to smallest: province,
//! district, municipality, ward, area. The single structural rule is the
//! monotonic prefix property: setting or clearing a slot always clears every
//! deeper slot, so an unset slot can never sit above a set one. Both input
//! paths — the cascade and the search autocomplete — funnel through the same
//! transitions here, which keeps the clearing logic in one place.
//!
//! Transitions are total: they cannot fail, and each one returns the event to
//! report outward — the flattened deepest set slot, or `None` when the path
//! is empty.

use itertools::Itertools;
use kinbech_location_client::{LocationKind, LocationNode, SearchHit};
use serde::Serialize;
use tracing::warn;

/// The flattened, outward-facing selection value.
///
/// For a ward, `id` carries the ward number — unique only within its
/// municipality — and `name` is `"Ward N"`. Everything else uses the node's
/// global id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
}

impl Selection {
    #[must_use]
    pub fn from_node(node: &LocationNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind,
        }
    }
}

/// A selected ward, addressed by its composite key.
///
/// Ward numbers restart at 1 in every municipality, so the municipality id is
/// part of the identity; without it, ward 3 of two neighboring cities would
/// conflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardSelection {
    pub municipality_id: i64,
    pub ward_number: u32,
}

impl WardSelection {
    fn to_selection(self) -> Selection {
        Selection {
            id: i64::from(self.ward_number),
            name: format!("Ward {}", self.ward_number),
            kind: LocationKind::Ward,
        }
    }
}

/// The canonical selection path. Mutated only through its transitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionPath {
    province: Option<LocationNode>,
    district: Option<LocationNode>,
    municipality: Option<LocationNode>,
    ward: Option<WardSelection>,
    area: Option<LocationNode>,
}

impl SelectionPath {
    pub fn province(&self) -> Option<&LocationNode> {
        self.province.as_ref()
    }

    pub fn district(&self) -> Option<&LocationNode> {
        self.district.as_ref()
    }

    pub fn municipality(&self) -> Option<&LocationNode> {
        self.municipality.as_ref()
    }

    pub fn ward(&self) -> Option<WardSelection> {
        self.ward
    }

    pub fn area(&self) -> Option<&LocationNode> {
        self.area.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.province.is_none()
    }

    /// Set or clear the province slot. Deeper slots are always cleared, even
    /// when the same province is chosen again — re-choosing restarts the
    /// cascade below it.
    pub fn set_province(&mut self, node: Option<LocationNode>) -> Option<Selection> {
        self.province = node;
        self.clear_below(LocationKind::Province);
        self.deepest()
    }

    pub fn set_district(&mut self, node: Option<LocationNode>) -> Option<Selection> {
        self.district = node;
        self.clear_below(LocationKind::District);
        self.deepest()
    }

    pub fn set_municipality(&mut self, node: Option<LocationNode>) -> Option<Selection> {
        self.municipality = node;
        self.clear_below(LocationKind::Municipality);
        self.deepest()
    }

    pub fn set_ward(&mut self, ward: Option<WardSelection>) -> Option<Selection> {
        self.ward = ward;
        self.clear_below(LocationKind::Ward);
        self.deepest()
    }

    pub fn set_area(&mut self, node: Option<LocationNode>) -> Option<Selection> {
        self.area = node;
        self.deepest()
    }

    /// Clear one slot (and, per the prefix rule, everything deeper).
    pub fn clear_slot(&mut self, kind: LocationKind) -> Option<Selection> {
        match kind {
            LocationKind::Province => self.set_province(None),
            LocationKind::District => self.set_district(None),
            LocationKind::Municipality => self.set_municipality(None),
            LocationKind::Ward => self.set_ward(None),
            LocationKind::Area => self.set_area(None),
        }
    }

    /// Reset every slot.
    pub fn clear(&mut self) -> Option<Selection> {
        *self = Self::default();
        None
    }

    /// Apply an autocomplete pick.
    ///
    /// The hit lands in the slot matching its kind and clears everything
    /// deeper; shallower slots are deliberately left as they were, stale and
    /// unvalidated. Search is an independent route to a final selection, not
    /// a way to populate the cascade above it.
    pub fn select_from_search(&mut self, hit: &SearchHit) -> Option<Selection> {
        match hit.node.kind {
            LocationKind::Province => return self.set_province(Some(hit.node.clone())),
            LocationKind::District => return self.set_district(Some(hit.node.clone())),
            LocationKind::Municipality => return self.set_municipality(Some(hit.node.clone())),
            LocationKind::Area => return self.set_area(Some(hit.node.clone())),
            LocationKind::Ward => {
                // A ward hit carries its number in `id` and its municipality
                // in `parent_id`; without the parent there is no composite
                // key to select by.
                if let (Some(municipality_id), Ok(ward_number)) =
                    (hit.node.parent_id, u32::try_from(hit.node.id))
                {
                    return self.set_ward(Some(WardSelection {
                        municipality_id,
                        ward_number,
                    }));
                }
                warn!(
                    id = hit.node.id,
                    "ward search hit without a municipality parent; selection unchanged"
                );
            }
        }
        self.deepest()
    }

    /// The deepest set slot, flattened, or `None` when nothing is set.
    #[must_use]
    pub fn deepest(&self) -> Option<Selection> {
        if let Some(area) = &self.area {
            return Some(Selection::from_node(area));
        }
        if let Some(ward) = self.ward {
            return Some(ward.to_selection());
        }
        [&self.municipality, &self.district, &self.province]
            .into_iter()
            .find_map(|slot| slot.as_ref().map(Selection::from_node))
    }

    /// Slot names, largest to smallest, with unset slots as `None`.
    #[must_use]
    pub fn labels(&self) -> [Option<String>; 5] {
        [
            self.province.as_ref().map(|n| n.name.clone()),
            self.district.as_ref().map(|n| n.name.clone()),
            self.municipality.as_ref().map(|n| n.name.clone()),
            self.ward.map(|w| format!("Ward {}", w.ward_number)),
            self.area.as_ref().map(|n| n.name.clone()),
        ]
    }

    /// Breadcrumb of the set slots, deduplicated, for display.
    #[must_use]
    pub fn breadcrumb(&self) -> Vec<String> {
        self.labels().into_iter().flatten().unique().collect()
    }

    fn clear_below(&mut self, kind: LocationKind) {
        if kind < LocationKind::District {
            self.district = None;
        }
        if kind < LocationKind::Municipality {
            self.municipality = None;
        }
        if kind < LocationKind::Ward {
            self.ward = None;
        }
        if kind < LocationKind::Area {
            self.area = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, name: &str, kind: LocationKind) -> LocationNode {
        LocationNode {
            id,
            name: name.to_owned(),
            kind,
            parent_id: None,
        }
    }

    fn hit(id: i64, name: &str, kind: LocationKind, parent_id: Option<i64>) -> SearchHit {
        SearchHit {
            node: LocationNode {
                id,
                name: name.to_owned(),
                kind,
                parent_id,
            },
            hierarchy_info: None,
        }
    }

    fn full_path() -> SelectionPath {
        let mut path = SelectionPath::default();
        path.set_province(Some(node(1, "Bagmati", LocationKind::Province)));
        path.set_district(Some(node(11, "Kathmandu", LocationKind::District)));
        path.set_municipality(Some(node(111, "KMC", LocationKind::Municipality)));
        path.set_ward(Some(WardSelection {
            municipality_id: 111,
            ward_number: 3,
        }));
        path.set_area(Some(node(9, "Thamel", LocationKind::Area)));
        path
    }

    fn prefix_holds(path: &SelectionPath) -> bool {
        let set = [
            path.province().is_some(),
            path.district().is_some(),
            path.municipality().is_some(),
            path.ward().is_some(),
            path.area().is_some(),
        ];
        set.windows(2).all(|pair| pair[0] || !pair[1])
    }

    #[test]
    fn prefix_invariant_survives_arbitrary_transitions() {
        let mut path = full_path();
        assert!(prefix_holds(&path));

        path.set_municipality(Some(node(112, "Lalitpur MC", LocationKind::Municipality)));
        assert!(prefix_holds(&path));
        assert!(path.ward().is_none(), "deeper slots cleared on re-set");
        assert!(path.area().is_none());

        path.set_district(None);
        assert!(prefix_holds(&path));
        assert!(path.municipality().is_none());

        path.set_province(Some(node(2, "Gandaki", LocationKind::Province)));
        assert!(prefix_holds(&path));
        assert!(path.district().is_none());
    }

    #[test]
    fn reselecting_same_province_still_clears_deeper_slots() {
        let mut path = full_path();
        let event = path.set_province(Some(node(1, "Bagmati", LocationKind::Province)));
        assert_eq!(event.unwrap().kind, LocationKind::Province);
        assert!(path.district().is_none());
        assert!(path.area().is_none());
    }

    #[test]
    fn deepest_prefers_lower_slots() {
        let path = full_path();
        let selection = path.deepest().unwrap();
        assert_eq!(selection.id, 9);
        assert_eq!(selection.kind, LocationKind::Area);

        let mut path = full_path();
        path.set_area(None);
        let selection = path.deepest().unwrap();
        assert_eq!(selection.kind, LocationKind::Ward);
        assert_eq!(selection.name, "Ward 3");
    }

    #[test]
    fn clearing_district_falls_back_to_province() {
        // Clearing a middle slot cascades below it but leaves the province,
        // so the reported selection falls back to the province rather than
        // going empty.
        let mut path = full_path();
        let event = path.set_district(None);
        let selection = event.unwrap();
        assert_eq!(selection.id, 1);
        assert_eq!(selection.kind, LocationKind::Province);
        assert!(path.municipality().is_none());
        assert!(path.ward().is_none());
        assert!(path.area().is_none());
    }

    #[test]
    fn clear_resets_everything_and_reports_none() {
        let mut path = full_path();
        assert_eq!(path.clear(), None);
        assert!(path.is_empty());
        assert_eq!(path.deepest(), None);
    }

    #[test]
    fn search_pick_leaves_shallower_slots_stale() {
        let mut path = SelectionPath::default();
        path.set_province(Some(node(2, "Gandaki", LocationKind::Province)));
        path.set_district(Some(node(21, "Kaski", LocationKind::District)));

        // An autocomplete pick of an area in a different province: the slot
        // chain above it keeps its old values.
        let event = path.select_from_search(&hit(9, "Thamel", LocationKind::Area, None));
        assert_eq!(event.as_ref().unwrap().id, 9);
        assert_eq!(path.province().unwrap().id, 2, "province left stale");
        assert_eq!(path.district().unwrap().id, 21, "district left stale");
        assert_eq!(path.area().unwrap().id, 9);
    }

    #[test]
    fn search_pick_at_middle_level_clears_deeper_slots() {
        let mut path = full_path();
        let event = path.select_from_search(&hit(12, "Bhaktapur", LocationKind::District, Some(1)));
        assert_eq!(event.unwrap().id, 12);
        assert!(path.municipality().is_none());
        assert!(path.ward().is_none());
        assert!(path.area().is_none());
        assert_eq!(path.province().unwrap().id, 1, "province untouched");
    }

    #[test]
    fn ward_selections_keep_their_municipality() {
        let kmc = WardSelection {
            municipality_id: 111,
            ward_number: 3,
        };
        let lalitpur = WardSelection {
            municipality_id: 112,
            ward_number: 3,
        };
        assert_ne!(kmc, lalitpur, "same ward number, different municipality");

        let mut path = SelectionPath::default();
        path.set_ward(Some(kmc));
        assert_eq!(path.ward().unwrap().municipality_id, 111);
        path.set_ward(Some(lalitpur));
        assert_eq!(path.ward().unwrap().municipality_id, 112);
    }

    #[test]
    fn ward_search_hit_resolves_composite_key_from_parent() {
        let mut path = SelectionPath::default();
        let event = path.select_from_search(&hit(3, "Ward 3", LocationKind::Ward, Some(111)));
        let selection = event.unwrap();
        assert_eq!(selection.kind, LocationKind::Ward);
        assert_eq!(selection.id, 3);
        assert_eq!(
            path.ward().unwrap(),
            WardSelection {
                municipality_id: 111,
                ward_number: 3
            }
        );
    }

    #[test]
    fn ward_search_hit_without_parent_changes_nothing() {
        let mut path = full_path();
        let before = path.clone();
        let event = path.select_from_search(&hit(3, "Ward 3", LocationKind::Ward, None));
        assert_eq!(path, before);
        assert_eq!(event.unwrap().id, 9, "still reports the current deepest slot");
    }

    #[test]
    fn breadcrumb_lists_set_slots_in_order() {
        let path = full_path();
        assert_eq!(
            path.breadcrumb(),
            vec!["Bagmati", "Kathmandu", "KMC", "Ward 3", "Thamel"]
        );

        let mut partial = SelectionPath::default();
        partial.set_province(Some(node(1, "Bagmati", LocationKind::Province)));
        assert_eq!(partial.breadcrumb(), vec!["Bagmati"]);
    }
}
