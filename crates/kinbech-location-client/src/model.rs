//! Domain model for the Kinbech location hierarchy.
//!
//! Nepal's administrative nesting is five levels deep: province, district,
//! municipality, ward, area. The service materializes this tree lazily, so
//! every child collection here is an `Option<Vec<_>>`: `None` means the level
//! has not been fetched yet, `Some(vec![])` means the service confirmed it is
//! empty. The two must never be conflated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five administrative levels, ordered from largest to smallest.
///
/// The derived `Ord` follows declaration order, so
/// `LocationKind::Province < LocationKind::Area` holds and can be used to
/// compare depths directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Province,
    District,
    Municipality,
    Ward,
    Area,
}

impl LocationKind {
    /// All kinds, largest to smallest.
    pub const ALL: [Self; 5] = [
        Self::Province,
        Self::District,
        Self::Municipality,
        Self::Ward,
        Self::Area,
    ];

    /// Zero-based depth in the hierarchy (province = 0, area = 4).
    #[must_use]
    pub const fn depth(self) -> usize {
        self as usize
    }

    /// Lowercase wire spelling, as the service serializes it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::District => "district",
            Self::Municipality => "municipality",
            Self::Ward => "ward",
            Self::Area => "area",
        }
    }

    /// Human-readable label for UI display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Province => "Province",
            Self::District => "District",
            Self::Municipality => "Municipality",
            Self::Ward => "Ward",
            Self::Area => "Area",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node of the location hierarchy.
///
/// `id` is unique and stable across the whole tree for every kind except
/// wards, which the service keys by `ward_number` scoped to their
/// municipality (see [`Ward`]). `parent_id` references the node of the
/// immediately enclosing kind, when the service provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

impl fmt::Display for LocationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// A ward of a municipality.
///
/// Wards carry no global id and no name of their own; they are addressed by
/// `ward_number`, which is only unique within the owning municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ward {
    pub ward_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<LocationNode>>,
}

/// A municipality with its lazily loaded wards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    #[serde(flatten)]
    pub node: LocationNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wards: Option<Vec<Ward>>,
}

/// A district with its lazily loaded municipalities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    #[serde(flatten)]
    pub node: LocationNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipalities: Option<Vec<Municipality>>,
}

/// A province root, possibly carrying its nested districts.
///
/// Root listings usually arrive without `districts`; the full-hierarchy
/// endpoint and province expansion responses carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    #[serde(flatten)]
    pub node: LocationNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub districts: Option<Vec<District>>,
}

/// The district→municipality→ward→area subtree of one province, fetched on
/// first expansion. Replaces any previously cached subtree wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceSubtree {
    pub districts: Vec<District>,
}

/// One autocomplete search result.
///
/// `hierarchy_info` is a human-readable ancestor path ("Kathmandu, Bagmati")
/// used purely as a display hint; it is discarded once a selection is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub node: LocationNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_info: Option<String>,
}

/// The service's response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}
