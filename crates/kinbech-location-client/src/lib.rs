//! Client for the Kinbech location-hierarchy service.
//!
//! This crate owns the domain model for Nepal's five-level administrative
//! nesting (province → district → municipality → ward → area), the
//! [`LocationService`] boundary trait the selector core talks through, the
//! production [`HttpLocationService`] implementation, and a deterministic
//! [`fixtures`] service for tests.
//!
//! Child collections in the model are tri-state by design: `None` means "not
//! yet fetched", `Some(vec![])` means "confirmed empty". Callers must never
//! treat an absent collection as empty — the whole point of the lazy
//! hierarchy is that absence is a fetch trigger.

pub mod error;
pub mod fixtures;
mod model;
mod service;

#[cfg(feature = "http")]
mod http;

pub use error::{FetchError, Result};
#[cfg(feature = "http")]
pub use http::HttpLocationService;
pub use model::{
    ApiResponse, District, LocationKind, LocationNode, Municipality, Province, ProvinceSubtree,
    SearchHit, Ward,
};
pub use service::{LocationService, MIN_QUERY_LEN};
