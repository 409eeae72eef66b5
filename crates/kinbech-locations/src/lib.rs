//! Kinbech Locations - hierarchical location selection for the marketplace.
//!
//! This crate is the client-side core behind the location picker on the
//! post-ad form and the listing filters: a lazily loaded
//! province → district → municipality → ward → area tree, a cascading
//! selection state machine, and a debounced search autocomplete that both
//! converge on one normalized selection event.
//!
//! # Quick Start
//!
//! ```rust
//! use kinbech_location_client::fixtures::FixtureService;
//! use kinbech_locations::{LocationSelector, SelectorConfigBuilder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), kinbech_locations::SelectorError> {
//! // Post-ad form: the ad must land in a concrete area.
//! let selector = LocationSelector::new(
//!     FixtureService::new(),
//!     SelectorConfigBuilder::posting().build(),
//!     |selection| match selection {
//!         Some(selection) => println!("selected {} ({})", selection.name, selection.kind),
//!         None => println!("selection cleared"),
//!     },
//! );
//!
//! // Provinces load eagerly; each province's subtree loads on first pick.
//! selector.load_root().await?;
//! selector.select_province(1).await?;
//! selector.select_district(11);
//! selector.select_municipality(111);
//! selector.select_ward(3);
//! selector.select_area(9);
//!
//! assert_eq!(selector.selection().unwrap().name, "Thamel");
//! # Ok(())
//! # }
//! ```
//!
//! # Input Paths
//!
//! The selector accepts input two ways, both funneling into the same
//! transition rules:
//! - **Cascade**: `select_province` → … → `select_area`, each pick clearing
//!   everything below it.
//! - **Search**: `handle_search_input` (debounced, stale responses dropped)
//!   followed by `choose_search_result`, which places the hit directly into
//!   its slot without touching the cascade above it.
//!
//! Against a live backend, construct the selector over
//! [`HttpLocationService`](kinbech_location_client::HttpLocationService)
//! instead of the test fixture.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod cache;
mod config;
mod core;
pub mod error;
mod filter;
mod search;
mod selection;

pub use cache::HierarchyCache;
pub use config::{HierarchyScope, SEARCH_DEBOUNCE, SelectorConfig, SelectorConfigBuilder};
pub use self::core::{LoadStatus, LocationSelector, SelectionListener};
pub use error::{Result, SelectorError};
pub use filter::{
    AdCondition, AdFilters, DEFAULT_PAGE_SIZE, LocationIndex, MAX_PAGE_SIZE, SortOrder,
};
pub use kinbech_location_client as location_client;
pub use kinbech_location_client::{
    District, FetchError, LocationKind, LocationNode, LocationService, MIN_QUERY_LEN, Municipality,
    Province, ProvinceSubtree, SearchHit, Ward,
};
pub use selection::{Selection, SelectionPath, WardSelection};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the library.
///
/// Sets up structured logging with configurable levels and filtering. Call
/// once at application start; later calls are no-ops.
///
/// # Examples
///
/// ```rust
/// use kinbech_locations::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), kinbech_locations::SelectorError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static ()> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse().expect("static directive"))
            .add_directive("reqwest=warn".parse().expect("static directive"));

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
