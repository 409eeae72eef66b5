//! The location selector component.
//!
//! [`LocationSelector`] composes the hierarchy cache, the selection path and
//! the debounced search pipeline into the single component an embedding
//! application drives. Two input paths converge here — the cascading
//! dropdowns and the search autocomplete — and both funnel into the same
//! selection transitions, which report outward through one listener.
//!
//! Fetch failures never reach the listener. They surface as a retryable
//! [`LoadStatus`] so the UI can render "failed to load" and the user can try
//! again by repeating the action that failed.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};

use kinbech_location_client::{
    District, LocationKind, LocationNode, LocationService, MIN_QUERY_LEN, Municipality,
    ProvinceSubtree, SearchHit, Ward,
};
use tracing::{debug, warn};

use crate::{
    cache::HierarchyCache,
    config::{HierarchyScope, SelectorConfig},
    error::Result,
    search::run_scope_search,
    selection::{Selection, SelectionPath, WardSelection},
};

/// Progress of an asynchronous fetch, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Callback fired with the flattened selection after every transition.
pub type SelectionListener = Box<dyn Fn(Option<Selection>) + Send + Sync>;

struct SelectorState {
    path: SelectionPath,
    search_text: String,
    search_results: Vec<SearchHit>,
    autocomplete_open: bool,
    hierarchy_status: LoadStatus,
    search_status: LoadStatus,
}

struct Inner<S> {
    cache: HierarchyCache<S>,
    service: Arc<S>,
    config: SelectorConfig,
    state: Mutex<SelectorState>,
    listener: SelectionListener,
    /// Issuance counter for search queries; completions compare against it
    /// and discard themselves when superseded.
    search_seq: AtomicU64,
}

/// The cascading location picker behind the post-ad form and the listing
/// filters.
///
/// Spawned search tasks require a running Tokio runtime;
/// [`handle_search_input`](Self::handle_search_input) must be called from
/// within one.
///
/// # Examples
///
/// ```rust
/// use kinbech_location_client::fixtures::FixtureService;
/// use kinbech_locations::{LocationSelector, SelectorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), kinbech_locations::SelectorError> {
/// let selector = LocationSelector::new(
///     FixtureService::new(),
///     SelectorConfig::default(),
///     |selection| {
///         if let Some(selection) = selection {
///             println!("selected {} ({})", selection.name, selection.kind);
///         }
///     },
/// );
///
/// selector.load_root().await?;
/// selector.select_province(1).await?;
/// selector.select_district(11);
/// # Ok(())
/// # }
/// ```
pub struct LocationSelector<S> {
    inner: Arc<Inner<S>>,
}

impl<S: LocationService + 'static> LocationSelector<S> {
    /// Create a selector around `service`.
    ///
    /// `listener` receives the flattened selection (or `None`) once per
    /// transition. An `initial_selection` in the config seeds the state
    /// without firing the listener.
    pub fn new(
        service: S,
        config: SelectorConfig,
        listener: impl Fn(Option<Selection>) + Send + Sync + 'static,
    ) -> Self {
        Self::with_arc(Arc::new(service), config, listener)
    }

    /// Like [`new`](Self::new) but sharing an already `Arc`-wrapped service.
    pub fn with_arc(
        service: Arc<S>,
        config: SelectorConfig,
        listener: impl Fn(Option<Selection>) + Send + Sync + 'static,
    ) -> Self {
        let mut path = SelectionPath::default();
        let mut search_text = String::new();
        if let Some(seed) = &config.initial_selection {
            seed_path(&mut path, seed);
            search_text = seed.name.clone();
        }

        let cache = HierarchyCache::new(Arc::clone(&service), config.scope);
        Self {
            inner: Arc::new(Inner {
                cache,
                service,
                config,
                state: Mutex::new(SelectorState {
                    path,
                    search_text,
                    search_results: Vec::new(),
                    autocomplete_open: false,
                    hierarchy_status: LoadStatus::Idle,
                    search_status: LoadStatus::Idle,
                }),
                listener: Box::new(listener),
                search_seq: AtomicU64::new(0),
            }),
        }
    }

    // === Hierarchy loading ===

    /// Load the province roots. Idempotent and coalescing; see
    /// [`HierarchyCache::load_root`]. Failures are retryable by calling
    /// again.
    pub async fn load_root(&self) -> Result<()> {
        if self.inner.cache.provinces().is_none() {
            self.state().hierarchy_status = LoadStatus::Loading;
        }
        match self.inner.cache.load_root().await {
            Ok(_) => {
                self.state().hierarchy_status = LoadStatus::Ready;
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to load hierarchy roots");
                self.state().hierarchy_status = LoadStatus::Failed;
                Err(error.into())
            }
        }
    }

    // === Cascade path ===

    /// Select a province by id, lazily expanding its subtree.
    ///
    /// The selection event fires immediately — before the expansion fetch —
    /// so a failed expansion leaves a valid province-level selection behind,
    /// retryable by selecting the province again. An unknown id clears the
    /// province slot (and with it the whole cascade).
    pub async fn select_province(&self, province_id: i64) -> Result<Option<Selection>> {
        let node = self.inner.cache.provinces().and_then(|roots| {
            roots.iter().find(|node| node.id == province_id).cloned()
        });
        let found = node.is_some();

        let event = {
            let mut state = self.state();
            state.path.set_province(node)
        };
        self.notify(&event);

        if found && !self.inner.cache.is_expanded(province_id) {
            self.state().hierarchy_status = LoadStatus::Loading;
            match self.inner.cache.expand_province(province_id).await {
                Ok(_) => self.state().hierarchy_status = LoadStatus::Ready,
                Err(error) => {
                    warn!(%error, province_id, "failed to expand province");
                    self.state().hierarchy_status = LoadStatus::Failed;
                    return Err(error.into());
                }
            }
        }
        Ok(event)
    }

    /// Select a district of the current province. An id not present under
    /// the selected province clears the district slot.
    pub fn select_district(&self, district_id: i64) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            let node = self.with_subtree(&state.path, |subtree, _| {
                subtree
                    .districts
                    .iter()
                    .find(|district| district.node.id == district_id)
                    .map(|district| district.node.clone())
            });
            state.path.set_district(node.flatten())
        };
        self.notify(&event);
        event
    }

    /// Select a municipality of the current district.
    pub fn select_municipality(&self, municipality_id: i64) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            let node = self
                .with_subtree(&state.path, |subtree, path| {
                    let district = selected_district(subtree, path)?;
                    find_municipality(district, municipality_id)
                        .map(|municipality| municipality.node.clone())
                })
                .flatten();
            state.path.set_municipality(node)
        };
        self.notify(&event);
        event
    }

    /// Select a ward of the current municipality by number. The composite
    /// `(municipality, ward_number)` key is formed here; ward numbers alone
    /// collide across municipalities.
    pub fn select_ward(&self, ward_number: u32) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            let ward = self
                .with_subtree(&state.path, |subtree, path| {
                    let municipality = selected_municipality(subtree, path)?;
                    find_ward(municipality, ward_number).map(|_| WardSelection {
                        municipality_id: municipality.node.id,
                        ward_number,
                    })
                })
                .flatten();
            state.path.set_ward(ward)
        };
        self.notify(&event);
        event
    }

    /// Select an area of the current ward.
    pub fn select_area(&self, area_id: i64) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            let node = self
                .with_subtree(&state.path, |subtree, path| {
                    let municipality = selected_municipality(subtree, path)?;
                    let ward = find_ward(municipality, path.ward()?.ward_number)?;
                    ward.areas
                        .as_deref()
                        .unwrap_or_default()
                        .iter()
                        .find(|area| area.id == area_id)
                        .cloned()
                })
                .flatten();
            let event = state.path.set_area(node);
            if let Some(selection) = &event {
                if selection.kind == LocationKind::Area {
                    selection.name.clone_into(&mut state.search_text);
                    state.autocomplete_open = false;
                }
            }
            event
        };
        self.notify(&event);
        event
    }

    /// Clear one slot and everything deeper.
    pub fn clear_slot(&self, kind: LocationKind) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            state.path.clear_slot(kind)
        };
        self.notify(&event);
        event
    }

    /// Reset the whole selection, the search box included.
    pub fn clear(&self) -> Option<Selection> {
        {
            let mut state = self.state();
            state.path.clear();
            state.search_text.clear();
            state.search_results.clear();
            state.autocomplete_open = false;
        }
        self.notify(&None);
        None
    }

    // === Search path ===

    /// Record a keystroke in the search box.
    ///
    /// The query is issued only after the debounce window passes with no
    /// newer input, so a burst of keystrokes costs at most one request — for
    /// the final text. A completion whose sequence number is no longer the
    /// latest is discarded unconditionally, whatever order responses arrive
    /// in. Once the selector is dropped, pending completions fail their
    /// `Weak` upgrade and die without touching anything.
    pub fn handle_search_input(&self, text: &str) {
        let seq = self.inner.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        text.clone_into(&mut self.state().search_text);

        let query = text.to_owned();
        let window = self.inner.config.debounce_window();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let Some(inner) = weak.upgrade() else { return };
            if inner.search_seq.load(Ordering::SeqCst) != seq {
                return; // superseded while waiting out the window
            }

            let trimmed = query.trim().to_owned();
            if trimmed.chars().count() < MIN_QUERY_LEN {
                let mut state = inner.state.lock().expect("state lock poisoned");
                state.search_results.clear();
                state.autocomplete_open = false;
                state.search_status = LoadStatus::Idle;
                return;
            }

            inner.state.lock().expect("state lock poisoned").search_status = LoadStatus::Loading;
            let service = Arc::clone(&inner.service);
            let scope = inner.config.scope;
            // Hold only the weak handle across the fetch so dropping the
            // selector tears the pipeline down.
            drop(inner);

            let result = run_scope_search(service.as_ref(), scope, &trimmed).await;

            let Some(inner) = weak.upgrade() else { return };
            if inner.search_seq.load(Ordering::SeqCst) != seq {
                debug!(query = %trimmed, seq, "discarding stale search response");
                return;
            }
            let mut state = inner.state.lock().expect("state lock poisoned");
            match result {
                Ok(hits) => {
                    state.search_results = hits;
                    state.autocomplete_open = true;
                    state.search_status = LoadStatus::Ready;
                }
                Err(error) => {
                    warn!(%error, query = %trimmed, "location search failed");
                    state.search_results.clear();
                    state.autocomplete_open = false;
                    state.search_status = LoadStatus::Failed;
                }
            }
        });
    }

    /// Apply an autocomplete pick by index into [`search_results`](Self::search_results).
    /// Out-of-range indices leave everything untouched and fire nothing.
    pub fn choose_search_result(&self, index: usize) -> Option<Selection> {
        let hit = self.state().search_results.get(index).cloned();
        let hit = hit?;
        self.select_from_search(&hit)
    }

    /// Apply a search hit as the selection.
    ///
    /// The hit lands in the slot matching its kind; shallower slots keep
    /// their previous values (see [`SelectionPath::select_from_search`]).
    /// The picked name is mirrored into the search box and the result list
    /// is discarded.
    pub fn select_from_search(&self, hit: &SearchHit) -> Option<Selection> {
        let event = {
            let mut state = self.state();
            hit.node.name.clone_into(&mut state.search_text);
            state.search_results.clear();
            state.autocomplete_open = false;
            state.path.select_from_search(hit)
        };
        self.notify(&event);
        event
    }

    // === Rendering snapshots ===

    /// The current flattened selection.
    pub fn selection(&self) -> Option<Selection> {
        self.state().path.deepest()
    }

    /// A copy of the full selection path.
    pub fn selection_path(&self) -> SelectionPath {
        self.state().path.clone()
    }

    pub fn search_text(&self) -> String {
        self.state().search_text.clone()
    }

    pub fn search_results(&self) -> Vec<SearchHit> {
        self.state().search_results.clone()
    }

    pub fn autocomplete_open(&self) -> bool {
        self.state().autocomplete_open
    }

    pub fn hierarchy_status(&self) -> LoadStatus {
        self.state().hierarchy_status
    }

    pub fn search_status(&self) -> LoadStatus {
        self.state().search_status
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.inner.config
    }

    /// The loaded province roots, in service order.
    pub fn province_options(&self) -> Vec<LocationNode> {
        self.inner
            .cache
            .provinces()
            .map(|roots| roots.as_ref().clone())
            .unwrap_or_default()
    }

    /// Districts of the selected province; `None` until the province is
    /// selected and its subtree loaded.
    pub fn district_options(&self) -> Option<Vec<LocationNode>> {
        let state = self.state();
        self.with_subtree(&state.path, |subtree, _| {
            subtree
                .districts
                .iter()
                .map(|district| district.node.clone())
                .collect()
        })
    }

    /// Municipalities of the selected district; `None` until available.
    pub fn municipality_options(&self) -> Option<Vec<LocationNode>> {
        let state = self.state();
        self.with_subtree(&state.path, |subtree, path| {
            let district = selected_district(subtree, path)?;
            Some(
                district
                    .municipalities
                    .as_deref()?
                    .iter()
                    .map(|municipality| municipality.node.clone())
                    .collect(),
            )
        })
        .flatten()
    }

    /// Ward numbers of the selected municipality. Hidden (always `None`)
    /// outside area scope — a generic filter stops at municipality level.
    pub fn ward_options(&self) -> Option<Vec<u32>> {
        if self.inner.config.scope != HierarchyScope::AreaOnly {
            return None;
        }
        let state = self.state();
        self.with_subtree(&state.path, |subtree, path| {
            let municipality = selected_municipality(subtree, path)?;
            Some(
                municipality
                    .wards
                    .as_deref()?
                    .iter()
                    .map(|ward| ward.ward_number)
                    .collect(),
            )
        })
        .flatten()
    }

    /// Areas of the selected ward. Hidden outside area scope.
    pub fn area_options(&self) -> Option<Vec<LocationNode>> {
        if self.inner.config.scope != HierarchyScope::AreaOnly {
            return None;
        }
        let state = self.state();
        self.with_subtree(&state.path, |subtree, path| {
            let municipality = selected_municipality(subtree, path)?;
            let ward = find_ward(municipality, path.ward()?.ward_number)?;
            Some(ward.areas.as_deref()?.to_vec())
        })
        .flatten()
    }

    /// The cascade levels currently renderable, top down.
    pub fn visible_levels(&self) -> Vec<LocationKind> {
        let mut levels = vec![LocationKind::Province];
        if self.district_options().is_some() {
            levels.push(LocationKind::District);
        }
        if self.municipality_options().is_some() {
            levels.push(LocationKind::Municipality);
        }
        if self.ward_options().is_some() {
            levels.push(LocationKind::Ward);
        }
        if self.area_options().is_some() {
            levels.push(LocationKind::Area);
        }
        levels
    }

    // === Internals ===

    fn state(&self) -> MutexGuard<'_, SelectorState> {
        self.inner.state.lock().expect("state lock poisoned")
    }

    fn notify(&self, event: &Option<Selection>) {
        (self.inner.listener)(event.clone());
    }

    /// Run `f` against the selected province's cached subtree, if any.
    fn with_subtree<R>(
        &self,
        path: &SelectionPath,
        f: impl FnOnce(&ProvinceSubtree, &SelectionPath) -> R,
    ) -> Option<R> {
        let province = path.province()?;
        let subtree = self.inner.cache.subtree(province.id)?;
        Some(f(&subtree, path))
    }
}

fn seed_path(path: &mut SelectionPath, seed: &Selection) {
    let node = LocationNode {
        id: seed.id,
        name: seed.name.clone(),
        kind: seed.kind,
        parent_id: None,
    };
    match seed.kind {
        LocationKind::Province => {
            path.set_province(Some(node));
        }
        LocationKind::District => {
            path.set_district(Some(node));
        }
        LocationKind::Municipality => {
            path.set_municipality(Some(node));
        }
        LocationKind::Area => {
            path.set_area(Some(node));
        }
        LocationKind::Ward => {
            // A flattened ward value has lost its municipality; there is no
            // composite key to restore.
            warn!(id = seed.id, "ignoring ward-kind initial selection");
        }
    }
}

fn selected_district<'a>(
    subtree: &'a ProvinceSubtree,
    path: &SelectionPath,
) -> Option<&'a District> {
    let district_id = path.district()?.id;
    subtree
        .districts
        .iter()
        .find(|district| district.node.id == district_id)
}

fn find_municipality<'a>(district: &'a District, municipality_id: i64) -> Option<&'a Municipality> {
    district
        .municipalities
        .as_deref()?
        .iter()
        .find(|municipality| municipality.node.id == municipality_id)
}

fn selected_municipality<'a>(
    subtree: &'a ProvinceSubtree,
    path: &SelectionPath,
) -> Option<&'a Municipality> {
    let district = selected_district(subtree, path)?;
    let municipality_id = path.municipality()?.id;
    find_municipality(district, municipality_id)
}

fn find_ward(municipality: &Municipality, ward_number: u32) -> Option<&Ward> {
    municipality
        .wards
        .as_deref()?
        .iter()
        .find(|ward| ward.ward_number == ward_number)
}
