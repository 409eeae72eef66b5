//! Selector configuration and its builder.

use std::time::Duration;

use crate::selection::Selection;

/// Quiescence window before a typed query is issued.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which view of the hierarchy the selector works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyScope {
    /// Only paths terminating in an `area` leaf. Used when posting a listing,
    /// where the ad must land in a concrete area.
    #[default]
    AreaOnly,
    /// The full hierarchy; selection may stop at any level. Used when
    /// filtering listings.
    AllLevels,
}

/// Configuration for a [`LocationSelector`](crate::LocationSelector).
#[derive(Debug, Clone, Default)]
pub struct SelectorConfig {
    pub scope: HierarchyScope,
    /// A previously stored selection to seed the component with. Seeding does
    /// not fire the listener — the caller already knows this value. Ward
    /// seeds are ignored: the flattened form has no composite key.
    pub initial_selection: Option<Selection>,
    /// Whether the embedding form treats the selection as mandatory. Carried
    /// for the form layer; the selector itself never enforces it.
    pub required: bool,
    pub debounce: Option<Duration>,
}

impl SelectorConfig {
    #[must_use]
    pub fn builder() -> SelectorConfigBuilder {
        SelectorConfigBuilder::new()
    }

    /// The effective debounce window.
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        self.debounce.unwrap_or(SEARCH_DEBOUNCE)
    }
}

/// Builder for [`SelectorConfig`] with ergonomic presets.
#[derive(Debug, Clone, Default)]
pub struct SelectorConfigBuilder {
    config: SelectorConfig,
}

impl SelectorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for the post-ad form: area-only hierarchy, selection required.
    #[must_use]
    pub fn posting() -> Self {
        let mut builder = Self::new();
        builder.config.scope = HierarchyScope::AreaOnly;
        builder.config.required = true;
        builder
    }

    /// Preset for listing filters: any level may be selected, nothing is
    /// required.
    #[must_use]
    pub fn filtering() -> Self {
        let mut builder = Self::new();
        builder.config.scope = HierarchyScope::AllLevels;
        builder.config.required = false;
        builder
    }

    #[must_use]
    pub fn scope(mut self, scope: HierarchyScope) -> Self {
        self.config.scope = scope;
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.config.required = required;
        self
    }

    #[must_use]
    pub fn initial_selection(mut self, selection: Selection) -> Self {
        self.config.initial_selection = Some(selection);
        self
    }

    /// Override the debounce window (mainly useful in tests and demos).
    #[must_use]
    pub fn debounce(mut self, window: Duration) -> Self {
        self.config.debounce = Some(window);
        self
    }

    #[must_use]
    pub fn build(self) -> SelectorConfig {
        self.config
    }
}
