//! `reqwest`-backed implementation of [`LocationService`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    error::{FetchError, Result},
    model::{ApiResponse, LocationNode, Province, ProvinceSubtree, SearchHit},
    service::LocationService,
};

const HIERARCHY_PATH: &str = "/api/locations/hierarchy";
const AREAS_HIERARCHY_PATH: &str = "/api/locations/areas/hierarchy";
const SEARCH_PATH: &str = "/api/locations/search";
const AREAS_SEARCH_PATH: &str = "/api/locations/areas/search";

/// HTTP client for the marketplace's location API.
///
/// All endpoints respond with the `{success, data, message}` envelope; a
/// non-2xx status or `success: false` maps to [`FetchError::Service`].
#[derive(Debug, Clone)]
pub struct HttpLocationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLocationService {
    /// Create a service client against `base_url` (scheme + authority, no
    /// trailing slash required).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a service client reusing an existing `reqwest::Client`, e.g.
    /// one carrying auth headers or a proxy configuration.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "location service request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::service(status.as_u16(), message));
        }

        let body = response.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            return Err(FetchError::service(
                status.as_u16(),
                envelope.message.unwrap_or_else(|| "request failed".to_owned()),
            ));
        }
        envelope
            .data
            .ok_or(FetchError::UnexpectedPayload("successful envelope without data"))
    }
}

#[async_trait]
impl LocationService for HttpLocationService {
    #[instrument(name = "Fetch hierarchy", level = "debug", skip(self))]
    async fn fetch_hierarchy(&self) -> Result<Vec<Province>> {
        self.get_json(HIERARCHY_PATH, &[]).await
    }

    #[instrument(name = "Fetch area roots", level = "debug", skip(self))]
    async fn fetch_area_roots(&self) -> Result<Vec<LocationNode>> {
        self.get_json(AREAS_HIERARCHY_PATH, &[]).await
    }

    #[instrument(name = "Fetch province subtree", level = "debug", skip(self))]
    async fn fetch_province_subtree(&self, province_id: i64) -> Result<ProvinceSubtree> {
        self.get_json(
            AREAS_HIERARCHY_PATH,
            &[("province_id", province_id.to_string())],
        )
        .await
    }

    #[instrument(name = "Search locations", level = "debug", skip(self))]
    async fn search_locations(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.get_json(SEARCH_PATH, &[("q", query.to_owned())]).await
    }

    #[instrument(name = "Search areas", level = "debug", skip(self))]
    async fn search_areas(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.get_json(AREAS_SEARCH_PATH, &[("q", query.to_owned())])
            .await
    }
}
