//! TMDb (The Movie Database) API provider
//!
//! Read-only pass-through to the v3 REST API, authenticated with an API key
//! query parameter. Listing endpoints that change slowly (top rated, upcoming)
//! and per-movie lookups are cached here; trending, popular and search are
//! cached one level up by the response cache.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{TimeWindow, TmdbMovie, TmdbPage},
    services::providers::MovieProvider,
};

const DETAILS_CACHE_TTL: u64 = 3600; // 1 hour
const RECOMMENDATIONS_CACHE_TTL: u64 = 600; // 10 minutes
const LISTING_CACHE_TTL: u64 = 600; // 10 minutes

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    /// Creates a provider whose every upstream call is bounded by `timeout`
    pub fn new(cache: Cache, api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            tracing::error!("TMDb API key is not set");
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint.trim_start_matches('/'))
    }

    /// Performs a GET against TMDb and decodes the JSON body
    async fn request<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> AppResult<T> {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(url = %url, "Requesting TMDb");

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, endpoint = %endpoint, "TMDb API request failed");
                e
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "TMDb resource {} not found",
                endpoint
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, endpoint = %endpoint, "TMDb API returned an error");
            return Err(AppError::ExternalApi(format!(
                "TMDb API returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, endpoint = %endpoint, "Failed to deserialize TMDb response");
            AppError::ExternalApi(format!("Failed to parse TMDb response: {}", e))
        })
    }

    async fn page(&self, endpoint: &str, page: u32) -> AppResult<TmdbPage> {
        self.request(endpoint, &[("page", page.to_string())]).await
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn trending(&self, window: TimeWindow, page: u32) -> AppResult<TmdbPage> {
        self.page(&format!("trending/movie/{}", window), page).await
    }

    async fn popular(&self, page: u32) -> AppResult<TmdbPage> {
        self.page("movie/popular", page).await
    }

    async fn top_rated(&self, page: u32) -> AppResult<TmdbPage> {
        self.cache
            .get_or_compute(&CacheKey::TmdbTopRated(page), LISTING_CACHE_TTL, || {
                self.page("movie/top_rated", page)
            })
            .await
    }

    async fn upcoming(&self, page: u32) -> AppResult<TmdbPage> {
        self.cache
            .get_or_compute(&CacheKey::TmdbUpcoming(page), LISTING_CACHE_TTL, || {
                self.page("movie/upcoming", page)
            })
            .await
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<TmdbPage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(TmdbPage {
                page: 1,
                results: Vec::new(),
                total_pages: 0,
                total_results: 0,
            });
        }

        let results: TmdbPage = self
            .request(
                "search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            query = %query,
            results = results.results.len(),
            provider = self.name(),
            "Movie search completed"
        );

        Ok(results)
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<TmdbMovie> {
        let endpoint = format!("movie/{}", tmdb_id);
        self.cache
            .get_or_compute(&CacheKey::TmdbMovie(tmdb_id), DETAILS_CACHE_TTL, || async move {
                self.request(&endpoint, &[]).await
            })
            .await
    }

    async fn recommendations(&self, tmdb_id: i64, page: u32) -> AppResult<TmdbPage> {
        let endpoint = format!("movie/{}/recommendations", tmdb_id);
        self.cache
            .get_or_compute(
                &CacheKey::TmdbRecommendations {
                    movie_id: tmdb_id,
                    page,
                },
                RECOMMENDATIONS_CACHE_TTL,
                || async move { self.page(&endpoint, page).await },
            )
            .await
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
