// src/api.rs
//! Axum router and handlers for the feed endpoints.
//!
//! Every domain exposes the same shape:
//!   GET /{domain}?lat&lng&radius&category&prefs&q&limit&offset&…
//!   GET /{domain}/categories?lat&lng
//!   GET /{domain}/{id}?lat&lng
//! plus /health. Validation errors surface as the
//! `{code, message, details?, timestamp}` envelope.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::FeedCache;
use crate::config::FeedConfig;
use crate::content::{
    ContentItem, EmploymentType, JobListing, LocalEvent, NewsArticle, WeatherAlert,
};
use crate::error::FeedError;
use crate::feed::{FeedAggregator, FeedEntry, FeedView, RawBatch};
use crate::filters::Filter;
use crate::sources::{fixture::FixtureSource, http::HttpSource, DataSource};
use crate::types::{FeedPage, Location, UserPreferences};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FeedConfig>,
    news: Arc<FeedAggregator<NewsArticle>>,
    events: Arc<FeedAggregator<LocalEvent>>,
    jobs: Arc<FeedAggregator<JobListing>>,
    alerts: Arc<FeedAggregator<WeatherAlert>>,
}

impl AppState {
    /// Wire all four aggregators over one shared cache and source.
    pub fn new(source: Arc<dyn DataSource>, config: FeedConfig) -> Self {
        crate::metrics::ensure_metrics_described();
        let config = Arc::new(config);
        let cache: Arc<FeedCache<RawBatch>> = Arc::new(FeedCache::new());
        Self {
            news: Arc::new(FeedAggregator::new(
                source.clone(),
                cache.clone(),
                config.clone(),
            )),
            events: Arc::new(FeedAggregator::new(
                source.clone(),
                cache.clone(),
                config.clone(),
            )),
            jobs: Arc::new(FeedAggregator::new(
                source.clone(),
                cache.clone(),
                config.clone(),
            )),
            alerts: Arc::new(FeedAggregator::new(source, cache, config.clone())),
            config,
        }
    }

    /// State from config: an HTTP upstream when a base URL is configured,
    /// the embedded fixtures otherwise (local dev, tests).
    pub fn from_config(config: FeedConfig) -> anyhow::Result<Self> {
        let source: Arc<dyn DataSource> = match &config.upstream.base_url {
            Some(url) => Arc::new(HttpSource::new(url.clone())),
            None => Arc::new(FixtureSource::embedded()?),
        };
        Ok(Self::new(source, config))
    }

    /// Fixture-backed state with default config. Used by tests.
    pub fn with_fixtures() -> anyhow::Result<Self> {
        Self::from_config(FeedConfig::default())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/news", get(news_feed))
        .route("/news/categories", get(news_categories))
        .route("/news/{id}", get(news_by_id))
        .route("/events", get(events_feed))
        .route("/events/categories", get(events_categories))
        .route("/events/{id}", get(events_by_id))
        .route("/jobs", get(jobs_feed))
        .route("/jobs/categories", get(jobs_categories))
        .route("/jobs/{id}", get(jobs_by_id))
        .route("/alerts", get(alerts_feed))
        .route("/alerts/categories", get(alerts_categories))
        .route("/alerts/{id}", get(alerts_by_id))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Query parameters shared by every feed endpoint. Domain-specific params
/// are simply ignored by the other domains.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
    /// Comma-separated hard category filter.
    category: Option<String>,
    /// Comma-separated preferred categories (weighting, not filtering).
    prefs: Option<String>,
    q: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    lang: Option<String>,
    premium: Option<bool>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    // events
    price_min: Option<f64>,
    price_max: Option<f64>,
    free: Option<bool>,
    // jobs
    employment_type: Option<EmploymentType>,
    remote: Option<bool>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    // news views
    trending: Option<bool>,
    breaking: Option<bool>,
}

impl FeedQuery {
    fn origin(&self) -> Result<Location, FeedError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(Location::new(lat, lng)),
            _ => Err(FeedError::validation("lat and lng are required")),
        }
    }

    fn preferences(&self, config: &FeedConfig) -> UserPreferences {
        UserPreferences {
            categories: csv_set(self.prefs.as_deref()),
            radius_km: self.radius.unwrap_or(config.radius.default_km),
            language: self.lang.clone().unwrap_or_else(|| "en".to_string()),
            is_premium: self.premium.unwrap_or(false),
        }
    }

    fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();

        let categories = csv_set(self.category.as_deref());
        if !categories.is_empty() {
            filters.push(Filter::Categories(categories));
        }
        if let Some(q) = self.q.as_deref().filter(|q| !q.trim().is_empty()) {
            filters.push(Filter::Text(q.to_string()));
        }
        if self.from.is_some() || self.to.is_some() {
            filters.push(Filter::DateRange {
                from: self.from,
                to: self.to,
            });
        }
        if self.price_min.is_some() || self.price_max.is_some() {
            filters.push(Filter::PriceRange {
                min: self.price_min,
                max: self.price_max,
            });
        }
        if self.free == Some(true) {
            filters.push(Filter::FreeOnly);
        }
        if let Some(t) = self.employment_type {
            filters.push(Filter::Employment(t));
        }
        if self.remote == Some(true) {
            filters.push(Filter::RemoteOnly);
        }
        if self.salary_min.is_some() || self.salary_max.is_some() {
            filters.push(Filter::SalaryRange {
                min: self.salary_min.unwrap_or(0.0),
                max: self.salary_max.unwrap_or(f64::MAX),
            });
        }
        filters
    }

    fn view(&self) -> FeedView {
        if self.breaking == Some(true) {
            FeedView::Breaking
        } else if self.trending == Some(true) {
            FeedView::Trending
        } else {
            FeedView::Standard
        }
    }
}

fn csv_set(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

async fn serve_feed<T>(
    agg: &FeedAggregator<T>,
    config: &FeedConfig,
    query: FeedQuery,
    view: FeedView,
) -> Result<Json<FeedPage<FeedEntry<T>>>, FeedError>
where
    T: ContentItem + DeserializeOwned + Serialize + Clone,
{
    let origin = query.origin()?;
    let prefs = query.preferences(config);
    let filters = query.filters();
    let page = agg
        .personalized_feed(
            &origin,
            &prefs,
            &filters,
            query.limit,
            query.offset.unwrap_or(0),
            view,
            Utc::now(),
        )
        .await?;
    Ok(Json(page))
}

async fn serve_item<T>(
    agg: &FeedAggregator<T>,
    query: FeedQuery,
    id: String,
) -> Result<Json<T>, FeedError>
where
    T: ContentItem + DeserializeOwned + Serialize + Clone,
{
    let origin = query.origin()?;
    Ok(Json(agg.item_by_id(&origin, &id).await?))
}

async fn serve_categories<T>(
    agg: &FeedAggregator<T>,
    query: FeedQuery,
) -> Result<Json<Vec<String>>, FeedError>
where
    T: ContentItem + DeserializeOwned + Serialize + Clone,
{
    let origin = query.origin()?;
    Ok(Json(agg.categories(&origin).await?))
}

async fn news_feed(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedPage<FeedEntry<NewsArticle>>>, FeedError> {
    let view = q.view();
    serve_feed(&state.news, &state.config, q, view).await
}

async fn news_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<NewsArticle>, FeedError> {
    serve_item(&state.news, q, id).await
}

async fn news_categories(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<String>>, FeedError> {
    serve_categories(&state.news, q).await
}

async fn events_feed(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedPage<FeedEntry<LocalEvent>>>, FeedError> {
    serve_feed(&state.events, &state.config, q, FeedView::Standard).await
}

async fn events_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<LocalEvent>, FeedError> {
    serve_item(&state.events, q, id).await
}

async fn events_categories(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<String>>, FeedError> {
    serve_categories(&state.events, q).await
}

async fn jobs_feed(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedPage<FeedEntry<JobListing>>>, FeedError> {
    serve_feed(&state.jobs, &state.config, q, FeedView::Standard).await
}

async fn jobs_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<JobListing>, FeedError> {
    serve_item(&state.jobs, q, id).await
}

async fn jobs_categories(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<String>>, FeedError> {
    serve_categories(&state.jobs, q).await
}

async fn alerts_feed(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedPage<FeedEntry<WeatherAlert>>>, FeedError> {
    serve_feed(&state.alerts, &state.config, q, FeedView::Standard).await
}

async fn alerts_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<WeatherAlert>, FeedError> {
    serve_item(&state.alerts, q, id).await
}

async fn alerts_categories(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<String>>, FeedError> {
    serve_categories(&state.alerts, q).await
}
