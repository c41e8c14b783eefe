// src/feed.rs
//! Feed aggregation: cache-or-fetch, normalization, filtering, scoring,
//! ordering, pagination. One generic aggregator serves every content
//! domain; the domain entity type parameter supplies the differences.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{cache_key, Cached, FeedCache};
use crate::config::FeedConfig;
use crate::content::ContentItem;
use crate::error::FeedError;
use crate::filters::{apply_all, Filter};
use crate::normalize::{decode_batch, normalize};
use crate::scoring::{feed_order, Ranked, RelevanceScorer};
use crate::sources::DataSource;
use crate::types::{FeedPage, Location, PageRequest, Pagination, UserPreferences};

/// Raw upstream batch as cached: loosely-typed documents, shared cheaply
/// between concurrent requests.
pub type RawBatch = Arc<Vec<serde_json::Value>>;

/// Breaking news lookback window.
const BREAKING_WINDOW_HOURS: i64 = 6;
/// Minimum base relevance for the breaking view.
const BREAKING_MIN_RELEVANCE: f64 = 0.8;
/// Cap on the trending view.
const TRENDING_LIMIT: usize = 10;

/// Feed presentation variant. `Trending` and `Breaking` reproduce the
/// editorial views of the news domain; they are harmless (if unexposed) for
/// other domains since every envelope carries a base relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedView {
    #[default]
    Standard,
    Trending,
    Breaking,
}

/// One feed row: the domain entity plus its query-time annotations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_km: f64,
    pub score: f64,
}

pub struct FeedAggregator<T> {
    source: Arc<dyn DataSource>,
    cache: Arc<FeedCache<RawBatch>>,
    scorer: RelevanceScorer,
    config: Arc<FeedConfig>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FeedAggregator<T>
where
    T: ContentItem + DeserializeOwned + Serialize + Clone,
{
    pub fn new(
        source: Arc<dyn DataSource>,
        cache: Arc<FeedCache<RawBatch>>,
        config: Arc<FeedConfig>,
    ) -> Self {
        let scorer = RelevanceScorer::new(config.scoring.news_half_life_hours);
        Self {
            source,
            cache,
            scorer,
            config,
            _marker: PhantomData,
        }
    }

    /// Reject bad coordinates and out-of-bounds radii before any fetch.
    fn validate(&self, origin: &Location, radius_km: f64) -> Result<(), FeedError> {
        if !origin.is_valid() {
            return Err(FeedError::validation(
                "latitude/longitude out of range or not finite",
            ));
        }
        let r = &self.config.radius;
        if !radius_km.is_finite() || radius_km < r.min_km || radius_km > r.max_km {
            return Err(FeedError::validation(format!(
                "radius must be between {} and {} km",
                r.min_km, r.max_km
            )));
        }
        Ok(())
    }

    /// Clamp a requested slice to `[1, max_limit]`. Any offset is legal; one
    /// past the end just yields an empty page.
    fn clamp_page(&self, limit: Option<usize>, offset: usize) -> PageRequest {
        let p = &self.config.pagination;
        let limit = limit.unwrap_or(p.default_limit).clamp(1, p.max_limit);
        PageRequest { limit, offset }
    }

    /// Resolve the raw batch for this bucket from cache or upstream.
    ///
    /// The upstream call always uses the configured maximum radius so one
    /// cached batch serves every narrower query in the same bucket; the
    /// per-request radius is applied in-process.
    async fn fetch_batch(
        &self,
        origin: &Location,
        categories: &BTreeSet<String>,
    ) -> Result<Cached<RawBatch>, FeedError> {
        let key = cache_key(
            T::DOMAIN,
            origin,
            self.config.cache.bucket_precision_km,
            categories,
        );
        let max_age = self.config.max_age(T::DOMAIN);
        let timeout = self.config.upstream_timeout();
        let fetch_radius = self.config.radius.max_km;
        let source = self.source.clone();
        let origin = origin.clone();

        self.cache
            .get_or_fetch(&key, max_age, move || async move {
                match tokio::time::timeout(timeout, source.fetch(T::DOMAIN, &origin, fetch_radius))
                    .await
                {
                    Ok(Ok(docs)) => Ok(Arc::new(docs)),
                    Ok(Err(e)) => Err(FeedError::Upstream(e.to_string())),
                    Err(_) => Err(FeedError::UpstreamTimeout(timeout)),
                }
            })
            .await
    }

    /// The personalized feed pipeline: deterministic for identical inputs
    /// and cache state.
    pub async fn personalized_feed(
        &self,
        origin: &Location,
        prefs: &UserPreferences,
        filters: &[Filter],
        limit: Option<usize>,
        offset: usize,
        view: FeedView,
        now: DateTime<Utc>,
    ) -> Result<FeedPage<FeedEntry<T>>, FeedError> {
        self.validate(origin, prefs.radius_km)?;
        let page = self.clamp_page(limit, offset);
        metrics::counter!("feed_requests_total", "domain" => T::DOMAIN.as_str()).increment(1);

        // Hard-filter categories participate in the cache key.
        let key_categories = filters
            .iter()
            .find_map(|f| match f {
                Filter::Categories(set) => Some(set.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let batch = self.fetch_batch(origin, &key_categories).await?;
        let (entities, decode_dropped) =
            decode_batch::<T>(T::DOMAIN, (*batch.value).clone());

        let mut ranked: Vec<Ranked<T>> = Vec::with_capacity(entities.len());
        let mut norm_dropped = 0usize;

        for entity in entities {
            if !entity.eligible_at(now) {
                continue;
            }
            let envelope = match normalize(&entity, origin) {
                Ok(env) => env,
                Err(reason) => {
                    norm_dropped += 1;
                    metrics::counter!("feed_items_dropped_total", "domain" => T::DOMAIN.as_str())
                        .increment(1);
                    tracing::warn!(
                        target: "feed",
                        domain = %T::DOMAIN,
                        item = %entity.id(),
                        reason = %reason,
                        "dropping item failing normalization"
                    );
                    continue;
                }
            };

            // Radius is an exclusion, not a down-weight.
            if envelope.distance_km > prefs.radius_km {
                continue;
            }
            if !apply_all(filters, &envelope, &entity) {
                continue;
            }
            if view == FeedView::Breaking {
                let cutoff = now - ChronoDuration::hours(BREAKING_WINDOW_HOURS);
                let recent = envelope.valid_from.map_or(false, |t| t >= cutoff);
                if !recent || envelope.base_relevance <= BREAKING_MIN_RELEVANCE {
                    continue;
                }
            }

            let score = self.scorer.score(&envelope, prefs, now);
            ranked.push(Ranked {
                entity,
                envelope,
                score,
            });
        }

        match view {
            FeedView::Trending => {
                ranked.sort_by(|a, b| {
                    b.envelope
                        .base_relevance
                        .total_cmp(&a.envelope.base_relevance)
                        .then_with(|| a.envelope.id.cmp(&b.envelope.id))
                });
                ranked.truncate(TRENDING_LIMIT);
            }
            _ => ranked.sort_by(feed_order),
        }

        let total = ranked.len();
        tracing::info!(
            target: "feed",
            domain = %T::DOMAIN,
            total,
            dropped = decode_dropped + norm_dropped,
            degraded = batch.stale,
            "feed assembled"
        );

        let data = ranked
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|r| FeedEntry {
                item: r.entity,
                distance_km: r.envelope.distance_km,
                score: r.score,
            })
            .collect();

        Ok(FeedPage {
            data,
            pagination: Pagination::for_slice(total, page.limit, page.offset),
            degraded: batch.stale,
        })
    }

    /// Single-item lookup within the caller's area.
    pub async fn item_by_id(&self, origin: &Location, id: &str) -> Result<T, FeedError> {
        if !origin.is_valid() {
            return Err(FeedError::validation(
                "latitude/longitude out of range or not finite",
            ));
        }
        let batch = self.fetch_batch(origin, &BTreeSet::new()).await?;
        let (entities, _) = decode_batch::<T>(T::DOMAIN, (*batch.value).clone());
        entities
            .into_iter()
            .find(|e| e.id() == id)
            .ok_or_else(|| FeedError::not_found(T::DOMAIN.as_str(), id))
    }

    /// Distinct category inventory of the caller's area, sorted.
    pub async fn categories(&self, origin: &Location) -> Result<Vec<String>, FeedError> {
        if !origin.is_valid() {
            return Err(FeedError::validation(
                "latitude/longitude out of range or not finite",
            ));
        }
        let batch = self.fetch_batch(origin, &BTreeSet::new()).await?;
        let (entities, _) = decode_batch::<T>(T::DOMAIN, (*batch.value).clone());
        let set: BTreeSet<String> = entities
            .iter()
            .map(|e| e.category().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Drop every cached batch of this domain (e.g. after a preference or
    /// location change upstream of the engine).
    pub fn invalidate(&self) -> usize {
        self.cache.invalidate_prefix(&format!("{}/", T::DOMAIN))
    }
}
