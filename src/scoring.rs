// src/scoring.rs
//! Composite relevance scoring and the deterministic total order feeds are
//! sorted by.
//!
//! `score = base_relevance * category_weight * distance_decay * recency_decay`
//!
//! Items past their validity window are excluded upstream and never reach
//! the scorer; the recency term only distinguishes open-ended items (news),
//! which decay exponentially from their publish time.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::normalize::ScorableItem;
use crate::types::UserPreferences;

/// Weight applied to items outside the user's preferred categories. Chosen
/// so a category match dominates distance and base-relevance differences.
pub const OFF_CATEGORY_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    half_life_hours: f64,
}

impl RelevanceScorer {
    pub fn new(news_half_life_hours: f64) -> Self {
        Self {
            half_life_hours: news_half_life_hours.max(f64::MIN_POSITIVE),
        }
    }

    /// Composite score in `[0, +inf)`. Deterministic for fixed inputs.
    pub fn score(&self, item: &ScorableItem, prefs: &UserPreferences, now: DateTime<Utc>) -> f64 {
        let category_weight = if prefs.categories.is_empty() || prefs.prefers(&item.category) {
            1.0
        } else {
            OFF_CATEGORY_WEIGHT
        };
        let distance_decay = 1.0 / (1.0 + item.distance_km);
        item.base_relevance * category_weight * distance_decay * self.recency_decay(item, now)
    }

    fn recency_decay(&self, item: &ScorableItem, now: DateTime<Utc>) -> f64 {
        match (item.valid_from, item.valid_until) {
            // Window-bounded (events, jobs with expiry, alerts): full weight
            // while inside the window; expired items were already cut.
            (_, Some(_)) => 1.0,
            // Open-ended (news): exponential half-life decay from publish.
            (Some(from), None) => {
                let age_hours = (now - from).num_seconds().max(0) as f64 / 3600.0;
                0.5_f64.powf(age_hours / self.half_life_hours)
            }
            (None, None) => 1.0,
        }
    }
}

/// A scored entity ready for ordering and pagination.
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    pub entity: T,
    pub envelope: ScorableItem,
    pub score: f64,
}

/// The total order feeds are sorted by: score descending, then distance
/// ascending, then id ascending. Total so that pagination is stable across
/// repeated calls with unchanged inputs.
pub fn feed_order<T>(a: &Ranked<T>, b: &Ranked<T>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.envelope.distance_km.total_cmp(&b.envelope.distance_km))
        .then_with(|| a.envelope.id.cmp(&b.envelope.id))
}
