// src/types.rs
//! Core value types shared across the engine: locations, preferences,
//! content domains, and the pagination envelope.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A geographic point with optional postal metadata.
///
/// Equality is by coordinate pair only; the address fields are display
/// metadata and never participate in comparisons or cache keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "postalCode")]
    pub postal_code: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
        }
    }

    /// Both coordinates are finite and inside the valid lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

/// User interests consumed by the scorer. Read-only input; the engine never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Preferred categories. Empty means "show everything" (no weighting).
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Search radius in kilometers.
    pub radius_km: f64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub is_premium: bool,
}

fn default_language() -> String {
    "en".to_string()
}

impl UserPreferences {
    pub fn with_radius(radius_km: f64) -> Self {
        Self {
            categories: BTreeSet::new(),
            radius_km,
            language: default_language(),
            is_premium: false,
        }
    }

    pub fn prefers(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// The content domains the engine aggregates. Each has its own upstream
/// staleness tolerance and eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentDomain {
    News,
    Events,
    Jobs,
    Alerts,
}

impl ContentDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentDomain::News => "news",
            ContentDomain::Events => "events",
            ContentDomain::Jobs => "jobs",
            ContentDomain::Alerts => "alerts",
        }
    }
}

impl fmt::Display for ContentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "news" => Ok(ContentDomain::News),
            "events" => Ok(ContentDomain::Events),
            "jobs" => Ok(ContentDomain::Jobs),
            "alerts" | "weather" => Ok(ContentDomain::Alerts),
            other => Err(format!("unknown content domain: {other}")),
        }
    }
}

/// Requested slice of a feed, already validated/clamped by the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

/// Pagination block of a feed response, mirrored by UI clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    /// Derive the pagination block for a slice `[offset, offset+limit)` of
    /// `total` post-filter items.
    pub fn for_slice(total: usize, limit: usize, offset: usize) -> Self {
        let total_pages = total.div_ceil(limit).max(1);
        let page = offset / limit + 1;
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: offset + limit < total,
            has_previous: offset > 0 && total > 0,
        }
    }
}

/// One ordered page of feed output.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    /// True when the page was built from a stale cache entry because the
    /// upstream refresh failed.
    pub degraded: bool,
}
