// src/filters.rs
//! Composable feed filters. Order-independent predicates over the scoring
//! envelope plus the raw domain entity (salary and price live only on the
//! entity), AND-ed together by the aggregator.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::content::{ContentItem, EmploymentType};
use crate::normalize::{clean_text, ScorableItem};

#[derive(Debug, Clone)]
pub enum Filter {
    /// Hard category filter (distinct from preference weighting).
    Categories(BTreeSet<String>),
    /// Temporal anchor inside `[from, to]`; open bounds allowed.
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    /// Case-insensitive free-text match against title/description/tags.
    Text(String),
    /// Price inside `[min, max]`; a missing price counts as free.
    PriceRange { min: Option<f64>, max: Option<f64> },
    FreeOnly,
    Employment(EmploymentType),
    RemoteOnly,
    /// Annualized salary range, strict containment: the advertised range
    /// must lie entirely inside `[min, max]`. Listings without a salary
    /// never match.
    SalaryRange { min: f64, max: f64 },
}

impl Filter {
    pub fn matches<T: ContentItem>(&self, envelope: &ScorableItem, entity: &T) -> bool {
        match self {
            Filter::Categories(wanted) => wanted
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&envelope.category)),

            Filter::DateRange { from, to } => match entity.anchor_time() {
                Some(anchor) => {
                    from.map_or(true, |f| anchor >= f) && to.map_or(true, |t| anchor <= t)
                }
                None => false,
            },

            Filter::Text(query) => {
                let needle = clean_text(query);
                if needle.is_empty() {
                    return true;
                }
                clean_text(&entity.search_haystack()).contains(&needle)
            }

            Filter::PriceRange { min, max } => {
                let price = entity.price().unwrap_or(0.0);
                min.map_or(true, |m| price >= m) && max.map_or(true, |m| price <= m)
            }

            Filter::FreeOnly => entity.price().unwrap_or(0.0) == 0.0,

            Filter::Employment(wanted) => entity.employment_type() == Some(*wanted),

            Filter::RemoteOnly => entity.is_remote() == Some(true),

            Filter::SalaryRange { min, max } => match entity.salary() {
                Some(salary) => {
                    let (annual_min, annual_max) = salary.annual_range();
                    annual_min >= *min && annual_max <= *max
                }
                None => false,
            },
        }
    }
}

/// All filters must pass for an item to survive.
pub fn apply_all<T: ContentItem>(
    filters: &[Filter],
    envelope: &ScorableItem,
    entity: &T,
) -> bool {
    filters.iter().all(|f| f.matches(envelope, entity))
}
