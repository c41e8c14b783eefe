// src/normalize.rs
//! Projection of domain entities into the common scoring envelope, plus the
//! lenient per-item decode of raw upstream documents and text cleanup used
//! by free-text search.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::content::ContentItem;
use crate::error::NormalizationError;
use crate::geo;
use crate::types::{ContentDomain, Location};

/// Normalized, domain-agnostic projection of a content entity used for
/// ranking. `distance_km` is computed from the caller location at query
/// time, never stored upstream.
#[derive(Debug, Clone, Serialize)]
pub struct ScorableItem {
    pub id: String,
    pub domain: ContentDomain,
    pub category: String,
    pub location: Location,
    pub distance_km: f64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub base_relevance: f64,
    pub source_id: String,
}

/// Project one entity into its scoring envelope relative to `origin`.
///
/// Total and side-effect-free. Fails only on upstream contract violations
/// (empty id/category, unusable coordinates, inverted validity window); the
/// aggregator drops such items and logs, never aborting the batch.
pub fn normalize<T: ContentItem>(
    entity: &T,
    origin: &Location,
) -> Result<ScorableItem, NormalizationError> {
    if entity.id().trim().is_empty() {
        return Err(NormalizationError::MissingField("id"));
    }
    if entity.category().trim().is_empty() {
        return Err(NormalizationError::MissingField("category"));
    }
    if !entity.location().is_valid() {
        return Err(NormalizationError::InvalidLocation);
    }

    let (valid_from, valid_until) = entity.validity();
    if let (Some(from), Some(until)) = (valid_from, valid_until) {
        if from > until {
            return Err(NormalizationError::InvertedWindow);
        }
    }

    Ok(ScorableItem {
        id: entity.id().to_string(),
        domain: T::DOMAIN,
        category: entity.category().to_string(),
        location: entity.location().clone(),
        distance_km: geo::distance_km(origin, entity.location()),
        valid_from,
        valid_until,
        base_relevance: entity.base_relevance().clamp(0.0, 1.0),
        source_id: entity.source_id().to_string(),
    })
}

/// Decode a batch of raw upstream documents, dropping malformed ones.
///
/// One bad document never poisons the batch: each failure is logged with
/// the document id (when present) and the decode reason, and counted.
/// Returns the decoded entities and the number dropped.
pub fn decode_batch<T: DeserializeOwned>(
    domain: ContentDomain,
    raw: Vec<serde_json::Value>,
) -> (Vec<T>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for doc in raw {
        let id_hint = doc
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("<no id>")
            .to_string();
        match serde_json::from_value::<T>(doc) {
            Ok(entity) => out.push(entity),
            Err(e) => {
                dropped += 1;
                tracing::warn!(
                    target: "feed",
                    domain = %domain,
                    item = %id_hint,
                    reason = %NormalizationError::from(e),
                    "dropping malformed upstream document"
                );
            }
        }
    }

    if dropped > 0 {
        metrics::counter!("feed_items_dropped_total", "domain" => domain.as_str())
            .increment(dropped as u64);
    }
    (out, dropped)
}

/// Clean text for matching: HTML entity decode, tag strip, quote
/// normalization, whitespace collapse, lowercasing.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_lowercase()
}
