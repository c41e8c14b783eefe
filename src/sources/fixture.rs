// src/sources/fixture.rs
//! In-memory source backed by embedded JSON fixtures. Stands in for the
//! real upstream in local dev and tests; tests can also inject their own
//! documents per domain.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::geo;
use crate::sources::DataSource;
use crate::types::{ContentDomain, Location};

pub struct FixtureSource {
    documents: HashMap<ContentDomain, Vec<serde_json::Value>>,
}

impl FixtureSource {
    /// Source backed by the fixtures shipped with the repo.
    pub fn embedded() -> Result<Self> {
        let mut documents = HashMap::new();
        for (domain, raw) in [
            (
                ContentDomain::News,
                include_str!("../../tests/fixtures/news.json"),
            ),
            (
                ContentDomain::Events,
                include_str!("../../tests/fixtures/events.json"),
            ),
            (
                ContentDomain::Jobs,
                include_str!("../../tests/fixtures/jobs.json"),
            ),
            (
                ContentDomain::Alerts,
                include_str!("../../tests/fixtures/alerts.json"),
            ),
        ] {
            documents.insert(domain, parse_documents(raw, domain)?);
        }
        Ok(Self { documents })
    }

    /// Source with caller-provided documents for one or more domains.
    pub fn from_documents(documents: HashMap<ContentDomain, Vec<serde_json::Value>>) -> Self {
        Self { documents }
    }
}

fn parse_documents(raw: &str, domain: ContentDomain) -> Result<Vec<serde_json::Value>> {
    let docs: Vec<serde_json::Value> = serde_json::from_str(raw)
        .with_context(|| format!("parsing embedded {domain} fixture"))?;
    Ok(docs)
}

/// Keep a document iff its location parses and lies within the radius.
/// Documents without a usable location pass through so the normalizer can
/// drop and log them, the same as a real upstream would deliver them.
fn within_radius(doc: &serde_json::Value, origin: &Location, radius_km: f64) -> bool {
    let Some(loc) = doc.get("location") else {
        return true;
    };
    let (Some(lat), Some(lon)) = (
        loc.get("latitude").and_then(|v| v.as_f64()),
        loc.get("longitude").and_then(|v| v.as_f64()),
    ) else {
        return true;
    };
    let candidate = Location::new(lat, lon);
    if !candidate.is_valid() {
        return true;
    }
    geo::within_radius(origin, &candidate, radius_km)
}

#[async_trait::async_trait]
impl DataSource for FixtureSource {
    async fn fetch(
        &self,
        domain: ContentDomain,
        origin: &Location,
        radius_km: f64,
    ) -> Result<Vec<serde_json::Value>> {
        let docs = self.documents.get(&domain).cloned().unwrap_or_default();
        Ok(docs
            .into_iter()
            .filter(|d| within_radius(d, origin, radius_km))
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixtures"
    }
}
