// src/sources/mod.rs
pub mod fixture;
pub mod http;

use anyhow::Result;

use crate::types::{ContentDomain, Location};

/// Upstream fetch capability. Returns loosely-typed documents so one
/// malformed item cannot fail a whole batch; the normalizer decodes and
/// drops per item.
///
/// Swappable between the embedded fixtures (tests, local dev) and the HTTP
/// upstream client (production); the aggregator only sees this trait.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(
        &self,
        domain: ContentDomain,
        origin: &Location,
        radius_km: f64,
    ) -> Result<Vec<serde_json::Value>>;

    fn name(&self) -> &'static str;
}
