// src/config.rs
//! Engine configuration: radius bounds, per-domain cache staleness windows,
//! pagination limits, upstream fetch policy, and scoring knobs.
//!
//! Loaded from a TOML file (`FEED_CONFIG_PATH`, default `config/feed.toml`),
//! falling back to built-in defaults when the file is absent. A handful of
//! env overrides are recognized for deployment tuning.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ContentDomain;

pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_UPSTREAM_BASE_URL: &str = "FEED_UPSTREAM_BASE_URL";
pub const ENV_UPSTREAM_TIMEOUT_SECS: &str = "FEED_UPSTREAM_TIMEOUT_SECS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub radius: RadiusCfg,
    pub cache: CacheCfg,
    pub pagination: PaginationCfg,
    pub upstream: UpstreamCfg,
    pub scoring: ScoringCfg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadiusCfg {
    pub default_km: f64,
    pub max_km: f64,
    pub min_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub news_max_age_secs: u64,
    pub weather_max_age_secs: u64,
    pub events_max_age_secs: u64,
    pub jobs_max_age_secs: u64,
    /// Grid cell edge for location bucketing of cache keys.
    pub bucket_precision_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationCfg {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamCfg {
    pub timeout_secs: u64,
    /// When set, feeds are served from this HTTP upstream; otherwise the
    /// embedded fixtures back the sources (local dev, tests).
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringCfg {
    /// Half-life of the recency decay applied to open-ended items (news).
    pub news_half_life_hours: f64,
}

impl Default for RadiusCfg {
    fn default() -> Self {
        Self {
            default_km: 10.0,
            max_km: 50.0,
            min_km: 1.0,
        }
    }
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            news_max_age_secs: 900,
            weather_max_age_secs: 600,
            events_max_age_secs: 1800,
            jobs_max_age_secs: 3600,
            bucket_precision_km: 5.0,
        }
    }
}

impl Default for PaginationCfg {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl Default for UpstreamCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            base_url: None,
        }
    }
}

impl Default for ScoringCfg {
    fn default() -> Self {
        Self {
            news_half_life_hours: 24.0,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            radius: RadiusCfg::default(),
            cache: CacheCfg::default(),
            pagination: PaginationCfg::default(),
            upstream: UpstreamCfg::default(),
            scoring: ScoringCfg::default(),
        }
    }
}

impl FeedConfig {
    /// Load from `FEED_CONFIG_PATH` (or the default path), then apply env
    /// overrides. A missing file yields the built-in defaults; a present but
    /// unparsable file is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("failed to read feed config at {}: {}", path.display(), e)
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Parse from a TOML string. Used directly by tests.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: FeedConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_UPSTREAM_BASE_URL) {
            if !url.trim().is_empty() {
                self.upstream.base_url = Some(url.trim().to_string());
            }
        }
        if let Some(secs) = std::env::var(ENV_UPSTREAM_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.upstream.timeout_secs = secs;
        }
    }

    /// Harden odd values so a bad config cannot wedge the engine.
    fn sanitize(&mut self) {
        let d = FeedConfig::default();
        if !self.radius.min_km.is_finite() || self.radius.min_km <= 0.0 {
            self.radius.min_km = d.radius.min_km;
        }
        if !self.radius.max_km.is_finite() || self.radius.max_km < self.radius.min_km {
            self.radius.max_km = d.radius.max_km.max(self.radius.min_km);
        }
        if !self.radius.default_km.is_finite() {
            self.radius.default_km = d.radius.default_km;
        }
        self.radius.default_km = self
            .radius
            .default_km
            .clamp(self.radius.min_km, self.radius.max_km);

        if self.pagination.max_limit == 0 {
            self.pagination.max_limit = d.pagination.max_limit;
        }
        if self.pagination.default_limit == 0 {
            self.pagination.default_limit = d.pagination.default_limit;
        }
        self.pagination.default_limit = self.pagination.default_limit.min(self.pagination.max_limit);

        if !self.cache.bucket_precision_km.is_finite() || self.cache.bucket_precision_km <= 0.0 {
            self.cache.bucket_precision_km = d.cache.bucket_precision_km;
        }
        if !self.scoring.news_half_life_hours.is_finite() || self.scoring.news_half_life_hours <= 0.0
        {
            self.scoring.news_half_life_hours = d.scoring.news_half_life_hours;
        }
        if self.upstream.timeout_secs == 0 {
            self.upstream.timeout_secs = d.upstream.timeout_secs;
        }
    }

    /// Staleness tolerance for a domain's cached batches.
    pub fn max_age(&self, domain: ContentDomain) -> Duration {
        let secs = match domain {
            ContentDomain::News => self.cache.news_max_age_secs,
            ContentDomain::Alerts => self.cache.weather_max_age_secs,
            ContentDomain::Events => self.cache.events_max_age_secs,
            ContentDomain::Jobs => self.cache.jobs_max_age_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FeedConfig::default();
        assert_eq!(cfg.radius.default_km, 10.0);
        assert_eq!(cfg.radius.max_km, 50.0);
        assert_eq!(cfg.radius.min_km, 1.0);
        assert_eq!(cfg.max_age(ContentDomain::News), Duration::from_secs(900));
        assert_eq!(cfg.max_age(ContentDomain::Alerts), Duration::from_secs(600));
        assert_eq!(cfg.max_age(ContentDomain::Events), Duration::from_secs(1800));
        assert_eq!(cfg.max_age(ContentDomain::Jobs), Duration::from_secs(3600));
        assert_eq!(cfg.pagination.default_limit, 20);
        assert_eq!(cfg.pagination.max_limit, 100);
        assert_eq!(cfg.upstream_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let cfg = FeedConfig::from_toml_str(
            r#"
[radius]
default_km = 25.0

[cache]
news_max_age_secs = 60
"#,
        )
        .expect("parse");
        assert_eq!(cfg.radius.default_km, 25.0);
        assert_eq!(cfg.radius.max_km, 50.0);
        assert_eq!(cfg.max_age(ContentDomain::News), Duration::from_secs(60));
        assert_eq!(cfg.max_age(ContentDomain::Jobs), Duration::from_secs(3600));
    }

    #[test]
    fn sanitize_repairs_inverted_radius_bounds() {
        let mut cfg = FeedConfig::from_toml_str(
            r#"
[radius]
min_km = 20.0
max_km = 5.0
default_km = 100.0
"#,
        )
        .expect("parse");
        cfg.sanitize();
        assert!(cfg.radius.max_km >= cfg.radius.min_km);
        assert!(cfg.radius.default_km <= cfg.radius.max_km);
        assert!(cfg.radius.default_km >= cfg.radius.min_km);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_upstream_settings() {
        std::env::set_var(ENV_UPSTREAM_BASE_URL, "http://upstream.local");
        std::env::set_var(ENV_UPSTREAM_TIMEOUT_SECS, "3");

        let mut cfg = FeedConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.upstream.base_url.as_deref(), Some("http://upstream.local"));
        assert_eq!(cfg.upstream.timeout_secs, 3);

        std::env::remove_var(ENV_UPSTREAM_BASE_URL);
        std::env::remove_var(ENV_UPSTREAM_TIMEOUT_SECS);
    }
}
