// src/content.rs
//! Domain entities fetched from upstream sources, and the `ContentItem`
//! seam the generic aggregator works against.
//!
//! Entities are immutable once fetched. Wire format is the upstream
//! camelCase JSON. None of them stores a distance: distance depends on the
//! caller location and is computed per query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContentDomain, Location};

/// Placeholder base relevance for domains without an upstream scoring
/// signal (events, jobs). To be replaced once such a signal exists.
pub const DEFAULT_BASE_RELEVANCE: f64 = 0.5;

/// Behavior each domain entity contributes to the shared engine.
pub trait ContentItem: Sized {
    const DOMAIN: ContentDomain;

    fn id(&self) -> &str;
    fn category(&self) -> &str;
    fn location(&self) -> &Location;
    fn source_id(&self) -> &str;

    /// Primary temporal anchor, targeted by the date-range filter:
    /// publish time for news, start time for events/alerts, posting time
    /// for jobs.
    fn anchor_time(&self) -> Option<DateTime<Utc>>;

    /// Validity window projected into the scoring envelope. An open end
    /// means the item never hard-expires (news, open-ended jobs).
    fn validity(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

    /// Seed relevance in `[0, 1]` before user-context weighting.
    fn base_relevance(&self) -> f64;

    /// Whether the item may appear in feeds at `now`. Expired items are cut
    /// here, before scoring.
    fn eligible_at(&self, now: DateTime<Utc>) -> bool;

    /// Lowercased haystack for free-text search (title/description/tags).
    fn search_haystack(&self) -> String;

    // Domain-specific filter accessors; default None where the concept
    // does not exist.
    fn price(&self) -> Option<f64> {
        None
    }
    fn salary(&self) -> Option<&Salary> {
        None
    }
    fn employment_type(&self) -> Option<EmploymentType> {
        None
    }
    fn is_remote(&self) -> Option<bool> {
        None
    }
}

fn join_haystack(parts: &[&str], tags: &[String]) -> String {
    let mut hay = parts.join(" ");
    for t in tags {
        hay.push(' ');
        hay.push_str(t);
    }
    hay.to_lowercase()
}

/* ----------------------------
News
---------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub location: Location,
    /// Estimated reading time in minutes.
    #[serde(default)]
    pub reading_time: u32,
    /// Upstream editorial relevance in `[0, 1]`.
    pub relevance_score: f64,
    #[serde(default)]
    pub is_sponsored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContentItem for NewsArticle {
    const DOMAIN: ContentDomain = ContentDomain::News;

    fn id(&self) -> &str {
        &self.id
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &Location {
        &self.location
    }
    fn source_id(&self) -> &str {
        &self.source
    }

    fn anchor_time(&self) -> Option<DateTime<Utc>> {
        Some(self.published_at)
    }

    fn validity(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        // No hard expiry; relevance decays with age instead.
        (Some(self.published_at), None)
    }

    fn base_relevance(&self) -> f64 {
        self.relevance_score.clamp(0.0, 1.0)
    }

    fn eligible_at(&self, _now: DateTime<Utc>) -> bool {
        true
    }

    fn search_haystack(&self) -> String {
        join_haystack(&[&self.title, &self.summary, &self.content], &self.tags)
    }
}

/* ----------------------------
Events
---------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub venue: String,
    pub location: Location,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ticket price; absent or zero means free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_url: Option<String>,
    pub organizer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<u32>,
    pub source: String,
}

impl LocalEvent {
    pub fn is_free(&self) -> bool {
        self.price.unwrap_or(0.0) == 0.0
    }
}

impl ContentItem for LocalEvent {
    const DOMAIN: ContentDomain = ContentDomain::Events;

    fn id(&self) -> &str {
        &self.id
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &Location {
        &self.location
    }
    fn source_id(&self) -> &str {
        &self.source
    }

    fn anchor_time(&self) -> Option<DateTime<Utc>> {
        Some(self.start_time)
    }

    fn validity(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (Some(self.start_time), Some(self.end_time))
    }

    fn base_relevance(&self) -> f64 {
        DEFAULT_BASE_RELEVANCE
    }

    fn eligible_at(&self, now: DateTime<Utc>) -> bool {
        // Upcoming events are browsable; an event expires once it ends.
        now <= self.end_time
    }

    fn search_haystack(&self) -> String {
        join_haystack(
            &[&self.title, &self.description, &self.venue, &self.organizer],
            &self.tags,
        )
    }

    fn price(&self) -> Option<f64> {
        self.price
    }
}

/* ----------------------------
Jobs
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salary {
    pub min: f64,
    pub max: f64,
    pub currency: String,
    pub period: SalaryPeriod,
}

impl Salary {
    /// Advertised range converted to an annual figure: 40 h/week and
    /// 5 days/week over 52 weeks, 12 months/year.
    pub fn annual_range(&self) -> (f64, f64) {
        let factor = match self.period {
            SalaryPeriod::Hour => 40.0 * 52.0,
            SalaryPeriod::Day => 5.0 * 52.0,
            SalaryPeriod::Month => 12.0,
            SalaryPeriod::Year => 1.0,
        };
        (self.min * factor, self.max * factor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    pub location: Location,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<Salary>,
    pub employment_type: EmploymentType,
    #[serde(default)]
    pub remote: bool,
    pub posted_at: DateTime<Utc>,
    /// Absent means the listing is open-ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub apply_url: String,
    pub source: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContentItem for JobListing {
    const DOMAIN: ContentDomain = ContentDomain::Jobs;

    fn id(&self) -> &str {
        &self.id
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &Location {
        &self.location
    }
    fn source_id(&self) -> &str {
        &self.source
    }

    fn anchor_time(&self) -> Option<DateTime<Utc>> {
        Some(self.posted_at)
    }

    fn validity(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (Some(self.posted_at), self.expires_at)
    }

    fn base_relevance(&self) -> f64 {
        DEFAULT_BASE_RELEVANCE
    }

    fn eligible_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| now <= exp)
    }

    fn search_haystack(&self) -> String {
        join_haystack(&[&self.title, &self.company, &self.description], &self.tags)
    }

    fn salary(&self) -> Option<&Salary> {
        self.salary.as_ref()
    }

    fn employment_type(&self) -> Option<EmploymentType> {
        Some(self.employment_type)
    }

    fn is_remote(&self) -> Option<bool> {
        Some(self.remote)
    }
}

/* ----------------------------
Weather alerts
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl AlertSeverity {
    /// Severity-mapped seed relevance: extreme 1.0 down to minor 0.25.
    pub fn relevance(&self) -> f64 {
        match self {
            AlertSeverity::Extreme => 1.0,
            AlertSeverity::Severe => 0.75,
            AlertSeverity::Moderate => 0.5,
            AlertSeverity::Minor => 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub areas: Vec<String>,
    pub location: Location,
    #[serde(default = "default_alert_category")]
    pub category: String,
    #[serde(default = "default_alert_source")]
    pub source: String,
}

fn default_alert_category() -> String {
    "weather".to_string()
}

fn default_alert_source() -> String {
    "weather".to_string()
}

impl ContentItem for WeatherAlert {
    const DOMAIN: ContentDomain = ContentDomain::Alerts;

    fn id(&self) -> &str {
        &self.id
    }
    fn category(&self) -> &str {
        &self.category
    }
    fn location(&self) -> &Location {
        &self.location
    }
    fn source_id(&self) -> &str {
        &self.source
    }

    fn anchor_time(&self) -> Option<DateTime<Utc>> {
        Some(self.start_time)
    }

    fn validity(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (Some(self.start_time), Some(self.end_time))
    }

    fn base_relevance(&self) -> f64 {
        self.severity.relevance()
    }

    fn eligible_at(&self, now: DateTime<Utc>) -> bool {
        // Active only within the alert window; upcoming alerts are not shown.
        self.start_time <= now && now <= self.end_time
    }

    fn search_haystack(&self) -> String {
        join_haystack(&[&self.title, &self.description], &self.areas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loc() -> Location {
        Location::new(40.7128, -74.0060)
    }

    fn event(start_off_h: i64, end_off_h: i64, now: DateTime<Utc>) -> LocalEvent {
        LocalEvent {
            id: "e1".into(),
            title: "Jazz Night".into(),
            description: "Live jazz".into(),
            image_url: None,
            venue: "Blue Note".into(),
            location: loc(),
            start_time: now + Duration::hours(start_off_h),
            end_time: now + Duration::hours(end_off_h),
            category: "entertainment".into(),
            tags: vec!["music".into()],
            price: None,
            currency: None,
            ticket_url: None,
            organizer: "Blue Note".into(),
            attendee_count: None,
            max_attendees: None,
            source: "local".into(),
        }
    }

    #[test]
    fn event_expires_at_end_time() {
        let now = Utc::now();
        assert!(event(-2, 1, now).eligible_at(now));
        assert!(event(2, 4, now).eligible_at(now), "upcoming events stay visible");
        assert!(!event(-4, -1, now).eligible_at(now));
    }

    #[test]
    fn alert_is_active_only_inside_window() {
        let now = Utc::now();
        let mut alert = WeatherAlert {
            id: "w1".into(),
            title: "Heat advisory".into(),
            description: "Stay hydrated".into(),
            severity: AlertSeverity::Moderate,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
            areas: vec!["Manhattan".into()],
            location: loc(),
            category: "weather".into(),
            source: "weather".into(),
        };
        assert!(alert.eligible_at(now));

        alert.start_time = now + Duration::hours(1);
        alert.end_time = now + Duration::hours(2);
        assert!(!alert.eligible_at(now), "not yet active");
    }

    #[test]
    fn severity_maps_to_relevance() {
        assert_eq!(AlertSeverity::Extreme.relevance(), 1.0);
        assert_eq!(AlertSeverity::Minor.relevance(), 0.25);
    }

    #[test]
    fn salary_annualization() {
        let hourly = Salary {
            min: 15.0,
            max: 18.0,
            currency: "USD".into(),
            period: SalaryPeriod::Hour,
        };
        let (min, max) = hourly.annual_range();
        assert_eq!(min, 31_200.0);
        assert_eq!(max, 37_440.0);

        let monthly = Salary {
            min: 4_000.0,
            max: 5_000.0,
            currency: "USD".into(),
            period: SalaryPeriod::Month,
        };
        assert_eq!(monthly.annual_range(), (48_000.0, 60_000.0));
    }

    #[test]
    fn employment_type_wire_format_is_kebab_case() {
        let t: EmploymentType = serde_json::from_str("\"full-time\"").unwrap();
        assert_eq!(t, EmploymentType::FullTime);
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"full-time\"");
    }
}
