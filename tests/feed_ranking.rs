// tests/feed_ranking.rs
//
// Ranking-level properties of the personalized feed, exercised directly on
// the aggregator with injected documents:
// - deterministic order and pagination across repeated calls
// - radius invariant on every returned item
// - category preference dominates distance and base relevance
// - offset past the end yields an empty page with the true total

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use locallens_feed::cache::FeedCache;
use locallens_feed::config::FeedConfig;
use locallens_feed::content::NewsArticle;
use locallens_feed::feed::{FeedAggregator, FeedView};
use locallens_feed::sources::fixture::FixtureSource;
use locallens_feed::types::{ContentDomain, Location, UserPreferences};

fn origin() -> Location {
    Location::new(40.7128, -74.0060)
}

/// A point roughly `km` kilometers north of the origin.
fn lat_at_km_north(km: f64) -> f64 {
    40.7128 + km / 111.0
}

fn news_doc(id: &str, category: &str, km_north: f64, base: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("story {id}"),
        "summary": "summary",
        "content": "content",
        "source": "wire",
        "category": category,
        "publishedAt": (Utc::now() - Duration::hours(1)).to_rfc3339(),
        "location": {"latitude": lat_at_km_north(km_north), "longitude": -74.0060},
        "readingTime": 1,
        "relevanceScore": base
    })
}

fn news_aggregator(docs: Vec<serde_json::Value>) -> FeedAggregator<NewsArticle> {
    let mut map = HashMap::new();
    map.insert(ContentDomain::News, docs);
    FeedAggregator::new(
        Arc::new(FixtureSource::from_documents(map)),
        Arc::new(FeedCache::new()),
        Arc::new(FeedConfig::default()),
    )
}

fn prefs(categories: &[&str], radius_km: f64) -> UserPreferences {
    let mut p = UserPreferences::with_radius(radius_km);
    for c in categories {
        p.categories.insert((*c).to_string());
    }
    p
}

#[tokio::test]
async fn category_preference_dominates_distance_and_base_score() {
    // a: preferred category, 1 km away, base 0.8
    // b: other category, 0.5 km away, base 0.9
    let agg = news_aggregator(vec![
        news_doc("a", "news", 1.0, 0.8),
        news_doc("b", "sports", 0.5, 0.9),
    ]);

    let page = agg
        .personalized_feed(
            &origin(),
            &prefs(&["news"], 10.0),
            &[],
            None,
            0,
            FeedView::Standard,
            Utc::now(),
        )
        .await
        .expect("feed");

    let ids: Vec<&str> = page.data.iter().map(|e| e.item.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(page.data[0].score > page.data[1].score);
}

#[tokio::test]
async fn returned_items_respect_the_radius() {
    let agg = news_aggregator(vec![
        news_doc("near", "news", 2.0, 0.5),
        news_doc("edge", "news", 9.5, 0.5),
        news_doc("far", "news", 30.0, 0.9),
    ]);

    let p = prefs(&[], 10.0);
    let page = agg
        .personalized_feed(&origin(), &p, &[], None, 0, FeedView::Standard, Utc::now())
        .await
        .expect("feed");

    assert_eq!(page.pagination.total, 2);
    for entry in &page.data {
        assert!(
            entry.distance_km <= p.radius_km,
            "{} is outside the radius: {} km",
            entry.item.id,
            entry.distance_km
        );
    }
    assert!(!page.data.iter().any(|e| e.item.id == "far"));
}

#[tokio::test]
async fn order_and_pagination_are_deterministic() {
    let docs: Vec<_> = (0..25)
        .map(|i| {
            news_doc(
                &format!("n{i:02}"),
                if i % 2 == 0 { "news" } else { "sports" },
                (i as f64) * 0.3,
                0.3 + ((i * 7) % 10) as f64 / 20.0,
            )
        })
        .collect();
    let agg = news_aggregator(docs);
    let p = prefs(&["news"], 20.0);

    let mut pages = Vec::new();
    for _ in 0..3 {
        let page = agg
            .personalized_feed(&origin(), &p, &[], Some(10), 5, FeedView::Standard, Utc::now())
            .await
            .expect("feed");
        pages.push(
            page.data
                .iter()
                .map(|e| e.item.id.clone())
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(pages[0], pages[1]);
    assert_eq!(pages[1], pages[2]);
    assert_eq!(pages[0].len(), 10);
}

#[tokio::test]
async fn offset_past_the_end_is_an_empty_page_not_an_error() {
    let docs: Vec<_> = (0..10)
        .map(|i| news_doc(&format!("n{i}"), "news", 1.0, 0.5))
        .collect();
    let agg = news_aggregator(docs);

    let page = agg
        .personalized_feed(
            &origin(),
            &prefs(&[], 10.0),
            &[],
            Some(20),
            100,
            FeedView::Standard,
            Utc::now(),
        )
        .await
        .expect("feed");

    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 10);
    assert_eq!(page.pagination.limit, 20);
    assert!(!page.pagination.has_next);
    assert!(page.pagination.has_previous);
}

#[tokio::test]
async fn limit_is_clamped_to_the_configured_maximum() {
    let docs: Vec<_> = (0..150)
        .map(|i| news_doc(&format!("n{i:03}"), "news", 0.5, 0.5))
        .collect();
    let agg = news_aggregator(docs);

    let page = agg
        .personalized_feed(
            &origin(),
            &prefs(&[], 10.0),
            &[],
            Some(10_000),
            0,
            FeedView::Standard,
            Utc::now(),
        )
        .await
        .expect("feed");

    assert_eq!(page.pagination.limit, 100);
    assert_eq!(page.data.len(), 100);
    assert!(page.pagination.has_next);
}

#[tokio::test]
async fn equal_scores_break_ties_by_distance_then_id() {
    // Same category, same base relevance, same publish time; only distance
    // and id differ.
    let agg = news_aggregator(vec![
        news_doc("c", "news", 1.0, 0.5),
        news_doc("a", "news", 1.0, 0.5),
        news_doc("b", "news", 0.4, 0.5),
    ]);

    let page = agg
        .personalized_feed(
            &origin(),
            &prefs(&[], 10.0),
            &[],
            None,
            0,
            FeedView::Standard,
            Utc::now(),
        )
        .await
        .expect("feed");

    let ids: Vec<&str> = page.data.iter().map(|e| e.item.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}
