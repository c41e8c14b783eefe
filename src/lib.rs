// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod filters;
pub mod geo;
pub mod metrics;
pub mod normalize;
pub mod scoring;
pub mod sources;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cache::{Cached, FeedCache};
pub use crate::config::FeedConfig;
pub use crate::content::{JobListing, LocalEvent, NewsArticle, WeatherAlert};
pub use crate::error::FeedError;
pub use crate::feed::{FeedAggregator, FeedEntry, FeedView};
pub use crate::types::{ContentDomain, FeedPage, Location, UserPreferences};
