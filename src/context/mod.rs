//! Context augmentation: best-effort live lookups that enrich the transcript
//! before it reaches the chat model.
//!
//! The search and weather sub-lookups are independent, run concurrently, and
//! degrade to an "unavailable" sentinel on failure or timeout. Augmentation
//! itself never fails a request.

pub mod search;
pub mod weather;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::voice::Transcript;

pub use search::{SearchClient, SearchResult};
pub use weather::WeatherClient;

/// Bound on each sub-lookup; a timeout counts as a failure
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Snippets included in the prompt per search lookup
const SEARCH_SNIPPET_LIMIT: usize = 3;

/// Raw location parameters from the request, unvalidated
#[derive(Debug, Clone)]
pub struct LocationHint {
    pub lat: String,
    pub lon: String,
}

/// Validated coordinates
#[derive(Debug, Clone, Copy)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl LocationHint {
    /// Parse into numeric coordinates; `None` when either value is not a
    /// finite number in range
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        let lat: f64 = self.lat.trim().parse().ok()?;
        let lon: f64 = self.lon.trim().parse().ok()?;
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Coordinates { lat, lon })
    }
}

/// Source of a context snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    Search,
    Weather,
}

impl fmt::Display for SnippetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Weather => write!(f, "weather"),
        }
    }
}

/// One semantic snippet; `text: None` is the unavailable sentinel
#[derive(Debug, Clone)]
pub struct Snippet {
    pub kind: SnippetKind,
    pub text: Option<String>,
}

impl Snippet {
    #[must_use]
    pub const fn unavailable(kind: SnippetKind) -> Self {
        Self { kind, text: None }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.text.is_some()
    }
}

/// Ordered, immutable snippet list produced by one augmentation pass.
///
/// Order is stable by source kind (search, then weather), never by
/// completion order.
#[derive(Debug, Clone, Default)]
pub struct AugmentedContext {
    pub snippets: Vec<Snippet>,
}

impl AugmentedContext {
    /// Iterate over available (non-sentinel) snippets
    pub fn available(&self) -> impl Iterator<Item = (SnippetKind, &str)> {
        self.snippets
            .iter()
            .filter_map(|s| s.text.as_deref().map(|t| (s.kind, t)))
    }
}

/// Web search seam, faked in tests
#[async_trait]
pub trait SearchLookup: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;
}

/// Weather seam, faked in tests
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn current(&self, coords: Coordinates) -> Result<String>;
}

/// Runs the best-effort sub-lookups for one request
pub struct Augmenter {
    search: Option<Arc<dyn SearchLookup>>,
    weather: Arc<dyn WeatherLookup>,
    timeout: Duration,
}

impl Augmenter {
    #[must_use]
    pub fn new(search: Option<Arc<dyn SearchLookup>>, weather: Arc<dyn WeatherLookup>) -> Self {
        Self {
            search,
            weather,
            timeout: LOOKUP_TIMEOUT,
        }
    }

    /// Override the per-lookup deadline
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Augment a transcript with live context.
    ///
    /// Search is always attempted; weather only when a location hint is
    /// present (non-numeric hints degrade to the weather sentinel). This
    /// step is infallible: every sub-lookup failure becomes a sentinel.
    pub async fn augment(
        &self,
        transcript: &Transcript,
        location: Option<&LocationHint>,
    ) -> AugmentedContext {
        let (search_snippet, weather_snippet) = futures::join!(
            self.search_snippet(&transcript.text),
            self.weather_snippet(location),
        );

        let mut snippets = vec![search_snippet];
        if let Some(weather) = weather_snippet {
            snippets.push(weather);
        }

        AugmentedContext { snippets }
    }

    async fn search_snippet(&self, query: &str) -> Snippet {
        let Some(search) = &self.search else {
            tracing::debug!("no search provider configured");
            return Snippet::unavailable(SnippetKind::Search);
        };

        match tokio::time::timeout(self.timeout, search.search(query, SEARCH_SNIPPET_LIMIT)).await
        {
            Ok(Ok(results)) if !results.is_empty() => {
                let text = results
                    .iter()
                    .map(|r| format!("{}: {}", r.title, r.snippet))
                    .collect::<Vec<_>>()
                    .join("\n");
                Snippet {
                    kind: SnippetKind::Search,
                    text: Some(text),
                }
            }
            Ok(Ok(_)) => {
                tracing::debug!("search returned no results");
                Snippet::unavailable(SnippetKind::Search)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "search lookup failed, degrading");
                Snippet::unavailable(SnippetKind::Search)
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "search lookup timed out, degrading");
                Snippet::unavailable(SnippetKind::Search)
            }
        }
    }

    async fn weather_snippet(&self, location: Option<&LocationHint>) -> Option<Snippet> {
        let hint = location?;

        let Some(coords) = hint.coordinates() else {
            tracing::warn!(lat = %hint.lat, lon = %hint.lon, "non-numeric location hint");
            return Some(Snippet::unavailable(SnippetKind::Weather));
        };

        let snippet = match tokio::time::timeout(self.timeout, self.weather.current(coords)).await
        {
            Ok(Ok(summary)) => Snippet {
                kind: SnippetKind::Weather,
                text: Some(summary),
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "weather lookup failed, degrading");
                Snippet::unavailable(SnippetKind::Weather)
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "weather lookup timed out, degrading");
                Snippet::unavailable(SnippetKind::Weather)
            }
        };

        Some(snippet)
    }
}
