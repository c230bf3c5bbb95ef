//! Web search sub-client
//!
//! Supports Brave and Serper as providers; which one is active is fixed by
//! process configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SearchProviderConfig;
use crate::{Error, Result};

use super::SearchLookup;

/// Search result from a web search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Result snippet/description
    pub snippet: String,
}

/// Brave Search API response
#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    description: String,
}

/// Serper API response
#[derive(Debug, Deserialize)]
struct SerperSearchResponse {
    organic: Option<Vec<SerperResult>>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    title: String,
    link: String,
    snippet: String,
}

/// Serper API request body
#[derive(Debug, Serialize)]
struct SerperRequest {
    q: String,
    num: usize,
}

/// Web search client over the configured provider
pub struct SearchClient {
    provider: SearchProviderConfig,
    client: reqwest::Client,
}

impl SearchClient {
    #[must_use]
    pub fn new(provider: SearchProviderConfig) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    /// Search using Brave Search API
    async fn search_brave(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", api_key)
            .query(&[("q", query), ("count", &limit.to_string())])
            .send()
            .await
            .map_err(|e| Error::upstream_request("brave search", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_upstream("brave search", status, &body));
        }

        let brave_response: BraveSearchResponse = response.json().await?;

        let results = brave_response
            .web
            .map(|web| {
                web.results
                    .into_iter()
                    .map(|r| SearchResult {
                        title: r.title,
                        url: r.url,
                        snippet: r.description,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    /// Search using Serper API
    async fn search_serper(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let request_body = SerperRequest {
            q: query.to_string(),
            num: limit,
        };

        let response = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::upstream_request("serper", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_upstream("serper", status, &body));
        }

        let serper_response: SerperSearchResponse = response.json().await?;

        let results = serper_response
            .organic
            .map(|organic| {
                organic
                    .into_iter()
                    .map(|r| SearchResult {
                        title: r.title,
                        url: r.link,
                        snippet: r.snippet,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }
}

#[async_trait]
impl SearchLookup for SearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        match &self.provider {
            SearchProviderConfig::Brave { api_key } => {
                self.search_brave(api_key, query, limit).await
            }
            SearchProviderConfig::Serper { api_key } => {
                self.search_serper(api_key, query, limit).await
            }
        }
    }
}
