//! TMDB multi-search client.

use governor::{DefaultDirectRateLimiter, Quota};
use kotori_common::{KotoriError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument, warn};

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/original";

/// One TMDB search hit.
#[derive(Debug, Clone)]
pub struct TmdbMedia {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    /// `movie` or `tv`
    pub media_type: String,
    pub poster_url: Option<String>,
}

/// TMDB API client.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: Client,
    base_url: String,
    api_key: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    max_retries: usize,
}

impl TmdbClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
        rate_limit_per_sec: u32,
        max_retries: usize,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KotoriError::network_with_source("Failed to create HTTP client", e))?;
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_per_sec)
                .ok_or_else(|| KotoriError::config("Rate limit must be greater than 0"))?,
        );
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(quota)),
            max_retries,
        })
    }

    /// Multi-search across movies and series.
    #[instrument(skip(self))]
    pub async fn search(&self, input: &str) -> Result<Vec<TmdbMedia>> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}/search/multi", self.base_url.trim_end_matches('/'));
        debug!("Querying TMDB at {url}");

        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.max_retries);

        let response = Retry::spawn(strategy, || async {
            let request = self
                .http
                .get(&url)
                .query(&[("api_key", self.api_key.as_str()), ("query", input)]);
            match request.send().await {
                Ok(response) if response.status().is_server_error() => {
                    warn!("TMDB server error, will retry: {}", response.status());
                    Err(KotoriError::catalog_with_status(
                        "TMDB server error",
                        response.status().as_u16(),
                    ))
                }
                Ok(response) => Ok(response),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!("TMDB request failed, will retry: {e}");
                    Err(KotoriError::from(e))
                }
                Err(e) => Err(KotoriError::from(e)),
            }
        })
        .await?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("60");
            warn!("TMDB rate limit exceeded, retry after {retry_after}s");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(KotoriError::catalog_with_status(
                "TMDB request failed",
                response.status().as_u16(),
            ));
        }

        let parsed: TmdbResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .filter_map(RawResult::into_media)
            .collect())
    }
}

// Wire format

#[derive(Debug, Deserialize)]
struct TmdbResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    id: Option<i64>,
    // Series use `name`, movies use `title`
    name: Option<String>,
    title: Option<String>,
    original_name: Option<String>,
    original_title: Option<String>,
    media_type: Option<String>,
    poster_path: Option<String>,
}

impl RawResult {
    fn into_media(self) -> Option<TmdbMedia> {
        let id = self.id?;
        let title = self.name.or(self.title)?;
        Some(TmdbMedia {
            id,
            title,
            original_title: self.original_name.or(self.original_title),
            media_type: self.media_type.unwrap_or_else(|| "movie".to_string()),
            poster_url: self
                .poster_path
                .map(|path| format!("{POSTER_BASE_URL}{path}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = r#"{ "results": [
            { "id": 1, "name": "Shirokuma Cafe", "original_name": "しろくまカフェ",
              "media_type": "tv", "poster_path": "/p.jpg" },
            { "id": 2, "title": "Totoro", "original_title": "となりのトトロ",
              "media_type": "movie" },
            { "id": 3, "media_type": "person" }
        ] }"#;
        let parsed: TmdbResponse = serde_json::from_str(raw).unwrap();
        let media: Vec<_> = parsed
            .results
            .into_iter()
            .filter_map(RawResult::into_media)
            .collect();
        // The titleless person entry is dropped
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].media_type, "tv");
        assert_eq!(
            media[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/original/p.jpg")
        );
        assert_eq!(media[1].title, "Totoro");
    }
}
