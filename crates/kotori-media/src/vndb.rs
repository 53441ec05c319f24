//! VNDB "kana" API client.

use governor::{DefaultDirectRateLimiter, Quota};
use kotori_common::{KotoriError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument, warn};

/// One visual novel hit.
#[derive(Debug, Clone)]
pub struct VisualNovel {
    pub id: String,
    pub title: String,
    pub cover_image_url: Option<String>,
    pub cover_image_nsfw: bool,
}

/// VNDB API client.
#[derive(Debug, Clone)]
pub struct VndbClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    max_retries: usize,
}

/// Normalize user input into a VNDB id: `17` and `v17` both become `v17`.
pub fn normalize_vndb_id(input: &str) -> Option<String> {
    let digits = input.strip_prefix('v').unwrap_or(input);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("v{digits}"))
    } else {
        None
    }
}

impl VndbClient {
    pub fn new(
        base_url: impl Into<String>,
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
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(quota)),
            max_retries,
        })
    }

    /// Search visual novels by title.
    #[instrument(skip(self))]
    pub async fn search(&self, input: &str) -> Result<Vec<VisualNovel>> {
        self.query(json!(["search", "=", input])).await
    }

    /// Look up a single visual novel by its `v`-prefixed id.
    #[instrument(skip(self))]
    pub async fn by_id(&self, id: &str) -> Result<Option<VisualNovel>> {
        let results = self.query(json!(["id", "=", id])).await?;
        Ok(results.into_iter().next())
    }

    async fn query(&self, filters: serde_json::Value) -> Result<Vec<VisualNovel>> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}/vn", self.base_url.trim_end_matches('/'));
        debug!("Querying VNDB at {url}");

        let body = json!({
            "filters": filters,
            "fields": "title, image.url, image.sexual",
        });

        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.max_retries);

        let response = Retry::spawn(strategy, || async {
            match self.http.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_server_error() => {
                    warn!("VNDB server error, will retry: {}", response.status());
                    Err(KotoriError::catalog_with_status(
                        "VNDB server error",
                        response.status().as_u16(),
                    ))
                }
                Ok(response) => Ok(response),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!("VNDB request failed, will retry: {e}");
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
            warn!("VNDB rate limit exceeded, retry after {retry_after}s");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(KotoriError::catalog_with_status(
                "VNDB request failed",
                response.status().as_u16(),
            ));
        }

        let parsed: VndbResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .filter_map(RawVn::into_visual_novel)
            .collect())
    }
}

// Wire format

#[derive(Debug, Deserialize)]
struct VndbResponse {
    #[serde(default)]
    results: Vec<RawVn>,
}

#[derive(Debug, Deserialize)]
struct RawVn {
    id: Option<String>,
    title: Option<String>,
    image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: Option<String>,
    /// 0 = safe, higher values are suggestive/explicit
    sexual: Option<f64>,
}

impl RawVn {
    fn into_visual_novel(self) -> Option<VisualNovel> {
        let id = self.id?;
        let title = self.title?;
        let (url, sexual) = match self.image {
            Some(image) => (image.url, image.sexual.unwrap_or(0.0)),
            None => (None, 0.0),
        };
        Some(VisualNovel {
            id,
            title,
            cover_image_url: url,
            cover_image_nsfw: sexual > 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_vndb_id() {
        assert_eq!(normalize_vndb_id("17").as_deref(), Some("v17"));
        assert_eq!(normalize_vndb_id("v17").as_deref(), Some("v17"));
        assert_eq!(normalize_vndb_id("steins gate"), None);
        assert_eq!(normalize_vndb_id("v"), None);
    }

    #[test]
    fn test_response_parsing_flags_nsfw() {
        let raw = r#"{ "results": [
            { "id": "v17", "title": "Ever17",
              "image": { "url": "cover.jpg", "sexual": 0 } },
            { "id": "v99", "title": "Other",
              "image": { "url": "cover2.jpg", "sexual": 1.5 } },
            { "id": "v100", "title": "No image" }
        ] }"#;
        let parsed: VndbResponse = serde_json::from_str(raw).unwrap();
        let vns: Vec<_> = parsed
            .results
            .into_iter()
            .filter_map(RawVn::into_visual_novel)
            .collect();
        assert_eq!(vns.len(), 3);
        assert!(!vns[0].cover_image_nsfw);
        assert!(vns[1].cover_image_nsfw);
        assert!(vns[2].cover_image_url.is_none());
    }
}
