//! AniList GraphQL client with rate limiting and retry.

use governor::{DefaultDirectRateLimiter, Quota};
use kotori_common::{KotoriError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, instrument, warn};

const NAME_QUERY: &str = "\
query ($search: String, $type: MediaType) {
  Page(perPage: 10) {
    media(search: $search, type: $type) {
      id
      title { english native }
      coverImage { medium }
    }
  }
}";

const ID_QUERY: &str = "\
query ($id: Int) {
  Media(id: $id) {
    id
    title { english native }
    coverImage { medium }
  }
}";

/// One AniList search hit.
#[derive(Debug, Clone)]
pub struct AnilistMedia {
    pub id: i64,
    pub title_english: Option<String>,
    pub title_native: Option<String>,
    pub cover_image_url: Option<String>,
}

impl AnilistMedia {
    /// Preferred display title: English, falling back to native.
    pub fn title(&self) -> Option<&str> {
        self.title_english
            .as_deref()
            .or(self.title_native.as_deref())
    }
}

/// AniList GraphQL API client.
#[derive(Debug, Clone)]
pub struct AnilistClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    max_retries: usize,
}

impl AnilistClient {
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

    /// Search by title within `ANIME` or `MANGA`.
    #[instrument(skip(self))]
    pub async fn search(&self, input: &str, media_type: &str) -> Result<Vec<AnilistMedia>> {
        let body = json!({
            "query": NAME_QUERY,
            "variables": { "search": input, "type": media_type },
        });
        let Some(response) = self.post(&body).await? else {
            return Ok(Vec::new());
        };
        let page: GraphQlResponse = response.json().await?;
        Ok(page
            .data
            .and_then(|d| d.page)
            .map(|p| p.media)
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawMedia::into_media)
            .collect())
    }

    /// Look up a single entry by its numeric id.
    #[instrument(skip(self))]
    pub async fn by_id(&self, id: i64) -> Result<Option<AnilistMedia>> {
        let body = json!({
            "query": ID_QUERY,
            "variables": { "id": id },
        });
        let Some(response) = self.post(&body).await? else {
            return Ok(None);
        };
        let page: GraphQlResponse = response.json().await?;
        Ok(page
            .data
            .and_then(|d| d.media)
            .and_then(RawMedia::into_media))
    }

    /// POST with rate limiting and retry. `None` means rate limited.
    async fn post(&self, body: &serde_json::Value) -> Result<Option<reqwest::Response>> {
        self.rate_limiter.until_ready().await;
        debug!("Querying AniList at {}", self.base_url);

        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.max_retries);

        let response = Retry::spawn(strategy, || async {
            match self.http.post(&self.base_url).json(body).send().await {
                Ok(response) if response.status().is_server_error() => {
                    warn!("AniList server error, will retry: {}", response.status());
                    Err(KotoriError::catalog_with_status(
                        "AniList server error",
                        response.status().as_u16(),
                    ))
                }
                Ok(response) => Ok(response),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!("AniList request failed, will retry: {e}");
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
            warn!("AniList rate limit exceeded, retry after {retry_after}s");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(KotoriError::catalog_with_status(
                "AniList request failed",
                response.status().as_u16(),
            ));
        }
        Ok(Some(response))
    }
}

// Wire format

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "Page")]
    page: Option<PageData>,
    #[serde(rename = "Media")]
    media: Option<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(default)]
    media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    id: Option<i64>,
    title: Option<RawTitle>,
    #[serde(rename = "coverImage")]
    cover_image: Option<RawCover>,
}

#[derive(Debug, Deserialize)]
struct RawTitle {
    english: Option<String>,
    native: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCover {
    medium: Option<String>,
}

impl RawMedia {
    /// Entries without an id or any title are useless for autocomplete.
    fn into_media(self) -> Option<AnilistMedia> {
        let id = self.id?;
        let title = self.title?;
        if title.english.is_none() && title.native.is_none() {
            return None;
        }
        Some(AnilistMedia {
            id,
            title_english: title.english,
            title_native: title.native,
            cover_image_url: self.cover_image.and_then(|c| c.medium),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "data": { "Page": { "media": [
                { "id": 1, "title": { "english": "Frieren", "native": "フリーレン" },
                  "coverImage": { "medium": "url" } },
                { "id": 2, "title": { "english": null, "native": null } }
            ] } }
        }"#;
        let parsed: GraphQlResponse = serde_json::from_str(raw).unwrap();
        let media: Vec<_> = parsed
            .data
            .unwrap()
            .page
            .unwrap()
            .media
            .into_iter()
            .filter_map(RawMedia::into_media)
            .collect();
        // The titleless entry is dropped
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].title(), Some("Frieren"));
    }

    #[test]
    fn test_title_fallback_to_native() {
        let media = AnilistMedia {
            id: 1,
            title_english: None,
            title_native: Some("フリーレン".to_string()),
            cover_image_url: None,
        };
        assert_eq!(media.title(), Some("フリーレン"));
    }

    #[test]
    fn test_client_rejects_zero_rate_limit() {
        assert!(AnilistClient::new("https://example.com", 30, 0, 3).is_err());
        assert!(AnilistClient::new("https://example.com", 30, 2, 3).is_ok());
    }
}
