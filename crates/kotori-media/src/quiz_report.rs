//! Quiz game-report API client.
//!
//! The report API is unauthenticated and easily hammered: every fetch goes
//! through an advisory lock with a fixed spacing delay, matching how the
//! report links arrive in bursts from the quiz bot.

use kotori_common::{KotoriError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

static REPORT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"game_reports/([0-9a-z]+)").expect("valid regex"));

/// Extract a report id from a report link in embed text.
pub fn extract_report_id(text: &str) -> Option<&str> {
    REPORT_ID_RE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// A finished quiz session as returned by the report API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub decks: Vec<ReportDeck>,
    pub settings: ReportSettings,
    #[serde(default)]
    pub is_loaded: bool,
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
    #[serde(default)]
    pub scores: Vec<ReportScore>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub discord_user: ReportUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDeck {
    #[serde(default)]
    pub mc: bool,
    #[serde(default)]
    pub short_name: String,
    pub start_index: Option<i64>,
    pub end_index: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    #[serde(default)]
    pub shuffle: bool,
    pub font_color: Option<String>,
    pub effect: Option<String>,
    #[serde(default)]
    pub score_limit: i64,
    #[serde(default)]
    pub answer_time_limit_in_ms: i64,
    pub font: Option<String>,
    pub font_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportScore {
    #[serde(default)]
    pub score: i64,
}

impl GameReport {
    /// Deck short names of this session.
    pub fn deck_names(&self) -> Vec<&str> {
        self.decks.iter().map(|d| d.short_name.as_str()).collect()
    }

    /// Discord user id of the sole participant, when parseable.
    pub fn participant_id(&self) -> Option<u64> {
        self.participants
            .first()
            .and_then(|p| p.discord_user.id.parse().ok())
    }
}

/// Quiz report API client.
#[derive(Debug)]
pub struct QuizReportClient {
    http: Client,
    base_url: String,
    fetch_lock: Mutex<()>,
}

impl QuizReportClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KotoriError::network_with_source("Failed to create HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            fetch_lock: Mutex::new(()),
        })
    }

    /// Fetch one game report. Serialized, with a fixed spacing delay.
    #[instrument(skip(self))]
    pub async fn fetch_report(&self, report_id: &str) -> Result<GameReport> {
        let _guard = self.fetch_lock.lock().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let url = format!(
            "{}/game_reports/{report_id}",
            self.base_url.trim_end_matches('/')
        );
        debug!("Fetching quiz report {url}");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(KotoriError::catalog_with_status(
                format!("Report fetch failed for {report_id}"),
                response.status().as_u16(),
            ));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_report_id() {
        let text = "[View report](https://kotobaweb.com/dashboard/game_reports/5f3a9b2c1d)";
        assert_eq!(extract_report_id(text), Some("5f3a9b2c1d"));
        assert_eq!(extract_report_id("no link here"), None);
    }

    #[test]
    fn test_report_parsing() {
        let raw = r#"{
            "participants": [ { "discordUser": { "id": "123456789" } } ],
            "decks": [
                { "mc": false, "shortName": "n5", "startIndex": 1, "endIndex": 100 }
            ],
            "settings": {
                "shuffle": true,
                "fontColor": "rgb(255, 255, 255)",
                "scoreLimit": 10,
                "answerTimeLimitInMs": 16000,
                "font": "any",
                "fontSize": 80
            },
            "isLoaded": false,
            "questions": [{}, {}],
            "scores": [ { "score": 10 } ]
        }"#;
        let report: GameReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.participant_id(), Some(123_456_789));
        assert_eq!(report.deck_names(), vec!["n5"]);
        assert_eq!(report.settings.score_limit, 10);
        assert_eq!(report.decks[0].start_index, Some(1));
        assert!(!report.is_loaded);
    }

    #[test]
    fn test_report_parsing_with_missing_fields() {
        let raw = r#"{ "settings": { "shuffle": false } }"#;
        let report: GameReport = serde_json::from_str(raw).unwrap();
        assert!(report.participants.is_empty());
        assert_eq!(report.participant_id(), None);
        assert_eq!(report.settings.answer_time_limit_in_ms, 0);
    }
}
