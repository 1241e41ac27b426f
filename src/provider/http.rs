// HTTP implementation of the provider trait against the platform's REST API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    DraftPickEntry, LeagueInfo, LeagueSettings, MatchupEntry, RosterEntry, StandingsEntry,
    StatValue, TeamEntry, TransactionEntry,
};
use super::FantasyProvider;

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "FANTASY_API_URL";
/// Environment variable holding the OAuth bearer token.
pub const API_TOKEN_ENV: &str = "FANTASY_API_TOKEN";

/// Transactions are paginated; this is the page size requested per call.
const TXN_PAGE_SIZE: usize = 100;

pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// Build a provider from `FANTASY_API_URL` / `FANTASY_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(API_URL_ENV)
            .with_context(|| format!("missing {API_URL_ENV} in environment"))?;
        let token = std::env::var(API_TOKEN_ENV)
            .with_context(|| format!("missing {API_TOKEN_ENV} in environment"))?;
        Self::new(base_url, token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("request to {url} returned {status}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {url}"))
    }
}

#[async_trait]
impl FantasyProvider for HttpProvider {
    async fn league_info(&self, league_key: &str) -> Result<LeagueInfo> {
        self.get_json(&format!("leagues/{league_key}")).await
    }

    async fn league_settings(&self, league_key: &str) -> Result<LeagueSettings> {
        self.get_json(&format!("leagues/{league_key}/settings")).await
    }

    async fn teams(&self, league_key: &str) -> Result<Vec<TeamEntry>> {
        self.get_json(&format!("leagues/{league_key}/teams")).await
    }

    async fn standings(&self, league_key: &str) -> Result<Vec<StandingsEntry>> {
        self.get_json(&format!("leagues/{league_key}/standings")).await
    }

    async fn scoreboard(&self, league_key: &str, week: u32) -> Result<Vec<MatchupEntry>> {
        self.get_json(&format!("leagues/{league_key}/scoreboard?week={week}"))
            .await
    }

    async fn team_week_stats(&self, team_key: &str, week: u32) -> Result<Vec<StatValue>> {
        self.get_json(&format!("teams/{team_key}/stats?week={week}"))
            .await
    }

    async fn roster_with_stats(
        &self,
        league_key: &str,
        team_id: u32,
        week: u32,
    ) -> Result<Vec<RosterEntry>> {
        self.get_json(&format!(
            "leagues/{league_key}/teams/{team_id}/roster?week={week}"
        ))
        .await
    }

    async fn draft_results(&self, league_key: &str) -> Result<Vec<DraftPickEntry>> {
        self.get_json(&format!("leagues/{league_key}/draft")).await
    }

    async fn transactions(&self, league_key: &str) -> Result<Vec<TransactionEntry>> {
        // The transaction log is the only endpoint large enough to page.
        let mut all = Vec::new();
        let mut start = 0usize;
        loop {
            let page: Vec<TransactionEntry> = self
                .get_json(&format!(
                    "leagues/{league_key}/transactions?start={start}&count={TXN_PAGE_SIZE}"
                ))
                .await?;
            let page_len = page.len();
            all.extend(page);
            if page_len < TXN_PAGE_SIZE {
                break;
            }
            start += page_len;
        }
        Ok(all)
    }
}
