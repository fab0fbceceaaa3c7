// Sleeper fantasy API client
use crate::application::fantasy_service::LeagueSource;
use crate::domain::fantasy::{LeagueInfo, LeagueUser, MatchupEntry, Roster};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct SleeperClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SportState {
    week: i64,
}

impl SleeperClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn league_url(&self, league_id: &str, rest: &str) -> String {
        format!(
            "{}/league/{}{}",
            self.base_url,
            urlencoding::encode(league_id),
            rest
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sleeper request {} failed with status {}: {}", url, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl LeagueSource for SleeperClient {
    async fn current_week(&self) -> Result<i64> {
        let state: SportState = self
            .get_json(&format!("{}/state/nfl", self.base_url))
            .await?;
        Ok(state.week)
    }

    async fn league(&self, league_id: &str) -> Result<LeagueInfo> {
        self.get_json(&self.league_url(league_id, "")).await
    }

    async fn users(&self, league_id: &str) -> Result<Vec<LeagueUser>> {
        self.get_json(&self.league_url(league_id, "/users")).await
    }

    async fn rosters(&self, league_id: &str) -> Result<Vec<Roster>> {
        self.get_json(&self.league_url(league_id, "/rosters")).await
    }

    async fn matchups(&self, league_id: &str, week: i64) -> Result<Vec<MatchupEntry>> {
        self.get_json(&self.league_url(league_id, &format!("/matchups/{}", week)))
            .await
    }
}
