// Fantasy service - League summaries assembled from the league feed
use crate::application::ttl_cache::TtlCache;
use crate::domain::fantasy::{
    summarize_league, LeagueFeed, LeagueInfo, LeagueSummary, LeagueUser, MatchupEntry, Roster,
};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

const WEEK_KEY: &str = "sleeper:state:nfl";

/// Upstream fantasy league API.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    async fn current_week(&self) -> anyhow::Result<i64>;
    async fn league(&self, league_id: &str) -> anyhow::Result<LeagueInfo>;
    async fn users(&self, league_id: &str) -> anyhow::Result<Vec<LeagueUser>>;
    async fn rosters(&self, league_id: &str) -> anyhow::Result<Vec<Roster>>;
    async fn matchups(&self, league_id: &str, week: i64) -> anyhow::Result<Vec<MatchupEntry>>;
}

#[derive(Clone)]
pub struct FantasyService {
    source: Arc<dyn LeagueSource>,
    cache: TtlCache,
}

impl FantasyService {
    pub fn new(source: Arc<dyn LeagueSource>, cache: TtlCache) -> Self {
        Self { source, cache }
    }

    /// Summary of the current week for one league.
    ///
    /// Week, league details, users and rosters go through the cache; matchup
    /// scores are always fetched fresh.
    pub async fn league_summary(
        &self,
        league_id: &str,
        user_id: Option<&str>,
    ) -> anyhow::Result<LeagueSummary> {
        let source = &self.source;
        let league_key = format!("sleeper:league:{}", league_id);
        let users_key = format!("sleeper:league:{}:users", league_id);
        let rosters_key = format!("sleeper:league:{}:rosters", league_id);

        let (week, info, users, rosters) = tokio::try_join!(
            self.cache.get(WEEK_KEY, move || source.current_week()),
            self.cache.get(&league_key, move || source.league(league_id)),
            self.cache.get(&users_key, move || source.users(league_id)),
            self.cache.get(&rosters_key, move || source.rosters(league_id)),
        )
        .with_context(|| format!("Failed to load league {}", league_id))?;

        let matchups = source
            .matchups(league_id, week)
            .await
            .with_context(|| format!("Failed to load week {} matchups for {}", week, league_id))?;

        tracing::debug!(
            "League {} week {}: {} users, {} rosters, {} matchup entries",
            league_id,
            week,
            users.len(),
            rosters.len(),
            matchups.len()
        );

        let feed = LeagueFeed {
            info,
            week,
            users,
            rosters,
            matchups,
        };
        Ok(summarize_league(league_id, feed, user_id))
    }
}
