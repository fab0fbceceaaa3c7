// Fantasy league summary domain models
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// League details as returned by the league feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueUser {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl LeagueUser {
    /// Team name when set, otherwise the display name.
    fn team_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("team_name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or(self.display_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub roster_id: i64,
    #[serde(default)]
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupEntry {
    pub roster_id: i64,
    #[serde(default)]
    pub matchup_id: Option<i64>,
    #[serde(default)]
    pub points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMatchup {
    pub roster_id: i64,
    pub matchup_id: i64,
    pub points: f64,
    pub manager: Option<Manager>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupPair {
    pub matchup_id: i64,
    pub team1: TeamMatchup,
    pub team2: Option<TeamMatchup>,
}

impl MatchupPair {
    fn involves(&self, roster_id: i64) -> bool {
        self.team1.roster_id == roster_id
            || self.team2.as_ref().is_some_and(|t| t.roster_id == roster_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSummary {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub week: i64,
    pub matches: Vec<MatchupPair>,
}

/// Group team entries by matchup id into head-to-head pairs.
///
/// Pairs are ordered by matchup id, except the pair containing
/// `user_roster_id` which is moved to the front.
pub fn pair_matchups(teams: Vec<TeamMatchup>, user_roster_id: Option<i64>) -> Vec<MatchupPair> {
    let mut grouped: BTreeMap<i64, Vec<TeamMatchup>> = BTreeMap::new();
    for team in teams {
        grouped.entry(team.matchup_id).or_default().push(team);
    }

    let mut pairs: Vec<MatchupPair> = grouped
        .into_iter()
        .filter_map(|(matchup_id, teams)| {
            let mut teams = teams.into_iter();
            let team1 = teams.next()?;
            Some(MatchupPair {
                matchup_id,
                team1,
                team2: teams.next(),
            })
        })
        .collect();

    if let Some(roster_id) = user_roster_id {
        // Stable sort keeps matchup id order for everything else.
        pairs.sort_by_key(|p| !p.involves(roster_id));
    }

    pairs
}

/// Everything fetched for one league and week.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueFeed {
    pub info: LeagueInfo,
    pub week: i64,
    pub users: Vec<LeagueUser>,
    pub rosters: Vec<Roster>,
    pub matchups: Vec<MatchupEntry>,
}

/// Join users onto rosters, pair the week's matchups and put the pair of
/// `user_id` (if they are in the league) first.
pub fn summarize_league(league_id: &str, feed: LeagueFeed, user_id: Option<&str>) -> LeagueSummary {
    let users: HashMap<&str, &LeagueUser> =
        feed.users.iter().map(|u| (u.user_id.as_str(), u)).collect();

    let managers: HashMap<i64, Manager> = feed
        .rosters
        .iter()
        .map(|roster| {
            let user = roster.owner_id.as_deref().and_then(|id| users.get(id));
            let manager = Manager {
                name: user
                    .and_then(|u| u.team_name())
                    .unwrap_or("Team")
                    .to_string(),
                avatar: user.and_then(|u| u.avatar.clone()),
            };
            (roster.roster_id, manager)
        })
        .collect();

    let user_roster_id = user_id
        .filter(|id| users.contains_key(id))
        .and_then(|id| {
            feed.rosters
                .iter()
                .find(|r| r.owner_id.as_deref() == Some(id))
        })
        .map(|r| r.roster_id);

    let teams = feed
        .matchups
        .iter()
        .filter_map(|entry| {
            Some(TeamMatchup {
                roster_id: entry.roster_id,
                matchup_id: entry.matchup_id?,
                points: entry.points.unwrap_or(0.0),
                manager: managers.get(&entry.roster_id).cloned(),
            })
        })
        .collect();

    LeagueSummary {
        id: league_id.to_string(),
        name: feed
            .info
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Fantasy League".to_string()),
        avatar: feed.info.avatar,
        week: feed.week,
        matches: pair_matchups(teams, user_roster_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team(roster_id: i64, matchup_id: i64) -> TeamMatchup {
        TeamMatchup {
            roster_id,
            matchup_id,
            points: roster_id as f64 * 10.0,
            manager: None,
        }
    }

    #[test]
    fn test_pairs_sorted_by_matchup_id() {
        let pairs = pair_matchups(vec![team(1, 2), team(2, 1), team(3, 2), team(4, 1)], None);
        let ids: Vec<i64> = pairs.iter().map(|p| p.matchup_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(pairs[0].team1.roster_id, 2);
        assert_eq!(pairs[0].team2.as_ref().map(|t| t.roster_id), Some(4));
    }

    #[test]
    fn test_user_pair_moves_to_front() {
        let pairs = pair_matchups(
            vec![team(1, 1), team(2, 1), team(3, 2), team(4, 2), team(5, 3), team(6, 3)],
            Some(6),
        );
        let ids: Vec<i64> = pairs.iter().map(|p| p.matchup_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_bye_week_has_no_opponent() {
        let pairs = pair_matchups(vec![team(7, 4)], None);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].team2.is_none());
    }

    fn feed() -> LeagueFeed {
        LeagueFeed {
            info: LeagueInfo {
                name: Some("Dynasty".to_string()),
                avatar: None,
            },
            week: 7,
            users: vec![
                LeagueUser {
                    user_id: "alice".to_string(),
                    display_name: Some("alice_d".to_string()),
                    avatar: Some("av1".to_string()),
                    metadata: Some(json!({ "team_name": "Gridiron Gals" })),
                },
                LeagueUser {
                    user_id: "bob".to_string(),
                    display_name: Some("bobby".to_string()),
                    avatar: None,
                    metadata: None,
                },
            ],
            rosters: vec![
                Roster { roster_id: 1, owner_id: Some("alice".to_string()) },
                Roster { roster_id: 2, owner_id: Some("bob".to_string()) },
                Roster { roster_id: 3, owner_id: None },
                Roster { roster_id: 4, owner_id: None },
            ],
            matchups: vec![
                MatchupEntry { roster_id: 1, matchup_id: Some(2), points: Some(101.5) },
                MatchupEntry { roster_id: 2, matchup_id: Some(1), points: None },
                MatchupEntry { roster_id: 3, matchup_id: Some(2), points: Some(88.0) },
                MatchupEntry { roster_id: 4, matchup_id: Some(1), points: Some(70.2) },
                MatchupEntry { roster_id: 5, matchup_id: None, points: None },
            ],
        }
    }

    #[test]
    fn test_summarize_names_managers_and_orders_user_first() {
        let summary = summarize_league("L1", feed(), Some("alice"));

        assert_eq!(summary.name, "Dynasty");
        assert_eq!(summary.week, 7);
        let ids: Vec<i64> = summary.matches.iter().map(|p| p.matchup_id).collect();
        assert_eq!(ids, vec![2, 1]);

        let alice = &summary.matches[0].team1;
        assert_eq!(alice.manager.as_ref().unwrap().name, "Gridiron Gals");
        let bob = &summary.matches[1].team1;
        assert_eq!(bob.manager.as_ref().unwrap().name, "bobby");
        assert_eq!(bob.points, 0.0);
        assert_eq!(summary.matches[1].team2.as_ref().unwrap().manager.as_ref().unwrap().name, "Team");
    }

    #[test]
    fn test_summarize_unknown_user_keeps_matchup_order() {
        let mut feed = feed();
        feed.info.name = None;

        let summary = summarize_league("L1", feed, Some("mallory"));

        assert_eq!(summary.name, "Fantasy League");
        let ids: Vec<i64> = summary.matches.iter().map(|p| p.matchup_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
