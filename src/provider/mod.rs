// External fantasy-sports data source boundary.
//
// The platform API is a black box with a known but unreliable shape: week
// metadata can be wrong for historical seasons, keeper flags arrive in three
// different encodings, and numeric values come back as strings as often as
// numbers. Everything dynamic is normalized in `types` so nothing past this
// module touches a raw response.

pub mod http;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

use types::{
    DraftPickEntry, LeagueInfo, LeagueSettings, MatchupEntry, RosterEntry, StandingsEntry,
    StatValue, TeamEntry, TransactionEntry,
};

/// One season's worth of read operations against the platform API.
///
/// Implementations are expected to be stateless per call; the sync pipeline
/// owns throttling between calls.
#[async_trait]
pub trait FantasyProvider: Send + Sync {
    /// League metadata (season, team count, self-reported week bounds).
    async fn league_info(&self, league_key: &str) -> Result<LeagueInfo>;

    /// League settings: stat categories, playoff start week, FAAB flag.
    async fn league_settings(&self, league_key: &str) -> Result<LeagueSettings>;

    /// All teams with manager identifiers.
    async fn teams(&self, league_key: &str) -> Result<Vec<TeamEntry>>;

    /// Current standings: rank, playoff seed, waiver priority, FAAB balance.
    async fn standings(&self, league_key: &str) -> Result<Vec<StandingsEntry>>;

    /// Matchup pairings and results for one week.
    async fn scoreboard(&self, league_key: &str, week: u32) -> Result<Vec<MatchupEntry>>;

    /// A team's aggregate category values for one week.
    async fn team_week_stats(&self, team_key: &str, week: u32) -> Result<Vec<StatValue>>;

    /// A team's roster for one week, with per-player stat lines and the
    /// keeper indicator.
    async fn roster_with_stats(
        &self,
        league_key: &str,
        team_id: u32,
        week: u32,
    ) -> Result<Vec<RosterEntry>>;

    /// Draft results in pick order.
    async fn draft_results(&self, league_key: &str) -> Result<Vec<DraftPickEntry>>;

    /// The full transaction log (implementations page internally).
    async fn transactions(&self, league_key: &str) -> Result<Vec<TransactionEntry>>;
}

/// Construct a team key from a league key and team id.
/// Keys follow `{game}.l.{league}.t.{team_id}`, e.g. "458.l.25845.t.3".
pub fn build_team_key(league_key: &str, team_id: u32) -> String {
    format!("{league_key}.t.{team_id}")
}

/// Extract the stable player id from a season-specific player key.
/// Keys follow `{game}.p.{player_id}`; the id is stable across seasons for
/// the same real-world player while the game prefix changes yearly.
pub fn extract_player_id(player_key: &str) -> &str {
    player_key
        .rsplit_once(".p.")
        .map(|(_, id)| id)
        .unwrap_or(player_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_key_construction() {
        assert_eq!(build_team_key("458.l.25845", 3), "458.l.25845.t.3");
    }

    #[test]
    fn player_id_extraction() {
        assert_eq!(extract_player_id("458.p.12345"), "12345");
        assert_eq!(extract_player_id("422.p.12345"), "12345");
        // Malformed keys fall through unchanged
        assert_eq!(extract_player_id("12345"), "12345");
        assert_eq!(extract_player_id(""), "");
    }
}
