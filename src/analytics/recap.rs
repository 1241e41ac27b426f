// Weekly recap assembly: everything needed to write up one week.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::standings::{StandingsRow, TeamProfile, TeamProfiler};
use crate::analytics::value::{PlayerRank, PlayerValue};
use crate::db::Database;
use crate::queries::leagues;
use crate::queries::matchups;
use crate::queries::teams;
use crate::queries::transactions as txn_queries;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLine {
    pub display_name: String,
    pub team_1_value: Option<String>,
    pub team_2_value: Option<String>,
    /// 1 or 2 for the winning side, None for a category tie.
    pub winner: Option<u8>,
}

/// One matchup result with per-category detail.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupSummary {
    pub team_1_name: String,
    pub team_1_manager: String,
    pub team_2_name: String,
    pub team_2_manager: String,
    pub cats_won_1: u32,
    pub cats_won_2: u32,
    pub cats_tied: u32,
    pub winner_name: String,
    pub is_playoffs: bool,
    pub is_consolation: bool,
    pub categories: Vec<CategoryLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub txn_type: String,
    pub player_name: String,
    pub move_type: String,
    pub dest_team_name: Option<String>,
    pub dest_manager: Option<String>,
    pub src_team_name: Option<String>,
    pub faab_bid: Option<u32>,
}

/// All data assembled for one week's recap.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyRecap {
    pub league_key: String,
    pub league_name: String,
    pub season: i32,
    pub week: u32,
    pub week_start: String,
    pub week_end: String,
    pub matchups: Vec<MatchupSummary>,
    pub batter_of_week: Option<PlayerRank>,
    pub pitcher_of_week: Option<PlayerRank>,
    /// Single-pool sports get one award instead of a batter/pitcher pair.
    pub player_of_week: Option<PlayerRank>,
    pub standings: Vec<StandingsRow>,
    pub profiles: Vec<TeamProfile>,
    pub transactions: Vec<TransactionSummary>,
}

/// Assembles all data for a weekly recap from the store.
pub struct RecapAssembler<'a> {
    db: &'a Database,
    league_key: String,
}

impl<'a> RecapAssembler<'a> {
    pub fn new(db: &'a Database, league_key: &str) -> Self {
        Self {
            db,
            league_key: league_key.to_string(),
        }
    }

    /// A league is split-pool when it scores any pitching categories.
    fn has_pitching_pool(&self) -> Result<bool> {
        let cats = leagues::get_scoring_categories(self.db, &self.league_key)?;
        Ok(cats.iter().any(|c| c.position_type.as_deref() == Some("P")))
    }

    fn build_matchups(&self, week: u32) -> Result<Vec<MatchupSummary>> {
        let rows = matchups::get_week_matchups(self.db, &self.league_key, week)?;

        let mut results = Vec::new();
        for m in rows {
            let t1 = teams::get_team_info(self.db, &self.league_key, &m.team_key_1)?;
            let t2 = teams::get_team_info(self.db, &self.league_key, &m.team_key_2)?;
            let winner_name = match &m.winner_team_key {
                Some(key) => teams::get_team_info(self.db, &self.league_key, key)?
                    .map(|t| t.name)
                    .unwrap_or_else(|| "Tie".to_string()),
                None => "Tie".to_string(),
            };

            let categories = matchups::get_matchup_categories(
                self.db,
                &self.league_key,
                week,
                m.matchup_id,
            )?
            .into_iter()
            .map(|c| {
                let winner = match c.winner_team_key.as_deref() {
                    Some(key) if key == m.team_key_1 => Some(1),
                    Some(key) if key == m.team_key_2 => Some(2),
                    _ => None,
                };
                CategoryLine {
                    display_name: c.display_name,
                    team_1_value: c.team_1_value,
                    team_2_value: c.team_2_value,
                    winner,
                }
            })
            .collect();

            results.push(MatchupSummary {
                team_1_name: t1.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
                team_1_manager: t1
                    .as_ref()
                    .and_then(|t| t.manager_name.clone())
                    .unwrap_or_default(),
                team_2_name: t2.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
                team_2_manager: t2
                    .as_ref()
                    .and_then(|t| t.manager_name.clone())
                    .unwrap_or_default(),
                cats_won_1: m.cats_won_1,
                cats_won_2: m.cats_won_2,
                cats_tied: m.cats_tied,
                winner_name,
                is_playoffs: m.is_playoffs,
                is_consolation: m.is_consolation,
                categories,
            });
        }
        Ok(results)
    }

    /// Transactions that landed inside the week's date range.
    fn week_transactions(&self, week: u32) -> Result<Vec<TransactionSummary>> {
        let Some((start, end)) =
            matchups::get_matchup_dates(self.db, &self.league_key, week)?
        else {
            return Ok(vec![]);
        };

        let Some(from) = date_to_epoch_start(&start) else {
            return Ok(vec![]);
        };
        let Some(to) = date_to_epoch_end(&end) else {
            return Ok(vec![]);
        };

        let rows =
            txn_queries::get_transactions_in_range(self.db, &self.league_key, from, to)?;
        Ok(rows
            .into_iter()
            .map(|r| TransactionSummary {
                txn_type: r.txn_type,
                player_name: r.full_name,
                move_type: r.player_type,
                dest_team_name: r.dest_team_name,
                dest_manager: r.dest_manager,
                src_team_name: r.src_team_name,
                faab_bid: r.faab_bid,
            })
            .collect())
    }

    /// Assemble a complete weekly recap.
    pub fn build(&self, week: u32) -> Result<WeeklyRecap> {
        let league = leagues::get_league(self.db, &self.league_key)?;

        let (week_start, week_end) =
            matchups::get_matchup_dates(self.db, &self.league_key, week)?
                .unwrap_or_default();

        let mut recap = WeeklyRecap {
            league_key: self.league_key.clone(),
            league_name: league.as_ref().map(|l| l.name.clone()).unwrap_or_default(),
            season: league.as_ref().map(|l| l.season).unwrap_or_default(),
            week,
            week_start,
            week_end,
            matchups: self.build_matchups(week)?,
            batter_of_week: None,
            pitcher_of_week: None,
            player_of_week: None,
            standings: vec![],
            profiles: vec![],
            transactions: self.week_transactions(week)?,
        };

        let value = PlayerValue::new(self.db, &self.league_key)?;
        if self.has_pitching_pool()? {
            recap.batter_of_week = value.top_batters(week, 1)?.into_iter().next();
            recap.pitcher_of_week = value.top_pitchers(week, 1)?.into_iter().next();
        } else {
            recap.player_of_week = value.top_players(week, 1)?.into_iter().next();
        }

        let profiler = TeamProfiler::new(self.db, &self.league_key);
        recap.standings = profiler.standings(week)?;
        recap.profiles = profiler.build_profiles(week)?;

        Ok(recap)
    }
}

/// Epoch seconds at the start of an ISO date (UTC midnight).
fn date_to_epoch_start(date: &str) -> Option<i64> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(parsed.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Epoch seconds at the end of an ISO date (UTC 23:59:59).
fn date_to_epoch_end(date: &str) -> Option<i64> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(parsed.and_hms_opt(23, 59, 59)?.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_bounds_cover_the_full_day() {
        let start = date_to_epoch_start("2023-04-10").unwrap();
        let end = date_to_epoch_end("2023-04-10").unwrap();
        assert_eq!(end - start, 86_399);
    }

    #[test]
    fn malformed_dates_yield_none() {
        assert!(date_to_epoch_start("not-a-date").is_none());
        assert!(date_to_epoch_end("").is_none());
    }
}
