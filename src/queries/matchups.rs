// Matchup and matchup_category queries.

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct MatchupResult {
    pub team_key_1: String,
    pub team_key_2: String,
    pub cats_won_1: u32,
    pub cats_won_2: u32,
    pub cats_tied: u32,
    pub winner_team_key: Option<String>,
    pub is_tied: bool,
}

/// All matchups up to and including a given week.
pub fn get_matchups_through_week(
    db: &Database,
    league_key: &str,
    through_week: u32,
) -> Result<Vec<MatchupResult>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT team_key_1, team_key_2, cats_won_1, cats_won_2,
                    cats_tied, winner_team_key, is_tied
             FROM matchup WHERE league_key = ?1 AND week <= ?2",
        )
        .context("failed to prepare get_matchups_through_week")?;
    let rows = stmt
        .query_map(params![league_key, through_week], |row| {
            Ok(MatchupResult {
                team_key_1: row.get(0)?,
                team_key_2: row.get(1)?,
                cats_won_1: row.get(2)?,
                cats_won_2: row.get(3)?,
                cats_tied: row.get(4)?,
                winner_team_key: row.get(5)?,
                is_tied: row.get(6)?,
            })
        })
        .context("failed to query matchups")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map matchup rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct CategoryResult {
    pub stat_id: u32,
    pub display_name: String,
    pub winner_team_key: Option<String>,
}

/// Per-category results for every matchup a team played through a week.
pub fn get_team_category_results(
    db: &Database,
    league_key: &str,
    team_key: &str,
    through_week: u32,
) -> Result<Vec<CategoryResult>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT mc.stat_id, sc.display_name, mc.winner_team_key
             FROM matchup_category mc
             JOIN matchup m ON mc.league_key = m.league_key AND mc.week = m.week
                 AND mc.matchup_id = m.matchup_id
             JOIN stat_category sc ON mc.league_key = sc.league_key
                 AND mc.stat_id = sc.stat_id
             WHERE mc.league_key = ?1 AND mc.week <= ?2
                 AND (m.team_key_1 = ?3 OR m.team_key_2 = ?3)
                 AND sc.is_scoring_stat = 1",
        )
        .context("failed to prepare get_team_category_results")?;
    let rows = stmt
        .query_map(params![league_key, through_week, team_key], |row| {
            Ok(CategoryResult {
                stat_id: row.get(0)?,
                display_name: row.get(1)?,
                winner_team_key: row.get(2)?,
            })
        })
        .context("failed to query category results")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map category result rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct WeekResult {
    pub week: u32,
    pub winner_team_key: Option<String>,
    pub is_tied: bool,
}

/// Matchup results for a team ordered by week descending.
pub fn get_team_matchup_history(
    db: &Database,
    league_key: &str,
    team_key: &str,
    through_week: u32,
) -> Result<Vec<WeekResult>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT week, winner_team_key, is_tied FROM matchup
             WHERE league_key = ?1 AND week <= ?2
                 AND (team_key_1 = ?3 OR team_key_2 = ?3)
             ORDER BY week DESC",
        )
        .context("failed to prepare get_team_matchup_history")?;
    let rows = stmt
        .query_map(params![league_key, through_week, team_key], |row| {
            Ok(WeekResult {
                week: row.get(0)?,
                winner_team_key: row.get(1)?,
                is_tied: row.get(2)?,
            })
        })
        .context("failed to query matchup history")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map history rows")?;
    Ok(rows)
}

/// All-time head-to-head matchups between two team keys across all seasons.
pub fn get_cross_season_h2h(
    db: &Database,
    team_key: &str,
    opponent_key: &str,
) -> Result<Vec<(Option<String>, bool)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT winner_team_key, is_tied FROM matchup
             WHERE league_key IN (SELECT league_key FROM league)
                 AND ((team_key_1 = ?1 AND team_key_2 = ?2)
                   OR (team_key_1 = ?2 AND team_key_2 = ?1))",
        )
        .context("failed to prepare get_cross_season_h2h")?;
    let rows = stmt
        .query_map(params![team_key, opponent_key], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("failed to query h2h matchups")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map h2h rows")?;
    Ok(rows)
}

/// Team pairings for a specific week.
pub fn get_current_week_matchups(
    db: &Database,
    league_key: &str,
    week: u32,
) -> Result<Vec<(String, String)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT team_key_1, team_key_2 FROM matchup
             WHERE league_key = ?1 AND week = ?2",
        )
        .context("failed to prepare get_current_week_matchups")?;
    let rows = stmt
        .query_map(params![league_key, week], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("failed to query week pairings")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map pairing rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct MatchupRow {
    pub week: u32,
    pub matchup_id: u32,
    pub team_key_1: String,
    pub team_key_2: String,
    pub cats_won_1: u32,
    pub cats_won_2: u32,
    pub cats_tied: u32,
    pub winner_team_key: Option<String>,
    pub is_tied: bool,
    pub is_playoffs: bool,
    pub is_consolation: bool,
    pub week_start: String,
    pub week_end: String,
}

/// Full matchup data for a specific week.
pub fn get_week_matchups(db: &Database, league_key: &str, week: u32) -> Result<Vec<MatchupRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT week, matchup_id, team_key_1, team_key_2, cats_won_1, cats_won_2,
                    cats_tied, winner_team_key, is_tied, is_playoffs, is_consolation,
                    week_start, week_end
             FROM matchup WHERE league_key = ?1 AND week = ?2 ORDER BY matchup_id",
        )
        .context("failed to prepare get_week_matchups")?;
    let rows = stmt
        .query_map(params![league_key, week], |row| {
            Ok(MatchupRow {
                week: row.get(0)?,
                matchup_id: row.get(1)?,
                team_key_1: row.get(2)?,
                team_key_2: row.get(3)?,
                cats_won_1: row.get(4)?,
                cats_won_2: row.get(5)?,
                cats_tied: row.get(6)?,
                winner_team_key: row.get(7)?,
                is_tied: row.get(8)?,
                is_playoffs: row.get(9)?,
                is_consolation: row.get(10)?,
                week_start: row.get(11)?,
                week_end: row.get(12)?,
            })
        })
        .context("failed to query week matchups")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map week matchup rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct MatchupCategoryRow {
    pub stat_id: u32,
    pub display_name: String,
    pub team_1_value: Option<String>,
    pub team_2_value: Option<String>,
    pub winner_team_key: Option<String>,
}

/// Per-category breakdown for a specific matchup.
pub fn get_matchup_categories(
    db: &Database,
    league_key: &str,
    week: u32,
    matchup_id: u32,
) -> Result<Vec<MatchupCategoryRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT mc.stat_id, sc.display_name, mc.team_1_value,
                    mc.team_2_value, mc.winner_team_key
             FROM matchup_category mc
             JOIN stat_category sc ON mc.league_key = sc.league_key
                 AND mc.stat_id = sc.stat_id
             WHERE mc.league_key = ?1 AND mc.week = ?2 AND mc.matchup_id = ?3
                 AND sc.is_scoring_stat = 1
             ORDER BY sc.position_type, mc.stat_id",
        )
        .context("failed to prepare get_matchup_categories")?;
    let rows = stmt
        .query_map(params![league_key, week, matchup_id], |row| {
            Ok(MatchupCategoryRow {
                stat_id: row.get(0)?,
                display_name: row.get(1)?,
                team_1_value: row.get(2)?,
                team_2_value: row.get(3)?,
                winner_team_key: row.get(4)?,
            })
        })
        .context("failed to query matchup categories")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map matchup category rows")?;
    Ok(rows)
}

/// week_start and week_end dates for a matchup week.
pub fn get_matchup_dates(
    db: &Database,
    league_key: &str,
    week: u32,
) -> Result<Option<(String, String)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT week_start, week_end FROM matchup
             WHERE league_key = ?1 AND week = ?2 LIMIT 1",
        )
        .context("failed to prepare get_matchup_dates")?;
    let mut rows = stmt
        .query_map(params![league_key, week], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("failed to query matchup dates")?;
    rows.next().transpose().context("failed to read date row")
}

/// (week, week_end) per synced week in ascending week order, for the
/// transaction week backfill.
pub fn get_week_end_dates(db: &Database, league_key: &str) -> Result<Vec<(u32, String)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT week, MAX(week_end) FROM matchup
             WHERE league_key = ?1 AND week_end != ''
             GROUP BY week ORDER BY week",
        )
        .context("failed to prepare get_week_end_dates")?;
    let rows = stmt
        .query_map(params![league_key], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to query week end dates")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map week end rows")?;
    Ok(rows)
}

/// Observed (min, max) week across all synced matchups for a league.
pub fn get_observed_week_bounds(
    db: &Database,
    league_key: &str,
) -> Result<Option<(u32, u32)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare("SELECT MIN(week), MAX(week) FROM matchup WHERE league_key = ?1")
        .context("failed to prepare get_observed_week_bounds")?;
    let mut rows = stmt
        .query_map(params![league_key], |row| {
            let min: Option<u32> = row.get(0)?;
            let max: Option<u32> = row.get(1)?;
            Ok(min.zip(max))
        })
        .context("failed to query week bounds")?;
    Ok(rows
        .next()
        .transpose()
        .context("failed to read week bounds")?
        .flatten())
}

/// The first week flagged playoff or consolation, if any.
pub fn get_min_playoff_week(db: &Database, league_key: &str) -> Result<Option<u32>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT MIN(week) FROM matchup
             WHERE league_key = ?1 AND (is_playoffs = 1 OR is_consolation = 1)",
        )
        .context("failed to prepare get_min_playoff_week")?;
    let mut rows = stmt
        .query_map(params![league_key], |row| row.get::<_, Option<u32>>(0))
        .context("failed to query min playoff week")?;
    Ok(rows
        .next()
        .transpose()
        .context("failed to read min playoff week")?
        .flatten())
}

