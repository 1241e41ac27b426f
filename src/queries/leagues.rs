// League and stat_category queries.

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct LeagueRow {
    pub league_key: String,
    pub season: i32,
    pub name: String,
    pub num_teams: u32,
    pub scoring_type: String,
    pub num_scoring_cats: u32,
    pub current_week: u32,
    pub start_week: u32,
    pub end_week: u32,
    pub playoff_start_week: Option<u32>,
    pub uses_faab: bool,
    pub is_finished: bool,
}

fn league_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LeagueRow> {
    Ok(LeagueRow {
        league_key: row.get("league_key")?,
        season: row.get("season")?,
        name: row.get("name")?,
        num_teams: row.get("num_teams")?,
        scoring_type: row.get("scoring_type")?,
        num_scoring_cats: row.get("num_scoring_cats")?,
        current_week: row.get("current_week")?,
        start_week: row.get("start_week")?,
        end_week: row.get("end_week")?,
        playoff_start_week: row.get("playoff_start_week")?,
        uses_faab: row.get("uses_faab")?,
        is_finished: row.get("is_finished")?,
    })
}

/// Full league metadata by league_key.
pub fn get_league(db: &Database, league_key: &str) -> Result<Option<LeagueRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare("SELECT * FROM league WHERE league_key = ?1")
        .context("failed to prepare get_league")?;
    let mut rows = stmt
        .query_map(params![league_key], league_from_row)
        .context("failed to query league")?;
    rows.next().transpose().context("failed to read league row")
}

/// The most recently synced league (by season).
pub fn get_latest_league(db: &Database) -> Result<Option<LeagueRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare("SELECT * FROM league ORDER BY season DESC LIMIT 1")
        .context("failed to prepare get_latest_league")?;
    let mut rows = stmt
        .query_map([], league_from_row)
        .context("failed to query latest league")?;
    rows.next().transpose().context("failed to read league row")
}

#[derive(Debug, Clone)]
pub struct SeasonRow {
    pub league_key: String,
    pub season: i32,
    pub name: String,
    pub is_finished: bool,
}

/// All synced seasons, most recent first.
pub fn get_all_seasons(db: &Database) -> Result<Vec<SeasonRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT league_key, season, name, is_finished FROM league ORDER BY season DESC",
        )
        .context("failed to prepare get_all_seasons")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SeasonRow {
                league_key: row.get(0)?,
                season: row.get(1)?,
                name: row.get(2)?,
                is_finished: row.get(3)?,
            })
        })
        .context("failed to query seasons")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map season rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct ScoringCategory {
    pub stat_id: u32,
    pub name: String,
    pub display_name: String,
    /// 1 = higher is better, 0 = lower is better.
    pub sort_order: u8,
    pub position_type: Option<String>,
}

impl ScoringCategory {
    pub fn higher_is_better(&self) -> bool {
        self.sort_order == 1
    }
}

/// Scoring stat categories for a league (display-only stats excluded).
pub fn get_scoring_categories(db: &Database, league_key: &str) -> Result<Vec<ScoringCategory>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT stat_id, name, display_name, sort_order, position_type
             FROM stat_category
             WHERE league_key = ?1 AND is_scoring_stat = 1
             ORDER BY stat_id",
        )
        .context("failed to prepare get_scoring_categories")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(ScoringCategory {
                stat_id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                sort_order: row.get(3)?,
                position_type: row.get(4)?,
            })
        })
        .context("failed to query scoring categories")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map category rows")?;
    Ok(rows)
}

/// Unique scoring categories across all seasons, deduplicated by display
/// name (the same stat appears under every season's league_key).
pub fn get_distinct_scoring_categories(db: &Database) -> Result<Vec<ScoringCategory>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT sc.stat_id, sc.name, sc.display_name, sc.sort_order,
                    sc.position_type
             FROM stat_category sc
             JOIN league l ON sc.league_key = l.league_key
             WHERE sc.is_scoring_stat = 1
             ORDER BY sc.display_name",
        )
        .context("failed to prepare get_distinct_scoring_categories")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ScoringCategory {
                stat_id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                sort_order: row.get(3)?,
                position_type: row.get(4)?,
            })
        })
        .context("failed to query distinct categories")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map category rows")?;

    let mut seen = std::collections::HashSet::new();
    Ok(rows
        .into_iter()
        .filter(|c| seen.insert(c.display_name.clone()))
        .collect())
}
