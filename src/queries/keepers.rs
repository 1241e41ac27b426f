// Keeper and draft queries.

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter};

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct KeeperRow {
    pub player_name: String,
    pub player_key: String,
    pub season: i32,
    pub round_cost: u32,
    pub kept_from_season: Option<i32>,
    pub team_key: String,
    pub primary_position: Option<String>,
}

/// All keepers for a set of team keys (one lineage across seasons), ordered
/// by season then round cost.
pub fn get_keepers_for_teams(db: &Database, team_keys: &[String]) -> Result<Vec<KeeperRow>> {
    if team_keys.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; team_keys.len()].join(",");
    let sql = format!(
        "SELECT k.player_name, k.player_key, k.season, k.round_cost,
                k.kept_from_season, k.team_key, p.primary_position
         FROM keeper k
         JOIN league l ON k.league_key = l.league_key
         LEFT JOIN player p ON k.player_key = p.player_key
         WHERE k.team_key IN ({placeholders})
         ORDER BY k.season, k.round_cost"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_keepers_for_teams")?;
    let rows = stmt
        .query_map(params_from_iter(team_keys.iter()), |row| {
            Ok(KeeperRow {
                player_name: row.get(0)?,
                player_key: row.get(1)?,
                season: row.get(2)?,
                round_cost: row.get(3)?,
                kept_from_season: row.get(4)?,
                team_key: row.get(5)?,
                primary_position: row.get(6)?,
            })
        })
        .context("failed to query keepers for teams")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map keeper rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct SeasonKeeperRow {
    pub player_name: String,
    pub player_key: String,
    pub team_key: String,
    pub round_cost: u32,
    pub kept_from_season: Option<i32>,
    pub team_name: String,
    pub manager_name: Option<String>,
}

/// All keepers for a given season/league, grouped by team name.
pub fn get_keepers_by_season(db: &Database, league_key: &str) -> Result<Vec<SeasonKeeperRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT k.player_name, k.player_key, k.team_key, k.round_cost,
                    k.kept_from_season, t.name, t.manager_name
             FROM keeper k
             JOIN team t ON k.league_key = t.league_key AND k.team_key = t.team_key
             WHERE k.league_key = ?1
             ORDER BY t.name, k.round_cost",
        )
        .context("failed to prepare get_keepers_by_season")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(SeasonKeeperRow {
                player_name: row.get(0)?,
                player_key: row.get(1)?,
                team_key: row.get(2)?,
                round_cost: row.get(3)?,
                kept_from_season: row.get(4)?,
                team_name: row.get(5)?,
                manager_name: row.get(6)?,
            })
        })
        .context("failed to query season keepers")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map season keeper rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct KeeperLineageRow {
    pub league_key: String,
    pub team_key: String,
    pub player_key: String,
    pub season: i32,
    pub manager_guid: String,
}

/// Every keeper row joined with its team's manager guid, across all seasons,
/// ordered by season. Feeds the lineage stamping pass.
pub fn get_all_keepers_with_managers(db: &Database) -> Result<Vec<KeeperLineageRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT k.league_key, k.team_key, k.player_key, k.season, t.manager_guid
             FROM keeper k
             JOIN team t ON k.league_key = t.league_key AND k.team_key = t.team_key
             ORDER BY k.season",
        )
        .context("failed to prepare get_all_keepers_with_managers")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(KeeperLineageRow {
                league_key: row.get(0)?,
                team_key: row.get(1)?,
                player_key: row.get(2)?,
                season: row.get(3)?,
                manager_guid: row.get(4)?,
            })
        })
        .context("failed to query keeper lineage rows")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map keeper lineage rows")?;
    Ok(rows)
}

/// Stamp a keeper row with the starting season of its consecutive run.
pub fn set_kept_from_season(
    db: &Database,
    league_key: &str,
    team_key: &str,
    player_key: &str,
    kept_from: i32,
) -> Result<()> {
    db.execute(
        "UPDATE keeper SET kept_from_season = ?1
         WHERE league_key = ?2 AND team_key = ?3 AND player_key = ?4",
        params![kept_from, league_key, team_key, player_key],
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DraftPickRow {
    pub pick: u32,
    pub round: u32,
    pub team_key: String,
    pub player_key: String,
}

/// Draft picks for a league in pick order.
pub fn get_draft_picks(db: &Database, league_key: &str) -> Result<Vec<DraftPickRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT pick, round, team_key, player_key FROM draft_pick
             WHERE league_key = ?1 ORDER BY pick",
        )
        .context("failed to prepare get_draft_picks")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(DraftPickRow {
                pick: row.get(0)?,
                round: row.get(1)?,
                team_key: row.get(2)?,
                player_key: row.get(3)?,
            })
        })
        .context("failed to query draft picks")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map draft pick rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct Week1RosterRow {
    pub team_key: String,
    pub player_key: String,
    pub full_name: String,
    pub is_keeper: bool,
}

/// Week-1 roster entries with the source's keeper indicator, for keeper sync.
pub fn get_week1_rosters(db: &Database, league_key: &str) -> Result<Vec<Week1RosterRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT wr.team_key, wr.player_key, p.full_name, wr.is_keeper
             FROM weekly_roster wr
             JOIN player p ON wr.player_key = p.player_key
             WHERE wr.league_key = ?1 AND wr.week = 1
             ORDER BY wr.team_key, wr.player_key",
        )
        .context("failed to prepare get_week1_rosters")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(Week1RosterRow {
                team_key: row.get(0)?,
                player_key: row.get(1)?,
                full_name: row.get(2)?,
                is_keeper: row.get(3)?,
            })
        })
        .context("failed to query week-1 rosters")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map week-1 roster rows")?;
    Ok(rows)
}
