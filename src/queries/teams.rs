// Team queries.

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct TeamRow {
    pub team_key: String,
    pub name: String,
    pub manager_name: Option<String>,
}

/// All teams for a league.
pub fn get_all_teams(db: &Database, league_key: &str) -> Result<Vec<TeamRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare("SELECT team_key, name, manager_name FROM team WHERE league_key = ?1")
        .context("failed to prepare get_all_teams")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(TeamRow {
                team_key: row.get(0)?,
                name: row.get(1)?,
                manager_name: row.get(2)?,
            })
        })
        .context("failed to query teams")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map team rows")?;
    Ok(rows)
}

/// Team name and resolved manager name.
pub fn get_team_info(
    db: &Database,
    league_key: &str,
    team_key: &str,
) -> Result<Option<TeamRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT team_key, name, manager_name FROM team
             WHERE league_key = ?1 AND team_key = ?2",
        )
        .context("failed to prepare get_team_info")?;
    let mut rows = stmt
        .query_map(params![league_key, team_key], |row| {
            Ok(TeamRow {
                team_key: row.get(0)?,
                name: row.get(1)?,
                manager_name: row.get(2)?,
            })
        })
        .context("failed to query team info")?;
    rows.next().transpose().context("failed to read team row")
}

/// Distinct manager guids (with their source nicknames) that have no
/// resolved display name yet. Feeds manager discovery.
pub fn get_unresolved_manager_guids(db: &Database) -> Result<Vec<(String, String)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT manager_guid, manager_nickname FROM team
             WHERE manager_guid != ''
               AND (manager_name IS NULL OR manager_name = '')",
        )
        .context("failed to prepare get_unresolved_manager_guids")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to query unresolved guids")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map guid rows")?;
    Ok(rows)
}

/// Set the resolved manager_name for every team row with the given guid,
/// across all seasons.
pub fn update_manager_name(db: &Database, name: &str, guid: &str) -> Result<()> {
    db.execute(
        "UPDATE team SET manager_name = ?1 WHERE manager_guid = ?2",
        params![name, guid],
    )?;
    Ok(())
}
