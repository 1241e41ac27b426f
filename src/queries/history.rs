// Cross-season aggregation queries.

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct ManagerTeamRow {
    pub manager_guid: String,
    pub manager_name: Option<String>,
    pub team_key: String,
    pub team_name: String,
    pub finish: Option<u32>,
    pub playoff_seed: Option<u32>,
    pub league_key: String,
    pub season: i32,
    pub is_finished: bool,
}

/// All teams with their manager guids and seasons, ordered by season.
pub fn get_all_manager_teams(db: &Database) -> Result<Vec<ManagerTeamRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT t.manager_guid, t.manager_name, t.team_key, t.name,
                    t.finish, t.playoff_seed,
                    l.league_key, l.season, l.is_finished
             FROM team t JOIN league l ON t.league_key = l.league_key
             WHERE t.manager_guid != ''
             ORDER BY l.season",
        )
        .context("failed to prepare get_all_manager_teams")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ManagerTeamRow {
                manager_guid: row.get(0)?,
                manager_name: row.get(1)?,
                team_key: row.get(2)?,
                team_name: row.get(3)?,
                finish: row.get(4)?,
                playoff_seed: row.get(5)?,
                league_key: row.get(6)?,
                season: row.get(7)?,
                is_finished: row.get(8)?,
            })
        })
        .context("failed to query manager teams")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map manager team rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct ManagerMatchupRow {
    pub league_key: String,
    pub week: u32,
    pub winner_team_key: Option<String>,
    pub is_tied: bool,
    pub team_key_1: String,
    pub team_key_2: String,
    pub cats_won_1: u32,
    pub cats_won_2: u32,
    pub cats_tied: u32,
    pub is_playoffs: bool,
    pub is_consolation: bool,
    pub guid_1: String,
    pub guid_2: String,
    pub season: i32,
}

/// All matchups annotated with manager guids for cross-season analysis.
pub fn get_all_matchups_with_manager_guids(db: &Database) -> Result<Vec<ManagerMatchupRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT m.league_key, m.week, m.winner_team_key, m.is_tied,
                    m.team_key_1, m.team_key_2, m.cats_won_1, m.cats_won_2,
                    m.cats_tied, m.is_playoffs, m.is_consolation,
                    t1.manager_guid, t2.manager_guid, l.season
             FROM matchup m
             JOIN team t1 ON m.league_key = t1.league_key AND m.team_key_1 = t1.team_key
             JOIN team t2 ON m.league_key = t2.league_key AND m.team_key_2 = t2.team_key
             JOIN league l ON m.league_key = l.league_key",
        )
        .context("failed to prepare get_all_matchups_with_manager_guids")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ManagerMatchupRow {
                league_key: row.get(0)?,
                week: row.get(1)?,
                winner_team_key: row.get(2)?,
                is_tied: row.get(3)?,
                team_key_1: row.get(4)?,
                team_key_2: row.get(5)?,
                cats_won_1: row.get(6)?,
                cats_won_2: row.get(7)?,
                cats_tied: row.get(8)?,
                is_playoffs: row.get(9)?,
                is_consolation: row.get(10)?,
                guid_1: row.get(11)?,
                guid_2: row.get(12)?,
                season: row.get(13)?,
            })
        })
        .context("failed to query matchups with guids")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map guid matchup rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct CategoryRecordRow {
    pub value: String,
    pub week: u32,
    pub manager_name: Option<String>,
    pub team_name: String,
    pub season: i32,
    pub display_name: String,
}

/// Best single-week team value for a category across all seasons.
///
/// Equal values keep the first row the query returns (first-seen wins).
pub fn get_category_record_holder(
    db: &Database,
    display_name: &str,
    higher_is_better: bool,
) -> Result<Option<CategoryRecordRow>> {
    let order = if higher_is_better { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT tws.value, tws.week, t.manager_name, t.name, l.season, sc.display_name
         FROM team_weekly_score tws
         JOIN team t ON tws.league_key = t.league_key AND tws.team_key = t.team_key
         JOIN league l ON tws.league_key = l.league_key
         JOIN stat_category sc ON tws.league_key = sc.league_key
             AND tws.stat_id = sc.stat_id
         WHERE sc.display_name = ?1 AND sc.is_scoring_stat = 1
             AND tws.value IS NOT NULL
         ORDER BY CAST(tws.value AS REAL) {order} LIMIT 1"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_category_record_holder")?;
    let mut rows = stmt
        .query_map(params![display_name], |row| {
            Ok(CategoryRecordRow {
                value: row.get(0)?,
                week: row.get(1)?,
                manager_name: row.get(2)?,
                team_name: row.get(3)?,
                season: row.get(4)?,
                display_name: row.get(5)?,
            })
        })
        .context("failed to query category record")?;
    rows.next()
        .transpose()
        .context("failed to read category record row")
}

#[derive(Debug, Clone)]
pub struct StreakMatchupRow {
    pub team_key_1: String,
    pub team_key_2: String,
    pub winner_team_key: Option<String>,
    pub is_tied: bool,
    pub guid_1: String,
    pub name_1: Option<String>,
    pub team_name_1: String,
    pub guid_2: String,
    pub name_2: Option<String>,
    pub team_name_2: String,
    pub season: i32,
    pub week: u32,
}

/// All matchups with manager info in (season, week) order, for streaks.
/// Regular season only unless `include_playoffs` is set.
pub fn get_matchups_for_streaks(
    db: &Database,
    include_playoffs: bool,
) -> Result<Vec<StreakMatchupRow>> {
    let where_clause = if include_playoffs {
        ""
    } else {
        "WHERE m.is_playoffs = 0 AND m.is_consolation = 0 "
    };
    let sql = format!(
        "SELECT m.team_key_1, m.team_key_2, m.winner_team_key, m.is_tied,
                t1.manager_guid, t1.manager_name, t1.name,
                t2.manager_guid, t2.manager_name, t2.name,
                l.season, m.week
         FROM matchup m
         JOIN team t1 ON m.league_key = t1.league_key AND m.team_key_1 = t1.team_key
         JOIN team t2 ON m.league_key = t2.league_key AND m.team_key_2 = t2.team_key
         JOIN league l ON m.league_key = l.league_key
         {where_clause}ORDER BY l.season, m.week"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_matchups_for_streaks")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StreakMatchupRow {
                team_key_1: row.get(0)?,
                team_key_2: row.get(1)?,
                winner_team_key: row.get(2)?,
                is_tied: row.get(3)?,
                guid_1: row.get(4)?,
                name_1: row.get(5)?,
                team_name_1: row.get(6)?,
                guid_2: row.get(7)?,
                name_2: row.get(8)?,
                team_name_2: row.get(9)?,
                season: row.get(10)?,
                week: row.get(11)?,
            })
        })
        .context("failed to query streak matchups")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map streak rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct ScoreMatchupRow {
    pub cats_won_1: u32,
    pub cats_won_2: u32,
    pub cats_tied: u32,
    pub is_tied: bool,
    pub manager_1: Option<String>,
    pub team_name_1: String,
    pub manager_2: Option<String>,
    pub team_name_2: String,
    pub season: i32,
    pub week: u32,
}

/// All matchup scores with team info, for blowout/closest-match records.
/// Regular season only unless `include_playoffs` is set.
pub fn get_matchup_scores(db: &Database, include_playoffs: bool) -> Result<Vec<ScoreMatchupRow>> {
    let where_clause = if include_playoffs {
        ""
    } else {
        "WHERE m.is_playoffs = 0 AND m.is_consolation = 0"
    };
    let sql = format!(
        "SELECT m.cats_won_1, m.cats_won_2, m.cats_tied, m.is_tied,
                t1.manager_name, t1.name, t2.manager_name, t2.name,
                l.season, m.week
         FROM matchup m
         JOIN team t1 ON m.league_key = t1.league_key AND m.team_key_1 = t1.team_key
         JOIN team t2 ON m.league_key = t2.league_key AND m.team_key_2 = t2.team_key
         JOIN league l ON m.league_key = l.league_key
         {where_clause}"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_matchup_scores")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ScoreMatchupRow {
                cats_won_1: row.get(0)?,
                cats_won_2: row.get(1)?,
                cats_tied: row.get(2)?,
                is_tied: row.get(3)?,
                manager_1: row.get(4)?,
                team_name_1: row.get(5)?,
                manager_2: row.get(6)?,
                team_name_2: row.get(7)?,
                season: row.get(8)?,
                week: row.get(9)?,
            })
        })
        .context("failed to query matchup scores")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map score rows")?;
    Ok(rows)
}
