// Player, roster, and stat queries.

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter};

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct StarterRow {
    pub player_key: String,
    pub team_key: String,
    pub selected_position: Option<String>,
    pub full_name: String,
    pub team_name: String,
    pub manager_name: Option<String>,
}

/// All starters for a week with player/team/manager context.
pub fn get_week_starters(db: &Database, league_key: &str, week: u32) -> Result<Vec<StarterRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT wr.player_key, wr.team_key, wr.selected_position,
                    p.full_name, t.name, t.manager_name
             FROM weekly_roster wr
             JOIN player p ON wr.player_key = p.player_key
             JOIN team t ON wr.league_key = t.league_key AND wr.team_key = t.team_key
             WHERE wr.league_key = ?1 AND wr.week = ?2 AND wr.is_starter = 1",
        )
        .context("failed to prepare get_week_starters")?;
    let rows = stmt
        .query_map(params![league_key, week], |row| {
            Ok(StarterRow {
                player_key: row.get(0)?,
                team_key: row.get(1)?,
                selected_position: row.get(2)?,
                full_name: row.get(3)?,
                team_name: row.get(4)?,
                manager_name: row.get(5)?,
            })
        })
        .context("failed to query week starters")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map starter rows")?;
    Ok(rows)
}

/// A player's stat values for one week, limited to the given stat ids.
pub fn get_player_week_stats(
    db: &Database,
    league_key: &str,
    week: u32,
    player_key: &str,
    stat_ids: &[u32],
) -> Result<Vec<(u32, Option<String>)>> {
    if stat_ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; stat_ids.len()].join(",");
    let sql = format!(
        "SELECT stat_id, value FROM player_weekly_stat
         WHERE league_key = ?1 AND week = ?2 AND player_key = ?3
             AND stat_id IN ({placeholders})"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_player_week_stats")?;

    use rusqlite::types::Value;
    let mut bindings: Vec<Value> = vec![
        Value::Text(league_key.to_string()),
        Value::Integer(week as i64),
        Value::Text(player_key.to_string()),
    ];
    bindings.extend(stat_ids.iter().map(|id| Value::Integer(*id as i64)));

    let rows = stmt
        .query_map(params_from_iter(bindings), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .context("failed to query player week stats")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map player stat rows")?;
    Ok(rows)
}

/// Sum of a player's stat values from a given week onward, per stat id.
pub fn get_player_weekly_stats_sum(
    db: &Database,
    league_key: &str,
    player_key: &str,
    from_week: u32,
    stat_ids: &[u32],
) -> Result<Vec<(u32, f64)>> {
    if stat_ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; stat_ids.len()].join(",");
    let sql = format!(
        "SELECT stat_id, SUM(CAST(value AS REAL)) FROM player_weekly_stat
         WHERE league_key = ?1 AND player_key = ?2 AND week >= ?3
             AND stat_id IN ({placeholders})
         GROUP BY stat_id"
    );
    let conn = db.conn();
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare get_player_weekly_stats_sum")?;

    use rusqlite::types::Value;
    let mut bindings: Vec<Value> = vec![
        Value::Text(league_key.to_string()),
        Value::Text(player_key.to_string()),
        Value::Integer(from_week as i64),
    ];
    bindings.extend(stat_ids.iter().map(|id| Value::Integer(*id as i64)));

    let rows = stmt
        .query_map(params_from_iter(bindings), |row| {
            let total: Option<f64> = row.get(1)?;
            Ok((row.get(0)?, total.unwrap_or(0.0)))
        })
        .context("failed to query player stat sums")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map stat sum rows")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct RosterCostRow {
    pub player_key: String,
    pub full_name: String,
    pub primary_position: String,
    pub selected_position: Option<String>,
    pub is_starter: bool,
    pub draft_cost: u32,
}

/// Roster for a team/week with a draft cost per player.
///
/// Cost rules:
/// - drafted and never dropped -> 1-based pick index within the team's draft
///   (persists through trades)
/// - dropped at any point, even by another team -> 24
/// - never drafted (free-agent pickup only) -> 24
pub fn get_roster_with_draft_costs(
    db: &Database,
    league_key: &str,
    team_key: &str,
    week: u32,
) -> Result<Vec<RosterCostRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "WITH team_picks AS (
                 SELECT dp.player_key,
                        ROW_NUMBER() OVER (PARTITION BY dp.team_key ORDER BY dp.pick)
                            AS team_pick_idx
                 FROM draft_pick dp
                 WHERE dp.league_key = ?1
             ),
             dropped_players AS (
                 SELECT DISTINCT tp.player_key
                 FROM transaction_player tp
                 JOIN transaction_record tr ON tp.transaction_key = tr.transaction_key
                 WHERE tr.league_key = ?1 AND tp.type = 'drop'
             )
             SELECT wr.player_key, p.full_name, p.primary_position,
                    wr.selected_position, wr.is_starter,
                    CASE
                        WHEN tp_cost.player_key IS NULL THEN 24
                        WHEN dropped.player_key IS NOT NULL THEN 24
                        ELSE tp_cost.team_pick_idx
                    END AS draft_cost
             FROM weekly_roster wr
             LEFT JOIN player p ON wr.player_key = p.player_key
             LEFT JOIN team_picks tp_cost ON tp_cost.player_key = wr.player_key
             LEFT JOIN dropped_players dropped ON dropped.player_key = wr.player_key
             WHERE wr.league_key = ?1 AND wr.team_key = ?2 AND wr.week = ?3
             ORDER BY wr.is_starter DESC, wr.selected_position",
        )
        .context("failed to prepare get_roster_with_draft_costs")?;
    let rows = stmt
        .query_map(params![league_key, team_key, week], |row| {
            Ok(RosterCostRow {
                player_key: row.get(0)?,
                full_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                primary_position: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                selected_position: row.get(3)?,
                is_starter: row.get(4)?,
                draft_cost: row.get(5)?,
            })
        })
        .context("failed to query roster draft costs")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map roster cost rows")?;
    Ok(rows)
}
