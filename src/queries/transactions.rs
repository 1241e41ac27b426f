// Transaction queries.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::Database;

#[derive(Debug, Clone)]
pub struct AddRow {
    pub player_key: String,
    pub add_week: Option<u32>,
    pub destination_team_key: Option<String>,
    pub full_name: String,
    pub team_name: Option<String>,
    pub manager_name: Option<String>,
}

/// All free-agent/waiver add transactions for a league.
pub fn get_add_transactions(db: &Database, league_key: &str) -> Result<Vec<AddRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT tp.player_key, tr.week, tp.destination_team_key,
                    p.full_name, t.name, t.manager_name
             FROM transaction_player tp
             JOIN transaction_record tr ON tp.transaction_key = tr.transaction_key
             JOIN player p ON tp.player_key = p.player_key
             LEFT JOIN team t ON tr.league_key = t.league_key
                 AND tp.destination_team_key = t.team_key
             WHERE tr.league_key = ?1 AND tp.type = 'add'
                 AND tp.source_type IN ('freeagents', 'waivers')",
        )
        .context("failed to prepare get_add_transactions")?;
    let rows = stmt
        .query_map(params![league_key], |row| {
            Ok(AddRow {
                player_key: row.get(0)?,
                add_week: row.get(1)?,
                destination_team_key: row.get(2)?,
                full_name: row.get(3)?,
                team_name: row.get(4)?,
                manager_name: row.get(5)?,
            })
        })
        .context("failed to query add transactions")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map add rows")?;
    Ok(rows)
}

/// Names of a team's most recent player adds.
pub fn get_recent_adds(
    db: &Database,
    league_key: &str,
    team_key: &str,
    limit: u32,
) -> Result<Vec<String>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT p.full_name FROM transaction_player tp
             JOIN transaction_record tr ON tp.transaction_key = tr.transaction_key
             JOIN player p ON tp.player_key = p.player_key
             WHERE tr.league_key = ?1 AND tp.destination_team_key = ?2
                 AND tp.type = 'add'
             ORDER BY tr.timestamp DESC LIMIT ?3",
        )
        .context("failed to prepare get_recent_adds")?;
    let rows = stmt
        .query_map(params![league_key, team_key, limit], |row| row.get(0))
        .context("failed to query recent adds")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map add names")?;
    Ok(rows)
}

/// Names of a team's most recent player drops.
pub fn get_recent_drops(
    db: &Database,
    league_key: &str,
    team_key: &str,
    limit: u32,
) -> Result<Vec<String>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT p.full_name FROM transaction_player tp
             JOIN transaction_record tr ON tp.transaction_key = tr.transaction_key
             JOIN player p ON tp.player_key = p.player_key
             WHERE tr.league_key = ?1 AND tp.source_team_key = ?2
                 AND tp.type = 'drop'
             ORDER BY tr.timestamp DESC LIMIT ?3",
        )
        .context("failed to prepare get_recent_drops")?;
    let rows = stmt
        .query_map(params![league_key, team_key, limit], |row| row.get(0))
        .context("failed to query recent drops")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map drop names")?;
    Ok(rows)
}

#[derive(Debug, Clone)]
pub struct WeekTransactionRow {
    pub txn_type: String,
    pub timestamp: i64,
    pub faab_bid: Option<u32>,
    pub player_key: String,
    pub player_type: String,
    pub destination_team_key: Option<String>,
    pub source_team_key: Option<String>,
    pub full_name: String,
    pub dest_team_name: Option<String>,
    pub dest_manager: Option<String>,
    pub src_team_name: Option<String>,
}

/// All transactions within an epoch-second range (for the weekly recap).
pub fn get_transactions_in_range(
    db: &Database,
    league_key: &str,
    from_ts: i64,
    to_ts: i64,
) -> Result<Vec<WeekTransactionRow>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT tr.type, tr.timestamp, tr.faab_bid,
                    tp.player_key, tp.type,
                    tp.destination_team_key, tp.source_team_key,
                    p.full_name,
                    dt.name, dt.manager_name,
                    st.name
             FROM transaction_record tr
             JOIN transaction_player tp ON tr.transaction_key = tp.transaction_key
             JOIN player p ON tp.player_key = p.player_key
             LEFT JOIN team dt ON tr.league_key = dt.league_key
                 AND tp.destination_team_key = dt.team_key
             LEFT JOIN team st ON tr.league_key = st.league_key
                 AND tp.source_team_key = st.team_key
             WHERE tr.league_key = ?1 AND tr.timestamp >= ?2 AND tr.timestamp <= ?3
             ORDER BY tr.timestamp",
        )
        .context("failed to prepare get_transactions_in_range")?;
    let rows = stmt
        .query_map(params![league_key, from_ts, to_ts], |row| {
            Ok(WeekTransactionRow {
                txn_type: row.get(0)?,
                timestamp: row.get(1)?,
                faab_bid: row.get(2)?,
                player_key: row.get(3)?,
                player_type: row.get(4)?,
                destination_team_key: row.get(5)?,
                source_team_key: row.get(6)?,
                full_name: row.get(7)?,
                dest_team_name: row.get(8)?,
                dest_manager: row.get(9)?,
                src_team_name: row.get(10)?,
            })
        })
        .context("failed to query week transactions")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map transaction rows")?;
    Ok(rows)
}

/// Transactions still missing a computed week, with their raw timestamps.
pub fn get_transactions_needing_week(
    db: &Database,
    league_key: &str,
) -> Result<Vec<(String, i64)>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT transaction_key, timestamp FROM transaction_record
             WHERE league_key = ?1 AND week IS NULL",
        )
        .context("failed to prepare get_transactions_needing_week")?;
    let rows = stmt
        .query_map(params![league_key], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to query unassigned transactions")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map unassigned rows")?;
    Ok(rows)
}

/// Assign a computed week to a transaction.
pub fn set_transaction_week(db: &Database, transaction_key: &str, week: u32) -> Result<()> {
    db.execute(
        "UPDATE transaction_record SET week = ?1 WHERE transaction_key = ?2",
        params![week, transaction_key],
    )?;
    Ok(())
}

/// Every player key that was dropped at any point during a league's season,
/// regardless of which team dropped them.
pub fn get_dropped_player_keys(db: &Database, league_key: &str) -> Result<HashSet<String>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT tp.player_key
             FROM transaction_player tp
             JOIN transaction_record tr ON tp.transaction_key = tr.transaction_key
             WHERE tr.league_key = ?1 AND tp.type = 'drop'",
        )
        .context("failed to prepare get_dropped_player_keys")?;
    let rows = stmt
        .query_map(params![league_key], |row| row.get::<_, String>(0))
        .context("failed to query dropped players")?
        .collect::<std::result::Result<HashSet<_>, _>>()
        .context("failed to map dropped player keys")?;
    Ok(rows)
}
