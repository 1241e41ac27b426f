// Sync pipeline: platform API -> SQLite, one idempotent unit at a time.
//
// Unit order within a season: metadata -> draft -> transactions ->
// weekly[1..N] -> transaction week backfill -> league week repair ->
// standings refresh. Keeper sync is a separate top-level pass over all
// seasons (see `keepers`).
//
// Every unit checks sync_log first and skips if already completed, writes a
// "running" row, performs its writes inside a single scoped transaction, and
// marks itself completed (with record count) inside that same transaction. A
// failure marks the row "failed" with the error message and re-raises, so a
// later run retries the unit.

pub mod keepers;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rusqlite::params;
use tracing::{info, warn};

use crate::config::Franchise;
use crate::db::Database;
use crate::provider::types::{MatchupEntry, RosterEntry};
use crate::provider::{build_team_key, FantasyProvider};
use crate::queries::leagues::{self, ScoringCategory};
use crate::queries::matchups;
use crate::queries::transactions as txn_queries;

const UNIT_METADATA: &str = "metadata";
const UNIT_DRAFT: &str = "draft";
const UNIT_TRANSACTIONS: &str = "transactions";
const UNIT_WEEKLY: &str = "weekly";
pub(crate) const UNIT_KEEPERS: &str = "keepers";

/// Default delay between platform API calls (rate-limit compliance).
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(500);

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Sync log primitives (shared with the keeper pass)
// ---------------------------------------------------------------------------

pub(crate) fn unit_is_synced(
    db: &Database,
    league_key: &str,
    sync_type: &str,
    week: u32,
) -> Result<bool> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare(
            "SELECT status FROM sync_log
             WHERE league_key = ?1 AND sync_type = ?2 AND week = ?3",
        )
        .context("failed to prepare sync_log lookup")?;
    let status: Option<String> = stmt
        .query_map(params![league_key, sync_type, week], |row| row.get(0))
        .context("failed to query sync_log")?
        .next()
        .transpose()
        .context("failed to read sync_log row")?;
    Ok(status.as_deref() == Some("completed"))
}

pub(crate) fn unit_log_start(
    db: &Database,
    league_key: &str,
    sync_type: &str,
    week: u32,
) -> Result<()> {
    db.execute(
        "INSERT OR REPLACE INTO sync_log
             (league_key, sync_type, week, started_at, status,
              records_written, error_message)
         VALUES (?1, ?2, ?3, ?4, 'running', 0, NULL)",
        params![league_key, sync_type, week, now_iso()],
    )?;
    Ok(())
}

pub(crate) fn unit_log_complete(
    db: &Database,
    league_key: &str,
    sync_type: &str,
    week: u32,
    records: u32,
) -> Result<()> {
    db.execute(
        "UPDATE sync_log
         SET completed_at = ?1, status = 'completed', records_written = ?2
         WHERE league_key = ?3 AND sync_type = ?4 AND week = ?5",
        params![now_iso(), records, league_key, sync_type, week],
    )?;
    Ok(())
}

pub(crate) fn unit_log_fail(
    db: &Database,
    league_key: &str,
    sync_type: &str,
    week: u32,
    error: &str,
) -> Result<()> {
    db.execute(
        "UPDATE sync_log
         SET completed_at = ?1, status = 'failed', error_message = ?2
         WHERE league_key = ?3 AND sync_type = ?4 AND week = ?5",
        params![now_iso(), error, league_key, sync_type, week],
    )?;
    Ok(())
}

/// Syncs one franchise's platform data into its database.
pub struct SyncPipeline<'a> {
    db: &'a Database,
    provider: &'a dyn FantasyProvider,
    franchise: &'a Franchise,
    delay: Duration,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(
        db: &'a Database,
        provider: &'a dyn FantasyProvider,
        franchise: &'a Franchise,
    ) -> Self {
        Self {
            db,
            provider,
            franchise,
            delay: DEFAULT_CALL_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn wait(&self) {
        tokio::time::sleep(self.delay).await;
    }

    // ------------------------------------------------------------------
    // Sync log
    // ------------------------------------------------------------------

    fn is_synced(&self, league_key: &str, sync_type: &str, week: u32) -> Result<bool> {
        unit_is_synced(self.db, league_key, sync_type, week)
    }

    fn log_start(&self, league_key: &str, sync_type: &str, week: u32) -> Result<()> {
        unit_log_start(self.db, league_key, sync_type, week)
    }

    fn log_complete(
        &self,
        league_key: &str,
        sync_type: &str,
        week: u32,
        records: u32,
    ) -> Result<()> {
        unit_log_complete(self.db, league_key, sync_type, week, records)
    }

    fn log_fail(
        &self,
        league_key: &str,
        sync_type: &str,
        week: u32,
        error: &str,
    ) -> Result<()> {
        unit_log_fail(self.db, league_key, sync_type, week, error)
    }

    // ------------------------------------------------------------------
    // Metadata sync
    // ------------------------------------------------------------------

    /// Sync league info, settings, stat categories, and teams.
    pub async fn sync_metadata(&self, league_key: &str) -> Result<()> {
        if self.is_synced(league_key, UNIT_METADATA, 0)? {
            info!("[skip] metadata already synced for {league_key}");
            return Ok(());
        }
        self.log_start(league_key, UNIT_METADATA, 0)?;
        match self.sync_metadata_inner(league_key).await {
            Ok(records) => {
                info!("[done] metadata: {records} records");
                Ok(())
            }
            Err(e) => {
                self.log_fail(league_key, UNIT_METADATA, 0, &format!("{e:#}"))?;
                Err(e).with_context(|| format!("metadata sync failed for {league_key}"))
            }
        }
    }

    async fn sync_metadata_inner(&self, league_key: &str) -> Result<u32> {
        let league = self.provider.league_info(league_key).await?;
        let settings = self.provider.league_settings(league_key).await?;
        self.wait().await;

        let teams = self.provider.teams(league_key).await?;
        self.wait().await;
        let standings = self.provider.standings(league_key).await?;
        self.wait().await;

        let standings_map: HashMap<&str, _> = standings
            .iter()
            .map(|s| (s.team_key.as_str(), s))
            .collect();

        let num_scoring = settings
            .stat_categories
            .iter()
            .filter(|c| c.is_scoring())
            .count() as u32;

        self.db.scoped_tx(|| {
            self.db.execute(
                "INSERT OR REPLACE INTO league
                     (league_key, season, name, num_teams, scoring_type,
                      num_scoring_cats, current_week, start_week, end_week,
                      playoff_start_week, uses_faab, is_finished, last_synced)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
                params![
                    league_key,
                    league.season,
                    league.name,
                    league.num_teams,
                    league.scoring_type,
                    num_scoring,
                    league.current_week,
                    league.start_week,
                    league.end_week,
                    settings.playoff_start_week,
                    settings.uses_faab,
                    league.is_finished,
                    now_iso(),
                ],
            )?;

            let mut records = 0u32;
            for cat in &settings.stat_categories {
                self.db.execute(
                    "INSERT OR REPLACE INTO stat_category
                         (league_key, stat_id, name, display_name, abbr, sort_order,
                          position_type, is_only_display_stat, is_scoring_stat)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                    params![
                        league_key,
                        cat.stat_id,
                        cat.name,
                        cat.display_name,
                        cat.display_name,
                        cat.sort_order,
                        cat.position_type,
                        cat.is_only_display_stat,
                        cat.is_scoring(),
                    ],
                )?;
                records += 1;
            }

            for team in &teams {
                let st = standings_map.get(team.team_key.as_str());
                let guid = team.manager_guid.as_deref().unwrap_or("");
                let nickname = team.manager_nickname.as_deref().unwrap_or("");
                let resolved = self.franchise.manager_name(guid).unwrap_or("");

                self.db.execute(
                    "INSERT OR REPLACE INTO team
                         (league_key, team_key, team_id, name, manager_guid,
                          manager_nickname, manager_name, waiver_priority,
                          faab_balance, finish, playoff_seed)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                    params![
                        league_key,
                        team.team_key,
                        team.team_id,
                        team.name,
                        guid,
                        nickname,
                        resolved,
                        st.and_then(|s| s.waiver_priority),
                        st.and_then(|s| s.faab_balance),
                        st.and_then(|s| s.rank),
                        st.and_then(|s| s.playoff_seed),
                    ],
                )?;
                records += 1;
            }

            self.log_complete(league_key, UNIT_METADATA, 0, records)?;
            Ok(records)
        })
    }

    // ------------------------------------------------------------------
    // Draft sync
    // ------------------------------------------------------------------

    /// Sync draft results.
    pub async fn sync_draft(&self, league_key: &str) -> Result<()> {
        if self.is_synced(league_key, UNIT_DRAFT, 0)? {
            info!("[skip] draft already synced for {league_key}");
            return Ok(());
        }
        self.log_start(league_key, UNIT_DRAFT, 0)?;
        match self.sync_draft_inner(league_key).await {
            Ok(records) => {
                info!("[done] draft: {records} picks");
                Ok(())
            }
            Err(e) => {
                self.log_fail(league_key, UNIT_DRAFT, 0, &format!("{e:#}"))?;
                Err(e).with_context(|| format!("draft sync failed for {league_key}"))
            }
        }
    }

    async fn sync_draft_inner(&self, league_key: &str) -> Result<u32> {
        let picks = self.provider.draft_results(league_key).await?;
        self.wait().await;

        self.db.scoped_tx(|| {
            let mut records = 0u32;
            for pick in &picks {
                self.db.execute(
                    "INSERT OR REPLACE INTO draft_pick
                         (league_key, pick, round, team_key, player_key, cost)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    params![
                        league_key,
                        pick.pick,
                        pick.round,
                        pick.team_key,
                        pick.player_key,
                        pick.cost,
                    ],
                )?;
                records += 1;
            }
            self.log_complete(league_key, UNIT_DRAFT, 0, records)?;
            Ok(records)
        })
    }

    // ------------------------------------------------------------------
    // Transactions sync
    // ------------------------------------------------------------------

    /// Sync the full transaction log. Weeks are left unassigned here; the
    /// backfill pass computes them from matchup date ranges.
    pub async fn sync_transactions(&self, league_key: &str) -> Result<()> {
        if self.is_synced(league_key, UNIT_TRANSACTIONS, 0)? {
            info!("[skip] transactions already synced for {league_key}");
            return Ok(());
        }
        self.log_start(league_key, UNIT_TRANSACTIONS, 0)?;
        match self.sync_transactions_inner(league_key).await {
            Ok(records) => {
                info!("[done] transactions: {records} records");
                Ok(())
            }
            Err(e) => {
                self.log_fail(league_key, UNIT_TRANSACTIONS, 0, &format!("{e:#}"))?;
                Err(e).with_context(|| format!("transaction sync failed for {league_key}"))
            }
        }
    }

    async fn sync_transactions_inner(&self, league_key: &str) -> Result<u32> {
        let txns = self.provider.transactions(league_key).await?;
        self.wait().await;

        self.db.scoped_tx(|| {
            let mut records = 0u32;
            for txn in &txns {
                self.db.execute(
                    "INSERT OR REPLACE INTO transaction_record
                         (transaction_key, league_key, type, status, timestamp,
                          week, trader_team_key, tradee_team_key, faab_bid)
                     VALUES (?1,?2,?3,?4,?5,NULL,?6,?7,?8)",
                    params![
                        txn.transaction_key,
                        league_key,
                        txn.txn_type,
                        txn.status,
                        txn.timestamp,
                        txn.trader_team_key,
                        txn.tradee_team_key,
                        txn.faab_bid,
                    ],
                )?;

                for player in &txn.players {
                    self.db.execute(
                        "INSERT OR REPLACE INTO transaction_player
                             (transaction_key, player_key, source_type, source_team_key,
                              destination_type, destination_team_key, type)
                         VALUES (?1,?2,?3,?4,?5,?6,?7)",
                        params![
                            txn.transaction_key,
                            player.player_key,
                            player.source_type,
                            player.source_team_key,
                            player.destination_type,
                            player.destination_team_key,
                            player.move_type,
                        ],
                    )?;
                }
                records += 1;
            }
            self.log_complete(league_key, UNIT_TRANSACTIONS, 0, records)?;
            Ok(records)
        })
    }

    // ------------------------------------------------------------------
    // Weekly data sync
    // ------------------------------------------------------------------

    /// Sync one week: matchups, team stats, derived per-category results,
    /// rosters, and player stats.
    ///
    /// Per-team fetch failures are warned and skipped; the week still
    /// completes with whatever was fetched. The unit's writes are atomic.
    pub async fn sync_week(
        &self,
        league_key: &str,
        week: u32,
        num_teams: u32,
        scoring: &[ScoringCategory],
    ) -> Result<()> {
        if self.is_synced(league_key, UNIT_WEEKLY, week)? {
            info!("[skip] week {week} already synced for {league_key}");
            return Ok(());
        }
        self.log_start(league_key, UNIT_WEEKLY, week)?;
        match self
            .sync_week_inner(league_key, week, num_teams, scoring)
            .await
        {
            Ok(records) => {
                info!("[done] week {week}: {records} records");
                Ok(())
            }
            Err(e) => {
                self.log_fail(league_key, UNIT_WEEKLY, week, &format!("{e:#}"))?;
                Err(e).with_context(|| {
                    format!("weekly sync failed for {league_key} week {week}")
                })
            }
        }
    }

    async fn sync_week_inner(
        &self,
        league_key: &str,
        week: u32,
        num_teams: u32,
        scoring: &[ScoringCategory],
    ) -> Result<u32> {
        let scoreboard = self.provider.scoreboard(league_key, week).await?;
        self.wait().await;

        // Team aggregate stats, best-effort per team.
        let mut team_stats: HashMap<String, HashMap<u32, String>> = HashMap::new();
        for team_id in 1..=num_teams {
            let team_key = build_team_key(league_key, team_id);
            match self.provider.team_week_stats(&team_key, week).await {
                Ok(stats) => {
                    let by_id = stats
                        .iter()
                        .filter_map(|s| Some((s.stat_id, s.value.clone()?)))
                        .collect();
                    team_stats.insert(team_key, by_id);
                }
                Err(e) => {
                    warn!("failed to get stats for {team_key} week {week}: {e:#}");
                }
            }
            self.wait().await;
        }

        // Rosters with player stat lines, best-effort per team.
        let mut rosters: Vec<(String, Vec<RosterEntry>)> = Vec::new();
        for team_id in 1..=num_teams {
            match self
                .provider
                .roster_with_stats(league_key, team_id, week)
                .await
            {
                Ok(roster) => {
                    rosters.push((build_team_key(league_key, team_id), roster));
                }
                Err(e) => {
                    warn!("failed roster for team {team_id} week {week}: {e:#}");
                }
            }
            self.wait().await;
        }

        self.db.scoped_tx(|| {
            let mut records = 0u32;

            for (idx, matchup) in scoreboard.iter().enumerate() {
                records += self.write_matchup(league_key, week, idx as u32, matchup, scoring)?;
            }

            for (team_key, stats) in &team_stats {
                for (stat_id, value) in stats {
                    self.db.execute(
                        "INSERT OR REPLACE INTO team_weekly_score
                             (league_key, week, team_key, stat_id, value)
                         VALUES (?1,?2,?3,?4,?5)",
                        params![league_key, week, team_key, stat_id, value],
                    )?;
                    records += 1;
                }
            }

            for (idx, matchup) in scoreboard.iter().enumerate() {
                records += self.write_matchup_categories(
                    league_key,
                    week,
                    idx as u32,
                    matchup,
                    scoring,
                    &team_stats,
                )?;
            }

            for (team_key, roster) in &rosters {
                for entry in roster {
                    self.write_roster_entry(league_key, week, team_key, entry)?;
                    records += 1;
                }
            }

            self.log_complete(league_key, UNIT_WEEKLY, week, records)?;
            Ok(records)
        })
    }

    fn write_matchup(
        &self,
        league_key: &str,
        week: u32,
        matchup_id: u32,
        matchup: &MatchupEntry,
        scoring: &[ScoringCategory],
    ) -> Result<u32> {
        let cats_won_1 = matchup.points_1 as i64;
        let cats_won_2 = matchup.points_2 as i64;
        // Floored at zero to guard against source miscounts.
        let cats_tied = (scoring.len() as i64 - cats_won_1 - cats_won_2).max(0);

        self.db.execute(
            "INSERT OR REPLACE INTO matchup
                 (league_key, week, matchup_id, team_key_1, team_key_2,
                  cats_won_1, cats_won_2, cats_tied, winner_team_key, is_tied,
                  is_playoffs, is_consolation, week_start, week_end)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                league_key,
                week,
                matchup_id,
                matchup.team_key_1,
                matchup.team_key_2,
                cats_won_1,
                cats_won_2,
                cats_tied,
                matchup.winner_team_key,
                matchup.is_tied,
                matchup.is_playoffs,
                matchup.is_consolation,
                matchup.week_start,
                matchup.week_end,
            ],
        )?;
        Ok(1)
    }

    /// Derive per-category winners by comparing each side's aggregate value
    /// under the category's sort order. An exact tie (or a missing or
    /// unparsable value on either side) leaves the winner NULL.
    fn write_matchup_categories(
        &self,
        league_key: &str,
        week: u32,
        matchup_id: u32,
        matchup: &MatchupEntry,
        scoring: &[ScoringCategory],
        team_stats: &HashMap<String, HashMap<u32, String>>,
    ) -> Result<u32> {
        let empty = HashMap::new();
        let t1_stats = team_stats.get(&matchup.team_key_1).unwrap_or(&empty);
        let t2_stats = team_stats.get(&matchup.team_key_2).unwrap_or(&empty);

        let mut records = 0u32;
        for cat in scoring {
            let v1 = t1_stats.get(&cat.stat_id);
            let v2 = t2_stats.get(&cat.stat_id);

            let winner = match (
                v1.and_then(|v| v.parse::<f64>().ok()),
                v2.and_then(|v| v.parse::<f64>().ok()),
            ) {
                (Some(f1), Some(f2)) => {
                    let first_wins = if cat.higher_is_better() {
                        f1 > f2
                    } else {
                        f1 < f2
                    };
                    if f1 == f2 {
                        None
                    } else if first_wins {
                        Some(matchup.team_key_1.as_str())
                    } else {
                        Some(matchup.team_key_2.as_str())
                    }
                }
                _ => None,
            };

            self.db.execute(
                "INSERT OR REPLACE INTO matchup_category
                     (league_key, week, matchup_id, stat_id, team_1_value,
                      team_2_value, winner_team_key)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![league_key, week, matchup_id, cat.stat_id, v1, v2, winner],
            )?;
            records += 1;
        }
        Ok(records)
    }

    fn write_roster_entry(
        &self,
        league_key: &str,
        week: u32,
        team_key: &str,
        entry: &RosterEntry,
    ) -> Result<()> {
        let player = &entry.player;
        self.db.execute(
            "INSERT OR IGNORE INTO player
                 (player_key, player_id, full_name, first_name, last_name,
                  editorial_team_abbr, primary_position, eligible_positions,
                  headshot_url)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                player.player_key,
                player.player_id.as_deref().unwrap_or(""),
                player.full_name,
                player.first_name,
                player.last_name,
                player.editorial_team_abbr,
                player.display_position,
                player.eligible_positions.join(","),
                player.headshot_url,
            ],
        )?;

        let is_starter = match entry.selected_position.as_deref() {
            Some(pos) => !self.franchise.sport.is_bench_position(pos),
            None => false,
        };

        self.db.execute(
            "INSERT OR REPLACE INTO weekly_roster
                 (league_key, week, team_key, player_key, selected_position,
                  is_starter, is_keeper)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                league_key,
                week,
                team_key,
                player.player_key,
                entry.selected_position,
                is_starter,
                entry.keeper.is_kept(),
            ],
        )?;

        for stat in &entry.stats {
            self.db.execute(
                "INSERT OR REPLACE INTO player_weekly_stat
                     (league_key, week, player_key, stat_id, value)
                 VALUES (?1,?2,?3,?4,?5)",
                params![league_key, week, player.player_key, stat.stat_id, stat.value],
            )?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Correction passes
    // ------------------------------------------------------------------

    /// Assign a week to every transaction that lacks one by locating the
    /// first week whose end date falls on or after the transaction's date.
    /// Transactions past the final week default to the last known week.
    pub fn backfill_transaction_weeks(&self, league_key: &str) -> Result<u32> {
        let week_ends = matchups::get_week_end_dates(self.db, league_key)?;
        let Some(&(last_week, _)) = week_ends.last() else {
            return Ok(0);
        };

        let pending = txn_queries::get_transactions_needing_week(self.db, league_key)?;
        let mut assigned = 0u32;
        self.db.scoped_tx(|| {
            for (txn_key, timestamp) in &pending {
                let date = Utc
                    .timestamp_opt(*timestamp, 0)
                    .single()
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                // ISO dates compare correctly as strings.
                let week = week_ends
                    .iter()
                    .find(|(_, end)| end.as_str() >= date.as_str())
                    .map(|(w, _)| *w)
                    .unwrap_or(last_week);
                txn_queries::set_transaction_week(self.db, txn_key, week)?;
                assigned += 1;
            }
            Ok(())
        })?;

        if assigned > 0 {
            info!("[done] assigned weeks to {assigned} transactions");
        }
        Ok(assigned)
    }

    /// Recompute the league's true week bounds from synced matchups.
    ///
    /// The source's self-reported week metadata is unreliable for historical
    /// seasons (swapped start/end, current_week tracking the live season).
    /// This is a correction pass, not a validation: it overwrites whenever
    /// the derived values differ.
    pub fn repair_league_weeks(&self, league_key: &str) -> Result<bool> {
        let Some((min_week, max_week)) =
            matchups::get_observed_week_bounds(self.db, league_key)?
        else {
            return Ok(false);
        };
        let min_playoff = matchups::get_min_playoff_week(self.db, league_key)?;

        let Some(league) = leagues::get_league(self.db, league_key)? else {
            return Ok(false);
        };

        let new_current = if league.is_finished {
            league.current_week.min(max_week)
        } else {
            league.current_week
        };
        let new_playoff = min_playoff.or(league.playoff_start_week);

        let changed = league.start_week != min_week
            || league.end_week != max_week
            || league.current_week != new_current
            || league.playoff_start_week != new_playoff;

        if changed {
            self.db.execute(
                "UPDATE league
                 SET start_week = ?1, end_week = ?2, current_week = ?3,
                     playoff_start_week = ?4
                 WHERE league_key = ?5",
                params![min_week, max_week, new_current, new_playoff, league_key],
            )?;
            info!(
                "[done] repaired week bounds for {league_key}: {}..{} (playoffs {:?})",
                min_week, max_week, new_playoff
            );
        }
        Ok(changed)
    }

    /// Re-fetch standings and update each team's final rank and playoff
    /// seed (plus waiver/FAAB state) without touching any other column.
    pub async fn refresh_standings(&self, league_key: &str) -> Result<()> {
        let standings = self.provider.standings(league_key).await?;
        self.wait().await;

        self.db.scoped_tx(|| {
            for entry in &standings {
                self.db.execute(
                    "UPDATE team
                     SET finish = ?1, playoff_seed = ?2, waiver_priority = ?3,
                         faab_balance = ?4
                     WHERE league_key = ?5 AND team_key = ?6",
                    params![
                        entry.rank,
                        entry.playoff_seed,
                        entry.waiver_priority,
                        entry.faab_balance,
                        league_key,
                        entry.team_key,
                    ],
                )?;
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Season orchestration
    // ------------------------------------------------------------------

    /// Full sync for one season: metadata, draft, transactions, all weeks,
    /// then the correction passes.
    pub async fn sync_season(&self, season: i32) -> Result<()> {
        let league_key = self
            .franchise
            .league_key_for_season(season)
            .with_context(|| {
                format!(
                    "no league key for season {season}; available: {:?}",
                    self.franchise.season_years()
                )
            })?
            .to_string();

        info!(
            "syncing {} season {season} ({league_key})",
            self.franchise.slug
        );

        self.sync_metadata(&league_key).await?;
        self.sync_draft(&league_key).await?;
        self.sync_transactions(&league_key).await?;

        let league = leagues::get_league(self.db, &league_key)?
            .context("league metadata missing after metadata sync")?;

        // Finished seasons sync every reported week; in-progress seasons only
        // the completed ones.
        let last_week = if league.is_finished {
            league.end_week
        } else {
            league.current_week.saturating_sub(1)
        };

        let scoring = leagues::get_scoring_categories(self.db, &league_key)?;
        for week in 1..=last_week {
            self.sync_week(&league_key, week, league.num_teams, &scoring)
                .await?;
        }

        self.backfill_transaction_weeks(&league_key)?;
        self.repair_league_weeks(&league_key)?;
        self.refresh_standings(&league_key).await?;

        info!("season {season} sync complete");
        Ok(())
    }

    /// Sync all configured seasons for this franchise, oldest first.
    pub async fn sync_all(&self) -> Result<()> {
        for season in self.franchise.season_years() {
            self.sync_season(season).await?;
        }
        Ok(())
    }

    /// Incremental sync: catch up unsynced weeks of the latest season and
    /// refresh the transaction log.
    pub async fn sync_incremental(&self) -> Result<()> {
        let season = self
            .franchise
            .latest_season()
            .context("franchise has no configured seasons")?;
        let league_key = self
            .franchise
            .latest_league_key()
            .context("franchise has no configured seasons")?
            .to_string();

        info!(
            "incremental sync for {} season {season}",
            self.franchise.slug
        );

        self.sync_metadata(&league_key).await?;

        let league = leagues::get_league(self.db, &league_key)?
            .context("league metadata missing after metadata sync")?;
        let last_week = if league.is_finished {
            league.end_week
        } else {
            league.current_week
        };

        let scoring = leagues::get_scoring_categories(self.db, &league_key)?;
        for week in 1..=last_week {
            self.sync_week(&league_key, week, league.num_teams, &scoring)
                .await?;
        }

        // The transaction log grows continuously; always re-pull it.
        self.db.execute(
            "DELETE FROM sync_log WHERE league_key = ?1 AND sync_type = ?2",
            params![league_key, UNIT_TRANSACTIONS],
        )?;
        self.sync_transactions(&league_key).await?;

        self.backfill_transaction_weeks(&league_key)?;
        self.repair_league_weeks(&league_key)?;
        self.refresh_standings(&league_key).await?;

        info!("incremental sync complete");
        Ok(())
    }
}
