// Cross-season manager history, lineage rollups, and all-time records.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;

use crate::config::Franchise;
use crate::db::Database;
use crate::queries::history::{self, ManagerMatchupRow, ManagerTeamRow};
use crate::queries::keepers as keeper_queries;
use crate::queries::leagues;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct H2HRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonRecord {
    pub season: i32,
    pub team_name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub cat_wins: u32,
    pub cat_losses: u32,
    pub cat_ties: u32,
    pub finish: Option<u32>,
    /// Whether the season itself is over; a rank of 1 only counts as a
    /// championship once it is.
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerRecord {
    pub guid: String,
    pub name: String,
    pub is_current: bool,
    pub seasons: Vec<i32>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub playoff_wins: u32,
    pub playoff_losses: u32,
    pub cat_wins: u32,
    pub cat_losses: u32,
    pub cat_ties: u32,
    pub championships: u32,
    pub best_finish: Option<u32>,
    pub worst_finish: Option<u32>,
    pub season_records: Vec<SeasonRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineageStats {
    pub id: String,
    pub name: String,
    pub current_manager: String,
    pub seasons: Vec<i32>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub cat_wins: u32,
    pub cat_losses: u32,
    pub cat_ties: u32,
    pub championships: u32,
    pub best_finish: Option<u32>,
    pub worst_finish: Option<u32>,
    pub season_records: Vec<SeasonRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeeperEntry {
    pub name: String,
    pub position: Option<String>,
    pub round_cost: u32,
    pub kept_from_season: Option<i32>,
    /// Consecutive seasons kept, counting this one.
    pub tenure: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonKeepers {
    pub season: i32,
    pub keepers: Vec<KeeperEntry>,
}

// ---------------------------------------------------------------------------
// ManagerHistory
// ---------------------------------------------------------------------------

/// Cross-season manager stats and head-to-head records for a franchise.
pub struct ManagerHistory<'a> {
    db: &'a Database,
    franchise: &'a Franchise,
}

impl<'a> ManagerHistory<'a> {
    pub fn new(db: &'a Database, franchise: &'a Franchise) -> Self {
        Self { db, franchise }
    }

    fn manager_teams_by_guid(&self) -> Result<BTreeMap<String, Vec<ManagerTeamRow>>> {
        let rows = history::get_all_manager_teams(self.db)?;
        let mut by_guid: BTreeMap<String, Vec<ManagerTeamRow>> = BTreeMap::new();
        for row in rows {
            by_guid.entry(row.manager_guid.clone()).or_default().push(row);
        }
        Ok(by_guid)
    }

    /// All managers with cross-season aggregate stats, sorted by regular
    /// season record (wins descending, losses ascending).
    ///
    /// Best/worst finish and championships come from each team-season's
    /// stored finish (rank 1 in a finished season is a championship); they
    /// are not re-derived from matchup folding.
    pub fn managers(&self) -> Result<Vec<ManagerRecord>> {
        let manager_teams = self.manager_teams_by_guid()?;
        let matchups = history::get_all_matchups_with_manager_guids(self.db)?;
        let current = self.franchise.current_manager_guids();

        let mut records: BTreeMap<String, ManagerRecord> = BTreeMap::new();
        let mut season_records: HashMap<(String, i32), SeasonRecord> = HashMap::new();

        for (guid, teams) in &manager_teams {
            let name = self
                .franchise
                .manager_name(guid)
                .map(str::to_string)
                .or_else(|| teams[0].manager_name.clone().filter(|n| !n.is_empty()))
                .unwrap_or_else(|| guid.clone());

            let mut seasons: Vec<i32> = teams.iter().map(|t| t.season).collect();
            seasons.sort_unstable();
            seasons.dedup();

            let mut record = ManagerRecord {
                guid: guid.clone(),
                name,
                is_current: current.contains(guid.as_str()),
                seasons,
                wins: 0,
                losses: 0,
                ties: 0,
                playoff_wins: 0,
                playoff_losses: 0,
                cat_wins: 0,
                cat_losses: 0,
                cat_ties: 0,
                championships: 0,
                best_finish: None,
                worst_finish: None,
                season_records: vec![],
            };

            for team in teams {
                season_records.insert(
                    (guid.clone(), team.season),
                    SeasonRecord {
                        season: team.season,
                        team_name: team.team_name.clone(),
                        wins: 0,
                        losses: 0,
                        ties: 0,
                        cat_wins: 0,
                        cat_losses: 0,
                        cat_ties: 0,
                        finish: team.finish,
                        finished: team.is_finished,
                    },
                );

                if let Some(finish) = team.finish {
                    record.best_finish =
                        Some(record.best_finish.map_or(finish, |b| b.min(finish)));
                    record.worst_finish =
                        Some(record.worst_finish.map_or(finish, |w| w.max(finish)));
                    if finish == 1 && team.is_finished {
                        record.championships += 1;
                    }
                }
            }

            records.insert(guid.clone(), record);
        }

        for m in &matchups {
            if !records.contains_key(&m.guid_1) || !records.contains_key(&m.guid_2) {
                continue;
            }
            self.fold_matchup(m, &mut records, &mut season_records);
        }

        for (guid, record) in records.iter_mut() {
            let mut srs: Vec<SeasonRecord> = season_records
                .iter()
                .filter(|((g, _), _)| g == guid)
                .map(|(_, sr)| sr.clone())
                .collect();
            srs.sort_by_key(|sr| sr.season);
            record.season_records = srs;
        }

        let mut result: Vec<ManagerRecord> = records.into_values().collect();
        result.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.losses.cmp(&b.losses)));
        Ok(result)
    }

    fn fold_matchup(
        &self,
        m: &ManagerMatchupRow,
        records: &mut BTreeMap<String, ManagerRecord>,
        season_records: &mut HashMap<(String, i32), SeasonRecord>,
    ) {
        let is_playoff = m.is_playoffs || m.is_consolation;

        if is_playoff {
            if m.is_tied {
                return;
            }
            let (winner, loser) = if m.winner_team_key.as_deref() == Some(&m.team_key_1) {
                (&m.guid_1, &m.guid_2)
            } else {
                (&m.guid_2, &m.guid_1)
            };
            if let Some(r) = records.get_mut(winner) {
                r.playoff_wins += 1;
            }
            if let Some(r) = records.get_mut(loser) {
                r.playoff_losses += 1;
            }
            return;
        }

        // Category accumulation (regular season only)
        for (guid, cats_for, cats_against) in [
            (&m.guid_1, m.cats_won_1, m.cats_won_2),
            (&m.guid_2, m.cats_won_2, m.cats_won_1),
        ] {
            if let Some(r) = records.get_mut(guid) {
                r.cat_wins += cats_for;
                r.cat_losses += cats_against;
                r.cat_ties += m.cats_tied;
            }
            if let Some(sr) = season_records.get_mut(&(guid.clone(), m.season)) {
                sr.cat_wins += cats_for;
                sr.cat_losses += cats_against;
                sr.cat_ties += m.cats_tied;
            }
        }

        if m.is_tied {
            for guid in [&m.guid_1, &m.guid_2] {
                if let Some(r) = records.get_mut(guid) {
                    r.ties += 1;
                }
                if let Some(sr) = season_records.get_mut(&(guid.clone(), m.season)) {
                    sr.ties += 1;
                }
            }
            return;
        }

        let (winner, loser) = if m.winner_team_key.as_deref() == Some(&m.team_key_1) {
            (&m.guid_1, &m.guid_2)
        } else {
            (&m.guid_2, &m.guid_1)
        };
        if let Some(r) = records.get_mut(winner) {
            r.wins += 1;
        }
        if let Some(sr) = season_records.get_mut(&(winner.clone(), m.season)) {
            sr.wins += 1;
        }
        if let Some(r) = records.get_mut(loser) {
            r.losses += 1;
        }
        if let Some(sr) = season_records.get_mut(&(loser.clone(), m.season)) {
            sr.losses += 1;
        }
    }

    /// Pairwise head-to-head records between all managers.
    ///
    /// Both directions are credited from a single scan; self-pairs are
    /// skipped and pairs that never met are simply absent.
    pub fn h2h_matrix(&self) -> Result<HashMap<String, HashMap<String, H2HRecord>>> {
        let matchups = history::get_all_matchups_with_manager_guids(self.db)?;

        let mut matrix: HashMap<String, HashMap<String, H2HRecord>> = HashMap::new();
        for m in &matchups {
            if m.guid_1 == m.guid_2 {
                continue;
            }
            for (a, b, team_a) in [
                (&m.guid_1, &m.guid_2, &m.team_key_1),
                (&m.guid_2, &m.guid_1, &m.team_key_2),
            ] {
                let cell = matrix
                    .entry(a.clone())
                    .or_default()
                    .entry(b.clone())
                    .or_default();
                if m.is_tied {
                    cell.ties += 1;
                } else if m.winner_team_key.as_deref() == Some(team_a) {
                    cell.wins += 1;
                } else {
                    cell.losses += 1;
                }
            }
        }
        Ok(matrix)
    }

    /// Head-to-head matrix rolled up to lineage level. Matchups where either
    /// side's manager/season resolves to no lineage are skipped, as are
    /// intra-lineage pairings.
    pub fn lineage_h2h_matrix(&self) -> Result<HashMap<String, HashMap<String, H2HRecord>>> {
        let matchups = history::get_all_matchups_with_manager_guids(self.db)?;

        let mut matrix: HashMap<String, HashMap<String, H2HRecord>> = HashMap::new();
        for m in &matchups {
            let Some(lineage_1) = self.franchise.resolve_lineage(&m.guid_1, m.season)
            else {
                continue;
            };
            let Some(lineage_2) = self.franchise.resolve_lineage(&m.guid_2, m.season)
            else {
                continue;
            };
            if lineage_1 == lineage_2 {
                continue;
            }

            for (a, b, team_a) in [
                (&lineage_1, &lineage_2, &m.team_key_1),
                (&lineage_2, &lineage_1, &m.team_key_2),
            ] {
                let cell = matrix
                    .entry(a.clone())
                    .or_default()
                    .entry(b.clone())
                    .or_default();
                if m.is_tied {
                    cell.ties += 1;
                } else if m.winner_team_key.as_deref() == Some(team_a.as_str()) {
                    cell.wins += 1;
                } else {
                    cell.losses += 1;
                }
            }
        }
        Ok(matrix)
    }

    /// Aggregate stats per configured lineage: every manager-season that
    /// resolves into the lineage contributes its record, finishes, and
    /// championships.
    pub fn lineage_stats(&self) -> Result<Vec<LineageStats>> {
        let summaries = self.franchise.lineage_list();
        if summaries.is_empty() {
            return Ok(vec![]);
        }

        let managers = self.managers()?;
        let manager_by_guid: HashMap<&str, &ManagerRecord> =
            managers.iter().map(|m| (m.guid.as_str(), m)).collect();

        let mut result = Vec::new();
        for summary in summaries {
            let mut stats = LineageStats {
                id: summary.id.clone(),
                name: summary.name.clone(),
                current_manager: summary.current_manager.clone(),
                seasons: vec![],
                wins: 0,
                losses: 0,
                ties: 0,
                cat_wins: 0,
                cat_losses: 0,
                cat_ties: 0,
                championships: 0,
                best_finish: None,
                worst_finish: None,
                season_records: vec![],
            };

            for span in &summary.ownership {
                let Some(manager) = manager_by_guid.get(span.guid.as_str()) else {
                    continue;
                };
                for sr in &manager.season_records {
                    if self
                        .franchise
                        .resolve_lineage(&span.guid, sr.season)
                        .as_deref()
                        != Some(summary.id.as_str())
                    {
                        continue;
                    }
                    stats.wins += sr.wins;
                    stats.losses += sr.losses;
                    stats.ties += sr.ties;
                    stats.cat_wins += sr.cat_wins;
                    stats.cat_losses += sr.cat_losses;
                    stats.cat_ties += sr.cat_ties;
                    if let Some(finish) = sr.finish {
                        stats.best_finish =
                            Some(stats.best_finish.map_or(finish, |b| b.min(finish)));
                        stats.worst_finish =
                            Some(stats.worst_finish.map_or(finish, |w| w.max(finish)));
                    }
                    stats.seasons.push(sr.season);
                    stats.season_records.push(sr.clone());
                }
                stats.championships += manager
                    .season_records
                    .iter()
                    .filter(|sr| {
                        sr.finish == Some(1)
                            && sr.finished
                            && self
                                .franchise
                                .resolve_lineage(&span.guid, sr.season)
                                .as_deref()
                                == Some(summary.id.as_str())
                    })
                    .count() as u32;
            }

            stats.seasons.sort_unstable();
            stats.seasons.dedup();
            stats.season_records.sort_by_key(|sr| sr.season);
            result.push(stats);
        }
        Ok(result)
    }

    /// Team keys belonging to a lineage, one per season it resolves in.
    pub fn lineage_team_keys(&self, lineage_id: &str) -> Result<Vec<String>> {
        let rows = history::get_all_manager_teams(self.db)?;
        let mut keys = Vec::new();
        for row in rows {
            if self
                .franchise
                .resolve_lineage(&row.manager_guid, row.season)
                .as_deref()
                == Some(lineage_id)
            {
                keys.push(row.team_key);
            }
        }
        Ok(keys)
    }

    /// Per-season keeper selections for one lineage, with tenure computed
    /// from the stamped run starts.
    pub fn lineage_keepers(&self, lineage_id: &str) -> Result<Vec<SeasonKeepers>> {
        let team_keys = self.lineage_team_keys(lineage_id)?;
        if team_keys.is_empty() {
            return Ok(vec![]);
        }
        let rows = keeper_queries::get_keepers_for_teams(self.db, &team_keys)?;

        let mut by_season: BTreeMap<i32, Vec<KeeperEntry>> = BTreeMap::new();
        for row in rows {
            let tenure = row.kept_from_season.map(|from| row.season - from + 1);
            by_season.entry(row.season).or_default().push(KeeperEntry {
                name: row.player_name,
                position: row.primary_position,
                round_cost: row.round_cost,
                kept_from_season: row.kept_from_season,
                tenure,
            });
        }
        Ok(by_season
            .into_iter()
            .map(|(season, keepers)| SeasonKeepers { season, keepers })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// LeagueRecords
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRecord {
    pub category: String,
    pub value: String,
    pub manager: String,
    pub team_name: String,
    pub season: i32,
    pub week: u32,
    pub higher_is_better: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StreakRecord {
    pub manager: String,
    pub team_name: String,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Streaks {
    pub longest_win_streak: StreakRecord,
    pub longest_loss_streak: StreakRecord,
    pub longest_undefeated_streak: StreakRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchupRecord {
    pub winner: String,
    pub loser: String,
    pub winner_team: String,
    pub loser_team: String,
    pub score: String,
    pub season: i32,
    pub week: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchupRecords {
    pub biggest_blowout: Option<MatchupRecord>,
    pub closest_match: Option<MatchupRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsReport {
    pub category_records: Vec<CategoryRecord>,
    pub streaks: Streaks,
    pub matchup_records: MatchupRecords,
}

/// All-time league records across all synced seasons.
pub struct LeagueRecords<'a> {
    db: &'a Database,
    include_playoffs: bool,
}

impl<'a> LeagueRecords<'a> {
    pub fn new(db: &'a Database, include_playoffs: bool) -> Self {
        Self {
            db,
            include_playoffs,
        }
    }

    pub fn records(&self) -> Result<RecordsReport> {
        Ok(RecordsReport {
            category_records: self.category_records()?,
            streaks: self.streaks()?,
            matchup_records: self.matchup_records()?,
        })
    }

    /// Best single-week team value per scoring category across all seasons.
    fn category_records(&self) -> Result<Vec<CategoryRecord>> {
        let unique = leagues::get_distinct_scoring_categories(self.db)?;

        let mut results = Vec::new();
        for cat in unique {
            let higher = cat.higher_is_better();
            if let Some(row) =
                history::get_category_record_holder(self.db, &cat.display_name, higher)?
            {
                results.push(CategoryRecord {
                    category: row.display_name,
                    value: row.value,
                    manager: row.manager_name.unwrap_or_default(),
                    team_name: row.team_name,
                    season: row.season,
                    week: row.week,
                    higher_is_better: higher,
                });
            }
        }
        Ok(results)
    }

    /// Longest win, loss, and undefeated streaks across all seasons.
    ///
    /// Matchups are scanned in (season, week) order. A result differing from
    /// the active streak type resets the count to 1; the undefeated streak
    /// extends on any non-loss and resets to 0 on a loss.
    fn streaks(&self) -> Result<Streaks> {
        let rows = history::get_matchups_for_streaks(self.db, self.include_playoffs)?;

        #[derive(Default)]
        struct Active {
            kind: Option<char>,
            count: u32,
        }

        let mut active: HashMap<String, Active> = HashMap::new();
        let mut undefeated: HashMap<String, u32> = HashMap::new();
        let mut best_win = StreakRecord::default();
        let mut best_loss = StreakRecord::default();
        let mut best_undefeated = StreakRecord::default();

        let mut check = |guid: &str, name: &str, team_name: &str, result: char| {
            let a = active.entry(guid.to_string()).or_default();
            if a.kind == Some(result) {
                a.count += 1;
            } else {
                a.kind = Some(result);
                a.count = 1;
            }

            if result == 'W' && a.count > best_win.streak {
                best_win = StreakRecord {
                    manager: name.to_string(),
                    team_name: team_name.to_string(),
                    streak: a.count,
                };
            } else if result == 'L' && a.count > best_loss.streak {
                best_loss = StreakRecord {
                    manager: name.to_string(),
                    team_name: team_name.to_string(),
                    streak: a.count,
                };
            }

            let u = undefeated.entry(guid.to_string()).or_default();
            if result == 'L' {
                *u = 0;
            } else {
                *u += 1;
                if *u > best_undefeated.streak {
                    best_undefeated = StreakRecord {
                        manager: name.to_string(),
                        team_name: team_name.to_string(),
                        streak: *u,
                    };
                }
            }
        };

        for r in &rows {
            let name_1 = r.name_1.as_deref().unwrap_or(&r.guid_1);
            let name_2 = r.name_2.as_deref().unwrap_or(&r.guid_2);
            if r.is_tied {
                check(&r.guid_1, name_1, &r.team_name_1, 'T');
                check(&r.guid_2, name_2, &r.team_name_2, 'T');
            } else if r.winner_team_key.as_deref() == Some(&r.team_key_1) {
                check(&r.guid_1, name_1, &r.team_name_1, 'W');
                check(&r.guid_2, name_2, &r.team_name_2, 'L');
            } else {
                check(&r.guid_2, name_2, &r.team_name_2, 'W');
                check(&r.guid_1, name_1, &r.team_name_1, 'L');
            }
        }

        Ok(Streaks {
            longest_win_streak: best_win,
            longest_loss_streak: best_loss,
            longest_undefeated_streak: best_undefeated,
        })
    }

    /// Biggest blowout (max category margin) and closest decided match
    /// (minimum nonzero margin) across all qualifying matchups.
    fn matchup_records(&self) -> Result<MatchupRecords> {
        let rows = history::get_matchup_scores(self.db, self.include_playoffs)?;

        let mut biggest: Option<MatchupRecord> = None;
        let mut closest: Option<MatchupRecord> = None;
        let mut max_margin = 0i64;
        let mut min_margin = i64::MAX;

        for r in &rows {
            let c1 = r.cats_won_1 as i64;
            let c2 = r.cats_won_2 as i64;
            let margin = (c1 - c2).abs();

            let make = |r: &history::ScoreMatchupRow| {
                let first_won = r.cats_won_1 > r.cats_won_2;
                let (winner, winner_team, loser, loser_team) = if first_won {
                    (&r.manager_1, &r.team_name_1, &r.manager_2, &r.team_name_2)
                } else {
                    (&r.manager_2, &r.team_name_2, &r.manager_1, &r.team_name_1)
                };
                MatchupRecord {
                    winner: winner.clone().unwrap_or_default(),
                    loser: loser.clone().unwrap_or_default(),
                    winner_team: winner_team.clone(),
                    loser_team: loser_team.clone(),
                    score: format!(
                        "{}-{}-{}",
                        r.cats_won_1.max(r.cats_won_2),
                        r.cats_won_1.min(r.cats_won_2),
                        r.cats_tied
                    ),
                    season: r.season,
                    week: r.week,
                }
            };

            if margin > max_margin {
                max_margin = margin;
                biggest = Some(make(r));
            }
            if margin > 0 && margin < min_margin {
                min_margin = margin;
                closest = Some(make(r));
            }
        }

        Ok(MatchupRecords {
            biggest_blowout: biggest,
            closest_match: closest,
        })
    }
}

// ---------------------------------------------------------------------------
// Manager discovery
// ---------------------------------------------------------------------------

/// Manager guids present in synced data but absent from the config, with the
/// source nicknames that can seed display names.
pub fn discover_unconfigured_managers(
    db: &Database,
    franchise: &Franchise,
) -> Result<Vec<(String, String)>> {
    let rows = crate::queries::teams::get_unresolved_manager_guids(db)?;
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for (guid, nickname) in rows {
        if franchise.manager_name(&guid).is_some() {
            continue;
        }
        if seen.insert(guid.clone()) {
            result.push((guid, nickname));
        }
    }
    Ok(result)
}
