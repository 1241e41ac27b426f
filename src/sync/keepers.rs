// Keeper sync: derive keeper rows from week-1 rosters, draft order, and the
// transaction log, then stamp consecutive-keeper lineage across seasons.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::params;
use tracing::{info, warn};

use crate::config::{Franchise, Sport};
use crate::db::Database;
use crate::provider::extract_player_id;
use crate::queries::keepers as keeper_queries;
use crate::queries::leagues;
use crate::queries::transactions as txn_queries;

use super::{unit_is_synced, unit_log_complete, unit_log_fail, unit_log_start, UNIT_KEEPERS};

/// Round cost for a keeper who was never drafted by a team or was dropped
/// at any point during the season.
pub const UNDRAFTED_ROUND_COST: u32 = 24;

/// Sync keepers for every synced season of a franchise, then recompute
/// lineage. The first configured season has no keeper concept and is
/// skipped.
///
/// Idempotent per league via sync_log; the lineage pass always re-runs since
/// a newly synced season can extend runs that ended in older rows.
pub fn sync_keepers(db: &Database, franchise: &Franchise) -> Result<()> {
    let first_season = franchise.min_season();

    for season in franchise.season_years() {
        if Some(season) == first_season {
            continue;
        }
        let Some(league_key) = franchise.league_key_for_season(season) else {
            continue;
        };
        if leagues::get_league(db, league_key)?.is_none() {
            info!("[skip] keepers: season {season} not synced yet");
            continue;
        }
        if unit_is_synced(db, league_key, UNIT_KEEPERS, 0)? {
            info!("[skip] keepers already synced for {league_key}");
            continue;
        }

        unit_log_start(db, league_key, UNIT_KEEPERS, 0)?;
        match sync_league_keepers(db, franchise, league_key, season) {
            Ok(records) => {
                info!("[done] keepers for {league_key}: {records} records");
            }
            Err(e) => {
                unit_log_fail(db, league_key, UNIT_KEEPERS, 0, &format!("{e:#}"))?;
                return Err(e)
                    .with_context(|| format!("keeper sync failed for {league_key}"));
            }
        }
    }

    stamp_keeper_lineage(db, franchise)?;
    Ok(())
}

/// Which end of each team's draft conventionally holds its keepers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeeperBand {
    FirstPicks,
    LastPicks,
}

fn sync_league_keepers(
    db: &Database,
    franchise: &Franchise,
    league_key: &str,
    season: i32,
) -> Result<u32> {
    let rosters = keeper_queries::get_week1_rosters(db, league_key)?;

    // (team_key, player_key) pairs the source flagged as kept.
    let mut kept: Vec<(String, String)> = rosters
        .iter()
        .filter(|r| r.is_keeper)
        .map(|r| (r.team_key.clone(), r.player_key.clone()))
        .collect();

    let picks = keeper_queries::get_draft_picks(db, league_key)?;
    let mut picks_by_team: HashMap<&str, Vec<&str>> = HashMap::new();
    for pick in &picks {
        picks_by_team
            .entry(pick.team_key.as_str())
            .or_default()
            .push(pick.player_key.as_str());
    }

    // 1-based pick index within the drafting team, keyed by player.
    let mut team_pick_idx: HashMap<&str, u32> = HashMap::new();
    for players in picks_by_team.values() {
        for (idx, player_key) in players.iter().enumerate() {
            team_pick_idx.insert(player_key, idx as u32 + 1);
        }
    }

    // The basketball source is known to under-report keeper flags; infer the
    // missing ones from draft-pick order when a per-team count is configured.
    if franchise.sport == Sport::Nba {
        if let Some(per_team) = franchise.keepers_per_team {
            let expected = picks_by_team.len() as u32 * per_team;
            if (kept.len() as u32) < expected {
                let inferred =
                    infer_keepers_from_draft(&picks_by_team, &kept, per_team);
                if !inferred.is_empty() {
                    warn!(
                        "{league_key}: {} keeper flags short of expected {expected}; \
                         inferred {} from draft order",
                        kept.len(),
                        inferred.len()
                    );
                    kept.extend(inferred);
                }
            }
        }
    }

    let dropped = txn_queries::get_dropped_player_keys(db, league_key)?;

    db.scoped_tx(|| {
        let mut records = 0u32;
        for (team_key, player_key) in &kept {
            let round_cost = match team_pick_idx.get(player_key.as_str()) {
                Some(idx) if !dropped.contains(player_key) => *idx,
                _ => UNDRAFTED_ROUND_COST,
            };
            let name = player_name(db, player_key)?.unwrap_or_default();
            db.execute(
                "INSERT OR REPLACE INTO keeper
                     (league_key, team_key, player_key, player_name, season,
                      round_cost, kept_from_season)
                 VALUES (?1,?2,?3,?4,?5,?6,NULL)",
                params![league_key, team_key, player_key, name, season, round_cost],
            )?;
            records += 1;
        }
        unit_log_complete(db, league_key, UNIT_KEEPERS, 0, records)?;
        Ok(records)
    })
}

/// Fill in unflagged keepers from draft order.
///
/// Keepers conventionally occupy either the first N or the last N picks of
/// each team's draft. Which end is in use is detected by counting where the
/// already-flagged keepers fall, then each short team is topped up from the
/// detected band. Best-effort by construction: the detection reconciles a
/// guess against partial ground truth and is never treated as authoritative.
fn infer_keepers_from_draft(
    picks_by_team: &HashMap<&str, Vec<&str>>,
    flagged: &[(String, String)],
    per_team: u32,
) -> Vec<(String, String)> {
    let n = per_team as usize;
    let flagged_set: HashSet<(&str, &str)> = flagged
        .iter()
        .map(|(t, p)| (t.as_str(), p.as_str()))
        .collect();

    let mut first_hits = 0usize;
    let mut last_hits = 0usize;
    for (team_key, players) in picks_by_team {
        let first_band: HashSet<&&str> = players.iter().take(n).collect();
        let last_band: HashSet<&&str> =
            players.iter().skip(players.len().saturating_sub(n)).collect();
        for player in players {
            if !flagged_set.contains(&(*team_key, *player)) {
                continue;
            }
            if first_band.contains(&player) {
                first_hits += 1;
            }
            if last_band.contains(&player) {
                last_hits += 1;
            }
        }
    }
    let band = if first_hits >= last_hits {
        KeeperBand::FirstPicks
    } else {
        KeeperBand::LastPicks
    };

    let mut inferred = Vec::new();
    for (team_key, players) in picks_by_team {
        let flagged_count = players
            .iter()
            .filter(|p| flagged_set.contains(&(*team_key, **p)))
            .count();
        if flagged_count >= n {
            continue;
        }

        let band_players: Vec<&&str> = match band {
            KeeperBand::FirstPicks => players.iter().take(n).collect(),
            KeeperBand::LastPicks => {
                players.iter().skip(players.len().saturating_sub(n)).collect()
            }
        };
        let mut needed = n - flagged_count;
        for player in band_players {
            if needed == 0 {
                break;
            }
            if flagged_set.contains(&(*team_key, *player)) {
                continue;
            }
            inferred.push((team_key.to_string(), player.to_string()));
            needed -= 1;
        }
    }
    inferred
}

fn player_name(db: &Database, player_key: &str) -> Result<Option<String>> {
    let conn = db.conn();
    let mut stmt = conn
        .prepare("SELECT full_name FROM player WHERE player_key = ?1")
        .context("failed to prepare player name lookup")?;
    let mut rows = stmt
        .query_map(params![player_key], |row| row.get(0))
        .context("failed to query player name")?;
    rows.next().transpose().context("failed to read player name")
}

/// Stamp every keeper row with the starting season of its unbroken
/// consecutive-season run.
///
/// Rows are grouped by (lineage identity, stable player id) rather than raw
/// team key: team keys are season-local and ownership can survive a team-key
/// change. Managers outside any configured lineage fall back to their own
/// guid, so tenure still accrues for them.
pub fn stamp_keeper_lineage(db: &Database, franchise: &Franchise) -> Result<u32> {
    let rows = keeper_queries::get_all_keepers_with_managers(db)?;

    let mut groups: HashMap<(String, String), Vec<&keeper_queries::KeeperLineageRow>> =
        HashMap::new();
    for row in &rows {
        let lineage = franchise
            .resolve_lineage(&row.manager_guid, row.season)
            .unwrap_or_else(|| row.manager_guid.clone());
        let player_id = extract_player_id(&row.player_key).to_string();
        groups.entry((lineage, player_id)).or_default().push(row);
    }

    let mut stamped = 0u32;
    db.scoped_tx(|| {
        for group in groups.values_mut() {
            group.sort_by_key(|r| r.season);

            let mut run_start = None;
            let mut prev_season = None;
            for row in group.iter() {
                let start = match (run_start, prev_season) {
                    (Some(start), Some(prev)) if row.season == prev + 1 => start,
                    _ => row.season,
                };
                run_start = Some(start);
                prev_season = Some(row.season);

                keeper_queries::set_kept_from_season(
                    db,
                    &row.league_key,
                    &row.team_key,
                    &row.player_key,
                    start,
                )?;
                stamped += 1;
            }
        }
        Ok(())
    })?;

    Ok(stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Lineage, ManagerEntry, OwnershipSpan, SeasonEntry};

    fn test_franchise(sport: Sport) -> Franchise {
        Franchise {
            slug: "test".into(),
            name: "Test".into(),
            sport,
            default: true,
            keepers_per_team: Some(2),
            seasons: vec![
                SeasonEntry {
                    year: 2019,
                    league_key: "390.l.1".into(),
                },
                SeasonEntry {
                    year: 2020,
                    league_key: "399.l.1".into(),
                },
                SeasonEntry {
                    year: 2021,
                    league_key: "406.l.1".into(),
                },
                SeasonEntry {
                    year: 2022,
                    league_key: "412.l.1".into(),
                },
            ],
            managers: vec![
                ManagerEntry {
                    guid: "G1".into(),
                    name: "One".into(),
                    short_name: None,
                },
                ManagerEntry {
                    guid: "G2".into(),
                    name: "Two".into(),
                    short_name: None,
                },
            ],
            former_managers: vec![],
            lineages: vec![Lineage {
                name: "Continuity".into(),
                owners: vec![
                    OwnershipSpan {
                        guid: "G1".into(),
                        from: 2019,
                        to: Some(2020),
                    },
                    OwnershipSpan {
                        guid: "G2".into(),
                        from: 2021,
                        to: None,
                    },
                ],
            }],
        }
    }

    fn seed_league(db: &Database, league_key: &str, season: i32) {
        db.execute(
            "INSERT INTO league (league_key, season, name, num_teams, scoring_type,
                 num_scoring_cats, current_week, start_week, end_week, is_finished,
                 last_synced)
             VALUES (?1, ?2, 'L', 2, 'headone', 10, 20, 1, 20, 1, '')",
            params![league_key, season],
        )
        .unwrap();
    }

    fn seed_team(db: &Database, league_key: &str, team_key: &str, guid: &str) {
        db.execute(
            "INSERT INTO team (league_key, team_key, team_id, name, manager_guid)
             VALUES (?1, ?2, 1, 'T', ?3)",
            params![league_key, team_key, guid],
        )
        .unwrap();
    }

    fn seed_keeper(
        db: &Database,
        league_key: &str,
        team_key: &str,
        player_key: &str,
        season: i32,
    ) {
        db.execute(
            "INSERT INTO keeper (league_key, team_key, player_key, player_name,
                 season, round_cost)
             VALUES (?1, ?2, ?3, 'P', ?4, 5)",
            params![league_key, team_key, player_key, season],
        )
        .unwrap();
    }

    fn kept_from(db: &Database, league_key: &str, player_key: &str) -> Option<i32> {
        db.conn()
            .query_row(
                "SELECT kept_from_season FROM keeper
                 WHERE league_key = ?1 AND player_key = ?2",
                params![league_key, player_key],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn lineage_gap_starts_a_new_run() {
        let db = Database::open(":memory:").unwrap();
        let franchise = test_franchise(Sport::Mlb);

        // Keeper rows for seasons 2019, 2020, 2022 (2021 missing). Ownership
        // transfers G1 -> G2 in 2021, and team keys change every season, but
        // the lineage groups them together.
        for (lk, season, guid, tk) in [
            ("390.l.1", 2019, "G1", "390.l.1.t.3"),
            ("399.l.1", 2020, "G1", "399.l.1.t.7"),
            ("412.l.1", 2022, "G2", "412.l.1.t.2"),
        ] {
            seed_league(&db, lk, season);
            seed_team(&db, lk, tk, guid);
            // Same real player: stable id 55 under changing game prefixes.
            let pk = format!("{}.p.55", lk.split('.').next().unwrap());
            seed_keeper(&db, lk, tk, &pk, season);
        }

        let stamped = stamp_keeper_lineage(&db, &franchise).unwrap();
        assert_eq!(stamped, 3);

        assert_eq!(kept_from(&db, "390.l.1", "390.p.55"), Some(2019));
        assert_eq!(kept_from(&db, "399.l.1", "399.p.55"), Some(2019));
        // The gap at 2021 starts a new run.
        assert_eq!(kept_from(&db, "412.l.1", "412.p.55"), Some(2022));
    }

    #[test]
    fn lineage_falls_back_to_guid_for_unconfigured_managers() {
        let db = Database::open(":memory:").unwrap();
        let franchise = test_franchise(Sport::Mlb);

        // G9 is in no lineage; consecutive seasons still form a run.
        for (lk, season, tk) in [
            ("390.l.1", 2019, "390.l.1.t.9"),
            ("399.l.1", 2020, "399.l.1.t.4"),
        ] {
            seed_league(&db, lk, season);
            seed_team(&db, lk, tk, "G9");
            let pk = format!("{}.p.77", lk.split('.').next().unwrap());
            seed_keeper(&db, lk, tk, &pk, season);
        }

        stamp_keeper_lineage(&db, &franchise).unwrap();
        assert_eq!(kept_from(&db, "390.l.1", "390.p.77"), Some(2019));
        assert_eq!(kept_from(&db, "399.l.1", "399.p.77"), Some(2019));
    }

    #[test]
    fn infer_detects_first_pick_band() {
        let mut picks: HashMap<&str, Vec<&str>> = HashMap::new();
        picks.insert("t.1", vec!["p.1", "p.2", "p.3", "p.4"]);
        picks.insert("t.2", vec!["p.5", "p.6", "p.7", "p.8"]);

        // Team 1's flags sit in its first two picks; team 2 has none flagged.
        let flagged = vec![
            ("t.1".to_string(), "p.1".to_string()),
            ("t.1".to_string(), "p.2".to_string()),
        ];

        let mut inferred = infer_keepers_from_draft(&picks, &flagged, 2);
        inferred.sort();
        assert_eq!(
            inferred,
            vec![
                ("t.2".to_string(), "p.5".to_string()),
                ("t.2".to_string(), "p.6".to_string()),
            ]
        );
    }

    #[test]
    fn infer_detects_last_pick_band() {
        let mut picks: HashMap<&str, Vec<&str>> = HashMap::new();
        picks.insert("t.1", vec!["p.1", "p.2", "p.3", "p.4"]);
        picks.insert("t.2", vec!["p.5", "p.6", "p.7", "p.8"]);

        // Flags fall at the tail of team 1's draft.
        let flagged = vec![
            ("t.1".to_string(), "p.3".to_string()),
            ("t.1".to_string(), "p.4".to_string()),
        ];

        let mut inferred = infer_keepers_from_draft(&picks, &flagged, 2);
        inferred.sort();
        assert_eq!(
            inferred,
            vec![
                ("t.2".to_string(), "p.7".to_string()),
                ("t.2".to_string(), "p.8".to_string()),
            ]
        );
    }

    #[test]
    fn infer_tops_up_partially_flagged_teams() {
        let mut picks: HashMap<&str, Vec<&str>> = HashMap::new();
        picks.insert("t.1", vec!["p.1", "p.2", "p.3", "p.4"]);

        // One of two keepers flagged; the other comes from the first band.
        let flagged = vec![("t.1".to_string(), "p.1".to_string())];

        let inferred = infer_keepers_from_draft(&picks, &flagged, 2);
        assert_eq!(inferred, vec![("t.1".to_string(), "p.2".to_string())]);
    }
}
