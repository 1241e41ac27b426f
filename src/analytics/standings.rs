// Standings and team profile assembly for power rankings.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Serialize;

use crate::db::Database;
use crate::analytics::value::PlayerValue;
use crate::queries::matchups;
use crate::queries::teams;
use crate::queries::transactions as txn_queries;

#[derive(Debug, Clone, Serialize)]
pub struct StandingsRow {
    pub team_key: String,
    pub team_name: String,
    pub manager: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub rank: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTally {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

/// All data needed for a power-rankings blurb about one team.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamProfile {
    pub team_key: String,
    pub team_name: String,
    pub manager: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub rank: u32,
    pub prev_rank: u32,
    /// Positive = win streak, negative = loss streak, 0 = tie or no games.
    pub streak: i32,
    pub last_3: Vec<String>,
    pub cat_strengths: Vec<String>,
    pub cat_weaknesses: Vec<String>,
    pub mvp_name: String,
    pub mvp_z: f64,
    pub mvp_line: BTreeMap<String, f64>,
    pub disappointment_name: String,
    pub disappointment_z: f64,
    pub disappointment_line: BTreeMap<String, f64>,
    pub recent_adds: Vec<String>,
    pub recent_drops: Vec<String>,
    pub opponent_key: String,
    pub opponent_name: String,
    pub h2h_record: String,
}

#[derive(Clone, Copy)]
enum Outcome {
    Win,
    Loss,
    Tie,
}

/// Builds standings and team profiles from synced data for a given week.
pub struct TeamProfiler<'a> {
    db: &'a Database,
    league_key: String,
}

impl<'a> TeamProfiler<'a> {
    pub fn new(db: &'a Database, league_key: &str) -> Self {
        Self {
            db,
            league_key: league_key.to_string(),
        }
    }

    /// Standings through a given week, folded from matchup results.
    ///
    /// Every team starts 0-0-0; ordering is wins descending then losses
    /// ascending, with ties left in encounter order (stable sort), so the
    /// result is invariant to matchup row order.
    pub fn standings(&self, through_week: u32) -> Result<Vec<StandingsRow>> {
        let team_rows = teams::get_all_teams(self.db, &self.league_key)?;

        let mut order: Vec<String> = Vec::new();
        let mut records: HashMap<String, StandingsRow> = HashMap::new();
        for t in &team_rows {
            order.push(t.team_key.clone());
            records.insert(
                t.team_key.clone(),
                StandingsRow {
                    team_key: t.team_key.clone(),
                    team_name: t.name.clone(),
                    manager: t.manager_name.clone().unwrap_or_default(),
                    wins: 0,
                    losses: 0,
                    ties: 0,
                    rank: 0,
                },
            );
        }

        let results =
            matchups::get_matchups_through_week(self.db, &self.league_key, through_week)?;
        for m in &results {
            if !records.contains_key(&m.team_key_1) || !records.contains_key(&m.team_key_2) {
                continue;
            }
            // A null winner is a tie for both sides.
            let (first, second) = match &m.winner_team_key {
                None => (Outcome::Tie, Outcome::Tie),
                Some(winner) if *winner == m.team_key_1 => (Outcome::Win, Outcome::Loss),
                Some(winner) if *winner == m.team_key_2 => (Outcome::Loss, Outcome::Win),
                Some(_) => continue,
            };
            for (team_key, outcome) in [(&m.team_key_1, first), (&m.team_key_2, second)] {
                if let Some(row) = records.get_mut(team_key) {
                    match outcome {
                        Outcome::Win => row.wins += 1,
                        Outcome::Loss => row.losses += 1,
                        Outcome::Tie => row.ties += 1,
                    }
                }
            }
        }

        let mut ranked: Vec<StandingsRow> = order
            .into_iter()
            .filter_map(|key| records.remove(&key))
            .collect();
        ranked.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.losses.cmp(&b.losses)));
        for (i, row) in ranked.iter_mut().enumerate() {
            row.rank = i as u32 + 1;
        }
        Ok(ranked)
    }

    /// Per-category win/loss/tie tally for a team through a week.
    fn team_category_record(
        &self,
        team_key: &str,
        through_week: u32,
    ) -> Result<BTreeMap<String, CategoryTally>> {
        let rows = matchups::get_team_category_results(
            self.db,
            &self.league_key,
            team_key,
            through_week,
        )?;

        let mut cats: BTreeMap<String, CategoryTally> = BTreeMap::new();
        for r in rows {
            let tally = cats.entry(r.display_name).or_default();
            match r.winner_team_key.as_deref() {
                Some(winner) if winner == team_key => tally.wins += 1,
                None => tally.ties += 1,
                Some(_) => tally.losses += 1,
            }
        }
        Ok(cats)
    }

    /// Last-N matchup results (most recent first) and the signed current
    /// streak. A tie at the head of the sequence zeroes the streak.
    fn recent_form(
        &self,
        team_key: &str,
        through_week: u32,
        n: usize,
    ) -> Result<(Vec<String>, i32)> {
        let history = matchups::get_team_matchup_history(
            self.db,
            &self.league_key,
            team_key,
            through_week,
        )?;

        let results: Vec<char> = history
            .iter()
            .map(|m| {
                if m.is_tied {
                    'T'
                } else if m.winner_team_key.as_deref() == Some(team_key) {
                    'W'
                } else {
                    'L'
                }
            })
            .collect();

        let last_n = results.iter().take(n).map(|c| c.to_string()).collect();

        let mut streak = 0i32;
        if let Some(&head) = results.first() {
            for &r in &results {
                if r == head {
                    streak += 1;
                } else {
                    break;
                }
            }
            match head {
                'L' => streak = -streak,
                'T' => streak = 0,
                _ => {}
            }
        }

        Ok((last_n, streak))
    }

    /// All-time head-to-head line versus an opponent across all seasons.
    fn h2h_record(&self, team_key: &str, opponent_key: &str) -> Result<String> {
        let rows = matchups::get_cross_season_h2h(self.db, team_key, opponent_key)?;
        let (mut w, mut l, mut t) = (0u32, 0u32, 0u32);
        for (winner, is_tied) in rows {
            if is_tied {
                t += 1;
            } else if winner.as_deref() == Some(team_key) {
                w += 1;
            } else {
                l += 1;
            }
        }
        Ok(if t > 0 {
            format!("{w}-{l}-{t}")
        } else {
            format!("{w}-{l}")
        })
    }

    /// Build full team profiles for power rankings as of a given week.
    pub fn build_profiles(&self, week: u32) -> Result<Vec<TeamProfile>> {
        let current = self.standings(week)?;
        let prev = if week > 1 {
            self.standings(week - 1)?
        } else {
            vec![]
        };
        let prev_rank: HashMap<&str, u32> =
            prev.iter().map(|s| (s.team_key.as_str(), s.rank)).collect();

        let mut opponent: HashMap<String, String> = HashMap::new();
        for (t1, t2) in
            matchups::get_current_week_matchups(self.db, &self.league_key, week)?
        {
            opponent.insert(t1.clone(), t2.clone());
            opponent.insert(t2, t1);
        }

        // One shared z-score computation feeds every team's MVP and
        // disappointment; the ranking is already sorted descending.
        let value = PlayerValue::new(self.db, &self.league_key)?;
        let all_cats: Vec<_> = value.categories().iter().collect();
        let all_players = value.compute_rankings(week, &all_cats, None)?;
        let mut players_by_team: HashMap<&str, Vec<&crate::analytics::value::PlayerRank>> =
            HashMap::new();
        for p in &all_players {
            players_by_team.entry(p.team_key.as_str()).or_default().push(p);
        }

        let mut profiles = Vec::new();
        for s in &current {
            let mut profile = TeamProfile {
                team_key: s.team_key.clone(),
                team_name: s.team_name.clone(),
                manager: s.manager.clone(),
                wins: s.wins,
                losses: s.losses,
                ties: s.ties,
                rank: s.rank,
                prev_rank: prev_rank.get(s.team_key.as_str()).copied().unwrap_or(s.rank),
                ..TeamProfile::default()
            };

            let (last_3, streak) = self.recent_form(&s.team_key, week, 3)?;
            profile.last_3 = last_3;
            profile.streak = streak;

            let cat_record = self.team_category_record(&s.team_key, week)?;
            if !cat_record.is_empty() {
                let mut sorted: Vec<(&String, &CategoryTally)> = cat_record.iter().collect();
                // Win ratio with the denominator floored at 1.
                sorted.sort_by(|a, b| {
                    let ratio = |t: &CategoryTally| {
                        t.wins as f64 / (t.wins + t.losses).max(1) as f64
                    };
                    ratio(b.1)
                        .partial_cmp(&ratio(a.1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                profile.cat_strengths =
                    sorted.iter().take(3).map(|(name, _)| (*name).clone()).collect();
                profile.cat_weaknesses = sorted
                    .iter()
                    .rev()
                    .take(3)
                    .map(|(name, _)| (*name).clone())
                    .collect();
            }

            if let Some(roster) = players_by_team.get(s.team_key.as_str()) {
                if let Some(mvp) = roster.first() {
                    profile.mvp_name = mvp.name.clone();
                    profile.mvp_z = mvp.z_total;
                    profile.mvp_line = mvp.stat_line.clone();
                }
                if let Some(worst) = roster.last() {
                    profile.disappointment_name = worst.name.clone();
                    profile.disappointment_z = worst.z_total;
                    profile.disappointment_line = worst.stat_line.clone();
                }
            }

            profile.recent_adds =
                txn_queries::get_recent_adds(self.db, &self.league_key, &s.team_key, 5)?;
            profile.recent_drops =
                txn_queries::get_recent_drops(self.db, &self.league_key, &s.team_key, 5)?;

            if let Some(opp_key) = opponent.get(&s.team_key) {
                profile.opponent_key = opp_key.clone();
                if let Some(opp) =
                    teams::get_team_info(self.db, &self.league_key, opp_key)?
                {
                    profile.opponent_name = opp.name;
                }
                profile.h2h_record = self.h2h_record(&s.team_key, opp_key)?;
            }

            profiles.push(profile);
        }

        Ok(profiles)
    }
}
