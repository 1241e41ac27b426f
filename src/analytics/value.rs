// Z-score player valuation and weekly award rankings.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Serialize;

use crate::db::Database;
use crate::queries::leagues::{self, ScoringCategory};
use crate::queries::players;
use crate::queries::transactions as txn_queries;

/// A player with their composite z-score and per-category detail.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRank {
    pub player_key: String,
    pub name: String,
    pub team_key: String,
    pub team_name: String,
    pub manager: String,
    pub position: String,
    pub z_total: f64,
    /// Raw values per category display name.
    pub stat_line: BTreeMap<String, f64>,
    /// Z-scores per category display name.
    pub z_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLeader {
    pub player_key: String,
    pub name: String,
    pub team_name: String,
    pub manager: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pickup {
    pub player_key: String,
    pub name: String,
    pub team_name: String,
    pub manager: String,
    pub add_week: u32,
    pub total_value: f64,
}

/// Population mean and standard deviation for a category across the
/// qualifying player pool, with a stdev of 1.0 standing in whenever fewer
/// than two points exist or the spread is zero.
fn pool_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 1.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let stdev = variance.sqrt();
    (mean, if stdev > 0.0 { stdev } else { 1.0 })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Compute z-score player rankings from synced weekly stats.
///
/// Baseball splits into batter and pitcher pools via the category
/// position_type; basketball runs a single pool over all scoring stats.
pub struct PlayerValue<'a> {
    db: &'a Database,
    league_key: String,
    categories: Vec<ScoringCategory>,
}

impl<'a> PlayerValue<'a> {
    pub fn new(db: &'a Database, league_key: &str) -> Result<Self> {
        let categories = leagues::get_scoring_categories(db, league_key)?;
        Ok(Self {
            db,
            league_key: league_key.to_string(),
            categories,
        })
    }

    pub fn categories(&self) -> &[ScoringCategory] {
        &self.categories
    }

    fn batting_cats(&self) -> Vec<&ScoringCategory> {
        self.categories
            .iter()
            .filter(|c| c.position_type.as_deref() == Some("B"))
            .collect()
    }

    fn pitching_cats(&self) -> Vec<&ScoringCategory> {
        self.categories
            .iter()
            .filter(|c| c.position_type.as_deref() == Some("P"))
            .collect()
    }

    /// Z-score rankings for a set of categories over one week.
    ///
    /// The qualifying population is every starter with at least one nonzero
    /// value in the target categories; means and stdevs are taken over
    /// exactly that population, so the same raw line can rank differently
    /// in different weeks. Lower-is-better categories have their z-scores
    /// negated before summing. `limit: None` returns the full ranking.
    pub fn compute_rankings(
        &self,
        week: u32,
        cats: &[&ScoringCategory],
        limit: Option<usize>,
    ) -> Result<Vec<PlayerRank>> {
        let cat_ids: Vec<u32> = cats.iter().map(|c| c.stat_id).collect();
        if cat_ids.is_empty() {
            return Ok(vec![]);
        }

        let starters = players::get_week_starters(self.db, &self.league_key, week)?;

        struct Qualifier {
            info: players::StarterRow,
            vals: HashMap<u32, f64>,
        }

        let mut qualifiers: Vec<Qualifier> = Vec::new();
        for starter in starters {
            let stats = players::get_player_week_stats(
                self.db,
                &self.league_key,
                week,
                &starter.player_key,
                &cat_ids,
            )?;
            let vals: HashMap<u32, f64> = stats
                .into_iter()
                .map(|(id, v)| {
                    (id, v.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0))
                })
                .collect();

            // Players with all zeros in the target categories didn't play;
            // keeping them would drag every mean toward zero.
            if !cat_ids.iter().any(|id| vals.get(id).copied().unwrap_or(0.0) != 0.0) {
                continue;
            }
            qualifiers.push(Qualifier {
                info: starter,
                vals,
            });
        }

        if qualifiers.is_empty() {
            return Ok(vec![]);
        }

        let mut cat_stats: HashMap<u32, (f64, f64)> = HashMap::new();
        for id in &cat_ids {
            let values: Vec<f64> = qualifiers
                .iter()
                .map(|q| q.vals.get(id).copied().unwrap_or(0.0))
                .collect();
            cat_stats.insert(*id, pool_stats(&values));
        }

        let mut results: Vec<PlayerRank> = qualifiers
            .iter()
            .map(|q| {
                let mut z_scores = BTreeMap::new();
                let mut stat_line = BTreeMap::new();
                let mut z_total = 0.0;

                for cat in cats {
                    let raw = q.vals.get(&cat.stat_id).copied().unwrap_or(0.0);
                    let (mean, stdev) = cat_stats[&cat.stat_id];
                    let mut z = (raw - mean) / stdev;
                    if !cat.higher_is_better() {
                        z = -z;
                    }
                    z_scores.insert(cat.display_name.clone(), round2(z));
                    stat_line.insert(cat.display_name.clone(), raw);
                    z_total += z;
                }

                PlayerRank {
                    player_key: q.info.player_key.clone(),
                    name: q.info.full_name.clone(),
                    team_key: q.info.team_key.clone(),
                    team_name: q.info.team_name.clone(),
                    manager: q.info.manager_name.clone().unwrap_or_default(),
                    position: q.info.selected_position.clone().unwrap_or_default(),
                    z_total: round2(z_total),
                    stat_line,
                    z_scores,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.z_total
                .partial_cmp(&a.z_total)
                .unwrap_or(Ordering::Equal)
        });
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    /// Top batters for a week by z-score over batting categories. Falls back
    /// to all categories for sports without a batter/pitcher split.
    pub fn top_batters(&self, week: u32, limit: usize) -> Result<Vec<PlayerRank>> {
        let cats = self.batting_cats();
        if cats.is_empty() {
            return self.top_players(week, limit);
        }
        self.compute_rankings(week, &cats, Some(limit))
    }

    /// Top pitchers for a week by z-score over pitching categories.
    pub fn top_pitchers(&self, week: u32, limit: usize) -> Result<Vec<PlayerRank>> {
        let cats = self.pitching_cats();
        if cats.is_empty() {
            return Ok(vec![]);
        }
        self.compute_rankings(week, &cats, Some(limit))
    }

    /// Top players across all scoring categories (basketball or combined).
    pub fn top_players(&self, week: u32, limit: usize) -> Result<Vec<PlayerRank>> {
        let cats: Vec<&ScoringCategory> = self.categories.iter().collect();
        self.compute_rankings(week, &cats, Some(limit))
    }

    /// Top starters in a single category for a week, ordered by the
    /// category's sort order.
    pub fn category_leaders(
        &self,
        week: u32,
        stat_id: u32,
        limit: u32,
    ) -> Result<Vec<CategoryLeader>> {
        let Some(cat) = self.categories.iter().find(|c| c.stat_id == stat_id) else {
            return Ok(vec![]);
        };

        let order = if cat.higher_is_better() { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT pws.player_key, pws.value, p.full_name, t.name, t.manager_name
             FROM player_weekly_stat pws
             JOIN player p ON pws.player_key = p.player_key
             JOIN weekly_roster wr ON pws.league_key = wr.league_key
                 AND pws.week = wr.week AND pws.player_key = wr.player_key
             JOIN team t ON wr.league_key = t.league_key AND wr.team_key = t.team_key
             WHERE pws.league_key = ?1 AND pws.week = ?2 AND pws.stat_id = ?3
                 AND wr.is_starter = 1 AND pws.value IS NOT NULL
             ORDER BY CAST(pws.value AS REAL) {order}
             LIMIT ?4"
        );

        let conn = self.db.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![self.league_key, week, stat_id, limit],
                |row| {
                    let value: Option<String> = row.get(1)?;
                    let manager: Option<String> = row.get(4)?;
                    Ok(CategoryLeader {
                        player_key: row.get(0)?,
                        value: value.and_then(|v| v.parse().ok()).unwrap_or(0.0),
                        name: row.get(2)?,
                        team_name: row.get(3)?,
                        manager: manager.unwrap_or_default(),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Best free-agent pickups since a given week, ranked by total summed
    /// stat value from each player's add week onward.
    pub fn best_pickups(&self, since_week: u32, limit: usize) -> Result<Vec<Pickup>> {
        let adds = txn_queries::get_add_transactions(self.db, &self.league_key)?;
        if adds.is_empty() {
            return Ok(vec![]);
        }

        let cat_ids: Vec<u32> = self.categories.iter().map(|c| c.stat_id).collect();
        let mut results = Vec::new();
        for add in adds {
            let Some(add_week) = add.add_week else {
                continue;
            };
            if add_week < since_week {
                continue;
            }

            let sums = players::get_player_weekly_stats_sum(
                self.db,
                &self.league_key,
                &add.player_key,
                add_week,
                &cat_ids,
            )?;
            if sums.is_empty() {
                continue;
            }

            let total: f64 = sums.iter().map(|(_, v)| v).sum();
            results.push(Pickup {
                player_key: add.player_key,
                name: add.full_name,
                team_name: add.team_name.unwrap_or_default(),
                manager: add.manager_name.unwrap_or_default(),
                add_week,
                total_value: (total * 10.0).round() / 10.0,
            });
        }

        results.sort_by(|a, b| {
            b.total_value
                .partial_cmp(&a.total_value)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_stats_uses_population_stdev() {
        let (mean, stdev) = pool_stats(&[10.0, 20.0]);
        assert!((mean - 15.0).abs() < f64::EPSILON);
        assert!((stdev - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pool_stats_guards_degenerate_pools() {
        // Empty pool
        let (mean, stdev) = pool_stats(&[]);
        assert_eq!(mean, 0.0);
        assert_eq!(stdev, 1.0);

        // Single point
        let (mean, stdev) = pool_stats(&[7.0]);
        assert_eq!(mean, 7.0);
        assert_eq!(stdev, 1.0);

        // Zero spread
        let (mean, stdev) = pool_stats(&[4.0, 4.0, 4.0]);
        assert_eq!(mean, 4.0);
        assert_eq!(stdev, 1.0);
    }

    #[test]
    fn round2_behaves() {
        assert_eq!(round2(1.005), 1.0); // floating representation rounds down
        assert_eq!(round2(-0.707), -0.71);
        assert_eq!(round2(2.0), 2.0);
    }
}
