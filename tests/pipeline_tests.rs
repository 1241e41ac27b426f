// End-to-end tests: a scripted provider feeds the sync pipeline, and the
// analytics layer is asserted against the synced store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::params;

use clubhouse::analytics::history::{LeagueRecords, ManagerHistory};
use clubhouse::analytics::standings::TeamProfiler;
use clubhouse::analytics::value::PlayerValue;
use clubhouse::config::{Franchise, ManagerEntry, SeasonEntry, Sport};
use clubhouse::db::Database;
use clubhouse::provider::types::*;
use clubhouse::provider::FantasyProvider;
use clubhouse::queries::{keepers, leagues, matchups, players};
use clubhouse::sync::keepers::sync_keepers;
use clubhouse::sync::SyncPipeline;

const LEAGUE: &str = "458.l.1001";
const TEAM_A: &str = "458.l.1001.t.1";
const TEAM_B: &str = "458.l.1001.t.2";

// ===========================================================================
// Fixture franchise and provider
// ===========================================================================

fn test_franchise() -> Franchise {
    Franchise {
        slug: "baseball".into(),
        name: "Test League".into(),
        sport: Sport::Mlb,
        default: true,
        keepers_per_team: None,
        seasons: vec![
            SeasonEntry {
                year: 2022,
                league_key: "412.l.900".into(),
            },
            SeasonEntry {
                year: 2023,
                league_key: LEAGUE.into(),
            },
        ],
        managers: vec![
            ManagerEntry {
                guid: "GUID_A".into(),
                name: "Alice".into(),
                short_name: Some("A".into()),
            },
            ManagerEntry {
                guid: "GUID_B".into(),
                name: "Bob".into(),
                short_name: None,
            },
        ],
        former_managers: vec![],
        lineages: vec![],
    }
}

/// Scripted provider for a 2-team, 1-week, 10-category season.
///
/// The metadata deliberately misreports week bounds (start 9, end 1,
/// current 9) so the repair pass has something to fix.
struct MockProvider {
    scoreboard_calls: AtomicUsize,
    fail_scoreboard: Arc<AtomicBool>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            scoreboard_calls: AtomicUsize::new(0),
            fail_scoreboard: Arc::new(AtomicBool::new(false)),
        }
    }

    fn player(key: &str, name: &str, position: &str) -> PlayerEntry {
        PlayerEntry {
            player_key: key.into(),
            player_id: Some(key.rsplit('.').next().unwrap().into()),
            full_name: name.into(),
            first_name: String::new(),
            last_name: String::new(),
            editorial_team_abbr: "TST".into(),
            display_position: position.into(),
            eligible_positions: vec![position.into()],
            headshot_url: String::new(),
        }
    }

    fn stat(stat_id: u32, value: &str) -> StatValue {
        StatValue {
            stat_id,
            value: Some(value.into()),
        }
    }
}

#[async_trait]
impl FantasyProvider for MockProvider {
    async fn league_info(&self, league_key: &str) -> Result<LeagueInfo> {
        Ok(LeagueInfo {
            league_key: league_key.into(),
            season: 2023,
            name: "Test League".into(),
            num_teams: 2,
            scoring_type: "head".into(),
            current_week: 9,
            start_week: 9,
            end_week: 1,
            is_finished: true,
        })
    }

    async fn league_settings(&self, _league_key: &str) -> Result<LeagueSettings> {
        let mut cats: Vec<StatCategoryDef> = (1..=6)
            .map(|id| StatCategoryDef {
                stat_id: id,
                name: format!("bat{id}"),
                display_name: format!("B{id}"),
                sort_order: 1,
                position_type: Some("B".into()),
                is_only_display_stat: false,
            })
            .collect();
        cats.extend((7..=9).map(|id| StatCategoryDef {
            stat_id: id,
            name: format!("pit{id}"),
            display_name: format!("P{id}"),
            sort_order: 1,
            position_type: Some("P".into()),
            is_only_display_stat: false,
        }));
        cats.push(StatCategoryDef {
            stat_id: 10,
            name: "earned run average".into(),
            display_name: "ERA".into(),
            sort_order: 0,
            position_type: Some("P".into()),
            is_only_display_stat: false,
        });
        cats.push(StatCategoryDef {
            stat_id: 99,
            name: "games".into(),
            display_name: "G".into(),
            sort_order: 1,
            position_type: None,
            is_only_display_stat: true,
        });
        Ok(LeagueSettings {
            playoff_start_week: None,
            uses_faab: true,
            stat_categories: cats,
        })
    }

    async fn teams(&self, _league_key: &str) -> Result<Vec<TeamEntry>> {
        Ok(vec![
            TeamEntry {
                team_key: TEAM_A.into(),
                team_id: 1,
                name: "Aardvarks".into(),
                manager_guid: Some("GUID_A".into()),
                manager_nickname: Some("alice".into()),
            },
            TeamEntry {
                team_key: TEAM_B.into(),
                team_id: 2,
                name: "Bobcats".into(),
                manager_guid: Some("GUID_B".into()),
                manager_nickname: Some("bob".into()),
            },
        ])
    }

    async fn standings(&self, _league_key: &str) -> Result<Vec<StandingsEntry>> {
        Ok(vec![
            StandingsEntry {
                team_key: TEAM_A.into(),
                rank: Some(1),
                playoff_seed: Some(1),
                waiver_priority: Some(2),
                faab_balance: Some(87.0),
            },
            StandingsEntry {
                team_key: TEAM_B.into(),
                rank: Some(2),
                playoff_seed: Some(2),
                waiver_priority: Some(1),
                faab_balance: Some(100.0),
            },
        ])
    }

    async fn scoreboard(&self, _league_key: &str, week: u32) -> Result<Vec<MatchupEntry>> {
        if self.fail_scoreboard.load(Ordering::SeqCst) {
            anyhow::bail!("scoreboard endpoint unavailable");
        }
        self.scoreboard_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(week, 1, "only week 1 exists in this fixture");
        Ok(vec![MatchupEntry {
            team_key_1: TEAM_A.into(),
            team_key_2: TEAM_B.into(),
            points_1: 6.0,
            points_2: 3.0,
            winner_team_key: Some(TEAM_A.into()),
            is_tied: false,
            is_playoffs: false,
            is_consolation: false,
            week_start: "2023-04-03".into(),
            week_end: "2023-04-09".into(),
        }])
    }

    async fn team_week_stats(&self, team_key: &str, _week: u32) -> Result<Vec<StatValue>> {
        // Team A wins categories 1-5 and 9; category 6 ties exactly; team B
        // takes 7, 8, and the lower-is-better ERA.
        let values: Vec<(u32, &str, &str)> = vec![
            (1, "10", "5"),
            (2, "8", "2"),
            (3, "7", "3"),
            (4, "6", "1"),
            (5, "9", "4"),
            (6, "5", "5"),
            (7, "12", "15"),
            (8, "3", "6"),
            (9, "30", "20"),
            (10, "4.50", "3.20"),
        ];
        let side = if team_key == TEAM_A { 1 } else { 2 };
        Ok(values
            .iter()
            .map(|(id, a, b)| Self::stat(*id, if side == 1 { a } else { b }))
            .collect())
    }

    async fn roster_with_stats(
        &self,
        _league_key: &str,
        team_id: u32,
        _week: u32,
    ) -> Result<Vec<RosterEntry>> {
        Ok(match team_id {
            1 => vec![
                RosterEntry {
                    player: Self::player("458.p.101", "Alpha One", "SS"),
                    selected_position: Some("SS".into()),
                    keeper: KeeperFlag::Flag(true),
                    stats: vec![Self::stat(1, "3"), Self::stat(2, "10")],
                },
                RosterEntry {
                    player: Self::player("458.p.103", "Alpha Three", "OF"),
                    selected_position: Some("BN".into()),
                    keeper: KeeperFlag::Flag(false),
                    stats: vec![Self::stat(2, "4")],
                },
            ],
            2 => vec![
                RosterEntry {
                    player: Self::player("458.p.201", "Beta One", "OF"),
                    selected_position: Some("OF".into()),
                    keeper: KeeperFlag::Flag(false),
                    stats: vec![Self::stat(2, "20")],
                },
                RosterEntry {
                    player: Self::player("458.p.102", "Alpha Two", "SP"),
                    selected_position: Some("SP".into()),
                    keeper: KeeperFlag::Numeric(1),
                    stats: vec![Self::stat(7, "5")],
                },
            ],
            other => panic!("unexpected team id {other}"),
        })
    }

    async fn draft_results(&self, _league_key: &str) -> Result<Vec<DraftPickEntry>> {
        Ok(vec![
            DraftPickEntry {
                pick: 1,
                round: 1,
                team_key: TEAM_A.into(),
                player_key: "458.p.101".into(),
                cost: None,
            },
            DraftPickEntry {
                pick: 2,
                round: 1,
                team_key: TEAM_B.into(),
                player_key: "458.p.201".into(),
                cost: None,
            },
            DraftPickEntry {
                pick: 3,
                round: 2,
                team_key: TEAM_A.into(),
                player_key: "458.p.102".into(),
                cost: None,
            },
            DraftPickEntry {
                pick: 4,
                round: 2,
                team_key: TEAM_B.into(),
                player_key: "458.p.202".into(),
                cost: None,
            },
        ])
    }

    async fn transactions(&self, _league_key: &str) -> Result<Vec<TransactionEntry>> {
        // Alpha Two is dropped by team A mid-week, then claimed by team B.
        Ok(vec![
            TransactionEntry {
                transaction_key: "458.l.1001.tr.1".into(),
                txn_type: "drop".into(),
                status: "successful".into(),
                timestamp: 1_680_696_000, // 2023-04-05T12:00:00Z
                trader_team_key: None,
                tradee_team_key: None,
                faab_bid: None,
                players: vec![TransactionPlayerEntry {
                    player_key: "458.p.102".into(),
                    source_type: "team".into(),
                    source_team_key: Some(TEAM_A.into()),
                    destination_type: "waivers".into(),
                    destination_team_key: None,
                    move_type: "drop".into(),
                }],
            },
            TransactionEntry {
                transaction_key: "458.l.1001.tr.2".into(),
                txn_type: "add".into(),
                status: "successful".into(),
                timestamp: 1_680_710_400, // 2023-04-05T16:00:00Z
                trader_team_key: None,
                tradee_team_key: None,
                faab_bid: Some(7),
                players: vec![TransactionPlayerEntry {
                    player_key: "458.p.102".into(),
                    source_type: "waivers".into(),
                    source_team_key: None,
                    destination_type: "team".into(),
                    destination_team_key: Some(TEAM_B.into()),
                    move_type: "add".into(),
                }],
            },
        ])
    }
}

async fn synced_fixture() -> (Database, Franchise, MockProvider) {
    let db = Database::open(":memory:").unwrap();
    let franchise = test_franchise();
    let provider = MockProvider::new();
    {
        let pipeline =
            SyncPipeline::new(&db, &provider, &franchise).with_delay(Duration::ZERO);
        pipeline.sync_season(2023).await.unwrap();
    }
    (db, franchise, provider)
}

fn count(db: &Database, table: &str) -> i64 {
    db.conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

// ===========================================================================
// End-to-end scenario
// ===========================================================================

#[tokio::test]
async fn full_season_sync_and_standings() {
    let (db, _franchise, _provider) = synced_fixture().await;

    // The matchup recorded a 6-3-1 category split.
    let week = matchups::get_week_matchups(&db, LEAGUE, 1).unwrap();
    assert_eq!(week.len(), 1);
    let m = &week[0];
    assert_eq!(m.cats_won_1, 6);
    assert_eq!(m.cats_won_2, 3);
    assert_eq!(m.cats_tied, 1);
    assert_eq!(m.winner_team_key.as_deref(), Some(TEAM_A));

    // Standings through week 1: A 1-0-0, B 0-1-0.
    let standings = TeamProfiler::new(&db, LEAGUE).standings(1).unwrap();
    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].team_key, TEAM_A);
    assert_eq!(
        (standings[0].wins, standings[0].losses, standings[0].ties),
        (1, 0, 0)
    );
    assert_eq!(standings[0].rank, 1);
    assert_eq!(standings[1].team_key, TEAM_B);
    assert_eq!(
        (standings[1].wins, standings[1].losses, standings[1].ties),
        (0, 1, 0)
    );
}

#[tokio::test]
async fn per_category_winners_follow_sort_order() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let cats = matchups::get_matchup_categories(&db, LEAGUE, 1, 0).unwrap();
    assert_eq!(cats.len(), 10);

    let winner_of = |stat_id: u32| -> Option<String> {
        cats.iter()
            .find(|c| c.stat_id == stat_id)
            .unwrap()
            .winner_team_key
            .clone()
    };

    for id in [1, 2, 3, 4, 5, 9] {
        assert_eq!(winner_of(id).as_deref(), Some(TEAM_A), "stat {id}");
    }
    for id in [7, 8] {
        assert_eq!(winner_of(id).as_deref(), Some(TEAM_B), "stat {id}");
    }
    // Exact tie leaves the category winner unset.
    assert_eq!(winner_of(6), None);
    // Lower-is-better flips the comparison: B's 3.20 ERA beats A's 4.50.
    assert_eq!(winner_of(10).as_deref(), Some(TEAM_B));
}

#[tokio::test]
async fn week_repair_overwrites_bogus_metadata() {
    let (db, _franchise, _provider) = synced_fixture().await;

    // Source reported start 9 / end 1 / current 9; matchups say week 1 only.
    let league = leagues::get_league(&db, LEAGUE).unwrap().unwrap();
    assert_eq!(league.start_week, 1);
    assert_eq!(league.end_week, 1);
    assert_eq!(league.current_week, 1);
    assert_eq!(league.playoff_start_week, None);
}

#[tokio::test]
async fn transaction_weeks_are_backfilled() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let weeks: Vec<Option<u32>> = {
        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT week FROM transaction_record ORDER BY transaction_key")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    };
    assert_eq!(weeks, vec![Some(1), Some(1)]);
}

#[tokio::test]
async fn standings_refresh_stores_finish_and_seed() {
    let (db, franchise, _provider) = synced_fixture().await;

    let history = ManagerHistory::new(&db, &franchise);
    let managers = history.managers().unwrap();
    assert_eq!(managers.len(), 2);

    let alice = managers.iter().find(|m| m.name == "Alice").unwrap();
    assert_eq!(alice.wins, 1);
    assert_eq!(alice.best_finish, Some(1));
    assert_eq!(alice.championships, 1);
    assert_eq!(alice.cat_wins, 6);
    assert_eq!(alice.cat_losses, 3);
    assert_eq!(alice.cat_ties, 1);

    let bob = managers.iter().find(|m| m.name == "Bob").unwrap();
    assert_eq!(bob.losses, 1);
    assert_eq!(bob.best_finish, Some(2));
    assert_eq!(bob.championships, 0);
}

#[tokio::test]
async fn h2h_matrix_is_symmetric() {
    let (db, franchise, _provider) = synced_fixture().await;

    let matrix = ManagerHistory::new(&db, &franchise).h2h_matrix().unwrap();
    let a_vs_b = &matrix["GUID_A"]["GUID_B"];
    assert_eq!((a_vs_b.wins, a_vs_b.losses, a_vs_b.ties), (1, 0, 0));
    let b_vs_a = &matrix["GUID_B"]["GUID_A"];
    assert_eq!((b_vs_a.wins, b_vs_a.losses, b_vs_a.ties), (0, 1, 0));
    // No self-pairs.
    assert!(matrix["GUID_A"].get("GUID_A").is_none());
}

// ===========================================================================
// Idempotency and failure handling
// ===========================================================================

#[tokio::test]
async fn second_sync_run_skips_completed_units() {
    let (db, franchise, provider) = synced_fixture().await;

    let before = (
        count(&db, "matchup"),
        count(&db, "matchup_category"),
        count(&db, "weekly_roster"),
        count(&db, "player_weekly_stat"),
        count(&db, "transaction_record"),
        count(&db, "draft_pick"),
    );
    assert_eq!(provider.scoreboard_calls.load(Ordering::SeqCst), 1);

    let pipeline =
        SyncPipeline::new(&db, &provider, &franchise).with_delay(Duration::ZERO);
    pipeline.sync_season(2023).await.unwrap();

    let after = (
        count(&db, "matchup"),
        count(&db, "matchup_category"),
        count(&db, "weekly_roster"),
        count(&db, "player_weekly_stat"),
        count(&db, "transaction_record"),
        count(&db, "draft_pick"),
    );
    assert_eq!(before, after, "store contents must not change on re-run");
    // The weekly unit was skipped, so the scoreboard was not re-fetched.
    assert_eq!(provider.scoreboard_calls.load(Ordering::SeqCst), 1);

    let incomplete: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM sync_log WHERE status != 'completed'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(incomplete, 0);
}

#[tokio::test]
async fn failed_unit_is_logged_and_retryable() {
    let db = Database::open(":memory:").unwrap();
    let franchise = test_franchise();
    let provider = MockProvider::new();
    provider.fail_scoreboard.store(true, Ordering::SeqCst);

    let pipeline =
        SyncPipeline::new(&db, &provider, &franchise).with_delay(Duration::ZERO);
    let err = pipeline.sync_season(2023).await.unwrap_err();
    assert!(format!("{err:#}").contains("scoreboard"));

    // The weekly unit failed with no rows written; earlier units completed.
    assert_eq!(count(&db, "matchup"), 0);
    let status: String = db
        .conn()
        .query_row(
            "SELECT status FROM sync_log WHERE sync_type = 'weekly' AND week = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(status, "failed");

    // A later invocation retries the failed unit and succeeds.
    provider.fail_scoreboard.store(false, Ordering::SeqCst);
    pipeline.sync_season(2023).await.unwrap();
    assert_eq!(count(&db, "matchup"), 1);
    let status: String = db
        .conn()
        .query_row(
            "SELECT status FROM sync_log WHERE sync_type = 'weekly' AND week = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(status, "completed");
}

// ===========================================================================
// Z-score valuation
// ===========================================================================

#[tokio::test]
async fn zscore_symmetry_for_two_player_pool() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let value = PlayerValue::new(&db, LEAGUE).unwrap();
    let cat2 = value
        .categories()
        .iter()
        .find(|c| c.stat_id == 2)
        .unwrap();

    // Exactly two starters have nonzero values in category 2 (10 and 20);
    // the bench player's 4 is excluded.
    let ranks = value.compute_rankings(1, &[cat2], None).unwrap();
    assert_eq!(ranks.len(), 2);
    assert_eq!(ranks[0].name, "Beta One");
    assert!((ranks[0].z_total - 1.0).abs() < 1e-9);
    assert_eq!(ranks[1].name, "Alpha One");
    assert!((ranks[1].z_total + 1.0).abs() < 1e-9);
    assert!((ranks[0].z_total + ranks[1].z_total).abs() < 1e-9);
}

#[tokio::test]
async fn category_leaders_follow_sort_order() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let value = PlayerValue::new(&db, LEAGUE).unwrap();
    // Category 2 is higher-is-better: Beta One's 20 leads.
    let leaders = value.category_leaders(1, 2, 10).unwrap();
    assert_eq!(leaders[0].name, "Beta One");
    assert!((leaders[0].value - 20.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn best_pickups_rank_by_value_since_add() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let value = PlayerValue::new(&db, LEAGUE).unwrap();
    let pickups = value.best_pickups(1, 5).unwrap();
    // Alpha Two was claimed off waivers in week 1 and put up 5.0 in P7.
    assert_eq!(pickups.len(), 1);
    assert_eq!(pickups[0].name, "Alpha Two");
    assert_eq!(pickups[0].add_week, 1);
    assert!((pickups[0].total_value - 5.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn lineage_rollups_aggregate_manager_records() {
    let (db, mut franchise, _provider) = synced_fixture().await;
    franchise.lineages = vec![
        clubhouse::config::Lineage {
            name: "Continuity A".into(),
            owners: vec![clubhouse::config::OwnershipSpan {
                guid: "GUID_A".into(),
                from: 2022,
                to: None,
            }],
        },
        clubhouse::config::Lineage {
            name: "Continuity B".into(),
            owners: vec![clubhouse::config::OwnershipSpan {
                guid: "GUID_B".into(),
                from: 2022,
                to: None,
            }],
        },
    ];

    let history = ManagerHistory::new(&db, &franchise);
    let stats = history.lineage_stats().unwrap();
    assert_eq!(stats.len(), 2);

    let a = stats.iter().find(|s| s.id == "lineage_0").unwrap();
    assert_eq!(a.current_manager, "Alice");
    assert_eq!((a.wins, a.losses, a.ties), (1, 0, 0));
    assert_eq!(a.championships, 1);
    assert_eq!(a.best_finish, Some(1));
    assert_eq!(a.seasons, vec![2023]);

    let matrix = history.lineage_h2h_matrix().unwrap();
    let a_vs_b = &matrix["lineage_0"]["lineage_1"];
    assert_eq!((a_vs_b.wins, a_vs_b.losses, a_vs_b.ties), (1, 0, 0));
}

#[tokio::test]
async fn lineage_keeper_history_reports_tenure() {
    let (db, mut franchise, _provider) = synced_fixture().await;
    sync_keepers(&db, &franchise).unwrap();

    franchise.lineages = vec![clubhouse::config::Lineage {
        name: "Continuity A".into(),
        owners: vec![clubhouse::config::OwnershipSpan {
            guid: "GUID_A".into(),
            from: 2022,
            to: None,
        }],
    }];

    let history = ManagerHistory::new(&db, &franchise);
    let seasons = history.lineage_keepers("lineage_0").unwrap();
    assert_eq!(seasons.len(), 1);
    assert_eq!(seasons[0].season, 2023);
    assert_eq!(seasons[0].keepers.len(), 1);
    let keeper = &seasons[0].keepers[0];
    assert_eq!(keeper.name, "Alpha One");
    assert_eq!(keeper.round_cost, 1);
    assert_eq!(keeper.tenure, Some(1));
}

#[tokio::test]
async fn top_batters_and_pitchers_split_pools() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let value = PlayerValue::new(&db, LEAGUE).unwrap();
    let batters = value.top_batters(1, 10).unwrap();
    // Batting pool: Alpha One and Beta One qualify (nonzero in stats 1-6).
    assert_eq!(batters.len(), 2);

    let pitchers = value.top_pitchers(1, 10).unwrap();
    // Pitching pool: only Alpha Two has a nonzero pitching stat.
    assert_eq!(pitchers.len(), 1);
    assert_eq!(pitchers[0].name, "Alpha Two");
}

// ===========================================================================
// Keepers and draft costs
// ===========================================================================

#[tokio::test]
async fn keeper_sync_costs_and_lineage() {
    let (db, franchise, _provider) = synced_fixture().await;

    sync_keepers(&db, &franchise).unwrap();

    let rows = keepers::get_keepers_by_season(&db, LEAGUE).unwrap();
    assert_eq!(rows.len(), 2);

    // Alpha One: drafted first by team A, never dropped -> cost 1.
    let alpha_one = rows.iter().find(|k| k.player_key == "458.p.101").unwrap();
    assert_eq!(alpha_one.round_cost, 1);
    assert_eq!(alpha_one.team_key, TEAM_A);
    // 2023 is the first season with keeper data, so the run starts here.
    assert_eq!(alpha_one.kept_from_season, Some(2023));

    // Alpha Two: drafted by team A but dropped during the season -> sentinel.
    let alpha_two = rows.iter().find(|k| k.player_key == "458.p.102").unwrap();
    assert_eq!(alpha_two.round_cost, 24);
    assert_eq!(alpha_two.team_key, TEAM_B);
}

#[tokio::test]
async fn draft_cost_sentinel_for_dropped_players() {
    let (db, _franchise, _provider) = synced_fixture().await;

    let roster = players::get_roster_with_draft_costs(&db, LEAGUE, TEAM_B, 1).unwrap();
    let by_key: HashMap<&str, u32> = roster
        .iter()
        .map(|r| (r.player_key.as_str(), r.draft_cost))
        .collect();

    // Beta One: team B's first pick, never dropped.
    assert_eq!(by_key["458.p.201"], 1);
    // Alpha Two was dropped (by team A) before team B picked them up; the
    // original pick index no longer applies.
    assert_eq!(by_key["458.p.102"], 24);
}

// ===========================================================================
// Streaks and records (seeded store)
// ===========================================================================

fn seed_league_row(db: &Database, league_key: &str, season: i32, end_week: u32) {
    db.execute(
        "INSERT INTO league (league_key, season, name, num_teams, scoring_type,
             num_scoring_cats, current_week, start_week, end_week, is_finished,
             last_synced)
         VALUES (?1, ?2, 'Seeded', 4, 'head', 10, ?3, 1, ?4, 1, '')",
        params![league_key, season, end_week, end_week],
    )
    .unwrap();
}

fn seed_team_row(db: &Database, league_key: &str, team_key: &str, guid: &str, name: &str) {
    db.execute(
        "INSERT INTO team (league_key, team_key, team_id, name, manager_guid,
             manager_name)
         VALUES (?1, ?2, 1, ?3, ?4, ?5)",
        params![league_key, team_key, name, guid, guid],
    )
    .unwrap();
}

#[allow(clippy::too_many_arguments)]
fn seed_matchup(
    db: &Database,
    league_key: &str,
    week: u32,
    matchup_id: u32,
    t1: &str,
    t2: &str,
    winner: Option<&str>,
    cats: (u32, u32, u32),
) {
    db.execute(
        "INSERT INTO matchup (league_key, week, matchup_id, team_key_1, team_key_2,
             cats_won_1, cats_won_2, cats_tied, winner_team_key, is_tied,
             is_playoffs, is_consolation)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,0,0)",
        params![
            league_key,
            week,
            matchup_id,
            t1,
            t2,
            cats.0,
            cats.1,
            cats.2,
            winner,
            winner.is_none(),
        ],
    )
    .unwrap();
}

/// Four managers over four weeks. Manager A's results are W, W, L, W; ties
/// elsewhere keep every other loss streak at one.
fn streak_fixture() -> Database {
    let db = Database::open(":memory:").unwrap();
    let lk = "500.l.1";
    seed_league_row(&db, lk, 2023, 4);
    for (tk, guid, name) in [
        ("500.l.1.t.1", "GA", "A"),
        ("500.l.1.t.2", "GB", "B"),
        ("500.l.1.t.3", "GC", "C"),
        ("500.l.1.t.4", "GD", "D"),
    ] {
        seed_team_row(&db, lk, tk, guid, name);
    }

    let (a, b, c, d) = ("500.l.1.t.1", "500.l.1.t.2", "500.l.1.t.3", "500.l.1.t.4");
    // Week 1: A beats B, C beats D.
    seed_matchup(&db, lk, 1, 0, a, b, Some(a), (6, 3, 1));
    seed_matchup(&db, lk, 1, 1, c, d, Some(c), (7, 2, 1));
    // Week 2: A beats C, B ties D.
    seed_matchup(&db, lk, 2, 0, a, c, Some(a), (8, 2, 0));
    seed_matchup(&db, lk, 2, 1, b, d, None, (5, 5, 0));
    // Week 3: D beats A, B ties C.
    seed_matchup(&db, lk, 3, 0, d, a, Some(d), (6, 4, 0));
    seed_matchup(&db, lk, 3, 1, b, c, None, (5, 5, 0));
    // Week 4: A beats D, B ties C.
    seed_matchup(&db, lk, 4, 0, a, d, Some(a), (9, 1, 0));
    seed_matchup(&db, lk, 4, 1, b, c, None, (5, 5, 0));
    db
}

#[test]
fn streak_reset_law() {
    let db = streak_fixture();
    let report = LeagueRecords::new(&db, false).records().unwrap();
    let streaks = &report.streaks;

    // A's W, W, L, W: the opening back-to-back wins are the longest run;
    // the loss at week 3 reset the count.
    assert_eq!(streaks.longest_win_streak.streak, 2);
    assert_eq!(streaks.longest_win_streak.manager, "GA");

    // No manager strings two losses together in this fixture.
    assert_eq!(streaks.longest_loss_streak.streak, 1);

    // B never loses after week 1: three straight non-losses.
    assert_eq!(streaks.longest_undefeated_streak.streak, 3);
    assert_eq!(streaks.longest_undefeated_streak.manager, "GB");
}

#[test]
fn current_streak_in_recent_form() {
    let db = streak_fixture();
    let profiler = TeamProfiler::new(&db, "500.l.1");
    let profiles = profiler.build_profiles(4).unwrap();

    let a = profiles.iter().find(|p| p.team_key == "500.l.1.t.1").unwrap();
    // Most recent first: W (w4), L (w3), W (w2).
    assert_eq!(a.last_3, vec!["W", "L", "W"]);
    assert_eq!(a.streak, 1);
}

#[test]
fn standings_sorted_wins_desc_losses_asc() {
    let db = streak_fixture();
    let standings = TeamProfiler::new(&db, "500.l.1").standings(4).unwrap();

    // A: 3-1-0, C: 1-2-1 (tie w3? C tied weeks 3 and 4), B: 1-1-2 ... verify
    // ordering properties rather than exact intermediate records.
    assert_eq!(standings[0].team_key, "500.l.1.t.1");
    for pair in standings.windows(2) {
        let (hi, lo) = (&pair[0], &pair[1]);
        assert!(
            hi.wins > lo.wins || (hi.wins == lo.wins && hi.losses <= lo.losses),
            "standings out of order: {hi:?} before {lo:?}"
        );
    }
}

#[test]
fn blowout_and_closest_match_records() {
    let db = streak_fixture();
    let report = LeagueRecords::new(&db, false).records().unwrap();
    let records = &report.matchup_records;

    let blowout = records.biggest_blowout.as_ref().unwrap();
    assert_eq!(blowout.score, "9-1-0");
    assert_eq!(blowout.week, 4);

    // Ties have margin zero and never count as the closest decided match.
    let closest = records.closest_match.as_ref().unwrap();
    assert_eq!(closest.score, "6-4-0");
    assert_eq!(closest.week, 3);
}
