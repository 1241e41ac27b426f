// CLI command handlers and terminal display.

use anyhow::{bail, Context, Result};

use crate::analytics::history::{self, LeagueRecords, ManagerHistory};
use crate::analytics::recap::RecapAssembler;
use crate::analytics::standings::TeamProfiler;
use crate::analytics::value::PlayerValue;
use crate::config::{self, Config, Franchise, ManagerEntry};
use crate::db::Database;
use crate::provider::http::HttpProvider;
use crate::queries::keepers as keeper_queries;
use crate::queries::leagues;
use crate::queries::teams;
use crate::sync::keepers::sync_keepers;
use crate::sync::SyncPipeline;

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Re-apply configured display names to synced team rows whose manager guid
/// has no resolved name yet.
pub fn refresh_manager_names(db: &Database, franchise: &Franchise) -> Result<()> {
    for (guid, _) in teams::get_unresolved_manager_guids(db)? {
        if let Some(name) = franchise.manager_name(&guid) {
            teams::update_manager_name(db, name, &guid)?;
        }
    }
    Ok(())
}

fn find_franchise<'c>(config: &'c Config, slug: &str) -> Result<&'c Franchise> {
    config
        .franchise_by_slug(slug)
        .with_context(|| format!("unknown franchise slug: '{slug}'"))
}

/// Open a franchise's database and resolve a league key, defaulting to the
/// latest synced season.
fn resolve_league(
    config: &Config,
    slug: &str,
    season: Option<i32>,
) -> Result<(Database, String)> {
    let franchise = find_franchise(config, slug)?;
    let db = Database::open_for_slug(&config.data_dir(), slug)?;
    refresh_manager_names(&db, franchise)?;

    if let Some(season) = season {
        let league_key = franchise
            .league_key_for_season(season)
            .with_context(|| format!("no league key configured for season {season}"))?;
        if leagues::get_league(&db, league_key)?.is_none() {
            bail!(
                "no synced data for {slug} season {season}; \
                 run: clubhouse sync {slug} --season {season}"
            );
        }
        let league_key = league_key.to_string();
        return Ok((db, league_key));
    }

    let Some(latest) = leagues::get_latest_league(&db)? else {
        bail!("no synced data for {slug}; run: clubhouse sync {slug}");
    };
    Ok((db, latest.league_key))
}

fn default_week(db: &Database, league_key: &str, week: Option<u32>) -> Result<u32> {
    if let Some(week) = week {
        return Ok(week);
    }
    let league = leagues::get_league(db, league_key)?
        .context("league metadata missing from store")?;
    Ok(if league.is_finished {
        league.end_week
    } else {
        league.current_week.saturating_sub(1).max(1)
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// `clubhouse franchises` — list configured franchises.
pub fn cmd_franchises(config: &Config) -> Result<()> {
    if config.franchises.is_empty() {
        println!("No franchises configured. Edit config/franchises.toml.");
        return Ok(());
    }
    for f in &config.franchises {
        let default = if f.default { " (default)" } else { "" };
        println!("{} [{:?}]{}  — {}", f.slug, f.sport, default, f.name);
        for year in f.season_years() {
            let key = f.league_key_for_season(year).unwrap_or("");
            println!("    {year}: {key}");
        }
    }
    Ok(())
}

/// `clubhouse sync <slug> [--season N] [--incremental]`
pub async fn cmd_sync(
    config: &Config,
    slug: &str,
    season: Option<i32>,
    incremental: bool,
) -> Result<()> {
    let franchise = find_franchise(config, slug)?;
    let db = Database::open_for_slug(&config.data_dir(), slug)?;
    let provider = HttpProvider::from_env()
        .context("provider credentials missing; set FANTASY_API_URL and FANTASY_API_TOKEN")?;

    let pipeline = SyncPipeline::new(&db, &provider, franchise);
    if incremental {
        pipeline.sync_incremental().await?;
    } else if let Some(season) = season {
        pipeline.sync_season(season).await?;
    } else {
        pipeline.sync_all().await?;
    }

    refresh_manager_names(&db, franchise)?;
    Ok(())
}

/// `clubhouse keepers <slug>` — derive keepers and lineage, then print the
/// latest season's keeper list.
pub fn cmd_keepers(config: &Config, slug: &str) -> Result<()> {
    let franchise = find_franchise(config, slug)?;
    let db = Database::open_for_slug(&config.data_dir(), slug)?;
    sync_keepers(&db, franchise)?;

    let Some(latest) = leagues::get_latest_league(&db)? else {
        println!("No synced data for {slug} yet.");
        return Ok(());
    };
    let rows = keeper_queries::get_keepers_by_season(&db, &latest.league_key)?;
    if rows.is_empty() {
        println!("No keepers recorded for {} ({}).", latest.season, latest.league_key);
        return Ok(());
    }

    println!("Keepers — season {}", latest.season);
    let mut current_team = String::new();
    for k in rows {
        if k.team_name != current_team {
            current_team = k.team_name.clone();
            let manager = k.manager_name.clone().unwrap_or_default();
            println!("\n  {current_team} ({manager})");
        }
        let tenure = match k.kept_from_season {
            Some(from) => format!("since {from}"),
            None => String::new(),
        };
        println!("    R{:<3} {:<28} {tenure}", k.round_cost, k.player_name);
    }
    Ok(())
}

/// `clubhouse managers <slug>` — cross-season manager table.
pub fn cmd_managers(config: &Config, slug: &str) -> Result<()> {
    let franchise = find_franchise(config, slug)?;
    let (db, _) = resolve_league(config, slug, None)?;

    let managers = ManagerHistory::new(&db, franchise).managers()?;
    println!(
        "{:<20} {:>4} {:>4} {:>4}  {:>5}  {:>6}  {:>5}  {:>5}",
        "Manager", "W", "L", "T", "Po-W", "Champs", "Best", "Worst"
    );
    for m in &managers {
        let marker = if m.is_current { "" } else { "*" };
        println!(
            "{:<20} {:>4} {:>4} {:>4}  {:>5}  {:>6}  {:>5}  {:>5}",
            format!("{}{marker}", m.name),
            m.wins,
            m.losses,
            m.ties,
            m.playoff_wins,
            m.championships,
            m.best_finish.map_or(String::from("-"), |f| f.to_string()),
            m.worst_finish.map_or(String::from("-"), |f| f.to_string()),
        );
    }
    println!("\n* former manager");
    Ok(())
}

/// `clubhouse records <slug> [--include-playoffs]` — all-time records.
pub fn cmd_records(config: &Config, slug: &str, include_playoffs: bool) -> Result<()> {
    let (db, _) = resolve_league(config, slug, None)?;
    let report = LeagueRecords::new(&db, include_playoffs).records()?;

    println!("Category records:");
    for c in &report.category_records {
        println!(
            "  {:<8} {:>8}  {} ({}), {} week {}",
            c.category, c.value, c.manager, c.team_name, c.season, c.week
        );
    }

    let s = &report.streaks;
    println!("\nStreaks:");
    println!(
        "  Longest win streak:        {} — {} ({})",
        s.longest_win_streak.streak,
        s.longest_win_streak.manager,
        s.longest_win_streak.team_name
    );
    println!(
        "  Longest loss streak:       {} — {} ({})",
        s.longest_loss_streak.streak,
        s.longest_loss_streak.manager,
        s.longest_loss_streak.team_name
    );
    println!(
        "  Longest undefeated streak: {} — {} ({})",
        s.longest_undefeated_streak.streak,
        s.longest_undefeated_streak.manager,
        s.longest_undefeated_streak.team_name
    );

    println!("\nMatchup records:");
    if let Some(b) = &report.matchup_records.biggest_blowout {
        println!(
            "  Biggest blowout: {} over {} {} ({} week {})",
            b.winner, b.loser, b.score, b.season, b.week
        );
    }
    if let Some(c) = &report.matchup_records.closest_match {
        println!(
            "  Closest match:   {} over {} {} ({} week {})",
            c.winner, c.loser, c.score, c.season, c.week
        );
    }
    Ok(())
}

/// `clubhouse standings <slug> [--week N] [--season N]`
pub fn cmd_standings(
    config: &Config,
    slug: &str,
    week: Option<u32>,
    season: Option<i32>,
) -> Result<()> {
    let (db, league_key) = resolve_league(config, slug, season)?;
    let week = default_week(&db, &league_key, week)?;

    let rows = TeamProfiler::new(&db, &league_key).standings(week)?;
    println!("Standings through week {week}:");
    println!("{:<4} {:<24} {:<16} {:>3}-{:<3}-{:>2}", "Rk", "Team", "Manager", "W", "L", "T");
    for r in &rows {
        println!(
            "{:<4} {:<24} {:<16} {:>3}-{:<3}-{:>2}",
            r.rank, r.team_name, r.manager, r.wins, r.losses, r.ties
        );
    }
    Ok(())
}

/// `clubhouse teams <slug> [--week N] [--season N]` — power rankings.
pub fn cmd_teams(
    config: &Config,
    slug: &str,
    week: Option<u32>,
    season: Option<i32>,
) -> Result<()> {
    let (db, league_key) = resolve_league(config, slug, season)?;
    let week = default_week(&db, &league_key, week)?;

    let profiles = TeamProfiler::new(&db, &league_key).build_profiles(week)?;
    println!("Power rankings — week {week}:");
    for p in &profiles {
        let movement = match p.prev_rank as i64 - p.rank as i64 {
            0 => String::from("  ="),
            d if d > 0 => format!(" +{d}"),
            d => format!(" {d}"),
        };
        println!(
            "\n{:>2}.{movement} {} ({}) — {}-{}-{}, streak {:+}",
            p.rank, p.team_name, p.manager, p.wins, p.losses, p.ties, p.streak
        );
        if !p.last_3.is_empty() {
            println!("      last 3: {}", p.last_3.join(" "));
        }
        if !p.cat_strengths.is_empty() {
            println!(
                "      strong: {}  weak: {}",
                p.cat_strengths.join(", "),
                p.cat_weaknesses.join(", ")
            );
        }
        if !p.mvp_name.is_empty() {
            println!("      MVP: {} ({:+.2})", p.mvp_name, p.mvp_z);
        }
        if !p.opponent_name.is_empty() {
            println!("      next: {} (h2h {})", p.opponent_name, p.h2h_record);
        }
    }
    Ok(())
}

/// `clubhouse value <slug> [--week N] [--season N]` — z-score rankings.
pub fn cmd_value(
    config: &Config,
    slug: &str,
    week: Option<u32>,
    season: Option<i32>,
) -> Result<()> {
    let (db, league_key) = resolve_league(config, slug, season)?;
    let week = default_week(&db, &league_key, week)?;

    let value = PlayerValue::new(&db, &league_key)?;
    let batters = value.top_batters(week, 10)?;
    let pitchers = value.top_pitchers(week, 10)?;

    if pitchers.is_empty() {
        println!("Top players — week {week}:");
        print_ranks(&batters);
    } else {
        println!("Top batters — week {week}:");
        print_ranks(&batters);
        println!("\nTop pitchers — week {week}:");
        print_ranks(&pitchers);
    }

    let pickups = value.best_pickups(1, 5)?;
    if !pickups.is_empty() {
        println!("\nBest pickups:");
        for p in &pickups {
            println!(
                "    {:<24} +{:<6.1} (week {}, {})",
                p.name, p.total_value, p.add_week, p.team_name
            );
        }
    }
    Ok(())
}

fn print_ranks(ranks: &[crate::analytics::value::PlayerRank]) {
    for (i, r) in ranks.iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:<4} {:>6.2}  {} ({})",
            i + 1,
            r.name,
            r.position,
            r.z_total,
            r.team_name,
            r.manager
        );
    }
}

/// `clubhouse recap <slug> [--week N] [--season N]`
pub fn cmd_recap(
    config: &Config,
    slug: &str,
    week: Option<u32>,
    season: Option<i32>,
) -> Result<()> {
    let (db, league_key) = resolve_league(config, slug, season)?;
    let week = default_week(&db, &league_key, week)?;

    let recap = RecapAssembler::new(&db, &league_key).build(week)?;
    println!(
        "{} — week {} ({} to {})",
        recap.league_name, recap.week, recap.week_start, recap.week_end
    );

    println!("\nMatchups:");
    for m in &recap.matchups {
        let tag = if m.is_playoffs {
            " [playoffs]"
        } else if m.is_consolation {
            " [consolation]"
        } else {
            ""
        };
        println!(
            "  {} {} - {} {}  ({} tied){tag}  winner: {}",
            m.team_1_name, m.cats_won_1, m.cats_won_2, m.team_2_name, m.cats_tied, m.winner_name
        );
    }

    if let Some(b) = &recap.batter_of_week {
        println!("\nBatter of the week:  {} ({:+.2})", b.name, b.z_total);
    }
    if let Some(p) = &recap.pitcher_of_week {
        println!("Pitcher of the week: {} ({:+.2})", p.name, p.z_total);
    }
    if let Some(p) = &recap.player_of_week {
        println!("\nPlayer of the week: {} ({:+.2})", p.name, p.z_total);
    }

    println!("\nStandings:");
    for s in &recap.standings {
        println!(
            "  {:>2}. {:<24} {}-{}-{}",
            s.rank, s.team_name, s.wins, s.losses, s.ties
        );
    }

    if !recap.transactions.is_empty() {
        println!("\nTransactions this week: {}", recap.transactions.len());
    }
    Ok(())
}

/// `clubhouse discover <slug>` — find unconfigured manager guids, write them
/// into the config with their source nicknames, and re-resolve names.
pub fn cmd_discover(config: &Config, slug: &str) -> Result<()> {
    let franchise = find_franchise(config, slug)?;
    let db = Database::open_for_slug(&config.data_dir(), slug)?;

    let discovered = history::discover_unconfigured_managers(&db, franchise)?;
    if discovered.is_empty() {
        println!("All synced managers are configured.");
        return Ok(());
    }

    let entries: Vec<ManagerEntry> = discovered
        .iter()
        .map(|(guid, nickname)| ManagerEntry {
            guid: guid.clone(),
            name: if nickname.is_empty() {
                guid.clone()
            } else {
                nickname.clone()
            },
            short_name: None,
        })
        .collect();
    let added = config.add_managers(slug, &entries)?;
    for guid in &added {
        println!("added manager {guid}");
    }

    // Reload the mutated config and push the new names into synced rows.
    let reloaded = config::load_config_from(config.base_dir())?;
    let franchise = reloaded
        .franchise_by_slug(slug)
        .context("franchise vanished after config reload")?;
    refresh_manager_names(&db, franchise)?;
    println!(
        "{} managers added; edit config/franchises.toml to adjust display names.",
        added.len()
    );
    Ok(())
}
