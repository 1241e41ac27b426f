// Clubhouse entry point: league history sync and analytics CLI.

use anyhow::{Context, Result};

use clubhouse::api;
use clubhouse::cli;
use clubhouse::config;

const USAGE: &str = "\
Usage:
  clubhouse franchises                       — Show configured franchises

  clubhouse sync <slug>                      — Sync all seasons for a franchise
  clubhouse sync <slug> --season <year>      — Sync one season
  clubhouse sync <slug> --incremental        — Catch up the current season
  clubhouse keepers <slug>                   — Derive keepers and lineage

  clubhouse standings <slug> [--week N]      — Standings through a week
  clubhouse teams <slug> [--week N]          — Power rankings
  clubhouse value <slug> [--week N]          — Z-score player rankings
  clubhouse recap <slug> [--week N]          — Weekly recap
  clubhouse managers <slug>                  — Cross-season manager records
  clubhouse records <slug>                   — All-time league records
  clubhouse discover <slug>                  — Find unconfigured manager ids

  clubhouse serve [--port N]                 — Run the HTTP API (default 8000)

Common flags: --season <year> selects a synced season; weeks default to the
latest completed week.";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("Clubhouse — fantasy league history\n\n{USAGE}");
        return Ok(());
    };

    let config = config::load_config().context("failed to load configuration")?;

    match command {
        "franchises" => cli::cmd_franchises(&config)?,
        "sync" => {
            let slug = require_slug(&args)?;
            let season = parse_season(&args)?;
            let incremental = has_flag(&args, "--incremental");
            cli::cmd_sync(&config, slug, season, incremental).await?;
        }
        "keepers" => cli::cmd_keepers(&config, require_slug(&args)?)?,
        "standings" => {
            let slug = require_slug(&args)?;
            cli::cmd_standings(&config, slug, parse_week(&args)?, parse_season(&args)?)?;
        }
        "teams" => {
            let slug = require_slug(&args)?;
            cli::cmd_teams(&config, slug, parse_week(&args)?, parse_season(&args)?)?;
        }
        "value" => {
            let slug = require_slug(&args)?;
            cli::cmd_value(&config, slug, parse_week(&args)?, parse_season(&args)?)?;
        }
        "recap" => {
            let slug = require_slug(&args)?;
            cli::cmd_recap(&config, slug, parse_week(&args)?, parse_season(&args)?)?;
        }
        "managers" => cli::cmd_managers(&config, require_slug(&args)?)?,
        "records" => {
            let slug = require_slug(&args)?;
            cli::cmd_records(&config, slug, has_flag(&args, "--include-playoffs"))?;
        }
        "discover" => cli::cmd_discover(&config, require_slug(&args)?)?,
        "serve" => {
            let port = parse_flag_value(&args, "--port")?
                .unwrap_or(8000u16);
            api::serve(config.base_dir().to_path_buf(), port).await?;
        }
        other => {
            println!("Unknown command: {other}\n\n{USAGE}");
        }
    }

    Ok(())
}

fn require_slug(args: &[String]) -> Result<&str> {
    args.get(1)
        .map(String::as_str)
        .filter(|s| !s.starts_with("--"))
        .context("missing franchise slug (try `clubhouse franchises`)")
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(idx) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args
        .get(idx + 1)
        .with_context(|| format!("{flag} requires a value"))?;
    value
        .parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid value for {flag}: {value}"))
}

fn parse_season(args: &[String]) -> Result<Option<i32>> {
    parse_flag_value(args, "--season")
}

fn parse_week(args: &[String]) -> Result<Option<u32>> {
    parse_flag_value(args, "--week")
}

/// Send tracing output to stderr so stdout stays clean for command output.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clubhouse=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
