// Thin HTTP surface over the analytics engine. No business logic here: every
// handler resolves its league/week, calls into analytics, and maps the
// result to JSON.

use std::path::PathBuf;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::analytics::history::{LeagueRecords, ManagerHistory};
use crate::analytics::recap::RecapAssembler;
use crate::analytics::standings::TeamProfiler;
use crate::config::{self, Config, Franchise};
use crate::db::Database;
use crate::queries::keepers as keeper_queries;
use crate::queries::leagues;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(e: config::ConfigError) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Internal(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// State and router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ApiState {
    pub base_dir: PathBuf,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/franchises", get(list_franchises))
        .route("/api/:slug/seasons", get(franchise_seasons))
        .route("/api/:slug/recap", get(recap))
        .route("/api/:slug/teams", get(teams))
        .route("/api/:slug/managers", get(managers))
        .route("/api/:slug/records", get(records))
        .route("/api/:slug/keepers", get(keepers))
        .with_state(state)
}

/// Bind and serve the API.
pub async fn serve(base_dir: PathBuf, port: u16) -> Result<()> {
    let app = router(ApiState { base_dir });
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Config is loaded per request: it is a small file, and mutation elsewhere
/// (manager discovery) must be visible without a restart.
fn load_state_config(state: &ApiState) -> Result<Config, ApiError> {
    Ok(config::load_config_from(&state.base_dir)?)
}

fn find_franchise<'c>(config: &'c Config, slug: &str) -> Result<&'c Franchise, ApiError> {
    config
        .franchise_by_slug(slug)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown franchise: {slug}")))
}

fn open_db(config: &Config, slug: &str) -> Result<Database, ApiError> {
    Ok(Database::open_for_slug(&config.data_dir(), slug)?)
}

/// Resolve a league key for a franchise slug and optional season.
fn resolve_league(
    franchise: &Franchise,
    db: &Database,
    season: Option<i32>,
) -> Result<String, ApiError> {
    if let Some(season) = season {
        let league_key = franchise.league_key_for_season(season).ok_or_else(|| {
            ApiError::NotFound(format!("No league key for season {season}"))
        })?;
        if leagues::get_league(db, league_key)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "No synced data for {} season {season}",
                franchise.slug
            )));
        }
        return Ok(league_key.to_string());
    }

    let latest = leagues::get_latest_league(db)?.ok_or_else(|| {
        ApiError::NotFound(format!("No synced data for {}", franchise.slug))
    })?;
    Ok(latest.league_key)
}

/// Resolve a week number, defaulting to the latest completed week.
fn resolve_week(db: &Database, league_key: &str, week: Option<u32>) -> Result<u32, ApiError> {
    if let Some(week) = week {
        return Ok(week);
    }
    let league = leagues::get_league(db, league_key)?
        .ok_or_else(|| ApiError::NotFound("League not found in store".to_string()))?;
    Ok(if league.is_finished {
        league.end_week
    } else {
        league.current_week.saturating_sub(1).max(1)
    })
}

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WeekSeasonQuery {
    week: Option<u32>,
    season: Option<i32>,
}

#[derive(Deserialize)]
struct RecordsQuery {
    #[serde(default)]
    include_playoffs: bool,
}

#[derive(Deserialize)]
struct SeasonQuery {
    season: Option<i32>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_franchises(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let result: Vec<serde_json::Value> = config
        .franchises
        .iter()
        .map(|f| {
            json!({
                "sport": f.sport,
                "name": f.name,
                "slug": f.slug,
                "is_default": f.default,
                "seasons": f.season_years(),
                "latest_season": f.latest_season(),
            })
        })
        .collect();
    Ok(Json(json!(result)))
}

async fn franchise_seasons(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let _ = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let seasons: Vec<serde_json::Value> = leagues::get_all_seasons(&db)?
        .into_iter()
        .map(|s| {
            json!({
                "league_key": s.league_key,
                "season": s.season,
                "name": s.name,
                "is_finished": s.is_finished,
            })
        })
        .collect();
    Ok(Json(json!(seasons)))
}

async fn recap(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(params): Query<WeekSeasonQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let franchise = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let league_key = resolve_league(franchise, &db, params.season)?;
    let week = resolve_week(&db, &league_key, params.week)?;

    let recap = RecapAssembler::new(&db, &league_key).build(week)?;
    Ok(Json(serde_json::to_value(recap).map_err(anyhow::Error::from)?))
}

async fn teams(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(params): Query<WeekSeasonQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let franchise = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let league_key = resolve_league(franchise, &db, params.season)?;
    let week = resolve_week(&db, &league_key, params.week)?;

    let profiles = TeamProfiler::new(&db, &league_key).build_profiles(week)?;
    Ok(Json(json!({
        "league_key": league_key,
        "week": week,
        "profiles": profiles,
    })))
}

async fn managers(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let franchise = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let history = ManagerHistory::new(&db, franchise);
    let mut result = json!({
        "managers": history.managers()?,
        "h2h": history.h2h_matrix()?,
    });
    if franchise.has_lineages() {
        result["lineages"] = serde_json::to_value(franchise.lineage_list())
            .map_err(anyhow::Error::from)?;
        result["lineage_h2h"] = serde_json::to_value(history.lineage_h2h_matrix()?)
            .map_err(anyhow::Error::from)?;
        result["lineage_stats"] = serde_json::to_value(history.lineage_stats()?)
            .map_err(anyhow::Error::from)?;
    }
    Ok(Json(result))
}

async fn records(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let _ = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let report = LeagueRecords::new(&db, params.include_playoffs).records()?;
    Ok(Json(serde_json::to_value(report).map_err(anyhow::Error::from)?))
}

async fn keepers(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    Query(params): Query<SeasonQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let config = load_state_config(&state)?;
    let franchise = find_franchise(&config, &slug)?;
    let db = open_db(&config, &slug)?;

    let league_key = resolve_league(franchise, &db, params.season)?;
    let rows = keeper_queries::get_keepers_by_season(&db, &league_key)?;
    let result: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|k| {
            json!({
                "player_name": k.player_name,
                "player_key": k.player_key,
                "team_key": k.team_key,
                "team_name": k.team_name,
                "manager": k.manager_name,
                "round_cost": k.round_cost,
                "kept_from_season": k.kept_from_season,
            })
        })
        .collect();
    Ok(Json(json!({ "league_key": league_key, "keepers": result })))
}
