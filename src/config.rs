// Configuration loading and parsing (config/franchises.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to write config file {path}: {message}")]
    WriteError { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Sports
// ---------------------------------------------------------------------------

/// Supported sports. Drives bench-position sets and category pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Mlb,
    Nba,
}

impl Sport {
    /// Roster position codes that do NOT count as a starting slot.
    /// Baseball carries its disabled-list codes, basketball its injury codes.
    pub fn bench_positions(self) -> &'static [&'static str] {
        match self {
            Sport::Mlb => &["BN", "IL", "IL+", "NA", "DL"],
            Sport::Nba => &["BN", "IL", "IL+", "INJ", "NA"],
        }
    }

    pub fn is_bench_position(self, position: &str) -> bool {
        self.bench_positions().contains(&position)
    }
}

// ---------------------------------------------------------------------------
// franchises.toml structs
// ---------------------------------------------------------------------------

/// Top-level file: a list of `[[franchise]]` tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FranchisesFile {
    #[serde(default)]
    franchise: Vec<Franchise>,
}

/// One configured league that spans multiple seasons under a single slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Franchise {
    pub slug: String,
    pub name: String,
    pub sport: Sport,
    #[serde(default)]
    pub default: bool,
    /// Expected keepers per team, used by the keeper fallback heuristic.
    #[serde(default)]
    pub keepers_per_team: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<SeasonEntry>,
    #[serde(default)]
    pub managers: Vec<ManagerEntry>,
    #[serde(default)]
    pub former_managers: Vec<ManagerEntry>,
    /// Ownership-spanning team lineages (a team identity that survives
    /// manager turnover). Optional; empty means no lineage tracking.
    #[serde(default)]
    pub lineages: Vec<Lineage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonEntry {
    pub year: i32,
    pub league_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerEntry {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
    pub name: String,
    /// Ownership intervals in order; the first matching interval wins.
    pub owners: Vec<OwnershipSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipSpan {
    pub guid: String,
    pub from: i32,
    /// Inclusive end season; `None` means the span is still open.
    #[serde(default)]
    pub to: Option<i32>,
}

impl Franchise {
    pub fn latest_season(&self) -> Option<i32> {
        self.seasons.iter().map(|s| s.year).max()
    }

    pub fn min_season(&self) -> Option<i32> {
        self.seasons.iter().map(|s| s.year).min()
    }

    pub fn latest_league_key(&self) -> Option<&str> {
        let latest = self.latest_season()?;
        self.league_key_for_season(latest)
    }

    pub fn league_key_for_season(&self, season: i32) -> Option<&str> {
        self.seasons
            .iter()
            .find(|s| s.year == season)
            .map(|s| s.league_key.as_str())
    }

    pub fn season_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.seasons.iter().map(|s| s.year).collect();
        years.sort_unstable();
        years
    }

    /// Resolve a manager's display name. Active managers take precedence
    /// over former ones; unknown guids yield `None`.
    pub fn manager_name(&self, guid: &str) -> Option<&str> {
        self.managers
            .iter()
            .chain(self.former_managers.iter())
            .find(|m| m.guid == guid)
            .map(|m| m.name.as_str())
    }

    pub fn manager_short_name(&self, guid: &str) -> Option<&str> {
        self.managers
            .iter()
            .chain(self.former_managers.iter())
            .find(|m| m.guid == guid)
            .and_then(|m| m.short_name.as_deref())
    }

    /// Guids of currently active managers.
    pub fn current_manager_guids(&self) -> HashSet<&str> {
        self.managers.iter().map(|m| m.guid.as_str()).collect()
    }

    pub fn has_lineages(&self) -> bool {
        !self.lineages.is_empty()
    }

    /// Map a (manager guid, season) pair to a lineage id like `lineage_0`.
    ///
    /// Scans lineages in config order and each lineage's ownership spans in
    /// order; the first span whose guid matches and whose [from, to] range
    /// contains the season wins. A miss means the manager/season is not part
    /// of any tracked lineage, which callers must treat as ordinary data.
    pub fn resolve_lineage(&self, guid: &str, season: i32) -> Option<String> {
        for (idx, lineage) in self.lineages.iter().enumerate() {
            for span in &lineage.owners {
                if span.guid != guid {
                    continue;
                }
                if season < span.from {
                    continue;
                }
                if let Some(to) = span.to {
                    if season > to {
                        continue;
                    }
                }
                return Some(lineage_id(idx));
            }
        }
        None
    }

    /// Lineage summaries for API responses: id, name, current owner, spans.
    pub fn lineage_list(&self) -> Vec<LineageSummary> {
        self.lineages
            .iter()
            .enumerate()
            .map(|(idx, lineage)| {
                let current = lineage
                    .owners
                    .last()
                    .map(|span| {
                        self.manager_name(&span.guid)
                            .unwrap_or(span.guid.as_str())
                            .to_string()
                    })
                    .unwrap_or_default();
                LineageSummary {
                    id: lineage_id(idx),
                    name: lineage.name.clone(),
                    current_manager: current,
                    ownership: lineage
                        .owners
                        .iter()
                        .map(|span| OwnershipSummary {
                            manager: self
                                .manager_name(&span.guid)
                                .unwrap_or(span.guid.as_str())
                                .to_string(),
                            guid: span.guid.clone(),
                            from: span.from,
                            to: span.to,
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

fn lineage_id(idx: usize) -> String {
    format!("lineage_{idx}")
}

#[derive(Debug, Clone, Serialize)]
pub struct LineageSummary {
    pub id: String,
    pub name: String,
    pub current_manager: String,
    pub ownership: Vec<OwnershipSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnershipSummary {
    pub manager: String,
    pub guid: String,
    pub from: i32,
    pub to: Option<i32>,
}

// ---------------------------------------------------------------------------
// Assembled config
// ---------------------------------------------------------------------------

/// The loaded franchise configuration plus the directory it came from.
///
/// This is an explicitly-passed value, not ambient state: anything that
/// mutates the config (manager discovery) must reload and re-inject it.
#[derive(Debug, Clone)]
pub struct Config {
    pub franchises: Vec<Franchise>,
    base_dir: PathBuf,
}

impl Config {
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the per-franchise SQLite files.
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn franchise_by_slug(&self, slug: &str) -> Option<&Franchise> {
        self.franchises.iter().find(|f| f.slug == slug)
    }

    /// Default franchise for a sport: the one flagged `default`, else the
    /// first configured for that sport.
    pub fn default_for_sport(&self, sport: Sport) -> Option<&Franchise> {
        self.franchises
            .iter()
            .find(|f| f.sport == sport && f.default)
            .or_else(|| self.franchises.iter().find(|f| f.sport == sport))
    }

    /// Add newly discovered managers to a franchise and persist the file.
    /// Returns the guids that were actually added (existing ones skipped).
    /// Callers should reload the config afterwards.
    pub fn add_managers(
        &self,
        slug: &str,
        discovered: &[ManagerEntry],
    ) -> Result<Vec<String>, ConfigError> {
        let path = franchises_path(&self.base_dir);
        let mut file = read_franchises_file(&path)?;

        let mut added = Vec::new();
        for franchise in file.franchise.iter_mut() {
            if franchise.slug != slug {
                continue;
            }
            let known: HashSet<String> = franchise
                .managers
                .iter()
                .chain(franchise.former_managers.iter())
                .map(|m| m.guid.clone())
                .collect();
            for entry in discovered {
                if known.contains(&entry.guid) {
                    continue;
                }
                franchise.managers.push(entry.clone());
                added.push(entry.guid.clone());
            }
        }

        if !added.is_empty() {
            let text = toml::to_string_pretty(&file).map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                message: e.to_string(),
            })?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(added)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

fn franchises_path(base_dir: &Path) -> PathBuf {
    base_dir.join("config").join("franchises.toml")
}

fn read_franchises_file(path: &Path) -> Result<FranchisesFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load and validate franchise configuration from
/// `<base_dir>/config/franchises.toml`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = franchises_path(base_dir);
    let file = read_franchises_file(&path)?;

    let config = Config {
        franchises: file.franchise,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/franchises.toml` exists by copying the shipped default.
/// Existing files are never overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = franchises_path(base_dir);
    if target.exists() {
        return Ok(false);
    }

    let default = base_dir.join("defaults").join("franchises.toml");
    if !default.exists() {
        return Err(ConfigError::FileNotFound { path: default });
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: target.clone(),
            message: e.to_string(),
        })?;
    }
    std::fs::copy(&default, &target).map_err(|e| ConfigError::WriteError {
        path: target.clone(),
        message: e.to_string(),
    })?;

    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying the default file into place first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut slugs = HashSet::new();
    for franchise in &config.franchises {
        if franchise.slug.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "franchise.slug".into(),
                message: "must not be empty".into(),
            });
        }
        if !slugs.insert(franchise.slug.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "franchise.slug".into(),
                message: format!("duplicate slug `{}`", franchise.slug),
            });
        }

        let mut years = HashSet::new();
        for season in &franchise.seasons {
            if season.league_key.is_empty() {
                return Err(ConfigError::ValidationError {
                    field: format!("franchise.{}.seasons", franchise.slug),
                    message: format!("season {} has an empty league_key", season.year),
                });
            }
            if !years.insert(season.year) {
                return Err(ConfigError::ValidationError {
                    field: format!("franchise.{}.seasons", franchise.slug),
                    message: format!("duplicate season {}", season.year),
                });
            }
        }

        for lineage in &franchise.lineages {
            if lineage.owners.is_empty() {
                return Err(ConfigError::ValidationError {
                    field: format!("franchise.{}.lineages", franchise.slug),
                    message: format!("lineage `{}` has no owners", lineage.name),
                });
            }
            for span in &lineage.owners {
                if let Some(to) = span.to {
                    if to < span.from {
                        return Err(ConfigError::ValidationError {
                            field: format!("franchise.{}.lineages", franchise.slug),
                            message: format!(
                                "lineage `{}` span for {} ends before it starts ({} > {})",
                                lineage.name, span.guid, span.from, to
                            ),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = r#"
[[franchise]]
slug = "baseball"
name = "Hot Stove League"
sport = "mlb"
default = true

[[franchise.seasons]]
year = 2022
league_key = "412.l.1001"

[[franchise.seasons]]
year = 2023
league_key = "422.l.1002"

[[franchise.managers]]
guid = "GUID_A"
name = "Alice"
short_name = "A"

[[franchise.former_managers]]
guid = "GUID_B"
name = "Bob"

[[franchise.lineages]]
name = "The Regulators"

[[franchise.lineages.owners]]
guid = "GUID_B"
from = 2022
to = 2022

[[franchise.lineages.owners]]
guid = "GUID_A"
from = 2023

[[franchise]]
slug = "basketball"
name = "Hardwood"
sport = "nba"
keepers_per_team = 2

[[franchise.seasons]]
year = 2023
league_key = "428.l.2001"
"#;

    fn write_sample(dir_name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(dir_name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/franchises.toml"), SAMPLE).unwrap();
        tmp
    }

    #[test]
    fn load_sample_config() {
        let tmp = write_sample("clubhouse_config_load");
        let config = load_config_from(&tmp).expect("should load");

        assert_eq!(config.franchises.len(), 2);
        let fr = config.franchise_by_slug("baseball").unwrap();
        assert_eq!(fr.name, "Hot Stove League");
        assert_eq!(fr.sport, Sport::Mlb);
        assert!(fr.default);
        assert_eq!(fr.latest_season(), Some(2023));
        assert_eq!(fr.min_season(), Some(2022));
        assert_eq!(fr.league_key_for_season(2022), Some("412.l.1001"));
        assert_eq!(fr.latest_league_key(), Some("422.l.1002"));
        assert_eq!(fr.season_years(), vec![2022, 2023]);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manager_name_checks_active_then_former() {
        let tmp = write_sample("clubhouse_config_mgr");
        let config = load_config_from(&tmp).unwrap();
        let fr = config.franchise_by_slug("baseball").unwrap();

        assert_eq!(fr.manager_name("GUID_A"), Some("Alice"));
        assert_eq!(fr.manager_name("GUID_B"), Some("Bob"));
        assert_eq!(fr.manager_name("GUID_X"), None);
        assert_eq!(fr.manager_short_name("GUID_A"), Some("A"));
        assert_eq!(fr.manager_short_name("GUID_B"), None);

        assert!(fr.current_manager_guids().contains("GUID_A"));
        assert!(!fr.current_manager_guids().contains("GUID_B"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn lineage_resolution_first_matching_span_wins() {
        let tmp = write_sample("clubhouse_config_lineage");
        let config = load_config_from(&tmp).unwrap();
        let fr = config.franchise_by_slug("baseball").unwrap();

        assert_eq!(fr.resolve_lineage("GUID_B", 2022), Some("lineage_0".into()));
        assert_eq!(fr.resolve_lineage("GUID_A", 2023), Some("lineage_0".into()));
        // Outside the configured span
        assert_eq!(fr.resolve_lineage("GUID_B", 2023), None);
        assert_eq!(fr.resolve_lineage("GUID_A", 2022), None);
        // Unconfigured manager
        assert_eq!(fr.resolve_lineage("GUID_X", 2023), None);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn lineage_list_names_current_owner() {
        let tmp = write_sample("clubhouse_config_lineage_list");
        let config = load_config_from(&tmp).unwrap();
        let fr = config.franchise_by_slug("baseball").unwrap();

        let list = fr.lineage_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "lineage_0");
        assert_eq!(list[0].current_manager, "Alice");
        assert_eq!(list[0].ownership.len(), 2);
        assert_eq!(list[0].ownership[0].manager, "Bob");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn default_for_sport_prefers_flagged() {
        let tmp = write_sample("clubhouse_config_default");
        let config = load_config_from(&tmp).unwrap();

        assert_eq!(config.default_for_sport(Sport::Mlb).unwrap().slug, "baseball");
        // basketball has no default flag; first configured wins
        assert_eq!(
            config.default_for_sport(Sport::Nba).unwrap().slug,
            "basketball"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn bench_positions_per_sport() {
        assert!(Sport::Mlb.is_bench_position("DL"));
        assert!(!Sport::Mlb.is_bench_position("INJ"));
        assert!(Sport::Nba.is_bench_position("INJ"));
        assert!(!Sport::Nba.is_bench_position("SS"));
        assert!(!Sport::Mlb.is_bench_position("C"));
    }

    #[test]
    fn rejects_duplicate_season() {
        let tmp = std::env::temp_dir().join("clubhouse_config_dup_season");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(
            tmp.join("config/franchises.toml"),
            r#"
[[franchise]]
slug = "baseball"
name = "Test"
sport = "mlb"

[[franchise.seasons]]
year = 2023
league_key = "a.l.1"

[[franchise.seasons]]
year = 2023
league_key = "a.l.2"
"#,
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "franchise.baseball.seasons");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_inverted_ownership_span() {
        let tmp = std::env::temp_dir().join("clubhouse_config_bad_span");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(
            tmp.join("config/franchises.toml"),
            r#"
[[franchise]]
slug = "baseball"
name = "Test"
sport = "mlb"

[[franchise.lineages]]
name = "Bad"

[[franchise.lineages.owners]]
guid = "G"
from = 2023
to = 2020
"#,
        )
        .unwrap();

        assert!(load_config_from(&tmp).is_err());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let tmp = std::env::temp_dir().join("clubhouse_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("franchises.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn add_managers_appends_and_skips_existing() {
        let tmp = write_sample("clubhouse_config_add_mgrs");
        let config = load_config_from(&tmp).unwrap();

        let added = config
            .add_managers(
                "baseball",
                &[
                    ManagerEntry {
                        guid: "GUID_A".into(),
                        name: "Alice Again".into(),
                        short_name: None,
                    },
                    ManagerEntry {
                        guid: "GUID_C".into(),
                        name: "Carol".into(),
                        short_name: Some("C".into()),
                    },
                ],
            )
            .unwrap();
        assert_eq!(added, vec!["GUID_C".to_string()]);

        // Reload and verify the new manager is visible
        let reloaded = load_config_from(&tmp).unwrap();
        let fr = reloaded.franchise_by_slug("baseball").unwrap();
        assert_eq!(fr.manager_name("GUID_C"), Some("Carol"));
        // Existing entry untouched
        assert_eq!(fr.manager_name("GUID_A"), Some("Alice"));

        let _ = fs::remove_dir_all(&tmp);
    }
}
