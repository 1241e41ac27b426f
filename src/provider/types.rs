// Response types for the platform API, with normalization for its
// dynamically-typed fields.

use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Flexible scalar decoding
// ---------------------------------------------------------------------------

/// Decode a value that may arrive as a JSON string or number into a String.
/// Missing/null becomes `None`.
pub fn de_opt_stringly<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(raw.map(|r| match r {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

/// Decode a flag that may arrive as a JSON bool or 0/1 number.
pub fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Int(i)) => i != 0,
        None => false,
    })
}

/// The source's per-player "kept" indicator. Depending on season it arrives
/// as a bare bool, a 0/1 number, or a structure with a `kept` field and an
/// optional cost.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeeperFlag {
    Flag(bool),
    Numeric(i64),
    Detail {
        #[serde(default, deserialize_with = "de_flag")]
        kept: bool,
        #[serde(default)]
        cost: Option<u32>,
    },
}

impl KeeperFlag {
    pub fn is_kept(&self) -> bool {
        match self {
            KeeperFlag::Flag(b) => *b,
            KeeperFlag::Numeric(n) => *n != 0,
            KeeperFlag::Detail { kept, .. } => *kept,
        }
    }
}

impl Default for KeeperFlag {
    fn default() -> Self {
        KeeperFlag::Flag(false)
    }
}

// ---------------------------------------------------------------------------
// League metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueInfo {
    pub league_key: String,
    pub season: i32,
    pub name: String,
    pub num_teams: u32,
    #[serde(default)]
    pub scoring_type: String,
    /// Self-reported and unreliable for historical seasons: start/end may be
    /// swapped, and current_week can reflect the live season instead of the
    /// one being queried. The week-repair pass recomputes all three.
    pub current_week: u32,
    pub start_week: u32,
    pub end_week: u32,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_finished: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueSettings {
    #[serde(default)]
    pub playoff_start_week: Option<u32>,
    #[serde(default, deserialize_with = "de_flag")]
    pub uses_faab: bool,
    #[serde(default)]
    pub stat_categories: Vec<StatCategoryDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatCategoryDef {
    pub stat_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// 1 = higher is better, 0 = lower is better. Defaults to 1 when absent.
    #[serde(default = "default_sort_order")]
    pub sort_order: u8,
    /// "B" (batting), "P" (pitching), or absent for single-pool sports.
    #[serde(default)]
    pub position_type: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_only_display_stat: bool,
}

fn default_sort_order() -> u8 {
    1
}

impl StatCategoryDef {
    pub fn is_scoring(&self) -> bool {
        !self.is_only_display_stat
    }
}

// ---------------------------------------------------------------------------
// Teams and standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TeamEntry {
    pub team_key: String,
    pub team_id: u32,
    pub name: String,
    /// First manager's stable guid; absent for unowned/orphaned teams.
    #[serde(default)]
    pub manager_guid: Option<String>,
    #[serde(default)]
    pub manager_nickname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingsEntry {
    pub team_key: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub playoff_seed: Option<u32>,
    #[serde(default)]
    pub waiver_priority: Option<u32>,
    #[serde(default)]
    pub faab_balance: Option<f64>,
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchupEntry {
    pub team_key_1: String,
    pub team_key_2: String,
    /// Category counts won by each side (the week's "points" in a
    /// head-to-head categories league).
    #[serde(default)]
    pub points_1: f64,
    #[serde(default)]
    pub points_2: f64,
    #[serde(default)]
    pub winner_team_key: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_tied: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_playoffs: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_consolation: bool,
    #[serde(default)]
    pub week_start: String,
    #[serde(default)]
    pub week_end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatValue {
    pub stat_id: u32,
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// Rosters and players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub player: PlayerEntry,
    #[serde(default)]
    pub selected_position: Option<String>,
    #[serde(default)]
    pub keeper: KeeperFlag,
    #[serde(default)]
    pub stats: Vec<StatValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub player_key: String,
    #[serde(default, deserialize_with = "de_opt_stringly")]
    pub player_id: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub editorial_team_abbr: String,
    #[serde(default)]
    pub display_position: String,
    #[serde(default)]
    pub eligible_positions: Vec<String>,
    #[serde(default)]
    pub headshot_url: String,
}

// ---------------------------------------------------------------------------
// Draft and transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DraftPickEntry {
    pub pick: u32,
    pub round: u32,
    pub team_key: String,
    pub player_key: String,
    #[serde(default)]
    pub cost: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEntry {
    pub transaction_key: String,
    #[serde(rename = "type", default)]
    pub txn_type: String,
    #[serde(default)]
    pub status: String,
    /// Epoch seconds. The week is computed locally after weekly sync.
    pub timestamp: i64,
    #[serde(default)]
    pub trader_team_key: Option<String>,
    #[serde(default)]
    pub tradee_team_key: Option<String>,
    #[serde(default)]
    pub faab_bid: Option<u32>,
    #[serde(default)]
    pub players: Vec<TransactionPlayerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPlayerEntry {
    pub player_key: String,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_team_key: Option<String>,
    #[serde(default)]
    pub destination_type: String,
    #[serde(default)]
    pub destination_team_key: Option<String>,
    #[serde(rename = "type", default)]
    pub move_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeper_flag_decodes_all_three_shapes() {
        let as_bool: KeeperFlag = serde_json::from_str("true").unwrap();
        assert!(as_bool.is_kept());

        let as_num: KeeperFlag = serde_json::from_str("1").unwrap();
        assert!(as_num.is_kept());
        let as_zero: KeeperFlag = serde_json::from_str("0").unwrap();
        assert!(!as_zero.is_kept());

        let as_detail: KeeperFlag =
            serde_json::from_str(r#"{"kept": 1, "cost": 12}"#).unwrap();
        assert!(as_detail.is_kept());
        let not_kept: KeeperFlag = serde_json::from_str(r#"{"kept": false}"#).unwrap();
        assert!(!not_kept.is_kept());
    }

    #[test]
    fn stat_value_accepts_string_or_number() {
        let from_str: StatValue =
            serde_json::from_str(r#"{"stat_id": 7, "value": "12"}"#).unwrap();
        assert_eq!(from_str.value.as_deref(), Some("12"));

        let from_int: StatValue =
            serde_json::from_str(r#"{"stat_id": 7, "value": 12}"#).unwrap();
        assert_eq!(from_int.value.as_deref(), Some("12"));

        let from_float: StatValue =
            serde_json::from_str(r#"{"stat_id": 26, "value": 3.27}"#).unwrap();
        assert_eq!(from_float.value.as_deref(), Some("3.27"));

        let missing: StatValue = serde_json::from_str(r#"{"stat_id": 7}"#).unwrap();
        assert!(missing.value.is_none());
    }

    #[test]
    fn flags_accept_bool_or_int() {
        let m: MatchupEntry = serde_json::from_str(
            r#"{
                "team_key_1": "458.l.1.t.1",
                "team_key_2": "458.l.1.t.2",
                "points_1": 6,
                "points_2": 3,
                "is_playoffs": 1,
                "is_tied": false
            }"#,
        )
        .unwrap();
        assert!(m.is_playoffs);
        assert!(!m.is_tied);
        assert!(!m.is_consolation);
        assert!(m.winner_team_key.is_none());
    }

    #[test]
    fn roster_entry_defaults_keeper_to_not_kept() {
        let r: RosterEntry = serde_json::from_str(
            r#"{
                "player": {"player_key": "458.p.9", "full_name": "Someone"},
                "selected_position": "SS"
            }"#,
        )
        .unwrap();
        assert!(!r.keeper.is_kept());
        assert!(r.stats.is_empty());
        assert_eq!(r.player.player_id, None);
    }
}
