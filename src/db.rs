// SQLite persistence layer: one database file per franchise slug.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::Connection;

/// SQLite-backed store for one franchise's full league history.
///
/// All entities are keyed by composite natural keys (league_key plus
/// season-scoped entity keys); the sync pipeline is the sole writer and the
/// analytics layer reads committed state only.
pub struct Database {
    conn: Mutex<Connection>,
    tx_depth: AtomicUsize,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(SCHEMA)
            .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            tx_depth: AtomicUsize::new(0),
        })
    }

    /// Open the database for a franchise slug under `data_dir`, creating the
    /// directory if needed.
    pub fn open_for_slug(data_dir: &Path, slug: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        let path = data_dir.join(format!("{slug}.db"));
        Self::open(path.to_str().context("non-utf8 database path")?)
    }

    /// Acquire the database connection. Exposed so callers can run ad-hoc
    /// reads the query layer doesn't cover.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Execute a single write statement. Outside a scoped transaction the
    /// statement auto-commits.
    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
        self.conn()
            .execute(sql, params)
            .with_context(|| format!("failed to execute: {sql}"))
    }

    /// Run `f` inside a transaction scope.
    ///
    /// Scopes nest: an inner call joins the outer transaction rather than
    /// committing early, so only the outermost scope commits on success or
    /// rolls back on error. A failure anywhere inside the outermost scope
    /// therefore discards every write made under it.
    pub fn scoped_tx<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let outermost = self.tx_depth.fetch_add(1, Ordering::SeqCst) == 0;
        let _guard = DepthGuard(&self.tx_depth);

        if outermost {
            self.conn()
                .execute_batch("BEGIN")
                .context("failed to begin transaction")?;
        }

        let result = f();

        if outermost {
            match &result {
                Ok(_) => self
                    .conn()
                    .execute_batch("COMMIT")
                    .context("failed to commit transaction")?,
                Err(_) => {
                    let _ = self.conn().execute_batch("ROLLBACK");
                }
            }
        }

        result
    }

    /// True when called from inside a `scoped_tx` closure.
    pub fn in_transaction(&self) -> bool {
        self.tx_depth.load(Ordering::SeqCst) > 0
    }
}

/// Decrements the transaction depth on scope exit, including unwind paths.
struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Full schema. Composite natural keys throughout; `INSERT OR REPLACE` by the
/// sync pipeline makes re-runs converge on identical contents.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS league (
    league_key         TEXT PRIMARY KEY,
    season             INTEGER NOT NULL,
    name               TEXT NOT NULL,
    num_teams          INTEGER NOT NULL,
    scoring_type       TEXT NOT NULL,
    num_scoring_cats   INTEGER NOT NULL,
    current_week       INTEGER NOT NULL,
    start_week         INTEGER NOT NULL,
    end_week           INTEGER NOT NULL,
    playoff_start_week INTEGER,
    uses_faab          INTEGER NOT NULL DEFAULT 0,
    is_finished        INTEGER NOT NULL DEFAULT 0,
    last_synced        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stat_category (
    league_key           TEXT NOT NULL,
    stat_id              INTEGER NOT NULL,
    name                 TEXT NOT NULL,
    display_name         TEXT NOT NULL,
    abbr                 TEXT NOT NULL,
    sort_order           INTEGER NOT NULL,
    position_type        TEXT,
    is_only_display_stat INTEGER NOT NULL DEFAULT 0,
    is_scoring_stat      INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (league_key, stat_id)
);

CREATE TABLE IF NOT EXISTS team (
    league_key       TEXT NOT NULL,
    team_key         TEXT NOT NULL,
    team_id          INTEGER NOT NULL,
    name             TEXT NOT NULL,
    manager_guid     TEXT NOT NULL DEFAULT '',
    manager_nickname TEXT NOT NULL DEFAULT '',
    manager_name     TEXT,
    waiver_priority  INTEGER,
    faab_balance     REAL,
    finish           INTEGER,
    playoff_seed     INTEGER,
    PRIMARY KEY (league_key, team_key)
);

CREATE TABLE IF NOT EXISTS matchup (
    league_key      TEXT NOT NULL,
    week            INTEGER NOT NULL,
    matchup_id      INTEGER NOT NULL,
    team_key_1      TEXT NOT NULL,
    team_key_2      TEXT NOT NULL,
    cats_won_1      INTEGER NOT NULL,
    cats_won_2      INTEGER NOT NULL,
    cats_tied       INTEGER NOT NULL,
    winner_team_key TEXT,
    is_tied         INTEGER NOT NULL DEFAULT 0,
    is_playoffs     INTEGER NOT NULL DEFAULT 0,
    is_consolation  INTEGER NOT NULL DEFAULT 0,
    week_start      TEXT NOT NULL DEFAULT '',
    week_end        TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (league_key, week, matchup_id)
);

CREATE TABLE IF NOT EXISTS matchup_category (
    league_key      TEXT NOT NULL,
    week            INTEGER NOT NULL,
    matchup_id      INTEGER NOT NULL,
    stat_id         INTEGER NOT NULL,
    team_1_value    TEXT,
    team_2_value    TEXT,
    winner_team_key TEXT,
    PRIMARY KEY (league_key, week, matchup_id, stat_id)
);

CREATE TABLE IF NOT EXISTS player (
    player_key          TEXT PRIMARY KEY,
    player_id           TEXT NOT NULL DEFAULT '',
    full_name           TEXT NOT NULL,
    first_name          TEXT NOT NULL DEFAULT '',
    last_name           TEXT NOT NULL DEFAULT '',
    editorial_team_abbr TEXT NOT NULL DEFAULT '',
    primary_position    TEXT NOT NULL DEFAULT '',
    eligible_positions  TEXT NOT NULL DEFAULT '',
    headshot_url        TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS weekly_roster (
    league_key        TEXT NOT NULL,
    week              INTEGER NOT NULL,
    team_key          TEXT NOT NULL,
    player_key        TEXT NOT NULL,
    selected_position TEXT,
    is_starter        INTEGER NOT NULL DEFAULT 0,
    is_keeper         INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (league_key, week, team_key, player_key)
);

CREATE TABLE IF NOT EXISTS player_weekly_stat (
    league_key TEXT NOT NULL,
    week       INTEGER NOT NULL,
    player_key TEXT NOT NULL,
    stat_id    INTEGER NOT NULL,
    value      TEXT,
    PRIMARY KEY (league_key, week, player_key, stat_id)
);

CREATE TABLE IF NOT EXISTS team_weekly_score (
    league_key TEXT NOT NULL,
    week       INTEGER NOT NULL,
    team_key   TEXT NOT NULL,
    stat_id    INTEGER NOT NULL,
    value      TEXT,
    PRIMARY KEY (league_key, week, team_key, stat_id)
);

CREATE TABLE IF NOT EXISTS transaction_record (
    transaction_key  TEXT PRIMARY KEY,
    league_key       TEXT NOT NULL,
    type             TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT '',
    timestamp        INTEGER NOT NULL,
    week             INTEGER,
    trader_team_key  TEXT,
    tradee_team_key  TEXT,
    faab_bid         INTEGER
);

CREATE TABLE IF NOT EXISTS transaction_player (
    transaction_key      TEXT NOT NULL,
    player_key           TEXT NOT NULL,
    source_type          TEXT NOT NULL DEFAULT '',
    source_team_key      TEXT,
    destination_type     TEXT NOT NULL DEFAULT '',
    destination_team_key TEXT,
    type                 TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (transaction_key, player_key)
);

CREATE TABLE IF NOT EXISTS draft_pick (
    league_key TEXT NOT NULL,
    pick       INTEGER NOT NULL,
    round      INTEGER NOT NULL,
    team_key   TEXT NOT NULL,
    player_key TEXT NOT NULL,
    cost       INTEGER,
    PRIMARY KEY (league_key, pick)
);

CREATE TABLE IF NOT EXISTS keeper (
    league_key       TEXT NOT NULL,
    team_key         TEXT NOT NULL,
    player_key       TEXT NOT NULL,
    player_name      TEXT NOT NULL,
    season           INTEGER NOT NULL,
    round_cost       INTEGER NOT NULL,
    kept_from_season INTEGER,
    PRIMARY KEY (league_key, team_key, player_key)
);

CREATE TABLE IF NOT EXISTS sync_log (
    league_key      TEXT NOT NULL,
    sync_type       TEXT NOT NULL,
    week            INTEGER NOT NULL DEFAULT 0,
    started_at      TEXT NOT NULL,
    completed_at    TEXT,
    status          TEXT NOT NULL,
    records_written INTEGER NOT NULL DEFAULT 0,
    error_message   TEXT,
    PRIMARY KEY (league_key, sync_type, week)
);

CREATE INDEX IF NOT EXISTS idx_matchup_league_week
    ON matchup(league_key, week);
CREATE INDEX IF NOT EXISTS idx_roster_league_week
    ON weekly_roster(league_key, week);
CREATE INDEX IF NOT EXISTS idx_player_stat_league_week
    ON player_weekly_stat(league_key, week);
CREATE INDEX IF NOT EXISTS idx_txn_league
    ON transaction_record(league_key);
CREATE INDEX IF NOT EXISTS idx_draft_league_team
    ON draft_pick(league_key, team_key);
";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "league",
            "stat_category",
            "team",
            "matchup",
            "matchup_category",
            "player",
            "weekly_roster",
            "player_weekly_stat",
            "team_weekly_score",
            "transaction_record",
            "transaction_player",
            "draft_pick",
            "keeper",
            "sync_log",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn open_is_idempotent_on_existing_schema() {
        let tmp = std::env::temp_dir().join(format!("clubhouse_db_{}.db", std::process::id()));
        let path = tmp.to_str().unwrap();
        {
            let db = Database::open(path).unwrap();
            db.execute(
                "INSERT INTO player (player_key, full_name) VALUES (?1, ?2)",
                params!["458.p.1", "Someone"],
            )
            .unwrap();
        }
        // Re-opening must not clobber existing rows.
        let db = Database::open(path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM player", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let _ = std::fs::remove_file(&tmp);
        let _ = std::fs::remove_file(format!("{path}-wal"));
        let _ = std::fs::remove_file(format!("{path}-shm"));
    }

    #[test]
    fn scoped_tx_commits_on_success() {
        let db = test_db();
        db.scoped_tx(|| {
            db.execute(
                "INSERT INTO player (player_key, full_name) VALUES ('a.p.1', 'A')",
                [],
            )?;
            db.execute(
                "INSERT INTO player (player_key, full_name) VALUES ('a.p.2', 'B')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM player", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn scoped_tx_rolls_back_on_error() {
        let db = test_db();
        let result: Result<()> = db.scoped_tx(|| {
            db.execute(
                "INSERT INTO player (player_key, full_name) VALUES ('a.p.1', 'A')",
                [],
            )?;
            anyhow::bail!("boom")
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM player", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "rolled-back rows must not be visible");
    }

    #[test]
    fn nested_scoped_tx_joins_outer() {
        let db = test_db();
        assert!(!db.in_transaction());

        db.scoped_tx(|| {
            assert!(db.in_transaction());
            db.execute(
                "INSERT INTO player (player_key, full_name) VALUES ('a.p.1', 'A')",
                [],
            )?;
            // Inner scope must not commit early.
            db.scoped_tx(|| {
                db.execute(
                    "INSERT INTO player (player_key, full_name) VALUES ('a.p.2', 'B')",
                    [],
                )?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

        assert!(!db.in_transaction());
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM player", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn outer_failure_discards_inner_writes() {
        let db = test_db();
        let result: Result<()> = db.scoped_tx(|| {
            db.scoped_tx(|| {
                db.execute(
                    "INSERT INTO player (player_key, full_name) VALUES ('a.p.1', 'A')",
                    [],
                )?;
                Ok(())
            })?;
            anyhow::bail!("outer failure after inner scope succeeded")
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM player", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
