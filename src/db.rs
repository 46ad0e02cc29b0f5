use crate::config::StoreConfig;
use crate::policy::PolicyError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sources (
    source_id TEXT PRIMARY KEY NOT NULL,
    source    TEXT NOT NULL,
    comment   TEXT
);
CREATE TABLE IF NOT EXISTS groups (
    group_id TEXT PRIMARY KEY NOT NULL,
    comment  TEXT
);
CREATE TABLE IF NOT EXISTS members (
    group_id  TEXT NOT NULL REFERENCES groups(group_id),
    source_id TEXT NOT NULL REFERENCES sources(source_id),
    comment   TEXT,
    PRIMARY KEY (group_id, source_id)
);
CREATE TABLE IF NOT EXISTS acls (
    acl_id  TEXT PRIMARY KEY NOT NULL,
    comment TEXT
);
CREATE TABLE IF NOT EXISTS rules (
    rule_id TEXT PRIMARY KEY NOT NULL,
    type    TEXT NOT NULL,
    value   TEXT NOT NULL,
    action  TEXT NOT NULL,
    comment TEXT
);
CREATE TABLE IF NOT EXISTS aclrules (
    acl_id  TEXT NOT NULL REFERENCES acls(acl_id),
    rule_id TEXT NOT NULL UNIQUE REFERENCES rules(rule_id)
);
CREATE TABLE IF NOT EXISTS groupaccess (
    group_id TEXT NOT NULL REFERENCES groups(group_id),
    acl_id   TEXT NOT NULL REFERENCES acls(acl_id) ON DELETE CASCADE,
    comment  TEXT,
    PRIMARY KEY (group_id, acl_id)
);
CREATE INDEX IF NOT EXISTS idx_aclrules_acl ON aclrules(acl_id);
CREATE INDEX IF NOT EXISTS idx_members_source ON members(source_id);
CREATE INDEX IF NOT EXISTS idx_groupaccess_acl ON groupaccess(acl_id);
";

/// Owns the SQLite connection behind the policy store.
///
/// All writes go through [`DbClient::write`], which wraps them in one
/// immediate transaction; dropping the transaction on an error path rolls
/// everything back.
pub struct DbClient {
    db_path: String,
    conn: Mutex<Connection>,
}

impl DbClient {
    pub fn open(config: &StoreConfig) -> rusqlite::Result<Self> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            &config.journal_mode,
            |row| row.get(0),
        )?;
        info!("Opened {} (journal_mode={})", config.path, mode);
        Self::from_connection(config.path.clone(), conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(":memory:".to_string(), Connection::open_in_memory()?)
    }

    fn from_connection(db_path: String, conn: Connection) -> rusqlite::Result<Self> {
        // Referential integrity is enforced by SQLite itself, per connection.
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> Result<(), PolicyError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        info!("Policy schema initialized at {}", self.db_path);
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Runs read-only statements against the connection.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, PolicyError>,
    ) -> Result<T, PolicyError> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside a single transaction, committing only if it succeeds.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, PolicyError>,
    ) -> Result<T, PolicyError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PolicyError> {
        self.conn.lock().map_err(|_| PolicyError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_are_enabled() {
        let db = DbClient::open_in_memory().unwrap();
        db.initialize().unwrap();
        let on: i64 = db
            .read(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_initialize_is_repeatable() {
        let db = DbClient::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        let tables: i64 = db
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 7);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = DbClient::open_in_memory().unwrap();
        db.initialize().unwrap();
        let res: Result<(), PolicyError> = db.write(|tx| {
            tx.execute("INSERT INTO acls(acl_id, comment) VALUES('a', 'x')", [])?;
            Err(PolicyError::Validation("stop".into()))
        });
        assert!(res.is_err());
        let n: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM acls", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(n, 0);
    }
}
