//! The access-control policy: groups of sources, ACLs of rules, and the
//! grants tying groups to ACLs.
//!
//! Every mutation runs in one transaction (see [`crate::db::DbClient::write`]);
//! identifiers are validated by their types before any statement is issued.

mod acls;
mod error;
mod groups;
pub mod ids;
mod model;
mod rules;
mod sources;

pub use error::PolicyError;
pub use ids::{pair_with_comments, parse_ids, AclId, GroupId, PolicyId, RuleId, SourceId};
pub use model::{Acl, Group, Rule, RuleAction, RuleFields, RuleType, Source};

use crate::config::StoreConfig;
use crate::db::DbClient;
use rusqlite::{Connection, OptionalExtension};

/// Handle to the persistent policy. Cheap to share behind an `Arc`.
pub struct PolicyStore {
    db: DbClient,
}

impl PolicyStore {
    /// Opens (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, PolicyError> {
        Self::from_client(DbClient::open(config)?)
    }

    /// A private, empty store that disappears with the handle.
    pub fn open_in_memory() -> Result<Self, PolicyError> {
        Self::from_client(DbClient::open_in_memory()?)
    }

    fn from_client(db: DbClient) -> Result<Self, PolicyError> {
        db.initialize()?;
        Ok(Self { db })
    }

    pub fn path(&self) -> &str {
        self.db.path()
    }
}

fn ensure_exists<I: PolicyId>(conn: &Connection, id: &I) -> Result<(), PolicyError> {
    let found = conn
        .prepare_cached(I::EXISTS_SQL)?
        .query_row([id], |_| Ok(()))
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(PolicyError::NotFound {
            kind: I::KIND,
            id: id.to_string(),
        }),
    }
}

fn ensure_distinct<I: PolicyId + Eq + std::hash::Hash>(ids: &[&I]) -> Result<(), PolicyError> {
    let mut seen = rustc_hash::FxHashSet::default();
    for id in ids {
        if !seen.insert(*id) {
            return Err(PolicyError::Validation(format!(
                "{} {} listed more than once",
                I::KIND,
                id
            )));
        }
    }
    Ok(())
}

/// `?, ?, ...` for an `IN (...)` list of `n` bound values.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
