use super::error::{is_constraint_violation, require_non_empty};
use super::{ensure_exists, Acl, AclId, PolicyError, PolicyStore, Rule};
use rusqlite::{params, OptionalExtension};
use tracing::{error, info};

impl PolicyStore {
    pub fn create_acl(&self, comment: &str) -> Result<AclId, PolicyError> {
        require_non_empty(comment, "ACL name")?;
        let id = AclId::generate();
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO acls(acl_id, comment) VALUES(?1, ?2)",
                params![id, comment],
            )?;
            Ok(())
        })?;
        info!("Created ACL {} ({:?})", id, comment);
        Ok(id)
    }

    /// All ACLs, ordered by comment.
    pub fn list_acls(&self) -> Result<Vec<Acl>, PolicyError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare_cached("SELECT acl_id, comment FROM acls ORDER BY comment")?;
            let rows = stmt.query_map([], |row| {
                Ok(Acl {
                    acl_id: row.get(0)?,
                    comment: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn acl(&self, id: &AclId) -> Result<Acl, PolicyError> {
        self.db.read(|conn| {
            conn.prepare_cached("SELECT comment FROM acls WHERE acl_id = ?1")?
                .query_row([id], |row| row.get::<_, Option<String>>(0))
                .optional()?
                .map(|comment| Acl {
                    acl_id: id.clone(),
                    comment: comment.unwrap_or_default(),
                })
                .ok_or_else(|| PolicyError::NotFound {
                    kind: "acl",
                    id: id.to_string(),
                })
        })
    }

    /// Rules of an ACL ordered by comment, then type, then value.
    pub fn acl_rules(&self, id: &AclId) -> Result<Vec<Rule>, PolicyError> {
        self.db.read(|conn| {
            ensure_exists(conn, id)?;
            let mut stmt = conn.prepare_cached(
                "SELECT rules.rule_id, rules.type, rules.value, rules.action, rules.comment
                 FROM aclrules
                 JOIN rules ON aclrules.rule_id = rules.rule_id
                 WHERE aclrules.acl_id = ?1
                 ORDER BY rules.comment, rules.type, rules.value",
            )?;
            let rows = stmt.query_map([id], |row| {
                Ok(Rule {
                    rule_id: row.get(0)?,
                    rule_type: row.get(1)?,
                    value: row.get(2)?,
                    action: row.get(3)?,
                    comment: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Deletes an ACL that holds no rules. Grants of the ACL go with it.
    ///
    /// Fails with [`PolicyError::AclHasRules`] carrying the number of rules
    /// still linked to it.
    pub fn delete_acl(&self, id: &AclId) -> Result<(), PolicyError> {
        info!("Deleting ACL {}", id);
        self.db.write(|tx| {
            ensure_exists(tx, id)?;
            match tx.execute("DELETE FROM acls WHERE acl_id = ?1", [id]) {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => {
                    let rules = tx
                        .query_row(
                            "SELECT COUNT(*) FROM aclrules WHERE acl_id = ?1",
                            [id],
                            |r| r.get::<_, i64>(0),
                        )
                        .map(|n| n as u64)
                        .map_err(|count_err| {
                            error!("Failed to find rule count: {}", count_err);
                            PolicyError::Storage(e)
                        })?;
                    Err(PolicyError::AclHasRules {
                        acl: id.clone(),
                        rules,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
