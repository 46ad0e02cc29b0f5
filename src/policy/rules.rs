use super::error::require_non_empty;
use super::{ensure_distinct, ensure_exists, placeholders, AclId, PolicyError, PolicyStore, RuleFields, RuleId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use tracing::info;

// Ids bound per statement; stays well under SQLite's host-parameter limit.
const MAX_BATCH: usize = 500;

impl PolicyStore {
    /// Inserts a rule and links it to `acl` in one transaction.
    pub fn create_rule_in_acl(&self, acl: &AclId, fields: &RuleFields) -> Result<RuleId, PolicyError> {
        fields.validate()?;
        let id = RuleId::generate();
        info!("Adding rule {} to ACL {}", id, acl);
        self.db.write(|tx| {
            ensure_exists(tx, acl)?;
            tx.execute(
                "INSERT INTO rules(rule_id, type, value, action, comment) VALUES(?1, ?2, ?3, ?4, ?5)",
                params![id, fields.rule_type, fields.value, fields.action, fields.comment],
            )?;
            tx.execute(
                "INSERT INTO aclrules(acl_id, rule_id) VALUES(?1, ?2)",
                params![acl, id],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    /// Quick rule from untyped form input, filed into the inbox ACL.
    pub fn create_inbox_rule(
        &self,
        inbox: &AclId,
        rule_type: &str,
        value: &str,
        action: &str,
    ) -> Result<RuleId, PolicyError> {
        require_non_empty(rule_type, "rule type")?;
        require_non_empty(value, "rule value")?;
        require_non_empty(action, "rule action")?;
        let fields = RuleFields::new(rule_type.parse()?, value, action.parse()?);
        self.create_rule_in_acl(inbox, &fields)
    }

    pub fn update_rule(&self, id: &RuleId, fields: &RuleFields) -> Result<(), PolicyError> {
        fields.validate()?;
        info!("Updating {} with {:?}", id, fields);
        self.db.write(|tx| {
            let n = tx.execute(
                "UPDATE rules SET type = ?1, value = ?2, action = ?3, comment = ?4 WHERE rule_id = ?5",
                params![fields.rule_type, fields.value, fields.action, fields.comment, id],
            )?;
            if n == 0 {
                return Err(PolicyError::NotFound {
                    kind: "rule",
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    /// Re-targets the ACL link of every rule in `rules` to `destination`.
    ///
    /// Fails with `NotFound` and changes nothing if any rule is unknown.
    pub fn move_rules_to_acl(&self, rules: &[RuleId], destination: &AclId) -> Result<(), PolicyError> {
        ensure_distinct(&rules.iter().collect::<Vec<_>>())?;
        if rules.is_empty() {
            return Ok(());
        }
        info!("Moving {} rules to ACL {}", rules.len(), destination);
        self.db.write(|tx| {
            ensure_exists(tx, destination)?;
            for chunk in rules.chunks(MAX_BATCH) {
                let sql = format!(
                    "UPDATE aclrules SET acl_id = ? WHERE rule_id IN ({})",
                    placeholders(chunk.len())
                );
                let mut args: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() + 1);
                args.push(destination);
                args.extend(chunk.iter().map(|r| r as &dyn ToSql));
                let moved = tx.execute(&sql, args.as_slice())?;
                if moved != chunk.len() {
                    return Err(missing_rule(tx, chunk));
                }
            }
            Ok(())
        })
    }

    /// Deletes rules together with their ACL links.
    ///
    /// Fails with `NotFound` and deletes nothing if any rule is unknown.
    pub fn delete_rules(&self, rules: &[RuleId]) -> Result<(), PolicyError> {
        ensure_distinct(&rules.iter().collect::<Vec<_>>())?;
        if rules.is_empty() {
            return Ok(());
        }
        info!(
            "Deleting {}",
            rules.iter().map(RuleId::as_str).collect::<Vec<_>>().join(", ")
        );
        self.db.write(|tx| {
            for id in rules {
                ensure_exists(tx, id)?;
            }
            for chunk in rules.chunks(MAX_BATCH) {
                let in_list = placeholders(chunk.len());
                tx.execute(
                    &format!("DELETE FROM aclrules WHERE rule_id IN ({in_list})"),
                    params_from_iter(chunk),
                )?;
                tx.execute(
                    &format!("DELETE FROM rules WHERE rule_id IN ({in_list})"),
                    params_from_iter(chunk),
                )?;
            }
            Ok(())
        })
    }
}

/// The `NotFound` for the first rule of `rules` that is unknown or has no
/// ACL link to move.
fn missing_rule(conn: &Connection, rules: &[RuleId]) -> PolicyError {
    for id in rules {
        if let Err(e) = ensure_exists(conn, id) {
            return e;
        }
    }
    let unlinked = rules.iter().find(|id| {
        conn.query_row("SELECT 1 FROM aclrules WHERE rule_id = ?1", [*id], |_| Ok(()))
            .optional()
            .map_or(true, |found| found.is_none())
    });
    PolicyError::NotFound {
        kind: "rule",
        id: unlinked
            .or(rules.first())
            .map(ToString::to_string)
            .unwrap_or_default(),
    }
}
