use super::error::require_non_empty;
use super::{ensure_distinct, ensure_exists, AclId, Group, GroupId, PolicyError, PolicyStore, SourceId};
use rusqlite::{params, OptionalExtension};
use rustc_hash::FxHashMap;
use tracing::info;

impl PolicyStore {
    pub fn create_group(&self, comment: &str) -> Result<GroupId, PolicyError> {
        require_non_empty(comment, "group name")?;
        let id = GroupId::generate();
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO groups(group_id, comment) VALUES(?1, ?2)",
                params![id, comment],
            )?;
            Ok(())
        })?;
        info!("Created group {} ({:?})", id, comment);
        Ok(id)
    }

    /// All groups, ordered by comment.
    pub fn list_groups(&self) -> Result<Vec<Group>, PolicyError> {
        self.db.read(|conn| {
            let mut stmt =
                conn.prepare_cached("SELECT group_id, comment FROM groups ORDER BY comment")?;
            let rows = stmt.query_map([], |row| {
                Ok(Group {
                    group_id: row.get(0)?,
                    comment: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn group(&self, id: &GroupId) -> Result<Group, PolicyError> {
        self.db.read(|conn| {
            conn.prepare_cached("SELECT comment FROM groups WHERE group_id = ?1")?
                .query_row([id], |row| row.get::<_, Option<String>>(0))
                .optional()?
                .map(|comment| Group {
                    group_id: id.clone(),
                    comment: comment.unwrap_or_default(),
                })
                .ok_or_else(|| PolicyError::NotFound {
                    kind: "group",
                    id: id.to_string(),
                })
        })
    }

    /// ACLs currently granted to the group, with the grant comment.
    pub fn group_acls(&self, id: &GroupId) -> Result<FxHashMap<AclId, String>, PolicyError> {
        self.db.read(|conn| {
            ensure_exists(conn, id)?;
            let mut stmt =
                conn.prepare_cached("SELECT acl_id, comment FROM groupaccess WHERE group_id = ?1")?;
            let rows = stmt.query_map([id], |row| {
                Ok((
                    row.get::<_, AclId>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })?;
            Ok(rows.collect::<Result<FxHashMap<_, _>, _>>()?)
        })
    }

    /// Sources currently in the group, with the membership comment.
    pub fn group_sources(&self, id: &GroupId) -> Result<FxHashMap<SourceId, String>, PolicyError> {
        self.db.read(|conn| {
            ensure_exists(conn, id)?;
            let mut stmt =
                conn.prepare_cached("SELECT source_id, comment FROM members WHERE group_id = ?1")?;
            let rows = stmt.query_map([id], |row| {
                Ok((
                    row.get::<_, SourceId>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })?;
            Ok(rows.collect::<Result<FxHashMap<_, _>, _>>()?)
        })
    }

    /// Replaces every ACL grant of `group` with `grants`, all or nothing.
    pub fn replace_group_acl_grants(
        &self,
        group: &GroupId,
        grants: &[(AclId, String)],
    ) -> Result<(), PolicyError> {
        ensure_distinct(&grants.iter().map(|(id, _)| id).collect::<Vec<_>>())?;
        info!("Updating group {} to {} ACLs", group, grants.len());
        self.db.write(|tx| {
            ensure_exists(tx, group)?;
            tx.execute("DELETE FROM groupaccess WHERE group_id = ?1", [group])?;
            let mut insert = tx.prepare_cached(
                "INSERT INTO groupaccess(group_id, acl_id, comment) VALUES(?1, ?2, ?3)",
            )?;
            for (acl, comment) in grants {
                ensure_exists(tx, acl)?;
                insert.execute(params![group, acl, comment])?;
            }
            Ok(())
        })
    }

    /// Replaces every source membership of `group` with `members`, all or nothing.
    pub fn replace_group_members(
        &self,
        group: &GroupId,
        members: &[(SourceId, String)],
    ) -> Result<(), PolicyError> {
        ensure_distinct(&members.iter().map(|(id, _)| id).collect::<Vec<_>>())?;
        info!("Updating group {} to {} sources", group, members.len());
        self.db.write(|tx| {
            ensure_exists(tx, group)?;
            tx.execute("DELETE FROM members WHERE group_id = ?1", [group])?;
            let mut insert = tx.prepare_cached(
                "INSERT INTO members(group_id, source_id, comment) VALUES(?1, ?2, ?3)",
            )?;
            for (source, comment) in members {
                ensure_exists(tx, source)?;
                insert.execute(params![group, source, comment])?;
            }
            Ok(())
        })
    }
}
