use super::error::{is_constraint_violation, require_non_empty};
use super::{ensure_exists, GroupId, PolicyError, PolicyStore, Source, SourceId};
use rusqlite::params;
use tracing::{error, info};

impl PolicyStore {
    /// Creates a source and makes it a member of `group` in one step.
    pub fn create_source_and_add_to_group(
        &self,
        group: &GroupId,
        source: &str,
        source_comment: &str,
        member_comment: &str,
    ) -> Result<SourceId, PolicyError> {
        require_non_empty(source, "source")?;
        let id = SourceId::generate();
        info!("Creating {} in {}", id, group);
        self.db.write(|tx| {
            ensure_exists(tx, group)?;
            tx.execute(
                "INSERT INTO sources(source_id, source, comment) VALUES(?1, ?2, ?3)",
                params![id, source, source_comment],
            )?;
            tx.execute(
                "INSERT INTO members(group_id, source_id, comment) VALUES(?1, ?2, ?3)",
                params![group, id, member_comment],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    /// All sources, ordered by comment.
    pub fn list_sources(&self) -> Result<Vec<Source>, PolicyError> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT source_id, source, comment FROM sources ORDER BY comment",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Source {
                    source_id: row.get(0)?,
                    source: row.get(1)?,
                    comment: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Deletes a source that no group references.
    ///
    /// Fails with [`PolicyError::SourceInUse`] carrying the number of
    /// memberships still pointing at it.
    pub fn delete_source(&self, id: &SourceId) -> Result<(), PolicyError> {
        info!("Deleting source {}", id);
        self.db.write(|tx| {
            ensure_exists(tx, id)?;
            match tx.execute("DELETE FROM sources WHERE source_id = ?1", [id]) {
                Ok(_) => Ok(()),
                Err(e) if is_constraint_violation(&e) => {
                    let groups = tx
                        .query_row(
                            "SELECT COUNT(*) FROM members WHERE source_id = ?1",
                            [id],
                            |r| r.get::<_, i64>(0),
                        )
                        .map(|n| n as u64)
                        .map_err(|count_err| {
                            error!("Failed to find member count: {}", count_err);
                            PolicyError::Storage(e)
                        })?;
                    Err(PolicyError::SourceInUse {
                        source_id: id.clone(),
                        groups,
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
