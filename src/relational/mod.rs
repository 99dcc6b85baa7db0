//! Relational persister: one table per entity type, real foreign keys, one
//! SQLite transaction per batch.

mod rows;
mod schema;

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use rusqlite::{params_from_iter, types::Value};
use tracing::{debug, info};

use crate::{
    backend::{BatchPersister, EntityBatch, StoreCounts, StoreKind, TransactionGuard},
    config::UpsertPolicy,
    errors::LoaderError,
    fault_injection::{FaultInjector, FaultPoint},
    model::{EntityKind, HAS_NATIONALITY_SQL, RelationshipKind},
    pool::ConnectionPool,
    sequencer::DependencySequencer,
};

pub use rows::{columns, render};
pub use schema::{RELATIONAL_SCHEMA, RELATIONAL_SCHEMA_VERSION};

#[derive(Clone)]
pub struct RelationalStore {
    pool: ConnectionPool,
    policy: UpsertPolicy,
    faults: FaultInjector,
}

impl RelationalStore {
    /// Opens (and if needed creates) the store at `path`; `None` keeps it in
    /// memory.
    pub fn open(
        path: Option<&Path>,
        pool_size: usize,
        policy: UpsertPolicy,
    ) -> Result<Self, LoaderError> {
        let pool = ConnectionPool::open("relational", path, pool_size, |conn| {
            RELATIONAL_SCHEMA.ensure(conn)
        })?;
        Ok(Self {
            pool,
            policy,
            faults: FaultInjector::default(),
        })
    }

    pub fn in_memory(policy: UpsertPolicy) -> Result<Self, LoaderError> {
        Self::open(None, 1, policy)
    }

    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn policy(&self) -> UpsertPolicy {
        self.policy
    }

    /// Writes every record of `batch` in one transaction.
    pub fn write_batch(&self, batch: &EntityBatch) -> Result<usize, LoaderError> {
        let sql = upsert_sql(batch.kind, self.policy);
        let conn = self.pool.get()?;
        let written = TransactionGuard::begin(&conn)?.execute(|conn| {
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| LoaderError::from_sqlite("prepare upsert", e))?;
            for entity in &batch.records {
                if entity.kind() != batch.kind {
                    return Err(LoaderError::validation(format!(
                        "{} {} in a {} batch",
                        entity.kind(),
                        entity.id(),
                        batch.kind
                    )));
                }
                let values = rows::values(entity)?;
                stmt.execute(params_from_iter(values)).map_err(|e| {
                    LoaderError::from_sqlite(&format!("{} {}", batch.kind, entity.id()), e)
                })?;
            }
            self.faults
                .check(FaultPoint::RelationalBeforeCommit, batch.kind, batch.index)?;
            Ok(batch.len())
        })?;
        debug!(
            store = "relational",
            kind = %batch.kind,
            batch = batch.index,
            written,
            "batch committed"
        );
        Ok(written)
    }

    /// Deletes every row, dependents first. Tables and schema stay in place.
    pub fn wipe(&self) -> Result<(), LoaderError> {
        let sequencer = DependencySequencer::for_schema()?;
        let conn = self.pool.get()?;
        TransactionGuard::begin(&conn)?.execute(|conn| {
            for kind in sequencer.write_order().iter().rev() {
                conn.execute(&format!("DELETE FROM {}", kind.table()), [])
                    .map_err(|e| LoaderError::from_sqlite("wipe", e))?;
            }
            Ok(())
        })?;
        info!(store = "relational", "store wiped");
        Ok(())
    }

    /// All rows of `kind` in primary-key order, columns as in [`columns`].
    pub fn read_rows(&self, kind: EntityKind) -> Result<Vec<Vec<Value>>, LoaderError> {
        let cols = columns(kind);
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            cols.join(", "),
            kind.table(),
            kind.primary_key()
        );
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| LoaderError::from_sqlite("read rows", e))?;
        let rows = stmt
            .query_map([], |row| {
                (0..cols.len())
                    .map(|idx| row.get::<_, Value>(idx))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| LoaderError::from_sqlite("read rows", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoaderError::from_sqlite("read rows", e))?;
        Ok(rows)
    }

    fn count(&self, sql: &str) -> Result<u64, LoaderError> {
        let conn = self.pool.get()?;
        let n: i64 = conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| LoaderError::from_sqlite("count", e))?;
        Ok(n.max(0) as u64)
    }
}

fn upsert_sql(kind: EntityKind, policy: UpsertPolicy) -> String {
    let cols = columns(kind);
    let placeholders: Vec<String> = (1..=cols.len()).map(|idx| format!("?{idx}")).collect();
    let conflict = match policy {
        UpsertPolicy::Skip => "DO NOTHING".to_string(),
        UpsertPolicy::Overwrite => {
            let assignments: Vec<String> = cols
                .iter()
                .skip(1)
                .map(|col| format!("{col}=excluded.{col}"))
                .collect();
            format!("DO UPDATE SET {}", assignments.join(", "))
        }
    };
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        kind.table(),
        cols.join(", "),
        placeholders.join(", "),
        kind.primary_key(),
        conflict
    )
}

/// Extra filter narrowing a subject table to the rows that carry `rel`.
fn relationship_filter(rel: RelationshipKind) -> String {
    match rel {
        RelationshipKind::CustomerOf => " AND is_customer = 1".to_string(),
        RelationshipKind::RelatedTo => " AND related_account_id IS NOT NULL".to_string(),
        RelationshipKind::CitizenOf => format!(" AND {HAS_NATIONALITY_SQL}"),
        _ => String::new(),
    }
}

impl StoreCounts for RelationalStore {
    fn count_entities(&self, kind: EntityKind) -> Result<u64, LoaderError> {
        self.count(&format!("SELECT COUNT(*) FROM {}", kind.table()))
    }

    fn count_relationships(&self, rel: RelationshipKind) -> Result<u64, LoaderError> {
        let mut total = 0;
        for kind in rel.subject_kinds() {
            total += self.count(&format!(
                "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL{}",
                kind.table(),
                relationship_filter(rel)
            ))?;
        }
        Ok(total)
    }
}

#[async_trait]
impl BatchPersister for RelationalStore {
    fn store(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn persist(&self, batch: Arc<EntityBatch>) -> Result<usize, LoaderError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write_batch(&batch))
            .await
            .map_err(|e| LoaderError::store(format!("relational writer task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_policy_does_nothing_on_conflict() {
        let sql = upsert_sql(EntityKind::Institution, UpsertPolicy::Skip);
        assert!(sql.starts_with("INSERT INTO institutions (institution_id, legal_name"));
        assert!(sql.ends_with("ON CONFLICT(institution_id) DO NOTHING"));
    }

    #[test]
    fn overwrite_policy_updates_every_non_key_column() {
        let sql = upsert_sql(EntityKind::Account, UpsertPolicy::Overwrite);
        assert!(sql.contains("entity_id=excluded.entity_id"));
        assert!(sql.contains("deleted_at=excluded.deleted_at"));
        assert!(!sql.contains("account_id=excluded.account_id"));
    }

    #[test]
    fn column_lists_match_the_table_definitions() {
        let store = RelationalStore::in_memory(UpsertPolicy::Overwrite).unwrap();
        let conn = store.pool().get().unwrap();
        for kind in EntityKind::ALL {
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info({})", kind.table()))
                .unwrap();
            let declared: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(1))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(declared, columns(kind), "{kind}");
        }
    }
}
