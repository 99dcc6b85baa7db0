//! Store seam shared by the relational and graph persisters.
//!
//! The orchestrator only sees [`BatchPersister`]; the validator only sees
//! [`StoreCounts`]. Both concrete stores live behind these traits.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    errors::LoaderError,
    model::{Entity, EntityKind, RelationshipKind},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Relational,
    Graph,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::Graph => "graph",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned batch handed to both persisters.
#[derive(Clone, Debug)]
pub struct EntityBatch {
    pub kind: EntityKind,
    pub index: usize,
    pub records: Vec<Entity>,
}

impl EntityBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Writes one batch atomically: either every record of the batch is
/// committed or none is.
#[async_trait]
pub trait BatchPersister: Send + Sync {
    fn store(&self) -> StoreKind;

    /// Returns the number of records written.
    async fn persist(&self, batch: Arc<EntityBatch>) -> Result<usize, LoaderError>;
}

/// Read side used by the consistency validator.
pub trait StoreCounts {
    /// Every stored record of `kind`, soft-deleted ones included.
    fn count_entities(&self, kind: EntityKind) -> Result<u64, LoaderError>;

    /// Relationships of `rel` whose dependent record is not soft-deleted.
    fn count_relationships(&self, rel: RelationshipKind) -> Result<u64, LoaderError>;
}

/// Transaction wrapper with automatic rollback on drop.
pub struct TransactionGuard<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> TransactionGuard<'a> {
    /// Starts an IMMEDIATE transaction so the write lock is taken up front.
    pub fn begin(conn: &'a Connection) -> Result<Self, LoaderError> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| LoaderError::from_sqlite("begin", e))?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }

    pub fn commit(mut self) -> Result<(), LoaderError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| LoaderError::from_sqlite("commit", e))?;
        self.committed = true;
        Ok(())
    }

    /// Runs `f` and commits on success; on error the drop guard rolls back.
    pub fn execute<F, R>(self, f: F) -> Result<R, LoaderError>
    where
        F: FnOnce(&Connection) -> Result<R, LoaderError>,
    {
        let result = f(self.conn)?;
        self.commit()?;
        Ok(result)
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn failed_closure_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(x INTEGER)").unwrap();
        let result: Result<(), LoaderError> = TransactionGuard::begin(&conn)
            .unwrap()
            .execute(|conn| {
                conn.execute("INSERT INTO t(x) VALUES (1)", [])
                    .map_err(|e| LoaderError::from_sqlite("insert", e))?;
                Err(LoaderError::store("boom"))
            });
        assert!(result.is_err());
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn successful_closure_commits() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(x INTEGER)").unwrap();
        TransactionGuard::begin(&conn)
            .unwrap()
            .execute(|conn| {
                conn.execute("INSERT INTO t(x) VALUES (1)", [])
                    .map_err(|e| LoaderError::from_sqlite("insert", e))
            })
            .unwrap();
        assert_eq!(count(&conn), 1);
    }
}
