//! Graph persister: labelled nodes merged by canonical key and typed edges
//! merged by `(from, to, type)`, laid out on SQLite.

mod integrity;
mod properties;
mod schema;

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{
    backend::{BatchPersister, EntityBatch, StoreCounts, StoreKind, TransactionGuard},
    config::UpsertPolicy,
    errors::LoaderError,
    fault_injection::{FaultInjector, FaultPoint},
    model::{Endpoint, Entity, EntityKind, RelationshipKind},
    pool::ConnectionPool,
};

pub use integrity::GraphIntegrityReport;
pub use properties::{
    BUSINESS_DATE_LABEL, COUNTRY_LABEL, EdgeSpec, INCORPORATED_IN, LOCATED_IN, NodeRef,
    OCCURRED_ON, edges, node_properties, owned_edge_types,
};
pub use schema::{GRAPH_SCHEMA, GRAPH_SCHEMA_VERSION};

#[derive(Clone)]
pub struct GraphStore {
    pool: ConnectionPool,
    policy: UpsertPolicy,
    faults: FaultInjector,
}

impl GraphStore {
    pub fn open(
        path: Option<&Path>,
        pool_size: usize,
        policy: UpsertPolicy,
    ) -> Result<Self, LoaderError> {
        let pool =
            ConnectionPool::open("graph", path, pool_size, |conn| GRAPH_SCHEMA.ensure(conn))?;
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

    /// Merges every node and edge of `batch` in one transaction.
    pub fn write_batch(&self, batch: &EntityBatch) -> Result<usize, LoaderError> {
        let conn = self.pool.get()?;
        let written = TransactionGuard::begin(&conn)?.execute(|conn| {
            for entity in &batch.records {
                if entity.kind() != batch.kind {
                    return Err(LoaderError::validation(format!(
                        "{} {} in a {} batch",
                        entity.kind(),
                        entity.id(),
                        batch.kind
                    )));
                }
                self.merge_entity(conn, entity)?;
            }
            self.faults
                .check(FaultPoint::GraphBeforeCommit, batch.kind, batch.index)?;
            Ok(batch.len())
        })?;
        debug!(
            store = "graph",
            kind = %batch.kind,
            batch = batch.index,
            written,
            "batch committed"
        );
        Ok(written)
    }

    /// Merges one record and the edges it owns. An existing node keeps its
    /// edges under `Skip`; under `Overwrite` they are rebuilt from `entity`.
    fn merge_entity(&self, conn: &Connection, entity: &Entity) -> Result<(), LoaderError> {
        let props = node_properties(entity)?;
        let (node, inserted) = merge_node(
            conn,
            entity.kind().label(),
            entity.id(),
            &Value::Object(props),
            self.policy,
        )?;
        if !inserted {
            match self.policy {
                UpsertPolicy::Skip => return Ok(()),
                UpsertPolicy::Overwrite => drop_owned_edges(conn, node, entity.kind())?,
            }
        }
        for edge in edges(entity) {
            let from = resolve(conn, &edge.from, node, entity)?;
            let to = resolve(conn, &edge.to, node, entity)?;
            merge_edge(conn, from, to, edge.edge_type, &edge.data, self.policy)?;
        }
        Ok(())
    }

    /// Removes every edge, then every node.
    pub fn wipe(&self) -> Result<(), LoaderError> {
        let conn = self.pool.get()?;
        TransactionGuard::begin(&conn)?.execute(|conn| {
            conn.execute_batch("DELETE FROM graph_edges; DELETE FROM graph_nodes;")
                .map_err(|e| LoaderError::from_sqlite("wipe", e))
        })?;
        info!(store = "graph", "store wiped");
        Ok(())
    }

    pub fn integrity(&self) -> Result<GraphIntegrityReport, LoaderError> {
        let conn = self.pool.get()?;
        integrity::run_integrity_checks(&conn)
    }

    /// Stored properties of one node.
    pub fn node(&self, label: &str, key: &str) -> Result<Option<Map<String, Value>>, LoaderError> {
        let conn = self.pool.get()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM graph_nodes WHERE label=?1 AND key=?2",
                params![label, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| LoaderError::from_sqlite("node", e))?;
        match data {
            None => Ok(None),
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) | Err(_) => Err(LoaderError::store(format!(
                    "{label} {key} has a malformed property document"
                ))),
            },
        }
    }

    /// `(from key, to key)` of every edge of `edge_type`, ordered by keys.
    pub fn edge_endpoints(&self, edge_type: &str) -> Result<Vec<(String, String)>, LoaderError> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(
                "SELECT src.key, dst.key FROM graph_edges e
                 JOIN graph_nodes src ON src.id = e.from_id
                 JOIN graph_nodes dst ON dst.id = e.to_id
                 WHERE e.edge_type = ?1
                 ORDER BY src.key, dst.key",
            )
            .map_err(|e| LoaderError::from_sqlite("edges", e))?;
        let rows = stmt
            .query_map([edge_type], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| LoaderError::from_sqlite("edges", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoaderError::from_sqlite("edges", e))?;
        Ok(rows)
    }

    pub fn count_label(&self, label: &str) -> Result<u64, LoaderError> {
        self.count("SELECT COUNT(*) FROM graph_nodes WHERE label=?1", label)
    }

    pub fn count_edge_type(&self, edge_type: &str) -> Result<u64, LoaderError> {
        self.count("SELECT COUNT(*) FROM graph_edges WHERE edge_type=?1", edge_type)
    }

    fn count(&self, sql: &str, arg: &str) -> Result<u64, LoaderError> {
        let conn = self.pool.get()?;
        let n: i64 = conn
            .query_row(sql, [arg], |row| row.get(0))
            .map_err(|e| LoaderError::from_sqlite("count", e))?;
        Ok(n.max(0) as u64)
    }
}

/// Returns the node id and whether this call created it.
fn merge_node(
    conn: &Connection,
    label: &str,
    key: &str,
    data: &Value,
    policy: UpsertPolicy,
) -> Result<(i64, bool), LoaderError> {
    let existing = lookup_node(conn, label, key)?;
    let sql = match policy {
        UpsertPolicy::Skip => {
            "INSERT INTO graph_nodes(label, key, data) VALUES(?1, ?2, ?3)
             ON CONFLICT(label, key) DO NOTHING"
        }
        UpsertPolicy::Overwrite => {
            "INSERT INTO graph_nodes(label, key, data) VALUES(?1, ?2, ?3)
             ON CONFLICT(label, key) DO UPDATE SET data=excluded.data"
        }
    };
    conn.prepare_cached(sql)
        .and_then(|mut stmt| stmt.execute(params![label, key, data.to_string()]))
        .map_err(|e| LoaderError::from_sqlite(&format!("merge {label} {key}"), e))?;
    if let Some(id) = existing {
        return Ok((id, false));
    }
    let id = lookup_node(conn, label, key)?
        .ok_or_else(|| LoaderError::store(format!("{label} {key} missing after merge")))?;
    Ok((id, true))
}

fn drop_owned_edges(conn: &Connection, node: i64, kind: EntityKind) -> Result<(), LoaderError> {
    for (edge_type, end) in owned_edge_types(kind) {
        let sql = match end {
            Endpoint::From => "DELETE FROM graph_edges WHERE from_id=?1 AND edge_type=?2",
            Endpoint::To => "DELETE FROM graph_edges WHERE to_id=?1 AND edge_type=?2",
        };
        conn.prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params![node, edge_type]))
            .map_err(|e| LoaderError::from_sqlite(&format!("drop {edge_type}"), e))?;
    }
    Ok(())
}

fn lookup_node(conn: &Connection, label: &str, key: &str) -> Result<Option<i64>, LoaderError> {
    conn.prepare_cached("SELECT id FROM graph_nodes WHERE label=?1 AND key=?2")
        .and_then(|mut stmt| stmt.query_row(params![label, key], |row| row.get(0)).optional())
        .map_err(|e| LoaderError::from_sqlite(&format!("lookup {label} {key}"), e))
}

fn resolve(
    conn: &Connection,
    target: &NodeRef<'_>,
    this: i64,
    entity: &Entity,
) -> Result<i64, LoaderError> {
    match target {
        NodeRef::This => Ok(this),
        NodeRef::Entity { kind, id } => lookup_node(conn, kind.label(), id)?.ok_or_else(|| {
            LoaderError::dangling(format!(
                "{} {} references missing {kind} {id}",
                entity.kind(),
                entity.id()
            ))
        }),
        // Reference nodes are shared across records and never overwritten.
        NodeRef::Country(code) => merge_node(
            conn,
            COUNTRY_LABEL,
            code,
            &json!({ "code": code }),
            UpsertPolicy::Skip,
        )
        .map(|(id, _)| id),
        NodeRef::BusinessDate(date) => merge_node(
            conn,
            BUSINESS_DATE_LABEL,
            &date.to_string(),
            &json!({ "date": date }),
            UpsertPolicy::Skip,
        )
        .map(|(id, _)| id),
    }
}

fn merge_edge(
    conn: &Connection,
    from: i64,
    to: i64,
    edge_type: &str,
    data: &Value,
    policy: UpsertPolicy,
) -> Result<(), LoaderError> {
    let sql = match policy {
        UpsertPolicy::Skip => {
            "INSERT INTO graph_edges(from_id, to_id, edge_type, data) VALUES(?1, ?2, ?3, ?4)
             ON CONFLICT(from_id, to_id, edge_type) DO NOTHING"
        }
        UpsertPolicy::Overwrite => {
            "INSERT INTO graph_edges(from_id, to_id, edge_type, data) VALUES(?1, ?2, ?3, ?4)
             ON CONFLICT(from_id, to_id, edge_type) DO UPDATE SET data=excluded.data"
        }
    };
    conn.prepare_cached(sql)
        .and_then(|mut stmt| stmt.execute(params![from, to, edge_type, data.to_string()]))
        .map_err(|e| LoaderError::from_sqlite(&format!("merge {edge_type}"), e))?;
    Ok(())
}

impl StoreCounts for GraphStore {
    fn count_entities(&self, kind: EntityKind) -> Result<u64, LoaderError> {
        self.count_label(kind.label())
    }

    fn count_relationships(&self, rel: RelationshipKind) -> Result<u64, LoaderError> {
        let subject = match rel.subject_end() {
            Endpoint::From => "e.from_id",
            Endpoint::To => "e.to_id",
        };
        self.count(
            &format!(
                "SELECT COUNT(*) FROM graph_edges e
                 JOIN graph_nodes n ON n.id = {subject}
                 WHERE e.edge_type = ?1
                   AND json_extract(n.data, '$.deleted_at') IS NULL"
            ),
            rel.as_str(),
        )
    }
}

#[async_trait]
impl BatchPersister for GraphStore {
    fn store(&self) -> StoreKind {
        StoreKind::Graph
    }

    async fn persist(&self, batch: Arc<EntityBatch>) -> Result<usize, LoaderError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write_batch(&batch))
            .await
            .map_err(|e| LoaderError::store(format!("graph writer task failed: {e}")))?
    }
}
