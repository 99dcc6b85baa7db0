use rusqlite::Connection;
use serde::Serialize;

use crate::errors::LoaderError;

/// Structural findings over the graph tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphIntegrityReport {
    pub total_nodes: i64,
    pub total_edges: i64,
    pub orphan_edges: i64,
    pub duplicate_edges: i64,
    pub invalid_properties: i64,
    pub null_properties: i64,
    pub integrity_errors: i64,
    pub messages: Vec<String>,
}

impl GraphIntegrityReport {
    pub fn has_issues(&self) -> bool {
        self.orphan_edges > 0
            || self.duplicate_edges > 0
            || self.invalid_properties > 0
            || self.null_properties > 0
            || self.integrity_errors > 0
    }
}

fn query_single(conn: &Connection, sql: &str) -> Result<i64, LoaderError> {
    conn.query_row(sql, [], |row| row.get(0))
        .map_err(|e| LoaderError::from_sqlite("integrity", e))
}

pub(crate) fn run_integrity_checks(conn: &Connection) -> Result<GraphIntegrityReport, LoaderError> {
    let mut report = GraphIntegrityReport {
        total_nodes: query_single(conn, "SELECT COUNT(*) FROM graph_nodes")?,
        total_edges: query_single(conn, "SELECT COUNT(*) FROM graph_edges")?,
        ..Default::default()
    };
    report.orphan_edges = query_single(
        conn,
        "SELECT COUNT(*) FROM graph_edges e
         LEFT JOIN graph_nodes src ON src.id = e.from_id
         LEFT JOIN graph_nodes dst ON dst.id = e.to_id
         WHERE src.id IS NULL OR dst.id IS NULL",
    )?;
    report.duplicate_edges = query_single(
        conn,
        "SELECT COALESCE(SUM(cnt - 1), 0) FROM (
             SELECT COUNT(*) AS cnt FROM graph_edges
             GROUP BY from_id, to_id, edge_type
             HAVING cnt > 1
         )",
    )?;
    report.invalid_properties = query_single(
        conn,
        "SELECT
             (SELECT COUNT(*) FROM graph_nodes WHERE json_valid(data) = 0)
           + (SELECT COUNT(*) FROM graph_edges WHERE json_valid(data) = 0)",
    )?;
    // json_each fails on malformed documents.
    if report.invalid_properties == 0 {
        report.null_properties = query_single(
            conn,
            "SELECT COUNT(*) FROM graph_nodes n
             WHERE EXISTS (SELECT 1 FROM json_each(n.data) WHERE json_each.type = 'null')",
        )?;
    }
    let pragma = integrity_check(conn)?;
    report.integrity_errors = pragma.len() as i64;
    if report.orphan_edges > 0 {
        report
            .messages
            .push(format!("{} edges point at missing nodes", report.orphan_edges));
    }
    if report.duplicate_edges > 0 {
        report.messages.push(format!(
            "{} duplicate (from, to, type) edges",
            report.duplicate_edges
        ));
    }
    if report.invalid_properties > 0 {
        report.messages.push(format!(
            "{} property documents are not valid JSON",
            report.invalid_properties
        ));
    }
    if report.null_properties > 0 {
        report.messages.push(format!(
            "{} nodes store null properties",
            report.null_properties
        ));
    }
    report.messages.extend(pragma);
    Ok(report)
}

fn integrity_check(conn: &Connection) -> Result<Vec<String>, LoaderError> {
    let mut stmt = conn
        .prepare_cached("PRAGMA integrity_check")
        .map_err(|e| LoaderError::from_sqlite("integrity", e))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| LoaderError::from_sqlite("integrity", e))?;
    let mut errors = Vec::new();
    for row in rows {
        let message = row.map_err(|e| LoaderError::from_sqlite("integrity", e))?;
        if message != "ok" {
            errors.push(message);
        }
    }
    Ok(errors)
}
