//! JSON and CSV mirrors of a run.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::info;

use crate::{
    errors::LoaderError,
    model::EntityKind,
    relational::{RelationalStore, columns, render},
    report::RunReport,
    validator::ReconciliationReport,
};

pub const RUN_REPORT_JSON: &str = "run_report.json";
pub const RUN_REPORT_CSV: &str = "run_report.csv";
pub const RECONCILIATION_JSON: &str = "reconciliation.json";
pub const RECONCILIATION_CSV: &str = "reconciliation.csv";

#[derive(Serialize)]
struct RunReportRow<'a> {
    entity_type: &'a str,
    status: &'a str,
    records: usize,
    relational_written: usize,
    graph_written: usize,
    batch: Option<usize>,
    batch_size: Option<usize>,
    outcome: Option<&'a str>,
    relational_attempts: Option<u32>,
    graph_attempts: Option<u32>,
    detail: String,
}

#[derive(Serialize)]
struct ReconciliationRow<'a> {
    category: &'a str,
    key: &'a str,
    relational_count: u64,
    graph_count: u64,
    matched: bool,
}

/// Writes report artifacts into one directory.
#[derive(Clone, Debug)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LoaderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| LoaderError::io(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `run_report.json` plus one CSV row per batch (one per type without
    /// batches).
    pub fn write_run_report(&self, report: &RunReport) -> Result<Vec<PathBuf>, LoaderError> {
        let json = self.write_json(RUN_REPORT_JSON, report)?;
        let path = self.dir.join(RUN_REPORT_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        for (kind, entry) in &report.types {
            let base = || RunReportRow {
                entity_type: kind.as_str(),
                status: entry.status.as_str(),
                records: entry.records,
                relational_written: entry.relational_written,
                graph_written: entry.graph_written,
                batch: None,
                batch_size: None,
                outcome: None,
                relational_attempts: None,
                graph_attempts: None,
                detail: entry.reason.clone().unwrap_or_default(),
            };
            if entry.batches.is_empty() {
                writer.serialize(base())?;
                continue;
            }
            for batch in &entry.batches {
                writer.serialize(RunReportRow {
                    batch: Some(batch.index),
                    batch_size: Some(batch.size),
                    outcome: Some(batch.outcome.as_str()),
                    relational_attempts: Some(batch.relational_attempts),
                    graph_attempts: Some(batch.graph_attempts),
                    detail: batch.outcome.detail(),
                    ..base()
                })?;
            }
        }
        writer.flush()?;
        info!(path = %path.display(), "run report exported");
        Ok(vec![json, path])
    }

    pub fn write_reconciliation(
        &self,
        report: &ReconciliationReport,
    ) -> Result<Vec<PathBuf>, LoaderError> {
        let json = self.write_json(RECONCILIATION_JSON, report)?;
        let path = self.dir.join(RECONCILIATION_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        for (category, key, comparison) in report.rows() {
            writer.serialize(ReconciliationRow {
                category,
                key,
                relational_count: comparison.relational_count,
                graph_count: comparison.graph_count,
                matched: comparison.matched,
            })?;
        }
        writer.flush()?;
        info!(path = %path.display(), "reconciliation exported");
        Ok(vec![json, path])
    }

    /// One `<table>.csv` per entity type, read back from the relational store.
    pub fn write_entities(&self, store: &RelationalStore) -> Result<Vec<PathBuf>, LoaderError> {
        let mut written = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let path = self.dir.join(format!("{}.csv", kind.table()));
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(columns(kind))?;
            for row in store.read_rows(kind)? {
                writer.write_record(row.iter().map(render))?;
            }
            writer.flush()?;
            written.push(path);
        }
        info!(dir = %self.dir.display(), tables = written.len(), "entity tables exported");
        Ok(written)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, LoaderError> {
        let path = self.dir.join(name);
        let file = File::create(&path)
            .map_err(|e| LoaderError::io(format!("create {}: {e}", path.display())))?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)
            .map_err(|e| LoaderError::io(format!("write {}: {e}", path.display())))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{BatchOutcome, BatchRecord};

    #[test]
    fn run_report_csv_has_one_row_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("out")).unwrap();
        let mut report = RunReport::new([(EntityKind::Institution, 3), (EntityKind::Document, 0)]);
        for index in 0..2 {
            report.record_batch(
                EntityKind::Institution,
                BatchRecord {
                    index,
                    size: 2 - index,
                    relational_attempts: 1,
                    graph_attempts: 1,
                    outcome: BatchOutcome::Succeeded,
                },
            );
        }
        report.finish();

        exporter.write_run_report(&report).unwrap();
        let csv = fs::read_to_string(exporter.dir().join(RUN_REPORT_CSV)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("entity_type,status,records"));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("institution,succeeded,3,3,3,0,2,succeeded"));
        assert!(lines[3].starts_with("document,succeeded,0,0,0,,,"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(exporter.dir().join(RUN_REPORT_JSON)).unwrap())
                .unwrap();
        assert_eq!(json["status"], "succeeded");
    }
}
