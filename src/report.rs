//! Run report: what was written where, batch by batch.
//!
//! Only the orchestrator's coordinating task mutates a [`RunReport`]; batch
//! tasks hand their [`BatchRecord`]s back through join handles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{backend::StoreKind, model::EntityKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartialSuccess => "partial_success",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeStatus {
    Pending,
    Succeeded,
    Failed,
    /// Never started because a dependency did not complete.
    Skipped,
}

impl TypeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeStatus::Pending => "pending",
            TypeStatus::Succeeded => "succeeded",
            TypeStatus::Failed => "failed",
            TypeStatus::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFailure {
    pub store: StoreKind,
    pub error: String,
    pub attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Succeeded,
    /// `retries` is summed over both stores.
    RetriedThenSucceeded { retries: u32 },
    Failed { failures: Vec<StoreFailure> },
    /// Failed validation; nothing was written.
    Rejected { reasons: Vec<String> },
    /// Not started after an earlier fatal failure of the same type.
    Cancelled,
}

impl BatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Succeeded => "succeeded",
            BatchOutcome::RetriedThenSucceeded { .. } => "retried_then_succeeded",
            BatchOutcome::Failed { .. } => "failed",
            BatchOutcome::Rejected { .. } => "rejected",
            BatchOutcome::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            BatchOutcome::Succeeded | BatchOutcome::RetriedThenSucceeded { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BatchOutcome::Failed { .. } | BatchOutcome::Rejected { .. })
    }

    /// One-line detail for CSV and log output.
    pub fn detail(&self) -> String {
        match self {
            BatchOutcome::Succeeded | BatchOutcome::Cancelled => String::new(),
            BatchOutcome::RetriedThenSucceeded { retries } => format!("{retries} retries"),
            BatchOutcome::Failed { failures } => failures
                .iter()
                .map(|f| format!("{} after {} attempts: {}", f.store, f.attempts, f.error))
                .collect::<Vec<_>>()
                .join("; "),
            BatchOutcome::Rejected { reasons } => reasons.join("; "),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub index: usize,
    pub size: usize,
    pub relational_attempts: u32,
    pub graph_attempts: u32,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchRecord {
    pub fn cancelled(index: usize, size: usize) -> Self {
        Self {
            index,
            size,
            relational_attempts: 0,
            graph_attempts: 0,
            outcome: BatchOutcome::Cancelled,
        }
    }

    pub fn rejected(index: usize, size: usize, reasons: Vec<String>) -> Self {
        Self {
            index,
            size,
            relational_attempts: 0,
            graph_attempts: 0,
            outcome: BatchOutcome::Rejected { reasons },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReport {
    pub status: TypeStatus,
    pub records: usize,
    pub relational_written: usize,
    pub graph_written: usize,
    pub batches: Vec<BatchRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TypeReport {
    fn new(records: usize) -> Self {
        Self {
            status: TypeStatus::Pending,
            records,
            relational_written: 0,
            graph_written: 0,
            batches: Vec::new(),
            reason: None,
        }
    }

    pub fn batch(&self, index: usize) -> Option<&BatchRecord> {
        self.batches.iter().find(|b| b.index == index)
    }

    pub fn count_outcome(&self, outcome: &str) -> usize {
        self.batches
            .iter()
            .filter(|b| b.outcome.as_str() == outcome)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub types: BTreeMap<EntityKind, TypeReport>,
}

impl RunReport {
    /// Empty report covering `kinds` with their record counts.
    pub fn new(kinds: impl IntoIterator<Item = (EntityKind, usize)>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Succeeded,
            types: kinds
                .into_iter()
                .map(|(kind, records)| (kind, TypeReport::new(records)))
                .collect(),
        }
    }

    pub fn type_report(&self, kind: EntityKind) -> Option<&TypeReport> {
        self.types.get(&kind)
    }

    fn entry(&mut self, kind: EntityKind) -> &mut TypeReport {
        self.types.entry(kind).or_insert_with(|| TypeReport::new(0))
    }

    /// Appends a batch result. A failed batch still counts toward the store
    /// that committed it.
    pub fn record_batch(&mut self, kind: EntityKind, record: BatchRecord) {
        let entry = self.entry(kind);
        let committed = |store: StoreKind| match &record.outcome {
            BatchOutcome::Succeeded | BatchOutcome::RetriedThenSucceeded { .. } => true,
            BatchOutcome::Failed { failures } => failures.iter().all(|f| f.store != store),
            BatchOutcome::Rejected { .. } | BatchOutcome::Cancelled => false,
        };
        if committed(StoreKind::Relational) {
            entry.relational_written += record.size;
        }
        if committed(StoreKind::Graph) {
            entry.graph_written += record.size;
        }
        entry.batches.push(record);
    }

    pub fn mark_skipped(&mut self, kind: EntityKind, reason: impl Into<String>) {
        let entry = self.entry(kind);
        entry.status = TypeStatus::Skipped;
        entry.reason = Some(reason.into());
    }

    pub fn mark_failed(&mut self, kind: EntityKind, reason: impl Into<String>) {
        let entry = self.entry(kind);
        entry.status = TypeStatus::Failed;
        entry.reason = Some(reason.into());
    }

    /// Settles per-type and overall status.
    pub fn finish(&mut self) {
        for entry in self.types.values_mut() {
            entry.batches.sort_by_key(|b| b.index);
            if entry.status == TypeStatus::Skipped {
                continue;
            }
            let ok = entry.batches.iter().all(|b| b.outcome.is_success());
            if entry.status != TypeStatus::Failed {
                entry.status = if ok {
                    TypeStatus::Succeeded
                } else {
                    TypeStatus::Failed
                };
            }
        }
        let succeeded = self
            .types
            .values()
            .filter(|t| t.status == TypeStatus::Succeeded)
            .count();
        self.status = if succeeded == self.types.len() {
            RunStatus::Succeeded
        } else if succeeded == 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartialSuccess
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn kinds_with_status(&self, status: TypeStatus) -> Vec<EntityKind> {
        self.types
            .iter()
            .filter(|(_, t)| t.status == status)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(index: usize, size: usize) -> BatchRecord {
        BatchRecord {
            index,
            size,
            relational_attempts: 1,
            graph_attempts: 1,
            outcome: BatchOutcome::Succeeded,
        }
    }

    #[test]
    fn one_failed_type_makes_a_partial_success() {
        let mut report = RunReport::new([(EntityKind::Institution, 2), (EntityKind::Account, 3)]);
        report.record_batch(EntityKind::Institution, ok(0, 2));
        report.record_batch(EntityKind::Account, BatchRecord::rejected(0, 3, vec!["bad".into()]));
        report.finish();
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.kinds_with_status(TypeStatus::Failed), vec![EntityKind::Account]);
        assert_eq!(report.types[&EntityKind::Institution].relational_written, 2);
        assert_eq!(report.types[&EntityKind::Account].graph_written, 0);
    }

    #[test]
    fn failed_batch_counts_toward_the_store_that_committed() {
        let mut report = RunReport::new([(EntityKind::Account, 5)]);
        report.record_batch(
            EntityKind::Account,
            BatchRecord {
                index: 0,
                size: 5,
                relational_attempts: 1,
                graph_attempts: 4,
                outcome: BatchOutcome::Failed {
                    failures: vec![StoreFailure {
                        store: StoreKind::Graph,
                        error: "busy".into(),
                        attempts: 4,
                    }],
                },
            },
        );
        report.finish();
        let account = &report.types[&EntityKind::Account];
        assert_eq!(account.relational_written, 5);
        assert_eq!(account.graph_written, 0);
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn empty_types_succeed() {
        let mut report = RunReport::new([(EntityKind::Document, 0)]);
        report.finish();
        assert!(report.is_success());
    }

    #[test]
    fn batch_outcome_serialises_flat() {
        let value = serde_json::to_value(ok(4, 10)).unwrap();
        assert_eq!(value["outcome"], "succeeded");
        assert_eq!(value["index"], 4);
    }
}
