//! Write orchestrator: dependency-ordered, bounded-parallel dual-store writes.
//!
//! One coordinating task owns the [`RunReport`]. Each entity type runs as a
//! task of its own once every type it references has succeeded; the type task
//! fans its batches out under a shared semaphore and hands the batch records
//! back when they have all settled.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use ahash::AHashMap;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinSet,
};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    backend::{BatchPersister, EntityBatch, StoreKind},
    config::LoaderConfig,
    errors::LoaderError,
    model::{EntityGraph, EntityKind},
    partition::BatchPartitioner,
    report::{BatchOutcome, BatchRecord, RunReport, StoreFailure},
    retry::{Attempted, RetryPolicy, with_retry},
    sequencer::DependencySequencer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TypeState {
    Waiting,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

/// Shared by every type and batch task of one run.
struct RunContext {
    relational: Arc<dyn BatchPersister>,
    graph: Arc<dyn BatchPersister>,
    partitioner: BatchPartitioner,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

pub struct WriteOrchestrator {
    relational: Arc<dyn BatchPersister>,
    graph: Arc<dyn BatchPersister>,
    sequencer: DependencySequencer,
    partitioner: BatchPartitioner,
    retry: RetryPolicy,
    worker_count: usize,
}

impl WriteOrchestrator {
    pub fn new(
        relational: Arc<dyn BatchPersister>,
        graph: Arc<dyn BatchPersister>,
        config: &LoaderConfig,
    ) -> Result<Self, LoaderError> {
        if config.worker_count == 0 {
            return Err(LoaderError::config("worker_count must be at least 1"));
        }
        Ok(Self {
            relational,
            graph,
            sequencer: DependencySequencer::for_schema()?,
            partitioner: BatchPartitioner::new(&config.batch_sizes)?,
            retry: config.retry,
            worker_count: config.worker_count,
        })
    }

    pub fn with_sequencer(mut self, sequencer: DependencySequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn sequencer(&self) -> &DependencySequencer {
        &self.sequencer
    }

    /// Writes every record of `graph` to both stores and returns the settled
    /// report. Batch-level failures are recorded in the report; only a broken
    /// setup (a type the sequencer does not know, a panicked task) is an error.
    pub async fn run(&self, graph: Arc<EntityGraph>) -> Result<RunReport, LoaderError> {
        let order = self.sequencer.write_order().to_vec();
        if let Some(unknown) = graph
            .kinds()
            .find(|kind| self.sequencer.position(*kind).is_none())
        {
            return Err(LoaderError::schema_dependency(format!(
                "{unknown} records present but {unknown} is not in the write order"
            )));
        }

        let mut report = RunReport::new(order.iter().map(|kind| (*kind, graph.count(*kind))));
        let ctx = Arc::new(RunContext {
            relational: Arc::clone(&self.relational),
            graph: Arc::clone(&self.graph),
            partitioner: self.partitioner,
            retry: self.retry,
            permits: Arc::new(Semaphore::new(self.worker_count)),
        });
        let mut states: AHashMap<EntityKind, TypeState> =
            order.iter().map(|kind| (*kind, TypeState::Waiting)).collect();
        let mut running: JoinSet<Result<(EntityKind, Vec<BatchRecord>), LoaderError>> =
            JoinSet::new();

        info!(
            types = order.len(),
            records = graph.len(),
            workers = self.worker_count,
            "starting load"
        );

        loop {
            for kind in &order {
                if states[kind] != TypeState::Waiting {
                    continue;
                }
                let deps = self.sequencer.dependencies_of(*kind);
                if deps.iter().all(|dep| states[dep] == TypeState::Succeeded) {
                    states.insert(*kind, TypeState::Running);
                    running.spawn(run_type(Arc::clone(&ctx), Arc::clone(&graph), *kind));
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (kind, records) = joined
                .map_err(|e| LoaderError::store(format!("type task failed: {e}")))??;
            let failure = records
                .iter()
                .filter(|r| r.outcome.is_fatal())
                .min_by_key(|r| r.index)
                .map(|r| format!("batch {}: {}", r.index, r.outcome.detail()));
            for record in records {
                report.record_batch(kind, record);
            }
            match failure {
                None => {
                    info!(kind = %kind, "type complete");
                    states.insert(kind, TypeState::Succeeded);
                }
                Some(reason) => {
                    error!(kind = %kind, reason = %reason, "type failed");
                    report.mark_failed(kind, reason);
                    states.insert(kind, TypeState::Failed);
                    self.skip_dependents(kind, &mut states, &mut report);
                }
            }
        }

        report.finish();
        info!(status = report.status.as_str(), "load finished");
        Ok(report)
    }

    /// Marks every type downstream of `failed` as skipped. None of them can
    /// have started, since a type only runs once its dependencies succeed.
    fn skip_dependents(
        &self,
        failed: EntityKind,
        states: &mut AHashMap<EntityKind, TypeState>,
        report: &mut RunReport,
    ) {
        for dependent in self.sequencer.dependents_of(failed) {
            if states.get(&dependent) != Some(&TypeState::Waiting) {
                continue;
            }
            warn!(kind = %dependent, dependency = %failed, "skipping type");
            report.mark_skipped(dependent, format!("dependency {failed} failed"));
            states.insert(dependent, TypeState::Skipped);
        }
    }
}

async fn run_type(
    ctx: Arc<RunContext>,
    graph: Arc<EntityGraph>,
    kind: EntityKind,
) -> Result<(EntityKind, Vec<BatchRecord>), LoaderError> {
    let records = graph.records(kind);
    let batches = ctx.partitioner.partition(kind, records);
    debug!(kind = %kind, records = records.len(), batches = batches.len(), "dispatching type");

    let cancelled = Arc::new(AtomicBool::new(false));
    let mut settled = Vec::with_capacity(batches.len());
    let mut tasks = JoinSet::new();
    for batch in batches {
        if cancelled.load(Ordering::SeqCst) {
            settled.push(BatchRecord::cancelled(batch.index, batch.len()));
            continue;
        }
        let permit = Arc::clone(&ctx.permits)
            .acquire_owned()
            .await
            .map_err(|e| LoaderError::store(format!("worker pool closed: {e}")))?;
        let owned = Arc::new(EntityBatch {
            kind,
            index: batch.index,
            records: batch.items.to_vec(),
        });
        let span = info_span!("batch", kind = %kind, batch = batch.index);
        tasks.spawn(
            run_batch(
                Arc::clone(&ctx),
                Arc::clone(&graph),
                owned,
                Arc::clone(&cancelled),
                permit,
            )
            .instrument(span),
        );
    }
    while let Some(joined) = tasks.join_next().await {
        settled.push(joined.map_err(|e| LoaderError::store(format!("batch task failed: {e}")))?);
    }
    Ok((kind, settled))
}

async fn run_batch(
    ctx: Arc<RunContext>,
    graph: Arc<EntityGraph>,
    batch: Arc<EntityBatch>,
    cancelled: Arc<AtomicBool>,
    _permit: OwnedSemaphorePermit,
) -> BatchRecord {
    if cancelled.load(Ordering::SeqCst) {
        return BatchRecord::cancelled(batch.index, batch.len());
    }

    let reasons: Vec<String> = batch
        .records
        .iter()
        .filter_map(|entity| {
            graph
                .validate_entity(entity)
                .err()
                .map(|v| format!("{} {}: {v}", entity.kind(), entity.id()))
        })
        .collect();
    if !reasons.is_empty() {
        cancelled.store(true, Ordering::SeqCst);
        warn!(rejected = reasons.len(), "batch failed validation");
        return BatchRecord::rejected(batch.index, batch.len(), reasons);
    }

    let relational = &ctx.relational;
    let graph_store = &ctx.graph;
    let for_relational = Arc::clone(&batch);
    let for_graph = Arc::clone(&batch);
    let (rel, gr) = tokio::join!(
        with_retry(&ctx.retry, move || relational.persist(Arc::clone(&for_relational)))
            .instrument(info_span!("store", store = %StoreKind::Relational)),
        with_retry(&ctx.retry, move || graph_store.persist(Arc::clone(&for_graph)))
            .instrument(info_span!("store", store = %StoreKind::Graph)),
    );

    let record = settle(batch.index, batch.len(), rel, gr);
    if record.outcome.is_fatal() {
        cancelled.store(true, Ordering::SeqCst);
        error!(detail = %record.outcome.detail(), "batch failed");
    } else {
        debug!(outcome = record.outcome.as_str(), "batch settled");
    }
    record
}

fn settle(
    index: usize,
    size: usize,
    relational: Attempted<usize>,
    graph: Attempted<usize>,
) -> BatchRecord {
    let failures: Vec<StoreFailure> = [
        (StoreKind::Relational, &relational),
        (StoreKind::Graph, &graph),
    ]
    .into_iter()
    .filter_map(|(store, attempted)| {
        attempted.result.as_ref().err().map(|err| StoreFailure {
            store,
            error: err.to_string(),
            attempts: attempted.attempts,
        })
    })
    .collect();
    let retries = relational.retries() + graph.retries();
    let outcome = if !failures.is_empty() {
        BatchOutcome::Failed { failures }
    } else if retries > 0 {
        BatchOutcome::RetriedThenSucceeded { retries }
    } else {
        BatchOutcome::Succeeded
    };
    BatchRecord {
        index,
        size,
        relational_attempts: relational.attempts,
        graph_attempts: graph.attempts,
        outcome,
    }
}
