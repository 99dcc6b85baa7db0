//! Run modes: generate-and-load, cleanup-only and validate-only.

use std::{path::PathBuf, sync::Arc};

use tracing::{info, warn};

use crate::{
    config::{LoaderConfig, RunMode},
    errors::LoaderError,
    export::Exporter,
    fault_injection::FaultInjector,
    generator,
    graph_store::GraphStore,
    model::EntityGraph,
    orchestrator::WriteOrchestrator,
    relational::RelationalStore,
    report::RunReport,
    validator::{ConsistencyValidator, ReconciliationReport},
};

/// Both persisters of one run, each with its own connection pool.
#[derive(Clone)]
pub struct Stores {
    pub relational: RelationalStore,
    pub graph: GraphStore,
}

impl Stores {
    pub fn open(config: &LoaderConfig) -> Result<Self, LoaderError> {
        let relational = RelationalStore::open(
            config.relational_path.as_deref(),
            config.relational_pool_size,
            config.upsert_policy,
        )?;
        let graph = GraphStore::open(
            config.graph_path.as_deref(),
            config.graph_pool_size,
            config.upsert_policy,
        )?;
        Ok(Self { relational, graph })
    }

    /// Routes both stores' commit points through `faults`.
    pub fn with_faults(self, faults: FaultInjector) -> Self {
        Self {
            relational: self.relational.with_faults(faults.clone()),
            graph: self.graph.with_faults(faults),
        }
    }

    pub fn wipe(&self) -> Result<(), LoaderError> {
        self.relational.wipe()?;
        self.graph.wipe()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub run: Option<RunReport>,
    pub reconciliation: Option<ReconciliationReport>,
    pub exported: Vec<PathBuf>,
}

impl RunOutcome {
    /// `0` unless a batch failed fatally.
    pub fn exit_code(&self) -> i32 {
        match &self.run {
            Some(report) if !report.is_success() => 1,
            _ => 0,
        }
    }
}

/// Opens the configured stores and runs `config.mode`. `graph` replaces the
/// generator in generate-and-load mode.
pub async fn run(
    config: &LoaderConfig,
    graph: Option<EntityGraph>,
) -> Result<RunOutcome, LoaderError> {
    config.validate()?;
    let stores = Stores::open(config)?;
    run_with(config, &stores, graph).await
}

pub async fn run_with(
    config: &LoaderConfig,
    stores: &Stores,
    graph: Option<EntityGraph>,
) -> Result<RunOutcome, LoaderError> {
    info!(mode = %config.mode, "run starting");
    let mut outcome = RunOutcome::default();
    match config.mode {
        RunMode::CleanupOnly => {
            stores.wipe()?;
            return Ok(outcome);
        }
        RunMode::ValidateOnly => {}
        RunMode::GenerateAndLoad => {
            if config.fresh {
                stores.wipe()?;
            }
            let graph = match graph {
                Some(graph) => graph,
                None => generator::generate(&config.generator, config.generation_date())?,
            };
            let orchestrator = WriteOrchestrator::new(
                Arc::new(stores.relational.clone()),
                Arc::new(stores.graph.clone()),
                config,
            )?;
            let report = orchestrator.run(Arc::new(graph)).await?;
            if !report.is_success() {
                warn!(status = report.status.as_str(), "load did not complete");
            }
            outcome.run = Some(report);
        }
    }

    let validator = ConsistencyValidator::new(config.optional_relationships);
    let for_validation = stores.clone();
    let reconciliation = tokio::task::spawn_blocking(move || {
        validator.validate(&for_validation.relational, &for_validation.graph)
    })
    .await
    .map_err(|e| LoaderError::store(format!("validation task failed: {e}")))??;
    outcome.reconciliation = Some(reconciliation);

    if let Some(dir) = &config.export_dir {
        let exporter = Exporter::new(dir)?;
        if let Some(report) = &outcome.run {
            outcome.exported.extend(exporter.write_run_report(report)?);
        }
        if let Some(reconciliation) = &outcome.reconciliation {
            outcome
                .exported
                .extend(exporter.write_reconciliation(reconciliation)?);
        }
        if config.export_entities {
            outcome
                .exported
                .extend(exporter.write_entities(&stores.relational)?);
        }
    }
    Ok(outcome)
}
