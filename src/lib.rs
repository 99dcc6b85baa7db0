//! Dual-store batched loader for synthetic financial-compliance entity graphs.
//!
//! An [`EntityGraph`] is ordered by type dependencies, split into batches and
//! written to a relational SQLite store and a property-graph SQLite store at
//! the same time. The [`ConsistencyValidator`] then checks that both stores
//! agree.

pub mod backend;
pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod fault_injection;
pub mod generator;
pub mod graph_store;
pub mod model;
pub mod orchestrator;
pub mod partition;
pub mod pipeline;
pub mod pool;
pub mod relational;
pub mod report;
pub mod retry;
pub mod schema;
pub mod sequencer;
pub mod validator;

pub use crate::backend::{BatchPersister, EntityBatch, StoreCounts, StoreKind};
pub use crate::config::{
    BatchSizes, LoaderConfig, OptionalRelationshipPolicy, RunMode, UpsertPolicy,
};
pub use crate::errors::LoaderError;
pub use crate::generator::{GeneratorConfig, generate};
pub use crate::graph_store::GraphStore;
pub use crate::model::{Entity, EntityGraph, EntityKind, OwnerRef, RelationshipKind};
pub use crate::orchestrator::WriteOrchestrator;
pub use crate::partition::BatchPartitioner;
pub use crate::pipeline::{RunOutcome, Stores};
pub use crate::relational::RelationalStore;
pub use crate::report::{BatchOutcome, RunReport, RunStatus, TypeStatus};
pub use crate::retry::RetryPolicy;
pub use crate::sequencer::DependencySequencer;
pub use crate::validator::{ConsistencyValidator, ReconciliationReport};
