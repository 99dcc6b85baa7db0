//! Run configuration.
//!
//! Everything the loader consumes from the outside world is collected in
//! [`LoaderConfig`]. Defaults are usable as-is; a JSON file can override any
//! subset of fields and CLI flags override the file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{errors::LoaderError, generator::GeneratorConfig, retry::RetryPolicy};

/// What a run does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Generate a graph, write it to both stores and reconcile.
    #[default]
    GenerateAndLoad,
    /// Remove all data from both stores, keeping the schema.
    CleanupOnly,
    /// Reconcile what is already stored without writing anything.
    ValidateOnly,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::GenerateAndLoad => "generate-and-load",
            RunMode::CleanupOnly => "cleanup-only",
            RunMode::ValidateOnly => "validate-only",
        }
    }
}

impl FromStr for RunMode {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generate-and-load" | "load" => Ok(RunMode::GenerateAndLoad),
            "cleanup-only" | "cleanup" => Ok(RunMode::CleanupOnly),
            "validate-only" | "validate" => Ok(RunMode::ValidateOnly),
            other => Err(LoaderError::config(format!(
                "invalid run mode '{other}'. Valid values: 'generate-and-load', 'cleanup-only', 'validate-only'"
            ))),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour when a record with the same primary key already exists.
///
/// The policy applies to both stores for the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertPolicy {
    /// Keep the stored copy untouched.
    Skip,
    /// Replace the stored copy with the incoming record.
    #[default]
    Overwrite,
}

/// How the validator treats optional relationship categories
/// (`CUSTOMER_OF`, `RELATED_TO`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalRelationshipPolicy {
    /// Count them like any other relationship; a missing one is a mismatch.
    #[default]
    Compare,
    /// Leave them out of the reconciliation report.
    Exclude,
}

/// Batch sizes per entity category.
///
/// Transactions get their own knob because their volume is typically orders
/// of magnitude above every other type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSizes {
    /// Records per batch for every non-transaction type.
    ///
    /// **Default:** `500`
    pub entities: usize,
    /// Records per transaction batch.
    ///
    /// **Default:** `2000`
    pub transactions: usize,
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            entities: 500,
            transactions: 2000,
        }
    }
}

/// Complete configuration of one loader run.
///
/// # Examples
///
/// ```rust
/// use compliancegraph::config::{LoaderConfig, RunMode};
///
/// let mut cfg = LoaderConfig::in_memory();
/// cfg.mode = RunMode::ValidateOnly;
/// cfg.batch_sizes.transactions = 10_000;
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub mode: RunMode,

    /// Relational database file; `None` keeps the store in memory.
    ///
    /// **Default:** `compliance_relational.db`
    pub relational_path: Option<PathBuf>,

    /// Graph database file; `None` keeps the store in memory.
    ///
    /// **Default:** `compliance_graph.db`
    pub graph_path: Option<PathBuf>,

    pub batch_sizes: BatchSizes,

    /// Upper bound on batches in flight across the whole run.
    ///
    /// **Default:** `4`
    pub worker_count: usize,

    /// Connections held by the relational persister. In-memory stores always
    /// use a single connection.
    ///
    /// **Default:** `4`
    pub relational_pool_size: usize,

    /// Connections held by the graph persister.
    ///
    /// **Default:** `4`
    pub graph_pool_size: usize,

    pub retry: RetryPolicy,

    pub upsert_policy: UpsertPolicy,

    pub optional_relationships: OptionalRelationshipPolicy,

    /// Directory for the JSON report and CSV mirrors; nothing is written
    /// when unset.
    pub export_dir: Option<PathBuf>,

    /// Also export every entity table as CSV into `export_dir`.
    pub export_entities: bool,

    /// Wipe both stores before loading.
    pub fresh: bool,

    /// Reference date for temporal invariants; today when unset.
    pub generation_date: Option<NaiveDate>,

    pub generator: GeneratorConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            relational_path: Some(PathBuf::from("compliance_relational.db")),
            graph_path: Some(PathBuf::from("compliance_graph.db")),
            batch_sizes: BatchSizes::default(),
            worker_count: 4,
            relational_pool_size: 4,
            graph_pool_size: 4,
            retry: RetryPolicy::default(),
            upsert_policy: UpsertPolicy::default(),
            optional_relationships: OptionalRelationshipPolicy::default(),
            export_dir: None,
            export_entities: false,
            fresh: false,
            generation_date: None,
            generator: GeneratorConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Configuration with both stores held in memory.
    pub fn in_memory() -> Self {
        Self {
            relational_path: None,
            graph_path: None,
            ..Self::default()
        }
    }

    /// Loads a JSON configuration file; absent fields keep their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| {
            LoaderError::config(format!("{}: {e}", path.as_ref().display()))
        })?;
        let cfg: LoaderConfig = serde_json::from_str(&raw)
            .map_err(|e| LoaderError::config(format!("{}: {e}", path.as_ref().display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.batch_sizes.entities == 0 || self.batch_sizes.transactions == 0 {
            return Err(LoaderError::config("batch sizes must be positive"));
        }
        if self.worker_count == 0 {
            return Err(LoaderError::config("worker_count must be positive"));
        }
        if self.relational_pool_size == 0 || self.graph_pool_size == 0 {
            return Err(LoaderError::config("pool sizes must be positive"));
        }
        if self.retry.backoff_base_ms > self.retry.max_backoff_ms {
            return Err(LoaderError::config(
                "retry.backoff_base_ms must not exceed retry.max_backoff_ms",
            ));
        }
        if self.export_entities && self.export_dir.is_none() {
            return Err(LoaderError::config("export_entities requires export_dir"));
        }
        self.generator.validate()
    }

    pub fn generation_date(&self) -> NaiveDate {
        self.generation_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loader_config_default() {
        let cfg = LoaderConfig::default();
        assert_eq!(cfg.mode, RunMode::GenerateAndLoad);
        assert_eq!(cfg.batch_sizes, BatchSizes::default());
        assert_eq!(cfg.upsert_policy, UpsertPolicy::Overwrite);
        assert_eq!(cfg.optional_relationships, OptionalRelationshipPolicy::Compare);
        assert!(cfg.export_dir.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!(
            "cleanup-only".parse::<RunMode>().unwrap(),
            RunMode::CleanupOnly
        );
        assert_eq!(
            "VALIDATE-ONLY".parse::<RunMode>().unwrap(),
            RunMode::ValidateOnly
        );
        assert!("replay".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loader.json");
        fs::write(
            &path,
            r#"{"mode": "validate-only", "batch_sizes": {"transactions": 50}, "upsert_policy": "skip"}"#,
        )
        .unwrap();
        let cfg = LoaderConfig::from_path(&path).unwrap();
        assert_eq!(cfg.mode, RunMode::ValidateOnly);
        assert_eq!(cfg.batch_sizes.transactions, 50);
        assert_eq!(cfg.batch_sizes.entities, 500);
        assert_eq!(cfg.upsert_policy, UpsertPolicy::Skip);
        assert_eq!(cfg.worker_count, 4);
    }

    #[test]
    fn test_zero_worker_count_rejected() {
        let mut cfg = LoaderConfig::in_memory();
        cfg.worker_count = 0;
        assert!(matches!(cfg.validate(), Err(LoaderError::Config(_))));
    }

    #[test]
    fn test_export_entities_requires_directory() {
        let mut cfg = LoaderConfig::in_memory();
        cfg.export_entities = true;
        assert!(cfg.validate().is_err());
    }
}
