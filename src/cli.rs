//! Command-line flags layered over [`LoaderConfig`].

use std::path::PathBuf;

use tracing::Level;

use crate::{
    config::{LoaderConfig, OptionalRelationshipPolicy, RunMode, UpsertPolicy},
    errors::LoaderError,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandLineConfig {
    pub config_path: Option<PathBuf>,
    pub mode: Option<RunMode>,
    pub relational_db: Option<String>,
    pub graph_db: Option<String>,
    pub batch_size: Option<usize>,
    pub tx_batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub retries: Option<u32>,
    pub upsert: Option<UpsertPolicy>,
    pub exclude_optional: bool,
    pub fresh: bool,
    pub export_dir: Option<PathBuf>,
    pub export_entities: bool,
    pub seed: Option<u64>,
    pub institutions: Option<usize>,
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a &'a str>, flag: &str) -> Result<&'a str, String> {
    iter.next()
        .copied()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("{flag} expects a number, got {raw}"))
}

impl CommandLineConfig {
    /// Parses `args` including the program name at index 0.
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut cfg = Self::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--config" => cfg.config_path = Some(PathBuf::from(value(&mut iter, arg)?)),
                "--mode" => {
                    let raw = value(&mut iter, arg)?;
                    cfg.mode = Some(raw.parse().map_err(|e: LoaderError| e.to_string())?);
                }
                "--relational-db" => cfg.relational_db = Some(value(&mut iter, arg)?.to_string()),
                "--graph-db" => cfg.graph_db = Some(value(&mut iter, arg)?.to_string()),
                "--batch-size" => cfg.batch_size = Some(number(value(&mut iter, arg)?, arg)?),
                "--tx-batch-size" => cfg.tx_batch_size = Some(number(value(&mut iter, arg)?, arg)?),
                "--workers" => cfg.workers = Some(number(value(&mut iter, arg)?, arg)?),
                "--retries" => cfg.retries = Some(number(value(&mut iter, arg)?, arg)?),
                "--upsert" => {
                    cfg.upsert = Some(match value(&mut iter, arg)? {
                        "skip" => UpsertPolicy::Skip,
                        "overwrite" => UpsertPolicy::Overwrite,
                        other => return Err(format!("unknown upsert policy {other}")),
                    });
                }
                "--exclude-optional" => cfg.exclude_optional = true,
                "--fresh" => cfg.fresh = true,
                "--export-dir" => cfg.export_dir = Some(PathBuf::from(value(&mut iter, arg)?)),
                "--export-entities" => cfg.export_entities = true,
                "--seed" => cfg.seed = Some(number(value(&mut iter, arg)?, arg)?),
                "--institutions" => cfg.institutions = Some(number(value(&mut iter, arg)?, arg)?),
                "--verbose" | "-v" => cfg.verbose = true,
                "--quiet" | "-q" => cfg.quiet = true,
                "--json" => cfg.json = true,
                other => return Err(format!("unknown argument {other}")),
            }
        }
        if cfg.verbose && cfg.quiet {
            return Err("--verbose and --quiet are mutually exclusive".into());
        }
        Ok(cfg)
    }

    pub fn help() -> &'static str {
        "Usage: compliancegraph [--config FILE] [--mode generate-and-load|cleanup-only|validate-only]\n\
         \x20                      [--relational-db memory|PATH] [--graph-db memory|PATH]\n\
         \x20                      [--batch-size N] [--tx-batch-size N] [--workers N] [--retries N]\n\
         \x20                      [--upsert skip|overwrite] [--exclude-optional] [--fresh]\n\
         \x20                      [--export-dir DIR] [--export-entities] [--seed N] [--institutions N]\n\
         \x20                      [--json] [--verbose|--quiet]\n"
    }

    /// Log level selected by `--verbose` / `--quiet`.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            Level::INFO
        }
    }

    /// Reads `--config` when given, applies every flag on top and validates.
    pub fn load(&self) -> Result<LoaderConfig, LoaderError> {
        let base = match &self.config_path {
            Some(path) => LoaderConfig::from_path(path)?,
            None => LoaderConfig::default(),
        };
        let cfg = self.apply(base);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply(&self, mut cfg: LoaderConfig) -> LoaderConfig {
        let store_path = |raw: &str| (raw != "memory").then(|| PathBuf::from(raw));
        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        if let Some(raw) = &self.relational_db {
            cfg.relational_path = store_path(raw);
        }
        if let Some(raw) = &self.graph_db {
            cfg.graph_path = store_path(raw);
        }
        if let Some(n) = self.batch_size {
            cfg.batch_sizes.entities = n;
        }
        if let Some(n) = self.tx_batch_size {
            cfg.batch_sizes.transactions = n;
        }
        if let Some(n) = self.workers {
            cfg.worker_count = n;
        }
        if let Some(n) = self.retries {
            cfg.retry.retries = n;
        }
        if let Some(policy) = self.upsert {
            cfg.upsert_policy = policy;
        }
        if self.exclude_optional {
            cfg.optional_relationships = OptionalRelationshipPolicy::Exclude;
        }
        cfg.fresh |= self.fresh;
        if let Some(dir) = &self.export_dir {
            cfg.export_dir = Some(dir.clone());
        }
        cfg.export_entities |= self.export_entities;
        if let Some(seed) = self.seed {
            cfg.generator.seed = seed;
        }
        if let Some(n) = self.institutions {
            cfg.generator.institutions = n;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = CommandLineConfig::from_args(&[
            "compliancegraph",
            "--mode",
            "validate-only",
            "--relational-db",
            "memory",
            "--batch-size",
            "25",
            "--retries",
            "1",
            "--exclude-optional",
        ])
        .unwrap();
        let cfg = cli.apply(LoaderConfig::default());
        assert_eq!(cfg.mode, RunMode::ValidateOnly);
        assert_eq!(cfg.relational_path, None);
        assert!(cfg.graph_path.is_some());
        assert_eq!(cfg.batch_sizes.entities, 25);
        assert_eq!(cfg.retry.retries, 1);
        assert_eq!(cfg.optional_relationships, OptionalRelationshipPolicy::Exclude);
    }

    #[test]
    fn missing_value_and_unknown_flag_are_errors() {
        assert!(CommandLineConfig::from_args(&["compliancegraph", "--workers"]).is_err());
        assert!(CommandLineConfig::from_args(&["compliancegraph", "--bogus"]).is_err());
        assert!(CommandLineConfig::from_args(&["compliancegraph", "--workers", "many"]).is_err());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let cli = CommandLineConfig::from_args(&["compliancegraph", "--batch-size", "0"]).unwrap();
        assert!(matches!(cli.load(), Err(LoaderError::Config(_))));
    }
}
