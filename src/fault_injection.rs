use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::{errors::LoaderError, model::EntityKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    RelationalBeforeCommit,
    GraphBeforeCommit,
}

/// Classification of an injected failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Surfaces as a retryable store error.
    Transient,
    /// Surfaces as a non-retryable error.
    Fatal,
}

type Site = (FaultPoint, EntityKind, usize);

struct FaultEntry {
    remaining: usize,
    fault: Fault,
}

#[derive(Default)]
struct Registry {
    armed: AHashMap<Site, FaultEntry>,
    hits: AHashMap<Site, usize>,
}

/// Fault points scoped to one pair of persisters.
///
/// Cloned handles share state, so a test can arm a fault after handing the
/// injector to a store and read hit counts afterwards.
#[derive(Clone, Default)]
pub struct FaultInjector {
    registry: Arc<Mutex<Registry>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `failures` attempts of batch `batch` of `kind` at `point`.
    pub fn configure(
        &self,
        point: FaultPoint,
        kind: EntityKind,
        batch: usize,
        failures: usize,
        fault: Fault,
    ) {
        let mut guard = self.registry.lock();
        if failures == 0 {
            guard.armed.remove(&(point, kind, batch));
        } else {
            guard.armed.insert(
                (point, kind, batch),
                FaultEntry {
                    remaining: failures,
                    fault,
                },
            );
        }
    }

    /// Fails every attempt of the batch.
    pub fn fail_always(&self, point: FaultPoint, kind: EntityKind, batch: usize, fault: Fault) {
        self.configure(point, kind, batch, usize::MAX, fault);
    }

    pub fn reset(&self) {
        let mut guard = self.registry.lock();
        guard.armed.clear();
        guard.hits.clear();
    }

    /// Number of times the site was reached, failing or not.
    pub fn hits(&self, point: FaultPoint, kind: EntityKind, batch: usize) -> usize {
        self.registry
            .lock()
            .hits
            .get(&(point, kind, batch))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn check(
        &self,
        point: FaultPoint,
        kind: EntityKind,
        batch: usize,
    ) -> Result<(), LoaderError> {
        let site = (point, kind, batch);
        let mut guard = self.registry.lock();
        *guard.hits.entry(site).or_insert(0) += 1;
        if let Some(entry) = guard.armed.get_mut(&site)
            && entry.remaining > 0
        {
            entry.remaining -= 1;
            let fault = entry.fault;
            if entry.remaining == 0 {
                guard.armed.remove(&site);
            }
            let msg = format!("{point:?} {kind} batch {batch}");
            return Err(match fault {
                Fault::Transient => LoaderError::transient(msg),
                Fault::Fatal => LoaderError::fault_injection(msg),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_fires_the_configured_number_of_times() {
        let faults = FaultInjector::new();
        faults.configure(
            FaultPoint::GraphBeforeCommit,
            EntityKind::Account,
            2,
            2,
            Fault::Transient,
        );
        let check = || faults.check(FaultPoint::GraphBeforeCommit, EntityKind::Account, 2);
        assert!(check().unwrap_err().is_transient());
        assert!(check().is_err());
        assert!(check().is_ok());
        assert_eq!(faults.hits(FaultPoint::GraphBeforeCommit, EntityKind::Account, 2), 3);
    }

    #[test]
    fn other_batches_are_untouched() {
        let faults = FaultInjector::new();
        faults.fail_always(
            FaultPoint::RelationalBeforeCommit,
            EntityKind::Account,
            0,
            Fault::Fatal,
        );
        assert!(faults
            .check(FaultPoint::RelationalBeforeCommit, EntityKind::Account, 1)
            .is_ok());
        assert!(faults
            .check(FaultPoint::GraphBeforeCommit, EntityKind::Account, 0)
            .is_ok());
        let err = faults
            .check(FaultPoint::RelationalBeforeCommit, EntityKind::Account, 0)
            .unwrap_err();
        assert!(!err.is_transient());
    }
}
