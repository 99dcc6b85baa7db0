//! Consistency validator: compares what the two stores hold.
//!
//! Mismatches are findings, not errors. They are logged at `warn` and kept in
//! the [`ReconciliationReport`]; nothing is repaired.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    backend::StoreCounts,
    config::OptionalRelationshipPolicy,
    errors::LoaderError,
    graph_store::{GraphIntegrityReport, GraphStore},
    model::{EntityKind, RelationshipKind},
    relational::RelationalStore,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CountComparison {
    pub relational_count: u64,
    pub graph_count: u64,
    pub matched: bool,
}

impl CountComparison {
    pub fn new(relational_count: u64, graph_count: u64) -> Self {
        Self {
            relational_count,
            graph_count,
            matched: relational_count == graph_count,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub entities: BTreeMap<EntityKind, CountComparison>,
    pub relationships: BTreeMap<RelationshipKind, CountComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<GraphIntegrityReport>,
}

impl ReconciliationReport {
    /// Every count matched and the graph has no structural findings.
    pub fn is_consistent(&self) -> bool {
        self.entities.values().all(|c| c.matched)
            && self.relationships.values().all(|c| c.matched)
            && !self.integrity.as_ref().is_some_and(|i| i.has_issues())
    }

    pub fn mismatches(&self) -> Vec<String> {
        let entities = self
            .entities
            .iter()
            .filter(|(_, c)| !c.matched)
            .map(|(kind, c)| describe(kind.as_str(), c));
        let relationships = self
            .relationships
            .iter()
            .filter(|(_, c)| !c.matched)
            .map(|(rel, c)| describe(rel.as_str(), c));
        entities.chain(relationships).collect()
    }

    /// `(category, key, comparison)` rows in report order.
    pub fn rows(&self) -> Vec<(&'static str, &'static str, CountComparison)> {
        let entities = self
            .entities
            .iter()
            .map(|(kind, c)| ("entity", kind.as_str(), *c));
        let relationships = self
            .relationships
            .iter()
            .map(|(rel, c)| ("relationship", rel.as_str(), *c));
        entities.chain(relationships).collect()
    }
}

fn describe(key: &str, c: &CountComparison) -> String {
    format!(
        "{key}: relational {} vs graph {}",
        c.relational_count, c.graph_count
    )
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsistencyValidator {
    optional: OptionalRelationshipPolicy,
}

impl ConsistencyValidator {
    pub fn new(optional: OptionalRelationshipPolicy) -> Self {
        Self { optional }
    }

    /// Relationship categories this validator compares.
    pub fn relationship_kinds(&self) -> impl Iterator<Item = RelationshipKind> + '_ {
        RelationshipKind::ALL.into_iter().filter(|rel| {
            !(rel.is_optional() && self.optional == OptionalRelationshipPolicy::Exclude)
        })
    }

    /// Count comparison over any two stores.
    pub fn reconcile(
        &self,
        relational: &dyn StoreCounts,
        graph: &dyn StoreCounts,
    ) -> Result<ReconciliationReport, LoaderError> {
        let mut report = ReconciliationReport::default();
        for kind in EntityKind::ALL {
            let comparison = CountComparison::new(
                relational.count_entities(kind)?,
                graph.count_entities(kind)?,
            );
            if !comparison.matched {
                warn!(
                    kind = %kind,
                    relational = comparison.relational_count,
                    graph = comparison.graph_count,
                    "entity count mismatch"
                );
            }
            report.entities.insert(kind, comparison);
        }
        for rel in self.relationship_kinds() {
            let comparison = CountComparison::new(
                relational.count_relationships(rel)?,
                graph.count_relationships(rel)?,
            );
            if !comparison.matched {
                warn!(
                    relationship = %rel,
                    relational = comparison.relational_count,
                    graph = comparison.graph_count,
                    "relationship count mismatch"
                );
            }
            report.relationships.insert(rel, comparison);
        }
        Ok(report)
    }

    /// Count comparison plus the graph store's structural checks.
    pub fn validate(
        &self,
        relational: &RelationalStore,
        graph: &GraphStore,
    ) -> Result<ReconciliationReport, LoaderError> {
        let mut report = self.reconcile(relational, graph)?;
        let integrity = graph.integrity()?;
        for message in &integrity.messages {
            warn!(store = "graph", finding = %message, "integrity finding");
        }
        report.integrity = Some(integrity);
        info!(
            consistent = report.is_consistent(),
            mismatches = report.mismatches().len(),
            "reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use ahash::AHashMap;

    use super::*;

    #[derive(Default)]
    struct FixedCounts {
        entities: AHashMap<EntityKind, u64>,
        relationships: AHashMap<RelationshipKind, u64>,
    }

    impl StoreCounts for FixedCounts {
        fn count_entities(&self, kind: EntityKind) -> Result<u64, LoaderError> {
            Ok(self.entities.get(&kind).copied().unwrap_or(0))
        }

        fn count_relationships(&self, rel: RelationshipKind) -> Result<u64, LoaderError> {
            Ok(self.relationships.get(&rel).copied().unwrap_or(0))
        }
    }

    #[test]
    fn mismatch_is_reported_not_raised() {
        let mut relational = FixedCounts::default();
        relational.entities.insert(EntityKind::Account, 9);
        let mut graph = FixedCounts::default();
        graph.entities.insert(EntityKind::Account, 8);

        let report = ConsistencyValidator::default()
            .reconcile(&relational, &graph)
            .unwrap();
        assert!(!report.is_consistent());
        assert_eq!(
            report.entities[&EntityKind::Account],
            CountComparison {
                relational_count: 9,
                graph_count: 8,
                matched: false
            }
        );
        assert_eq!(report.mismatches(), vec!["account: relational 9 vs graph 8"]);
    }

    #[test]
    fn exclude_policy_drops_optional_categories() {
        let mut relational = FixedCounts::default();
        relational
            .relationships
            .insert(RelationshipKind::CustomerOf, 2);
        let graph = FixedCounts::default();

        let compare = ConsistencyValidator::new(OptionalRelationshipPolicy::Compare)
            .reconcile(&relational, &graph)
            .unwrap();
        assert!(!compare.relationships[&RelationshipKind::CustomerOf].matched);

        let exclude = ConsistencyValidator::new(OptionalRelationshipPolicy::Exclude)
            .reconcile(&relational, &graph)
            .unwrap();
        assert!(!exclude.relationships.contains_key(&RelationshipKind::CustomerOf));
        assert!(!exclude.relationships.contains_key(&RelationshipKind::RelatedTo));
        assert!(exclude.is_consistent());
        assert_eq!(exclude.relationships.len(), RelationshipKind::ALL.len() - 2);
    }
}
